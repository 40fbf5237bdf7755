//! Builds the burst-type datasets of one Signature export chunk.

use crate::burst::{config_bin_distances, time_axis, BurstDataset, BurstType};
use crate::classify::{
    classify, BurstShape, Classification, ClassificationReport, Unclassified, UnclassifiedReason,
    BINDIST_DIM,
};
use crate::dataset::{Dataset, Variable};
use crate::error::{Error, Result};
use crate::models::RawExport;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Prefix applied to `Config` keys when they become dataset attributes.
pub const CONFIG_ATTR_PREFIX: &str = "SIG";

/// Substring identifying the beam-to-instrument-frame calibration matrix.
pub const TRANSFORM_MATRIX_KEY: &str = "Beam2xyz";

/// Datasets built from one chunk together with the classification outcome.
#[derive(Debug, Clone)]
pub struct ChunkDatasets {
    pub datasets: Vec<BurstDataset>,
    pub report: ClassificationReport,
}

impl ChunkDatasets {
    pub fn get(&self, kind: BurstType) -> Option<&Dataset> {
        self.datasets
            .iter()
            .find(|d| d.kind() == kind)
            .map(BurstDataset::dataset)
    }

    pub fn kinds(&self) -> Vec<BurstType> {
        self.datasets.iter().map(BurstDataset::kind).collect()
    }
}

#[derive(Default)]
struct BurstSlots {
    raw_altimeter: Option<Dataset>,
    iburst: Option<Dataset>,
    burst: Option<Dataset>,
}

impl BurstSlots {
    fn slot(&mut self, kind: BurstType) -> &mut Option<Dataset> {
        match kind {
            BurstType::BurstRawAltimeter => &mut self.raw_altimeter,
            BurstType::IBurst => &mut self.iburst,
            BurstType::Burst => &mut self.burst,
        }
    }

    fn into_datasets(self) -> Vec<BurstDataset> {
        let Self {
            raw_altimeter,
            iburst,
            burst,
        } = self;
        [
            (BurstType::BurstRawAltimeter, raw_altimeter),
            (BurstType::IBurst, iburst),
            (BurstType::Burst, burst),
        ]
        .into_iter()
        .filter_map(|(kind, ds)| ds.map(|ds| BurstDataset::new(kind, ds)))
        .collect()
    }
}

/// Build every enabled burst-type dataset from one export.
///
/// Fields that cannot be placed are logged and returned in the report; they
/// never abort the build. Missing time stamps or cell settings for an enabled
/// burst type do.
pub fn build_chunk(export: &RawExport) -> Result<ChunkDatasets> {
    let enabled = BurstType::enabled(export);
    let bindist = if enabled.iter().any(|k| k.has_cells()) {
        Some(config_bin_distances(export)?)
    } else {
        None
    };

    let mut slots = BurstSlots::default();
    let mut shapes = Vec::with_capacity(enabled.len());
    for &kind in &enabled {
        let mut ds = Dataset::with_time(time_axis(export, kind)?);
        let mut cells = None;
        if let (true, Some(bindist)) = (kind.has_cells(), &bindist) {
            ds.insert_coord(BINDIST_DIM, bindist.clone())?;
            cells = Some(first_sample_cells(export, kind).unwrap_or(bindist.len()));
        }
        ds.set_attr("data_type", kind.name());
        shapes.push(BurstShape {
            kind,
            samples: ds.len(),
            cells,
        });
        *slots.slot(kind) = Some(ds);
    }

    let mut report = ClassificationReport::default();
    for (key, field) in &export.data {
        match classify(key, field.shape(), &shapes) {
            Classification::TimeAxis(_) => {}
            Classification::Disabled(kind) => {
                debug!("ignoring {} ({} is not enabled)", key, kind);
                report.ignored.push(key.clone());
            }
            Classification::Attach(placement) => {
                let Some(ds) = slots.slot(placement.kind).as_mut() else {
                    continue;
                };
                let variable = Variable::new(placement.dims, field.clone())?;
                match ds.insert_variable(placement.name.as_str(), variable) {
                    Ok(()) => report.attached.push((placement.kind, placement.name)),
                    Err(Error::Shape(detail)) => {
                        let entry = Unclassified {
                            key: key.clone(),
                            shape: field.shape().to_vec(),
                            reason: UnclassifiedReason::DimensionConflict { detail },
                        };
                        warn!("still need to process {}", entry);
                        report.unclassified.push(entry);
                    }
                    Err(err) => return Err(err),
                }
            }
            Classification::Unclassified(entry) => {
                warn!("still need to process {}", entry);
                report.unclassified.push(entry);
            }
        }
    }

    for &kind in &enabled {
        if let Some(ds) = slots.slot(kind).as_mut() {
            add_config_attrs(export, ds);
            add_descriptions(export, kind, ds);
            add_units(export, kind, ds);
            add_transform_matrix(export, ds)?;
        }
    }

    Ok(ChunkDatasets {
        datasets: slots.into_datasets(),
        report,
    })
}

/// Cell count recorded in the first sample of `<Type>_NCells`.
///
/// Later samples are not inspected.
fn first_sample_cells(export: &RawExport, kind: BurstType) -> Option<usize> {
    let first = *export.data.get(&kind.cell_count_key())?.iter().next()?;
    (first.is_finite() && first >= 0.0).then_some(first as usize)
}

/// Copy every `Config` setting onto the dataset as `SIG<key>`.
pub fn add_config_attrs(export: &RawExport, ds: &mut Dataset) {
    for (key, value) in &export.config {
        ds.set_attr(format!("{}{}", CONFIG_ATTR_PREFIX, key), value.to_attr());
    }
}

pub fn add_descriptions(export: &RawExport, kind: BurstType, ds: &mut Dataset) {
    add_variable_text(&export.descriptions, kind, ds, "long_name");
}

pub fn add_units(export: &RawExport, kind: BurstType, ds: &mut Dataset) {
    add_variable_text(&export.units, kind, ds, "units");
}

/// Attach `attr` from a description-style table without overwriting.
///
/// Entries carrying this burst type's prefix are applied first, then the
/// remaining entries in key order, so the result does not depend on how the
/// table was iterated. `<Type>_Time` lands on the time axis, and only for
/// this burst type's own entry.
fn add_variable_text(
    table: &BTreeMap<String, String>,
    kind: BurstType,
    ds: &mut Dataset,
    attr: &str,
) {
    if let Some(text) = table.get(&kind.time_key()) {
        ds.time_attrs
            .entry(attr.to_string())
            .or_insert_with(|| text.as_str().into());
    }

    let own = table.iter().filter(|(k, _)| key_prefix(k) == Some(kind.name()));
    let others = table.iter().filter(|(k, _)| key_prefix(k) != Some(kind.name()));
    for (key, text) in own.chain(others) {
        if let Some(var) = ds.variable_mut(variable_name(key)) {
            var.set_attr_if_absent(attr, text.as_str());
        }
    }
}

/// Attach each calibration matrix in `Config` as a time-independent variable.
pub fn add_transform_matrix(export: &RawExport, ds: &mut Dataset) -> Result<()> {
    for (key, value) in &export.config {
        if !key.contains(TRANSFORM_MATRIX_KEY) {
            continue;
        }
        let name = variable_name(key);
        let Some(array) = value.to_array()? else {
            warn!("{} is not an array, not attaching it as a variable", key);
            continue;
        };
        let dims = match array.ndim() {
            1 => vec![format!("{}_dim", name)],
            _ => vec![format!("{}_row", name), format!("{}_col", name)],
        };
        ds.insert_variable(name, Variable::new(dims, array)?)?;
    }
    Ok(())
}

fn key_prefix(key: &str) -> Option<&str> {
    key.split_once('_').map(|(prefix, _)| prefix)
}

/// Variable name of a compound `<Prefix>_<Name>` key.
pub fn variable_name(key: &str) -> &str {
    key.split_once('_').map_or(key, |(_, rest)| rest)
}
