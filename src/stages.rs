//! Dataset transforms supplied by collaborating tooling.
//!
//! Every stage takes a dataset and returns a dataset. The default methods are
//! what [`BasicStages`] runs: metadata injection and summary attributes are
//! implemented, the CF, QA, correction and depth stages pass data through.
//! Plug real implementations in by overriding methods on your own type.

use crate::dataset::{AttrValue, Dataset};
use crate::error::{Error, Result};
use crate::metadata::DeploymentMetadata;
use log::warn;
use std::collections::HashMap;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub trait Stages {
    fn check_valid_globalatts_metadata(&self, metadata: &DeploymentMetadata) -> Result<()> {
        if metadata.filename.trim().is_empty() {
            return Err(Error::ConfigValidation("'filename' must be set".to_string()));
        }
        if metadata.basefile.trim().is_empty() {
            return Err(Error::ConfigValidation("'basefile' must be set".to_string()));
        }
        Ok(())
    }

    fn check_valid_config_metadata(&self, _metadata: &DeploymentMetadata) -> Result<()> {
        Ok(())
    }

    /// Inject global attributes, including `filename`.
    fn write_metadata(&self, mut ds: Dataset, metadata: &DeploymentMetadata) -> Result<Dataset> {
        for (key, value) in &metadata.global {
            ds.set_attr(key.clone(), value.clone());
        }
        if let Some(conventions) = &metadata.conventions {
            ds.set_attr("Conventions", conventions.as_str());
        }
        ds.set_attr("filename", metadata.filename.as_str());
        Ok(ds)
    }

    fn ensure_cf(&self, ds: Dataset) -> Result<Dataset> {
        Ok(ds)
    }

    fn check_compliance(&self, _path: &Path, _conventions: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn check_attrs(&self, ds: Dataset, _inst_type: &str) -> Result<Dataset> {
        Ok(ds)
    }

    fn atmos_correct(&self, ds: Dataset, atmpres: &Path) -> Result<Dataset> {
        warn!(
            "no atmospheric correction available, ignoring {}",
            atmpres.display()
        );
        Ok(ds)
    }

    fn ds_add_attrs(&self, ds: Dataset) -> Result<Dataset> {
        Ok(ds)
    }

    fn sg_qaqc(&self, ds: Dataset) -> Result<Dataset> {
        Ok(ds)
    }

    fn clip_ds(&self, ds: Dataset) -> Result<Dataset> {
        Ok(ds)
    }

    fn ds_add_lat_lon(&self, ds: Dataset) -> Result<Dataset> {
        Ok(ds)
    }

    fn create_nominal_instrument_depth(&self, ds: Dataset) -> Result<Dataset> {
        Ok(ds)
    }

    fn create_z(&self, ds: Dataset) -> Result<Dataset> {
        Ok(ds)
    }

    fn add_start_stop_time(&self, mut ds: Dataset) -> Result<Dataset> {
        if let (Some(first), Some(last)) = (ds.time().first(), ds.time().last()) {
            let start = first.format(TIMESTAMP_FORMAT).to_string();
            let stop = last.format(TIMESTAMP_FORMAT).to_string();
            ds.set_attr("start_time", start);
            ds.set_attr("stop_time", stop);
        }
        Ok(ds)
    }

    /// Per-variable `minimum` / `maximum` over finite values.
    fn add_min_max(&self, mut ds: Dataset) -> Result<Dataset> {
        for (_, var) in ds.variables_mut().filter(|(_, v)| v.is_time_dependent()) {
            let finite = var.data.iter().copied().filter(|v| v.is_finite());
            let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
            if min <= max {
                var.set_attr("minimum", min);
                var.set_attr("maximum", max);
            }
        }
        Ok(ds)
    }

    /// `DELTA_T`: the most common whole-second spacing between samples.
    fn add_delta_t(&self, mut ds: Dataset) -> Result<Dataset> {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for pair in ds.time().windows(2) {
            *counts.entry((pair[1] - pair[0]).num_seconds()).or_default() += 1;
        }
        let mode = counts
            .into_iter()
            .max_by_key(|&(step, count)| (count, std::cmp::Reverse(step)));
        if let Some((step, _)) = mode {
            ds.set_attr("DELTA_T", AttrValue::Integer(step));
        }
        Ok(ds)
    }
}

/// The default collaborator set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicStages;

impl Stages for BasicStages {}
