//! Signature burst types and the settings that derive from them.

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::models::RawExport;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;

pub const BURST_ENABLED_KEY: &str = "Plan_BurstEnabled";
pub const RAW_ALTIMETER_KEY: &str = "Burst_RawAltimeter";
pub const BEAM_COUNT_KEY: &str = "Burst_NBeams";
pub const BLANKING_DISTANCE_KEY: &str = "Burst_BlankingDistance";
pub const CELL_SIZE_KEY: &str = "Burst_CellSize";
pub const CELL_COUNT_KEY: &str = "Burst_NCells";

/// Beam count that switches on interleaved bursts.
const INTERLEAVED_BEAM_COUNT: f64 = 5.0;

/// Measurement mode of a Signature instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BurstType {
    BurstRawAltimeter,
    IBurst,
    Burst,
}

impl BurstType {
    pub const ALL: [BurstType; 3] = [BurstType::BurstRawAltimeter, BurstType::IBurst, BurstType::Burst];

    /// Field-name prefix in the export `Data` table, also the `data_type`.
    pub fn name(self) -> &'static str {
        match self {
            BurstType::BurstRawAltimeter => "BurstRawAltimeter",
            BurstType::IBurst => "IBurst",
            BurstType::Burst => "Burst",
        }
    }

    pub fn short_key(self) -> &'static str {
        match self {
            BurstType::BurstRawAltimeter => "dsbra",
            BurstType::IBurst => "dsi",
            BurstType::Burst => "dsb",
        }
    }

    /// Suffix used in the combined archive name.
    pub fn combined_suffix(self) -> &'static str {
        match self {
            BurstType::BurstRawAltimeter => "burstrawalt",
            BurstType::IBurst => "iburst",
            BurstType::Burst => "burst",
        }
    }

    /// Whether this mode measures profiling cells along `bindist`.
    pub fn has_cells(self) -> bool {
        match self {
            BurstType::BurstRawAltimeter => false,
            BurstType::IBurst | BurstType::Burst => true,
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == prefix)
    }

    pub fn time_key(self) -> String {
        format!("{}_Time", self.name())
    }

    pub fn cell_count_key(self) -> String {
        format!("{}_NCells", self.name())
    }

    /// Burst types switched on by the export's `Config` block, in
    /// [`BurstType::ALL`] order.
    pub fn enabled(export: &RawExport) -> Vec<BurstType> {
        if !export.config_flag(BURST_ENABLED_KEY) {
            return Vec::new();
        }
        let raw_altimeter = export
            .config
            .get(RAW_ALTIMETER_KEY)
            .and_then(|v| v.as_f64())
            .is_some_and(|v| v == 1.0);
        let interleaved = export
            .config
            .get(BEAM_COUNT_KEY)
            .and_then(|v| v.as_f64())
            .is_some_and(|v| v == INTERLEAVED_BEAM_COUNT);

        Self::ALL
            .into_iter()
            .filter(|t| match t {
                BurstType::BurstRawAltimeter => raw_altimeter,
                BurstType::IBurst => interleaved,
                BurstType::Burst => true,
            })
            .collect()
    }
}

impl fmt::Display for BurstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One burst-type dataset built from a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum BurstDataset {
    RawAltimeter(Dataset),
    IBurst(Dataset),
    Burst(Dataset),
}

impl BurstDataset {
    pub fn new(kind: BurstType, dataset: Dataset) -> Self {
        match kind {
            BurstType::BurstRawAltimeter => BurstDataset::RawAltimeter(dataset),
            BurstType::IBurst => BurstDataset::IBurst(dataset),
            BurstType::Burst => BurstDataset::Burst(dataset),
        }
    }

    pub fn kind(&self) -> BurstType {
        match self {
            BurstDataset::RawAltimeter(_) => BurstType::BurstRawAltimeter,
            BurstDataset::IBurst(_) => BurstType::IBurst,
            BurstDataset::Burst(_) => BurstType::Burst,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        match self {
            BurstDataset::RawAltimeter(ds) | BurstDataset::IBurst(ds) | BurstDataset::Burst(ds) => ds,
        }
    }

    pub fn dataset_mut(&mut self) -> &mut Dataset {
        match self {
            BurstDataset::RawAltimeter(ds) | BurstDataset::IBurst(ds) | BurstDataset::Burst(ds) => ds,
        }
    }

    pub fn into_dataset(self) -> Dataset {
        match self {
            BurstDataset::RawAltimeter(ds) | BurstDataset::IBurst(ds) | BurstDataset::Burst(ds) => ds,
        }
    }
}

/// Convert a day-number timestamp (days since year 0, as exported by the
/// instrument software) to a calendar timestamp.
///
/// The integer part is a proleptic Gregorian ordinal offset by the 366 days
/// of year 0; the fractional part is rounded to the microsecond.
pub fn datenum_to_datetime(datenum: f64) -> Result<NaiveDateTime> {
    if !datenum.is_finite() {
        return Err(Error::Parse(format!("invalid datenum {}", datenum)));
    }
    let day = datenum.floor();
    let ordinal = i32::try_from(day as i64)
        .map_err(|_| Error::Parse(format!("datenum {} out of range", datenum)))?;
    let date = NaiveDate::from_num_days_from_ce_opt(ordinal)
        .ok_or_else(|| Error::Parse(format!("datenum {} out of range", datenum)))?;
    let micros = ((datenum - day) * 86_400_000_000.0).round() as i64;

    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Parse(format!("datenum {} out of range", datenum)))?;
    midnight
        .checked_add_signed(Duration::microseconds(micros) - Duration::days(366))
        .ok_or_else(|| Error::Parse(format!("datenum {} out of range", datenum)))
}

/// Build the time axis of `kind` from its `<Type>_Time` field.
pub fn time_axis(export: &RawExport, kind: BurstType) -> Result<Vec<NaiveDateTime>> {
    let key = kind.time_key();
    let field = export
        .data
        .get(&key)
        .ok_or_else(|| Error::Schema(format!("{} is enabled but Data has no '{}'", kind, key)))?;
    if field.ndim() != 1 {
        return Err(Error::Schema(format!(
            "'{}' must be one-dimensional, found shape {:?}",
            key,
            field.shape()
        )));
    }
    field.iter().map(|&d| datenum_to_datetime(d)).collect()
}

/// Distance from the instrument to the centre of each profiling cell:
/// `blanking + cell_size / 2 + cell_size * i`.
pub fn bin_distances(blanking: f64, cell_size: f64, n_cells: usize) -> Vec<f64> {
    (0..n_cells)
        .map(|i| blanking + cell_size / 2.0 + cell_size * i as f64)
        .collect()
}

/// Bin-distance coordinate from the shared burst configuration block.
pub fn config_bin_distances(export: &RawExport) -> Result<Vec<f64>> {
    let blanking = export.config_f64(BLANKING_DISTANCE_KEY)?;
    let cell_size = export.config_f64(CELL_SIZE_KEY)?;
    let n_cells = export.config_f64(CELL_COUNT_KEY)?;
    if n_cells < 0.0 || n_cells.fract() != 0.0 {
        return Err(Error::Schema(format!(
            "'{}' must be a non-negative integer, found {}",
            CELL_COUNT_KEY, n_cells
        )));
    }
    Ok(bin_distances(blanking, cell_size, n_cells as usize))
}
