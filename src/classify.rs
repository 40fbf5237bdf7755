//! Classification of export `Data` fields into dataset variables.
//!
//! Every key of the `Data` table is resolved exactly once against a fixed
//! table of rules. The outcome is either a placement (variable name plus
//! dimension names), an explicit skip, or an [`Unclassified`] entry that keeps
//! the export key and shape so the rule table can be extended later.

use crate::burst::BurstType;
use crate::dataset::TIME_DIM;
use log::debug;
use std::fmt;

/// Dimension name of the profiling-cell coordinate.
pub const BINDIST_DIM: &str = "bindist";

/// A per-sample vector with its own private index dimension.
///
/// The dimension is sized to the observed width; `width` is the nominal
/// size for the instrument and only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedVector {
    pub field: &'static str,
    pub dim: &'static str,
    pub width: usize,
}

/// Recognised fixed-width vector families.
pub const FIXED_VECTORS: [FixedVector; 3] = [
    FixedVector {
        field: "AHRSRotationMatrix",
        dim: "dimRM",
        width: 9,
    },
    FixedVector {
        field: "Magnetometer",
        dim: "dimM",
        width: 3,
    },
    FixedVector {
        field: "Accelerometer",
        dim: "dimA",
        width: 3,
    },
];

pub fn fixed_vector(field: &str) -> Option<&'static FixedVector> {
    FIXED_VECTORS.iter().find(|v| v.field == field)
}

/// Why a field did not become a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnclassifiedReason {
    /// The prefix is not one of the recognised burst types.
    UnknownPrefix,
    /// Rank 0 or rank 3 and above.
    UnsupportedRank,
    /// Rank-2 field matching neither a fixed vector nor the cell count.
    UnmatchedSecondAxis { cells: Option<usize> },
    /// Axis 0 does not match the burst type's sample count.
    SampleCountMismatch { samples: usize },
    /// Classified, but the dataset rejected its axes.
    DimensionConflict { detail: String },
}

impl fmt::Display for UnclassifiedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnclassifiedReason::UnknownPrefix => f.write_str("missing variable (unknown burst-type prefix)"),
            UnclassifiedReason::UnsupportedRank => f.write_str("unsupported rank"),
            UnclassifiedReason::UnmatchedSecondAxis { cells: Some(n) } => {
                write!(f, "second axis does not match {} cell(s)", n)
            }
            UnclassifiedReason::UnmatchedSecondAxis { cells: None } => {
                f.write_str("second axis is not a recognised vector and the burst type has no cells")
            }
            UnclassifiedReason::SampleCountMismatch { samples } => {
                write!(f, "axis 0 does not match {} time sample(s)", samples)
            }
            UnclassifiedReason::DimensionConflict { detail } => f.write_str(detail),
        }
    }
}

/// A field that was recorded but not attached to any dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unclassified {
    pub key: String,
    pub shape: Vec<usize>,
    pub reason: UnclassifiedReason,
}

impl fmt::Display for Unclassified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}: {}", self.key, self.shape, self.reason)
    }
}

/// Where a classified field lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub kind: BurstType,
    pub name: String,
    pub dims: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The burst type's time stamps, consumed when building the time axis.
    TimeAxis(BurstType),
    /// A recognised but disabled burst type; ignored entirely.
    Disabled(BurstType),
    Attach(Placement),
    Unclassified(Unclassified),
}

/// What the classifier knows about one enabled burst type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstShape {
    pub kind: BurstType,
    pub samples: usize,
    /// Cell count from the first sample, `None` for types without cells.
    pub cells: Option<usize>,
}

/// Split `<BurstType>_<Field>` into its parts.
pub fn split_key(key: &str) -> Option<(BurstType, &str)> {
    let (prefix, field) = key.split_once('_')?;
    Some((BurstType::from_prefix(prefix)?, field))
}

/// Classify a single `Data` field. `shapes` describes the enabled burst types.
pub fn classify(key: &str, shape: &[usize], shapes: &[BurstShape]) -> Classification {
    let unclassified = |reason| {
        Classification::Unclassified(Unclassified {
            key: key.to_string(),
            shape: shape.to_vec(),
            reason,
        })
    };

    let Some((kind, field)) = split_key(key) else {
        return unclassified(UnclassifiedReason::UnknownPrefix);
    };
    let Some(burst) = shapes.iter().find(|s| s.kind == kind) else {
        return Classification::Disabled(kind);
    };
    if field == "Time" {
        return Classification::TimeAxis(kind);
    }

    let placement = |dims: &[&str]| {
        Classification::Attach(Placement {
            kind,
            name: field.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
        })
    };

    match shape {
        [n, ..] if *n != burst.samples => unclassified(UnclassifiedReason::SampleCountMismatch {
            samples: burst.samples,
        }),
        [_] => placement(&[TIME_DIM]),
        [_, width] => match fixed_vector(field) {
            Some(vector) => {
                if vector.width != *width {
                    debug!(
                        "{} has {} element(s) per sample, nominally {}",
                        key, width, vector.width
                    );
                }
                placement(&[TIME_DIM, vector.dim])
            }
            None if burst.cells == Some(*width) => placement(&[TIME_DIM, BINDIST_DIM]),
            None => unclassified(UnclassifiedReason::UnmatchedSecondAxis { cells: burst.cells }),
        },
        _ => unclassified(UnclassifiedReason::UnsupportedRank),
    }
}

/// Outcome of classifying one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    /// Fields attached as variables, as `(burst type, variable name)`.
    pub attached: Vec<(BurstType, String)>,
    /// Fields belonging to a disabled burst type.
    pub ignored: Vec<String>,
    pub unclassified: Vec<Unclassified>,
}

impl ClassificationReport {
    /// Unclassified fields whose prefix matched no burst type.
    pub fn unknown_prefix(&self) -> impl Iterator<Item = &Unclassified> {
        self.unclassified
            .iter()
            .filter(|u| u.reason == UnclassifiedReason::UnknownPrefix)
    }

    /// Unclassified fields rejected because of their shape.
    pub fn shape_rejected(&self) -> impl Iterator<Item = &Unclassified> {
        self.unclassified
            .iter()
            .filter(|u| u.reason != UnclassifiedReason::UnknownPrefix)
    }

    pub fn is_unclassified(&self, key: &str) -> bool {
        self.unclassified.iter().any(|u| u.key == key)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} field(s) attached, {} ignored, {} unclassified",
            self.attached.len(),
            self.ignored.len(),
            self.unclassified.len()
        )
    }
}
