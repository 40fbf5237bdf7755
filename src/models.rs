use crate::dataset::AttrValue;
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Numeric export field; axis 0 is the sample index.
pub type FieldArray = ArrayD<f64>;

/// A single `Config` setting from an instrument export.
///
/// Booleans are frequently encoded as the strings `"True"` / `"False"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
    /// `null`, nested objects, ragged or higher-rank arrays.
    Other(serde_json::Value),
}

impl ConfigValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            ConfigValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            ConfigValue::Text(s) => s.trim().parse().ok(),
            ConfigValue::Vector(_) | ConfigValue::Matrix(_) | ConfigValue::Other(_) => None,
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            ConfigValue::Flag(b) => *b,
            ConfigValue::Number(n) => *n != 0.0,
            ConfigValue::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
            ConfigValue::Vector(_) | ConfigValue::Matrix(_) | ConfigValue::Other(_) => false,
        }
    }

    /// Attribute form of the setting. Matrices are structured, so they are
    /// stored as their textual rendering.
    pub fn to_attr(&self) -> AttrValue {
        match self {
            ConfigValue::Flag(b) => AttrValue::Text(if *b { "True" } else { "False" }.to_string()),
            ConfigValue::Number(n) => AttrValue::Number(*n),
            ConfigValue::Text(s) => AttrValue::Text(s.clone()),
            ConfigValue::Vector(v) => AttrValue::Numbers(v.clone()),
            ConfigValue::Matrix(m) => AttrValue::Text(format!("{:?}", m)),
            ConfigValue::Other(v) => AttrValue::Text(v.to_string()),
        }
    }

    /// Array form of a vector or matrix setting.
    pub fn to_array(&self) -> Result<Option<ArrayD<f64>>> {
        match self {
            ConfigValue::Vector(v) => Ok(Some(ArrayD::from_shape_vec(IxDyn(&[v.len()]), v.clone())?)),
            ConfigValue::Matrix(rows) => {
                let ncols = rows.first().map_or(0, Vec::len);
                if rows.iter().any(|r| r.len() != ncols) {
                    return Err(Error::Schema("ragged matrix in Config".to_string()));
                }
                let flat: Vec<f64> = rows.iter().flatten().copied().collect();
                Ok(Some(Array2::from_shape_vec((rows.len(), ncols), flat)?.into_dyn()))
            }
            _ => Ok(None),
        }
    }
}

/// Output of the upstream export loader: four keyed tables.
#[derive(Debug, Clone, Default)]
pub struct RawExport {
    pub config: BTreeMap<String, ConfigValue>,
    pub data: BTreeMap<String, FieldArray>,
    pub descriptions: BTreeMap<String, String>,
    pub units: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawExportDocument {
    #[serde(rename = "Config", default)]
    config: BTreeMap<String, ConfigValue>,
    #[serde(rename = "Data", default)]
    data: BTreeMap<String, serde_json::Value>,
    #[serde(rename = "Descriptions", default)]
    descriptions: BTreeMap<String, String>,
    #[serde(rename = "Units", default)]
    units: BTreeMap<String, String>,
}

impl RawExport {
    /// Decode the JSON rendering of an export.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let doc: RawExportDocument = serde_json::from_slice(bytes)?;
        let mut data = BTreeMap::new();
        for (key, value) in doc.data {
            let array = array_from_json(&value)
                .map_err(|e| Error::Parse(format!("Data field '{}': {}", key, e)))?;
            data.insert(key, array);
        }
        Ok(Self {
            config: doc.config,
            data,
            descriptions: doc.descriptions,
            units: doc.units,
        })
    }

    /// Numeric `Config` setting; missing or non-numeric settings are a
    /// schema error.
    pub fn config_f64(&self, key: &str) -> Result<f64> {
        self.config
            .get(key)
            .ok_or_else(|| Error::Schema(format!("Config has no '{}' setting", key)))?
            .as_f64()
            .ok_or_else(|| Error::Schema(format!("Config setting '{}' is not numeric", key)))
    }

    /// Boolean `Config` setting; absent means false.
    pub fn config_flag(&self, key: &str) -> bool {
        self.config.get(key).is_some_and(ConfigValue::is_true)
    }
}

/// Convert nested JSON arrays into a dense array. `null` leaves become NaN.
pub fn array_from_json(value: &serde_json::Value) -> Result<ArrayD<f64>> {
    let mut shape = Vec::new();
    let mut cursor = value;
    while let serde_json::Value::Array(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None => break,
        }
    }

    let mut flat = Vec::with_capacity(shape.iter().product());
    flatten_json(value, 0, &shape, &mut flat)?;
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), flat)?)
}

fn flatten_json(
    value: &serde_json::Value,
    depth: usize,
    shape: &[usize],
    out: &mut Vec<f64>,
) -> Result<()> {
    if depth == shape.len() {
        return match value {
            serde_json::Value::Number(n) => {
                out.push(n.as_f64().unwrap_or(f64::NAN));
                Ok(())
            }
            serde_json::Value::Null => {
                out.push(f64::NAN);
                Ok(())
            }
            serde_json::Value::Bool(b) => {
                out.push(if *b { 1.0 } else { 0.0 });
                Ok(())
            }
            other => Err(Error::Parse(format!("expected a number, found {}", other))),
        };
    }

    match value {
        serde_json::Value::Array(items) if items.len() == shape[depth] => {
            for item in items {
                flatten_json(item, depth + 1, shape, out)?;
            }
            Ok(())
        }
        serde_json::Value::Array(items) => Err(Error::Parse(format!(
            "ragged array: expected {} element(s) at depth {}, found {}",
            shape[depth],
            depth,
            items.len()
        ))),
        other => Err(Error::Parse(format!(
            "expected an array at depth {}, found {}",
            depth, other
        ))),
    }
}
