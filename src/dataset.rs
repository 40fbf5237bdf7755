//! In-memory labeled array container shared by every pipeline.
//!
//! A [`Dataset`] owns a `time` axis plus a set of named [`Variable`]s, each of
//! which declares the dimension name of every axis. Dimension lengths are
//! tracked so that two variables can never disagree about the size of a
//! shared dimension.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayD};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name of the leading sample dimension.
pub const TIME_DIM: &str = "time";

/// Dataset- or variable-level attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Integer(i) => Some(*i as f64),
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(s) => s.trim().parse().ok(),
            AttrValue::Numbers(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Integer(i) => write!(f, "{}", i),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Numbers(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;

/// A named n-dimensional array with one dimension name per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub attrs: Attrs,
}

impl Variable {
    /// Build a variable, checking that every axis has a dimension name.
    pub fn new<S: Into<String>>(dims: Vec<S>, data: ArrayD<f64>) -> Result<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != data.ndim() {
            return Err(Error::Shape(format!(
                "{} dimension name(s) given for a rank-{} array",
                dims.len(),
                data.ndim()
            )));
        }
        Ok(Self {
            dims,
            data,
            attrs: Attrs::new(),
        })
    }

    /// A 1-D variable along `dim`.
    pub fn from_vec(dim: &str, values: Vec<f64>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            data: Array1::from(values).into_dyn(),
            attrs: Attrs::new(),
        }
    }

    /// Whether the leading axis is the time dimension.
    pub fn is_time_dependent(&self) -> bool {
        self.dims.first().map(String::as_str) == Some(TIME_DIM)
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Set `name` only if the variable does not carry it yet.
    ///
    /// Returns `true` when the attribute was written.
    pub fn set_attr_if_absent(&mut self, name: &str, value: impl Into<AttrValue>) -> bool {
        if self.attrs.contains_key(name) {
            return false;
        }
        self.attrs.insert(name.to_string(), value.into());
        true
    }
}

/// Labeled array container: a time axis, variables, coordinates and
/// global attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    time: Vec<NaiveDateTime>,
    dims: BTreeMap<String, usize>,
    variables: BTreeMap<String, Variable>,
    coords: BTreeSet<String>,
    pub attrs: Attrs,
    /// Attributes of the `time` coordinate itself (`units`, `long_name`).
    pub time_attrs: Attrs,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dataset whose only initial coordinate is `time`.
    pub fn with_time(time: Vec<NaiveDateTime>) -> Self {
        let mut dims = BTreeMap::new();
        dims.insert(TIME_DIM.to_string(), time.len());
        Self {
            time,
            dims,
            ..Self::default()
        }
    }

    pub fn time(&self) -> &[NaiveDateTime] {
        &self.time
    }

    /// Number of time samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims.get(dim).copied()
    }

    pub fn dims(&self) -> &BTreeMap<String, usize> {
        &self.dims
    }

    /// Add (or replace) a variable after checking its axes against the
    /// known dimension sizes.
    pub fn insert_variable(&mut self, name: impl Into<String>, variable: Variable) -> Result<()> {
        let name = name.into();
        self.check_dims(&name, &variable)?;
        for (dim, len) in variable.dims.iter().zip(variable.data.shape()) {
            self.dims.insert(dim.clone(), *len);
        }
        self.variables.insert(name, variable);
        Ok(())
    }

    /// Add a 1-D coordinate variable whose dimension shares its name.
    pub fn insert_coord(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.insert_coord_variable(name, Variable::from_vec(name, values))
    }

    /// Add a coordinate that already carries attributes.
    pub fn insert_coord_variable(&mut self, name: &str, variable: Variable) -> Result<()> {
        self.insert_variable(name, variable)?;
        self.coords.insert(name.to_string());
        Ok(())
    }

    fn check_dims(&self, name: &str, variable: &Variable) -> Result<()> {
        let replaced = self.variables.get(name);
        for (dim, len) in variable.dims.iter().zip(variable.data.shape()) {
            let Some(&known) = self.dims.get(dim) else {
                continue;
            };
            if known == *len {
                continue;
            }
            // Replacing the sole user of a private dimension may resize it.
            let sole_user = replaced.is_some_and(|old| old.dims.contains(dim))
                && dim != TIME_DIM
                && !self
                    .variables
                    .iter()
                    .any(|(other, v)| other != name && v.dims.contains(dim));
            if !sole_user {
                return Err(Error::Shape(format!(
                    "variable '{}' has {} element(s) along '{}', dataset has {}",
                    name, len, dim, known
                )));
            }
        }
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn is_coord(&self, name: &str) -> bool {
        self.coords.contains(name)
    }

    /// Iterate variables (coordinates included) in name order.
    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }

    pub fn variables_mut(&mut self) -> impl Iterator<Item = (&String, &mut Variable)> {
        self.variables.iter_mut()
    }

    /// Remove a variable, dropping any private dimension nothing else uses.
    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        let removed = self.variables.remove(name)?;
        self.coords.remove(name);
        for dim in &removed.dims {
            let used = dim == TIME_DIM || self.variables.values().any(|v| v.dims.contains(dim));
            if !used {
                self.dims.remove(dim);
            }
        }
        Some(removed)
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// The burst-type name stored in `data_type`, if any.
    pub fn data_type(&self) -> Option<&str> {
        self.attr("data_type").and_then(AttrValue::as_str)
    }

    /// The `filename` global attribute injected by `write_metadata`.
    pub fn filename(&self) -> Result<&str> {
        self.attr("filename")
            .and_then(AttrValue::as_str)
            .ok_or_else(|| Error::Schema("dataset has no 'filename' attribute".to_string()))
    }
}
