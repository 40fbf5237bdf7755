//! Deployment metadata supplied by the operator.
//!
//! ```toml
//! basefile = "raw/SIG1234"
//! filename = "1234sig"
//! prefix = ""
//! outdir = "chunks/"
//! Conventions = "CF-1.8"
//!
//! [global]
//! MOORING = "1234"
//! latitude = 41.5
//!
//! [config]
//! initial_instrument_height = 0.25
//! ```

use crate::dataset::{AttrValue, Attrs};
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeploymentMetadata {
    /// Input file stem, without chunk suffix or extension.
    pub basefile: String,
    /// Output file stem, injected as the `filename` global attribute.
    pub filename: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub outdir: String,
    #[serde(rename = "Conventions", default)]
    pub conventions: Option<String>,
    /// Global attributes copied onto every dataset.
    #[serde(default)]
    pub global: Attrs,
    /// Instrument settings checked by the config validator.
    #[serde(default)]
    pub config: Attrs,
}

impl DeploymentMetadata {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Input stem with the file-naming prefix applied.
    pub fn prefixed_basefile(&self) -> String {
        format!("{}{}", self.prefix, self.basefile)
    }

    /// Copy of this metadata with extra global attributes merged in; keys
    /// already present are replaced.
    pub fn with_globals(&self, extra: Attrs) -> Self {
        let mut merged = self.clone();
        merged.global.extend(extra);
        merged
    }

    pub fn global_attr(&self, name: &str) -> Option<&AttrValue> {
        self.global.get(name)
    }
}
