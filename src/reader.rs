//! High-level API for reading instrument files.

use crate::dataset::{Attrs, Dataset};
use crate::error::{Error, Result};
use crate::models::RawExport;
use crate::tide::{parse_hex_header, parse_records, records_to_dataset};
use log::{info, warn};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Source of [`RawExport`]s for one chunk file.
///
/// The crate does not decode vendor binary formats itself; any loader that
/// produces the four-table structure can drive the Signature pipeline.
pub trait ExportLoader {
    fn load(&self, path: &Path) -> Result<RawExport>;
}

/// Loads exports rendered as JSON:
/// `{"Config": {..}, "Data": {..}, "Descriptions": {..}, "Units": {..}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExportLoader;

impl ExportLoader for JsonExportLoader {
    fn load(&self, path: &Path) -> Result<RawExport> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        RawExport::from_json_slice(&mmap)
    }
}

/// One numbered chunk of a deployment export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub number: u64,
    pub path: PathBuf,
}

/// Integer embedded after the last underscore of the file stem.
pub fn chunk_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once('_')?;
    suffix.parse().ok()
}

/// Order chunks by their numeric suffix; listing order is never trusted.
pub fn sort_chunks(paths: impl IntoIterator<Item = PathBuf>) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = paths
        .into_iter()
        .filter_map(|path| match chunk_number(&path) {
            Some(number) => Some(Chunk { number, path }),
            None => {
                warn!("skipping {}: no numeric chunk suffix", path.display());
                None
            }
        })
        .collect();
    chunks.sort_by_key(|c| c.number);
    chunks
}

/// Find `<base>_<n>.<ext>` files and return them in ascending `n` order.
pub fn discover_chunks(base: &str, ext: &str) -> Result<Vec<Chunk>> {
    let pattern = format!("{}_*.{}", glob::Pattern::escape(base), ext);
    let mut paths = Vec::new();
    for entry in glob::glob(&pattern)? {
        paths.push(entry?);
    }
    Ok(sort_chunks(paths))
}

/// Reader for a Seagauge deployment (`<base>.tid` plus optional `<base>.hex`).
pub struct TideReader {
    tid_path: PathBuf,
    hex_path: PathBuf,
}

impl TideReader {
    /// Create a reader for `<base>.tid` / `<base>.hex`.
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref().as_os_str().to_owned();
        let mut tid = base.clone();
        tid.push(".tid");
        let mut hex = base;
        hex.push(".hex");
        Self {
            tid_path: PathBuf::from(tid),
            hex_path: PathBuf::from(hex),
        }
    }

    /// Header metadata from the `.hex` file; empty when it does not exist.
    pub fn hex_metadata(&self) -> Result<Attrs> {
        if !self.hex_path.exists() {
            warn!("{} not found, no hex metadata", self.hex_path.display());
            return Ok(Attrs::new());
        }
        let text = std::fs::read_to_string(&self.hex_path)?;
        Ok(parse_hex_header(&text))
    }

    /// Parse the `.tid` records into the raw tide dataset.
    pub fn read_dataset(&self) -> Result<Dataset> {
        let text = std::fs::read_to_string(&self.tid_path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", self.tid_path.display(), e),
            ))
        })?;
        let records = parse_records(&text)?;
        info!("read {} tide record(s) from {}", records.len(), self.tid_path.display());
        records_to_dataset(&records)
    }
}
