//! Concatenation of per-chunk archives into one deployment-length dataset.

use crate::burst::BurstType;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::formats::read_archive;
use crate::reader::Chunk;
use chrono::NaiveDateTime;
use log::{info, warn};
use ndarray::{concatenate, ArrayViewD, Axis};
use std::path::{Path, PathBuf};

/// What happened while concatenating chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub chunks: usize,
    pub samples: usize,
    /// Chunk boundaries where the next chunk does not start after the
    /// previous one ended. Samples are kept as they are.
    pub overlaps: usize,
    /// Variables without a time axis, taken from the first chunk.
    pub time_invariant: Vec<String>,
    /// Variables missing from the first chunk, left out of the result.
    pub dropped: Vec<String>,
}

/// Chunk number of a per-chunk archive named `...-<data_type>-<n>-raw.cdf`.
pub fn archive_chunk_number(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix("-raw.cdf")?;
    let (_, number) = stem.rsplit_once('-')?;
    number.parse().ok()
}

/// Find the per-chunk archives of `kind` whose names start with `stem`
/// (`<outdir><prefix><filename>`), sorted by chunk number.
pub fn discover_chunk_archives(stem: &str, kind: BurstType) -> Result<Vec<Chunk>> {
    let pattern = format!("{}-{}-*-raw.cdf", glob::Pattern::escape(stem), kind.name());
    let mut chunks = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        match archive_chunk_number(&path) {
            Some(number) => chunks.push(Chunk { number, path }),
            None => warn!("skipping {}: no chunk number", path.display()),
        }
    }
    chunks.sort_by_key(|c| c.number);
    Ok(chunks)
}

/// Concatenate datasets along `time`, in the order given.
///
/// Time-dependent variables are stacked; variables without a time axis
/// (coordinates, calibration matrices) keep the first dataset's value.
/// Attributes come from the first dataset.
pub fn concat_time(datasets: &[Dataset]) -> Result<(Dataset, MergeReport)> {
    let first = datasets
        .first()
        .ok_or_else(|| Error::Other("no datasets to concatenate".to_string()))?;
    let mut report = MergeReport {
        chunks: datasets.len(),
        ..MergeReport::default()
    };

    let mut time: Vec<NaiveDateTime> = Vec::with_capacity(datasets.iter().map(Dataset::len).sum());
    for (idx, ds) in datasets.iter().enumerate() {
        if let (Some(prev), Some(next)) = (time.last(), ds.time().first()) {
            if next <= prev {
                warn!(
                    "chunk {} starts at {} but the previous chunk ends at {}",
                    idx, next, prev
                );
                report.overlaps += 1;
            }
        }
        time.extend_from_slice(ds.time());
    }
    report.samples = time.len();

    let mut merged = Dataset::with_time(time);
    merged.attrs = first.attrs.clone();
    merged.time_attrs = first.time_attrs.clone();

    for (name, var) in first.variables() {
        let mut variable = var.clone();
        if var.is_time_dependent() {
            let mut views: Vec<ArrayViewD<'_, f64>> = Vec::with_capacity(datasets.len());
            for (idx, ds) in datasets.iter().enumerate() {
                let other = ds.variable(name).ok_or_else(|| {
                    Error::Schema(format!("variable '{}' is missing from chunk {}", name, idx))
                })?;
                if other.dims != var.dims {
                    return Err(Error::Shape(format!(
                        "variable '{}' has dims {:?} in chunk {}, expected {:?}",
                        name, other.dims, idx, var.dims
                    )));
                }
                views.push(other.data.view());
            }
            variable.data = concatenate(Axis(0), &views)?;
        } else {
            let differs = datasets[1..]
                .iter()
                .any(|ds| ds.variable(name).is_some_and(|v| v.data != var.data));
            if differs {
                warn!("'{}' differs between chunks, keeping the first chunk's value", name);
            }
            report.time_invariant.push(name.clone());
        }

        if first.is_coord(name) {
            merged.insert_coord_variable(name, variable)?;
        } else {
            merged.insert_variable(name.as_str(), variable)?;
        }
    }

    for ds in &datasets[1..] {
        for (name, _) in ds.variables() {
            if !first.contains(name) && !report.dropped.contains(name) {
                warn!("'{}' is not in the first chunk, leaving it out", name);
                report.dropped.push(name.clone());
            }
        }
    }

    Ok((merged, report))
}

fn read_chunks(paths: &[PathBuf]) -> Result<Vec<Dataset>> {
    paths.iter().map(|p| read_archive(p)).collect()
}

/// Read sorted chunk archives and concatenate them.
pub fn merge_archives(chunks: &[Chunk]) -> Result<(Dataset, MergeReport)> {
    let mut sorted = chunks.to_vec();
    sorted.sort_by_key(|c| c.number);
    let paths: Vec<PathBuf> = sorted.into_iter().map(|c| c.path).collect();
    info!("merging {} chunk archive(s)", paths.len());
    concat_time(&read_chunks(&paths)?)
}

/// Like [`merge_archives`], opening the archives concurrently.
#[cfg(feature = "tokio-runtime")]
pub async fn merge_archives_parallel(chunks: &[Chunk]) -> Result<(Dataset, MergeReport)> {
    let mut sorted = chunks.to_vec();
    sorted.sort_by_key(|c| c.number);

    let handles: Vec<_> = sorted
        .into_iter()
        .map(|c| tokio::task::spawn_blocking(move || read_archive(&c.path)))
        .collect();

    let mut datasets = Vec::with_capacity(handles.len());
    for handle in handles {
        let ds = handle
            .await
            .map_err(|e| Error::Other(format!("archive reader task failed: {}", e)))??;
        datasets.push(ds);
    }
    concat_time(&datasets)
}
