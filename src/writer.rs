//! High-level API for writing datasets to archives.

use crate::burst::BurstType;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::formats::{write_archive, TimeEncoding};
use log::info;
use std::path::{Path, PathBuf};

/// `<outdir><prefix><filename>-<data_type>-<chunk>-raw.cdf`
pub fn chunk_archive_name(
    outdir: &str,
    prefix: &str,
    filename: &str,
    data_type: &str,
    chunk: u64,
) -> String {
    format!("{}{}{}-{}-{}-raw.cdf", outdir, prefix, filename, data_type, chunk)
}

/// `<prefix><filename>_<burst|iburst|burstrawalt>-raw.cdf`
pub fn combined_archive_name(prefix: &str, filename: &str, kind: BurstType) -> String {
    format!("{}{}_{}-raw.cdf", prefix, filename, kind.combined_suffix())
}

/// `<filename>-tide-raw.cdf`
pub fn tide_raw_name(filename: &str) -> String {
    format!("{}-tide-raw.cdf", filename)
}

/// `<filename>r-a.nc`
pub fn tide_final_name(filename: &str) -> String {
    format!("{}r-a.nc", filename)
}

/// Writer for dataset archives.
///
/// # Examples
///
/// ```no_run
/// use mooring_convert::{ArchiveWriter, Dataset, TimeEncoding};
///
/// let ds = Dataset::new();
/// let stats = ArchiveWriter::new()
///     .time_encoding(TimeEncoding::Int32Seconds)
///     .write(&ds, "out/1234r-a.nc")?;
/// println!("{}", stats.summary());
/// # Ok::<(), mooring_convert::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveWriter {
    time_encoding: TimeEncoding,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how the time coordinate is stored. Default is nanosecond
    /// timestamps.
    pub fn time_encoding(mut self, encoding: TimeEncoding) -> Self {
        self.time_encoding = encoding;
        self
    }

    /// Write `ds` to `path`, creating parent directories as needed.
    pub fn write<P: AsRef<Path>>(&self, ds: &Dataset, path: P) -> Result<WriteStats> {
        let path = path.as_ref();
        write_archive(ds, path, self.time_encoding)?;
        let stats = WriteStats {
            path: path.to_path_buf(),
            num_samples: ds.len(),
            num_variables: ds.variables().count(),
        };
        info!("Finished writing data to {}", path.display());
        Ok(stats)
    }
}

/// Statistics about an archive write.
#[derive(Debug, Clone)]
pub struct WriteStats {
    pub path: PathBuf,
    pub num_samples: usize,
    pub num_variables: usize,
}

impl WriteStats {
    pub fn summary(&self) -> String {
        format!(
            "Wrote {} sample(s) of {} variable(s) to {}",
            self.num_samples,
            self.num_variables,
            self.path.display()
        )
    }
}
