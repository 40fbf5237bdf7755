//! End-to-end conversions: tide raw, tide final, and Signature raw.

use crate::builder::build_chunk;
use crate::burst::BurstType;
use crate::classify::ClassificationReport;
use crate::dataset::{AttrValue, Dataset};
use crate::error::{Error, Result};
use crate::formats::{read_archive, TimeEncoding};
use crate::merge::{discover_chunk_archives, MergeReport};
use crate::metadata::DeploymentMetadata;
use crate::reader::{discover_chunks, Chunk, ExportLoader, TideReader};
use crate::stages::{BasicStages, Stages};
use crate::writer::{
    chunk_archive_name, combined_archive_name, tide_final_name, tide_raw_name, ArchiveWriter,
    WriteStats,
};
use log::info;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Instrument family passed to `check_attrs` for Signature data.
pub const SIGNATURE_INST_TYPE: &str = "SIG";

/// Sample counter dropped from the final tide archive.
const TIDE_SAMPLE_VARIABLES: [&str; 2] = ["Sample", "burst_number"];

/// Outcome of one Signature chunk.
#[derive(Debug, Clone)]
pub struct ChunkSummary {
    pub number: u64,
    pub report: ClassificationReport,
    pub written: Vec<WriteStats>,
}

/// Outcome of merging one burst type.
#[derive(Debug, Clone)]
pub struct CombinedSummary {
    pub kind: BurstType,
    pub report: MergeReport,
    pub written: WriteStats,
}

#[derive(Debug, Clone, Default)]
pub struct SignatureSummary {
    pub chunks: Vec<ChunkSummary>,
    pub combined: Vec<CombinedSummary>,
}

/// Runs conversions with a set of collaborator [`Stages`].
///
/// Relative file names (basefile, outdir, archive names) are resolved
/// against `root`, which defaults to the working directory.
pub struct Pipeline<S: Stages = BasicStages> {
    root: PathBuf,
    stages: S,
}

impl Pipeline<BasicStages> {
    pub fn new() -> Self {
        Self::with_stages(BasicStages)
    }
}

impl Default for Pipeline<BasicStages> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Stages> Pipeline<S> {
    pub fn with_stages(stages: S) -> Self {
        Self {
            root: PathBuf::from("."),
            stages,
        }
    }

    pub fn root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    pub fn stages(&self) -> &S {
        &self.stages
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn resolve_str(&self, name: &str) -> String {
        self.resolve(name).to_string_lossy().into_owned()
    }

    /// `.tid` (+ `.hex`) → `<filename>-tide-raw.cdf`.
    pub fn tide_to_cdf(&self, metadata: &DeploymentMetadata) -> Result<(Dataset, WriteStats)> {
        self.stages.check_valid_globalatts_metadata(metadata)?;

        let reader = TideReader::new(self.resolve(&metadata.basefile));
        let metadata = metadata.with_globals(reader.hex_metadata()?);

        let ds = reader.read_dataset()?;
        let ds = self.stages.write_metadata(ds, &metadata)?;
        let ds = self.stages.ensure_cf(ds)?;

        let path = self.resolve(&tide_raw_name(ds.filename()?));
        let stats = ArchiveWriter::new().write(&ds, &path)?;
        Ok((ds, stats))
    }

    /// Tide raw archive → `<filename>r-a.nc` with 32-bit integer time.
    pub fn tide_cdf_to_nc(
        &self,
        cdf_path: &Path,
        atmpres: Option<&Path>,
    ) -> Result<(Dataset, WriteStats)> {
        let mut ds = read_archive(cdf_path)?;

        for name in TIDE_SAMPLE_VARIABLES {
            ds.remove_variable(name);
        }

        if let Some(atmpres) = atmpres {
            ds = self.stages.atmos_correct(ds, atmpres)?;
        }

        let ds = self.stages.ds_add_attrs(ds)?;
        let ds = self.stages.sg_qaqc(ds)?;

        let ds = self.stages.clip_ds(ds)?;
        let ds = self.stages.ds_add_lat_lon(ds)?;
        let ds = self.stages.create_nominal_instrument_depth(ds)?;
        let ds = self.stages.create_z(ds)?;
        let ds = self.stages.add_start_stop_time(ds)?;
        let ds = self.stages.add_min_max(ds)?;
        let ds = self.stages.add_delta_t(ds)?;

        info!("Writing cleaned/trimmed data to final archive");
        let path = self.resolve(&tide_final_name(ds.filename()?));
        let stats = ArchiveWriter::new()
            .time_encoding(TimeEncoding::Int32Seconds)
            .write(&ds, &path)?;

        let conventions = ds.attr("Conventions").and_then(AttrValue::as_str);
        self.stages.check_compliance(&path, conventions)?;

        Ok((ds, stats))
    }

    /// Signature chunk exports → per-chunk archives → one combined archive
    /// per burst type.
    ///
    /// Archives already written are left in place if a later step fails.
    pub fn signature_to_cdf(
        &self,
        metadata: &DeploymentMetadata,
        loader: &dyn ExportLoader,
        ext: &str,
    ) -> Result<SignatureSummary> {
        let start = Instant::now();
        self.stages.check_valid_globalatts_metadata(metadata)?;
        self.stages.check_valid_config_metadata(metadata)?;

        let base = self.resolve_str(&metadata.prefixed_basefile());
        let chunks = discover_chunks(&base, ext)?;
        if chunks.is_empty() {
            return Err(Error::Other(format!("no chunk files match {}_*.{}", base, ext)));
        }

        let writer = ArchiveWriter::new();
        let mut summary = SignatureSummary::default();
        let mut produced = BTreeSet::new();

        for chunk in &chunks {
            info!("{}", chunk.path.display());
            let export = loader.load(&chunk.path)?;
            let built = build_chunk(&export)?;
            info!("   ├─ {}", built.report.summary());

            let mut written = Vec::with_capacity(built.datasets.len());
            for burst in built.datasets {
                let kind = burst.kind();
                let ds = self.stages.write_metadata(burst.into_dataset(), metadata)?;
                let ds = self.stages.ensure_cf(ds)?;
                let name = chunk_archive_name(
                    &metadata.outdir,
                    &metadata.prefix,
                    ds.filename()?,
                    kind.name(),
                    chunk.number,
                );
                written.push(writer.write(&ds, self.resolve(&name))?);
                produced.insert(kind);
            }

            summary.chunks.push(ChunkSummary {
                number: chunk.number,
                report: built.report,
                written,
            });
        }

        let stem = self.resolve_str(&format!(
            "{}{}{}",
            metadata.outdir, metadata.prefix, metadata.filename
        ));
        for kind in produced {
            let archives = discover_chunk_archives(&stem, kind)?;
            let (ds, report) = merge_chunks(&archives)?;
            let ds = self.stages.check_attrs(ds, SIGNATURE_INST_TYPE)?;

            info!("writing {} to archive", kind);
            let name = combined_archive_name(&metadata.prefix, ds.filename()?, kind);
            let written = writer.write(&ds, self.resolve(&name))?;
            summary.combined.push(CombinedSummary {
                kind,
                report,
                written,
            });
        }

        info!("elapsed time = {:.0?}", start.elapsed());
        Ok(summary)
    }
}

#[cfg(not(feature = "tokio-runtime"))]
fn merge_chunks(chunks: &[Chunk]) -> Result<(Dataset, MergeReport)> {
    crate::merge::merge_archives(chunks)
}

#[cfg(feature = "tokio-runtime")]
fn merge_chunks(chunks: &[Chunk]) -> Result<(Dataset, MergeReport)> {
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    runtime.block_on(crate::merge::merge_archives_parallel(chunks))
}
