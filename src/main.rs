//! Command-line interface for mooring instrument conversion.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use mooring_convert::{DeploymentMetadata, JsonExportLoader, Pipeline};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert moored instrument output to labeled archives",
    long_about = "Converts Seagauge tide records and Signature ADCP exports into raw archives,\n\
                  and finishes tide raw archives into distributable archives."
)]
struct Args {
    /// Directory that relative file names are resolved against
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert `<basefile>.tid` into `<filename>-tide-raw.cdf`
    TideRaw {
        /// Deployment metadata (TOML)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Finish a tide raw archive into `<filename>r-a.nc`
    TideFinal {
        /// Tide raw archive
        #[arg(value_name = "RAW_CDF")]
        cdf: PathBuf,

        /// Atmospheric pressure file for the optional correction
        #[arg(long)]
        atmpres: Option<PathBuf>,
    },

    /// Convert `<basefile>_<n>.<ext>` Signature exports into raw archives
    SigRaw {
        /// Deployment metadata (TOML)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Extension of the chunk export files
        #[arg(long, default_value = "json")]
        ext: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let pipeline = Pipeline::new().root(&args.root);
    let start = Instant::now();

    match args.command {
        Command::TideRaw { config } => {
            let metadata = DeploymentMetadata::from_file(&config)?;
            let (_, stats) = pipeline.tide_to_cdf(&metadata)?;
            info!("{}", stats.summary());
        }
        Command::TideFinal { cdf, atmpres } => {
            let (_, stats) = pipeline.tide_cdf_to_nc(&cdf, atmpres.as_deref())?;
            info!("Done writing {}", stats.path.display());
        }
        Command::SigRaw { config, ext } => {
            let metadata = DeploymentMetadata::from_file(&config)?;
            let summary = pipeline.signature_to_cdf(&metadata, &JsonExportLoader, &ext)?;
            for chunk in &summary.chunks {
                for field in &chunk.report.unclassified {
                    info!("chunk {}: not placed: {}", chunk.number, field);
                }
            }
            for combined in &summary.combined {
                info!(
                    "{}: {} chunk(s), {} sample(s)",
                    combined.kind, combined.report.chunks, combined.report.samples
                );
            }
        }
    }

    info!("🏁 Finished in {:.2?}", start.elapsed());
    Ok(())
}
