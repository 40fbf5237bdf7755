//! # Mooring Convert
//!
//! Converts raw moored-instrument output into self-describing labeled array
//! archives.
//!
//! ## Features
//!
//! - **Seagauge tide records**: `.tid` text parsing with psia → dbar conversion
//! - **Signature exports**: per-burst-type datasets inferred from loosely
//!   named export fields, with a `bindist` coordinate derived from the
//!   instrument configuration
//! - **Chunk merging**: per-chunk archives concatenated in chunk-number order
//! - **Diagnostics**: fields that cannot be placed are reported, never dropped
//!   silently
//!
//! ## Quick Start
//!
//! ```no_run
//! use mooring_convert::{build_chunk, ExportLoader, JsonExportLoader};
//!
//! let export = JsonExportLoader.load("deploy/SIG1234_1.json".as_ref())?;
//! let chunk = build_chunk(&export)?;
//!
//! for burst in &chunk.datasets {
//!     println!("{}: {} samples", burst.kind(), burst.dataset().len());
//! }
//! for field in &chunk.report.unclassified {
//!     println!("not placed: {}", field);
//! }
//! # Ok::<(), mooring_convert::Error>(())
//! ```
//!
//! ## Full deployments
//!
//! ```no_run
//! use mooring_convert::{DeploymentMetadata, JsonExportLoader, Pipeline};
//!
//! let metadata = DeploymentMetadata::from_file("sig_config.toml")?;
//! let summary = Pipeline::new()
//!     .root("deploy")
//!     .signature_to_cdf(&metadata, &JsonExportLoader, "json")?;
//!
//! for combined in &summary.combined {
//!     println!("{}", combined.written.summary());
//! }
//! # Ok::<(), mooring_convert::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, Error>`. Unrecognised export fields are
//! not errors; they are listed in
//! [`ClassificationReport::unclassified`](classify::ClassificationReport).
//!
//! ```no_run
//! use mooring_convert::{Error, Pipeline, DeploymentMetadata};
//!
//! let metadata = DeploymentMetadata::from_file("tide_config.toml")?;
//! match Pipeline::new().tide_to_cdf(&metadata) {
//!     Ok((_, stats)) => println!("{}", stats.summary()),
//!     Err(Error::Parse(msg)) => eprintln!("bad tide record: {}", msg),
//!     Err(err) => eprintln!("Error: {}", err),
//! }
//! # Ok::<(), mooring_convert::Error>(())
//! ```

// Public API modules
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use builder::{build_chunk, ChunkDatasets};
pub use burst::{BurstDataset, BurstType};
pub use dataset::{AttrValue, Dataset, Variable};
pub use error::{Error, Result};
pub use formats::TimeEncoding;
pub use metadata::DeploymentMetadata;
pub use models::{ConfigValue, RawExport};
pub use pipeline::{Pipeline, SignatureSummary};
pub use reader::{discover_chunks, Chunk, ExportLoader, JsonExportLoader, TideReader};
pub use stages::{BasicStages, Stages};
pub use writer::{ArchiveWriter, WriteStats};

// Internal modules (public but not part of the high-level API)
pub mod builder;
pub mod burst;
pub mod classify;
pub mod dataset;
pub mod formats;
pub mod merge;
pub mod metadata;
pub mod models;
pub mod stages;
pub mod tide;
