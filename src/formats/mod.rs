//! On-disk encodings for datasets.

pub mod archive;

pub use archive::{read_archive, write_archive, TimeEncoding};
