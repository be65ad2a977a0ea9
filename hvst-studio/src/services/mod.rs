//! Collaborators consumed by the steps

pub mod catalog;
pub mod catalog_http;
pub mod file_scanner;
pub mod resampler;
pub mod tag_reader;
pub mod work_area;

pub use catalog::{CatalogClient, CatalogError, TorrentResponse, UploadOutcome, UploadPayload};
pub use catalog_http::HttpCatalogClient;
pub use file_scanner::{list_rel_files, FileScanner, ScanError};
pub use resampler::{ResampleError, Resampler};
pub use tag_reader::{AudioProbe, LoftyTagReader, TagReadError, TagReader};
pub use work_area::{copy_tree_into, WorkArea};
