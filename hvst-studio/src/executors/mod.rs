//! Concrete steps
//!
//! Torrent-file creation, lossy encoding and seeding are transport steps
//! that callers register themselves.

pub mod check_file_tags;
pub mod local_source;
pub mod resample;
pub mod torrent_source;
pub mod upload;

pub use check_file_tags::CheckFileTags;
pub use local_source::LocalSource;
pub use resample::Resample;
pub use torrent_source::CatalogTorrentSource;
pub use upload::CatalogUpload;
