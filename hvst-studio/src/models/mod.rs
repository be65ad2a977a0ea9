//! Data models for hvst-studio
//!
//! - Metadata record carried between steps
//! - Discovered audio files and stream characteristics
//! - Projects, their steps, and transcode project construction

pub mod audio_file;
pub mod metadata;
pub mod project;

pub use audio_file::{AudioFile, StreamInfo, TagBundle, TrackPosition};
pub use metadata::{
    AdditionalData, DownsampleParams, Encoding, Format, Media, MusicMetadata, ReleaseType,
    SourceRelease, TorrentFileRecord, UploadRecord, RELEASE_TYPE_MIXTAPE, RELEASE_TYPE_SINGLE,
};
pub use project::{
    create_transcode_project, step_names, transcode_project_steps, Project, ProjectStep,
    SourceTorrentRef, StepFailure, TranscodeType,
};
