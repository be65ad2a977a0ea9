//! Release fixtures and runner construction

use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use hvst_common::events::EventBus;
use hvst_studio::models::{step_names, Encoding, Format, Media, MusicMetadata, ProjectStep, SourceRelease};
use hvst_studio::services::catalog::CatalogTorrent;
use hvst_studio::services::{CatalogClient, TagReader};
use hvst_studio::{PipelineRunner, StepRegistry, StepServices};

/// Temporary release directory plus working-area root
pub struct TestEnv {
    _temp: TempDir,
    pub release_dir: PathBuf,
    pub work_root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let release_dir = temp.path().join("release");
        let work_root = temp.path().join("projects");
        fs::create_dir_all(&release_dir).unwrap();
        fs::create_dir_all(&work_root).unwrap();
        Self {
            _temp: temp,
            release_dir,
            work_root,
        }
    }
}

/// Create placeholder files under `dir`; tags come from the fake reader
pub fn write_release(dir: &Path, rel_paths: &[&str]) {
    for rel in rel_paths {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, format!("audio data of {}", rel)).unwrap();
    }
}

/// CD FLAC release of group 42 with a complete edition
pub fn sample_metadata() -> MusicMetadata {
    let mut metadata = MusicMetadata::new("Album", Media::Cd, Format::Flac, Encoding::Lossless);
    metadata.edition_year = Some(2001);
    metadata.edition_title = "Remaster".to_string();
    metadata.edition_record_label = "Label".to_string();
    metadata.edition_catalog_number = "CAT-1".to_string();
    metadata.additional_data.source = Some(SourceRelease {
        group_id: 42,
        torrent_id: 7,
        group_name: "Album".to_string(),
        artists: vec!["Artist".to_string()],
        release_type: 1,
        description: String::new(),
    });
    metadata
}

pub fn local_source_step(path: &Path, metadata: &MusicMetadata) -> ProjectStep {
    ProjectStep::with_kwargs(
        step_names::LOCAL_SOURCE,
        json!({ "path": path, "metadata": metadata }),
    )
}

/// Catalog entry describing the same release as `metadata`
pub fn catalog_torrent(id: u64, metadata: &MusicMetadata) -> CatalogTorrent {
    CatalogTorrent {
        id,
        media: metadata.media.as_str().to_string(),
        format: metadata.format.as_str().to_string(),
        encoding: metadata.encoding.as_str().to_string(),
        remaster_year: metadata.edition_year.unwrap_or(0),
        remaster_title: metadata.edition_title.clone(),
        remaster_record_label: metadata.edition_record_label.clone(),
        remaster_catalogue_number: metadata.edition_catalog_number.clone(),
        scene: false,
        reported: false,
        description: String::new(),
        info_hash: String::new(),
    }
}

pub fn test_runner(
    registry: StepRegistry,
    catalog: Arc<dyn CatalogClient>,
    tag_reader: Arc<dyn TagReader>,
    work_root: &Path,
) -> PipelineRunner {
    PipelineRunner::new(
        registry,
        StepServices::new(catalog, tag_reader),
        work_root.to_path_buf(),
        EventBus::new(100),
    )
}
