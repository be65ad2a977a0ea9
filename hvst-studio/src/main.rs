//! hvst-studio - command line entry point
//!
//! `hvst-studio check <dir> --metadata <file.json>` runs the rules step
//! against a release on disk and prints the outcome. `hvst-studio plan`
//! prints the project a transcode of a downloaded torrent would run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use hvst_common::config::{load_toml_config, RootFolderInitializer, RootFolderResolver, TomlConfig};
use hvst_common::events::EventBus;
use hvst_common::logging::init_logging;
use serde_json::json;
use tracing::info;

use hvst_studio::models::{
    create_transcode_project, step_names, MusicMetadata, Project, ProjectStep, SourceTorrentRef,
    TranscodeType,
};
use hvst_studio::services::catalog::ReleaseGroupResponse;
use hvst_studio::services::{
    CatalogClient, CatalogError, HttpCatalogClient, LoftyTagReader, TorrentResponse, UploadOutcome,
    UploadPayload,
};
use hvst_studio::{PipelineRunner, PipelineStatus, StepRegistry, StepServices, MODULE_NAME};

#[derive(Parser, Debug)]
#[command(name = "hvst-studio")]
#[command(about = "Upload studio for audio releases")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/hvst/hvst-studio.toml)
    #[arg(short, long, env = "HVST_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder for step working areas
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a release directory against the upload rules
    Check {
        /// Release directory
        dir: PathBuf,

        /// Metadata record of the release, as JSON
        #[arg(short, long)]
        metadata: PathBuf,

        /// Skip rules that query the catalog
        #[arg(long)]
        offline: bool,
    },

    /// Print the transcode project for a downloaded catalog torrent, as JSON
    Plan {
        /// Transcode type (mp3_v0, mp3_320, redbook_flac)
        transcode_type: String,

        /// Catalog torrent id
        #[arg(long)]
        torrent_id: u64,

        /// Directory the torrent client downloaded into
        #[arg(long)]
        download_path: PathBuf,

        /// Torrent name under the download directory
        #[arg(long)]
        name: String,
    },
}

/// Transcode project tagged with the configured announce source
fn plan_project(
    config: &TomlConfig,
    transcode_type: &str,
    source_torrent: SourceTorrentRef,
) -> Result<Project> {
    let transcode_type: TranscodeType = transcode_type.parse()?;
    let name = source_torrent.name.clone();
    Ok(create_transcode_project(
        name,
        source_torrent,
        transcode_type,
        &config.upload.announce_source,
    ))
}

/// Catalog stand-in for `--offline`: every request fails
struct OfflineCatalog;

#[async_trait]
impl CatalogClient for OfflineCatalog {
    async fn fetch_torrent(&self, _torrent_id: u64) -> Result<TorrentResponse, CatalogError> {
        Err(offline())
    }

    async fn fetch_release_group(&self, _group_id: u64) -> Result<ReleaseGroupResponse, CatalogError> {
        Err(offline())
    }

    async fn submit_upload(
        &self,
        _payload: &UploadPayload,
        _torrent_file: &[u8],
    ) -> Result<UploadOutcome, CatalogError> {
        Err(offline())
    }

    async fn find_release_by_fingerprint(
        &self,
        _info_hash: &str,
    ) -> Result<Option<TorrentResponse>, CatalogError> {
        Err(offline())
    }
}

fn offline() -> CatalogError {
    CatalogError::NotConfigured("running with --offline".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_toml_config(args.config.as_deref(), MODULE_NAME).context("Failed to load config")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    match args.command {
        Command::Check {
            dir,
            metadata,
            offline,
        } => {
            let metadata_json = std::fs::read_to_string(&metadata)
                .with_context(|| format!("Failed to read {}", metadata.display()))?;
            let metadata: MusicMetadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("Failed to parse {}", metadata.display()))?;

            let catalog: Arc<dyn CatalogClient> = if offline {
                Arc::new(OfflineCatalog)
            } else {
                Arc::new(HttpCatalogClient::new(&config.catalog).context("Catalog client unavailable")?)
            };
            let services = StepServices::new(catalog, Arc::new(LoftyTagReader::new()));
            let runner = PipelineRunner::new(
                StepRegistry::with_builtin_steps(),
                services,
                initializer.work_areas_path(),
                EventBus::new(100),
            );

            let mut project = Project::new(format!("check {}", dir.display()));
            project.push_step(ProjectStep::with_kwargs(
                step_names::LOCAL_SOURCE,
                json!({ "path": dir, "metadata": metadata }),
            ));
            project.push_step(ProjectStep::with_kwargs(
                step_names::CHECK_FILE_TAGS,
                json!({ "check_duplicates": !offline }),
            ));

            let status = runner.run(&mut project).await?;
            print_report(&project, &status);
        }
        Command::Plan {
            transcode_type,
            torrent_id,
            download_path,
            name,
        } => {
            let source_torrent = SourceTorrentRef {
                tracker_id: torrent_id,
                download_path,
                name,
                cached_response: None,
            };
            let project = plan_project(&config, &transcode_type, source_torrent)?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
    }

    Ok(())
}

fn print_report(project: &Project, status: &PipelineStatus) {
    for (index, step) in project.steps.iter().enumerate() {
        println!("[{}] {}: {}", index, step.executor_name, step.state);
        if let Some(failure) = &step.failure {
            println!("    failed in {}", failure);
        }
        for warning in step.ledger.warnings() {
            let marker = if warning.acknowledged { "info" } else { "WARNING" };
            println!("    {}: {}", marker, warning.message);
        }
    }

    if let Some(metadata) = project.steps.last().and_then(|s| s.metadata.as_ref()) {
        if let Some(name) = metadata.torrent_name() {
            println!("Torrent name: {}", name);
        }
        println!("Processing log:");
        for line in metadata.processing_steps() {
            println!("    {}", line);
        }
    }

    match status {
        PipelineStatus::Completed => println!("Release passed all checks."),
        PipelineStatus::AwaitingAcknowledgment { warnings, .. } => {
            println!("{} warning(s) need review.", warnings.len())
        }
        PipelineStatus::Failed { failure, .. } => println!("Check failed: {}", failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceTorrentRef {
        SourceTorrentRef {
            tracker_id: 7,
            download_path: PathBuf::from("/downloads"),
            name: "Artist - Album (2001) [FLAC]".to_string(),
            cached_response: None,
        }
    }

    #[test]
    fn test_plan_uses_configured_announce_source() {
        let mut config = TomlConfig::default();
        config.upload.announce_source = "OPS".to_string();

        let project = plan_project(&config, "mp3_320", source()).unwrap();

        let torrent_step = project
            .steps
            .iter()
            .find(|s| s.executor_name == step_names::CREATE_TORRENT_FILE)
            .unwrap();
        assert_eq!(torrent_step.executor_kwargs["extra_info_keys"]["source"], json!("OPS"));
        assert_eq!(project.source_torrent.unwrap().tracker_id, 7);
    }

    #[test]
    fn test_plan_rejects_unknown_transcode_type() {
        let err = plan_project(&TomlConfig::default(), "flac_24", source()).unwrap_err();
        assert!(err.to_string().contains("Supported types"));
    }
}
