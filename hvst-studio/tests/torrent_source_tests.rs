//! Catalog torrent intake

mod helpers;

use std::sync::Arc;

use hvst_common::events::StepState;
use hvst_studio::models::{
    step_names, Encoding, Format, Media, Project, ProjectStep, SourceTorrentRef, RELEASE_TYPE_SINGLE,
};
use hvst_studio::services::catalog::{CatalogArtist, CatalogGroup, CatalogTorrent, MusicInfo};
use hvst_studio::services::TorrentResponse;
use hvst_studio::{PipelineRunner, PipelineStatus, StepRegistry};

use helpers::{test_runner, write_release, FakeCatalog, FakeTagReader, TestEnv};

const TORRENT_NAME: &str = "Artist - Album (2001) [FLAC]";

fn response() -> TorrentResponse {
    TorrentResponse {
        group: CatalogGroup {
            id: 42,
            name: "Songs &amp; Stories".to_string(),
            release_type: 1,
            music_info: MusicInfo {
                artists: vec![CatalogArtist {
                    id: 3,
                    name: "Artist".to_string(),
                }],
            },
            wiki_body: String::new(),
        },
        torrent: CatalogTorrent {
            id: 7,
            media: "CD".to_string(),
            format: "FLAC".to_string(),
            encoding: "Lossless".to_string(),
            remaster_year: 2001,
            remaster_title: "Deluxe &amp; Remastered".to_string(),
            remaster_record_label: "Label".to_string(),
            remaster_catalogue_number: "CAT-1".to_string(),
            scene: false,
            reported: false,
            description: "Ripped with EAC".to_string(),
            info_hash: String::new(),
        },
    }
}

fn source_project(env: &TestEnv, cached_response: Option<TorrentResponse>) -> Project {
    let mut project = Project::new("intake");
    project.source_torrent = Some(SourceTorrentRef {
        tracker_id: 7,
        download_path: env.release_dir.clone(),
        name: TORRENT_NAME.to_string(),
        cached_response,
    });
    project.push_step(ProjectStep::new(step_names::CATALOG_TORRENT_SOURCE));
    project
}

fn runner(env: &TestEnv, catalog: FakeCatalog) -> PipelineRunner {
    test_runner(
        StepRegistry::with_builtin_steps(),
        Arc::new(catalog),
        Arc::new(FakeTagReader::new()),
        &env.work_root,
    )
}

fn download(env: &TestEnv, files: &[&str]) {
    write_release(&env.release_dir.join(TORRENT_NAME), files);
}

#[tokio::test]
async fn test_intake_initializes_metadata() {
    let env = TestEnv::new();
    download(&env, &["01.flac", "02.flac", "rip.log"]);
    let runner = runner(&env, FakeCatalog::new().with_torrent(response()));
    let mut project = source_project(&env, None);

    let status = runner.run(&mut project).await.unwrap();

    assert_eq!(status, PipelineStatus::Completed);
    let metadata = project.current_metadata().unwrap();
    assert_eq!(metadata.title, "Songs & Stories");
    assert_eq!(metadata.media, Media::Cd);
    assert_eq!(metadata.format, Format::Flac);
    assert_eq!(metadata.encoding, Encoding::Lossless);
    assert_eq!(metadata.edition_year, Some(2001));
    assert_eq!(metadata.edition_title, "Deluxe & Remastered");
    assert!(metadata.torrent_name().is_none());

    let source = metadata.additional_data.source.as_ref().unwrap();
    assert_eq!(source.group_id, 42);
    assert_eq!(source.torrent_id, 7);
    assert_eq!(source.artists, vec!["Artist".to_string()]);
    assert_eq!(source.description, "Ripped with EAC");
    assert_eq!(metadata.processing_steps().len(), 1);

    let data = runner.work_area(&project, 0).unwrap().data_path();
    assert!(data.join("01.flac").is_file());
    assert!(data.join("rip.log").is_file());
}

#[tokio::test]
async fn test_source_warnings() {
    let env = TestEnv::new();
    download(&env, &["01.flac", "02.flac"]);
    let mut flagged = response();
    flagged.torrent.scene = true;
    flagged.torrent.reported = true;
    flagged.torrent.remaster_record_label = "Label ".to_string();
    let runner = runner(&env, FakeCatalog::new().with_torrent(flagged));
    let mut project = source_project(&env, None);

    let status = runner.run(&mut project).await.unwrap();

    let PipelineStatus::AwaitingAcknowledgment { warnings, .. } = status else {
        panic!("expected warnings, got {:?}", status);
    };
    assert_eq!(
        warnings,
        vec![
            "Attention: source torrent is scene.".to_string(),
            "Source torrent is reported.".to_string(),
            "Edition record label has leading or trailing spaces. Fix manually now or after upload."
                .to_string(),
        ]
    );
}

#[tokio::test]
async fn test_deleted_torrent_uses_cached_response() {
    let env = TestEnv::new();
    download(&env, &["01.flac", "02.flac"]);
    let runner = runner(&env, FakeCatalog::new());
    let mut project = source_project(&env, Some(response()));

    let status = runner.run(&mut project).await.unwrap();

    assert!(matches!(status, PipelineStatus::AwaitingAcknowledgment { .. }));
    let step = &project.steps[0];
    assert_eq!(
        step.ledger.warnings()[0].message,
        "Torrent already deleted at catalog. Unable to refresh metadata."
    );
    assert_eq!(step.metadata.as_ref().unwrap().title, "Songs & Stories");
}

#[tokio::test]
async fn test_deleted_torrent_without_cache_is_fatal() {
    let env = TestEnv::new();
    download(&env, &["01.flac", "02.flac"]);
    let runner = runner(&env, FakeCatalog::new());
    let mut project = source_project(&env, None);

    let status = runner.run(&mut project).await.unwrap();

    let PipelineStatus::Failed { failure, .. } = status else {
        panic!("expected failure, got {:?}", status);
    };
    assert_eq!(failure.operation, "fetch_torrent");
    assert!(failure.message.contains("no cached metadata"));
}

#[tokio::test]
async fn test_missing_source_reference_is_fatal() {
    let env = TestEnv::new();
    let runner = runner(&env, FakeCatalog::new().with_torrent(response()));
    let mut project = Project::new("no source");
    project.push_step(ProjectStep::new(step_names::CATALOG_TORRENT_SOURCE));

    let status = runner.run(&mut project).await.unwrap();

    let PipelineStatus::Failed { failure, .. } = status else {
        panic!("expected failure, got {:?}", status);
    };
    assert_eq!(failure.operation, "fetch_torrent");
    assert_eq!(project.steps[0].state, StepState::Failed);
}

#[tokio::test]
async fn test_audio_file_count_rules() {
    // No audio at all
    let env = TestEnv::new();
    download(&env, &["cover.jpg"]);
    let runner_none = runner(&env, FakeCatalog::new().with_torrent(response()));
    let mut project = source_project(&env, None);
    let PipelineStatus::Failed { failure, .. } = runner_none.run(&mut project).await.unwrap() else {
        panic!("zero audio files must fail");
    };
    assert_eq!(failure.operation, "copy_source_files");
    assert!(failure.message.starts_with("No FLAC audio files discovered"));

    // One file on an album warns
    let env = TestEnv::new();
    download(&env, &["01.flac"]);
    let runner_album = runner(&env, FakeCatalog::new().with_torrent(response()));
    let mut project = source_project(&env, None);
    let status = runner_album.run(&mut project).await.unwrap();
    assert!(matches!(status, PipelineStatus::AwaitingAcknowledgment { .. }));

    // One file on a single is fine
    let env = TestEnv::new();
    download(&env, &["01.flac"]);
    let mut single = response();
    single.group.release_type = RELEASE_TYPE_SINGLE;
    let runner_single = runner(&env, FakeCatalog::new().with_torrent(single));
    let mut project = source_project(&env, None);
    assert_eq!(
        runner_single.run(&mut project).await.unwrap(),
        PipelineStatus::Completed
    );
}
