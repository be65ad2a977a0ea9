//! Source intake from a downloaded catalog torrent

use async_trait::async_trait;
use html_escape::decode_html_entities;
use std::sync::Arc;

use crate::error::{StepError, StepResult};
use crate::models::{
    step_names, Encoding, Format, Media, MusicMetadata, SourceRelease, RELEASE_TYPE_MIXTAPE,
    RELEASE_TYPE_SINGLE,
};
use crate::services::catalog::{CatalogClient, CatalogError, TorrentResponse};
use crate::services::file_scanner::FileScanner;
use crate::services::tag_reader::TagReadError;
use crate::services::work_area::copy_tree_into;
use crate::step::executor::{StepContext, StepExecutor};
use crate::step::registry::StepServices;

pub const DELETED_TORRENT_WARNING: &str =
    "Torrent already deleted at catalog. Unable to refresh metadata.";

fn has_surrounding_spaces(value: &str) -> bool {
    value != value.trim()
}

pub(crate) fn parse_format(value: &str) -> StepResult<Format> {
    Format::from_catalog(value).ok_or_else(|| TagReadError::UnsupportedFormat(value.to_string()).into())
}

/// Count files under `ctx`'s data directory with the format's extension.
/// None is fatal; exactly one warns unless the release type allows it.
pub(crate) fn check_audio_file_count(
    ctx: &mut StepContext,
    scanner: &FileScanner,
    format: Format,
    release_type: Option<u32>,
) -> StepResult<usize> {
    let count = scanner.scan(&ctx.data_path(), format.extension())?.len();
    tracing::debug!(step = %ctx.step_name(), count, "Discovered source audio files");

    match count {
        0 => Err(StepError::fatal(format!(
            "No {} audio files discovered in {}",
            format,
            ctx.data_path().display()
        ))),
        1 if !matches!(release_type, Some(RELEASE_TYPE_SINGLE) | Some(RELEASE_TYPE_MIXTAPE)) => {
            ctx.add_warning("Single audio file torrent with a type that is not single or mixtape.");
            Ok(count)
        }
        _ => Ok(count),
    }
}

pub struct CatalogTorrentSource {
    catalog: Arc<dyn CatalogClient>,
    scanner: FileScanner,
    response: Option<TorrentResponse>,
}

impl CatalogTorrentSource {
    pub fn new(services: &StepServices) -> Self {
        Self {
            catalog: services.catalog.clone(),
            scanner: services.scanner.clone(),
            response: None,
        }
    }

    fn response(&self) -> StepResult<&TorrentResponse> {
        self.response
            .as_ref()
            .ok_or_else(|| StepError::fatal("Source torrent has not been fetched"))
    }

    async fn fetch_torrent(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        let source = ctx.source().cloned().ok_or_else(|| {
            StepError::fatal("Project has no source torrent, but catalog_torrent_source requires one")
        })?;

        tracing::info!(project_id = %ctx.project_id(), tracker_id = source.tracker_id, "Fetching catalog torrent");
        let response = match self.catalog.fetch_torrent(source.tracker_id).await {
            Ok(response) => response,
            Err(CatalogError::NotFound(_)) => match source.cached_response {
                Some(cached) => {
                    ctx.add_warning(DELETED_TORRENT_WARNING);
                    cached
                }
                None => {
                    return Err(StepError::fatal(format!(
                        "Torrent {} is deleted at catalog and no cached metadata is available",
                        source.tracker_id
                    )))
                }
            },
            Err(e) => return Err(e.into()),
        };
        self.response = Some(response);
        Ok(())
    }

    fn check_source_warnings(&self, ctx: &mut StepContext) -> StepResult<()> {
        let torrent = &self.response()?.torrent;
        if torrent.scene {
            ctx.add_warning("Attention: source torrent is scene.");
        }
        if torrent.reported {
            ctx.add_warning("Source torrent is reported.");
        }
        for (value, field) in [
            (&torrent.remaster_title, "title"),
            (&torrent.remaster_record_label, "record label"),
            (&torrent.remaster_catalogue_number, "catalog number"),
        ] {
            if has_surrounding_spaces(value) {
                ctx.add_warning(format!(
                    "Edition {} has leading or trailing spaces. Fix manually now or after upload.",
                    field
                ));
            }
        }
        Ok(())
    }

    fn copy_source_files(&self, ctx: &mut StepContext) -> StepResult<()> {
        let response = self.response()?;
        let format = parse_format(&response.torrent.format)?;
        let release_type = response.group.release_type;

        let source = ctx
            .source()
            .ok_or_else(|| StepError::fatal("Project has no source torrent"))?;
        let content_path = source.content_path();
        tracing::info!(
            project_id = %ctx.project_id(),
            src = %content_path.display(),
            dst = %ctx.data_path().display(),
            "Copying source files"
        );

        if content_path.is_dir() {
            copy_tree_into(&content_path, &ctx.data_path())?;
        } else if content_path.is_file() {
            let file_name = content_path
                .file_name()
                .ok_or_else(|| StepError::fatal("Source file has no name"))?;
            copy_tree_into(&content_path, &ctx.data_path().join(file_name))?;
        } else {
            return Err(StepError::fatal(format!(
                "Unknown source path type: {} is neither a file nor a directory",
                content_path.display()
            )));
        }

        check_audio_file_count(ctx, &self.scanner, format, Some(release_type))?;
        Ok(())
    }

    fn init_metadata(&self, ctx: &mut StepContext) -> StepResult<()> {
        let TorrentResponse { group, torrent } = self.response()?;

        let media = Media::from_catalog(&torrent.media)
            .ok_or_else(|| StepError::fatal(format!("Unknown media {}", torrent.media)))?;
        let format = parse_format(&torrent.format)?;
        let encoding = Encoding::from_catalog(&torrent.encoding)
            .ok_or_else(|| StepError::fatal(format!("Unknown encoding {}", torrent.encoding)))?;

        let mut metadata = MusicMetadata::new(decode_html_entities(&group.name), media, format, encoding);
        metadata.edition_year = Some(torrent.remaster_year).filter(|y| *y != 0);
        metadata.edition_title = decode_html_entities(&torrent.remaster_title).into_owned();
        metadata.edition_record_label = decode_html_entities(&torrent.remaster_record_label).into_owned();
        metadata.edition_catalog_number =
            decode_html_entities(&torrent.remaster_catalogue_number).into_owned();
        metadata.additional_data.source = Some(SourceRelease {
            group_id: group.id,
            torrent_id: torrent.id,
            group_name: group.name.clone(),
            artists: group.music_info.artists.iter().map(|a| a.name.clone()).collect(),
            release_type: group.release_type,
            description: torrent.description.clone(),
        });
        metadata.record_processing_step(format!(
            "Sourced from catalog torrent {} ({} / {} / {}).",
            torrent.id, media, format, encoding
        ));

        ctx.set_metadata(metadata);
        Ok(())
    }
}

#[async_trait]
impl StepExecutor for CatalogTorrentSource {
    fn name(&self) -> &'static str {
        step_names::CATALOG_TORRENT_SOURCE
    }

    fn description(&self) -> String {
        "Source data from a downloaded catalog torrent.".to_string()
    }

    async fn run(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        ctx.begin_operation("fetch_torrent");
        self.fetch_torrent(ctx).await?;

        ctx.begin_operation("check_source_warnings");
        self.check_source_warnings(ctx)?;

        ctx.begin_operation("copy_source_files");
        self.copy_source_files(ctx)?;

        ctx.begin_operation("init_metadata");
        self.init_metadata(ctx)
    }
}
