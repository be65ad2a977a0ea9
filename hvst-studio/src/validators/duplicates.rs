//! Duplicate release detection
//!
//! Compares the release being produced with every release already in the
//! source group. Matching is exact on format, media, encoding and edition
//! fields after HTML-unescaping the catalog's strings. A match is reported
//! as a self-acknowledged warning.

use html_escape::decode_html_entities;

use crate::error::{StepError, StepResult};
use crate::ledger::WarningLedger;
use crate::models::MusicMetadata;
use crate::services::catalog::{CatalogClient, CatalogTorrent};

/// True when `torrent` is the same edition in the same format as `metadata`
pub fn is_same_release(metadata: &MusicMetadata, torrent: &CatalogTorrent) -> bool {
    torrent.format == metadata.format.as_str()
        && torrent.media == metadata.media.as_str()
        && torrent.encoding == metadata.encoding.as_str()
        && torrent.remaster_year == metadata.edition_year.unwrap_or(0)
        && decode_html_entities(&torrent.remaster_title) == metadata.edition_title
        && decode_html_entities(&torrent.remaster_record_label) == metadata.edition_record_label
        && decode_html_entities(&torrent.remaster_catalogue_number) == metadata.edition_catalog_number
}

pub async fn check_duplicates(
    metadata: &MusicMetadata,
    catalog: &dyn CatalogClient,
    ledger: &mut WarningLedger,
) -> StepResult<()> {
    let source = metadata.additional_data.source.as_ref().ok_or_else(|| {
        StepError::fatal("Source release is not recorded in metadata, cannot look for duplicates")
    })?;

    let group = catalog.fetch_release_group(source.group_id).await?;
    tracing::debug!(
        group_id = source.group_id,
        releases = group.torrents.len(),
        "Checking for duplicate releases"
    );

    for torrent in group.torrents.iter().filter(|t| is_same_release(metadata, t)) {
        ledger.add_acknowledged_warning(format!(
            "Possible duplicate: torrent {} in group {} is already {} / {} / {} with the same edition.",
            torrent.id, group.group.id, torrent.media, torrent.format, torrent.encoding
        ));
    }
    Ok(())
}
