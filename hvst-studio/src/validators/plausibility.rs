//! Metadata plausibility warnings

use crate::ledger::WarningLedger;
use crate::models::MusicMetadata;

/// Terms in a source description that suggest pre-emphasised audio
pub const PRE_EMPHASIS_TERMS: [&str; 5] = [
    "pre-emphasis",
    "pre emphasis",
    "preemphasis",
    "de-emphasis",
    "deemphasis",
];

/// First pre-emphasis term found in `text`, case-insensitively
pub fn find_pre_emphasis_term(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    PRE_EMPHASIS_TERMS.into_iter().find(|term| lowered.contains(term))
}

pub fn check_metadata_plausibility(metadata: &MusicMetadata, ledger: &mut WarningLedger) {
    if metadata.edition_year.unwrap_or(0) == 0 {
        ledger.add_warning("Edition year is empty.");
    }

    if metadata.edition_title.trim().is_empty()
        && metadata.edition_record_label.trim().is_empty()
        && metadata.edition_catalog_number.trim().is_empty()
    {
        ledger.add_warning("Edition title, record label and catalog number are all empty.");
    }

    let description = metadata
        .additional_data
        .source
        .as_ref()
        .map(|s| s.description.as_str())
        .unwrap_or_default();
    if let Some(term) = find_pre_emphasis_term(description) {
        ledger.add_warning(format!(
            "Source description mentions \"{}\". De-emphasis is not supported, the release has to be handled manually.",
            term
        ));
    }
}
