//! Track/disc sort-order consistency
//!
//! Within each directory, ordering files by tags must give the same order
//! as ordering them by path. The tag order is built from the reversed path
//! order with a stable sort, so files sharing a `(track, disc)` come out
//! inverted and show up as a mismatch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{StepError, StepResult};
use crate::ledger::WarningLedger;
use crate::models::{AudioFile, TrackPosition};

fn position(file: &AudioFile) -> StepResult<TrackPosition> {
    file.position.ok_or_else(|| {
        StepError::fatal(format!(
            "Track position of {} is unknown, tags have not been checked",
            file.path.display()
        ))
    })
}

/// Tag-sorted relative paths of one group, or `None` when they agree with path order
fn tag_order_mismatch(group: &[&AudioFile]) -> StepResult<Option<Vec<PathBuf>>> {
    let mut by_path: Vec<&AudioFile> = group.to_vec();
    by_path.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    let mut by_tags = Vec::with_capacity(by_path.len());
    for file in by_path.iter().rev() {
        by_tags.push((position(file)?, *file));
    }
    // Stable sort, so equal positions keep their reversed order
    by_tags.sort_by_key(|(pos, _)| *pos);

    let matches = by_tags
        .iter()
        .zip(by_path.iter())
        .all(|((_, tagged), pathed)| tagged.rel_path == pathed.rel_path);

    if matches {
        Ok(None)
    } else {
        Ok(Some(by_tags.into_iter().map(|(_, f)| f.rel_path.clone()).collect()))
    }
}

/// Emit one warning per directory whose tag order disagrees with its path order
pub fn check_track_sort_order(files: &[AudioFile], ledger: &mut WarningLedger) -> StepResult<()> {
    let mut groups: BTreeMap<&Path, Vec<&AudioFile>> = BTreeMap::new();
    for file in files {
        let dir = file.rel_path.parent().unwrap_or_else(|| Path::new(""));
        groups.entry(dir).or_default().push(file);
    }

    for (dir, group) in &groups {
        if let Some(tag_sorted) = tag_order_mismatch(group)? {
            let listing: Vec<String> = tag_sorted.iter().map(|p| p.display().to_string()).collect();
            tracing::debug!(directory = %dir.display(), "Tag order differs from path order");
            ledger.add_warning(format!(
                "Files do not sort properly by tags. Please check track/disc tags and filenames.\n\
                 Tags sort:\n{}",
                listing.join("\n")
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StreamInfo, TagBundle};

    fn file(rel: &str, track: u32, disc: u32) -> AudioFile {
        let mut f = AudioFile::new(
            PathBuf::from("/data").join(rel),
            PathBuf::from(rel),
            TagBundle::default(),
            StreamInfo::REDBOOK,
        );
        f.position = Some(TrackPosition { track, disc });
        f
    }

    #[test]
    fn test_consistent_order_passes() {
        let files = vec![file("01 a.flac", 1, 1), file("02 b.flac", 2, 1), file("10 c.flac", 10, 1)];
        let mut ledger = WarningLedger::new();
        check_track_sort_order(&files, &mut ledger).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_duplicate_positions_are_flagged() {
        let files = vec![file("a.flac", 1, 1), file("b.flac", 1, 1)];
        let mut ledger = WarningLedger::new();
        check_track_sort_order(&files, &mut ledger).unwrap();

        assert_eq!(ledger.len(), 1);
        let message = &ledger.warnings()[0].message;
        assert!(message.ends_with("Tags sort:\nb.flac\na.flac"));
    }

    #[test]
    fn test_groups_are_checked_per_directory() {
        // Track 1 on both discs in separate directories is fine
        let files = vec![
            file("CD1/01.flac", 1, 1),
            file("CD1/02.flac", 2, 1),
            file("CD2/01.flac", 1, 2),
            file("CD2/02.flac", 3, 2),
            file("CD2/03.flac", 2, 2),
        ];
        let mut ledger = WarningLedger::new();
        check_track_sort_order(&files, &mut ledger).unwrap();

        assert_eq!(ledger.len(), 1);
        assert!(ledger.warnings()[0].message.contains("CD2/03.flac\nCD2/02.flac"));
    }

    #[test]
    fn test_unchecked_positions_are_fatal() {
        let mut f = file("a.flac", 1, 1);
        f.position = None;
        let mut ledger = WarningLedger::new();
        assert!(check_track_sort_order(&[f], &mut ledger).is_err());
    }
}
