//! Audio file discovery
//!
//! Recursive discovery of audio files by extension. Every call rescans the
//! directory; nothing is cached between calls. Results are sorted by path so
//! two scans of the same tree yield the same order.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Cannot access an entry below the root
    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

/// Audio file scanner
#[derive(Debug, Clone)]
pub struct FileScanner {
    ignore_patterns: Vec<String>,
}

impl FileScanner {
    /// Create new file scanner with default ignore patterns
    ///
    /// Ignores system litter like .DS_Store and Thumbs.db.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![".DS_Store".to_string(), "Thumbs.db".to_string()],
        }
    }

    /// Lazily yield files under `root` whose extension matches `extension`
    /// (case-insensitive, without the dot), in walk order
    pub fn iter_audio_files<'a>(
        &'a self,
        root: &Path,
        extension: &'a str,
    ) -> Result<impl Iterator<Item = Result<PathBuf, ScanError>> + 'a, ScanError> {
        check_root(root)?;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| self.should_process_entry(e));

        Ok(walker.filter_map(move |entry| match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_extension(entry.path(), extension) {
                    Some(Ok(entry.into_path()))
                } else {
                    None
                }
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                Some(Err(ScanError::FileAccessError(path, e.to_string())))
            }
        }))
    }

    /// Collect all matching audio files, sorted by path
    pub fn scan(&self, root: &Path, extension: &str) -> Result<Vec<PathBuf>, ScanError> {
        let mut files = self
            .iter_audio_files(root, extension)?
            .collect::<Result<Vec<_>, _>>()?;
        files.sort();

        tracing::debug!(
            root = %root.display(),
            extension,
            count = files.len(),
            "Audio file discovery complete"
        );

        Ok(files)
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    if !root.exists() {
        return Err(ScanError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Every regular file under `root`, relative to `root`, sorted
pub fn list_rel_files(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    check_root(root)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            ScanError::FileAccessError(path, e.to_string())
        })?;
        if entry.file_type().is_file() {
            if let Ok(rel) = entry.path().strip_prefix(root) {
                files.push(rel.to_path_buf());
            }
        }
    }
    files.sort();
    Ok(files)
}
