//! Step working areas
//!
//! Every step owns `<root>/<project_id>/<index>_<step>/`. The step's output
//! tree lives in `data/`; other named sub-areas (`torrent_file/`,
//! `upload_error/`, ...) sit next to it and are created on demand. Later
//! steps read an earlier area only by copying out of it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{StepError, StepResult};

const DATA_DIR: &str = "data";

/// Working area of one project step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkArea {
    path: PathBuf,
}

impl WorkArea {
    pub fn new(work_root: &Path, project_id: Uuid, step_index: usize, step_name: &str) -> Self {
        Self {
            path: work_root
                .join(project_id.to_string())
                .join(format!("{}_{}", step_index, step_name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The step's output tree
    pub fn data_path(&self) -> PathBuf {
        self.path.join(DATA_DIR)
    }

    /// Clear whatever a previous attempt left behind and recreate `data/`
    pub fn prepare(&self) -> io::Result<()> {
        if self.path.exists() {
            tracing::debug!(path = %self.path.display(), "Clearing stale work area");
            fs::remove_dir_all(&self.path)?;
        }
        fs::create_dir_all(self.data_path())
    }

    /// Path of a named sub-area, created if missing
    pub fn sub_area(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.path.join(name);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// The one file stored in sub-area `name`
    pub fn single_file_in(&self, name: &str) -> StepResult<PathBuf> {
        let dir = self.path.join(name);
        if !dir.is_dir() {
            return Err(StepError::fatal(format!(
                "Expected exactly one file in {}, but the directory does not exist",
                dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }

        match files.len() {
            1 => Ok(files.remove(0)),
            n => Err(StepError::fatal(format!(
                "Expected exactly one file in {}, found {}",
                dir.display(),
                n
            ))),
        }
    }
}

/// Copy a file, or a directory tree, into `dst`. A file lands at `dst`
/// itself; a directory's contents land below `dst`.
pub fn copy_tree_into(src: &Path, dst: &Path) -> io::Result<u64> {
    if src.is_file() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        return fs::copy(src, dst);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copied += fs::copy(entry.path(), &target)?;
        }
    }
    Ok(copied)
}
