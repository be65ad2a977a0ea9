//! In-memory collaborators

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use hvst_studio::models::{Format, StreamInfo, TagBundle};
use hvst_studio::services::catalog::{CatalogGroup, CatalogTorrent, MusicInfo, ReleaseGroupResponse};
use hvst_studio::services::{
    AudioProbe, CatalogClient, CatalogError, ResampleError, Resampler, TagReadError, TagReader,
    TorrentResponse, UploadOutcome, UploadPayload,
};

/// Tag reader answering from a table keyed by file name
pub struct FakeTagReader {
    probes: HashMap<String, AudioProbe>,
    /// Stream reported for files inside a given step's work area
    step_streams: HashMap<String, StreamInfo>,
}

impl FakeTagReader {
    pub fn new() -> Self {
        Self {
            probes: HashMap::new(),
            step_streams: HashMap::new(),
        }
    }

    /// Files under the work area of `step_name` report `stream`
    pub fn with_stream_in_step(mut self, step_name: &str, stream: StreamInfo) -> Self {
        self.step_streams.insert(format!("_{}", step_name), stream);
        self
    }

    /// Fully tagged file at `stream`
    pub fn with_track(self, file_name: &str, track: &str, disc: Option<&str>, stream: StreamInfo) -> Self {
        let tags = TagBundle {
            artist: Some("Artist".to_string()),
            album: Some("Album".to_string()),
            title: Some(format!("Title {}", track)),
            track: Some(track.to_string()),
            disc: disc.map(str::to_string),
        };
        self.with_tags(file_name, tags, stream)
    }

    pub fn with_tags(mut self, file_name: &str, tags: TagBundle, stream: StreamInfo) -> Self {
        self.probes
            .insert(file_name.to_string(), AudioProbe { tags, stream });
        self
    }
}

impl TagReader for FakeTagReader {
    fn read(&self, path: &Path, _format: Format) -> Result<AudioProbe, TagReadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut probe = self
            .probes
            .get(&file_name)
            .cloned()
            .ok_or_else(|| TagReadError::ReadError(path.to_path_buf(), "no tags registered".to_string()))?;

        let in_step = path.components().find_map(|c| {
            let name = c.as_os_str().to_string_lossy();
            self.step_streams
                .iter()
                .find(|(suffix, _)| name.ends_with(suffix.as_str()))
                .map(|(_, stream)| *stream)
        });
        if let Some(stream) = in_step {
            probe.stream = stream;
        }
        Ok(probe)
    }
}

/// Resampler that writes a marker file and counts calls
pub struct FakeResampler {
    pub calls: AtomicUsize,
}

impl FakeResampler {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resampler for FakeResampler {
    fn name(&self) -> &'static str {
        "fake-sox"
    }

    async fn resample(&self, src: &Path, dst: &Path, target: StreamInfo) -> Result<(), ResampleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(dst, format!("{} as {}", src.display(), target)).map_err(|e| {
            ResampleError::EngineFailed {
                path: src.to_path_buf(),
                message: e.to_string(),
            }
        })
    }
}

/// Scriptable catalog
///
/// Fingerprint lookups pop answers from a queue; once the queue is empty
/// every lookup misses.
pub struct FakeCatalog {
    group: Mutex<Option<ReleaseGroupResponse>>,
    torrent: Mutex<Option<TorrentResponse>>,
    upload_outcome: Mutex<Option<Result<UploadOutcome, CatalogError>>>,
    lookups: Mutex<VecDeque<Result<Option<TorrentResponse>, CatalogError>>>,
    pub group_fetches: AtomicUsize,
    pub submits: AtomicUsize,
    pub lookup_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            group: Mutex::new(None),
            torrent: Mutex::new(None),
            upload_outcome: Mutex::new(None),
            lookups: Mutex::new(VecDeque::new()),
            group_fetches: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_group(self, group: ReleaseGroupResponse) -> Self {
        *self.group.lock().unwrap() = Some(group);
        self
    }

    pub fn with_torrent(self, torrent: TorrentResponse) -> Self {
        *self.torrent.lock().unwrap() = Some(torrent);
        self
    }

    pub fn with_upload_outcome(self, outcome: Result<UploadOutcome, CatalogError>) -> Self {
        *self.upload_outcome.lock().unwrap() = Some(outcome);
        self
    }

    /// Queue the answer for the next fingerprint lookup
    pub fn push_lookup(&self, answer: Result<Option<TorrentResponse>, CatalogError>) {
        self.lookups.lock().unwrap().push_back(answer);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

/// Group `group_id` holding `torrents`
pub fn release_group(group_id: u64, torrents: Vec<CatalogTorrent>) -> ReleaseGroupResponse {
    ReleaseGroupResponse {
        group: CatalogGroup {
            id: group_id,
            name: "Album".to_string(),
            release_type: 1,
            music_info: MusicInfo::default(),
            wiki_body: String::new(),
        },
        torrents,
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn fetch_torrent(&self, torrent_id: u64) -> Result<TorrentResponse, CatalogError> {
        self.torrent
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CatalogError::NotFound(format!("torrent {}", torrent_id)))
    }

    async fn fetch_release_group(&self, group_id: u64) -> Result<ReleaseGroupResponse, CatalogError> {
        self.group_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .group
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| release_group(group_id, Vec::new())))
    }

    async fn submit_upload(
        &self,
        _payload: &UploadPayload,
        _torrent_file: &[u8],
    ) -> Result<UploadOutcome, CatalogError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        match self.upload_outcome.lock().unwrap().take() {
            Some(outcome) => outcome,
            None => Ok(UploadOutcome::Accepted {
                torrent_id: 500,
                group_id: 42,
            }),
        }
    }

    async fn find_release_by_fingerprint(
        &self,
        _info_hash: &str,
    ) -> Result<Option<TorrentResponse>, CatalogError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.lookups.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}
