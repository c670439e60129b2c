//! In-memory collaborators for unit tests.

use crate::backend::AudioBackend;
use crate::error::{CoreError, Result};
use crate::provider::{ExternalCatalog, LocalLibrary, LocalSearchResults};
use crate::track::{ExternalTrackPayload, SongDetails, SongId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn song(id: u64) -> SongDetails {
    SongDetails {
        id: SongId(id),
        title: format!("Song {id}"),
        artist: "Library Artist".into(),
        album: "Single".into(),
        duration: Some(200.0),
        file_url: format!("http://library.test/static/uploads/audio/{id}.mp3"),
        cover_url: None,
    }
}

/// Records every call the controller makes.
#[derive(Debug)]
pub struct FakeBackend {
    pub loaded: Vec<String>,
    pub paused: bool,
    pub reject_play: bool,
    pub seeks: Vec<f64>,
    pub volume: f32,
    pub position: Duration,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            loaded: Vec::new(),
            paused: true,
            reject_play: false,
            seeks: Vec::new(),
            volume: 1.0,
            position: Duration::ZERO,
        }
    }
}

impl FakeBackend {
    /// Simulate the media running out.
    pub fn finish(&mut self) {
        self.paused = true;
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn load(&mut self, url: &str) {
        self.loaded.push(url.to_string());
        self.paused = true;
        self.position = Duration::ZERO;
    }

    async fn play(&mut self) -> Result<()> {
        if self.reject_play || self.loaded.is_empty() {
            return Err(CoreError::PlaybackRejected {
                reason: "blocked by test".into(),
            });
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn seek(&mut self, fraction: f64) {
        self.seeks.push(fraction);
    }

    fn current_time(&self) -> Duration {
        self.position
    }

    fn duration(&self) -> Option<Duration> {
        None
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

#[derive(Default)]
struct LibraryInner {
    songs: HashMap<SongId, SongDetails>,
    delays: HashMap<SongId, Duration>,
    search: LocalSearchResults,
    offline: bool,
}

/// Shared-state library; clones see the same songs.
#[derive(Clone, Default)]
pub struct FakeLibrary {
    inner: Arc<Mutex<LibraryInner>>,
}

impl FakeLibrary {
    pub fn with_songs(songs: impl IntoIterator<Item = SongDetails>) -> Self {
        let library = Self::default();
        library.inner.lock().unwrap().songs = songs.into_iter().map(|s| (s.id, s)).collect();
        library
    }

    pub fn offline() -> Self {
        let library = Self::default();
        library.inner.lock().unwrap().offline = true;
        library
    }

    pub fn remove(&self, id: SongId) {
        self.inner.lock().unwrap().songs.remove(&id);
    }

    /// Make lookups of `id` take `delay` (use with paused tokio time).
    pub fn delay(&self, id: SongId, delay: Duration) {
        self.inner.lock().unwrap().delays.insert(id, delay);
    }

    pub fn set_search(&self, results: LocalSearchResults) {
        self.inner.lock().unwrap().search = results;
    }
}

#[async_trait]
impl LocalLibrary for FakeLibrary {
    fn name(&self) -> &'static str {
        "fake-library"
    }

    async fn song(&self, id: SongId) -> Result<SongDetails> {
        let delay = {
            let inner = self.inner.lock().unwrap();
            inner.delays.get(&id).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.lock().unwrap();
        if inner.offline {
            return Err(CoreError::Network {
                reason: "connection refused".into(),
            });
        }
        inner.songs.get(&id).cloned().ok_or_else(|| CoreError::NotFound {
            what: format!("song {id}"),
        })
    }

    async fn search(&self, _query: &str) -> Result<LocalSearchResults> {
        let inner = self.inner.lock().unwrap();
        if inner.offline {
            return Err(CoreError::Network {
                reason: "connection refused".into(),
            });
        }
        Ok(inner.search.clone())
    }
}

/// Catalog returning canned results, or failing.
#[derive(Default)]
pub struct FakeCatalog {
    pub results: Vec<ExternalTrackPayload>,
    pub fail: bool,
}

#[async_trait]
impl ExternalCatalog for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake-catalog"
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<ExternalTrackPayload>> {
        if self.fail {
            return Err(CoreError::Network {
                reason: "catalog unavailable".into(),
            });
        }
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}
