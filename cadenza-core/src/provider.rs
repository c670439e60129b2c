use crate::error::Result;
use crate::track::{ExternalTrackPayload, SongDetails, SongId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Song row from a library search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSongHit {
    pub id: SongId,
    pub title: String,
    pub artist: String,
}

/// Artist row from a library search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalArtistHit {
    pub id: u64,
    pub name: String,
}

/// Album row from a library search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAlbumHit {
    pub id: u64,
    pub title: String,
    pub artist: String,
}

/// Library search response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSearchResults {
    #[serde(default)]
    pub songs: Vec<LocalSongHit>,
    #[serde(default)]
    pub artists: Vec<LocalArtistHit>,
    #[serde(default)]
    pub albums: Vec<LocalAlbumHit>,
}

/// Trait for the self-hosted song library
#[async_trait]
pub trait LocalLibrary: Send + Sync {
    /// Get the library name
    fn name(&self) -> &'static str;

    /// Resolve full metadata and the media URL for a song.
    ///
    /// # Errors
    ///
    /// `NotFound` when the library has no such song, `Network`/`Http` when
    /// the request fails.
    async fn song(&self, id: SongId) -> Result<SongDetails>;

    /// Search songs, artists and albums by substring.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    async fn search(&self, query: &str) -> Result<LocalSearchResults>;
}

/// Trait for third-party catalogs that provide preview clips
#[async_trait]
pub trait ExternalCatalog: Send + Sync {
    /// Get the catalog name
    fn name(&self) -> &'static str;

    /// Search tracks, returning at most `limit` records.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the catalog reports one.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ExternalTrackPayload>>;
}
