//! Track types: library references, external catalog payloads and the
//! view model shown while a track plays.

use crate::time::duration_from_secs_f64;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cover shown when neither the library nor the catalog provides one.
pub const DEFAULT_COVER_URL: &str = "/static/default-album.jpg";

/// Album label used for catalog tracks that carry no album title.
pub const EXTERNAL_ALBUM_FALLBACK: &str = "Deezer Track";

/// Length of a catalog preview clip when the payload does not say.
pub const DEFAULT_PREVIEW_DURATION: Duration = Duration::from_secs(30);

/// Where a track's audio comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// The self-hosted library server
    #[default]
    Local,
    /// A third-party catalog (Deezer previews)
    External,
}

impl Platform {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::External => "external",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key of a song in the local library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub u64);

impl std::fmt::Display for SongId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SongId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Reference into the local library. Metadata is resolved on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: SongId,
}

/// Self-contained catalog track.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalTrack {
    pub payload: ExternalTrackPayload,
}

/// A playable playlist entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Track {
    Local(LocalTrack),
    External(ExternalTrack),
}

impl Track {
    #[must_use]
    pub const fn local(id: SongId) -> Self {
        Self::Local(LocalTrack { id })
    }

    #[must_use]
    pub const fn external(payload: ExternalTrackPayload) -> Self {
        Self::External(ExternalTrack { payload })
    }

    /// Variant tag of this entry
    #[must_use]
    pub const fn platform(&self) -> Platform {
        match self {
            Self::Local(_) => Platform::Local,
            Self::External(_) => Platform::External,
        }
    }

    /// Library id, for local entries only
    #[must_use]
    pub const fn local_id(&self) -> Option<SongId> {
        match self {
            Self::Local(track) => Some(track.id),
            Self::External(_) => None,
        }
    }
}

/// Track record as returned by the external catalog search.
///
/// Only `preview` makes a payload playable; everything else is display data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalTrackPayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    /// Some catalog records carry `name` instead of `title`
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Length in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub cover_small: Option<String>,
    #[serde(default)]
    pub cover_medium: Option<String>,
    #[serde(default)]
    pub cover_big: Option<String>,
}

/// Treat empty strings from the catalog the same as missing fields.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl ExternalTrackPayload {
    /// Display title, falling back from `title` to `name`.
    #[must_use]
    pub fn display_title(&self) -> &str {
        non_empty(self.title.as_ref())
            .or_else(|| non_empty(self.name.as_ref()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn display_album(&self) -> &str {
        non_empty(self.album.as_ref()).unwrap_or(EXTERNAL_ALBUM_FALLBACK)
    }

    /// Streamable preview URL, if the catalog has one.
    #[must_use]
    pub fn preview_url(&self) -> Option<&str> {
        non_empty(self.preview.as_ref())
    }

    /// Cover art for the now-playing view.
    #[must_use]
    pub fn cover_url(&self) -> &str {
        non_empty(self.cover.as_ref())
            .or_else(|| non_empty(self.cover_medium.as_ref()))
            .or_else(|| non_empty(self.cover_big.as_ref()))
            .unwrap_or(DEFAULT_COVER_URL)
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
            .and_then(duration_from_secs_f64)
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_PREVIEW_DURATION)
    }

    /// Identifier used by the player for this catalog track.
    ///
    /// Records without a catalog id get a timestamp-based one.
    #[must_use]
    pub fn player_id(&self) -> String {
        self.id.map_or_else(
            || format!("deezer-{}", chrono::Utc::now().timestamp_millis()),
            |id| format!("deezer-{id}"),
        )
    }
}

/// Song metadata resolved from the local library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDetails {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Length in seconds, when the library knows it
    #[serde(default)]
    pub duration: Option<f64>,
    pub file_url: String,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// What the view shows for the loaded track.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
    pub media_url: String,
    pub platform: Platform,
    pub duration: Option<Duration>,
}

impl NowPlaying {
    #[must_use]
    pub fn from_song(song: &SongDetails) -> Self {
        Self {
            title: song.title.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            cover_url: non_empty(song.cover_url.as_ref())
                .unwrap_or(DEFAULT_COVER_URL)
                .to_string(),
            media_url: song.file_url.clone(),
            platform: Platform::Local,
            duration: song.duration.and_then(duration_from_secs_f64),
        }
    }

    /// Build the view model for a catalog track. Returns `None` without a preview.
    #[must_use]
    pub fn from_external(payload: &ExternalTrackPayload) -> Option<Self> {
        let media_url = payload.preview_url()?.to_string();
        Some(Self {
            title: payload.display_title().to_string(),
            artist: payload.artist.clone(),
            album: payload.display_album().to_string(),
            cover_url: payload.cover_url().to_string(),
            media_url,
            platform: Platform::External,
            duration: Some(payload.duration()),
        })
    }

    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self.platform, Platform::External)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ExternalTrackPayload {
        ExternalTrackPayload {
            id: Some(3_135_556),
            title: Some("Harder, Better, Faster, Stronger".into()),
            artist: "Daft Punk".into(),
            album: Some("Discovery".into()),
            duration: Some(224.0),
            preview: Some("https://cdns-preview.dzcdn.net/stream/abc.mp3".into()),
            cover: Some("https://e-cdns-images.dzcdn.net/cover/250x250.jpg".into()),
            cover_small: Some("https://e-cdns-images.dzcdn.net/cover/56x56.jpg".into()),
            cover_big: Some("https://e-cdns-images.dzcdn.net/cover/500x500.jpg".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_track_platform_tag() {
        assert_eq!(Track::local(SongId(1)).platform(), Platform::Local);
        assert_eq!(Track::external(payload()).platform(), Platform::External);
        assert_eq!(Track::local(SongId(7)).local_id(), Some(SongId(7)));
        assert_eq!(Track::external(payload()).local_id(), None);
    }

    #[test]
    fn test_cover_fallback_chain() {
        let mut p = payload();
        assert!(p.cover_url().ends_with("250x250.jpg"));

        p.cover = None;
        p.cover_medium = Some("https://img/medium.jpg".into());
        assert_eq!(p.cover_url(), "https://img/medium.jpg");

        p.cover_medium = Some(String::new());
        assert!(p.cover_url().ends_with("500x500.jpg"));

        p.cover_big = None;
        assert_eq!(p.cover_url(), DEFAULT_COVER_URL);
    }

    #[test]
    fn test_payload_defaults() {
        let p = ExternalTrackPayload {
            name: Some("Only a name".into()),
            ..Default::default()
        };
        assert_eq!(p.display_title(), "Only a name");
        assert_eq!(p.display_album(), EXTERNAL_ALBUM_FALLBACK);
        assert_eq!(p.duration(), DEFAULT_PREVIEW_DURATION);
        assert_eq!(p.preview_url(), None);
    }

    #[test]
    fn test_player_id() {
        assert_eq!(payload().player_id(), "deezer-3135556");
        let anonymous = ExternalTrackPayload::default().player_id();
        assert!(anonymous.starts_with("deezer-"));
    }

    #[test]
    fn test_payload_deserializes_catalog_record() {
        let json = r#"{
            "id": 916424,
            "title": "Around the World",
            "artist": "Daft Punk",
            "artist_id": 27,
            "album": "Homework",
            "album_id": 301775,
            "cover": "https://img/cover.jpg",
            "cover_small": "https://img/small.jpg",
            "cover_big": "https://img/big.jpg",
            "preview": "https://cdn/preview.mp3",
            "duration": 429,
            "platform": "deezer"
        }"#;
        let p: ExternalTrackPayload = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, Some(916_424));
        assert_eq!(p.display_title(), "Around the World");
        assert_eq!(p.preview_url(), Some("https://cdn/preview.mp3"));
        assert_eq!(p.duration(), Duration::from_secs(429));
    }

    #[test]
    fn test_now_playing_from_external_requires_preview() {
        let mut p = payload();
        let now = NowPlaying::from_external(&p).unwrap();
        assert!(now.is_external());
        assert_eq!(now.album, "Discovery");
        assert_eq!(now.media_url, "https://cdns-preview.dzcdn.net/stream/abc.mp3");

        p.preview = None;
        assert!(NowPlaying::from_external(&p).is_none());
    }

    #[test]
    fn test_now_playing_from_song_default_cover() {
        let song = SongDetails {
            id: SongId(4),
            title: "Local Song".into(),
            artist: "Someone".into(),
            album: "Single".into(),
            duration: Some(181.4),
            file_url: "/static/uploads/audio/local.mp3".into(),
            cover_url: None,
        };
        let now = NowPlaying::from_song(&song);
        assert_eq!(now.cover_url, DEFAULT_COVER_URL);
        assert_eq!(now.platform, Platform::Local);
        assert_eq!(now.duration.map(|d| d.as_secs()), Some(181));
    }
}
