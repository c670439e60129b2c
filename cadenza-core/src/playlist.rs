//! Session playlist: an append-only list of tracks plus the cursor into it.

use crate::track::{ExternalTrackPayload, Platform, SongId, Track};

/// Playlist and playback flags for one player session.
///
/// Entries are only ever appended. `current_index` is `None` until the first
/// track is committed, afterwards it always points at a valid entry whose
/// variant matches `current_platform`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistState {
    entries: Vec<Track>,
    current_index: Option<usize>,
    current_platform: Platform,
    is_playing: bool,
}

impl PlaylistState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[Track] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    #[must_use]
    pub const fn current_platform(&self) -> Platform {
        self.current_platform
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// The loaded entry, if any
    #[must_use]
    pub fn current(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.entries.get(i))
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.entries.get(index)
    }

    /// Position of a library song, comparing local entries only.
    #[must_use]
    pub fn position_of_local(&self, id: SongId) -> Option<usize> {
        self.entries
            .iter()
            .position(|track| track.local_id() == Some(id))
    }

    /// Index `next` would move to from `cursor`: forward, wrapping to the
    /// start after the last entry. `None` for an empty playlist.
    #[must_use]
    pub fn index_after(&self, cursor: Option<usize>) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        match cursor {
            Some(i) if i + 1 < self.entries.len() => Some(i + 1),
            _ => Some(0),
        }
    }

    /// Index `previous` would move to from `cursor`. Never wraps.
    #[must_use]
    pub fn index_before(&self, cursor: Option<usize>) -> Option<usize> {
        match cursor {
            Some(i) if i > 0 && i < self.entries.len() => Some(i - 1),
            _ => None,
        }
    }

    /// Make a library song current, appending it only if it is not already
    /// in the playlist. Returns its index.
    pub fn commit_local(&mut self, id: SongId) -> usize {
        let index = self.position_of_local(id).unwrap_or_else(|| {
            self.entries.push(Track::local(id));
            self.entries.len() - 1
        });
        self.current_index = Some(index);
        self.current_platform = Platform::Local;
        index
    }

    /// Append a catalog track and make it current. Returns its index.
    pub fn commit_external(&mut self, payload: ExternalTrackPayload) -> usize {
        self.entries.push(Track::external(payload));
        let index = self.entries.len() - 1;
        self.current_index = Some(index);
        self.current_platform = Platform::External;
        index
    }

    /// Move the cursor onto an existing entry. Returns `false` (and changes
    /// nothing) when the index is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        let Some(track) = self.entries.get(index) else {
            return false;
        };
        self.current_platform = track.platform();
        self.current_index = Some(index);
        true
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
    }
}
