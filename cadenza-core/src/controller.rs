//! Playlist and playback state machine.
//!
//! The controller is the only writer of [`PlaylistState`]. Every play or
//! navigation request takes a [`RequestTicket`]; a library lookup that
//! resolves after a newer ticket was issued is discarded without touching
//! any state.

use crate::backend::{AudioBackend, BackendEvent};
use crate::error::{CoreError, Result};
use crate::event::{Notification, PlayerEvent};
use crate::playlist::PlaylistState;
use crate::provider::LocalLibrary;
use crate::time::{progress_fraction, DurationExt};
use crate::track::{ExternalTrackPayload, NowPlaying, Platform, SongDetails, SongId, Track};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const MSG_NO_SONG: &str = "No song selected";
const MSG_LOAD_FAILED: &str = "Error loading song. Please try again.";
const MSG_NO_PREVIEW: &str = "No preview available for this song on Deezer";
const MSG_LOCAL_PLAY_FAILED: &str = "Failed to play song. Please check if the audio file exists.";
const MSG_EXTERNAL_PLAY_FAILED: &str = "Failed to play Deezer stream. Try another song.";
const MSG_RESUME_FAILED: &str = "Failed to play. Please try again.";
const MSG_MEDIA_ERROR: &str = "Error playing song. File might be missing.";

/// Monotonic sequence number of a play or navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

/// What to do with a library song once its metadata arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalIntent {
    /// User asked for this song: append unless already present
    Request(SongId),
    /// Navigation onto an existing local entry
    Navigate { index: usize, id: SongId },
}

impl LocalIntent {
    #[must_use]
    pub const fn song_id(&self) -> SongId {
        match self {
            Self::Request(id) | Self::Navigate { id, .. } => *id,
        }
    }

    const fn target(&self) -> Option<usize> {
        match self {
            Self::Request(_) => None,
            Self::Navigate { index, .. } => Some(*index),
        }
    }
}

/// Direction of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Work needed to carry out a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStep {
    /// Stored catalog entry, playable right away
    External { index: usize },
    /// Library entry, metadata must be resolved first
    Local {
        ticket: RequestTicket,
        intent: LocalIntent,
    },
}

/// Result of a play request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Track loaded and the backend started playing
    Playing,
    /// Track loaded but the backend refused to start
    Blocked { reason: String },
    /// A newer request was issued while this one resolved; nothing changed
    Superseded,
    /// Navigation had nowhere to go
    Unchanged,
}

/// Coarse player state for views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Nothing loaded yet
    Idle,
    /// A library lookup is in flight
    Loading,
    Playing,
    Paused,
}

/// Position snapshot of the loaded media
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub position: Duration,
    pub duration: Option<Duration>,
    /// 0.0 to 1.0
    pub fraction: f64,
}

impl Progress {
    #[must_use]
    pub fn elapsed_clock(&self) -> String {
        self.position.to_clock()
    }

    #[must_use]
    pub fn total_clock(&self) -> Option<String> {
        self.duration.map(|d| d.to_clock())
    }
}

/// Everything a view needs to render the player
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub state: PlaylistState,
    pub status: PlayerStatus,
    pub now_playing: Option<NowPlaying>,
    pub progress: Progress,
    pub volume: f32,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: RequestTicket,
    target: Option<usize>,
}

/// Owns the session playlist and drives the audio backend
pub struct PlaybackController<B: AudioBackend> {
    state: PlaylistState,
    backend: B,
    library: Arc<dyn LocalLibrary>,
    now_playing: Option<NowPlaying>,
    event_tx: broadcast::Sender<PlayerEvent>,
    last_ticket: u64,
    pending: Option<Pending>,
}

impl<B: AudioBackend> PlaybackController<B> {
    /// Create a controller with an empty playlist
    #[must_use]
    pub fn new(
        backend: B,
        library: Arc<dyn LocalLibrary>,
        event_tx: broadcast::Sender<PlayerEvent>,
    ) -> Self {
        Self {
            state: PlaylistState::new(),
            backend,
            library,
            now_playing: None,
            event_tx,
            last_ticket: 0,
            pending: None,
        }
    }

    /// Subscribe to player events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub const fn state(&self) -> &PlaylistState {
        &self.state
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[must_use]
    pub fn library(&self) -> Arc<dyn LocalLibrary> {
        Arc::clone(&self.library)
    }

    #[must_use]
    pub const fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    #[must_use]
    pub const fn status(&self) -> PlayerStatus {
        if self.pending.is_some() {
            PlayerStatus::Loading
        } else if self.state.current_index().is_none() {
            PlayerStatus::Idle
        } else if self.state.is_playing() {
            PlayerStatus::Playing
        } else {
            PlayerStatus::Paused
        }
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        let position = self.backend.current_time();
        let duration = self
            .backend
            .duration()
            .or_else(|| self.now_playing.as_ref().and_then(|now| now.duration));
        Progress {
            position,
            duration,
            fraction: progress_fraction(position, duration),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.state.clone(),
            status: self.status(),
            now_playing: self.now_playing.clone(),
            progress: self.progress(),
            volume: self.backend.volume(),
        }
    }

    /// Whether `ticket` is still the newest request
    #[must_use]
    pub const fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.last_ticket
    }

    fn issue_ticket(&mut self) -> RequestTicket {
        self.last_ticket += 1;
        RequestTicket(self.last_ticket)
    }

    /// Position navigation steps from: a pending navigation target, else
    /// the loaded entry.
    fn cursor(&self) -> Option<usize> {
        self.pending
            .and_then(|pending| pending.target)
            .or_else(|| self.state.current_index())
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }

    fn notify(&self, notification: Notification) {
        self.emit(PlayerEvent::Notification(notification));
    }

    /// Read the play flag back from the backend.
    fn sync_playing(&mut self) {
        let is_playing = !self.backend.is_paused();
        if is_playing != self.state.is_playing() {
            self.state.set_playing(is_playing);
            self.emit(PlayerEvent::PlayStateChanged { is_playing });
        }
    }

    /// Start a library lookup. The caller resolves the song and hands the
    /// result to [`finish_local`](Self::finish_local) with the same ticket.
    pub fn begin_local(&mut self, intent: LocalIntent) -> RequestTicket {
        let ticket = self.issue_ticket();
        self.pending = Some(Pending {
            ticket,
            target: intent.target(),
        });
        debug!(
            "Request #{} resolving song {} ({:?})",
            ticket.0,
            intent.song_id(),
            intent
        );
        ticket
    }

    /// Apply a resolved library lookup.
    ///
    /// Stale tickets are discarded. A failed lookup is reported and leaves
    /// the playlist untouched.
    ///
    /// # Errors
    ///
    /// Returns the lookup error when `resolved` failed for the current ticket.
    pub async fn finish_local(
        &mut self,
        ticket: RequestTicket,
        intent: LocalIntent,
        resolved: Result<SongDetails>,
    ) -> Result<Transition> {
        if !self.is_current(ticket) {
            debug!(
                "Discarding stale response for song {} (request #{}, newest #{})",
                intent.song_id(),
                ticket.0,
                self.last_ticket
            );
            return Ok(Transition::Superseded);
        }
        if self.pending.is_some_and(|pending| pending.ticket == ticket) {
            self.pending = None;
        }

        let song = match resolved {
            Ok(song) => song,
            Err(e) => {
                warn!("Failed to load song {}: {}", intent.song_id(), e);
                self.notify(Notification::error(MSG_LOAD_FAILED));
                return Err(e);
            }
        };

        let index = match intent {
            LocalIntent::Request(id) => self.state.commit_local(id),
            LocalIntent::Navigate { index, .. } => {
                if !self.state.select(index) {
                    return Ok(Transition::Unchanged);
                }
                index
            }
        };

        self.load_and_play(NowPlaying::from_song(&song), index).await
    }

    /// Resolve and play a library song, appending it if it is new.
    ///
    /// # Errors
    ///
    /// `NotFound` or a network error when the lookup fails; the playlist is
    /// left exactly as it was.
    pub async fn request_play_local(&mut self, id: SongId) -> Result<Transition> {
        let intent = LocalIntent::Request(id);
        let ticket = self.begin_local(intent);
        let resolved = self.library.song(id).await;
        self.finish_local(ticket, intent, resolved).await
    }

    /// Append a catalog track and play its preview.
    ///
    /// # Errors
    ///
    /// `NoPreviewAvailable` when the payload has no preview URL; nothing is
    /// changed in that case.
    pub async fn request_play_external(
        &mut self,
        payload: ExternalTrackPayload,
    ) -> Result<Transition> {
        let Some(now) = NowPlaying::from_external(&payload) else {
            warn!(
                "No preview for catalog track \"{}\"",
                payload.display_title()
            );
            self.notify(Notification::error(MSG_NO_PREVIEW));
            return Err(CoreError::NoPreviewAvailable {
                title: payload.display_title().to_string(),
            });
        };

        self.issue_ticket();
        self.pending = None;
        let index = self.state.commit_external(payload);
        self.load_and_play(now, index).await
    }

    /// Work out where `direction` goes from the current cursor.
    ///
    /// Local targets get a ticket and must be finished with
    /// [`finish_local`](Self::finish_local); external targets are played
    /// with [`play_stored_external`](Self::play_stored_external).
    pub fn navigate(&mut self, direction: Direction) -> Option<NavigationStep> {
        let cursor = self.cursor();
        let index = match direction {
            Direction::Next => self.state.index_after(cursor),
            Direction::Previous => self.state.index_before(cursor),
        }?;

        match self.state.get(index)? {
            Track::Local(track) => {
                let intent = LocalIntent::Navigate {
                    index,
                    id: track.id,
                };
                let ticket = self.begin_local(intent);
                Some(NavigationStep::Local { ticket, intent })
            }
            Track::External(_) => {
                self.issue_ticket();
                self.pending = None;
                Some(NavigationStep::External { index })
            }
        }
    }

    /// Play a catalog entry already in the playlist, without appending.
    ///
    /// # Errors
    ///
    /// `NoPreviewAvailable` if the entry is not a playable catalog track.
    pub async fn play_stored_external(&mut self, index: usize) -> Result<Transition> {
        let now = match self.state.get(index) {
            Some(Track::External(track)) => NowPlaying::from_external(&track.payload),
            _ => None,
        };
        let Some(now) = now else {
            return Err(CoreError::NoPreviewAvailable {
                title: format!("playlist entry {index}"),
            });
        };
        if !self.state.select(index) {
            return Ok(Transition::Unchanged);
        }
        self.load_and_play(now, index).await
    }

    async fn step(&mut self, direction: Direction) -> Result<Transition> {
        match self.navigate(direction) {
            None => Ok(Transition::Unchanged),
            Some(NavigationStep::External { index }) => self.play_stored_external(index).await,
            Some(NavigationStep::Local { ticket, intent }) => {
                let resolved = self.library.song(intent.song_id()).await;
                self.finish_local(ticket, intent, resolved).await
            }
        }
    }

    /// Play the next entry, wrapping to the first after the last.
    ///
    /// # Errors
    ///
    /// Returns the lookup error if the next entry is a library song that
    /// cannot be resolved.
    pub async fn play_next(&mut self) -> Result<Transition> {
        self.step(Direction::Next).await
    }

    /// Play the previous entry. Does nothing at the first entry.
    ///
    /// # Errors
    ///
    /// Returns the lookup error if the previous entry is a library song that
    /// cannot be resolved.
    pub async fn play_previous(&mut self) -> Result<Transition> {
        self.step(Direction::Previous).await
    }

    /// Auto-advance when the backend reports the end of the media.
    ///
    /// # Errors
    ///
    /// Same as [`play_next`](Self::play_next).
    pub async fn on_track_ended(&mut self) -> Result<Transition> {
        self.sync_playing();
        self.play_next().await
    }

    /// Pause when playing, resume when paused.
    ///
    /// # Errors
    ///
    /// `PlaybackRejected` when the backend refuses to resume.
    pub async fn toggle_play_pause(&mut self) -> Result<()> {
        if self.state.current().is_none() {
            self.notify(Notification::info(MSG_NO_SONG));
            return Ok(());
        }

        if self.backend.is_paused() {
            let result = self.backend.play().await;
            self.sync_playing();
            if let Err(e) = result {
                warn!("Resume failed: {}", e);
                self.notify(Notification::error(MSG_RESUME_FAILED));
                return Err(e);
            }
        } else {
            self.backend.pause();
            self.sync_playing();
        }
        Ok(())
    }

    /// Seek to `fraction` of the loaded media. Ignored when nothing is loaded.
    pub fn seek(&mut self, fraction: f64) {
        if self.state.current().is_none() || !fraction.is_finite() {
            return;
        }
        self.backend.seek(fraction.clamp(0.0, 1.0));
    }

    /// Set output volume from a 0 to 100 slider value.
    pub fn set_volume(&mut self, percent: u8) {
        let volume = f32::from(percent.min(100)) / 100.0;
        self.backend.set_volume(volume);
    }

    /// Apply a backend signal. Returns `true` when the media ended and the
    /// caller should advance.
    pub fn on_backend_event(&mut self, event: BackendEvent) -> bool {
        match event {
            BackendEvent::Ended => {
                debug!("Backend reported end of media");
                self.sync_playing();
                true
            }
            BackendEvent::TimeUpdate { position } => {
                let duration = self.progress().duration;
                self.emit(PlayerEvent::Progress { position, duration });
                false
            }
            BackendEvent::MetadataLoaded { duration } => {
                if let (Some(now), Some(d)) = (self.now_playing.as_mut(), duration) {
                    now.duration = Some(d);
                }
                debug!("Media metadata loaded, duration: {:?}", duration);
                self.emit(PlayerEvent::DurationKnown { duration });
                false
            }
            BackendEvent::Error { message } => {
                warn!("Backend error: {}", message);
                self.sync_playing();
                self.notify(Notification::error(MSG_MEDIA_ERROR));
                false
            }
        }
    }

    async fn load_and_play(&mut self, now: NowPlaying, index: usize) -> Result<Transition> {
        info!(
            "Loading [{}] {} - {} (entry {} of {})",
            now.platform,
            now.artist,
            now.title,
            index + 1,
            self.state.len()
        );
        self.backend.load(&now.media_url);
        self.sync_playing();
        self.emit(PlayerEvent::TrackLoaded {
            index,
            track: now.clone(),
        });

        let result = self.backend.play().await;
        self.sync_playing();

        let transition = match result {
            Ok(()) => {
                let message = match now.platform {
                    Platform::Local => format!("Now playing: {}", now.title),
                    Platform::External => format!("Now playing: {} from Deezer", now.title),
                };
                self.notify(Notification::success(message));
                Transition::Playing
            }
            Err(e) => {
                warn!("Playback of \"{}\" failed: {}", now.title, e);
                let message = match now.platform {
                    Platform::Local => MSG_LOCAL_PLAY_FAILED,
                    Platform::External => MSG_EXTERNAL_PLAY_FAILED,
                };
                self.notify(Notification::error(message));
                Transition::Blocked {
                    reason: e.to_string(),
                }
            }
        };

        self.now_playing = Some(now);
        Ok(transition)
    }
}
