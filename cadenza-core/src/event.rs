//! Events the player publishes for views.

use crate::track::NowPlaying;
use std::time::Duration;
use tokio::sync::broadcast;

/// Capacity of the player event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Short message meant for a toast or status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Events emitted by the playback controller
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A track was loaded into the backend
    TrackLoaded {
        index: usize,
        track: NowPlaying,
    },
    /// Backend play state changed
    PlayStateChanged {
        is_playing: bool,
    },
    /// Regular position update
    Progress {
        position: Duration,
        duration: Option<Duration>,
    },
    /// Backend read the media length
    DurationKnown {
        duration: Option<Duration>,
    },
    /// Something the user should be told about
    Notification(Notification),
}

/// Create a sender for player events.
#[must_use]
pub fn event_channel() -> broadcast::Sender<PlayerEvent> {
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    event_tx
}
