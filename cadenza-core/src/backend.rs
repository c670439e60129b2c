//! Audio backend contract.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Signals raised by a backend while media is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The loaded media played through to the end
    Ended,
    /// Periodic playback position report
    TimeUpdate { position: Duration },
    /// Media headers were read; duration may still be unknown for streams
    MetadataLoaded { duration: Option<Duration> },
    /// The media could not be fetched or decoded
    Error { message: String },
}

/// Sending half handed to a backend implementation.
pub type BackendEventSender = mpsc::UnboundedSender<BackendEvent>;

/// Receiving half consumed by the [`Player`](crate::Player) loop.
pub type BackendEventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

/// Create the channel a backend reports its events on.
#[must_use]
pub fn backend_channel() -> (BackendEventSender, BackendEventReceiver) {
    mpsc::unbounded_channel()
}

/// Media playback primitive driven by the
/// [`PlaybackController`](crate::PlaybackController).
///
/// Implementations should:
///
/// - Keep `load` and `play` cheap: fetch and decode in the background and
///   report failures as [`BackendEvent::Error`]
/// - Report `play` refusals (missing file, autoplay policy) as
///   [`CoreError::PlaybackRejected`](crate::CoreError::PlaybackRejected)
/// - Emit [`BackendEvent::Ended`] once per loaded media when it finishes
#[async_trait]
pub trait AudioBackend: Send {
    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;

    /// Replace the current media with `url`. Leaves the backend paused.
    fn load(&mut self, url: &str);

    /// Start or resume playback of the loaded media.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaybackRejected`](crate::CoreError::PlaybackRejected)
    /// when nothing is loaded or the media cannot be started.
    async fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Jump to `fraction` (0.0 to 1.0) of the media duration.
    fn seek(&mut self, fraction: f64);

    fn current_time(&self) -> Duration;

    /// Media length, once known
    fn duration(&self) -> Option<Duration>;

    /// Output volume, 0.0 to 1.0
    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);
}
