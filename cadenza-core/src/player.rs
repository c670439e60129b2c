//! Player task: the single serialized entry point to the controller.
//!
//! Commands from any number of [`PlayerHandle`]s, backend signals and
//! completed library lookups are multiplexed into one loop, so the
//! [`PlaybackController`] is never touched concurrently. Library lookups run
//! in spawned tasks and their results go through the controller's ticket
//! check. Backends are expected to fetch media off the loop as well.

use crate::backend::{AudioBackend, BackendEvent, BackendEventReceiver};
use crate::controller::{
    Direction, LocalIntent, NavigationStep, PlaybackController, PlayerSnapshot, PlayerStatus,
    RequestTicket, Transition,
};
use crate::error::{CoreError, Result};
use crate::event::{event_channel, PlayerEvent};
use crate::provider::LocalLibrary;
use crate::track::{ExternalTrackPayload, SongDetails, SongId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Requests accepted by the player task
#[derive(Debug)]
pub enum PlayerCommand {
    PlayLocal(SongId),
    PlayExternal(ExternalTrackPayload),
    TogglePlayPause,
    Next,
    Previous,
    /// Fraction of the track, 0.0 to 1.0
    Seek(f64),
    /// Volume, 0 to 100
    SetVolume(u8),
    Snapshot(oneshot::Sender<PlayerSnapshot>),
}

/// Cloneable sender side of a running [`Player`]
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl PlayerHandle {
    async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CoreError::PlayerStopped)
    }

    /// Subscribe to player events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// # Errors
    ///
    /// Returns `PlayerStopped` if the player task has exited.
    pub async fn play_local(&self, id: SongId) -> Result<()> {
        self.send(PlayerCommand::PlayLocal(id)).await
    }

    /// # Errors
    ///
    /// Returns `PlayerStopped` if the player task has exited.
    pub async fn play_external(&self, payload: ExternalTrackPayload) -> Result<()> {
        self.send(PlayerCommand::PlayExternal(payload)).await
    }

    /// # Errors
    ///
    /// Returns `PlayerStopped` if the player task has exited.
    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlayPause).await
    }

    /// # Errors
    ///
    /// Returns `PlayerStopped` if the player task has exited.
    pub async fn next(&self) -> Result<()> {
        self.send(PlayerCommand::Next).await
    }

    /// # Errors
    ///
    /// Returns `PlayerStopped` if the player task has exited.
    pub async fn previous(&self) -> Result<()> {
        self.send(PlayerCommand::Previous).await
    }

    /// # Errors
    ///
    /// Returns `PlayerStopped` if the player task has exited.
    pub async fn seek(&self, fraction: f64) -> Result<()> {
        self.send(PlayerCommand::Seek(fraction)).await
    }

    /// # Errors
    ///
    /// Returns `PlayerStopped` if the player task has exited.
    pub async fn set_volume(&self, percent: u8) -> Result<()> {
        self.send(PlayerCommand::SetVolume(percent)).await
    }

    /// Current player state, taken after all earlier commands were handled.
    ///
    /// # Errors
    ///
    /// Returns `PlayerStopped` if the player task has exited.
    pub async fn snapshot(&self) -> Result<PlayerSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PlayerCommand::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| CoreError::PlayerStopped)
    }
}

/// Library lookup finished in a spawned task
struct Resolved {
    ticket: RequestTicket,
    intent: LocalIntent,
    result: Result<SongDetails>,
}

/// Owns the controller and runs its event loop
pub struct Player<B: AudioBackend> {
    controller: PlaybackController<B>,
    commands: mpsc::Receiver<PlayerCommand>,
    backend_events: BackendEventReceiver,
    resolved_tx: mpsc::UnboundedSender<Resolved>,
    resolved_rx: mpsc::UnboundedReceiver<Resolved>,
    cancel_token: CancellationToken,
    autoplay: bool,
}

impl<B: AudioBackend + 'static> Player<B> {
    /// Create a player and the handle used to drive it
    ///
    /// # Arguments
    /// * `backend` - Audio backend the controller plays through
    /// * `backend_events` - Receiver the backend reports its events on
    /// * `library` - Local library used to resolve song metadata
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    #[must_use]
    pub fn new(
        backend: B,
        backend_events: BackendEventReceiver,
        library: Arc<dyn LocalLibrary>,
        cancel_token: Option<CancellationToken>,
    ) -> (Self, PlayerHandle) {
        let event_tx = event_channel();
        let (tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();

        let player = Self {
            controller: PlaybackController::new(backend, library, event_tx.clone()),
            commands,
            backend_events,
            resolved_tx,
            resolved_rx,
            cancel_token: cancel_token.unwrap_or_default(),
            autoplay: true,
        };
        (player, PlayerHandle { tx, event_tx })
    }

    /// Whether to advance when a track ends
    #[must_use]
    pub const fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start the player loop in a background task
    #[must_use]
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until cancelled or every handle is dropped
    pub async fn run(mut self) {
        info!(
            "Player started (backend: {}, library: {})",
            self.controller.backend().name(),
            self.controller.library().name()
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Player shutting down");
                    break;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        info!("All player handles dropped, stopping");
                        break;
                    };
                    self.handle_command(command).await;
                }
                Some(event) = self.backend_events.recv() => {
                    self.handle_backend_event(event).await;
                }
                Some(resolved) = self.resolved_rx.recv() => {
                    self.handle_resolved(resolved).await;
                }
            }
        }
    }

    async fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::PlayLocal(id) => {
                let intent = LocalIntent::Request(id);
                let ticket = self.controller.begin_local(intent);
                self.spawn_resolve(ticket, intent);
            }
            PlayerCommand::PlayExternal(payload) => {
                let result = self.controller.request_play_external(payload).await;
                log_outcome("play external", &result);
            }
            PlayerCommand::TogglePlayPause => {
                if let Err(e) = self.controller.toggle_play_pause().await {
                    debug!("Toggle play/pause failed: {}", e);
                }
            }
            PlayerCommand::Next => self.navigate(Direction::Next).await,
            PlayerCommand::Previous => self.navigate(Direction::Previous).await,
            PlayerCommand::Seek(fraction) => self.controller.seek(fraction),
            PlayerCommand::SetVolume(percent) => self.controller.set_volume(percent),
            PlayerCommand::Snapshot(reply) => {
                let _ = reply.send(self.controller.snapshot());
            }
        }
    }

    async fn handle_backend_event(&mut self, event: BackendEvent) {
        let ended = self.controller.on_backend_event(event);
        if !ended || !self.autoplay {
            return;
        }
        // A track is already on its way; advancing would supersede it
        if self.controller.status() == PlayerStatus::Loading {
            debug!("Track ended while a lookup is pending, not advancing");
            return;
        }
        self.navigate(Direction::Next).await;
    }

    async fn handle_resolved(&mut self, resolved: Resolved) {
        let Resolved {
            ticket,
            intent,
            result,
        } = resolved;
        let outcome = self.controller.finish_local(ticket, intent, result).await;
        log_outcome("play local", &outcome);
    }

    async fn navigate(&mut self, direction: Direction) {
        match self.controller.navigate(direction) {
            None => debug!("Nothing to play for {:?}", direction),
            Some(NavigationStep::Local { ticket, intent }) => self.spawn_resolve(ticket, intent),
            Some(NavigationStep::External { index }) => {
                let result = self.controller.play_stored_external(index).await;
                log_outcome("play stored external", &result);
            }
        }
    }

    fn spawn_resolve(&self, ticket: RequestTicket, intent: LocalIntent) {
        let library = self.controller.library();
        let tx = self.resolved_tx.clone();
        tokio::spawn(async move {
            let result = library.song(intent.song_id()).await;
            let _ = tx.send(Resolved {
                ticket,
                intent,
                result,
            });
        });
    }
}

fn log_outcome(action: &str, outcome: &Result<Transition>) {
    match outcome {
        Ok(Transition::Blocked { reason }) => warn!("{action}: playback blocked: {reason}"),
        Ok(transition) => debug!("{action}: {transition:?}"),
        Err(e) => debug!("{action} failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::backend_channel;
    use crate::testing::{song, FakeBackend, FakeLibrary};
    use crate::track::Track;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_does_not_override_newer_request() {
        let library = FakeLibrary::with_songs([song(1), song(2)]);
        library.delay(SongId(1), Duration::from_secs(5));
        let (_backend_tx, backend_rx) = backend_channel();
        let (player, handle) =
            Player::new(FakeBackend::default(), backend_rx, Arc::new(library), None);
        let _task = player.start();

        handle.play_local(SongId(1)).await.unwrap();
        handle.play_local(SongId(2)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.entries(), &[Track::local(SongId(2))]);
        assert_eq!(snapshot.state.current_index(), Some(0));
        assert_eq!(
            snapshot.now_playing.map(|n| n.media_url),
            Some(song(2).file_url)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_status_while_resolving() {
        let library = FakeLibrary::with_songs([song(1)]);
        library.delay(SongId(1), Duration::from_secs(5));
        let (_backend_tx, backend_rx) = backend_channel();
        let (player, handle) =
            Player::new(FakeBackend::default(), backend_rx, Arc::new(library), None);
        let _task = player.start();

        handle.play_local(SongId(1)).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().status, PlayerStatus::Loading);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(handle.snapshot().await.unwrap().status, PlayerStatus::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_event_advances() {
        let library = FakeLibrary::with_songs([song(1), song(2)]);
        let (backend_tx, backend_rx) = backend_channel();
        let (player, handle) =
            Player::new(FakeBackend::default(), backend_rx, Arc::new(library), None);
        let _task = player.start();

        handle.play_local(SongId(1)).await.unwrap();
        settle().await;
        handle.play_local(SongId(2)).await.unwrap();
        settle().await;

        backend_tx.send(BackendEvent::Ended).unwrap();
        settle().await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.current_index(), Some(0));
        assert_eq!(snapshot.state.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_during_lookup_keeps_requested_song() {
        let library = FakeLibrary::with_songs([song(1), song(3)]);
        library.delay(SongId(3), Duration::from_secs(5));
        let (backend_tx, backend_rx) = backend_channel();
        let (player, handle) =
            Player::new(FakeBackend::default(), backend_rx, Arc::new(library), None);
        let _task = player.start();

        handle.play_local(SongId(1)).await.unwrap();
        settle().await;
        handle.play_local(SongId(3)).await.unwrap();
        settle().await;
        backend_tx.send(BackendEvent::Ended).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(
            snapshot.state.entries(),
            &[Track::local(SongId(1)), Track::local(SongId(3))]
        );
        assert_eq!(snapshot.state.current_index(), Some(1));
        assert_eq!(snapshot.status, PlayerStatus::Playing);
        assert_eq!(snapshot.now_playing.map(|n| n.title).as_deref(), Some("Song 3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_without_autoplay_stays() {
        let library = FakeLibrary::with_songs([song(1), song(2)]);
        let (backend_tx, backend_rx) = backend_channel();
        let (player, handle) =
            Player::new(FakeBackend::default(), backend_rx, Arc::new(library), None);
        let _task = player.with_autoplay(false).start();

        handle.play_local(SongId(1)).await.unwrap();
        settle().await;
        handle.play_local(SongId(2)).await.unwrap();
        settle().await;
        backend_tx.send(BackendEvent::Ended).unwrap();
        settle().await;

        assert_eq!(handle.snapshot().await.unwrap().state.current_index(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_through_handle() {
        let library = FakeLibrary::with_songs([song(1)]);
        let (_backend_tx, backend_rx) = backend_channel();
        let (player, handle) =
            Player::new(FakeBackend::default(), backend_rx, Arc::new(library), None);
        let _task = player.start();

        handle.play_local(SongId(1)).await.unwrap();
        settle().await;
        handle
            .play_external(ExternalTrackPayload {
                title: Some("Preview".into()),
                preview: Some("https://cdn/preview.mp3".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        handle.previous().await.unwrap();
        settle().await;
        assert_eq!(handle.snapshot().await.unwrap().state.current_index(), Some(0));

        handle.next().await.unwrap();
        handle.toggle_play_pause().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.current_index(), Some(1));
        assert_eq!(snapshot.status, PlayerStatus::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_reach_subscribers() {
        let library = FakeLibrary::with_songs([song(1)]);
        let (_backend_tx, backend_rx) = backend_channel();
        let (player, handle) =
            Player::new(FakeBackend::default(), backend_rx, Arc::new(library), None);
        let mut rx = handle.subscribe();
        let _task = player.start();

        handle.play_local(SongId(1)).await.unwrap();
        settle().await;

        let mut loaded = false;
        while let Ok(event) = rx.try_recv() {
            if let PlayerEvent::TrackLoaded { index, track } = event {
                assert_eq!(index, 0);
                assert_eq!(track.title, "Song 1");
                loaded = true;
            }
        }
        assert!(loaded);
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_player() {
        let (_backend_tx, backend_rx) = backend_channel();
        let cancel = CancellationToken::new();
        let (player, handle) = Player::new(
            FakeBackend::default(),
            backend_rx,
            Arc::new(FakeLibrary::default()),
            Some(cancel.clone()),
        );
        let task = player.start();
        cancel.cancel();
        task.await.unwrap();

        assert!(matches!(
            handle.snapshot().await,
            Err(CoreError::PlayerStopped)
        ));
    }
}
