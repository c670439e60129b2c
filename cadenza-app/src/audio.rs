//! `rodio` audio backend.
//!
//! The output stream lives on a dedicated thread for the lifetime of the
//! backend; sinks connect to its mixer. `load` attaches an empty paused sink
//! and hands the download to a background task, which decodes the media in
//! memory, queues it on the sink and then watches the sink for progress and
//! the end of the track.

use async_trait::async_trait;
use cadenza_core::{AudioBackend, BackendEvent, BackendEventSender, CoreError};
use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often the watcher samples the sink
const WATCH_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of a background download
#[derive(Debug, Clone, Copy)]
enum Media {
    Ready { duration: Option<Duration> },
    Failed,
}

/// Sink for the loaded URL; the media arrives once the download finishes
struct Loaded {
    sink: Arc<Sink>,
    media: Arc<OnceLock<Media>>,
    task: CancellationToken,
}

impl Loaded {
    fn duration(&self) -> Option<Duration> {
        match self.media.get() {
            Some(Media::Ready { duration }) => *duration,
            _ => None,
        }
    }
}

pub struct RodioBackend {
    mixer: Mixer,
    client: reqwest::Client,
    events: BackendEventSender,
    source_url: Option<String>,
    loaded: Option<Loaded>,
    volume: f32,
    // Dropping this ends the output thread, which owns the stream
    _output_guard: std_mpsc::Sender<()>,
}

impl RodioBackend {
    /// Open the default output device.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if no output device can be opened.
    pub fn open(client: reqwest::Client, events: BackendEventSender) -> Result<Self, CoreError> {
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (guard_tx, guard_rx) = std_mpsc::channel::<()>();

        thread::Builder::new()
            .name("cadenza-audio-output".into())
            .spawn(move || match OutputStreamBuilder::open_default_stream() {
                Ok(mut stream) => {
                    // rodio logs to stderr when the stream is dropped
                    stream.log_on_drop(false);
                    let _ = ready_tx.send(Ok(stream.mixer().clone()));
                    // Returns once the backend is dropped
                    let _ = guard_rx.recv();
                    debug!("Audio output thread exiting");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })?;

        let mixer = ready_rx
            .recv()
            .map_err(|_| CoreError::Backend {
                reason: "audio output thread exited during startup".into(),
            })?
            .map_err(|reason| CoreError::Backend { reason })?;

        info!("Opened default audio output");
        Ok(Self::with_mixer(mixer, client, events, guard_tx))
    }

    fn with_mixer(
        mixer: Mixer,
        client: reqwest::Client,
        events: BackendEventSender,
        output_guard: std_mpsc::Sender<()>,
    ) -> Self {
        Self {
            mixer,
            client,
            events,
            source_url: None,
            loaded: None,
            volume: 1.0,
            _output_guard: output_guard,
        }
    }

    fn unload(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            loaded.task.cancel();
            loaded.sink.stop();
        }
    }

    /// Connect a paused sink for `url` and start downloading into it.
    fn attach(&mut self, url: String) {
        let sink = Arc::new(Sink::connect_new(&self.mixer));
        sink.pause();
        sink.set_volume(self.volume);

        let media = Arc::new(OnceLock::new());
        let task = CancellationToken::new();
        tokio::spawn(load_media(
            self.client.clone(),
            url,
            Arc::clone(&sink),
            Arc::clone(&media),
            self.events.clone(),
            task.clone(),
        ));

        self.loaded = Some(Loaded { sink, media, task });
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        self.unload();
    }
}

#[async_trait]
impl AudioBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn load(&mut self, url: &str) {
        self.unload();
        self.source_url = Some(url.to_string());
        self.attach(url.to_string());
    }

    async fn play(&mut self) -> Result<(), CoreError> {
        let restart = match &self.loaded {
            None => true,
            Some(loaded) => match loaded.media.get() {
                Some(Media::Failed) => {
                    return Err(CoreError::PlaybackRejected {
                        reason: "media could not be loaded".into(),
                    });
                }
                Some(Media::Ready { .. }) => loaded.sink.empty(),
                None => false,
            },
        };

        if restart {
            let url = self.source_url.clone().ok_or_else(|| CoreError::PlaybackRejected {
                reason: "no media loaded".into(),
            })?;
            debug!("Restarting media from the beginning: {}", url);
            self.unload();
            self.attach(url);
        }

        if let Some(loaded) = &self.loaded {
            loaded.sink.play();
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(loaded) = &self.loaded {
            loaded.sink.pause();
        }
    }

    fn is_paused(&self) -> bool {
        self.loaded
            .as_ref()
            .is_none_or(|loaded| match loaded.media.get() {
                Some(Media::Failed) => true,
                Some(Media::Ready { .. }) => loaded.sink.is_paused() || loaded.sink.empty(),
                None => loaded.sink.is_paused(),
            })
    }

    fn seek(&mut self, fraction: f64) {
        let Some(loaded) = &self.loaded else {
            return;
        };
        let Some(total) = loaded.duration() else {
            debug!("Seek ignored: media length unknown");
            return;
        };
        if let Err(e) = loaded.sink.try_seek(total.mul_f64(fraction)) {
            warn!("Seek failed: {}", e);
        }
    }

    fn current_time(&self) -> Duration {
        self.loaded
            .as_ref()
            .map_or(Duration::ZERO, |loaded| loaded.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.loaded.as_ref().and_then(Loaded::duration)
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(loaded) = &self.loaded {
            loaded.sink.set_volume(volume);
        }
    }
}

/// Download and decode `url`. Every failure is a playback rejection.
async fn fetch_source(
    client: &reqwest::Client,
    url: &str,
) -> Result<Decoder<Cursor<Vec<u8>>>, CoreError> {
    let rejected = |reason: String| CoreError::PlaybackRejected { reason };

    debug!("Downloading media: {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| rejected(format!("cannot fetch media: {e}")))?;
    if !response.status().is_success() {
        return Err(rejected(format!("media returned status {}", response.status())));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| rejected(format!("media download failed: {e}")))?;

    Decoder::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| rejected(format!("cannot decode media: {e}")))
}

/// Background half of `load`: fill the sink, then watch it
async fn load_media(
    client: reqwest::Client,
    url: String,
    sink: Arc<Sink>,
    media: Arc<OnceLock<Media>>,
    events: BackendEventSender,
    cancel: CancellationToken,
) {
    let fetched = tokio::select! {
        () = cancel.cancelled() => return,
        fetched = fetch_source(&client, &url) => fetched,
    };
    // Replaced while downloading; a stopped sink would restart on append
    if cancel.is_cancelled() {
        return;
    }

    match fetched {
        Ok(source) => {
            let duration = source.total_duration();
            sink.append(source);
            let _ = media.set(Media::Ready { duration });
            let _ = events.send(BackendEvent::MetadataLoaded { duration });
            watch_sink(&sink, &events, &cancel).await;
        }
        Err(e) => {
            warn!("Cannot load {}: {}", url, e);
            let _ = media.set(Media::Failed);
            sink.pause();
            let _ = events.send(BackendEvent::Error {
                message: e.to_string(),
            });
        }
    }
}

/// Report position while playing and `Ended` once the sink drains
async fn watch_sink(sink: &Sink, events: &BackendEventSender, cancel: &CancellationToken) {
    let mut interval = tokio::time::interval(WATCH_INTERVAL);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if sink.empty() {
                    let _ = events.send(BackendEvent::Ended);
                    break;
                }
                if !sink.is_paused() {
                    let _ = events.send(BackendEvent::TimeUpdate {
                        position: sink.get_pos(),
                    });
                }
            }
        }
    }
}
