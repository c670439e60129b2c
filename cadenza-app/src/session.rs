//! Executes parsed commands against the player, search and library.

use crate::command::{Command, Section, HELP};
use cadenza_core::{
    CoreError, DurationExt, PlayerHandle, PlayerSnapshot, SearchFilter, SearchResults,
    SearchService, SongId, Track,
};
use cadenza_library::LibraryClient;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, error};

pub struct Session {
    player: PlayerHandle,
    search: SearchService,
    library: Arc<LibraryClient>,
    results: SearchResults,
    filter: SearchFilter,
}

impl Session {
    #[must_use]
    pub fn new(
        player: PlayerHandle,
        search: SearchService,
        library: Arc<LibraryClient>,
    ) -> Self {
        Self {
            player,
            search,
            library,
            results: SearchResults::default(),
            filter: SearchFilter::All,
        }
    }

    /// Run one command; `Break` ends the session.
    ///
    /// # Errors
    ///
    /// Returns `PlayerStopped` once the player task is gone.
    pub async fn execute(&mut self, command: Command) -> Result<ControlFlow<()>, CoreError> {
        match command {
            Command::Search(query) => self.run_search(&query).await,
            Command::Play(id) => self.player.play_local(id).await?,
            Command::Pick { section, row } => self.pick(section, row).await?,
            Command::TogglePlayPause => self.player.toggle_play_pause().await?,
            Command::Next => self.player.next().await?,
            Command::Previous => self.player.previous().await?,
            Command::Seek(fraction) => self.player.seek(fraction).await?,
            Command::Volume(percent) => {
                self.player.set_volume(percent).await?;
                println!("Volume {percent}%");
            }
            Command::Favorite(id) => {
                if let Some(id) = self.song_or_current(id).await? {
                    self.toggle_favorite(id).await;
                }
            }
            Command::CreatePlaylist(name) => self.create_playlist(&name).await,
            Command::AddToPlaylist {
                playlist_id,
                song_id,
            } => {
                if let Some(id) = self.song_or_current(song_id).await? {
                    self.add_to_playlist(playlist_id, id).await;
                }
            }
            Command::Filter(filter) => {
                self.filter = filter;
                self.print_results();
            }
            Command::Status => print_status(&self.player.snapshot().await?),
            Command::Queue => print_queue(&self.player.snapshot().await?),
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn run_search(&mut self, query: &str) {
        match self.search.search(query).await {
            Ok(results) => {
                self.results = results;
                self.print_results();
            }
            Err(e) => {
                error!("Search failed: {}", e);
                println!("Search failed. Please try again.");
            }
        }
    }

    fn print_results(&self) {
        if self.results.query.is_empty() {
            return;
        }
        if self.results.is_empty() {
            println!("No results found");
            return;
        }

        let songs = self.results.local_section(self.filter);
        if !songs.is_empty() {
            println!("Library:");
            for (row, song) in songs.iter().enumerate() {
                println!("  L{:<3} {} - {}  (#{})", row + 1, song.title, song.artist, song.id);
            }
        }

        let tracks = self.results.external_section(self.filter);
        if !tracks.is_empty() {
            println!("Deezer:");
            for (row, track) in tracks.iter().enumerate() {
                let playable = if track.preview_url().is_some() {
                    ""
                } else {
                    "  [no preview]"
                };
                println!(
                    "  D{:<3} {} - {}  ({}){}",
                    row + 1,
                    track.display_title(),
                    track.artist,
                    track.duration().to_clock(),
                    playable
                );
            }
        }
    }

    async fn pick(&self, section: Section, row: usize) -> Result<(), CoreError> {
        let index = row - 1;
        match section {
            Section::Library => match self.results.local_section(self.filter).get(index) {
                Some(hit) => self.player.play_local(hit.id).await,
                None => {
                    println!("No library result L{row}");
                    Ok(())
                }
            },
            Section::Deezer => match self.results.external_section(self.filter).get(index) {
                Some(track) => {
                    println!("Loading from Deezer...");
                    self.player.play_external(track.clone()).await
                }
                None => {
                    println!("No Deezer result D{row}");
                    Ok(())
                }
            },
        }
    }

    /// The given id, else the loaded library song
    async fn song_or_current(&self, id: Option<SongId>) -> Result<Option<SongId>, CoreError> {
        if id.is_some() {
            return Ok(id);
        }
        let snapshot = self.player.snapshot().await?;
        let current = snapshot.state.current().and_then(Track::local_id);
        if current.is_none() {
            println!("No song selected");
        }
        Ok(current)
    }

    async fn toggle_favorite(&self, id: SongId) {
        match self.library.toggle_favorite(id).await {
            Ok(status) if status.is_favorite => println!("Added to favorites"),
            Ok(_) => println!("Removed from favorites"),
            Err(e) => error!("Error toggling favorite: {}", e),
        }
    }

    async fn create_playlist(&self, name: &str) {
        match self.library.create_playlist(name).await {
            Ok(id) => {
                debug!("Playlist id: {:?}", id);
                println!("Playlist created successfully!");
                if let Some(id) = id {
                    println!("  id {id}");
                }
            }
            Err(e) => {
                error!("Error creating playlist: {}", e);
                println!("Failed to create playlist");
            }
        }
    }

    async fn add_to_playlist(&self, playlist_id: u64, id: SongId) {
        match self.library.add_to_playlist(playlist_id, id).await {
            Ok(()) => println!("Song added to playlist!"),
            Err(e) => {
                error!("Error adding to playlist: {}", e);
                println!("Failed to add to playlist");
            }
        }
    }
}

fn print_status(snapshot: &PlayerSnapshot) {
    let Some(now) = &snapshot.now_playing else {
        println!("{:?}: nothing loaded", snapshot.status);
        return;
    };
    let progress = &snapshot.progress;
    println!(
        "{:?}: {} - {} [{}] ({})",
        snapshot.status,
        now.title,
        now.artist,
        now.album,
        now.platform
    );
    println!(
        "  {} / {}  volume {:.0}%",
        progress.elapsed_clock(),
        progress.total_clock().unwrap_or_else(|| "-:--".into()),
        snapshot.volume * 100.0
    );
}

fn print_queue(snapshot: &PlayerSnapshot) {
    let state = &snapshot.state;
    if state.is_empty() {
        println!("Playlist is empty");
        return;
    }
    for (index, track) in state.entries().iter().enumerate() {
        let marker = if state.current_index() == Some(index) {
            ">"
        } else {
            " "
        };
        match track {
            Track::Local(local) => {
                println!("{marker} {:>3}  library song #{}", index + 1, local.id);
            }
            Track::External(external) => println!(
                "{marker} {:>3}  {} - {} (Deezer, {})",
                index + 1,
                external.payload.display_title(),
                external.payload.artist,
                external.payload.player_id()
            ),
        }
    }
}
