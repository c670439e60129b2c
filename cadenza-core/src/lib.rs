pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod http;
pub mod paths;
pub mod player;
pub mod playlist;
pub mod provider;
pub mod search;
pub mod time;
pub mod track;

#[cfg(test)]
mod testing;

pub use backend::{
    backend_channel, AudioBackend, BackendEvent, BackendEventReceiver, BackendEventSender,
};
pub use config::{
    CadenzaConfig, LoggingConfig, PlayerConfig, SearchConfig, ServerConfig, CONFIG_TEMPLATE,
};
pub use controller::{
    Direction, LocalIntent, NavigationStep, PlaybackController, PlayerSnapshot, PlayerStatus,
    Progress, RequestTicket, Transition,
};
pub use error::{CoreError, Result};
pub use event::{Notification, NotificationLevel, PlayerEvent};
pub use paths::{
    config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME,
};
pub use player::{Player, PlayerCommand, PlayerHandle};
pub use playlist::PlaylistState;
pub use provider::{
    ExternalCatalog, LocalAlbumHit, LocalArtistHit, LocalLibrary, LocalSearchResults, LocalSongHit,
};
pub use search::{SearchFilter, SearchResults, SearchService};
pub use time::DurationExt;
pub use track::{
    ExternalTrackPayload, NowPlaying, Platform, SongDetails, SongId, Track, DEFAULT_COVER_URL,
};
