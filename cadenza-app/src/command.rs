//! Line commands accepted on stdin.

use cadenza_core::{SearchFilter, SongId};
use thiserror::Error;

/// Search result section a `pick` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Library,
    Deezer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    /// Play a library song by id
    Play(SongId),
    /// Play a row of the last search, 1-based
    Pick { section: Section, row: usize },
    TogglePlayPause,
    Next,
    Previous,
    /// Percent of the track
    Seek(f64),
    Volume(u8),
    /// Favorite a song, defaulting to the loaded library song
    Favorite(Option<SongId>),
    CreatePlaylist(String),
    AddToPlaylist {
        playlist_id: u64,
        song_id: Option<SongId>,
    },
    Filter(SearchFilter),
    Status,
    Queue,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type \"help\")")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  search <query>               search the library and Deezer
  filter all|library|deezer    choose which search results are shown
  pick <L|D><n>                play row n of the library (L) or Deezer (D) results
  play <song id>               play a library song
  toggle                       play / pause
  next, prev                   move through the playlist
  seek <0-100>                 jump to a percentage of the track
  volume <0-100>               set the volume
  fav [song id]                toggle favorite (defaults to the current song)
  playlist create <name>       create a playlist
  playlist add <id> [song id]  add a song to a playlist
  status, queue                show the player and the playlist
  quit";

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` describing what is wrong with the line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "search" | "s" | "/" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("search <query>"));
                }
                Self::Search(rest.to_string())
            }
            "play" => Self::Play(parse_song_id(rest, "play <song id>")?),
            "pick" => parse_pick(rest)?,
            "toggle" | "pause" | "resume" | "p" => Self::TogglePlayPause,
            "next" | "n" => Self::Next,
            "prev" | "previous" | "b" => Self::Previous,
            "seek" => {
                let percent = parse_percent(rest, "seek <0-100>")?;
                Self::Seek(f64::from(percent) / 100.0)
            }
            "volume" | "vol" => Self::Volume(parse_percent(rest, "volume <0-100>")?),
            "fav" | "favorite" => Self::Favorite(parse_optional_song_id(rest, "fav [song id]")?),
            "playlist" => parse_playlist(rest)?,
            "filter" => Self::Filter(
                rest.parse()
                    .map_err(|_| CommandError::Usage("filter all|library|deezer"))?,
            ),
            "status" => Self::Status,
            "queue" | "list" => Self::Queue,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn parse_song_id(arg: &str, usage: &'static str) -> Result<SongId, CommandError> {
    arg.parse().map_err(|_| CommandError::Usage(usage))
}

fn parse_optional_song_id(arg: &str, usage: &'static str) -> Result<Option<SongId>, CommandError> {
    if arg.is_empty() {
        Ok(None)
    } else {
        parse_song_id(arg, usage).map(Some)
    }
}

fn parse_percent(arg: &str, usage: &'static str) -> Result<u8, CommandError> {
    let value: u8 = arg.parse().map_err(|_| CommandError::Usage(usage))?;
    if value > 100 {
        return Err(CommandError::Invalid(format!(
            "{value} is out of range, expected 0-100"
        )));
    }
    Ok(value)
}

fn parse_pick(arg: &str) -> Result<Command, CommandError> {
    const USAGE: &str = "pick <L|D><n>";
    let mut chars = arg.chars();
    let section = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('L') => Section::Library,
        Some('D') => Section::Deezer,
        _ => return Err(CommandError::Usage(USAGE)),
    };
    let row: usize = chars
        .as_str()
        .trim()
        .parse()
        .map_err(|_| CommandError::Usage(USAGE))?;
    if row == 0 {
        return Err(CommandError::Usage(USAGE));
    }
    Ok(Command::Pick { section, row })
}

fn parse_playlist(arg: &str) -> Result<Command, CommandError> {
    let (action, rest) = arg
        .split_once(char::is_whitespace)
        .map_or((arg, ""), |(action, rest)| (action, rest.trim()));

    match action {
        "create" if !rest.is_empty() => Ok(Command::CreatePlaylist(rest.to_string())),
        "create" => Err(CommandError::Usage("playlist create <name>")),
        "add" => {
            const USAGE: &str = "playlist add <playlist id> [song id]";
            let mut parts = rest.split_whitespace();
            let playlist_id = parts
                .next()
                .and_then(|id| id.parse().ok())
                .ok_or(CommandError::Usage(USAGE))?;
            let song_id = parse_optional_song_id(parts.next().unwrap_or_default(), USAGE)?;
            if parts.next().is_some() {
                return Err(CommandError::Usage(USAGE));
            }
            Ok(Command::AddToPlaylist {
                playlist_id,
                song_id,
            })
        }
        _ => Err(CommandError::Usage("playlist create <name> | playlist add <id> [song id]")),
    }
}
