mod actions;

pub use actions::FavoriteStatus;

use async_trait::async_trait;
use cadenza_core::http::{self, resolve_url};
use cadenza_core::{
    CoreError, LocalLibrary, LocalSearchResults, ServerConfig, SongDetails, SongId,
};
use tracing::{debug, info, warn};
use url::Url;

/// Client for the self-hosted library server
pub struct LibraryClient {
    client: reqwest::Client,
    base_url: Url,
}

impl LibraryClient {
    /// Create a client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(config: &ServerConfig) -> Result<Self, CoreError> {
        Ok(Self {
            client: http::build_client(config)?,
            base_url: http::base_url(config)?,
        })
    }

    /// Server base URL, always ending in `/`
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve_media(&self, mut song: SongDetails) -> SongDetails {
        song.file_url = resolve_url(&self.base_url, &song.file_url);
        song.cover_url = song
            .cover_url
            .filter(|cover| !cover.trim().is_empty())
            .map(|cover| resolve_url(&self.base_url, &cover));
        song
    }
}

#[async_trait]
impl LocalLibrary for LibraryClient {
    fn name(&self) -> &'static str {
        "library"
    }

    async fn song(&self, id: SongId) -> Result<SongDetails, CoreError> {
        let url = http::endpoint(&self.base_url, &format!("api/song/{id}"))?;
        debug!("Library GET: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            info!("Library has no song {}", id);
            return Err(CoreError::NotFound {
                what: format!("song {id}"),
            });
        }

        if !status.is_success() {
            warn!("Library returned status {} for song {}", status, id);
            return Err(CoreError::Network {
                reason: format!("library returned status: {status}"),
            });
        }

        let song: SongDetails = response.json().await?;
        debug!("Resolved song {}: {} - {}", id, song.artist, song.title);
        Ok(self.resolve_media(song))
    }

    async fn search(&self, query: &str) -> Result<LocalSearchResults, CoreError> {
        let url = http::endpoint(
            &self.base_url,
            &format!("search?q={}", urlencoding::encode(query)),
        )?;
        debug!("Library GET: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            warn!("Library search returned status: {}", response.status());
            return Err(CoreError::Network {
                reason: format!("library search returned status: {}", response.status()),
            });
        }

        let results: LocalSearchResults = response.json().await?;
        debug!(
            "Library search \"{}\": {} song(s), {} artist(s), {} album(s)",
            query,
            results.songs.len(),
            results.artists.len(),
            results.albums.len()
        );
        Ok(results)
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use cadenza_core::ServerConfig;

    /// Serve `router` on an ephemeral port and return a config pointing at it
    pub async fn spawn(router: Router) -> ServerConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ServerConfig {
            base_url: format!("http://{addr}"),
            ..ServerConfig::default()
        }
    }
}
