//! Favorite and playlist actions on the library server.

use crate::LibraryClient;
use cadenza_core::http;
use cadenza_core::{CoreError, SongId};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

/// Favorite flag after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteStatus {
    pub song_id: SongId,
    pub is_favorite: bool,
}

/// Common envelope of the server's action endpoints
#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    is_favorite: Option<bool>,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

impl LibraryClient {
    async fn post_action(
        &self,
        action: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ActionResponse, CoreError> {
        let url = http::endpoint(self.base_url(), path)?;
        debug!("Library POST ({}): {}", action, url);

        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("Library rejected {} with status {}", action, status);
            return Err(CoreError::Rejected {
                action: format!("{action} (status {status})"),
            });
        }

        let parsed: ActionResponse = response.json().await?;
        if !parsed.success {
            warn!(
                "Library rejected {}: {}",
                action,
                parsed.error.as_deref().unwrap_or("no reason given")
            );
            return Err(CoreError::Rejected {
                action: action.to_string(),
            });
        }
        Ok(parsed)
    }

    /// Flip the favorite flag of a library song.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` when the server reports failure, or a network error.
    pub async fn toggle_favorite(&self, song_id: SongId) -> Result<FavoriteStatus, CoreError> {
        let response = self
            .post_action("toggle favorite", &format!("favorite/toggle/{song_id}"), None)
            .await?;
        let is_favorite = response.is_favorite.unwrap_or_default();
        info!(
            "Song {} {} favorites",
            song_id,
            if is_favorite { "added to" } else { "removed from" }
        );
        Ok(FavoriteStatus {
            song_id,
            is_favorite,
        })
    }

    /// Create a playlist and return its id when the server reports one.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` when the server reports failure, or a network error.
    pub async fn create_playlist(&self, name: &str) -> Result<Option<u64>, CoreError> {
        let response = self
            .post_action(
                "create playlist",
                "playlist/create",
                Some(json!({ "name": name })),
            )
            .await?;
        info!("Created playlist \"{}\" (id: {:?})", name, response.id);
        Ok(response.id)
    }

    /// Append a library song to a playlist.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` when the server reports failure, or a network error.
    pub async fn add_to_playlist(
        &self,
        playlist_id: u64,
        song_id: SongId,
    ) -> Result<(), CoreError> {
        self.post_action(
            "add to playlist",
            &format!("playlist/{playlist_id}/add-song"),
            Some(json!({ "song_id": song_id })),
        )
        .await?;
        info!("Added song {} to playlist {}", song_id, playlist_id);
        Ok(())
    }
}
