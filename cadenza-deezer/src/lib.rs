use async_trait::async_trait;
use cadenza_core::http;
use cadenza_core::{CoreError, ExternalCatalog, ExternalTrackPayload, ServerConfig};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

const DEFAULT_PLATFORM: &str = "deezer";

/// Deezer catalog, queried through the library server's search proxy
pub struct DeezerCatalog {
    client: reqwest::Client,
    base_url: Url,
    platform: String,
}

impl DeezerCatalog {
    /// Create a catalog client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(config: &ServerConfig) -> Result<Self, CoreError> {
        Ok(Self {
            client: http::build_client(config)?,
            base_url: http::base_url(config)?,
            platform: DEFAULT_PLATFORM.to_string(),
        })
    }

    /// Override the `platform` parameter sent to the proxy
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }
}

/// Search proxy response: `{ data: [...] }` or `{ error }`
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<ExternalTrackPayload>>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl ExternalCatalog for DeezerCatalog {
    fn name(&self) -> &'static str {
        "deezer"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ExternalTrackPayload>, CoreError> {
        let url = http::endpoint(
            &self.base_url,
            &format!(
                "api/music/search?q={}&platform={}&limit={limit}",
                urlencoding::encode(query),
                urlencoding::encode(&self.platform)
            ),
        )?;
        debug!("Deezer GET: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body: Option<SearchResponse> = response.json().await.ok();

        match body {
            Some(SearchResponse {
                error: Some(error), ..
            }) => {
                warn!("Deezer search failed ({}): {}", status, error);
                Err(CoreError::Network { reason: error })
            }
            Some(SearchResponse {
                data: Some(mut tracks),
                ..
            }) if status.is_success() => {
                tracks.truncate(limit);
                info!("Deezer search \"{}\": {} track(s)", query, tracks.len());
                Ok(tracks)
            }
            _ => {
                warn!("Deezer search returned status: {}", status);
                Err(CoreError::Network {
                    reason: format!("music search returned status: {status}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn search_handler(Query(params): Query<HashMap<String, String>>) -> Response {
        let query = params.get("q").map(String::as_str).unwrap_or_default();
        let limit: usize = params
            .get("limit")
            .and_then(|l| l.parse().ok())
            .unwrap_or(10);
        match query {
            "" => (StatusCode::BAD_REQUEST, Json(json!({ "error": "No search query" })))
                .into_response(),
            "broken" => Json(json!({ "error": "Deezer is down" })).into_response(),
            "teapot" => StatusCode::IM_A_TEAPOT.into_response(),
            _ => {
                let tracks: Vec<_> = (0..20)
                    .take(limit)
                    .map(|i| {
                        json!({
                            "id": 1000 + i,
                            "title": format!("{query} {i}"),
                            "artist": "Deezer Artist",
                            "album": "Deezer Album",
                            "cover": "https://cdn.example/cover.jpg",
                            "preview": format!("https://cdn.example/{i}.mp3"),
                            "duration": 30,
                            "platform": params.get("platform"),
                        })
                    })
                    .collect();
                Json(json!({ "data": tracks, "platform": "deezer" })).into_response()
            }
        }
    }

    /// Serve `router` on an ephemeral port and return a config pointing at it
    async fn spawn_server(router: Router) -> ServerConfig {
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

    async fn catalog() -> DeezerCatalog {
        let router = Router::new().route("/api/music/search", get(search_handler));
        DeezerCatalog::new(&spawn_server(router).await).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_payloads() {
        let tracks = catalog().await.search("around the world", 8).await.unwrap();
        assert_eq!(tracks.len(), 8);
        assert_eq!(tracks[0].id, Some(1000));
        assert_eq!(tracks[0].display_title(), "around the world 0");
        assert_eq!(tracks[0].preview_url(), Some("https://cdn.example/0.mp3"));
        assert_eq!(tracks[0].player_id(), "deezer-1000");
    }

    #[tokio::test]
    async fn test_error_body_is_failure() {
        let err = catalog().await.search("broken", 8).await.unwrap_err();
        assert!(matches!(err, CoreError::Network { reason } if reason == "Deezer is down"));
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let err = catalog().await.search("teapot", 8).await.unwrap_err();
        assert!(err.is_network());
    }
}
