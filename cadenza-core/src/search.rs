//! Combined search over the local library and the external catalog.

use crate::error::Result;
use crate::provider::{ExternalCatalog, LocalLibrary, LocalSongHit};
use crate::track::ExternalTrackPayload;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of library songs shown
pub const DEFAULT_LOCAL_LIMIT: usize = 5;
/// Default number of catalog tracks requested and shown
pub const DEFAULT_EXTERNAL_LIMIT: usize = 8;

/// Which result sections a view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchFilter {
    #[default]
    All,
    Local,
    External,
}

impl std::str::FromStr for SearchFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "local" | "library" => Ok(Self::Local),
            "external" | "deezer" => Ok(Self::External),
            other => Err(format!("unknown search filter: {other}")),
        }
    }
}

/// Results of one combined search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub query: String,
    pub songs: Vec<LocalSongHit>,
    pub external: Vec<ExternalTrackPayload>,
}

impl SearchResults {
    /// Nothing found in either source
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty() && self.external.is_empty()
    }

    /// Library rows visible under `filter`
    #[must_use]
    pub fn local_section(&self, filter: SearchFilter) -> &[LocalSongHit] {
        match filter {
            SearchFilter::All | SearchFilter::Local => &self.songs,
            SearchFilter::External => &[],
        }
    }

    /// Catalog rows visible under `filter`
    #[must_use]
    pub fn external_section(&self, filter: SearchFilter) -> &[ExternalTrackPayload] {
        match filter {
            SearchFilter::All | SearchFilter::External => &self.external,
            SearchFilter::Local => &[],
        }
    }
}

/// Runs library and catalog searches for a query
pub struct SearchService {
    library: Arc<dyn LocalLibrary>,
    catalog: Option<Arc<dyn ExternalCatalog>>,
    local_limit: usize,
    external_limit: usize,
}

impl SearchService {
    /// Create a search service with the default result limits
    #[must_use]
    pub fn new(library: Arc<dyn LocalLibrary>, catalog: Option<Arc<dyn ExternalCatalog>>) -> Self {
        Self {
            library,
            catalog,
            local_limit: DEFAULT_LOCAL_LIMIT,
            external_limit: DEFAULT_EXTERNAL_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, local_limit: usize, external_limit: usize) -> Self {
        self.local_limit = local_limit;
        self.external_limit = external_limit;
        self
    }

    /// Search both sources.
    ///
    /// A blank query returns empty results without any request. A catalog
    /// failure degrades to an empty catalog section.
    ///
    /// # Errors
    ///
    /// Returns an error if the library search fails.
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResults::default());
        }

        debug!("Searching {} for \"{}\"", self.library.name(), query);
        let mut songs = self.library.search(query).await?.songs;
        songs.truncate(self.local_limit);

        let external = match &self.catalog {
            Some(catalog) => match catalog.search(query, self.external_limit).await {
                Ok(mut tracks) => {
                    tracks.truncate(self.external_limit);
                    tracks
                }
                Err(e) => {
                    warn!("{} search not available: {}", catalog.name(), e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        info!(
            "Search \"{}\": {} library, {} catalog result(s)",
            query,
            songs.len(),
            external.len()
        );

        Ok(SearchResults {
            query: query.to_string(),
            songs,
            external,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LocalSearchResults;
    use crate::testing::{FakeCatalog, FakeLibrary};
    use crate::track::SongId;

    fn hits(n: u64) -> LocalSearchResults {
        LocalSearchResults {
            songs: (1..=n)
                .map(|id| LocalSongHit {
                    id: SongId(id),
                    title: format!("Song {id}"),
                    artist: "Artist".into(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn catalog(n: usize) -> FakeCatalog {
        FakeCatalog {
            results: (0..n)
                .map(|i| ExternalTrackPayload {
                    id: Some(i64::try_from(i).unwrap()),
                    title: Some(format!("Track {i}")),
                    preview: Some(format!("https://cdn/{i}.mp3")),
                    ..Default::default()
                })
                .collect(),
            fail: false,
        }
    }

    #[tokio::test]
    async fn test_blank_query_skips_requests() {
        let library = FakeLibrary::offline();
        let service = SearchService::new(Arc::new(library), None);
        let results = service.search("   ").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_are_truncated() {
        let library = FakeLibrary::default();
        library.set_search(hits(9));
        let service = SearchService::new(Arc::new(library), Some(Arc::new(catalog(12))));
        let results = service.search(" daft ").await.unwrap();
        assert_eq!(results.query, "daft");
        assert_eq!(results.songs.len(), DEFAULT_LOCAL_LIMIT);
        assert_eq!(results.external.len(), DEFAULT_EXTERNAL_LIMIT);
    }

    #[tokio::test]
    async fn test_catalog_failure_degrades_to_local_only() {
        let library = FakeLibrary::default();
        library.set_search(hits(2));
        let failing = FakeCatalog {
            fail: true,
            ..Default::default()
        };
        let service = SearchService::new(Arc::new(library), Some(Arc::new(failing)));
        let results = service.search("song").await.unwrap();
        assert_eq!(results.songs.len(), 2);
        assert!(results.external.is_empty());
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn test_library_failure_is_returned() {
        let service = SearchService::new(Arc::new(FakeLibrary::offline()), Some(Arc::new(catalog(3))));
        assert!(service.search("song").await.is_err());
    }

    #[tokio::test]
    async fn test_custom_limits() {
        let library = FakeLibrary::default();
        library.set_search(hits(4));
        let service =
            SearchService::new(Arc::new(library), Some(Arc::new(catalog(4)))).with_limits(1, 2);
        let results = service.search("x").await.unwrap();
        assert_eq!(results.songs.len(), 1);
        assert_eq!(results.external.len(), 2);
    }

    #[test]
    fn test_filter_sections() {
        let results = SearchResults {
            query: "q".into(),
            songs: hits(1).songs,
            external: vec![ExternalTrackPayload::default()],
        };
        assert_eq!(results.local_section(SearchFilter::All).len(), 1);
        assert_eq!(results.external_section(SearchFilter::All).len(), 1);
        assert!(results.local_section(SearchFilter::External).is_empty());
        assert!(results.external_section(SearchFilter::Local).is_empty());
    }

    #[test]
    fn test_filter_from_str() {
        assert_eq!("deezer".parse::<SearchFilter>(), Ok(SearchFilter::External));
        assert_eq!("Library".parse::<SearchFilter>(), Ok(SearchFilter::Local));
        assert_eq!("all".parse::<SearchFilter>(), Ok(SearchFilter::All));
        assert!("spotify".parse::<SearchFilter>().is_err());
    }
}
