// library.rs: lookup-or-fetch over the local store and the upstream providers

use crate::lyrics::{Fetched, LyricsError, LyricsSource, LyricsStore, Song, StoreError};
use serde::Serialize;
use thiserror::Error;

/// How a lookup was satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Lookup {
    /// Already in the local database.
    Cached { song: Song },
    /// Fetched from `source` and stored.
    Fetched { song: Song, source: String },
    NotFound,
}

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Invalid query: {0}")]
    InvalidQuery(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Provider error: {0}")]
    Provider(#[from] LyricsError),
}

/// Trims both parts of a query and rejects blank ones.
fn normalize_query<'a>(title: &'a str, artist: &'a str) -> Result<(&'a str, &'a str), LibraryError> {
    let title = title.trim();
    let artist = artist.trim();
    if title.is_empty() {
        return Err(LibraryError::InvalidQuery("title is empty"));
    }
    if artist.is_empty() {
        return Err(LibraryError::InvalidQuery("artist is empty"));
    }
    Ok((title, artist))
}

/// Local lyrics database plus the providers used to fill it.
pub struct LyricsLibrary<S> {
    store: LyricsStore,
    sources: Vec<S>,
}

impl<S: LyricsSource> LyricsLibrary<S> {
    pub fn new(store: LyricsStore, sources: Vec<S>) -> Self {
        Self { store, sources }
    }

    pub fn store(&self) -> &LyricsStore {
        &self.store
    }

    /// Returns the stored lyrics for (title, artist), fetching and storing
    /// them on a miss.
    ///
    /// Providers are tried in order. A provider that fails is logged and the
    /// next one is tried; the error is only returned when every provider
    /// failed outright.
    pub async fn lookup(&self, title: &str, artist: &str) -> Result<Lookup, LibraryError> {
        let (title, artist) = normalize_query(title, artist)?;

        if let Some(song) = self.store.find_by_title_and_artist(title, artist).await? {
            return Ok(Lookup::Cached { song });
        }

        let mut last_err = None;
        let mut clean_miss = false;

        for source in &self.sources {
            match source.fetch(title, artist).await {
                Ok(Fetched::Found(text)) => {
                    tracing::info!(title, artist, source = source.name(), "Fetched lyrics");
                    let song = self.persist(title, artist, text).await?;
                    return Ok(Lookup::Fetched {
                        song,
                        source: source.name().to_string(),
                    });
                }
                Ok(Fetched::NotFound) => {
                    tracing::debug!(title, artist, source = source.name(), "No lyrics from provider");
                    clean_miss = true;
                }
                Err(e) => {
                    tracing::warn!(
                        title,
                        artist,
                        source = source.name(),
                        transient = e.is_transient(),
                        error = %e,
                        "Provider failed, trying next"
                    );
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if !clean_miss => Err(e.into()),
            _ => Ok(Lookup::NotFound),
        }
    }

    /// Store-only lookup, with the same query normalization as [`Self::lookup`].
    pub async fn find_stored(&self, title: &str, artist: &str) -> Result<Option<Song>, LibraryError> {
        let (title, artist) = normalize_query(title, artist)?;
        Ok(self.store.find_by_title_and_artist(title, artist).await?)
    }

    async fn persist(&self, title: &str, artist: &str, lyrics: String) -> Result<Song, StoreError> {
        self.store.save_song(title, artist, &lyrics).await
    }

    /// Shuts the library down, releasing the database connection.
    pub async fn close(self) {
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::types::ProviderResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Found(&'static str),
        NotFound,
        Fail,
    }

    struct ScriptedSource {
        name: &'static str,
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(name: &'static str, script: Script) -> Self {
            Self {
                name,
                script,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LyricsSource for ScriptedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _title: &str, _artist: &str) -> ProviderResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Found(text) => Ok(Fetched::Found(text.to_string())),
                Script::NotFound => Ok(Fetched::NotFound),
                Script::Fail => Err(LyricsError::Api(format!("{} is down", self.name))),
            }
        }
    }

    async fn library(sources: Vec<ScriptedSource>) -> LyricsLibrary<ScriptedSource> {
        let store = LyricsStore::open_in_memory().await.unwrap();
        LyricsLibrary::new(store, sources)
    }

    #[tokio::test]
    async fn miss_fetches_and_stores() {
        let lib = library(vec![ScriptedSource::new("a", Script::Found("lyrics text"))]).await;

        let lookup = lib.lookup("Into You", "Ariana Grande").await.unwrap();

        let Lookup::Fetched { song, source } = lookup else {
            panic!("expected a fetched song, got {lookup:?}");
        };
        assert_eq!(source, "a");
        assert_eq!(song.lyrics.as_deref(), Some("lyrics text"));

        let stored = lib
            .store()
            .find_by_title_and_artist("Into You", "Ariana Grande")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, song);
    }

    #[tokio::test]
    async fn hit_does_not_call_providers() {
        let lib = library(vec![ScriptedSource::new("a", Script::Found("lyrics text"))]).await;
        lib.lookup("Into You", "Ariana Grande").await.unwrap();

        let second = lib.lookup("Into You", "Ariana Grande").await.unwrap();

        assert!(matches!(second, Lookup::Cached { .. }));
        assert_eq!(lib.sources[0].calls(), 1);
        assert_eq!(lib.store().list_songs().await.unwrap().len(), 1);
        assert_eq!(lib.store().list_artists().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_provider_falls_through_to_next() {
        let lib = library(vec![
            ScriptedSource::new("down", Script::Fail),
            ScriptedSource::new("empty", Script::NotFound),
            ScriptedSource::new("good", Script::Found("lyrics text")),
        ])
        .await;

        let lookup = lib.lookup("Into You", "Ariana Grande").await.unwrap();

        assert!(matches!(lookup, Lookup::Fetched { ref source, .. } if source == "good"));
        assert!(lib.sources.iter().all(|s| s.calls() == 1));
    }

    #[tokio::test]
    async fn nothing_found_stores_nothing() {
        let lib = library(vec![
            ScriptedSource::new("down", Script::Fail),
            ScriptedSource::new("empty", Script::NotFound),
        ])
        .await;

        let lookup = lib.lookup("Into You", "Ariana Grande").await.unwrap();

        assert_eq!(lookup, Lookup::NotFound);
        assert!(lib.store().list_songs().await.unwrap().is_empty());
        assert!(lib.store().list_artists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_providers_failing_is_an_error() {
        let lib = library(vec![
            ScriptedSource::new("one", Script::Fail),
            ScriptedSource::new("two", Script::Fail),
        ])
        .await;

        let err = lib.lookup("Into You", "Ariana Grande").await.unwrap_err();

        assert!(matches!(err, LibraryError::Provider(LyricsError::Api(ref m)) if m == "two is down"));
    }

    #[tokio::test]
    async fn no_providers_means_not_found() {
        let lib = library(Vec::new()).await;
        assert_eq!(lib.lookup("Into You", "Ariana Grande").await.unwrap(), Lookup::NotFound);
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_any_fetch() {
        let lib = library(vec![ScriptedSource::new("a", Script::Found("x"))]).await;

        let err = lib.lookup("  ", "Ariana Grande").await.unwrap_err();

        assert!(matches!(err, LibraryError::InvalidQuery(_)));
        assert_eq!(lib.sources[0].calls(), 0);
    }

    #[tokio::test]
    async fn query_is_trimmed_before_storing() {
        let lib = library(vec![ScriptedSource::new("a", Script::Found("x"))]).await;

        lib.lookup(" Into You ", " Ariana Grande ").await.unwrap();

        let again = lib.lookup("Into You", "Ariana Grande").await.unwrap();
        assert!(matches!(again, Lookup::Cached { .. }));
    }

    #[tokio::test]
    async fn find_stored_trims_and_never_fetches() {
        let lib = library(vec![ScriptedSource::new("a", Script::Found("x"))]).await;
        assert_eq!(lib.find_stored("Into You", "Ariana Grande").await.unwrap(), None);
        lib.lookup("Into You", "Ariana Grande").await.unwrap();

        let song = lib.find_stored(" Into You ", "Ariana Grande\n").await.unwrap();

        assert_eq!(song.map(|s| s.title), Some("Into You".to_string()));
        assert_eq!(lib.sources[0].calls(), 1);
        assert!(matches!(
            lib.find_stored("Into You", "   ").await,
            Err(LibraryError::InvalidQuery(_))
        ));
    }
}
