pub mod genius;
pub mod lrclib;

pub use genius::fetch_lyrics_from_genius;
pub use lrclib::fetch_lyrics_from_lrclib;

use crate::lyrics::types::{LyricsError, ProviderResult};

/// Anything that can look up lyrics for a (title, artist) pair.
pub trait LyricsSource {
    fn name(&self) -> &str;

    async fn fetch(&self, title: &str, artist: &str) -> ProviderResult;
}

/// The upstream providers this crate knows how to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Lrclib,
    Genius { token: Option<String> },
}

impl Provider {
    /// Parses a provider name from config (case-insensitive).
    pub fn from_name(name: &str, genius_token: Option<&str>) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "lrclib" => Some(Provider::Lrclib),
            "genius" => Some(Provider::Genius {
                token: genius_token.map(str::to_string),
            }),
            _ => None,
        }
    }
}

impl LyricsSource for Provider {
    fn name(&self) -> &str {
        match self {
            Provider::Lrclib => "lrclib",
            Provider::Genius { .. } => "genius",
        }
    }

    async fn fetch(&self, title: &str, artist: &str) -> ProviderResult {
        match self {
            Provider::Lrclib => fetch_lyrics_from_lrclib(artist, title).await,
            Provider::Genius { token: Some(token) } => {
                fetch_lyrics_from_genius(token, artist, title).await
            }
            Provider::Genius { token: None } => Err(LyricsError::MissingToken("GENIUS_ACCESS_TOKEN")),
        }
    }
}

/// Builds the provider list in the configured order, skipping names we don't
/// recognise.
pub fn build_providers(names: &[String], genius_token: Option<&str>) -> Vec<Provider> {
    names
        .iter()
        .filter_map(|name| {
            let provider = Provider::from_name(name, genius_token);
            if provider.is_none() {
                tracing::warn!(provider = %name, "Unknown lyrics provider, skipping");
            }
            provider
        })
        .collect()
}
