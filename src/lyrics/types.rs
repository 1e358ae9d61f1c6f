use once_cell::sync::Lazy;
use reqwest::Client;
use thiserror::Error;

// Shared HTTP client with reasonable defaults for timeouts
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("MSonaLyrics/0.1")
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
});

/// Outcome of asking one provider for a song's lyrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Found(String),
    NotFound,
}

/// Provider result: lyrics text, a clean miss, or a failure.
pub type ProviderResult = Result<Fetched, LyricsError>;

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("No access token configured ({0})")]
    MissingToken(&'static str),
}

impl LyricsError {
    /// Network hiccups are worth trying the next provider for; everything
    /// else points at the provider itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, LyricsError::Network(_))
    }
}

pub(crate) fn http_client() -> &'static Client {
    &HTTP_CLIENT
}
