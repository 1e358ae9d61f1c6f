use serde::Deserialize;

use crate::lyrics::parse::strip_lrc_timestamps;
use crate::lyrics::types::{Fetched, LyricsError, ProviderResult, http_client};

#[derive(Deserialize)]
#[allow(non_snake_case)]
struct LrcLibResponse {
    plainLyrics: Option<String>,
    syncedLyrics: Option<String>,
}

/// Fetch lyrics from the lrclib.net API.
///
/// Plain lyrics are preferred; when a track only has synced lyrics the
/// timestamps are stripped so the stored text is the same shape either way.
pub async fn fetch_lyrics_from_lrclib(artist: &str, title: &str) -> ProviderResult {
    let url = build_lrclib_url(artist, title);

    let resp = http_client().get(&url).send().await?;

    // 404 means no lyrics found - not an error
    if resp.status().as_u16() == 404 {
        return Ok(Fetched::NotFound);
    }

    if !resp.status().is_success() {
        return Err(LyricsError::Api(format!("lrclib: HTTP {}", resp.status())));
    }

    let response: LrcLibResponse = resp.json().await?;
    Ok(lyrics_from_response(response))
}

fn lyrics_from_response(response: LrcLibResponse) -> Fetched {
    match (response.plainLyrics, response.syncedLyrics) {
        (Some(plain), _) if !plain.trim().is_empty() => Fetched::Found(plain.trim().to_string()),
        (_, Some(synced)) => {
            let text = strip_lrc_timestamps(&synced);
            if text.is_empty() {
                Fetched::NotFound
            } else {
                Fetched::Found(text)
            }
        }
        _ => Fetched::NotFound,
    }
}

/// Build lrclib API URL with query parameters.
fn build_lrclib_url(artist: &str, title: &str) -> String {
    format!(
        "https://lrclib.net/api/get?artist_name={}&track_name={}",
        urlencoding::encode(artist),
        urlencoding::encode(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Fetched {
        lyrics_from_response(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn url_encodes_artist_and_title() {
        assert_eq!(
            build_lrclib_url("Simon & Garfunkel", "The Boxer"),
            "https://lrclib.net/api/get?artist_name=Simon%20%26%20Garfunkel&track_name=The%20Boxer"
        );
    }

    #[test]
    fn prefers_plain_lyrics() {
        let fetched = parse(r#"{"plainLyrics":"line one\nline two\n","syncedLyrics":"[00:01.00]other"}"#);
        assert_eq!(fetched, Fetched::Found("line one\nline two".to_string()));
    }

    #[test]
    fn falls_back_to_synced_lyrics() {
        let fetched = parse(r#"{"plainLyrics":"","syncedLyrics":"[00:01.00]line one\n[00:02.50]line two"}"#);
        assert_eq!(fetched, Fetched::Found("line one\nline two".to_string()));
    }

    #[test]
    fn instrumental_track_is_not_found() {
        let fetched = parse(r#"{"plainLyrics":null,"syncedLyrics":null,"instrumental":true}"#);
        assert_eq!(fetched, Fetched::NotFound);
    }
}
