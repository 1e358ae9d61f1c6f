use serde::Deserialize;

use crate::lyrics::matching::{best_match, is_excluded};
use crate::lyrics::parse::extract_genius_lyrics;
use crate::lyrics::types::{Fetched, LyricsError, ProviderResult, http_client};

const SEARCH_URL: &str = "https://api.genius.com/search";

/// Versions we never want in place of the studio recording.
const EXCLUDED_TERMS: &[&str] = &["(Remix)", "(Live)"];

#[derive(Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Deserialize)]
struct SearchBody {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    result: HitResult,
}

/// Non-song hits (artists, albums) carry a different payload, so every
/// field is optional here and incomplete hits are dropped when picking.
#[derive(Deserialize, Default)]
struct HitResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    primary_artist: Option<PrimaryArtist>,
}

#[derive(Deserialize)]
struct PrimaryArtist {
    #[serde(default)]
    name: String,
}

/// Fetch lyrics from Genius.
///
/// The search API only returns song pages, so the lyrics are scraped from
/// the best-matching page.
pub async fn fetch_lyrics_from_genius(token: &str, artist: &str, title: &str) -> ProviderResult {
    let resp = http_client()
        .get(SEARCH_URL)
        .bearer_auth(token)
        .query(&[("q", format!("{title} {artist}"))])
        .send()
        .await?;

    if resp.status().as_u16() == 401 {
        return Err(LyricsError::Api("genius: access token rejected".to_string()));
    }
    if !resp.status().is_success() {
        return Err(LyricsError::Api(format!("genius search: HTTP {}", resp.status())));
    }

    let body: SearchResponse = serde_json::from_str(&resp.text().await?)?;
    let Some(url) = pick_song_url(&body.response.hits, artist, title) else {
        tracing::debug!(artist, title, hits = body.response.hits.len(), "genius: no matching hit");
        return Ok(Fetched::NotFound);
    };

    let page = http_client().get(url).send().await?;
    if page.status().as_u16() == 404 {
        return Ok(Fetched::NotFound);
    }
    if !page.status().is_success() {
        return Err(LyricsError::Api(format!("genius page: HTTP {}", page.status())));
    }

    match extract_genius_lyrics(&page.text().await?) {
        Some(lyrics) => Ok(Fetched::Found(lyrics)),
        None => Ok(Fetched::NotFound),
    }
}

/// Song hits only, minus excluded versions, best match wins.
fn pick_song_url<'a>(hits: &'a [Hit], artist: &str, title: &str) -> Option<&'a str> {
    let songs: Vec<(&'a str, &'a str, &'a str)> = hits
        .iter()
        .filter(|h| h.kind == "song")
        .filter_map(|h| {
            let r = &h.result;
            Some((
                r.title.as_deref()?,
                r.primary_artist.as_ref()?.name.as_str(),
                r.url.as_deref()?,
            ))
        })
        .filter(|(hit_title, _, _)| !is_excluded(hit_title, title, EXCLUDED_TERMS))
        .collect();

    let candidates: Vec<(&str, &str)> = songs
        .iter()
        .map(|&(hit_title, hit_artist, _)| (hit_title, hit_artist))
        .collect();

    let (_, _, url) = songs[best_match(&candidates, title, artist)?];
    Some(url)
}
