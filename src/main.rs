mod library;
mod lyrics;
mod text_utils;

use crate::library::{Lookup, LyricsLibrary};
use crate::lyrics::{Artist, LyricsSource, LyricsStore, Song, build_providers};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_PROVIDERS: &[&str] = &["lrclib", "genius"];

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Local lyrics database with upstream fetching")]
pub struct Config {
    /// Path to the lyrics database file
    #[arg(long, env = "MSONA_DATABASE")]
    database: Option<PathBuf>,
    /// Comma-separated list of lyric providers in preferred order (e.g. "lrclib,genius").
    /// If empty, the LYRIC_PROVIDERS env var will be used as a fallback.
    #[arg(long, value_delimiter = ',')]
    providers: Vec<String>,
    /// Enable debug logging to stderr
    #[arg(long)]
    debug_log: bool,
    /// Print results as JSON
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Print lyrics, fetching and storing them if they are not stored yet
    Get { artist: String, title: String },
    /// Print stored lyrics without contacting any provider
    Show { artist: String, title: String },
    /// Find stored songs whose title contains a keyword
    Search { keyword: String },
    /// List stored artists
    Artists,
    /// List stored songs
    Songs,
    /// List stored songs by one artist
    ByArtist { artist: String },
}

fn resolve_providers(cli: &[String], env: Option<String>) -> Vec<String> {
    if !cli.is_empty() {
        return cli.to_vec();
    }
    if let Some(s) = env {
        let parts: Vec<String> = s
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        if !parts.is_empty() {
            return parts;
        }
    }
    DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect()
}

/// `$XDG_DATA_HOME/msona/lyrics.db`, else `~/.local/share/msona/lyrics.db`,
/// else `m_sona.db` in the working directory.
fn default_database_path(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    let non_empty = |p: &PathBuf| !p.as_os_str().is_empty();
    if let Some(dir) = xdg_data_home.filter(non_empty) {
        return dir.join("msona").join("lyrics.db");
    }
    if let Some(home) = home.filter(non_empty) {
        return home.join(".local").join("share").join("msona").join("lyrics.db");
    }
    PathBuf::from("m_sona.db")
}

fn clean_token(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty() { None } else { Some(token.to_string()) }
}

/// Genius token from `GENIUS_ACCESS_TOKEN`, else from the file named by
/// `GENIUS_TOKEN_FILE`.
fn genius_token_from_env() -> Option<String> {
    if let Some(token) = std::env::var("GENIUS_ACCESS_TOKEN").ok().as_deref().and_then(clean_token) {
        return Some(token);
    }
    let path = std::env::var_os("GENIUS_TOKEN_FILE")?;
    match std::fs::read_to_string(&path) {
        Ok(contents) => clean_token(&contents),
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Failed to read Genius token file");
            None
        }
    }
}

fn init_tracing(debug_log: bool) {
    let fallback = if debug_log { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lyrics(song: &Song) {
    println!("{}", song.lyrics.as_deref().unwrap_or("(no lyrics stored)"));
}

async fn print_songs<S: LyricsSource>(
    library: &LyricsLibrary<S>,
    songs: &[Song],
    json: bool,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if json {
        return print_json(songs);
    }
    if songs.is_empty() {
        println!("No songs.");
        return Ok(());
    }
    let artists: HashMap<_, _> = library
        .store()
        .list_artists()
        .await?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    for song in songs {
        let artist = artists.get(&song.artist_id).map(String::as_str).unwrap_or("?");
        println!(
            "{:>5}  {}  {}  {}",
            song.id,
            text_utils::pad_right(&song.title, 28),
            text_utils::pad_right(artist, 20),
            text_utils::excerpt(song.lyrics.as_deref().unwrap_or(""), 40)
        );
    }
    Ok(())
}

fn print_artists(artists: &[Artist], json: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    if json {
        return print_json(artists);
    }
    if artists.is_empty() {
        println!("No artists.");
    }
    for artist in artists {
        println!("{:>5}  {}", artist.id, artist.name);
    }
    Ok(())
}

async fn run<S: LyricsSource>(
    library: &LyricsLibrary<S>,
    cfg: &Config,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = library.store();
    match &cfg.command {
        Command::Get { artist, title } => {
            let lookup = library.lookup(title, artist).await?;
            if cfg.json {
                return print_json(&lookup);
            }
            match lookup {
                Lookup::Cached { song } | Lookup::Fetched { song, .. } => print_lyrics(&song),
                Lookup::NotFound => println!("Lyrics not found for \"{title}\" by {artist}."),
            }
        }
        Command::Show { artist, title } => {
            let song = library.find_stored(title, artist).await?;
            if cfg.json {
                return print_json(&song);
            }
            match song {
                Some(song) => print_lyrics(&song),
                None => println!("\"{title}\" by {artist} is not in the database."),
            }
        }
        Command::Search { keyword } => {
            let songs = store.search_by_title_substring(keyword).await?;
            print_songs(library, &songs, cfg.json).await?;
        }
        Command::Artists => print_artists(&store.list_artists().await?, cfg.json)?,
        Command::Songs => {
            let songs = store.list_songs().await?;
            print_songs(library, &songs, cfg.json).await?;
        }
        Command::ByArtist { artist } => {
            let songs = store.songs_by_artist(artist).await?;
            print_songs(library, &songs, cfg.json).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cfg = Config::parse();
    init_tracing(cfg.debug_log);

    let providers = resolve_providers(&cfg.providers, std::env::var("LYRIC_PROVIDERS").ok());
    let database = cfg.database.clone().unwrap_or_else(|| {
        default_database_path(
            std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
            std::env::var_os("HOME").map(PathBuf::from),
        )
    });

    let store = LyricsStore::open(&database).await?;
    let sources = build_providers(&providers, genius_token_from_env().as_deref());
    let library = LyricsLibrary::new(store, sources);

    let result = run(&library, &cfg).await;
    library.close().await;

    // Print error if any, for better diagnostics
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e);
    }
    Ok(())
}
