//! Local lyrics database module.
//!
//! Persists fetched lyrics in a small SQLite file so a song only has to be
//! retrieved from an upstream provider once. The store is an explicit value:
//! whoever needs persistence opens it, passes it around by reference and
//! closes it on shutdown.
//!
//! # Schema
//!
//! - **artists**: `id` surrogate key, `name` unique
//! - **songs**: `id` surrogate key, `title`, `artist_id` referencing
//!   `artists(id)`, nullable `lyrics`
//!
//! # Lookup flow
//!
//! ```text
//! ┌─────────────────┐
//! │ Lookup Request  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Database Check  │───── Hit ──────▶ Return stored song
//! └────────┬────────┘
//!          │ Miss
//!          ▼
//! ┌─────────────────┐
//! │ Provider Fetch  │  (see `crate::library`)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ensure_artist + │
//! │ add_song        │
//! └─────────────────┘
//! ```

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Database Types
// ============================================================================

/// Surrogate key of a row in `artists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArtistId(pub i64);

/// Surrogate key of a row in `songs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SongId(pub i64);

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist_id: ArtistId,
    /// `None` until lyrics have been fetched for this song.
    pub lyrics: Option<String>,
}

type SongRow = (i64, String, i64, Option<String>);

impl From<SongRow> for Song {
    fn from((id, title, artist_id, lyrics): SongRow) -> Self {
        Self {
            id: SongId(id),
            title,
            artist_id: ArtistId(artist_id),
            lyrics,
        }
    }
}

/// Errors raised by the backing store.
///
/// A missing row is never an error: lookups return `Option` or an empty `Vec`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error in {op} ({key}): {source}")]
    Storage {
        op: &'static str,
        key: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("cannot prepare database directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Builds a `map_err` adapter that tags a sqlx error with the failing
/// operation and the key it was working on.
fn storage(op: &'static str, key: impl Into<String>) -> impl FnOnce(sqlx::Error) -> StoreError {
    let key = key.into();
    move |source| StoreError::Storage { op, key, source }
}

// ============================================================================
// SQL
// ============================================================================

const CREATE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS artists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL
    );
    CREATE TABLE IF NOT EXISTS songs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        artist_id INTEGER NOT NULL REFERENCES artists(id),
        lyrics TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_songs_artist_id ON songs(artist_id);
"#;

const UPSERT_ARTIST: &str = "INSERT INTO artists (name) VALUES (?) \
     ON CONFLICT(name) DO UPDATE SET name = excluded.name \
     RETURNING id";

const INSERT_SONG: &str = "INSERT INTO songs (title, artist_id, lyrics) VALUES (?, ?, ?)";

const SELECT_SONG_BY_TITLE_AND_ARTIST: &str = "SELECT songs.id, songs.title, songs.artist_id, songs.lyrics \
     FROM songs JOIN artists ON songs.artist_id = artists.id \
     WHERE songs.title = ? AND artists.name = ? \
     ORDER BY songs.id LIMIT 1";

const SELECT_SONGS_BY_ARTIST: &str = "SELECT songs.id, songs.title, songs.artist_id, songs.lyrics \
     FROM songs JOIN artists ON songs.artist_id = artists.id \
     WHERE artists.name = ? \
     ORDER BY songs.id";

const SELECT_ARTISTS: &str = "SELECT id, name FROM artists ORDER BY id";

const SELECT_SONGS: &str = "SELECT id, title, artist_id, lyrics FROM songs ORDER BY id";

// ============================================================================
// Store
// ============================================================================

/// SQLite-backed mapping from (artist, title) to lyrics.
///
/// Holds exactly one connection for its whole lifetime.
pub struct LyricsStore {
    pool: SqlitePool,
}

impl LyricsStore {
    /// Opens (or creates) the database file at `path` and makes sure the
    /// schema exists.
    ///
    /// Creates parent directories if they don't exist.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let existed = path.exists();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let store = Self::connect(options, path.display().to_string()).await?;

        tracing::info!(
            path = %path.display(),
            existed,
            "Opened lyrics database"
        );
        Ok(store)
    }

    /// Opens a private in-memory database. Data is lost on close.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(storage("open", ":memory:"))?
            .foreign_keys(true);
        Self::connect(options, ":memory:".to_string()).await
    }

    async fn connect(options: SqliteConnectOptions, key: String) -> Result<Self, StoreError> {
        // One long-lived connection: an in-memory database only lives as long
        // as its connection, and callers never overlap requests anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage("open", key))?;

        let store = Self { pool };
        if let Err(e) = store.create_schema().await {
            store.pool.close().await;
            return Err(e);
        }
        Ok(store)
    }

    /// Creates the tables if they are missing. Safe to run against an
    /// already populated file.
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(storage("create_schema", "artists, songs"))?;
        Ok(())
    }

    /// Returns the identity of the artist called `name`, inserting it first if
    /// needed. A single upsert statement, so two callers racing on the same
    /// name still end up with one row.
    #[allow(dead_code)]
    pub async fn ensure_artist(&self, name: &str) -> Result<ArtistId, StoreError> {
        let id: i64 = sqlx::query_scalar(UPSERT_ARTIST)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(storage("ensure_artist", name))?;

        tracing::debug!(artist = name, id, "Resolved artist");
        Ok(ArtistId(id))
    }

    /// Inserts a song row. Does not check for an existing (title, artist)
    /// pair; use [`Self::find_by_title_and_artist`] first when that matters.
    #[allow(dead_code)]
    pub async fn add_song(
        &self,
        title: &str,
        artist_id: ArtistId,
        lyrics: &str,
    ) -> Result<SongId, StoreError> {
        let result = sqlx::query(INSERT_SONG)
            .bind(title)
            .bind(artist_id.0)
            .bind(lyrics)
            .execute(&self.pool)
            .await
            .map_err(storage("add_song", format!("{title} / artist {artist_id}")))?;

        let id = SongId(result.last_insert_rowid());
        tracing::debug!(title, artist_id = artist_id.0, id = id.0, "Stored song");
        Ok(id)
    }

    /// Resolves the artist and inserts the song in one transaction, so a
    /// failed insert leaves no orphan artist behind.
    pub async fn save_song(
        &self,
        title: &str,
        artist_name: &str,
        lyrics: &str,
    ) -> Result<Song, StoreError> {
        let key = format!("{title} / {artist_name}");
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("save_song", key.as_str()))?;

        let artist_id: i64 = sqlx::query_scalar(UPSERT_ARTIST)
            .bind(artist_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage("save_song", key.as_str()))?;
        let result = sqlx::query(INSERT_SONG)
            .bind(title)
            .bind(artist_id)
            .bind(lyrics)
            .execute(&mut *tx)
            .await
            .map_err(storage("save_song", key.as_str()))?;

        tx.commit().await.map_err(storage("save_song", key))?;

        let song = Song {
            id: SongId(result.last_insert_rowid()),
            title: title.to_string(),
            artist_id: ArtistId(artist_id),
            lyrics: Some(lyrics.to_string()),
        };
        tracing::debug!(title, artist = artist_name, id = song.id.0, "Saved song");
        Ok(song)
    }

    /// Exact-match lookup of a song by title and artist name.
    pub async fn find_by_title_and_artist(
        &self,
        title: &str,
        artist_name: &str,
    ) -> Result<Option<Song>, StoreError> {
        let row = sqlx::query_as::<_, SongRow>(SELECT_SONG_BY_TITLE_AND_ARTIST)
            .bind(title)
            .bind(artist_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage(
                "find_by_title_and_artist",
                format!("{title} / {artist_name}"),
            ))?;

        match &row {
            Some(_) => tracing::debug!(title, artist = artist_name, "Database hit"),
            None => tracing::debug!(title, artist = artist_name, "Database miss"),
        }
        Ok(row.map(Song::from))
    }

    /// Case-insensitive substring search over song titles, ordered by id.
    ///
    /// Case folding is Unicode-aware (SQLite's `LIKE` only folds ASCII), so
    /// the filter runs here over the id-ordered scan.
    pub async fn search_by_title_substring(&self, keyword: &str) -> Result<Vec<Song>, StoreError> {
        let needle = keyword.to_lowercase();
        let rows = sqlx::query_as::<_, SongRow>(SELECT_SONGS)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("search_by_title_substring", keyword))?;
        Ok(rows
            .into_iter()
            .filter(|(_, title, _, _)| title.to_lowercase().contains(&needle))
            .map(Song::from)
            .collect())
    }

    /// All songs by the artist called `artist_name`, ordered by id.
    pub async fn songs_by_artist(&self, artist_name: &str) -> Result<Vec<Song>, StoreError> {
        let rows = sqlx::query_as::<_, SongRow>(SELECT_SONGS_BY_ARTIST)
            .bind(artist_name)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("songs_by_artist", artist_name))?;
        Ok(rows.into_iter().map(Song::from).collect())
    }

    pub async fn list_artists(&self) -> Result<Vec<Artist>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, String)>(SELECT_ARTISTS)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list_artists", "*"))?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Artist { id: ArtistId(id), name })
            .collect())
    }

    pub async fn list_songs(&self) -> Result<Vec<Song>, StoreError> {
        let rows = sqlx::query_as::<_, SongRow>(SELECT_SONGS)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list_songs", "*"))?;
        Ok(rows.into_iter().map(Song::from).collect())
    }

    /// Releases the connection. Works regardless of how the last operation
    /// ended.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("Closed lyrics database");
    }
}
