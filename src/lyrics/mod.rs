// lyrics/mod.rs - lyrics storage, upstream providers and their helpers
pub mod database;
pub mod matching;
pub mod parse;
pub mod providers;
pub mod types;

pub use database::{Artist, LyricsStore, Song, StoreError};
pub use providers::{LyricsSource, build_providers};
pub use types::{Fetched, LyricsError};
