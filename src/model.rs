use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_COVER_ART_URL: &str = "https://picsum.photos/seed/default/400";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a track's audio or artwork can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Remote(String),
    Local(PathBuf),
}

impl Locator {
    pub fn remote(url: &str) -> Self {
        Self::Remote(url.to_string())
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path.as_path()),
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: f64,
    pub cover_art: Locator,
    pub audio: Locator,
}

impl Track {
    /// Replacement record for an admin edit. Blank fields keep the old value.
    pub fn with_edits(&self, title: &str, artist: &str, album: &str) -> Self {
        Self {
            title: keep_if_blank(title, &self.title),
            artist: keep_if_blank(artist, &self.artist),
            album: keep_if_blank(album, &self.album),
            ..self.clone()
        }
    }

    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.artist.to_lowercase().contains(&needle)
    }
}

fn keep_if_blank(value: &str, previous: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        previous.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidebarView {
    #[default]
    Home,
    Songs,
    Playlists,
    Artists,
    Albums,
    LikedSongs,
}

impl SidebarView {
    pub const ALL: [SidebarView; 6] = [
        Self::Home,
        Self::Songs,
        Self::Playlists,
        Self::Artists,
        Self::Albums,
        Self::LikedSongs,
    ];

    pub fn next(self) -> Self {
        match self {
            Self::Home => Self::Songs,
            Self::Songs => Self::Playlists,
            Self::Playlists => Self::Artists,
            Self::Artists => Self::Albums,
            Self::Albums => Self::LikedSongs,
            Self::LikedSongs => Self::Home,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Songs => "Songs",
            Self::Playlists => "Playlists",
            Self::Artists => "Artists",
            Self::Albums => "Albums",
            Self::LikedSongs => "Liked Songs",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,
    #[serde(default = "default_seek_step_seconds")]
    pub seek_step_seconds: u16,
    #[serde(default = "default_seed_catalog")]
    pub seed_catalog: bool,
}

fn default_admin_password() -> String {
    String::from("admin123")
}

fn default_initial_volume() -> f32 {
    0.75
}

fn default_seek_step_seconds() -> u16 {
    5
}

fn default_seed_catalog() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admin_password: default_admin_password(),
            initial_volume: default_initial_volume(),
            seek_step_seconds: default_seek_step_seconds(),
            seed_catalog: default_seed_catalog(),
        }
    }
}
