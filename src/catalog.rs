use crate::model::{Locator, Track, TrackId};
use std::collections::{BTreeSet, HashMap};

/// Ordered track collection. Identifiers are unique; insertion order is kept.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    lookup: HashMap<TrackId, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let mut catalog = Self::new();
        catalog.add(seed_tracks());
        catalog
    }

    /// Appends `tracks` in order. A track whose id is already present is
    /// dropped; the caller is expected to have allocated fresh ids.
    pub fn add(&mut self, tracks: Vec<Track>) -> usize {
        let mut added = 0;
        for track in tracks {
            if self.lookup.contains_key(&track.id) {
                tracing::warn!(id = %track.id, "rejected track with duplicate id");
                continue;
            }
            self.lookup.insert(track.id, self.tracks.len());
            tracing::info!(id = %track.id, title = %track.title, "track added");
            self.tracks.push(track);
            added += 1;
        }
        added
    }

    pub fn update(&mut self, track: Track) -> bool {
        let Some(idx) = self.lookup.get(&track.id).copied() else {
            return false;
        };
        tracing::info!(id = %track.id, title = %track.title, "track updated");
        self.tracks[idx] = track;
        true
    }

    pub fn remove(&mut self, id: TrackId) -> Option<Track> {
        let idx = self.lookup.get(&id).copied()?;
        let removed = self.tracks.remove(idx);
        self.rebuild_lookup();
        tracing::info!(id = %id, title = %removed.title, "track removed");
        Some(removed)
    }

    pub fn list(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.lookup.get(&id).and_then(|idx| self.tracks.get(*idx))
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.lookup.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|track| track.id).collect()
    }

    pub fn max_id(&self) -> Option<TrackId> {
        self.tracks.iter().map(|track| track.id).max()
    }

    pub fn search(&self, query: &str) -> Vec<&Track> {
        self.tracks
            .iter()
            .filter(|track| track.matches_query(query))
            .collect()
    }

    pub fn liked(&self, liked: &BTreeSet<TrackId>) -> Vec<&Track> {
        self.tracks
            .iter()
            .filter(|track| liked.contains(&track.id))
            .collect()
    }

    fn rebuild_lookup(&mut self) {
        self.lookup = self
            .tracks
            .iter()
            .enumerate()
            .map(|(idx, track)| (track.id, idx))
            .collect();
    }
}

struct SeedEntry {
    title: &'static str,
    artist: &'static str,
    album: &'static str,
    duration_seconds: f64,
    slug: &'static str,
}

const SEED: [SeedEntry; 8] = [
    SeedEntry {
        title: "Ambient Chill",
        artist: "Chillwave Cafe",
        album: "Lo-Fi Dreams",
        duration_seconds: 140.0,
        slug: "ambient_chill",
    },
    SeedEntry {
        title: "Synthwave Runner",
        artist: "80s Nostalgia",
        album: "Neon Nights",
        duration_seconds: 125.0,
        slug: "synthwave_runner",
    },
    SeedEntry {
        title: "Acoustic Mornings",
        artist: "The Folksters",
        album: "Sunrise Sessions",
        duration_seconds: 155.0,
        slug: "acoustic_mornings",
    },
    SeedEntry {
        title: "Funky Groove",
        artist: "The Groovmasters",
        album: "Dance Floor",
        duration_seconds: 110.0,
        slug: "funky_groove",
    },
    SeedEntry {
        title: "Orchestral Epic",
        artist: "Cinema Sound",
        album: "Movie Magic",
        duration_seconds: 180.0,
        slug: "orchestral_epic",
    },
    SeedEntry {
        title: "Reggae Vibes",
        artist: "Island Beats",
        album: "Beach Party",
        duration_seconds: 132.0,
        slug: "reggae_vibes",
    },
    SeedEntry {
        title: "Hip Hop Flow",
        artist: "MC Rhyme",
        album: "Street Knowledge",
        duration_seconds: 118.0,
        slug: "hip_hop_flow",
    },
    SeedEntry {
        title: "Cinematic Atmosphere",
        artist: "Soundtrack Scapes",
        album: "Ethereal Journeys",
        duration_seconds: 210.0,
        slug: "cinematic_atmosphere",
    },
];

/// The fixed startup dataset, ids 1 through 8.
pub fn seed_tracks() -> Vec<Track> {
    SEED.iter()
        .enumerate()
        .map(|(idx, entry)| Track {
            id: TrackId(idx as u32 + 1),
            title: entry.title.to_string(),
            artist: entry.artist.to_string(),
            album: entry.album.to_string(),
            duration_seconds: entry.duration_seconds,
            cover_art: Locator::Remote(format!("https://picsum.photos/seed/music{}/400", idx + 1)),
            audio: Locator::Remote(format!(
                "https://storage.googleapis.com/music-maker-models/music/{}.wav",
                entry.slug
            )),
        })
        .collect()
}
