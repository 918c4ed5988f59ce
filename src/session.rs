use crate::audio::AudioEngine;
use crate::catalog::Catalog;
use crate::model::{Track, TrackId};
use crate::toast::Toast;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::time::Duration;

/// `prev` restarts the current track instead of moving back once playback is
/// past this point.
pub const PREV_RESTART_THRESHOLD_SECONDS: f64 = 3.0;
const UNMUTE_FALLBACK_VOLUME: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Paused,
    Playing,
}

#[derive(Debug)]
pub struct PlaybackSession {
    current_track_id: Option<TrackId>,
    queue: Vec<TrackId>,
    pub is_playing: bool,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    volume: f32,
    volume_before_mute: f32,
    pub shuffle: bool,
    pub repeat: bool,
    liked: BTreeSet<TrackId>,
    pub toast: Toast,
    pub last_error: Option<String>,
    rng: SmallRng,
}

impl PlaybackSession {
    /// New idle session whose queue is the whole catalog.
    pub fn new(catalog: &Catalog, volume: f32) -> Self {
        Self::with_rng(catalog, volume, SmallRng::from_os_rng())
    }

    pub fn with_rng(catalog: &Catalog, volume: f32, rng: SmallRng) -> Self {
        let volume = clamp_volume(volume).unwrap_or(0.75);
        Self {
            current_track_id: None,
            queue: catalog.ids(),
            is_playing: false,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            volume,
            volume_before_mute: volume,
            shuffle: false,
            repeat: false,
            liked: BTreeSet::new(),
            toast: Toast::default(),
            last_error: None,
            rng,
        }
    }

    pub fn state(&self, catalog: &Catalog) -> SessionState {
        match (self.current_track_id(catalog), self.is_playing) {
            (None, _) => SessionState::Idle,
            (Some(_), true) => SessionState::Playing,
            (Some(_), false) => SessionState::Paused,
        }
    }

    /// The current id, if it still resolves in `catalog`.
    pub fn current_track_id(&self, catalog: &Catalog) -> Option<TrackId> {
        self.current_track_id.filter(|id| catalog.contains(*id))
    }

    pub fn current_track<'a>(&self, catalog: &'a Catalog) -> Option<&'a Track> {
        self.current_track_id.and_then(|id| catalog.get(id))
    }

    pub fn queue(&self) -> &[TrackId] {
        &self.queue
    }

    pub fn queue_tracks<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Track> {
        self.queue.iter().filter_map(|id| catalog.get(*id)).collect()
    }

    pub fn current_index(&self) -> Option<usize> {
        let current = self.current_track_id?;
        self.queue.iter().position(|id| *id == current)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn volume_before_mute(&self) -> f32 {
        self.volume_before_mute
    }

    pub fn liked(&self) -> &BTreeSet<TrackId> {
        &self.liked
    }

    pub fn is_liked(&self, id: TrackId) -> bool {
        self.liked.contains(&id)
    }

    pub fn play(
        &mut self,
        catalog: &Catalog,
        audio: &mut dyn AudioEngine,
        id: TrackId,
        queue: Vec<TrackId>,
    ) {
        let Some(track) = catalog.get(id) else {
            tracing::debug!(id = %id, "play ignored for unknown track");
            return;
        };

        let same_track = self.current_track_id(catalog) == Some(id)
            && audio.current_source() == Some(&track.audio)
            && !audio.is_finished();

        self.current_track_id = Some(id);
        self.queue = queue;
        self.is_playing = true;
        self.toast.show(format!("Now Playing: {}", track.title));
        tracing::debug!(id = %id, title = %track.title, queue = self.queue.len(), "play");

        if same_track {
            if audio.is_paused()
                && let Err(err) = audio.resume()
            {
                self.transport_failed(audio, err);
            }
            return;
        }

        self.load_and_start(track, audio);
    }

    pub fn toggle_play_pause(&mut self, catalog: &Catalog, audio: &mut dyn AudioEngine) {
        let Some(track) = self.current_track(catalog) else {
            if let Some(first) = self.queue.first().copied() {
                let queue = self.queue.clone();
                self.play(catalog, audio, first, queue);
            } else if let Some(first) = catalog.list().first() {
                self.play(catalog, audio, first.id, catalog.ids());
            }
            return;
        };

        if self.is_playing {
            audio.pause();
            self.is_playing = false;
            return;
        }

        self.is_playing = true;
        if audio.current_source() == Some(&track.audio) && !audio.is_finished() {
            if let Err(err) = audio.resume() {
                self.transport_failed(audio, err);
            }
        } else {
            self.load_and_start(track, audio);
        }
    }

    pub fn next(&mut self, catalog: &Catalog, audio: &mut dyn AudioEngine) {
        if self.current_track_id(catalog).is_none() || self.queue.is_empty() {
            return;
        }

        let len = self.queue.len();
        let current_index = self.current_index();
        let next_index = if self.shuffle {
            let pick = self.random_index(len);
            if len > 1 && Some(pick) == current_index {
                (pick + 1) % len
            } else {
                pick
            }
        } else {
            current_index.map_or(0, |idx| (idx + 1) % len)
        };

        let id = self.queue[next_index];
        let queue = self.queue.clone();
        self.play(catalog, audio, id, queue);
    }

    pub fn prev(&mut self, catalog: &Catalog, audio: &mut dyn AudioEngine) {
        if self.current_track_id(catalog).is_none() || self.queue.is_empty() {
            return;
        }

        if self.position_seconds > PREV_RESTART_THRESHOLD_SECONDS {
            self.position_seconds = 0.0;
            if let Err(err) = audio.seek_to(Duration::ZERO) {
                tracing::warn!("restart seek failed: {err:#}");
            }
            return;
        }

        let len = self.queue.len();
        let prev_index = self
            .current_index()
            .map_or(len - 1, |idx| (idx + len - 1) % len);
        let id = self.queue[prev_index];
        let queue = self.queue.clone();
        self.play(catalog, audio, id, queue);
    }

    pub fn seek(&mut self, catalog: &Catalog, audio: &mut dyn AudioEngine, seconds: f64) {
        if self.current_track_id(catalog).is_none() || !seconds.is_finite() {
            return;
        }

        let mut target = seconds.max(0.0);
        if self.duration_seconds > 0.0 {
            target = target.min(self.duration_seconds);
        }
        self.position_seconds = target;
        if let Err(err) = audio.seek_to(Duration::from_secs_f64(target)) {
            tracing::warn!("seek failed: {err:#}");
        }
    }

    pub fn set_volume(&mut self, audio: &mut dyn AudioEngine, volume: f32) {
        let Some(volume) = clamp_volume(volume) else {
            return;
        };
        self.volume = volume;
        if volume > 0.0 {
            self.volume_before_mute = volume;
        }
        audio.set_volume(volume);
    }

    pub fn toggle_mute(&mut self, audio: &mut dyn AudioEngine) {
        if self.volume > 0.0 {
            self.volume_before_mute = self.volume;
            self.volume = 0.0;
        } else if self.volume_before_mute > 0.0 {
            self.volume = self.volume_before_mute;
        } else {
            self.volume = UNMUTE_FALLBACK_VOLUME;
        }
        audio.set_volume(self.volume);
    }

    pub fn toggle_shuffle(&mut self) {
        self.shuffle = !self.shuffle;
    }

    pub fn toggle_repeat(&mut self) {
        self.repeat = !self.repeat;
    }

    /// Flips `id` in the liked set and reports whether it is now liked.
    pub fn toggle_like(&mut self, id: TrackId) -> bool {
        if self.liked.remove(&id) {
            false
        } else {
            self.liked.insert(id);
            true
        }
    }

    pub fn on_time_update(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds >= 0.0 {
            self.position_seconds = seconds;
        }
    }

    pub fn on_duration_known(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.duration_seconds = seconds;
        }
    }

    pub fn on_track_ended(&mut self, catalog: &Catalog, audio: &mut dyn AudioEngine) {
        if !self.repeat {
            self.next(catalog, audio);
            return;
        }

        let Some(track) = self.current_track(catalog) else {
            return;
        };
        self.is_playing = true;
        self.load_and_start(track, audio);
    }

    /// Feeds the transport's clock and end-of-track signal into the session.
    /// Called once per UI tick.
    pub fn sync_from_transport(&mut self, catalog: &Catalog, audio: &mut dyn AudioEngine) {
        let Some(track) = self.current_track(catalog) else {
            return;
        };
        if audio.current_source() != Some(&track.audio) {
            return;
        }

        if let Some(position) = audio.position() {
            self.on_time_update(position.as_secs_f64());
        }
        if let Some(duration) = audio.duration() {
            self.on_duration_known(duration.as_secs_f64());
        }
        if self.is_playing && audio.is_finished() {
            self.on_track_ended(catalog, audio);
        }
    }

    /// Drops queue entries, likes and the current id that no longer resolve.
    /// An idle session takes the whole catalog as its queue again.
    pub fn on_catalog_changed(&mut self, catalog: &Catalog, audio: &mut dyn AudioEngine) {
        self.queue.retain(|id| catalog.contains(*id));
        self.liked.retain(|id| catalog.contains(*id));

        if let Some(id) = self.current_track_id
            && !catalog.contains(id)
        {
            tracing::info!(id = %id, "current track left the catalog");
            self.current_track_id = None;
            self.is_playing = false;
            self.position_seconds = 0.0;
            self.duration_seconds = 0.0;
            audio.stop();
        }

        if self.current_track_id.is_none() {
            self.queue = catalog.ids();
        }
    }

    fn load_and_start(&mut self, track: &Track, audio: &mut dyn AudioEngine) {
        self.position_seconds = 0.0;
        self.duration_seconds = track.duration_seconds;
        audio.set_volume(self.volume);

        let expected = (track.duration_seconds.is_finite() && track.duration_seconds > 0.0)
            .then(|| Duration::from_secs_f64(track.duration_seconds));
        match audio.play(&track.audio, expected) {
            Ok(()) => self.last_error = None,
            Err(err) => self.transport_failed(audio, err),
        }
    }

    fn transport_failed(&mut self, audio: &mut dyn AudioEngine, err: anyhow::Error) {
        tracing::warn!("playback failed to start: {err:#}");
        audio.stop();
        self.is_playing = false;
        self.last_error = Some(format!("{err:#}"));
    }

    fn random_index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

fn clamp_volume(volume: f32) -> Option<f32> {
    volume.is_finite().then(|| volume.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Locator;
    use proptest::prop_assert;
    use std::path::PathBuf;

    #[derive(Default)]
    struct TestAudioEngine {
        paused: bool,
        current: Option<Locator>,
        finished: bool,
        played: Vec<Locator>,
        seeks: Vec<Duration>,
        volume: f32,
        fail_play: bool,
        position: Option<Duration>,
    }

    impl AudioEngine for TestAudioEngine {
        fn play(&mut self, source: &Locator, _expected: Option<Duration>) -> anyhow::Result<()> {
            if self.fail_play {
                anyhow::bail!("resource unavailable");
            }
            self.current = Some(source.clone());
            self.paused = false;
            self.finished = false;
            self.played.push(source.clone());
            Ok(())
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn resume(&mut self) -> anyhow::Result<()> {
            self.paused = false;
            Ok(())
        }

        fn stop(&mut self) {
            self.current = None;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn current_source(&self) -> Option<&Locator> {
            self.current.as_ref()
        }

        fn position(&self) -> Option<Duration> {
            self.current.as_ref().and(self.position)
        }

        fn duration(&self) -> Option<Duration> {
            None
        }

        fn seek_to(&mut self, position: Duration) -> anyhow::Result<()> {
            self.seeks.push(position);
            Ok(())
        }

        fn volume(&self) -> f32 {
            self.volume
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn output_name(&self) -> Option<String> {
            Some(String::from("test"))
        }

        fn is_finished(&self) -> bool {
            self.finished
        }
    }

    fn track(id: u32) -> Track {
        Track {
            id: TrackId(id),
            title: format!("song {id}"),
            artist: String::from("artist"),
            album: String::from("album"),
            duration_seconds: 120.0,
            cover_art: Locator::remote("https://example.invalid/cover"),
            audio: Locator::Local(PathBuf::from(format!("{id}.mp3"))),
        }
    }

    fn catalog(len: u32) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add((1..=len).map(track).collect());
        catalog
    }

    fn session(catalog: &Catalog) -> PlaybackSession {
        PlaybackSession::with_rng(catalog, 0.75, SmallRng::seed_from_u64(7))
    }

    fn local(id: u32) -> Locator {
        Locator::Local(PathBuf::from(format!("{id}.mp3")))
    }

    #[test]
    fn new_session_is_idle_with_full_catalog_queue() {
        let catalog = catalog(3);
        let session = session(&catalog);
        assert_eq!(session.state(&catalog), SessionState::Idle);
        assert_eq!(session.queue(), &[TrackId(1), TrackId(2), TrackId(3)]);
        assert_eq!(session.volume(), 0.75);
    }

    #[test]
    fn play_loads_track_and_shows_toast() {
        let catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();

        session.play(&catalog, &mut audio, TrackId(2), vec![TrackId(2), TrackId(3)]);

        assert_eq!(session.state(&catalog), SessionState::Playing);
        assert_eq!(session.queue(), &[TrackId(2), TrackId(3)]);
        assert_eq!(audio.played, vec![local(2)]);
        assert_eq!(audio.volume, 0.75);
        assert_eq!(session.toast.visible_message(), Some("Now Playing: song 2"));
    }

    #[test]
    fn play_unknown_track_is_ignored() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();

        session.play(&catalog, &mut audio, TrackId(42), vec![TrackId(42)]);

        assert_eq!(session.state(&catalog), SessionState::Idle);
        assert!(audio.played.is_empty());
        assert_eq!(session.queue().len(), 2);
    }

    #[test]
    fn replaying_paused_track_resumes_without_reload() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());
        session.toggle_play_pause(&catalog, &mut audio);
        session.position_seconds = 42.0;

        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());

        assert!(session.is_playing);
        assert!(!audio.paused);
        assert_eq!(audio.played.len(), 1);
        assert_eq!(session.position_seconds, 42.0);
    }

    #[test]
    fn play_failure_reverts_to_paused_and_records_error() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine {
            fail_play: true,
            ..TestAudioEngine::default()
        };

        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());

        assert_eq!(session.state(&catalog), SessionState::Paused);
        assert_eq!(session.current_track_id(&catalog), Some(TrackId(1)));
        assert!(
            session
                .last_error
                .as_deref()
                .is_some_and(|err| err.contains("resource unavailable"))
        );
    }

    #[test]
    fn toggle_without_current_plays_first_queue_entry() {
        let catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();

        session.toggle_play_pause(&catalog, &mut audio);

        assert_eq!(session.current_track_id(&catalog), Some(TrackId(1)));
        assert!(session.is_playing);
    }

    #[test]
    fn toggle_pauses_and_resumes_transport() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());

        session.toggle_play_pause(&catalog, &mut audio);
        assert!(!session.is_playing);
        assert!(audio.paused);

        session.toggle_play_pause(&catalog, &mut audio);
        assert!(session.is_playing);
        assert!(!audio.paused);
        assert_eq!(audio.played.len(), 1);
    }

    #[test]
    fn toggle_after_failed_start_reloads_source() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine {
            fail_play: true,
            ..TestAudioEngine::default()
        };
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());
        audio.fail_play = false;

        session.toggle_play_pause(&catalog, &mut audio);

        assert!(session.is_playing);
        assert_eq!(audio.played, vec![local(1)]);
        assert_eq!(session.last_error, None);
    }

    #[test]
    fn next_wraps_around_queue() {
        let catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(3), catalog.ids());

        session.next(&catalog, &mut audio);

        assert_eq!(session.current_track_id(&catalog), Some(TrackId(1)));
    }

    #[test]
    fn next_without_current_track_is_noop() {
        let catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();

        session.next(&catalog, &mut audio);
        session.prev(&catalog, &mut audio);

        assert_eq!(session.state(&catalog), SessionState::Idle);
        assert!(audio.played.is_empty());
    }

    #[test]
    fn next_then_prev_returns_to_start() {
        let catalog = catalog(4);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(2), catalog.ids());

        session.next(&catalog, &mut audio);
        assert_eq!(session.current_track_id(&catalog), Some(TrackId(3)));
        session.prev(&catalog, &mut audio);
        assert_eq!(session.current_track_id(&catalog), Some(TrackId(2)));
    }

    #[test]
    fn prev_restarts_after_threshold() {
        let catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(2), catalog.ids());
        session.on_time_update(3.5);

        session.prev(&catalog, &mut audio);

        assert_eq!(session.current_track_id(&catalog), Some(TrackId(2)));
        assert_eq!(session.position_seconds, 0.0);
        assert_eq!(audio.seeks, vec![Duration::ZERO]);
    }

    #[test]
    fn prev_at_exactly_threshold_moves_back() {
        let catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());
        session.on_time_update(PREV_RESTART_THRESHOLD_SECONDS);

        session.prev(&catalog, &mut audio);

        assert_eq!(session.current_track_id(&catalog), Some(TrackId(3)));
    }

    #[test]
    fn shuffle_with_single_entry_reselects_it() {
        let catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.toggle_shuffle();
        session.play(&catalog, &mut audio, TrackId(2), vec![TrackId(2)]);

        for _ in 0..10 {
            session.next(&catalog, &mut audio);
            assert_eq!(session.current_track_id(&catalog), Some(TrackId(2)));
        }
    }

    #[test]
    fn shuffle_never_repeats_immediately() {
        let catalog = catalog(5);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.toggle_shuffle();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());

        for _ in 0..200 {
            let before = session.current_index();
            session.next(&catalog, &mut audio);
            assert_ne!(session.current_index(), before);
        }
    }

    #[test]
    fn mute_twice_restores_volume() {
        let catalog = catalog(1);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.set_volume(&mut audio, 0.33);

        session.toggle_mute(&mut audio);
        assert_eq!(session.volume(), 0.0);
        assert_eq!(audio.volume, 0.0);
        session.toggle_mute(&mut audio);
        assert_eq!(session.volume(), 0.33);
    }

    #[test]
    fn unmute_falls_back_when_nothing_remembered() {
        let catalog = catalog(1);
        let mut session = PlaybackSession::with_rng(&catalog, 0.0, SmallRng::seed_from_u64(1));
        let mut audio = TestAudioEngine::default();

        session.toggle_mute(&mut audio);

        assert_eq!(session.volume(), 0.5);
    }

    #[test]
    fn volume_is_clamped_and_zero_is_not_remembered() {
        let catalog = catalog(1);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();

        session.set_volume(&mut audio, 1.7);
        assert_eq!(session.volume(), 1.0);
        session.set_volume(&mut audio, 0.0);
        assert_eq!(session.volume_before_mute(), 1.0);
        session.set_volume(&mut audio, f32::NAN);
        assert_eq!(session.volume(), 0.0);
    }

    #[test]
    fn seek_is_clamped_to_duration() {
        let catalog = catalog(1);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.seek(&catalog, &mut audio, 10.0);
        assert!(audio.seeks.is_empty());

        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());
        session.seek(&catalog, &mut audio, 500.0);
        assert_eq!(session.position_seconds, 120.0);
        session.seek(&catalog, &mut audio, -4.0);
        assert_eq!(session.position_seconds, 0.0);
    }

    #[test]
    fn track_end_advances_without_stopping() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());

        session.on_track_ended(&catalog, &mut audio);

        assert_eq!(session.current_track_id(&catalog), Some(TrackId(2)));
        assert!(session.is_playing);
    }

    #[test]
    fn track_end_with_repeat_restarts_current() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.toggle_repeat();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());
        session.on_time_update(119.0);

        session.on_track_ended(&catalog, &mut audio);

        assert_eq!(session.current_track_id(&catalog), Some(TrackId(1)));
        assert_eq!(session.position_seconds, 0.0);
        assert_eq!(audio.played, vec![local(1), local(1)]);
    }

    #[test]
    fn sync_advances_when_transport_finishes() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());
        audio.finished = true;

        session.sync_from_transport(&catalog, &mut audio);

        assert_eq!(session.current_track_id(&catalog), Some(TrackId(2)));
        assert_eq!(audio.played, vec![local(1), local(2)]);
    }

    #[test]
    fn single_entry_queue_restarts_after_end() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(1), vec![TrackId(1)]);
        audio.finished = true;

        session.on_track_ended(&catalog, &mut audio);

        assert_eq!(audio.played, vec![local(1), local(1)]);
        assert!(!audio.finished);
    }

    #[test]
    fn removing_current_track_clears_it_and_stops_transport() {
        let mut catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(2), catalog.ids());

        catalog.remove(TrackId(2));
        assert_eq!(session.current_track_id(&catalog), None);
        session.on_catalog_changed(&catalog, &mut audio);

        assert_eq!(session.state(&catalog), SessionState::Idle);
        assert_eq!(session.queue(), &[TrackId(1), TrackId(3)]);
        assert!(audio.current.is_none());

        session.toggle_play_pause(&catalog, &mut audio);
        assert_eq!(session.current_track_id(&catalog), Some(TrackId(1)));
    }

    #[test]
    fn failed_start_silences_previous_track_and_ignores_its_clock() {
        let catalog = catalog(3);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());
        audio.position = Some(Duration::from_secs(40));
        audio.fail_play = true;

        session.play(&catalog, &mut audio, TrackId(2), catalog.ids());

        assert_eq!(session.state(&catalog), SessionState::Paused);
        assert!(audio.current.is_none());

        audio.current = Some(local(1));
        session.sync_from_transport(&catalog, &mut audio);

        assert_eq!(session.position_seconds, 0.0);
        assert_eq!(session.duration_seconds, 120.0);
        assert_eq!(session.current_track_id(&catalog), Some(TrackId(2)));
    }

    #[test]
    fn sync_follows_transport_clock_for_current_source() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();
        session.play(&catalog, &mut audio, TrackId(1), catalog.ids());
        audio.position = Some(Duration::from_secs(12));

        session.sync_from_transport(&catalog, &mut audio);

        assert_eq!(session.position_seconds, 12.0);
    }

    #[test]
    fn idle_session_picks_up_imported_tracks() {
        let mut catalog = catalog(2);
        let mut session = session(&catalog);
        let mut audio = TestAudioEngine::default();

        catalog.add(vec![track(3)]);
        session.on_catalog_changed(&catalog, &mut audio);
        assert_eq!(session.queue(), &[TrackId(1), TrackId(2), TrackId(3)]);

        session.play(&catalog, &mut audio, TrackId(1), vec![TrackId(1)]);
        catalog.add(vec![track(4)]);
        session.on_catalog_changed(&catalog, &mut audio);
        assert_eq!(session.queue(), &[TrackId(1)]);
    }

    #[test]
    fn like_toggles_membership() {
        let catalog = catalog(2);
        let mut session = session(&catalog);
        assert!(session.toggle_like(TrackId(2)));
        assert!(session.is_liked(TrackId(2)));
        assert!(!session.toggle_like(TrackId(2)));
        assert!(session.liked().is_empty());
    }

    proptest::proptest! {
        #[test]
        fn session_invariants_hold_after_random_ops(ops in proptest::collection::vec(0u8..10, 1..200)) {
            let mut catalog = catalog(6);
            let mut session = session(&catalog);
            let mut audio = TestAudioEngine::default();

            for op in ops {
                match op {
                    0 => session.toggle_play_pause(&catalog, &mut audio),
                    1 => session.next(&catalog, &mut audio),
                    2 => session.prev(&catalog, &mut audio),
                    3 => session.toggle_shuffle(),
                    4 => session.toggle_repeat(),
                    5 => session.toggle_mute(&mut audio),
                    6 => session.on_time_update(f64::from(op) * 0.7),
                    7 => session.on_track_ended(&catalog, &mut audio),
                    8 => {
                        if let Some(first) = catalog.list().first().map(|t| t.id) {
                            catalog.remove(first);
                            session.on_catalog_changed(&catalog, &mut audio);
                        }
                    }
                    _ => session.play(&catalog, &mut audio, TrackId(6), catalog.ids()),
                }

                if let Some(idx) = session.current_index() {
                    prop_assert!(idx < session.queue().len());
                }
                prop_assert!((0.0..=1.0).contains(&session.volume()));
                prop_assert!(session.queue().iter().all(|id| catalog.contains(*id)));
                if session.current_track_id(&catalog).is_none() {
                    prop_assert!(session.state(&catalog) == SessionState::Idle);
                }
            }
        }
    }
}
