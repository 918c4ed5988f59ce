#![no_main]

use libfuzzer_sys::fuzz_target;
use musikipri::audio::NullAudioEngine;
use musikipri::catalog::Catalog;
use musikipri::model::TrackId;
use musikipri::session::PlaybackSession;
use rand::SeedableRng;
use rand::rngs::SmallRng;

fuzz_target!(|data: &[u8]| {
    let mut catalog = Catalog::seeded();
    let mut audio = NullAudioEngine::new();
    let mut session = PlaybackSession::with_rng(&catalog, 0.75, SmallRng::seed_from_u64(0));

    for pair in data.chunks(2) {
        let arg = pair.get(1).copied().unwrap_or_default();
        match pair[0] % 12 {
            0 => {
                let queue: Vec<TrackId> = catalog
                    .ids()
                    .into_iter()
                    .filter(|id| id.0 % u32::from(arg % 3 + 1) == 0)
                    .collect();
                if let Some(first) = queue.first().copied() {
                    session.play(&catalog, &mut audio, first, queue);
                }
            }
            1 => session.toggle_play_pause(&catalog, &mut audio),
            2 => session.next(&catalog, &mut audio),
            3 => session.prev(&catalog, &mut audio),
            4 => session.seek(&catalog, &mut audio, f64::from(arg) * 2.0),
            5 => session.set_volume(&mut audio, f32::from(arg) / 200.0),
            6 => session.toggle_mute(&mut audio),
            7 => session.toggle_shuffle(),
            8 => session.toggle_repeat(),
            9 => session.on_track_ended(&catalog, &mut audio),
            10 => {
                let _ = session.toggle_like(TrackId(u32::from(arg % 10)));
            }
            _ => {
                catalog.remove(TrackId(u32::from(arg % 10)));
                session.on_catalog_changed(&catalog, &mut audio);
            }
        }

        if let Some(idx) = session.current_index() {
            assert!(idx < session.queue().len());
        }
        assert!((0.0..=1.0).contains(&session.volume()));
    }
});
