use crate::model::Locator;
use anyhow::{Context, Result};
use rodio::Source;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

const MAX_VOLUME: f32 = 1.0;

/// The media transport a playback session drives.
pub trait AudioEngine {
    /// Loads `source` and starts producing sound. `expected` is the catalog's
    /// duration for the track, used when the source itself cannot report one.
    fn play(&mut self, source: &Locator, expected: Option<Duration>) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn is_paused(&self) -> bool;
    fn current_source(&self) -> Option<&Locator>;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<()>;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn output_name(&self) -> Option<String>;
    fn is_finished(&self) -> bool;
}

pub struct RodioAudioEngine {
    stream: OutputStream,
    sink: Sink,
    current: Option<Locator>,
    track_duration: Option<Duration>,
    volume: f32,
}

impl RodioAudioEngine {
    pub fn new() -> Result<Self> {
        let stream = Self::open_output_stream()?;
        let sink = Sink::connect_new(stream.mixer());

        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            volume: 1.0,
        })
    }

    fn open_output_stream() -> Result<OutputStream> {
        let mut stream = with_silenced_stderr(|| {
            match OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_stream_or_fallback()
                        .context("failed to start default output stream")
                }) {
                Ok(stream) => Ok(stream),
                Err(default_err) => {
                    let host = rodio::cpal::default_host();
                    let fallback = host
                        .output_devices()
                        .ok()
                        .into_iter()
                        .flatten()
                        .find_map(|device| {
                            OutputStreamBuilder::from_device(device)
                                .ok()?
                                .with_error_callback(|_| {})
                                .open_stream_or_fallback()
                                .ok()
                        });
                    fallback.ok_or(default_err)
                }
            }
        })?;
        stream.log_on_drop(false);
        Ok(stream)
    }

    fn local_path(source: &Locator) -> Result<&Path> {
        match source {
            Locator::Local(path) => Ok(path.as_path()),
            Locator::Remote(url) => anyhow::bail!("remote sources cannot be streamed: {url}"),
        }
    }
}

impl AudioEngine for RodioAudioEngine {
    fn play(&mut self, source: &Locator, expected: Option<Duration>) -> Result<()> {
        self.stop();
        let path = Self::local_path(source)?;
        self.sink = Sink::connect_new(self.stream.mixer());

        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let decoded = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.track_duration = decoded
            .total_duration()
            .filter(|duration| !duration.is_zero())
            .or(expected);
        self.sink.append(decoded);
        self.sink.set_volume(self.volume);
        self.current = Some(source.clone());
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no active track");
        }
        self.sink.play();
        Ok(())
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn current_source(&self) -> Option<&Locator> {
        self.current.as_ref()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no active track"));
        }

        self.sink
            .try_seek(position)
            .map_err(|err| anyhow::anyhow!("failed to seek current track: {err:?}"))
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
        self.sink.set_volume(self.volume);
    }

    fn output_name(&self) -> Option<String> {
        Some(format!(
            "System output ({} ch)",
            self.stream.config().channel_count()
        ))
    }

    fn is_finished(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && self.sink.empty()
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Silent transport with a logical clock. Used without an output device and
/// by `--null-audio`.
pub struct NullAudioEngine {
    paused: bool,
    current: Option<Locator>,
    volume: f32,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
}

impl NullAudioEngine {
    pub fn new() -> Self {
        Self {
            paused: false,
            current: None,
            volume: 1.0,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
        }
    }

    fn decoded_duration(source: &Locator) -> Option<Duration> {
        let file = File::open(source.local_path()?).ok()?;
        let decoded = Decoder::try_from(file).ok()?;
        decoded
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for NullAudioEngine {
    fn play(&mut self, source: &Locator, expected: Option<Duration>) -> Result<()> {
        self.paused = false;
        self.started_at = Some(Instant::now());
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::decoded_duration(source)
            .or(expected.filter(|duration| !duration.is_zero()));
        self.current = Some(source.clone());
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn resume(&mut self) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no active track");
        }
        self.started_at = Some(Instant::now());
        self.paused = false;
        Ok(())
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = false;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_source(&self) -> Option<&Locator> {
        self.current.as_ref()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no active track"));
        }

        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
    }

    fn output_name(&self) -> Option<String> {
        Some("Null audio engine".to_string())
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.current_position() >= duration
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioEngine, NullAudioEngine};
    use crate::model::Locator;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Silent 8 kHz mono 16-bit PCM, long enough to cover `millis`.
    fn write_silent_wav(path: &Path, millis: u32) {
        const RATE: u32 = 8_000;
        let data_len = RATE * millis / 1_000 * 2;

        let header: [&[u8]; 12] = [
            b"RIFF",
            &(36 + data_len).to_le_bytes(),
            b"WAVEfmt ",
            &16_u32.to_le_bytes(),
            &1_u16.to_le_bytes(),
            &1_u16.to_le_bytes(),
            &RATE.to_le_bytes(),
            &(RATE * 2).to_le_bytes(),
            &2_u16.to_le_bytes(),
            &16_u16.to_le_bytes(),
            b"data",
            &data_len.to_le_bytes(),
        ];
        let mut bytes = header.concat();
        bytes.resize(bytes.len() + data_len as usize, 0);

        fs::write(path, bytes).expect("wav fixture");
    }

    fn missing() -> Locator {
        Locator::Local(PathBuf::from("nonexistent-track.flac"))
    }

    #[test]
    fn null_engine_position_advances_when_playing() {
        let mut engine = NullAudioEngine::new();
        engine
            .play(&missing(), None)
            .expect("play should still work in null mode");
        let before = engine.position().expect("position should be present");
        thread::sleep(Duration::from_millis(20));
        let after = engine.position().expect("position should be present");
        assert!(after > before, "position should advance while playing");
    }

    #[test]
    fn null_engine_pause_and_resume_control_position_progression() {
        let mut engine = NullAudioEngine::new();
        engine.play(&missing(), None).expect("play");
        thread::sleep(Duration::from_millis(20));

        engine.pause();
        let paused = engine.position().expect("position should be present");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.position(), Some(paused), "position should freeze while paused");

        engine.resume().expect("resume");
        thread::sleep(Duration::from_millis(20));
        let resumed = engine.position().expect("position should be present");
        assert!(resumed > paused, "position should continue after resume");
    }

    #[test]
    fn null_engine_resume_without_track_fails() {
        let mut engine = NullAudioEngine::new();
        assert!(engine.resume().is_err());
        assert!(engine.seek_to(Duration::from_secs(1)).is_err());
    }

    #[test]
    fn null_engine_uses_expected_duration_for_remote_sources() {
        let mut engine = NullAudioEngine::new();
        engine
            .play(
                &Locator::remote("https://example.invalid/a.wav"),
                Some(Duration::from_secs(140)),
            )
            .expect("play");
        assert_eq!(engine.duration(), Some(Duration::from_secs(140)));

        engine.seek_to(Duration::from_secs(500)).expect("seek");
        assert_eq!(engine.position(), Some(Duration::from_secs(140)));
        assert!(engine.is_finished());
    }

    #[test]
    fn null_engine_finishes_when_decoded_duration_elapses() {
        let dir = tempdir().expect("tempdir");
        let track = dir.path().join("fixture.wav");
        write_silent_wav(&track, 80);

        let mut engine = NullAudioEngine::new();
        engine
            .play(&Locator::Local(track), Some(Duration::from_secs(999)))
            .expect("play should succeed for wav fixture");
        let duration = engine.duration().expect("duration should be detected");
        assert!(duration < Duration::from_secs(1));

        thread::sleep(Duration::from_millis(120));
        assert!(engine.is_finished(), "known-duration playback should finish");
    }

    #[test]
    fn null_engine_unknown_duration_does_not_auto_finish() {
        let mut engine = NullAudioEngine::new();
        engine.play(&missing(), None).expect("play");
        assert_eq!(engine.duration(), None);

        thread::sleep(Duration::from_millis(40));
        assert!(!engine.is_finished());
    }

    #[test]
    fn null_engine_clamps_volume() {
        let mut engine = NullAudioEngine::new();
        engine.set_volume(3.0);
        assert_eq!(engine.volume(), 1.0);
        engine.set_volume(-1.0);
        assert_eq!(engine.volume(), 0.0);
    }
}
