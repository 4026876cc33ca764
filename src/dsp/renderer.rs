//! Offline renderer — renders a fixed duration in chunks and encodes WAV.

use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, info, warn};

use crate::config::{EngineConfig, ExportConfig};
use crate::error::{EngineError, Result};
use crate::track::{Snapshot, TrackSource};

use super::engine::Engine;
use super::limiter::{normalize_peak, peak, soft_clip};

/// Shared flag that stops an offline render at the next chunk boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A finished stereo render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAudio {
    pub sample_rate: u32,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl RenderedAudio {
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        peak(&[&self.left[..], &self.right[..]])
    }

    /// Interleaved `[l0, r0, l1, r1, …]`.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * 2);
        for (l, r) in self.left.iter().zip(&self.right) {
            out.push(*l);
            out.push(*r);
        }
        out
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: 2,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    fn encode<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut wav = WavWriter::new(writer, self.spec())?;
        for (l, r) in self.left.iter().zip(&self.right) {
            wav.write_sample(to_pcm_i16(*l))?;
            wav.write_sample(to_pcm_i16(*r))?;
        }
        wav.finalize()?;
        Ok(())
    }

    /// Encode as a 16-bit PCM stereo WAV in memory.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.frames() * 4));
        self.encode(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write a 16-bit PCM stereo WAV to `path`.
    ///
    /// The data goes to `<path>.part` first and is renamed into place once
    /// complete; on failure the partial file is removed.
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let part = part_path(path);

        let written = fs::File::create(&part)
            .map_err(EngineError::from)
            .and_then(|file| self.encode(std::io::BufWriter::new(file)))
            .and_then(|()| fs::rename(&part, path).map_err(EngineError::from));

        if let Err(err) = written {
            let _ = fs::remove_file(&part);
            return Err(err);
        }
        info!("wrote {} ({:.1} s)", path.display(), self.duration_secs());
        Ok(())
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Convert a float sample to 16-bit PCM, clamping to [-1, 1].
#[inline]
pub fn to_pcm_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Renders whole files with its own [`Engine`], independent of live playback.
pub struct OfflineRenderer {
    sample_rate: u32,
    export: ExportConfig,
    engine: Engine,
    snapshot: Snapshot,
}

impl OfflineRenderer {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_engine(config, Engine::new(config))
    }

    /// Renderer whose noise sequence is reproducible.
    pub fn with_seed(config: &EngineConfig, seed: u64) -> Self {
        Self::with_engine(config, Engine::with_seed(config, seed))
    }

    fn with_engine(config: &EngineConfig, engine: Engine) -> Self {
        OfflineRenderer {
            sample_rate: config.sample_rate,
            export: config.export,
            engine,
            snapshot: Snapshot::default(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames `duration_secs` renders to.
    pub fn frames_for(&self, duration_secs: f64) -> Result<u64> {
        if !(duration_secs.is_finite() && duration_secs >= 0.0) {
            return Err(EngineError::InvalidSettings(format!(
                "duration must be a non-negative number of seconds, got {duration_secs}"
            )));
        }
        Ok((duration_secs * self.sample_rate as f64).round() as u64)
    }

    /// Render `duration_secs` of audio from `source`.
    ///
    /// `source` is read again before every chunk, so edits made while the
    /// render runs are picked up at the next chunk boundary. `progress`
    /// receives `(frames_done, frames_total)` after each chunk.
    pub fn render<S, F>(
        &mut self,
        source: &S,
        duration_secs: f64,
        cancel: &CancelToken,
        mut progress: F,
    ) -> Result<RenderedAudio>
    where
        S: TrackSource + ?Sized,
        F: FnMut(u64, u64),
    {
        let total = self.frames_for(duration_secs)?;
        let chunk = self.export.chunk_frames(self.sample_rate) as u64;
        if usize::try_from(total).is_err() {
            return Err(EngineError::InvalidSettings(format!(
                "duration of {duration_secs} s is too long"
            )));
        }

        info!(
            "rendering {duration_secs:.1} s ({total} frames) at {} Hz",
            self.sample_rate
        );
        self.engine.reset();
        let mut left = Vec::new();
        let mut right = Vec::new();
        let drive = self.export.soft_clip_drive;

        let mut done = 0u64;
        while done < total {
            if cancel.is_cancelled() {
                warn!("render cancelled after {done} of {total} frames");
                return Err(EngineError::Cancelled);
            }
            let frames = chunk.min(total - done) as usize;
            left.reserve(frames);
            right.reserve(frames);
            source.snapshot_into(&mut self.snapshot);
            let gain = self.snapshot.master_volume;
            let block = self.engine.render(&self.snapshot.tracks, done, frames);

            for (l, r) in block.left.iter().zip(&block.right) {
                let (mut l, mut r) = (l * gain, r * gain);
                if self.export.soft_clip {
                    l = soft_clip(l, drive);
                    r = soft_clip(r, drive);
                }
                left.push(l as f32);
                right.push(r as f32);
            }

            done += frames as u64;
            progress(done, total);
        }

        if self.export.normalize {
            let gain = normalize_peak(&mut [&mut left[..], &mut right[..]]);
            if gain < 1.0 {
                debug!("normalized by {gain:.4}");
            }
        }

        info!("render finished: {total} frames");
        Ok(RenderedAudio {
            sample_rate: self.sample_rate,
            left,
            right,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{BinauralParams, NoiseParams, Track, TrackKind, TrackList};

    fn config(sample_rate: u32) -> EngineConfig {
        EngineConfig {
            sample_rate,
            ..EngineConfig::default()
        }
    }

    fn two_tracks() -> TrackList {
        let mut list = TrackList::new();
        list.add(TrackKind::Binaural(BinauralParams::default()));
        list.add(TrackKind::Noise(NoiseParams::default()));
        list
    }

    #[test]
    fn wav_header_valid() {
        let audio = RenderedAudio {
            sample_rate: 44100,
            left: vec![0.0; 10],
            right: vec![0.0; 10],
        };
        let wav = audio.to_wav_bytes().unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 44100);
        let ch = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(ch, 2);
        let bits = u16::from_le_bytes([wav[34], wav[35]]);
        assert_eq!(bits, 16);
    }

    #[test]
    fn wav_size_correct() {
        let mut renderer = OfflineRenderer::with_seed(&config(22050), 3);
        let audio = renderer
            .render(&two_tracks(), 0.5, &CancelToken::new(), |_, _| {})
            .unwrap();
        let wav = audio.to_wav_bytes().unwrap();

        // 0.5 s at 22050 Hz = 11025 frames × 2 channels × 2 bytes
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 44100);
        assert_eq!(wav.len(), 44 + 44100);
    }

    #[test]
    fn progress_reported_per_chunk() {
        let mut cfg = config(8000);
        cfg.export.chunk_seconds = 0.25;
        let mut renderer = OfflineRenderer::with_seed(&cfg, 1);
        let mut calls = Vec::new();
        renderer
            .render(&two_tracks(), 0.6, &CancelToken::new(), |done, total| {
                calls.push((done, total))
            })
            .unwrap();
        assert_eq!(calls, vec![(2000, 4800), (4000, 4800), (4800, 4800)]);
    }

    #[test]
    fn output_is_bounded_and_not_silent() {
        let mut renderer = OfflineRenderer::with_seed(&config(22050), 9);
        let audio = renderer
            .render(&two_tracks(), 1.0, &CancelToken::new(), |_, _| {})
            .unwrap();
        assert_eq!(audio.frames(), 22050);
        assert!(audio.peak() <= 1.0);
        assert!(audio.peak() > 0.0);
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut renderer = OfflineRenderer::new(&config(8000));
        let result = renderer.render(&two_tracks(), 1.0, &cancel, |_, _| {});
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn rejects_bad_duration() {
        let mut renderer = OfflineRenderer::new(&config(8000));
        for d in [f64::NAN, -1.0, f64::INFINITY] {
            let result = renderer.render(&two_tracks(), d, &CancelToken::new(), |_, _| {});
            assert!(matches!(result, Err(EngineError::InvalidSettings(_))));
        }
    }

    #[test]
    fn empty_source_renders_silence() {
        let tracks: Vec<Track> = Vec::new();
        let mut renderer = OfflineRenderer::new(&config(8000));
        let audio = renderer
            .render(&tracks[..], 0.1, &CancelToken::new(), |_, _| {})
            .unwrap();
        assert_eq!(audio.frames(), 800);
        assert_eq!(audio.peak(), 0.0);
    }

    #[test]
    fn pcm_conversion_clamps() {
        assert_eq!(to_pcm_i16(0.0), 0);
        assert_eq!(to_pcm_i16(1.0), i16::MAX);
        assert_eq!(to_pcm_i16(4.0), i16::MAX);
        assert_eq!(to_pcm_i16(-4.0), -i16::MAX);
    }

    #[test]
    fn write_wav_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let audio = RenderedAudio {
            sample_rate: 8000,
            left: vec![0.25; 100],
            right: vec![-0.25; 100],
        };
        audio.write_wav(&path).unwrap();

        assert!(path.exists());
        assert!(!part_path(&path).exists());
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.len(), 200);
    }

    #[test]
    fn failed_write_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        let audio = RenderedAudio {
            sample_rate: 8000,
            left: vec![0.0; 4],
            right: vec![0.0; 4],
        };
        assert!(matches!(audio.write_wav(&path), Err(EngineError::Io(_))));
        assert!(!path.exists());
        assert!(!part_path(&path).exists());
    }
}
