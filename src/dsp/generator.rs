//! Generators — turn a track's parameters into a stereo block.
//!
//! [`generate`] is the single dispatch point over [`TrackKind`]. Each track
//! carries a [`TrackState`] holding the oscillators (and their phase) or the
//! noise filters that must survive between blocks.

use rand::Rng;

use crate::error::GenerationError;
use crate::track::{BinauralParams, NoiseParams, Track, TrackKind, ToneParams};

use super::StereoBlock;
use super::noise::NoiseSource;
use super::oscillator::Oscillator;

/// Render-side state of one track.
#[derive(Debug, Clone)]
pub enum TrackState {
    Binaural {
        left: Oscillator,
        right: Oscillator,
    },
    Tone {
        carrier: Oscillator,
        /// Drives the frequency sweep.
        modulator: Oscillator,
        /// Drives the isochronic envelope.
        pulse: Oscillator,
    },
    Noise(NoiseSource),
}

impl TrackState {
    /// Fresh state (phase 0) matching the track kind.
    pub fn new(kind: &TrackKind, sample_rate: f64) -> Self {
        match kind {
            TrackKind::Binaural(_) => TrackState::Binaural {
                left: Oscillator::new(),
                right: Oscillator::new(),
            },
            TrackKind::Tone(_) => TrackState::Tone {
                carrier: Oscillator::new(),
                modulator: Oscillator::new(),
                pulse: Oscillator::new(),
            },
            TrackKind::Noise(params) => TrackState::Noise(NoiseSource::new(*params, sample_rate)),
        }
    }

    fn matches(&self, kind: &TrackKind) -> bool {
        matches!(
            (self, kind),
            (TrackState::Binaural { .. }, TrackKind::Binaural(_))
                | (TrackState::Tone { .. }, TrackKind::Tone(_))
                | (TrackState::Noise(_), TrackKind::Noise(_))
        )
    }

    /// Freeze the oscillators while the track is disabled: the next render
    /// resumes from the stored phase instead of bridging the skipped time.
    pub fn hold(&mut self) {
        match self {
            TrackState::Binaural { left, right } => {
                left.hold();
                right.hold();
            }
            TrackState::Tone {
                carrier,
                modulator,
                pulse,
            } => {
                carrier.hold();
                modulator.hold();
                pulse.hold();
            }
            TrackState::Noise(_) => {}
        }
    }
}

/// Reusable per-engine work buffers.
#[derive(Debug, Clone, Default)]
pub struct Scratch {
    a: Vec<f64>,
    b: Vec<f64>,
}

impl Scratch {
    fn prepare(&mut self, frames: usize) {
        self.a.resize(frames, 0.0);
        self.b.resize(frames, 0.0);
    }
}

/// Timing of one render call.
#[derive(Debug, Clone, Copy)]
pub struct BlockClock {
    /// Sample index of the first frame.
    pub start: u64,
    pub frames: usize,
    pub sample_rate: f64,
}

impl BlockClock {
    pub fn dt(&self) -> f64 {
        1.0 / self.sample_rate
    }
}

/// Render `track` into `out` (resized to `clock.frames`), before panning.
pub fn generate<R: Rng + ?Sized>(
    track: &Track,
    state: &mut TrackState,
    clock: BlockClock,
    rng: &mut R,
    scratch: &mut Scratch,
    out: &mut StereoBlock,
) -> Result<(), GenerationError> {
    if !state.matches(track.kind()) {
        *state = TrackState::new(track.kind(), clock.sample_rate);
    }
    out.clear(clock.frames);
    scratch.prepare(clock.frames);

    match (track.kind(), state) {
        (TrackKind::Binaural(params), TrackState::Binaural { left, right }) => {
            binaural(params, left, right, clock, out);
        }
        (
            TrackKind::Tone(params),
            TrackState::Tone {
                carrier,
                modulator,
                pulse,
            },
        ) => {
            tone(params, carrier, modulator, pulse, clock, scratch);
            out.fill_mono(&scratch.a);
        }
        (TrackKind::Noise(params), TrackState::Noise(source)) => {
            noise(params, source, rng, &mut scratch.a);
            out.fill_mono(&scratch.a);
        }
        // State was rebuilt for the kind above; leave the block silent.
        _ => {}
    }

    if out.is_finite() {
        Ok(())
    } else {
        Err(GenerationError::NonFinite { track: track.id() })
    }
}

fn binaural(
    params: &BinauralParams,
    left: &mut Oscillator,
    right: &mut Oscillator,
    clock: BlockClock,
    out: &mut StereoBlock,
) {
    let (fl, fr) = params.ear_frequencies();
    left.render(clock.start, fl, clock.dt(), &mut out.left);
    right.render(clock.start, fr, clock.dt(), &mut out.right);
}

/// Mono tone into `scratch.a`.
fn tone(
    params: &ToneParams,
    carrier: &mut Oscillator,
    modulator: &mut Oscillator,
    pulse: &mut Oscillator,
    clock: BlockClock,
    scratch: &mut Scratch,
) {
    let dt = clock.dt();
    let Scratch { a: signal, b: work } = scratch;

    if params.sweep.enabled {
        let sweep = &params.sweep;
        let (lo, hi) = if sweep.min_freq <= sweep.max_freq {
            (sweep.min_freq, sweep.max_freq)
        } else {
            (sweep.max_freq, sweep.min_freq)
        };
        // work: modulator sine → instantaneous carrier frequency
        modulator.render(clock.start, sweep.speed, dt, work);
        for f in work.iter_mut() {
            *f = lo + (hi - lo) * (1.0 + *f) / 2.0;
        }
        carrier.render_modulated(clock.start, &work[..], dt, signal);
    } else {
        carrier.render(clock.start, params.frequency, dt, signal);
    }

    if params.isochronic.enabled {
        let iso = &params.isochronic;
        let depth = if iso.depth.is_finite() { iso.depth.clamp(0.0, 1.0) } else { 0.0 };
        pulse.render(clock.start, iso.frequency, dt, work);
        for (s, p) in signal.iter_mut().zip(work.iter()) {
            *s *= 1.0 - depth * p * p;
        }
    }
}

fn noise<R: Rng + ?Sized>(params: &NoiseParams, source: &mut NoiseSource, rng: &mut R, out: &mut [f64]) {
    source.configure(*params);
    source.render(rng, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{IsochronicParams, NoiseColor, SweepParams, TrackId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::PI;

    const SR: f64 = 44100.0;

    fn clock(start: u64, frames: usize) -> BlockClock {
        BlockClock {
            start,
            frames,
            sample_rate: SR,
        }
    }

    fn run(track: &Track, state: &mut TrackState, start: u64, frames: usize) -> StereoBlock {
        let mut rng = StdRng::seed_from_u64(1);
        let mut scratch = Scratch::default();
        let mut out = StereoBlock::default();
        generate(track, state, clock(start, frames), &mut rng, &mut scratch, &mut out).unwrap();
        out
    }

    #[test]
    fn binaural_one_second_matches_ear_sines() {
        let track = Track::new(
            TrackId(0),
            TrackKind::Binaural(BinauralParams {
                base_freq: 200.0,
                beat_freq: 10.0,
            }),
        );
        let mut state = TrackState::new(track.kind(), SR);
        let out = run(&track, &mut state, 0, 44100);

        assert_eq!(out.len(), 44100);
        for i in 0..44100 {
            let t = i as f64 / SR;
            assert!((out.left[i] - (2.0 * PI * 195.0 * t).sin()).abs() < 1e-7, "left {i}");
            assert!((out.right[i] - (2.0 * PI * 205.0 * t).sin()).abs() < 1e-7, "right {i}");
        }
    }

    #[test]
    fn tone_is_mono_and_continuous() {
        let track = Track::new(TrackId(1), TrackKind::Tone(ToneParams::default()));

        let mut whole_state = TrackState::new(track.kind(), SR);
        let whole = run(&track, &mut whole_state, 0, 2048);

        let mut state = TrackState::new(track.kind(), SR);
        let a = run(&track, &mut state, 0, 1024);
        let b = run(&track, &mut state, 1024, 1024);

        assert_eq!(whole.left, whole.right);
        for (i, s) in a.left.iter().chain(&b.left).enumerate() {
            assert!((s - whole.left[i]).abs() < 1e-9, "sample {i}");
        }
    }

    #[test]
    fn isochronic_envelope_shapes_tone() {
        let params = ToneParams {
            frequency: 440.0,
            isochronic: IsochronicParams {
                enabled: true,
                frequency: 10.0,
                depth: 1.0,
            },
            sweep: SweepParams::default(),
        };
        let track = Track::new(TrackId(2), TrackKind::Tone(params));
        let mut state = TrackState::new(track.kind(), SR);
        let out = run(&track, &mut state, 0, 4410);

        for (i, &s) in out.left.iter().enumerate() {
            let t = i as f64 / SR;
            let env = 1.0 - (2.0 * PI * 10.0 * t).sin().powi(2);
            let expected = (2.0 * PI * 440.0 * t).sin() * env;
            assert!((s - expected).abs() < 1e-8, "sample {i}");
        }
        // Full depth pulses to silence a quarter period in.
        assert!(out.left[1102].abs() < 1e-3);
    }

    #[test]
    fn sweep_stays_within_bounds() {
        let params = ToneParams {
            sweep: SweepParams {
                enabled: true,
                min_freq: 100.0,
                max_freq: 300.0,
                speed: 2.0,
            },
            ..ToneParams::default()
        };
        let track = Track::new(TrackId(3), TrackKind::Tone(params));
        let mut state = TrackState::new(track.kind(), SR);
        let _ = run(&track, &mut state, 0, 44100);

        let TrackState::Tone { carrier, modulator, .. } = &state else {
            panic!("wrong state");
        };
        let f = carrier.state().last_freq();
        assert!((100.0..=300.0).contains(&f), "carrier at {f}");
        assert_eq!(modulator.state().last_freq(), 2.0);
        // After exactly two modulator periods the sweep is back at its midpoint.
        assert!((f - 200.0).abs() < 0.1, "carrier at {f}");
    }

    #[test]
    fn noise_is_duplicated_to_both_channels() {
        let track = Track::new(
            TrackId(4),
            TrackKind::Noise(NoiseParams {
                color: NoiseColor::Pink,
                ..NoiseParams::default()
            }),
        );
        let mut state = TrackState::new(track.kind(), SR);
        let out = run(&track, &mut state, 0, 512);
        assert_eq!(out.left, out.right);
        assert!(out.left.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn hold_resumes_without_bridging() {
        let track = Track::new(TrackId(5), TrackKind::Binaural(BinauralParams::default()));
        let mut state = TrackState::new(track.kind(), SR);
        let first = run(&track, &mut state, 0, 100);
        let TrackState::Binaural { left, .. } = &state else {
            panic!("wrong state");
        };
        let stored = left.state().phase();
        state.hold();

        let later = run(&track, &mut state, 50_000, 100);
        assert!((later.left[0] - stored.sin()).abs() < 1e-12);
        assert_ne!(first.left[0], later.left[0]);
    }
}
