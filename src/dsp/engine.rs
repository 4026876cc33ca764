//! Audio Engine — renders a track snapshot into limited stereo blocks.
//!
//! An [`Engine`] is one render context: it owns the per-track phase state,
//! the noise RNG and the mix buffers. The live renderer and the offline
//! exporter each build their own, so neither can disturb the other's
//! continuity.

use std::collections::HashMap;

use log::warn;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::EngineConfig;
use crate::error::GenerationError;
use crate::track::{Track, TrackId};

use super::StereoBlock;
use super::generator::{BlockClock, Scratch, TrackState, generate};
use super::mixer::Mixer;
use super::panner::pan;

/// The audio rendering engine.
pub struct Engine {
    sample_rate: f64,
    states: HashMap<TrackId, TrackState>,
    mixer: Mixer,
    scratch: Scratch,
    track_block: StereoBlock,
    rng: StdRng,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Engine with a deterministic noise sequence.
    pub fn with_seed(config: &EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &EngineConfig, rng: StdRng) -> Self {
        Engine {
            sample_rate: config.sample_rate as f64,
            states: HashMap::new(),
            mixer: Mixer::from_config(config),
            scratch: Scratch::default(),
            track_block: StereoBlock::default(),
            rng,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Render state of a track, if it has been rendered since the last reset.
    pub fn track_state(&self, id: TrackId) -> Option<&TrackState> {
        self.states.get(&id)
    }

    /// Number of tracks currently holding render state.
    pub fn active_tracks(&self) -> usize {
        self.states.len()
    }

    /// Drop all phase and filter state.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Render `[start, start + frames)` from `tracks`.
    ///
    /// A generation fault anywhere in the block yields silence for the whole
    /// block; the faulting track restarts from fresh state next time.
    pub fn render(&mut self, tracks: &[Track], start: u64, frames: usize) -> &StereoBlock {
        if let Err(err) = self.mix(tracks, start, frames) {
            warn!("{err}; substituting silence for {frames} frames at sample {start}");
            self.mixer.clear(frames);
        }
        self.mixer.output()
    }

    /// Like [`render`](Self::render) but reports generation faults.
    pub fn try_render(
        &mut self,
        tracks: &[Track],
        start: u64,
        frames: usize,
    ) -> Result<&StereoBlock, GenerationError> {
        self.mix(tracks, start, frames)?;
        Ok(self.mixer.output())
    }

    fn mix(&mut self, tracks: &[Track], start: u64, frames: usize) -> Result<(), GenerationError> {
        self.prune(tracks);
        self.mixer.clear(frames);
        let clock = BlockClock {
            start,
            frames,
            sample_rate: self.sample_rate,
        };

        for track in tracks {
            if !track.enabled {
                if let Some(state) = self.states.get_mut(&track.id()) {
                    state.hold();
                }
                continue;
            }

            let sample_rate = self.sample_rate;
            let state = self
                .states
                .entry(track.id())
                .or_insert_with(|| TrackState::new(track.kind(), sample_rate));

            if let Err(err) = generate(
                track,
                state,
                clock,
                &mut self.rng,
                &mut self.scratch,
                &mut self.track_block,
            ) {
                self.states.remove(&track.id());
                return Err(err);
            }
            pan(&mut self.track_block, start, self.sample_rate, &track.pan);
            self.mixer.add(&self.track_block, track.volume());
        }

        self.mixer.limit();
        Ok(())
    }

    /// Forget state for tracks that left the snapshot.
    fn prune(&mut self, tracks: &[Track]) {
        self.states.retain(|id, _| tracks.iter().any(|t| t.id() == *id));
    }
}
