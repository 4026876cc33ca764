//! Live control and rendering.
//!
//! [`Session`] is the shared handle the control side edits. The audio side
//! owns a [`RealtimeRenderer`] that pulls blocks on demand and reads the
//! session with `try_lock`, falling back to its previous snapshot when a
//! control edit holds the lock. [`ExportJob`] runs an offline render of the
//! same session on a worker thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use log::{debug, info};
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::dsp::engine::Engine;
use crate::dsp::renderer::{CancelToken, OfflineRenderer};
use crate::error::{EngineError, Result};
use crate::track::{Pan, Snapshot, Track, TrackId, TrackKind, TrackList, TrackSource};

/// Everything the control side can change.
#[derive(Debug, Clone, PartialEq)]
pub struct MixState {
    pub tracks: TrackList,
    /// Output gain applied after limiting, in [0, 1].
    pub master_volume: f64,
}

impl Default for MixState {
    fn default() -> Self {
        Self {
            tracks: TrackList::new(),
            master_volume: 1.0,
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Cloneable control handle shared between the UI and the renderers.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<Mutex<MixState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(mut state: MixState) -> Self {
        state.master_volume = clamp_unit(state.master_volume);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Add a track of `kind` with default settings.
    pub fn add_track(&self, kind: TrackKind) -> TrackId {
        let id = self.state.lock().tracks.add(kind);
        debug!("added track {id}");
        id
    }

    pub fn remove_track(&self, id: TrackId) -> Result<Track> {
        let track = self
            .state
            .lock()
            .tracks
            .remove(id)
            .ok_or(EngineError::UnknownTrack(id))?;
        debug!("removed track {id}");
        Ok(track)
    }

    /// Apply `edit` to one track under the lock.
    pub fn update<F>(&self, id: TrackId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Track) -> Result<()>,
    {
        let mut state = self.state.lock();
        edit(state.tracks.track_mut(id)?)
    }

    pub fn set_enabled(&self, id: TrackId, enabled: bool) -> Result<()> {
        self.update(id, |t| {
            t.enabled = enabled;
            Ok(())
        })
    }

    pub fn set_volume(&self, id: TrackId, volume: f64) -> Result<()> {
        self.update(id, |t| {
            t.set_volume(volume);
            Ok(())
        })
    }

    pub fn set_pan(&self, id: TrackId, pan: Pan) -> Result<()> {
        self.update(id, |t| {
            t.pan = pan;
            Ok(())
        })
    }

    /// Replace the kind-specific parameters. The kind itself cannot change.
    pub fn set_params(&self, id: TrackId, kind: TrackKind) -> Result<()> {
        self.update(id, |t| t.set_params(kind))
    }

    pub fn set_title(&self, id: TrackId, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.update(id, |t| {
            t.title = title;
            Ok(())
        })
    }

    pub fn master_volume(&self) -> f64 {
        self.state.lock().master_volume
    }

    pub fn set_master_volume(&self, volume: f64) {
        self.state.lock().master_volume = clamp_unit(volume);
    }

    /// Copy of the current track list.
    pub fn tracks(&self) -> TrackList {
        self.state.lock().tracks.clone()
    }

    /// Swap in a new set of tracks, in order. Each one is issued a fresh id
    /// from this session; returns the new ids.
    pub fn replace_tracks(&self, tracks: TrackList) -> Vec<TrackId> {
        let mut state = self.state.lock();
        state.tracks.clear();
        let ids: Vec<TrackId> = tracks
            .iter()
            .map(|track| state.tracks.add_track(track.clone()))
            .collect();
        drop(state);
        debug!("replaced tracks, now {}", ids.len());
        ids
    }

    /// Copy of the whole mix state.
    pub fn state(&self) -> MixState {
        self.state.lock().clone()
    }
}

fn fill_snapshot(state: &MixState, snapshot: &mut Snapshot) {
    snapshot.tracks.clear();
    snapshot.tracks.extend_from_slice(state.tracks.as_slice());
    snapshot.master_volume = state.master_volume;
}

impl TrackSource for Session {
    fn snapshot_into(&self, snapshot: &mut Snapshot) {
        fill_snapshot(&self.state.lock(), snapshot);
    }

    fn try_snapshot_into(&self, snapshot: &mut Snapshot) -> bool {
        match self.state.try_lock() {
            Some(state) => {
                fill_snapshot(&state, snapshot);
                true
            }
            None => false,
        }
    }
}

/// Pull-model renderer for an audio callback.
///
/// Every pull fills the whole buffer. The sample counter runs continuously
/// from the first pull until [`stop`](Self::stop).
pub struct RealtimeRenderer<S: TrackSource = Session> {
    source: S,
    engine: Engine,
    snapshot: Snapshot,
    position: u64,
    block_size: usize,
}

impl<S: TrackSource> RealtimeRenderer<S> {
    pub fn new(source: S, config: &EngineConfig) -> Self {
        Self::with_engine(source, config, Engine::new(config))
    }

    pub fn with_seed(source: S, config: &EngineConfig, seed: u64) -> Self {
        Self::with_engine(source, config, Engine::with_seed(config, seed))
    }

    fn with_engine(source: S, config: &EngineConfig, engine: Engine) -> Self {
        Self {
            source,
            engine,
            snapshot: Snapshot::default(),
            position: 0,
            block_size: config.block_size.max(1),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Sample index of the next frame to be rendered.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn sample_rate(&self) -> f64 {
        self.engine.sample_rate()
    }

    /// Discard all phase state and rewind the sample counter.
    pub fn stop(&mut self) {
        self.engine.reset();
        self.position = 0;
    }

    fn refresh(&mut self) {
        // Contended: keep rendering the previous snapshot.
        let _ = self.source.try_snapshot_into(&mut self.snapshot);
    }

    /// Fill `out` with interleaved stereo frames in [-1, 1].
    /// A trailing odd sample is zeroed.
    pub fn pull_interleaved(&mut self, out: &mut [f32]) {
        self.refresh();
        let frames = out.len() / 2;
        let gain = self.snapshot.master_volume;

        let mut offset = 0;
        while offset < frames {
            let n = (frames - offset).min(self.block_size);
            let block = self.engine.render(&self.snapshot.tracks, self.position, n);
            block.write_interleaved(gain, &mut out[offset * 2..(offset + n) * 2]);
            self.position += n as u64;
            offset += n;
        }
        out[frames * 2..].fill(0.0);
    }

    /// Fill planar channel buffers. Renders `min(left.len(), right.len())`
    /// frames and zeroes whatever is left of the longer buffer.
    pub fn pull_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.refresh();
        let frames = left.len().min(right.len());
        let gain = self.snapshot.master_volume;

        let mut offset = 0;
        while offset < frames {
            let n = (frames - offset).min(self.block_size);
            let block = self.engine.render(&self.snapshot.tracks, self.position, n);
            for i in 0..n {
                left[offset + i] = (block.left[i] * gain).clamp(-1.0, 1.0) as f32;
                right[offset + i] = (block.right[i] * gain).clamp(-1.0, 1.0) as f32;
            }
            self.position += n as u64;
            offset += n;
        }
        left[frames..].fill(0.0);
        right[frames..].fill(0.0);
    }
}

/// An offline render to a WAV file running on its own thread.
pub struct ExportJob {
    cancel: CancelToken,
    done: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
    handle: JoinHandle<Result<PathBuf>>,
}

impl ExportJob {
    /// Start rendering `duration_secs` from `source` into `path`.
    ///
    /// Nothing is written unless the render completes.
    pub fn spawn<S>(source: S, config: EngineConfig, duration_secs: f64, path: PathBuf) -> Result<Self>
    where
        S: TrackSource + Send + 'static,
    {
        config.validate()?;
        let cancel = CancelToken::new();
        let done = Arc::new(AtomicU64::new(0));
        let total = Arc::new(AtomicU64::new(0));

        let handle = {
            let cancel = cancel.clone();
            let done = Arc::clone(&done);
            let total = Arc::clone(&total);
            thread::Builder::new()
                .name("binaural-export".into())
                .spawn(move || -> Result<PathBuf> {
                    let mut renderer = OfflineRenderer::new(&config);
                    let audio = renderer.render(&source, duration_secs, &cancel, |d, t| {
                        done.store(d, Ordering::Relaxed);
                        total.store(t, Ordering::Relaxed);
                    })?;
                    audio.write_wav(&path)?;
                    info!("export complete: {}", path.display());
                    Ok(path)
                })?
        };

        Ok(Self {
            cancel,
            done,
            total,
            handle,
        })
    }

    /// Ask the worker to stop at the next chunk boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn frames_done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn frames_total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Progress (0.0 - 1.0)
    pub fn progress(&self) -> f64 {
        let total = self.frames_total();
        if total == 0 {
            0.0
        } else {
            self.frames_done() as f64 / total as f64
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return the written path.
    pub fn join(self) -> Result<PathBuf> {
        self.handle.join().map_err(|_| EngineError::WorkerPanicked)?
    }
}
