//! Track model — the parameter set the engine renders from.
//!
//! Tracks are plain values. The control side edits a [`TrackList`], the
//! render side works on cloned snapshots of it and never holds a live handle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Stable identifier of a track. Never reused by the [`TrackList`] that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Auto-pan sweep direction.
///
/// `Alternate` produces the same envelope as `LeftToRight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanDirection {
    LeftToRight,
    RightToLeft,
    #[default]
    Alternate,
}

/// Stereo placement of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pan {
    Center,
    HardLeft,
    HardRight,
    AutoPan {
        direction: PanDirection,
        /// Sweep rate in Hz.
        speed: f64,
        /// Sweep excursion in [0, 1].
        depth: f64,
    },
}

impl Pan {
    pub const DEFAULT_SPEED: f64 = 0.5;
    pub const DEFAULT_DEPTH: f64 = 0.5;

    /// Auto-pan with the default sweep (alternate, 0.5 Hz, depth 0.5).
    pub fn auto() -> Self {
        Pan::AutoPan {
            direction: PanDirection::default(),
            speed: Self::DEFAULT_SPEED,
            depth: Self::DEFAULT_DEPTH,
        }
    }
}

impl Default for Pan {
    fn default() -> Self {
        Pan::Center
    }
}

/// Spectral colour of a noise track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseColor {
    #[default]
    White,
    Pink,
    Brown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinauralParams {
    /// Carrier frequency in Hz; the two ears sit half a beat either side.
    pub base_freq: f64,
    /// Beat frequency in Hz (difference between the ears).
    pub beat_freq: f64,
}

impl Default for BinauralParams {
    fn default() -> Self {
        Self {
            base_freq: 200.0,
            beat_freq: 7.83,
        }
    }
}

impl BinauralParams {
    /// Left and right oscillator frequencies.
    pub fn ear_frequencies(&self) -> (f64, f64) {
        let half = self.beat_freq / 2.0;
        (self.base_freq - half, self.base_freq + half)
    }
}

/// Isochronic amplitude pulsing of a tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsochronicParams {
    pub enabled: bool,
    /// Pulse rate in Hz.
    pub frequency: f64,
    /// Pulse depth in [0, 1]; 1 pulses fully to silence.
    pub depth: f64,
}

impl Default for IsochronicParams {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: 7.83,
            depth: 1.0,
        }
    }
}

/// Sinusoidal frequency sweep of a tone between two bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepParams {
    pub enabled: bool,
    pub min_freq: f64,
    pub max_freq: f64,
    /// Modulator rate in Hz.
    pub speed: f64,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            enabled: false,
            min_freq: 20.0,
            max_freq: 1000.0,
            speed: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    /// Fixed carrier frequency in Hz, used when the sweep is off.
    pub frequency: f64,
    pub isochronic: IsochronicParams,
    pub sweep: SweepParams,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            frequency: 432.0,
            isochronic: IsochronicParams::default(),
            sweep: SweepParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    pub color: NoiseColor,
    /// High-pass corner in Hz; active above 20 Hz.
    pub low_cut: f64,
    /// Low-pass corner in Hz; active below 20 kHz.
    pub high_cut: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            color: NoiseColor::White,
            low_cut: 20.0,
            high_cut: 20_000.0,
        }
    }
}

/// What a track generates, together with the generator's parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackKind {
    Binaural(BinauralParams),
    Tone(ToneParams),
    Noise(NoiseParams),
}

impl TrackKind {
    /// Lower-case kind name, as used in settings records and messages.
    pub fn name(&self) -> &'static str {
        match self {
            TrackKind::Binaural(_) => "binaural",
            TrackKind::Tone(_) => "tone",
            TrackKind::Noise(_) => "noise",
        }
    }

    fn same_variant(&self, other: &TrackKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A user-configured audio source.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: TrackId,
    kind: TrackKind,
    pub title: String,
    pub enabled: bool,
    volume: f64,
    pub pan: Pan,
}

impl Track {
    /// Build a track with default common settings. Ids are normally handed out
    /// by [`TrackList::add`].
    pub fn new(id: TrackId, kind: TrackKind) -> Self {
        let title = format!("{} {}", capitalize(kind.name()), id.0 + 1);
        Track {
            id,
            kind,
            title,
            enabled: true,
            volume: 1.0,
            pan: Pan::Center,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> &TrackKind {
        &self.kind
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set the track gain, clamped to [0, 1]. Non-finite input mutes.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Replace the generator parameters. The kind itself cannot change.
    pub fn set_params(&mut self, kind: TrackKind) -> Result<()> {
        if !self.kind.same_variant(&kind) {
            return Err(EngineError::KindMismatch {
                id: self.id,
                expected: self.kind.name(),
                found: kind.name(),
            });
        }
        self.kind = kind;
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered collection of tracks that hands out unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackList {
    tracks: Vec<Track>,
    next_id: u32,
}

impl TrackList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track of the given kind with default settings.
    pub fn add(&mut self, kind: TrackKind) -> TrackId {
        let id = self.allocate_id();
        self.tracks.push(Track::new(id, kind));
        id
    }

    /// Append a pre-configured track. Its id is replaced with a fresh one.
    pub fn add_track(&mut self, mut track: Track) -> TrackId {
        let id = self.allocate_id();
        track.id = id;
        self.tracks.push(track);
        id
    }

    fn allocate_id(&mut self) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn remove(&mut self, id: TrackId) -> Option<Track> {
        let index = self.tracks.iter().position(|t| t.id == id)?;
        Some(self.tracks.remove(index))
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Like [`get_mut`](Self::get_mut) but reports a missing id as an error.
    pub fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.get_mut(id).ok_or(EngineError::UnknownTrack(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn as_slice(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Remove every track. Ids already issued stay retired.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

/// Value copy of everything a render context reads for one block.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tracks: Vec<Track>,
    /// Output gain applied after limiting, in [0, 1].
    pub master_volume: f64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            master_volume: 1.0,
        }
    }
}

/// Anything a renderer can pull track snapshots from.
pub trait TrackSource {
    /// Overwrite `snapshot` with the current state, reusing its allocation.
    fn snapshot_into(&self, snapshot: &mut Snapshot);

    /// Non-blocking variant. Returns `false` and leaves `snapshot` untouched
    /// when the source is busy.
    fn try_snapshot_into(&self, snapshot: &mut Snapshot) -> bool {
        self.snapshot_into(snapshot);
        true
    }
}

impl TrackSource for [Track] {
    fn snapshot_into(&self, snapshot: &mut Snapshot) {
        snapshot.tracks.clear();
        snapshot.tracks.extend_from_slice(self);
        snapshot.master_volume = 1.0;
    }
}

impl TrackSource for Vec<Track> {
    fn snapshot_into(&self, snapshot: &mut Snapshot) {
        self.as_slice().snapshot_into(snapshot);
    }
}

impl TrackSource for TrackList {
    fn snapshot_into(&self, snapshot: &mut Snapshot) {
        self.as_slice().snapshot_into(snapshot);
    }
}

impl TrackSource for Snapshot {
    fn snapshot_into(&self, snapshot: &mut Snapshot) {
        snapshot.clone_from(self);
    }
}
