//! Persisted settings — the flat JSON record a front-end saves and restores.
//!
//! ```json
//! {
//!   "volume": 0.5,
//!   "duration": 180,
//!   "tracks": [
//!     { "type": "binaural", "title": "Binaural 1", "enabled": true,
//!       "volume": 1.0, "pan_mode": "center",
//!       "base_freq": 200.0, "beat_freq": 7.83 }
//!   ]
//! }
//! ```
//!
//! Kind-specific fields appear only on tracks of that kind, pan sweep fields
//! only when `pan_mode` is `auto-pan`. Missing fields take the track
//! defaults. The engine never reads this format; it renders the
//! [`TrackList`] produced by [`Settings::to_track_list`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::realtime::{MixState, Session};
use crate::track::{
    BinauralParams, IsochronicParams, NoiseColor, NoiseParams, Pan, PanDirection, SweepParams, ToneParams, Track,
    TrackId, TrackKind, TrackList,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Binaural,
    Tone,
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanMode {
    #[default]
    Center,
    HardLeft,
    HardRight,
    AutoPan,
}

fn default_true() -> bool {
    true
}

fn default_track_volume() -> f64 {
    1.0
}

/// One track as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    #[serde(rename = "type")]
    pub track_type: TrackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_track_volume")]
    pub volume: f64,
    #[serde(default)]
    pub pan_mode: PanMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_direction: Option<PanDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_depth: Option<f64>,

    // binaural
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat_freq: Option<f64>,

    // noise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_type: Option<NoiseColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_cut: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_cut: Option<f64>,

    // tone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_speed: Option<f64>,
}

impl TrackRecord {
    fn empty(track_type: TrackType) -> Self {
        TrackRecord {
            track_type,
            title: None,
            enabled: true,
            volume: 1.0,
            pan_mode: PanMode::Center,
            pan_direction: None,
            pan_speed: None,
            pan_depth: None,
            base_freq: None,
            beat_freq: None,
            noise_type: None,
            low_cut: None,
            high_cut: None,
            frequency: None,
            iso_enabled: None,
            iso_freq: None,
            iso_depth: None,
            mod_enabled: None,
            min_freq: None,
            max_freq: None,
            mod_speed: None,
        }
    }

    pub fn from_track(track: &Track) -> Self {
        let mut record = match track.kind() {
            TrackKind::Binaural(p) => TrackRecord {
                base_freq: Some(p.base_freq),
                beat_freq: Some(p.beat_freq),
                ..Self::empty(TrackType::Binaural)
            },
            TrackKind::Noise(p) => TrackRecord {
                noise_type: Some(p.color),
                low_cut: Some(p.low_cut),
                high_cut: Some(p.high_cut),
                ..Self::empty(TrackType::Noise)
            },
            TrackKind::Tone(p) => TrackRecord {
                frequency: Some(p.frequency),
                iso_enabled: Some(p.isochronic.enabled),
                iso_freq: Some(p.isochronic.frequency),
                iso_depth: Some(p.isochronic.depth),
                mod_enabled: Some(p.sweep.enabled),
                min_freq: Some(p.sweep.min_freq),
                max_freq: Some(p.sweep.max_freq),
                mod_speed: Some(p.sweep.speed),
                ..Self::empty(TrackType::Tone)
            },
        };

        record.title = Some(track.title.clone());
        record.enabled = track.enabled;
        record.volume = track.volume();
        record.pan_mode = match track.pan {
            Pan::Center => PanMode::Center,
            Pan::HardLeft => PanMode::HardLeft,
            Pan::HardRight => PanMode::HardRight,
            Pan::AutoPan {
                direction,
                speed,
                depth,
            } => {
                record.pan_direction = Some(direction);
                record.pan_speed = Some(speed);
                record.pan_depth = Some(depth);
                PanMode::AutoPan
            }
        };
        record
    }

    /// Generator parameters, with defaults for missing fields.
    pub fn kind(&self) -> TrackKind {
        match self.track_type {
            TrackType::Binaural => {
                let d = BinauralParams::default();
                TrackKind::Binaural(BinauralParams {
                    base_freq: self.base_freq.unwrap_or(d.base_freq),
                    beat_freq: self.beat_freq.unwrap_or(d.beat_freq),
                })
            }
            TrackType::Noise => {
                let d = NoiseParams::default();
                TrackKind::Noise(NoiseParams {
                    color: self.noise_type.unwrap_or(d.color),
                    low_cut: self.low_cut.unwrap_or(d.low_cut),
                    high_cut: self.high_cut.unwrap_or(d.high_cut),
                })
            }
            TrackType::Tone => {
                let d = ToneParams::default();
                TrackKind::Tone(ToneParams {
                    frequency: self.frequency.unwrap_or(d.frequency),
                    isochronic: IsochronicParams {
                        enabled: self.iso_enabled.unwrap_or(d.isochronic.enabled),
                        frequency: self.iso_freq.unwrap_or(d.isochronic.frequency),
                        depth: self.iso_depth.unwrap_or(d.isochronic.depth),
                    },
                    sweep: SweepParams {
                        enabled: self.mod_enabled.unwrap_or(d.sweep.enabled),
                        min_freq: self.min_freq.unwrap_or(d.sweep.min_freq),
                        max_freq: self.max_freq.unwrap_or(d.sweep.max_freq),
                        speed: self.mod_speed.unwrap_or(d.sweep.speed),
                    },
                })
            }
        }
    }

    pub fn pan(&self) -> Pan {
        match self.pan_mode {
            PanMode::Center => Pan::Center,
            PanMode::HardLeft => Pan::HardLeft,
            PanMode::HardRight => Pan::HardRight,
            PanMode::AutoPan => Pan::AutoPan {
                direction: self.pan_direction.unwrap_or_default(),
                speed: self.pan_speed.unwrap_or(Pan::DEFAULT_SPEED),
                depth: self.pan_depth.unwrap_or(Pan::DEFAULT_DEPTH),
            },
        }
    }

    /// Build the track. `id` only seeds the default title; [`TrackList`]
    /// assigns the final id.
    pub fn to_track(&self, id: TrackId) -> Track {
        let mut track = Track::new(id, self.kind());
        if let Some(title) = &self.title {
            track.title = title.clone();
        }
        track.enabled = self.enabled;
        track.set_volume(self.volume);
        track.pan = self.pan();
        track
    }
}

fn default_master_volume() -> f64 {
    0.5
}

fn default_duration() -> f64 {
    180.0
}

/// The whole saved session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Master volume in [0, 1].
    #[serde(default = "default_master_volume")]
    pub volume: f64,
    /// Export length in seconds.
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub tracks: Vec<TrackRecord>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: default_master_volume(),
            duration: default_duration(),
            tracks: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Pretty-printed with two-space indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(EngineError::InvalidSettings(format!(
                "duration must be a non-negative number of seconds, got {}",
                self.duration
            )));
        }
        if !self.volume.is_finite() {
            return Err(EngineError::InvalidSettings("volume must be a number".into()));
        }
        Ok(())
    }

    pub fn from_tracks<'a>(tracks: impl IntoIterator<Item = &'a Track>, volume: f64, duration: f64) -> Self {
        Settings {
            volume,
            duration,
            tracks: tracks.into_iter().map(TrackRecord::from_track).collect(),
        }
    }

    pub fn to_track_list(&self) -> TrackList {
        let mut list = TrackList::new();
        for (i, record) in self.tracks.iter().enumerate() {
            list.add_track(record.to_track(TrackId(i as u32)));
        }
        list
    }

    /// A live session holding these tracks at this master volume.
    pub fn to_session(&self) -> Session {
        Session::from_state(MixState {
            tracks: self.to_track_list(),
            master_volume: self.volume,
        })
    }
}
