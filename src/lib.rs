pub mod config;
pub mod dsp;
pub mod error;
#[cfg(feature = "playback")]
pub mod playback;
pub mod realtime;
pub mod settings;
pub mod track;

pub use crate::config::EngineConfig;
pub use crate::dsp::StereoBlock;
pub use crate::dsp::engine::Engine;
pub use crate::dsp::renderer::{CancelToken, OfflineRenderer, RenderedAudio};
pub use crate::error::{EngineError, GenerationError, Result};
pub use crate::realtime::{ExportJob, MixState, RealtimeRenderer, Session};
pub use crate::settings::Settings;
pub use crate::track::{Pan, PanDirection, Snapshot, Track, TrackId, TrackKind, TrackList, TrackSource};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the binaural_core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Render a settings record for its stored duration.
pub fn render_settings(settings: &Settings, sample_rate: u32) -> Result<RenderedAudio> {
    let config = EngineConfig {
        sample_rate,
        ..EngineConfig::default()
    };
    config.validate()?;
    let session = settings.to_session();
    OfflineRenderer::new(&config).render(&session, settings.duration, &CancelToken::new(), |_, _| {})
}

fn js_err(e: EngineError) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: render settings JSON to a 16-bit stereo WAV byte array.
#[wasm_bindgen]
pub fn render_settings_wav(json: &str, sample_rate: u32) -> std::result::Result<Vec<u8>, JsValue> {
    let settings = Settings::from_json(json).map_err(js_err)?;
    let audio = render_settings(&settings, sample_rate).map_err(js_err)?;
    audio.to_wav_bytes().map_err(js_err)
}

/// WASM-exposed: render settings JSON to interleaved stereo f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_settings_samples(json: &str, sample_rate: u32) -> std::result::Result<Vec<f32>, JsValue> {
    let settings = Settings::from_json(json).map_err(js_err)?;
    let audio = render_settings(&settings, sample_rate).map_err(js_err)?;
    Ok(audio.interleaved())
}

/// WASM-exposed: parse settings JSON and return it with every default filled in.
#[wasm_bindgen]
pub fn normalize_settings(json: &str) -> std::result::Result<JsValue, JsValue> {
    let settings = Settings::from_json(json).map_err(js_err)?;
    let tracks = settings.to_track_list();
    let normalized = Settings::from_tracks(tracks.iter(), settings.volume, settings.duration);
    serde_wasm_bindgen::to_value(&normalized).map_err(|e| JsValue::from_str(&format!("{e}")))
}
