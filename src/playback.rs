//! Live output to the default audio device using cpal.
//!
//! The stream callback owns a [`RealtimeRenderer`] and pulls straight into
//! the device buffer; there is no intermediate ring buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error};

use crate::config::EngineConfig;
use crate::dsp::renderer::to_pcm_i16;
use crate::error::{EngineError, Result};
use crate::realtime::{RealtimeRenderer, Session};

/// A running output stream. Dropping it (or calling [`stop`](Self::stop))
/// ends playback and discards the renderer's phase state.
pub struct AudioOutput {
    stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Open the default output device and start playing `session`.
    ///
    /// The device's own sample rate overrides `config.sample_rate`.
    pub fn start(session: Session, config: &EngineConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Device("No audio output device available".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| EngineError::Device(format!("Failed to get default output config: {e}")))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let engine_config = EngineConfig {
            sample_rate,
            ..config.clone()
        };
        engine_config.validate()?;

        let mut renderer = RealtimeRenderer::new(session, &engine_config);
        let mut stereo: Vec<f32> = Vec::with_capacity(engine_config.block_size * 2);
        let stream_config: cpal::StreamConfig = supported.config();

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if channels == 2 {
                        renderer.pull_interleaved(data);
                    } else {
                        stereo.resize(data.len() / channels as usize * 2, 0.0);
                        renderer.pull_interleaved(&mut stereo);
                        spread_frames(&stereo, data, channels as usize, |s| s, 0.0);
                    }
                },
                |err| error!("Audio stream error: {err}"),
                None,
            ),
            cpal::SampleFormat::I16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    stereo.resize(data.len() / channels as usize * 2, 0.0);
                    renderer.pull_interleaved(&mut stereo);
                    spread_frames(&stereo, data, channels as usize, to_pcm_i16, 0);
                },
                |err| error!("Audio stream error: {err}"),
                None,
            ),
            other => {
                return Err(EngineError::Device(format!("Unsupported sample format: {other:?}")));
            }
        }
        .map_err(|e| EngineError::Device(format!("Failed to build audio stream: {e}")))?;

        stream
            .play()
            .map_err(|e| EngineError::Device(format!("Failed to play audio stream: {e}")))?;
        debug!("Audio stream started: {channels} channels at {sample_rate} Hz");

        Ok(Self {
            stream,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn stop(self) {
        if let Err(e) = self.stream.pause() {
            debug!("pause before stop failed: {e}");
        }
        debug!("Audio stream stopped");
    }
}

/// Copy interleaved stereo into a device buffer of `channels` channels.
/// Mono devices get the average; channels beyond the second get `silence`.
fn spread_frames<T: Copy>(stereo: &[f32], data: &mut [T], channels: usize, convert: impl Fn(f32) -> T, silence: T) {
    if channels == 0 {
        return;
    }
    let mut frames = data.chunks_exact_mut(channels);
    for (frame, lr) in (&mut frames).zip(stereo.chunks_exact(2)) {
        if channels == 1 {
            frame[0] = convert((lr[0] + lr[1]) * 0.5);
            continue;
        }
        frame[0] = convert(lr[0]);
        frame[1] = convert(lr[1]);
        frame[2..].fill(silence);
    }
    frames.into_remainder().fill(silence);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreads_to_surround() {
        let stereo = [0.5, -0.5, 0.25, -0.25];
        let mut data = [9.0_f32; 8];
        spread_frames(&stereo, &mut data, 4, |s| s, 0.0);
        assert_eq!(data, [0.5, -0.5, 0.0, 0.0, 0.25, -0.25, 0.0, 0.0]);
    }

    #[test]
    fn mono_averages() {
        let stereo = [0.5, 0.25];
        let mut data = [0_i16; 1];
        spread_frames(&stereo, &mut data, 1, to_pcm_i16, 0);
        assert_eq!(data[0], to_pcm_i16(0.375));
    }
}
