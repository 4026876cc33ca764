//! DSP Engine — phase-continuous synthesis, panning, mixing and limiting.
//!
//! The same code drives the live pull renderer and the offline exporter;
//! each render context owns its own [`engine::Engine`] so their phase state
//! never mixes.

pub mod engine;
pub mod filter;
pub mod generator;
pub mod limiter;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod panner;
pub mod phase;
pub mod renderer;

/// Planar stereo audio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBlock {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
}

impl StereoBlock {
    /// A block of `frames` zero samples per channel.
    pub fn silence(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Resize to `frames` and zero every sample, keeping the allocation.
    pub fn clear(&mut self, frames: usize) {
        self.left.clear();
        self.left.resize(frames, 0.0);
        self.right.clear();
        self.right.resize(frames, 0.0);
    }

    /// Copy a mono signal into both channels.
    pub fn fill_mono(&mut self, mono: &[f64]) {
        self.left.clear();
        self.left.extend_from_slice(mono);
        self.right.clear();
        self.right.extend_from_slice(mono);
    }

    pub fn is_finite(&self) -> bool {
        self.left.iter().chain(self.right.iter()).all(|s| s.is_finite())
    }

    /// Write interleaved `f32` frames into `out` (length `2 · len()`),
    /// scaled by `gain` and clamped to [-1, 1].
    pub fn write_interleaved(&self, gain: f64, out: &mut [f32]) {
        for (frame, (l, r)) in out
            .chunks_exact_mut(2)
            .zip(self.left.iter().zip(self.right.iter()))
        {
            frame[0] = (l * gain).clamp(-1.0, 1.0) as f32;
            frame[1] = (r * gain).clamp(-1.0, 1.0) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_zeroes_and_resizes() {
        let mut b = StereoBlock::silence(4);
        b.left[0] = 1.0;
        b.clear(6);
        assert_eq!(b, StereoBlock::silence(6));
    }

    #[test]
    fn interleave_scales_and_clamps() {
        let b = StereoBlock {
            left: vec![0.5, 3.0],
            right: vec![-0.25, -3.0],
        };
        let mut out = [0.0_f32; 4];
        b.write_interleaved(0.5, &mut out);
        assert_eq!(out, [0.25, -0.125, 1.0, -1.0]);
    }
}
