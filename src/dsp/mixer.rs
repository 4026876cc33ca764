//! Mixer — sums panned track signals with headroom, then limits.

use crate::config::EngineConfig;

use super::StereoBlock;
use super::limiter::SoftKneeLimiter;

/// A summing stereo mixer that accumulates track blocks.
#[derive(Debug, Clone)]
pub struct Mixer {
    /// Fixed attenuation applied to every track before summing.
    pub headroom: f64,
    pub limiter: SoftKneeLimiter,
    buffer: StereoBlock,
}

impl Mixer {
    pub fn new(headroom: f64, limiter: SoftKneeLimiter) -> Self {
        Mixer {
            headroom,
            limiter,
            buffer: StereoBlock::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.headroom, SoftKneeLimiter::from_config(&config.limiter))
    }

    /// Prepare a buffer of `frames` filled with zeros.
    pub fn clear(&mut self, frames: usize) {
        self.buffer.clear(frames);
    }

    /// Add a panned track block at the given track volume.
    pub fn add(&mut self, block: &StereoBlock, volume: f64) {
        let gain = volume * self.headroom;
        for (acc, s) in self.buffer.left.iter_mut().zip(&block.left) {
            *acc += s * gain;
        }
        for (acc, s) in self.buffer.right.iter_mut().zip(&block.right) {
            *acc += s * gain;
        }
    }

    /// Run the limiter over the accumulated mix.
    pub fn limit(&mut self) {
        let StereoBlock { left, right } = &mut self.buffer;
        self.limiter.process_block(left, right);
    }

    pub fn output(&self) -> &StereoBlock {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(frames: usize, l: f64, r: f64) -> StereoBlock {
        StereoBlock {
            left: vec![l; frames],
            right: vec![r; frames],
        }
    }

    #[test]
    fn empty_mix_is_silent() {
        let mut m = Mixer::from_config(&EngineConfig::default());
        m.clear(128);
        m.limit();
        let out = m.output();
        assert_eq!(out.len(), 128);
        assert!(out.left.iter().chain(&out.right).all(|&s| s == 0.0));
    }

    #[test]
    fn applies_volume_and_headroom() {
        let mut m = Mixer::new(0.3, SoftKneeLimiter::default());
        m.clear(4);
        m.add(&constant(4, 1.0, -1.0), 0.5);
        m.add(&constant(4, 0.5, 0.0), 1.0);
        m.limit();
        let out = m.output();
        assert!((out.left[0] - 0.3).abs() < 1e-12);
        assert!((out.right[0] + 0.15).abs() < 1e-12);
    }

    #[test]
    fn loud_sums_are_limited() {
        let mut m = Mixer::new(1.0, SoftKneeLimiter::default());
        m.clear(1);
        for _ in 0..4 {
            m.add(&constant(1, 0.5, 0.5), 1.0);
        }
        // 2.0 → 0.8 + 1.2/4
        m.limit();
        let out = m.output();
        assert!((out.left[0] - 1.1).abs() < 1e-12);
    }
}
