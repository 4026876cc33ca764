//! Limiter — memoryless soft-knee gain reduction, plus the offline
//! soft-clip and peak-normalize passes.
//!
//! The limiter has no attack/release envelope: every sample is scaled
//! independently. Samples below `threshold − knee` pass untouched; louder
//! samples are scaled towards `threshold + (|x| − threshold)/ratio`.

use crate::config::LimiterConfig;

/// A stateless soft-knee limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftKneeLimiter {
    /// Level (linear) above which the ratio applies.
    pub threshold: f64,
    /// Width (linear) below the threshold where limiting is considered.
    pub knee: f64,
    /// Compression ratio (e.g. 4.0 = 4:1).
    pub ratio: f64,
}

impl Default for SoftKneeLimiter {
    fn default() -> Self {
        Self::from_config(&LimiterConfig::default())
    }
}

impl SoftKneeLimiter {
    pub fn from_config(config: &LimiterConfig) -> Self {
        Self {
            threshold: config.threshold,
            knee: config.knee,
            ratio: config.ratio.max(1.0),
        }
    }

    /// Gain for a sample of magnitude `level`. Never above 1.
    #[inline]
    pub fn gain(&self, level: f64) -> f64 {
        if level <= self.threshold - self.knee {
            return 1.0;
        }
        let target = self.threshold + (level - self.threshold) / self.ratio;
        (target / level).min(1.0)
    }

    #[inline]
    pub fn process(&self, sample: f64) -> f64 {
        sample * self.gain(sample.abs())
    }

    /// Process a block of stereo audio in-place.
    pub fn process_block(&self, left: &mut [f64], right: &mut [f64]) {
        for s in left.iter_mut().chain(right.iter_mut()) {
            *s = self.process(*s);
        }
    }
}

/// `tanh(x·k)/k`, bounded by `1/k`.
#[inline]
pub fn soft_clip(x: f64, drive: f64) -> f64 {
    (x * drive).tanh() / drive
}

/// Largest absolute sample across the given channels.
pub fn peak(channels: &[&[f32]]) -> f32 {
    channels
        .iter()
        .flat_map(|c| c.iter())
        .fold(0.0_f32, |m, s| m.max(s.abs()))
}

/// Divide every channel by the common peak when it exceeds 1.
/// Returns the gain that was applied.
pub fn normalize_peak(channels: &mut [&mut [f32]]) -> f32 {
    let max = channels
        .iter()
        .flat_map(|c| c.iter())
        .fold(0.0_f32, |m, s| m.max(s.abs()));
    if max <= 1.0 {
        return 1.0;
    }
    let gain = 1.0 / max;
    for channel in channels.iter_mut() {
        for s in channel.iter_mut() {
            *s *= gain;
        }
    }
    gain
}
