//! Phase clock — keeps an oscillator continuous across render calls.
//!
//! Each oscillator owns a [`PhaseState`]: the accumulated phase in radians,
//! the frequency it was last driven at, and the index of the sample it
//! expects next. Consecutive blocks therefore join without a discontinuity,
//! whatever their size.

use std::f64::consts::TAU;

/// Accumulated phase of one oscillator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseState {
    /// Phase in radians, kept in [0, 2π) between calls.
    phase: f64,
    /// Frequency of the last rendered sample, in Hz.
    last_freq: f64,
    /// Sample index just past the last rendered sample.
    next_index: Option<u64>,
}

impl PhaseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn last_freq(&self) -> f64 {
        self.last_freq
    }

    pub fn next_index(&self) -> Option<u64> {
        self.next_index
    }

    #[cfg(test)]
    pub(crate) fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
    }

    /// Forget the timeline position without touching the phase.
    ///
    /// The next call continues from the stored phase as if it directly
    /// followed the last rendered sample.
    pub fn hold(&mut self) {
        self.next_index = None;
    }

    /// Advance through a skipped range at the last known frequency.
    fn bridge_gap(&mut self, start: u64, dt: f64) {
        if let Some(expected) = self.next_index {
            if start > expected {
                let gap = (start - expected) as f64 * dt;
                self.phase = wrap(self.phase + TAU * self.last_freq * gap);
            }
        }
    }

    /// Fill `out` with the phase of each sample in `[start, start + out.len())`,
    /// driven by a per-sample frequency in Hz.
    ///
    /// `out[0]` is the stored phase, `out[i] = out[i-1] + 2π·freqs[i-1]·dt`.
    /// `freqs` must be at least as long as `out`.
    pub fn advance(&mut self, start: u64, freqs: &[f64], dt: f64, out: &mut [f64]) {
        debug_assert!(freqs.len() >= out.len());
        self.advance_with(start, dt, out, |i| freqs[i]);
    }

    /// [`advance`](Self::advance) at one frequency for the whole block.
    pub fn advance_constant(&mut self, start: u64, freq: f64, dt: f64, out: &mut [f64]) {
        self.advance_with(start, dt, out, |_| freq);
    }

    fn advance_with(&mut self, start: u64, dt: f64, out: &mut [f64], freq_at: impl Fn(usize) -> f64) {
        if out.is_empty() {
            return;
        }
        self.bridge_gap(start, dt);

        let mut phase = self.phase;
        let mut freq = self.last_freq;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = phase;
            freq = sanitize_freq(freq_at(i), dt);
            phase += TAU * freq * dt;
        }

        self.phase = wrap(phase);
        self.last_freq = freq;
        self.next_index = Some(start + out.len() as u64);
    }
}

/// Wrap a phase into [0, 2π).
pub fn wrap(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative input
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Clamp a frequency into [0, nyquist]. Non-finite values become 0.
pub fn sanitize_freq(freq: f64, dt: f64) -> f64 {
    if !freq.is_finite() {
        return 0.0;
    }
    let nyquist = 0.5 / dt;
    freq.clamp(0.0, nyquist)
}
