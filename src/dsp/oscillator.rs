//! Phase-continuous sine oscillator.

use super::phase::PhaseState;

/// A sine oscillator driven by its own [`PhaseState`].
#[derive(Debug, Clone, Default)]
pub struct Oscillator {
    state: PhaseState,
}

impl Oscillator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    /// Write `sin(phase)` for `[start, start + out.len())` at a fixed frequency.
    pub fn render(&mut self, start: u64, frequency: f64, dt: f64, out: &mut [f64]) {
        self.state.advance_constant(start, frequency, dt, out);
        to_sine(out);
    }

    /// Write `sin(phase)` with a per-sample frequency.
    pub fn render_modulated(&mut self, start: u64, freqs: &[f64], dt: f64, out: &mut [f64]) {
        self.state.advance(start, freqs, dt, out);
        to_sine(out);
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut PhaseState {
        &mut self.state
    }

    /// See [`PhaseState::hold`].
    pub fn hold(&mut self) {
        self.state.hold();
    }
}

fn to_sine(buf: &mut [f64]) {
    for s in buf.iter_mut() {
        *s = s.sin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const DT: f64 = 1.0 / 44100.0;

    #[test]
    fn sine_zero_at_start() {
        let mut osc = Oscillator::new();
        let mut out = [0.0; 8];
        osc.render(0, 440.0, DT, &mut out);
        assert!(out[0].abs() < 1e-10, "Sine should start near 0, got {}", out[0]);
    }

    #[test]
    fn sine_range() {
        let mut osc = Oscillator::new();
        let mut out = vec![0.0; 44100];
        osc.render(0, 440.0, DT, &mut out);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn matches_closed_form() {
        let mut osc = Oscillator::new();
        let mut out = vec![0.0; 4410];
        osc.render(0, 1000.0, DT, &mut out);
        for (i, &s) in out.iter().enumerate() {
            let t = i as f64 * DT;
            let expected = (2.0 * PI * 1000.0 * t).sin();
            assert!((s - expected).abs() < 1e-8, "sample {i}: {s} vs {expected}");
        }
    }
}
