//! Filters used by the noise generator: RBJ biquads for band limiting and
//! one-pole smoothers for colouring.

use std::f64::consts::PI;

/// Butterworth Q for a single second-order section.
pub const Q_BUTTERWORTH: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Lowest corner frequency a band-limit stage will be built with.
pub const MIN_CUTOFF: f64 = 1.0;

/// Band-limit cutoffs at or beyond these values leave that side open.
pub const OPEN_LOW_CUT: f64 = 20.0;
pub const OPEN_HIGH_CUT: f64 = 20_000.0;

/// Filter type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
}

/// A biquad IIR filter (2nd order).
///
/// Direct Form II Transposed, coefficients from the Audio EQ Cookbook.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    frequency: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,
}

impl BiquadFilter {
    /// Build a filter at `frequency`. The corner is clamped into
    /// `[MIN_CUTOFF, 0.99·nyquist]` so the design is always stable.
    pub fn new(filter_type: FilterType, frequency: f64, q: f64, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: clamp_cutoff(frequency, sample_rate),
            q: if q.is_finite() && q > 0.0 { q } else { Q_BUTTERWORTH },
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        f.update_coefficients(sample_rate);
        f
    }

    /// Second-order Butterworth section.
    pub fn butterworth(filter_type: FilterType, frequency: f64, sample_rate: f64) -> Self {
        Self::new(filter_type, frequency, Q_BUTTERWORTH, sample_rate)
    }

    fn update_coefficients(&mut self, sample_rate: f64) {
        let w0 = 2.0 * PI * self.frequency / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * self.q);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    /// Process a single sample through the filter.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    pub fn process_block(&mut self, buf: &mut [f64]) {
        for s in buf.iter_mut() {
            *s = self.process(*s);
        }
    }
}

/// One-pole low-pass smoother: `y = a·x + (1 − a)·y[-1]`. Unity gain at DC.
#[derive(Debug, Clone)]
pub struct OnePole {
    alpha: f64,
    y1: f64,
}

impl OnePole {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            y1: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.y1 += self.alpha * (input - self.y1);
        self.y1
    }

    pub fn process_block(&mut self, buf: &mut [f64]) {
        for s in buf.iter_mut() {
            *s = self.process(*s);
        }
    }
}

/// Optional band-limiting stage chosen from which cutoffs are active.
#[derive(Debug, Clone)]
pub enum BandLimit {
    Open,
    Highpass(BiquadFilter),
    Lowpass(BiquadFilter),
    /// High-pass followed by low-pass.
    Bandpass(BiquadFilter, BiquadFilter),
}

impl BandLimit {
    /// Design the stage for the given cutoffs.
    ///
    /// `low_cut > 20 Hz` enables the high-pass side, `high_cut < 20 kHz` the
    /// low-pass side. Corners are clamped into `[MIN_CUTOFF, 0.99·nyquist]`
    /// and an inverted band moves the low corner to an octave below the high one.
    pub fn design(low_cut: f64, high_cut: f64, sample_rate: f64) -> Self {
        let low_active = low_cut.is_finite() && low_cut > OPEN_LOW_CUT;
        let high_active = high_cut.is_finite() && high_cut < OPEN_HIGH_CUT;

        match (low_active, high_active) {
            (false, false) => BandLimit::Open,
            (true, false) => BandLimit::Highpass(BiquadFilter::butterworth(
                FilterType::Highpass,
                low_cut,
                sample_rate,
            )),
            (false, true) => BandLimit::Lowpass(BiquadFilter::butterworth(
                FilterType::Lowpass,
                high_cut,
                sample_rate,
            )),
            (true, true) => {
                let (low, high) = clamp_band(low_cut, high_cut, sample_rate);
                BandLimit::Bandpass(
                    BiquadFilter::butterworth(FilterType::Highpass, low, sample_rate),
                    BiquadFilter::butterworth(FilterType::Lowpass, high, sample_rate),
                )
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, BandLimit::Open)
    }

    pub fn process_block(&mut self, buf: &mut [f64]) {
        match self {
            BandLimit::Open => {}
            BandLimit::Highpass(f) | BandLimit::Lowpass(f) => f.process_block(buf),
            BandLimit::Bandpass(hp, lp) => {
                hp.process_block(buf);
                lp.process_block(buf);
            }
        }
    }
}

fn max_cutoff(sample_rate: f64) -> f64 {
    0.99 * sample_rate / 2.0
}

/// Clamp a corner frequency into the designable range.
pub fn clamp_cutoff(freq: f64, sample_rate: f64) -> f64 {
    let hi = max_cutoff(sample_rate).max(MIN_CUTOFF);
    if !freq.is_finite() {
        return hi;
    }
    freq.clamp(MIN_CUTOFF, hi)
}

/// Clamp a band so both corners are designable and `low < high`.
pub fn clamp_band(low: f64, high: f64, sample_rate: f64) -> (f64, f64) {
    let high = clamp_cutoff(high, sample_rate).max(2.0 * MIN_CUTOFF);
    let low = clamp_cutoff(low, sample_rate);
    if low >= high { (high / 2.0, high) } else { (low, high) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    fn steady_state_amplitude(filter: &mut BandLimit, freq: f64) -> f64 {
        let mut buf: Vec<f64> = (0..8820)
            .map(|i| (2.0 * PI * freq * i as f64 / SR).sin())
            .collect();
        filter.process_block(&mut buf);
        buf[4410..].iter().fold(0.0_f64, |m, s| m.max(s.abs()))
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = BiquadFilter::butterworth(FilterType::Lowpass, 5000.0, SR);
        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.001, "Lowpass should pass DC, got {output}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = BiquadFilter::butterworth(FilterType::Highpass, 1000.0, SR);
        let mut output = 1.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!(output.abs() < 0.001, "Highpass should block DC, got {output}");
    }

    #[test]
    fn open_band_is_identity() {
        assert!(BandLimit::design(20.0, 20_000.0, SR).is_open());
        assert!(BandLimit::design(5.0, 22_000.0, SR).is_open());
    }

    #[test]
    fn stage_selection_follows_active_cutoffs() {
        assert!(matches!(BandLimit::design(200.0, 20_000.0, SR), BandLimit::Highpass(_)));
        assert!(matches!(BandLimit::design(20.0, 2000.0, SR), BandLimit::Lowpass(_)));
        assert!(matches!(BandLimit::design(200.0, 2000.0, SR), BandLimit::Bandpass(..)));
    }

    #[test]
    fn bandpass_attenuates_outside_band() {
        let mut band = BandLimit::design(500.0, 2000.0, SR);
        let inside = steady_state_amplitude(&mut band, 1000.0);
        let mut band = BandLimit::design(500.0, 2000.0, SR);
        let below = steady_state_amplitude(&mut band, 50.0);
        let mut band = BandLimit::design(500.0, 2000.0, SR);
        let above = steady_state_amplitude(&mut band, 15_000.0);

        assert!(inside > 0.8, "passband amplitude {inside}");
        assert!(below < 0.05, "50 Hz leaked: {below}");
        assert!(above < 0.05, "15 kHz leaked: {above}");
    }

    #[test]
    fn degenerate_band_is_clamped() {
        let (low, high) = clamp_band(5000.0, 1000.0, SR);
        assert_eq!((low, high), (500.0, 1000.0));

        let (low, high) = clamp_band(100.0, 50_000.0, SR);
        assert_eq!(low, 100.0);
        assert!(high < SR / 2.0);

        // Cutoffs above Nyquist at a low rate still give a stable filter.
        let mut band = BandLimit::design(30_000.0, 19_000.0, 8000.0);
        let mut buf: Vec<f64> = (0..2000).map(|i| if i % 7 == 0 { 1.0 } else { -0.3 }).collect();
        band.process_block(&mut buf);
        assert!(buf.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn one_pole_smooths() {
        let mut f = OnePole::new(0.1);
        let first = f.process(1.0);
        assert!((first - 0.1).abs() < 1e-12);
        let mut last = first;
        for _ in 0..200 {
            last = f.process(1.0);
        }
        assert!((last - 1.0).abs() < 1e-6);
    }

    #[test]
    fn filter_output_finite() {
        let mut f = BiquadFilter::butterworth(FilterType::Highpass, 1000.0, SR);
        for i in 0..10000 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            let out = f.process(input);
            assert!(out.is_finite(), "Filter output not finite at sample {i}");
        }
    }
}
