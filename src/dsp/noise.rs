//! Noise source — white noise, optionally coloured and band limited.
//!
//! White samples are drawn fresh for every block. Pink and brown are
//! approximations made by low-passing the white signal with fixed one-pole
//! stages, scaled back to unit variance. They are not true 1/f generators.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::track::{NoiseColor, NoiseParams};

use super::filter::{BandLimit, OnePole};

/// Smoothing coefficient of the single pink stage.
const PINK_ALPHA: f64 = 0.1;
/// Smoothing coefficient of each of the two brown stages.
const BROWN_ALPHA: f64 = 0.02;

#[derive(Debug, Clone)]
enum ColorStage {
    White,
    Pink(OnePole),
    Brown(OnePole, OnePole),
}

impl ColorStage {
    fn new(color: NoiseColor) -> Self {
        match color {
            NoiseColor::White => ColorStage::White,
            NoiseColor::Pink => ColorStage::Pink(OnePole::new(PINK_ALPHA)),
            NoiseColor::Brown => {
                ColorStage::Brown(OnePole::new(BROWN_ALPHA), OnePole::new(BROWN_ALPHA))
            }
        }
    }

    /// Gain that restores unit variance for unit-variance white input.
    fn makeup_gain(&self) -> f64 {
        match self {
            ColorStage::White => 1.0,
            // var = a / (2 - a)
            ColorStage::Pink(_) => ((2.0 - PINK_ALPHA) / PINK_ALPHA).sqrt(),
            // var = a^4 (1 + p^2) / (1 - p^2)^3 with p = 1 - a
            ColorStage::Brown(..) => {
                let a = BROWN_ALPHA;
                let p2 = (1.0 - a) * (1.0 - a);
                let var = a.powi(4) * (1.0 + p2) / (1.0 - p2).powi(3);
                1.0 / var.sqrt()
            }
        }
    }

    fn process_block(&mut self, buf: &mut [f64]) {
        let gain = self.makeup_gain();
        match self {
            ColorStage::White => return,
            ColorStage::Pink(f) => f.process_block(buf),
            ColorStage::Brown(a, b) => {
                a.process_block(buf);
                b.process_block(buf);
            }
        }
        for s in buf.iter_mut() {
            *s *= gain;
        }
    }
}

/// Per-track noise generator. Filter memories persist between blocks and
/// are rebuilt when the colour or cutoffs change.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    params: NoiseParams,
    sample_rate: f64,
    color: ColorStage,
    band: BandLimit,
}

impl NoiseSource {
    pub fn new(params: NoiseParams, sample_rate: f64) -> Self {
        Self {
            params,
            sample_rate,
            color: ColorStage::new(params.color),
            band: BandLimit::design(params.low_cut, params.high_cut, sample_rate),
        }
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Apply new parameters, redesigning only the stages that changed.
    pub fn configure(&mut self, params: NoiseParams) {
        if params.color != self.params.color {
            self.color = ColorStage::new(params.color);
        }
        if params.low_cut != self.params.low_cut || params.high_cut != self.params.high_cut {
            self.band = BandLimit::design(params.low_cut, params.high_cut, self.sample_rate);
        }
        self.params = params;
    }

    /// Fill `out` with a fresh block of noise.
    pub fn render<R: Rng + ?Sized>(&mut self, rng: &mut R, out: &mut [f64]) {
        for s in out.iter_mut() {
            *s = rng.sample(StandardNormal);
        }
        self.color.process_block(out);
        self.band.process_block(out);
    }
}
