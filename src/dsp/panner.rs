//! Panner — static placement and equal-power auto-pan.

use std::f64::consts::{FRAC_PI_4, TAU};

use crate::track::{Pan, PanDirection};

use super::StereoBlock;

/// Equal-power gains for a pan position in [-1, 1] (−1 = left).
///
/// `θ = (pos + 1)·π/4`, gains `(cos θ, sin θ)`, so `l² + r² = 1`.
#[inline]
pub fn equal_power_gains(pos: f64) -> (f64, f64) {
    let pos = if pos.is_finite() { pos.clamp(-1.0, 1.0) } else { 0.0 };
    let angle = (pos + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Auto-pan position at time `t` seconds.
///
/// `Alternate` sweeps exactly like `LeftToRight`.
#[inline]
pub fn auto_pan_position(direction: PanDirection, speed: f64, depth: f64, t: f64) -> f64 {
    let sign = match direction {
        PanDirection::RightToLeft => -1.0,
        PanDirection::LeftToRight | PanDirection::Alternate => 1.0,
    };
    (sign * depth * (TAU * speed * t).sin()).clamp(-1.0, 1.0)
}

/// Spatialize `block`, whose first frame sits at sample index `start`.
pub fn pan(block: &mut StereoBlock, start: u64, sample_rate: f64, pan: &Pan) {
    match *pan {
        Pan::Center => {}
        Pan::HardLeft => block.right.fill(0.0),
        Pan::HardRight => block.left.fill(0.0),
        Pan::AutoPan {
            direction,
            speed,
            depth,
        } => {
            let speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
            let depth = if depth.is_finite() { depth.clamp(0.0, 1.0) } else { 0.0 };
            for (i, (l, r)) in block.left.iter_mut().zip(block.right.iter_mut()).enumerate() {
                let t = (start + i as u64) as f64 / sample_rate;
                let pos = auto_pan_position(direction, speed, depth, t);
                let (gl, gr) = equal_power_gains(pos);
                *l *= gl;
                *r *= gr;
            }
        }
    }
}
