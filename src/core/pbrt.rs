//! Type definitions of Float and Spectrum, otherwise constants and
//! functions which can be used almost everywhere else in the code.

// std
use std::ops::{Add, Mul, Sub};
// others
use num;
// wavefront
use crate::core::spectrum::RGBSpectrum;

pub type Spectrum = RGBSpectrum;

pub type Float = f32;

pub const SHADOW_EPSILON: Float = 0.0001;
pub const INV_PI: Float = 0.318_309_886_183_790_671_54;
pub const PI_OVER_2: Float = 1.570_796_326_794_896_619_23;
pub const PI_OVER_4: Float = 0.785_398_163_397_448_309_61;

/// Display gamma used for all color buffers.
pub const DISPLAY_GAMMA: Float = 2.2;

/// Encode a linear value for display with a plain power curve
/// (1/2.2). Negative input is treated as black.
pub fn gamma_encode(value: Float) -> Float {
    value.max(0.0 as Float).powf(1.0 as Float / DISPLAY_GAMMA)
}

/// Clamp the given value *val* to lie between the values *low* and *high*.
pub fn clamp_t<T>(val: T, low: T, high: T) -> T
where
    T: PartialOrd,
{
    let r: T;
    if val < low {
        r = low;
    } else if val > high {
        r = high;
    } else {
        r = val;
    }
    r
}

/// Convert from angles expressed in degrees to radians.
pub fn radians(deg: Float) -> Float {
    (std::f32::consts::PI / 180.0) * deg
}

/// Interpolate linearly between two provided values.
pub fn lerp<S, T>(t: S, a: T, b: T) -> T
where
    S: num::One,
    S: Sub<S, Output = S>,
    S: Copy,
    T: Add<T, Output = T>,
    T: Mul<S, Output = T>,
{
    let one: S = num::One::one();
    a * (one - t) + b * t
}

/// Find solution(s) of the quadratic equation at<sup>2</sup> + bt + c = 0.
pub fn quadratic(a: Float, b: Float, c: Float) -> Option<(Float, Float)> {
    // find quadratic discriminant
    let discrim: f64 = (b as f64) * (b as f64) - 4.0 * (a as f64) * (c as f64);
    if discrim < 0.0 {
        None
    } else {
        let root_discrim: f64 = discrim.sqrt();
        // compute quadratic _t_ values
        let q = if b < 0.0 {
            -0.5 * (b as f64 - root_discrim)
        } else {
            -0.5 * (b as f64 + root_discrim)
        };
        let mut t0: Float = q as Float / a;
        let mut t1: Float = c / q as Float;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1)
        }
        Some((t0, t1))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gamma_encode_is_power_curve() {
        let v: Float = 0.25;
        assert!((gamma_encode(v) - v.powf(1.0 / 2.2)).abs() < 1e-6);
        assert_eq!(gamma_encode(-1.0), 0.0);
        assert_eq!(gamma_encode(1.0), 1.0);
    }

    #[test]
    fn quadratic_orders_roots() {
        // (t - 1)(t - 3) = t^2 - 4t + 3
        let (t0, t1) = quadratic(1.0, -4.0, 3.0).unwrap();
        assert!((t0 - 1.0).abs() < 1e-5);
        assert!((t1 - 3.0).abs() < 1e-5);
        assert!(quadratic(1.0, 0.0, 1.0).is_none());
    }
}
