//! RGB radiance values. All light transport in the path tracer is
//! carried out on three color channels.

// std
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};
// wavefront
use crate::core::pbrt::Float;

#[derive(Debug, Default, Copy, Clone)]
pub struct RGBSpectrum {
    pub c: [Float; 3],
}

impl RGBSpectrum {
    pub fn new(v: Float) -> Self {
        RGBSpectrum { c: [v, v, v] }
    }
    pub fn rgb(r: Float, g: Float, b: Float) -> RGBSpectrum {
        RGBSpectrum { c: [r, g, b] }
    }
    pub fn y(&self) -> Float {
        let y_weight: [Float; 3] = [0.212_671, 0.715_160, 0.072_169];
        y_weight[0] * self.c[0] + y_weight[1] * self.c[1] + y_weight[2] * self.c[2]
    }
    /// Squared Euclidean length of the RGB triple. This is the
    /// second-moment quantity accumulated for variance estimation.
    pub fn length_squared(&self) -> Float {
        self.c[0] * self.c[0] + self.c[1] * self.c[1] + self.c[2] * self.c[2]
    }
    pub fn is_black(&self) -> bool {
        for i in 0..3 {
            if self.c[i] != 0.0 as Float {
                return false;
            }
        }
        true
    }
    pub fn has_nans(&self) -> bool {
        for i in 0..3 {
            if self.c[i].is_nan() {
                return true;
            }
        }
        false
    }
}

impl PartialEq for RGBSpectrum {
    fn eq(&self, rhs: &RGBSpectrum) -> bool {
        for i in 0..3 {
            if self.c[i] != rhs.c[i] {
                return false;
            }
        }
        true
    }
}

impl Add for RGBSpectrum {
    type Output = RGBSpectrum;
    fn add(self, rhs: RGBSpectrum) -> RGBSpectrum {
        RGBSpectrum {
            c: [
                self.c[0] + rhs.c[0],
                self.c[1] + rhs.c[1],
                self.c[2] + rhs.c[2],
            ],
        }
    }
}

impl AddAssign for RGBSpectrum {
    fn add_assign(&mut self, rhs: RGBSpectrum) {
        self.c[0] += rhs.c[0];
        self.c[1] += rhs.c[1];
        self.c[2] += rhs.c[2];
    }
}

impl Mul for RGBSpectrum {
    type Output = RGBSpectrum;
    fn mul(self, rhs: RGBSpectrum) -> RGBSpectrum {
        RGBSpectrum {
            c: [
                self.c[0] * rhs.c[0],
                self.c[1] * rhs.c[1],
                self.c[2] * rhs.c[2],
            ],
        }
    }
}

impl Mul<Float> for RGBSpectrum {
    type Output = RGBSpectrum;
    fn mul(self, rhs: Float) -> RGBSpectrum {
        RGBSpectrum {
            c: [self.c[0] * rhs, self.c[1] * rhs, self.c[2] * rhs],
        }
    }
}

impl MulAssign for RGBSpectrum {
    fn mul_assign(&mut self, rhs: RGBSpectrum) {
        self.c[0] *= rhs.c[0];
        self.c[1] *= rhs.c[1];
        self.c[2] *= rhs.c[2];
    }
}

impl MulAssign<Float> for RGBSpectrum {
    fn mul_assign(&mut self, rhs: Float) {
        self.c[0] *= rhs;
        self.c[1] *= rhs;
        self.c[2] *= rhs;
    }
}

impl Sub for RGBSpectrum {
    type Output = RGBSpectrum;
    fn sub(self, rhs: RGBSpectrum) -> RGBSpectrum {
        RGBSpectrum {
            c: [
                self.c[0] - rhs.c[0],
                self.c[1] - rhs.c[1],
                self.c[2] - rhs.c[2],
            ],
        }
    }
}

impl Div<Float> for RGBSpectrum {
    type Output = RGBSpectrum;
    fn div(self, rhs: Float) -> RGBSpectrum {
        debug_assert_ne!(rhs, 0.0 as Float);
        let inv: Float = 1.0 as Float / rhs;
        RGBSpectrum {
            c: [self.c[0] * inv, self.c[1] * inv, self.c[2] * inv],
        }
    }
}

