//! The **SamplePool** holds precomputed stratified 2D sample
//! coordinates that every pixel draws from. Camera samples jitter the
//! pixel position and the lens; intersection samples (one slice per
//! bounce) drive BSDF sampling and the two dimensions of multiple
//! importance sampling.
//!
//! Which entry a pixel uses in a given iteration is decided by a
//! [StratifiedIndex] policy, never by a random draw, so the pool is
//! walked cyclically and every entry gets used equally often.

// others
use strum_macros::{Display, EnumString};
// wavefront
use crate::core::geometry::Point2f;
use crate::core::pbrt::Float;
use crate::core::rng::{Rng, FLOAT_ONE_MINUS_EPSILON};
use crate::core::sampling::{shuffle, stratified_sample_2d, utilhash};

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct CameraSample {
    pub pixel: Point2f,
    pub lens: Point2f,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct IntersectionSample {
    /// drives the continuation direction
    pub scatter: Point2f,
    /// point on the chosen light (light sampling strategy)
    pub light: Point2f,
    /// direction for the BSDF sampling strategy of MIS
    pub scatter_mis: Point2f,
}

/// How a pixel picks its entry of the sample pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StratifiedIndex {
    /// Every pixel uses the entry `iteration mod N`.
    Splatting,
    /// Every pixel uses the entry `(iteration + hash(pixel)) mod N`.
    #[strum(serialize = "full", serialize = "full-stratified")]
    FullStratified,
}

impl Default for StratifiedIndex {
    fn default() -> Self {
        StratifiedIndex::FullStratified
    }
}

impl StratifiedIndex {
    pub fn index(&self, iteration: u32, pixel_index: usize, n_samples: usize) -> usize {
        debug_assert!(n_samples > 0);
        let n: u64 = n_samples as u64;
        match self {
            StratifiedIndex::Splatting => (iteration as u64 % n) as usize,
            StratifiedIndex::FullStratified => {
                ((iteration as u64 + utilhash(pixel_index as u32) as u64) % n) as usize
            }
        }
    }
}

pub struct SamplePool {
    /// samples per dimension; the pool holds `side * side` entries
    pub side: u32,
    pub max_depth: u32,
    pub camera_samples: Vec<CameraSample>,
    /// `max_depth` consecutive slices of `side * side` entries
    pub intersection_samples: Vec<IntersectionSample>,
    pub generation: u64,
}

impl SamplePool {
    pub fn generate(side: u32, max_depth: u32, generation: u64) -> Self {
        let mut pool = SamplePool {
            side,
            max_depth,
            camera_samples: Vec::new(),
            intersection_samples: Vec::new(),
            generation,
        };
        pool.refresh(generation);
        pool
    }
    /// Number of entries per slice.
    pub fn len(&self) -> usize {
        self.side as usize * self.side as usize
    }
    pub fn is_empty(&self) -> bool {
        self.side == 0
    }
    /// Width of one stratum; jittered pool samples never leave their
    /// stratum.
    pub fn cell_width(&self) -> Float {
        1.0 as Float / self.side as Float
    }
    /// Replace the pool contents with a fresh set of shuffled,
    /// jittered stratified samples. Each refresh *generation* yields a
    /// different but reproducible pool.
    pub fn refresh(&mut self, generation: u64) {
        let n: usize = self.len();
        let side: i32 = self.side as i32;
        let mut rng: Rng = Rng::new();
        rng.set_sequence(generation);
        let mut dimension = |rng: &mut Rng| -> Vec<Point2f> {
            let mut samples: Vec<Point2f> = vec![Point2f::default(); n];
            stratified_sample_2d(&mut samples, side, side, rng, true);
            shuffle(&mut samples, n as i32, 1, rng);
            samples
        };
        let pixel: Vec<Point2f> = dimension(&mut rng);
        let lens: Vec<Point2f> = dimension(&mut rng);
        self.camera_samples = pixel
            .into_iter()
            .zip(lens.into_iter())
            .map(|(pixel, lens)| CameraSample { pixel, lens })
            .collect();
        self.intersection_samples = Vec::with_capacity(n * self.max_depth as usize);
        for _depth in 0..self.max_depth {
            let scatter: Vec<Point2f> = dimension(&mut rng);
            let light: Vec<Point2f> = dimension(&mut rng);
            let scatter_mis: Vec<Point2f> = dimension(&mut rng);
            for i in 0..n {
                self.intersection_samples.push(IntersectionSample {
                    scatter: scatter[i],
                    light: light[i],
                    scatter_mis: scatter_mis[i],
                });
            }
        }
        self.generation = generation;
    }
    pub fn camera_sample(&self, index: usize) -> CameraSample {
        self.camera_samples[index]
    }
    /// The slice of intersection samples for one bounce.
    pub fn intersection_slice(&self, depth: u32) -> &[IntersectionSample] {
        let n: usize = self.len();
        let d: usize = (depth.min(self.max_depth.saturating_sub(1))) as usize;
        &self.intersection_samples[d * n..(d + 1) * n]
    }
}

/// Redraw *u* uniformly inside the stratum of width *cell_width*
/// that contains it. Pool entries cover one stratum each, so the
/// redrawn samples stay uniform over the unit square no matter how
/// long the pool goes without a refresh.
pub fn jitter_sample(u: &Point2f, cell_width: Float, rng: &mut Rng) -> Point2f {
    let jx: Float = rng.uniform_float();
    let jy: Float = rng.uniform_float();
    Point2f {
        x: redraw_in_cell(u.x, jx, cell_width),
        y: redraw_in_cell(u.y, jy, cell_width),
    }
}

fn redraw_in_cell(v: Float, j: Float, cell_width: Float) -> Float {
    let last: Float = ((1.0 as Float / cell_width).round() - 1.0 as Float).max(0.0 as Float);
    let cell: Float = (v / cell_width).floor().max(0.0 as Float).min(last);
    ((cell + j) * cell_width).min(FLOAT_ONE_MINUS_EPSILON)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn splatting_index_is_iteration_mod_n() {
        let policy = StratifiedIndex::Splatting;
        for iteration in 0..100_u32 {
            for pixel in [0_usize, 17, 4096, 99_999].iter() {
                assert_eq!(policy.index(iteration, *pixel, 16), (iteration % 16) as usize);
            }
        }
    }

    #[test]
    fn full_stratified_has_constant_phase_offset() {
        let policy = StratifiedIndex::FullStratified;
        let n: usize = 64;
        let (pa, pb) = (3_usize, 1021_usize);
        let expected = (utilhash(pa as u32) as i64 - utilhash(pb as u32) as i64)
            .rem_euclid(n as i64);
        for iteration in 0..200_u32 {
            let a = policy.index(iteration, pa, n) as i64;
            let b = policy.index(iteration, pb, n) as i64;
            assert_eq!((a - b).rem_euclid(n as i64), expected);
        }
    }

    #[test]
    fn full_stratified_is_periodic() {
        let policy = StratifiedIndex::FullStratified;
        for pixel in 0..32_usize {
            assert_eq!(policy.index(5, pixel, 16), policy.index(21, pixel, 16));
        }
    }

    #[test]
    fn policy_parses_from_cli_names() {
        assert_eq!(
            StratifiedIndex::from_str("splatting").unwrap(),
            StratifiedIndex::Splatting
        );
        assert_eq!(
            StratifiedIndex::from_str("full").unwrap(),
            StratifiedIndex::FullStratified
        );
        assert!(StratifiedIndex::from_str("random").is_err());
    }

    #[test]
    fn refresh_is_reproducible_per_generation() {
        let mut a = SamplePool::generate(4, 3, 0);
        let b = SamplePool::generate(4, 3, 0);
        assert_eq!(a.camera_samples, b.camera_samples);
        assert_eq!(a.intersection_samples.len(), 16 * 3);
        a.refresh(1);
        assert_ne!(a.camera_samples, b.camera_samples);
        assert_eq!(a.intersection_slice(2).len(), 16);
    }

    #[test]
    fn jitter_stays_in_its_stratum() {
        let mut rng = Rng::new();
        let cell_width: Float = 0.25;
        for u in [Point2f::new(0.99, 0.01), Point2f::new(0.3, 0.74), Point2f::new(0.5, 0.0)].iter() {
            let cx = (u.x / cell_width).floor();
            let cy = (u.y / cell_width).floor();
            for _ in 0..1000 {
                let j = jitter_sample(u, cell_width, &mut rng);
                assert!(j.x >= 0.0 && j.x < 1.0);
                assert!(j.y >= 0.0 && j.y < 1.0);
                assert_eq!((j.x / cell_width).floor(), cx);
                assert_eq!((j.y / cell_width).floor(), cy);
            }
        }
    }

    #[test]
    fn jittered_pool_is_uniform_without_refresh() {
        // one fixed pool, jittered over and over, must fill the unit
        // square evenly
        let pool = SamplePool::generate(4, 1, 0);
        let cell_width = pool.cell_width();
        let bins: usize = 32;
        let draws: usize = 256;
        let mut hist_x = vec![0_usize; bins];
        let mut hist_y = vec![0_usize; bins];
        let mut rng = Rng::new();
        for i in 0..pool.len() {
            let u = pool.camera_sample(i).pixel;
            for _ in 0..draws {
                let j = jitter_sample(&u, cell_width, &mut rng);
                hist_x[(j.x * bins as Float) as usize] += 1;
                hist_y[(j.y * bins as Float) as usize] += 1;
            }
        }
        let expected = (pool.len() * draws / bins) as f64;
        for count in hist_x.iter().chain(hist_y.iter()) {
            let ratio = *count as f64 / expected;
            assert!(ratio > 0.6 && ratio < 1.4, "bin ratio {}", ratio);
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn large_pools_do_not_overflow_their_length() {
        let pool = SamplePool {
            side: 70_000,
            max_depth: 1,
            camera_samples: Vec::new(),
            intersection_samples: Vec::new(),
            generation: 0,
        };
        assert_eq!(pool.len(), 4_900_000_000_usize);
    }
}
