//! Image space filters applied to the accumulated radiance.
//!
//! ## A-Trous Filter
//!
//! The edge-avoiding A-trous wavelet filter approximates a large
//! blur with a few sparse 5x5 passes whose taps spread twice as far
//! each level. Differences in color, normal and position discount a
//! tap, so geometric edges stay sharp.

pub mod atrous;
