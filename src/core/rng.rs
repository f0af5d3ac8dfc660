//! Random Number Generator

// others
use hexf::*;

// wavefront
use crate::core::pbrt::Float;
use crate::core::sampling::utilhash;

pub const FLOAT_ONE_MINUS_EPSILON: Float = hexf32!("0x1.fffffep-1");
pub const PCG32_DEFAULT_STATE: u64 = 0x853c_49e6_748f_ea9b;
pub const PCG32_DEFAULT_STREAM: u64 = 0xda3e_39cb_94b9_5bdb;
pub const PCG32_MULT: u64 = 0x5851_f42d_4c95_7f2d;

/// Random number generator
#[derive(Debug, Default, Copy, Clone)]
pub struct Rng {
    state: u64,
    inc: u64,
}

impl Rng {
    pub fn new() -> Self {
        Rng {
            state: PCG32_DEFAULT_STATE,
            inc: PCG32_DEFAULT_STREAM,
        }
    }
    /// The engine used for the independent jitter of one path at one
    /// depth of one iteration. The same triple always yields the same
    /// stream.
    pub fn for_path(iteration: u32, index: usize, depth: u32) -> Self {
        // iteration and depth are hashed separately, the pixel index
        // selects the low half of the sequence
        let step: u64 = utilhash(utilhash(iteration) ^ depth) as u64;
        let pixel: u64 = utilhash(index as u32) as u64;
        let mut rng: Rng = Rng::new();
        rng.set_sequence((step << 31) ^ pixel);
        rng
    }
    pub fn set_sequence(&mut self, initseq: u64) {
        self.state = 0_u64;
        self.inc = initseq.wrapping_shl(1) | 1;
        self.uniform_uint32();
        self.state = self.state.wrapping_add(PCG32_DEFAULT_STATE);
        self.uniform_uint32();
    }
    pub fn uniform_uint32(&mut self) -> u32 {
        let oldstate: u64 = self.state;
        // C++: state = oldstate * PCG32_MULT + inc;
        self.state = oldstate.wrapping_mul(PCG32_MULT).wrapping_add(self.inc);
        // C++: uint32_t xorshifted = (uint32_t)(((oldstate >> 18u) ^ oldstate) >> 27u);
        let xorshifted: u32 = (oldstate.wrapping_shr(18) ^ oldstate).wrapping_shr(27) as u32;
        // C++: uint32_t rot = (uint32_t)(oldstate >> 59u);
        let rot: u32 = oldstate.wrapping_shr(59) as u32;
        // C++: return (xorshifted >> rot) | (xorshifted << ((~rot + 1u) & 31));
        xorshifted.wrapping_shr(rot)
            | xorshifted.wrapping_shl(rot.wrapping_neg().wrapping_add(1_u32) & 31)
    }
    pub fn uniform_uint32_bounded(&mut self, b: u32) -> u32 {
        // bitwise not in Rust is ! (not the ~ operator like in C)
        let threshold = (!b).wrapping_add(1) % b;
        loop {
            let r = self.uniform_uint32();
            if r >= threshold {
                return r % b;
            }
        }
    }
    pub fn uniform_float(&mut self) -> Float {
        (self.uniform_uint32() as Float * hexf32!("0x1.0p-32") as Float)
            .min(FLOAT_ONE_MINUS_EPSILON)
    }
}
