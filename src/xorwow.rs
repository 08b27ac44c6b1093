// xorwow.rs — host-side xorwow PRNG.
//
// Reference: Marsaglia, "Xorshift RNGs" (JSS 2003), §3.1 ("xorwow").
// The same generator curand uses for its XORWOW engine: a five-word
// xorshift register combined with a Weyl sequence (d += 362437) to break
// the short cycles a pure xorshift can fall into.
//
// This is the *oracle* for the device generator: the WGSL kernels in
// shaders/bootstrap.wgsl implement bit-for-bit the same init and step
// functions, so any (seed, stream, call sequence) yields the identical
// u32 sequence on host and device. The GPU integration tests rely on
// this to verify device output against this module.
//
// All arithmetic is wrapping u32 — WGSL integer arithmetic wraps by
// definition, so the host side must use the wrapping_* forms throughout.

use bytemuck::{Pod, Zeroable};

/// Weyl increment added to `d` on every step (Marsaglia's constant).
const WEYL_INCREMENT: u32 = 362437;

/// Multiplier used to spread stream indices across the seed space before
/// mixing. 0x9E3779B9 is the golden-ratio constant; multiplication by it
/// is injective mod 2^32 (it is odd), so distinct streams never collapse
/// onto the same mixer starting point for a fixed seed.
const STREAM_SPREAD: u32 = 0x9E37_79B9;

/// One xorwow stream: five-word shift register plus Weyl counter.
///
/// `#[repr(C)]` with no padding (24 bytes) — this exact layout is what
/// the session uploads into the device-side state buffer, and what the
/// WGSL `XorwowState` struct mirrors.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct XorwowState {
    /// Shift register words.
    pub x: [u32; 5],
    /// Weyl counter, incremented by `WEYL_INCREMENT` per step.
    pub d: u32,
}

impl XorwowState {
    /// Derive the state for one stream from (seed, stream index).
    ///
    /// Six splitmix32 outputs fill the register and the counter. The
    /// mixer's finalizer is a bijection on u32, so for a fixed seed the
    /// 1000 streams of a typical session provably receive 1000 distinct
    /// `x[0]` words — no two streams can alias the same trajectory.
    ///
    /// An all-zero shift register is a fixed point of the xorshift
    /// feedback; it cannot occur from distinct mixer outputs in practice,
    /// but it is repaired anyway so the invariant holds unconditionally.
    pub fn init(seed: u32, stream: u32) -> Self {
        let mut z = seed ^ stream.wrapping_mul(STREAM_SPREAD);
        let mut x = [0u32; 5];
        for w in &mut x {
            *w = splitmix32(&mut z);
        }
        let d = splitmix32(&mut z);
        if x.iter().all(|&w| w == 0) {
            x[0] = 1 | stream;
        }
        XorwowState { x, d }
    }

    /// Advance the stream one step and return the next u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut t = self.x[4];
        let s = self.x[0];
        self.x[4] = self.x[3];
        self.x[3] = self.x[2];
        self.x[2] = self.x[1];
        self.x[1] = s;
        t ^= t >> 2;
        t ^= t << 1;
        t ^= s ^ (s << 4);
        self.x[0] = t;
        self.d = self.d.wrapping_add(WEYL_INCREMENT);
        t.wrapping_add(self.d)
    }

    /// Uniform f32 in [0, 1) from the top 24 bits of the next draw.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
    }
}

/// splitmix32 step: advance `z` by the golden-ratio constant and return
/// the mixed value. The murmur3-style finalizer (shift-xor-multiply) is
/// invertible, which is what makes per-stream `x[0]` collisions
/// impossible for a fixed seed.
fn splitmix32(z: &mut u32) -> u32 {
    *z = z.wrapping_add(0x9E37_79B9);
    let mut v = *z;
    v = (v ^ (v >> 16)).wrapping_mul(0x21F0_AAAD);
    v = (v ^ (v >> 15)).wrapping_mul(0x735A_2D97);
    v ^ (v >> 15)
}
