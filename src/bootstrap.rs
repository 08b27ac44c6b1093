// bootstrap.rs — CPU reference bootstrap resampler.
//
// This is the authoritative reference for the GPU session: same xorwow
// streams, same draw order, same indexing (`next % effective_count`),
// same sequential f32 accumulation. The GPU integration tests validate
// `gpu::session::BootstrapSession` against this module stream-for-stream.
//
// It is also usable on its own as a (slow) fallback when no compute
// device is present, which is why it lives at the crate top level rather
// than under a test module.
//
// STREAM PERSISTENCE SEMANTICS
// ─────────────────────────────
// Streams are derived once — at construction or `set_parameters` — and
// evolve across `resample` calls. Two consecutive calls with identical
// input therefore return *different* means; two fresh resamplers with
// identical (seed, sample_count) return bit-identical call sequences.
// The GPU session implements the same semantic (its state buffer is
// written by `init_stream` only at configuration time).

use crate::sample::{self, StagedInput, MISSING};
use crate::xorwow::XorwowState;

/// CPU bootstrap resampler: N independent streams, one mean per stream.
pub struct CpuBootstrap {
    sample_count: usize,
    seed: u32,
    streams: Vec<XorwowState>,
}

impl CpuBootstrap {
    /// Create a resampler with `sample_count` streams seeded from `seed`.
    ///
    /// Unlike the GPU session, which reports misuse as `Error` values,
    /// this reference type treats misuse as a programming error.
    ///
    /// # Panics
    /// Panics if `sample_count` is zero.
    pub fn new(sample_count: usize, seed: u32) -> Self {
        assert!(sample_count >= 1, "sample_count must be >= 1");
        let mut b = CpuBootstrap {
            sample_count,
            seed,
            streams: Vec::new(),
        };
        b.reseed();
        b
    }

    /// Re-derive every stream from new parameters. Discards all evolved
    /// stream state.
    ///
    /// # Panics
    /// Panics if `sample_count` is zero.
    pub fn set_parameters(&mut self, sample_count: usize, seed: u32) {
        assert!(sample_count >= 1, "sample_count must be >= 1");
        self.sample_count = sample_count;
        self.seed = seed;
        self.reseed();
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    fn reseed(&mut self) {
        self.streams = (0..self.sample_count)
            .map(|i| XorwowState::init(self.seed, i as u32))
            .collect();
    }

    /// Compute `sample_count` bootstrapped means of `values`.
    ///
    /// NaN entries are treated as missing and filtered out first. If no
    /// valid value remains the result is `sample_count` copies of the
    /// missing sentinel and no stream is advanced.
    ///
    /// Each stream draws `effective_count` values with replacement and
    /// returns the f32 mean of its draws, exactly as the device kernel
    /// does: index = next_u32 % effective_count, sum accumulated in f32
    /// in draw order.
    pub fn resample(&mut self, values: &[f32]) -> Vec<f32> {
        let staged = match sample::stage(values) {
            StagedInput::AllMissing => return vec![MISSING; self.sample_count],
            StagedInput::Values(v) => v,
        };
        let len = staged.len();
        self.streams
            .iter_mut()
            .map(|stream| {
                let mut sum = 0.0f32;
                for _ in 0..len {
                    let idx = (stream.next_u32() as usize) % len;
                    sum += staged[idx];
                }
                sum / len as f32
            })
            .collect()
    }

    /// One raw u32 draw from each of the first `count` streams.
    ///
    /// Diagnostic twin of `BootstrapSession::raw_stream_values` — the
    /// device must return exactly these values for a freshly configured
    /// session with the same (seed, sample_count).
    ///
    /// # Panics
    /// Panics if `count` exceeds `sample_count`.
    pub fn raw_stream_values(&mut self, count: usize) -> Vec<u32> {
        assert!(
            count <= self.sample_count,
            "count ({count}) exceeds sample_count ({})",
            self.sample_count
        );
        self.streams[..count]
            .iter_mut()
            .map(|s| s.next_u32())
            .collect()
    }
}
