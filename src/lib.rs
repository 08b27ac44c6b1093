// bootsample — GPU-accelerated bootstrap resampling of means.
//
// Given a vector of f32 observations, produce N independently resampled
// means in parallel: one xorwow PRNG stream per bootstrap replicate,
// each drawing the input with replacement on the compute device.
//
// The CPU modules double as the correctness oracle for the GPU session:
// host and device generators are bit-identical by construction, so
// `bootstrap::CpuBootstrap` predicts `gpu::session::BootstrapSession`
// output exactly.

pub mod bootstrap;
pub mod sample;
pub mod xorwow;

pub mod gpu;

pub use bootstrap::CpuBootstrap;
pub use gpu::session::BootstrapSession;
