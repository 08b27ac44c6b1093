// gpu/mod.rs — device-side execution layer.
//
// The CPU implementations in the parent crate (xorwow, bootstrap) remain
// the authoritative reference — the GPU session is validated against
// them stream-for-stream by the integration tests in session.rs.
//
// Layering:
//   error.rs   — status mapping + error taxonomy
//   device.rs  — adapter selection, work sizing, enumeration
//   session.rs — the resampling session (pipelines, buffers, dispatch)

pub mod device;
pub mod error;
pub mod session;
