// gpu/device.rs — device selection, work sizing, and enumeration.
//
// Responsibilities:
//   - Enumerate adapters and select the first suitable compute device
//     (GPU preferred, software rasterizers last).
//   - Expose `LocalSize` — the 1-D work-group configuration used to size
//     every dispatch: global size is always the minimal multiple of the
//     local size that covers `sample_count`.
//   - Provide the read-only `enumerate_platforms` / `enumerate_devices`
//     introspection calls for operator diagnostics.
//
// ADAPTER SELECTION:
// wgpu's default `request_adapter` uses power-preference heuristics that
// can grab a software rasterizer when one is installed. We enumerate
// explicitly and select in tiers: real hardware GPUs first, then
// virtual/other adapters, and only as a last resort whatever is left.
// Every candidate is logged to stderr so the operator can see what was
// chosen. No adapter at all is a hard `DeviceNotFound`.

use std::fmt;

use crate::gpu::error::{Error, Status};

/// Default 1-D work-group size. 32 matches one NVIDIA warp and half an
/// AMD wavefront; the bootstrap kernel is bandwidth-bound, so the exact
/// value rarely matters beyond keeping full waves busy.
pub const DEFAULT_LOCAL_SIZE: u32 = 32;

/// 1-D work-group configuration for the bootstrap dispatches.
///
/// The kernels bounds-check their global index, so beyond being nonzero
/// the only constraint on `size` is the device's work-group limits —
/// those are validated by the session against the selected adapter,
/// not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSize {
    pub size: u32,
}

impl LocalSize {
    /// # Panics
    /// Panics if `size` is zero; `workgroups` divides by it.
    pub fn new(size: u32) -> Self {
        assert!(size >= 1, "local size must be >= 1");
        LocalSize { size }
    }

    /// Number of work-groups needed to cover `count` work-items
    /// (ceiling division).
    pub fn workgroups(&self, count: u32) -> u32 {
        (count + self.size - 1) / self.size
    }

    /// Total work-items launched: the minimal multiple of `size` that is
    /// >= `count`. Items in `[count, global)` are no-ops in the kernel.
    pub fn global_size(&self, count: u32) -> u64 {
        self.workgroups(count) as u64 * self.size as u64
    }
}

impl Default for LocalSize {
    fn default() -> Self {
        LocalSize {
            size: DEFAULT_LOCAL_SIZE,
        }
    }
}

impl fmt::Display for LocalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} work-items per group", self.size)
    }
}

/// Cached adapter information for logging and diagnostics.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:?})",
            self.name, self.backend, self.device_type
        )
    }
}

/// The core GPU binding: device, queue, adapter info, and limits.
///
/// Created by the session at configuration time and owned by it for the
/// lifetime of one parameterization — reconfiguring repeats selection.
///
/// # Field drop order
/// Rust drops struct fields in declaration order. `_instance` is
/// declared last so the `wgpu::Instance` outlives `device` and `queue`;
/// some drivers crash when the instance is destroyed while device-level
/// objects still reference it.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: AdapterInfo,
    pub limits: wgpu::Limits,
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Select the first suitable compute device.
    ///
    /// # Errors
    /// `DeviceNotFound` when no adapter exists; a configuration error
    /// when the device request itself is rejected by the driver.
    pub fn select() -> Result<Self, Error> {
        pollster::block_on(Self::select_async())
    }

    async fn select_async() -> Result<Self, Error> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let all_adapters: Vec<wgpu::Adapter> = instance
            .enumerate_adapters(wgpu::Backends::PRIMARY)
            .into_iter()
            .collect();

        if all_adapters.is_empty() {
            return Err(Error::configuration(
                "select_device",
                Status::DeviceNotFound,
                "no compute adapter visible to any primary backend",
            ));
        }

        for a in &all_adapters {
            let info = a.get_info();
            eprintln!(
                "[bootsample] adapter: {} ({:?}, {:?})",
                info.name, info.backend, info.device_type
            );
        }

        // Tier 1: real hardware. Tier 2: virtual / layered adapters.
        // Last resort: software rasterizers — slow but correct.
        let adapter = all_adapters
            .into_iter()
            .find(|a| {
                matches!(
                    a.get_info().device_type,
                    wgpu::DeviceType::DiscreteGpu
                        | wgpu::DeviceType::IntegratedGpu
                        | wgpu::DeviceType::VirtualGpu
                        | wgpu::DeviceType::Other
                )
            })
            .or_else(|| {
                instance
                    .enumerate_adapters(wgpu::Backends::PRIMARY)
                    .into_iter()
                    .next()
            })
            .ok_or_else(|| {
                Error::configuration(
                    "select_device",
                    Status::DeviceNotFound,
                    "no usable compute adapter",
                )
            })?;

        let raw_info = adapter.get_info();
        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            vendor: raw_info.vendor,
            device_type: raw_info.device_type,
            backend: raw_info.backend,
        };
        eprintln!("[bootsample] selected: {adapter_info}");

        let limits = wgpu::Limits::default();
        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("bootsample"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| {
                Error::configuration("request_device", Status::Unknown, e.to_string())
            })?;

        Ok(GpuDevice {
            device,
            queue,
            adapter_info,
            limits,
            _instance: instance,
        })
    }

    /// Largest 1-D work-group size this device accepts.
    pub fn max_local_size(&self) -> u32 {
        self.limits
            .max_compute_workgroup_size_x
            .min(self.limits.max_compute_invocations_per_workgroup)
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GpuDevice {{ adapter: {} }}", self.adapter_info)
    }
}

// ============================================================
// Enumeration utilities (operator diagnostics)
// ============================================================

/// One compute platform: a wgpu backend with at least one adapter.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub backend: wgpu::Backend,
    pub adapter_count: usize,
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} ({} adapter{})",
            self.backend,
            self.adapter_count,
            if self.adapter_count == 1 { "" } else { "s" }
        )
    }
}

/// One compute device with the attributes an operator cares about.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
    pub driver: String,
    pub driver_info: String,
    /// Upper bound on work-items per work-group — the closest analogue
    /// of a "parallel compute units" attribute wgpu exposes portably.
    pub max_invocations: u32,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device: {}", self.name)?;
        writeln!(f, "  Type:            {:?}", self.device_type)?;
        writeln!(f, "  Backend:         {:?}", self.backend)?;
        writeln!(f, "  Vendor id:       {:#06x}", self.vendor)?;
        writeln!(f, "  Driver:          {} {}", self.driver, self.driver_info)?;
        write!(f, "  Max invocations: {}", self.max_invocations)
    }
}

/// List every backend that exposes at least one adapter.
///
/// Read-only; touches no session state.
pub fn enumerate_platforms() -> Vec<PlatformInfo> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let mut platforms: Vec<PlatformInfo> = Vec::new();
    for adapter in instance.enumerate_adapters(wgpu::Backends::all()) {
        let backend = adapter.get_info().backend;
        match platforms.iter_mut().find(|p| p.backend == backend) {
            Some(p) => p.adapter_count += 1,
            None => platforms.push(PlatformInfo {
                backend,
                adapter_count: 1,
            }),
        }
    }
    platforms
}

/// List every visible adapter with its diagnostic attributes.
///
/// Read-only; touches no session state.
pub fn enumerate_devices() -> Vec<DeviceInfo> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .into_iter()
        .map(|adapter| {
            let info = adapter.get_info();
            let limits = adapter.limits();
            DeviceInfo {
                name: info.name,
                vendor: info.vendor,
                device_type: info.device_type,
                backend: info.backend,
                driver: info.driver,
                driver_info: info.driver_info,
                max_invocations: limits.max_compute_invocations_per_workgroup,
            }
        })
        .collect()
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_local_size_is_32() {
        assert_eq!(LocalSize::default().size, DEFAULT_LOCAL_SIZE);
    }

    #[test]
    fn global_size_is_minimal_covering_multiple() {
        // The full grid from the sizing contract: for every (local, n),
        // global is a multiple of local, >= n, and global - local < n.
        for local in [1u32, 17, 32, 256] {
            let ls = LocalSize::new(local);
            for n in [1u32, 31, 32, 33, 1000] {
                let global = ls.global_size(n);
                assert_eq!(global % local as u64, 0, "local={local} n={n}");
                assert!(global >= n as u64, "local={local} n={n} global={global}");
                assert!(
                    global < n as u64 + local as u64,
                    "global {global} not minimal for local={local} n={n}"
                );
            }
        }
    }

    #[test]
    fn exact_multiples_do_not_round_up() {
        let ls = LocalSize::new(32);
        assert_eq!(ls.workgroups(32), 1);
        assert_eq!(ls.workgroups(64), 2);
        assert_eq!(ls.global_size(64), 64);
    }

    #[test]
    #[should_panic(expected = "local size must be >= 1")]
    fn zero_local_size_is_rejected() {
        LocalSize::new(0);
    }

    #[test]
    fn single_item_groups() {
        let ls = LocalSize::new(1);
        assert_eq!(ls.workgroups(1000), 1000);
        assert_eq!(ls.global_size(1000), 1000);
    }
}
