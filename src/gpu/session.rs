// gpu/session.rs — the bootstrap resampling session.
//
// A `BootstrapSession` owns everything device-side for one
// parameterization (sample_count N, seed S, local size G):
//
//   - the selected device and its in-order queue,
//   - the compiled shader module and its three compute pipelines
//     (init_stream / generate / bootstrap),
//   - the long-lived buffers: PRNG-state (N × 24 B), params uniform,
//     output (N × 4 B) and readback (N × 4 B).
//
// Per `resample` call only the input buffer is created (sized to the
// post-filter effective count, dropped at the end of the call) and the
// params uniform is rewritten. State and output buffers are reused
// verbatim across calls.
//
// BLOCKING MODEL
// ───────────────
// Every public call blocks until the device is done: submit followed by
// `device.poll(Maintain::Wait)` (directly, or via the mapped readback).
// There is no overlapping dispatch and no cross-call concurrency within
// a session; `&mut self` on the mutating calls enforces the
// single-writer discipline. Independent sessions own disjoint resources
// and may run concurrently.
//
// STATE MACHINE
// ──────────────
// `inner: Option<SessionInner>` is the whole state machine: `Some` is
// Ready, `None` is Released. Configuring happens inside `new` /
// `set_parameters`, which drain and drop the previous inner *before*
// rebuilding (device selection repeated), so a stale handle is never
// reachable and a failed reconfigure leaves the session Released rather
// than pretending to be usable. `release()` is idempotent; `Drop` calls
// it.
//
// STREAM PERSISTENCE
// ───────────────────
// `init_stream` runs once per configuration. Streams evolve across
// `resample` calls and are re-derived only by `set_parameters` — the
// same semantic as the CPU reference in src/bootstrap.rs, which the GPU
// tests use as the oracle.

use wgpu::util::DeviceExt;

use crate::gpu::device::{GpuDevice, LocalSize};
use crate::gpu::error::{Error, Status};
use crate::sample::{self, StagedInput, MISSING};
use crate::xorwow::XorwowState;

/// Uniform parameter block (must match WGSL struct Params exactly).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    sample_count: u32,
    input_len: u32,
    seed: u32,
    raw_count: u32,
}

/// GPU bootstrap resampler: N parallel xorwow streams, one mean per
/// stream per call.
///
/// Construction selects a device, builds the kernel program, allocates
/// the session buffers, and initializes all N streams — construction is
/// expensive, `resample` is cheap.
pub struct BootstrapSession {
    sample_count: u32,
    seed: u32,
    local_size: LocalSize,
    inner: Option<SessionInner>,
}

impl BootstrapSession {
    /// Create a session with the default local size (32).
    pub fn new(sample_count: u32, seed: u32) -> Result<Self, Error> {
        Self::with_local_size(sample_count, seed, LocalSize::default())
    }

    /// Create a session with an explicit local size.
    pub fn with_local_size(
        sample_count: u32,
        seed: u32,
        local_size: LocalSize,
    ) -> Result<Self, Error> {
        validate_sample_count(sample_count)?;
        let inner = SessionInner::configure(sample_count, seed, local_size)?;
        Ok(BootstrapSession {
            sample_count,
            seed,
            local_size,
            inner: Some(inner),
        })
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn local_size(&self) -> LocalSize {
        self.local_size
    }

    /// True once `release()` has run (or a reconfigure has failed).
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Reparameterize: drain and release the previous device binding,
    /// then rebuild from scratch (device selection repeated, all streams
    /// re-derived from the new seed).
    ///
    /// On error the session is left Released, not half-configured.
    pub fn set_parameters(&mut self, sample_count: u32, seed: u32) -> Result<(), Error> {
        validate_sample_count(sample_count)?;
        if let Some(inner) = self.inner.take() {
            inner.drain();
            // Previous buffers, pipelines, queue and device are released
            // here, before any new resource exists.
            drop(inner);
        }
        self.sample_count = sample_count;
        self.seed = seed;
        eprintln!("[bootsample] reconfigure: sample_count={sample_count} seed={seed}");
        self.inner = Some(SessionInner::configure(sample_count, seed, self.local_size)?);
        Ok(())
    }

    /// Change the work-group size. Rebuilds the pipelines (the size is
    /// baked into the shader); buffers and stream states are preserved.
    pub fn set_local_item_size(&mut self, size: u32) -> Result<(), Error> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(released)?;
        validate_local_size(size, inner.gpu.max_local_size())?;
        let local = LocalSize::new(size);
        inner.pipelines = Pipelines::build(&inner.gpu, local)?;
        self.local_size = local;
        Ok(())
    }

    /// Compute `sample_count` bootstrapped means of `values`.
    ///
    /// NaN entries are missing and filtered out before upload. If no
    /// valid value remains, a sentinel-filled vector is returned without
    /// any device work (a zero-length device buffer is unsupported, so
    /// this path is mandatory, not an optimization).
    ///
    /// Output length always equals `sample_count`, independent of the
    /// input length. Streams advance by `effective_count` draws each.
    pub fn resample(&mut self, values: &[f32]) -> Result<Vec<f32>, Error> {
        let inner = self.inner.as_ref().ok_or_else(released)?;
        let staged = match sample::stage(values) {
            StagedInput::AllMissing => {
                return Ok(vec![MISSING; self.sample_count as usize]);
            }
            StagedInput::Values(v) => v,
        };
        inner.bootstrap(self.sample_count, self.seed, self.local_size, &staged)
    }

    /// Diagnostic: one raw u32 from each of the first `count` streams.
    ///
    /// Exists solely to verify device PRNG output against the host
    /// oracle (`xorwow::XorwowState` / `CpuBootstrap::raw_stream_values`).
    /// Advances exactly the first `count` streams.
    pub fn raw_stream_values(&mut self, count: u32) -> Result<Vec<u32>, Error> {
        let inner = self.inner.as_ref().ok_or_else(released)?;
        if count == 0 || count > self.sample_count {
            return Err(Error::invalid_input(format!(
                "raw stream count {count} outside 1..={}",
                self.sample_count
            )));
        }
        inner.generate(self.sample_count, self.seed, self.local_size, count)
    }

    /// Deterministic teardown: drain outstanding device work, then
    /// release buffers, pipelines, device and instance in dependency
    /// order. Idempotent; every later call fails with `InvalidInput`.
    pub fn release(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.drain();
        }
    }
}

impl Drop for BootstrapSession {
    fn drop(&mut self) {
        self.release();
    }
}

fn validate_sample_count(sample_count: u32) -> Result<(), Error> {
    if sample_count == 0 {
        return Err(Error::configuration(
            "set_parameters",
            Status::InvalidArgument,
            "sample_count must be >= 1",
        ));
    }
    Ok(())
}

fn validate_local_size(size: u32, max: u32) -> Result<(), Error> {
    if size == 0 || size > max {
        return Err(Error::configuration(
            "set_local_item_size",
            Status::InvalidArgument,
            format!("local size {size} outside 1..={max}"),
        ));
    }
    Ok(())
}

fn released() -> Error {
    Error::invalid_input("session has been released")
}

// ---------------------------------------------------------------------------
// SessionInner — everything device-side
// ---------------------------------------------------------------------------

/// Field order is teardown order: pipelines and buffers drop before
/// `gpu` (whose own `_instance` field drops last of all).
struct SessionInner {
    pipelines: Pipelines,
    state_buf: wgpu::Buffer,
    params_buf: wgpu::Buffer,
    output_buf: wgpu::Buffer,
    readback_buf: wgpu::Buffer,
    gpu: GpuDevice,
}

impl SessionInner {
    fn configure(
        sample_count: u32,
        seed: u32,
        local_size: LocalSize,
    ) -> Result<Self, Error> {
        let gpu = GpuDevice::select()?;
        validate_local_size(local_size.size, gpu.max_local_size())?;

        let pipelines = Pipelines::build(&gpu, local_size)?;

        let state_size = sample_count as u64 * std::mem::size_of::<XorwowState>() as u64;
        let output_size = sample_count as u64 * std::mem::size_of::<f32>() as u64;

        let state_buf = run_checked(&gpu.device, || {
            gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("bootsample states"),
                size: state_size,
                usage: wgpu::BufferUsages::STORAGE,
                mapped_at_creation: false,
            })
        })
        .map_err(|e| Error::resource("create_state_buffer", &e))?;

        let params_buf = run_checked(&gpu.device, || {
            gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("bootsample params"),
                size: std::mem::size_of::<Params>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
        .map_err(|e| Error::resource("create_params_buffer", &e))?;

        let output_buf = run_checked(&gpu.device, || {
            gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("bootsample output"),
                size: output_size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        })
        .map_err(|e| Error::resource("create_output_buffer", &e))?;

        // Shared by f32 means and u32 raw draws — both 4 bytes/stream,
        // and raw_stream_values never exceeds sample_count. Sized up to
        // MAP_ALIGNMENT so any prefix slice can be mapped.
        let readback_buf = run_checked(&gpu.device, || {
            gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("bootsample readback"),
                size: align_up(output_size, wgpu::MAP_ALIGNMENT),
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
        .map_err(|e| Error::resource("create_readback_buffer", &e))?;

        let inner = SessionInner {
            pipelines,
            state_buf,
            params_buf,
            output_buf,
            readback_buf,
            gpu,
        };
        inner.init_streams(sample_count, seed, local_size)?;
        Ok(inner)
    }

    fn write_params(&self, params: Params) {
        self.gpu
            .queue
            .write_buffer(&self.params_buf, 0, bytemuck::bytes_of(&params));
    }

    /// Blocking wait for all outstanding device work.
    fn drain(&self) {
        self.gpu.device.poll(wgpu::Maintain::Wait);
    }

    /// Dispatch `init_stream` over all N streams and wait.
    fn init_streams(
        &self,
        sample_count: u32,
        seed: u32,
        local_size: LocalSize,
    ) -> Result<(), Error> {
        self.write_params(Params {
            sample_count,
            input_len: 0,
            seed,
            raw_count: 0,
        });
        run_checked(&self.gpu.device, || {
            let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("init_stream BG"),
                layout: &self.pipelines.init_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.state_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.params_buf.as_entire_binding(),
                    },
                ],
            });
            let mut encoder = self.gpu.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor {
                    label: Some("init_stream dispatch"),
                },
            );
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("init_stream"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipelines.init);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(local_size.workgroups(sample_count), 1, 1);
            }
            self.gpu.queue.submit(std::iter::once(encoder.finish()));
        })
        .map_err(|e| Error::execution("init_stream", &e))?;
        self.drain();
        Ok(())
    }

    /// One bootstrap dispatch: stage the input, run N streams, read the
    /// means back. The input buffer lives exactly as long as this call.
    fn bootstrap(
        &self,
        sample_count: u32,
        seed: u32,
        local_size: LocalSize,
        staged: &[f32],
    ) -> Result<Vec<f32>, Error> {
        self.write_params(Params {
            sample_count,
            input_len: staged.len() as u32,
            seed,
            raw_count: 0,
        });

        let input_buf = run_checked(&self.gpu.device, || {
            self.gpu
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("bootsample input"),
                    contents: bytemuck::cast_slice(staged),
                    usage: wgpu::BufferUsages::STORAGE,
                })
        })
        .map_err(|e| Error::resource("create_input_buffer", &e))?;

        let output_bytes = sample_count as u64 * 4;
        run_checked(&self.gpu.device, || {
            let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("bootstrap BG"),
                layout: &self.pipelines.bootstrap_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.state_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.params_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.output_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: input_buf.as_entire_binding(),
                    },
                ],
            });
            let mut encoder = self.gpu.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor {
                    label: Some("bootstrap dispatch"),
                },
            );
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("bootstrap"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipelines.bootstrap);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(local_size.workgroups(sample_count), 1, 1);
            }
            encoder.copy_buffer_to_buffer(&self.output_buf, 0, &self.readback_buf, 0, output_bytes);
            self.gpu.queue.submit(std::iter::once(encoder.finish()));
        })
        .map_err(|e| Error::execution("bootstrap", &e))?;

        let bytes = self.read_back("bootstrap_readback", output_bytes)?;
        Ok(bytemuck::cast_slice::<u8, f32>(&bytes).to_vec())
    }

    /// Diagnostic dispatch: one raw draw from the first `count` streams.
    fn generate(
        &self,
        sample_count: u32,
        seed: u32,
        local_size: LocalSize,
        count: u32,
    ) -> Result<Vec<u32>, Error> {
        self.write_params(Params {
            sample_count,
            input_len: 0,
            seed,
            raw_count: count,
        });

        let raw_bytes = count as u64 * 4;
        let raw_buf = run_checked(&self.gpu.device, || {
            self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("bootsample raw output"),
                size: raw_bytes,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        })
        .map_err(|e| Error::resource("create_raw_buffer", &e))?;

        run_checked(&self.gpu.device, || {
            let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("generate BG"),
                layout: &self.pipelines.generate_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.state_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.params_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: raw_buf.as_entire_binding(),
                    },
                ],
            });
            let mut encoder = self.gpu.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor {
                    label: Some("generate dispatch"),
                },
            );
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("generate"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipelines.generate);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(local_size.workgroups(count), 1, 1);
            }
            encoder.copy_buffer_to_buffer(&raw_buf, 0, &self.readback_buf, 0, raw_bytes);
            self.gpu.queue.submit(std::iter::once(encoder.finish()));
        })
        .map_err(|e| Error::execution("generate", &e))?;

        let bytes = self.read_back("generate_readback", raw_bytes)?;
        Ok(bytemuck::cast_slice::<u8, u32>(&bytes).to_vec())
    }

    /// Blocking map of the first `bytes` of the readback buffer.
    fn read_back(&self, op: &'static str, bytes: u64) -> Result<Vec<u8>, Error> {
        // Mapped ranges must respect MAP_ALIGNMENT; the buffer is sized
        // for this, and the padding tail is truncated after the copy.
        let slice = self
            .readback_buf
            .slice(..align_up(bytes, wgpu::MAP_ALIGNMENT));
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.gpu.device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Error::execution_status(op, Status::Unknown, e.to_string()))
            }
            Err(_) => {
                return Err(Error::execution_status(
                    op,
                    Status::Unknown,
                    "map callback never fired",
                ))
            }
        }
        let mut data = slice.get_mapped_range().to_vec();
        self.readback_buf.unmap();
        data.truncate(bytes as usize);
        Ok(data)
    }
}

/// Round `value` up to the next multiple of `alignment` (a power of two).
fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

// ---------------------------------------------------------------------------
// Pipelines — compiled program + kernel handles
// ---------------------------------------------------------------------------

/// The compiled program and its three kernel handles, built once per
/// configuration (and rebuilt on `set_local_item_size`, which changes
/// the baked workgroup size).
struct Pipelines {
    init: wgpu::ComputePipeline,
    generate: wgpu::ComputePipeline,
    bootstrap: wgpu::ComputePipeline,
    init_bgl: wgpu::BindGroupLayout,
    generate_bgl: wgpu::BindGroupLayout,
    bootstrap_bgl: wgpu::BindGroupLayout,
}

impl Pipelines {
    fn build(gpu: &GpuDevice, local_size: LocalSize) -> Result<Self, Error> {
        let shader_template = include_str!("../shaders/bootstrap.wgsl");
        let shader_src = shader_template.replace("{{WG_SIZE}}", &local_size.size.to_string());

        // Build failure is the one error path with extra diagnostic I/O:
        // the validation scope yields the full compiler log.
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("bootstrap.wgsl"),
                source: wgpu::ShaderSource::Wgsl(shader_src.into()),
            });
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            let log = match &e {
                wgpu::Error::Validation { description, .. } => description.clone(),
                other => other.to_string(),
            };
            return Err(Error::build(log));
        }

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let uniform = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        // Each layout covers exactly the bindings its entry point uses;
        // the shader declares the union at distinct indices.
        let (init, init_bgl) = make_pipeline(
            &gpu.device,
            &shader,
            "init_stream",
            &[storage(0, false), uniform(1)],
        )?;
        let (generate, generate_bgl) = make_pipeline(
            &gpu.device,
            &shader,
            "generate",
            &[storage(0, false), uniform(1), storage(4, false)],
        )?;
        let (bootstrap, bootstrap_bgl) = make_pipeline(
            &gpu.device,
            &shader,
            "bootstrap",
            &[
                storage(0, false),
                uniform(1),
                storage(2, false),
                storage(3, true),
            ],
        )?;

        Ok(Pipelines {
            init,
            generate,
            bootstrap,
            init_bgl,
            generate_bgl,
            bootstrap_bgl,
        })
    }
}

/// Build one compute pipeline (entry point name doubles as the label)
/// together with its bind group layout.
fn make_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    entry_point: &'static str,
    entries: &[wgpu::BindGroupLayoutEntry],
) -> Result<(wgpu::ComputePipeline, wgpu::BindGroupLayout), Error> {
    run_checked(device, || {
        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(entry_point),
            entries,
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(entry_point),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(entry_point),
            layout: Some(&layout),
            module: shader,
            entry_point,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        (pipeline, bgl)
    })
    .map_err(|e| Error::resource("create_pipeline", &e))
}

/// Run `f` inside out-of-memory and validation error scopes, surfacing
/// the first captured wgpu error instead of letting it reach the
/// uncaptured-error handler (which would panic the process).
fn run_checked<T>(
    device: &wgpu::Device,
    f: impl FnOnce() -> T,
) -> Result<T, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let out = f();
    let oom = pollster::block_on(device.pop_error_scope());
    let validation = pollster::block_on(device.pop_error_scope());
    match oom.or(validation) {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
