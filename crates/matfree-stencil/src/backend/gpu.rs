//! wgpu compute backend
//!
//! Pipelines are compiled once at stencil construction; each `apply`/
//! `adjoint` call uploads the signal, dispatches one compute pass per
//! kernel stage, and reads the result back through a staging buffer.
//!
//! Working precision is f32 (storage buffers do not carry f64); a stencil
//! built on f64 refuses the GPU backend at construction. Separable kernels
//! run one axis pass per non-identity axis over a `(pre, n, post)` grid, so
//! any signal rank is supported; joint kernels are limited to rank 3, the
//! device grid cap. Leading batch dimensions loop on the host, one
//! dispatch sequence per batch index.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use matfree_core::boundary::BoundaryMode;
use matfree_core::error::{Error, Result};
use matfree_core::numeric::Scalar;

use super::{plan_dispatch, plan_workgroup};
use crate::kernel::KernelSpec;

const AXIS_SHADER: &str = include_str!("shaders/correlate_axis.wgsl");
const ND_SHADER: &str = include_str!("shaders/correlate_nd.wgsl");

/// Device-wide max-threads-per-workgroup budget used by the grid heuristic
const MAX_THREADS: u32 = 256;

/// Holds the wgpu device and queue used for stencil compute pipelines.
pub(crate) struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    fn new() -> std::result::Result<Self, String> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(
            instance.request_adapter(&wgpu::RequestAdapterOptions::default()),
        )
        .map_err(|e| format!("adapter request failed: {e}"))?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|e| format!("device request failed: {e}"))?;
        Ok(Self { device, queue })
    }
}

lazy_static::lazy_static! {
    static ref CONTEXT: std::result::Result<GpuContext, String> = GpuContext::new();
}

fn context() -> Result<&'static GpuContext> {
    CONTEXT
        .as_ref()
        .map_err(|e| Error::Backend(format!("wgpu initialization failed: {e}")))
}

fn mode_code(mode: BoundaryMode) -> u32 {
    match mode {
        BoundaryMode::Constant => 0,
        BoundaryMode::Wrap => 1,
        BoundaryMode::Reflect => 2,
        BoundaryMode::Symmetric => 3,
        BoundaryMode::Edge => 4,
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct AxisParams {
    pre: u32,
    n: u32,
    post: u32,
    klen: u32,
    center: u32,
    mode: u32,
    _pad0: u32,
    _pad1: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct NdParams {
    shape: [u32; 4],
    kshape: [u32; 4],
    center: [u32; 4],
    modes: [u32; 4],
}

struct AxisPass {
    axis: usize,
    pipeline: wgpu::ComputePipeline,
    workgroup: [u32; 3],
}

struct FullPass {
    pipeline: wgpu::ComputePipeline,
    workgroup: [u32; 3],
}

enum Plan {
    Separable(Vec<AxisPass>),
    Full(FullPass),
}

/// Compiled device pipelines for one stencil (forward and adjoint share
/// them: the adjoint kernel has identical extents).
pub(crate) struct GpuStencil {
    plan: Plan,
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    workgroup: [u32; 3],
) -> wgpu::ComputePipeline {
    let source = source
        .replace("{{WG_X}}", &workgroup[0].to_string())
        .replace("{{WG_Y}}", &workgroup[1].to_string())
        .replace("{{WG_Z}}", &workgroup[2].to_string());
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: None,
        module: &module,
        entry_point: Some("main"),
        cache: None,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    })
}

/// Pad a slow-side-first view of per-axis values into grid order
/// (x = last signal axis); absent slow axes take `fill`.
fn grid_order(values: &[usize], fill: u32) -> [u32; 3] {
    let mut out = [fill; 3];
    for (g, &v) in values.iter().rev().take(3).enumerate() {
        out[g] = v as u32;
    }
    out
}

impl GpuStencil {
    pub(crate) fn new<T: Scalar>(spec: &KernelSpec<T>) -> Result<Self> {
        let ctx = context()?;
        let plan = match spec {
            KernelSpec::Separable(axes) => {
                let mut passes = Vec::new();
                for (axis, k) in axes.iter().enumerate() {
                    if k.is_identity() {
                        continue;
                    }
                    // grid = (post, n, pre); the kernel only spans the n axis
                    let workgroup = plan_workgroup(&[1, k.len(), 1], MAX_THREADS);
                    let pipeline = build_pipeline(
                        &ctx.device,
                        "stencil_axis_pass",
                        AXIS_SHADER,
                        workgroup,
                    );
                    passes.push(AxisPass {
                        axis,
                        pipeline,
                        workgroup,
                    });
                }
                Plan::Separable(passes)
            }
            KernelSpec::Full(k) => {
                if k.ndim() > 3 {
                    return Err(Error::Backend(format!(
                        "joint kernels of rank {} exceed the 3-d device grid; \
                         use a separable kernel or the CPU backend",
                        k.ndim()
                    )));
                }
                let workgroup = plan_workgroup(
                    &grid_order(k.shape(), 1).map(|v| v as usize),
                    MAX_THREADS,
                );
                let pipeline =
                    build_pipeline(&ctx.device, "stencil_nd", ND_SHADER, workgroup);
                Plan::Full(FullPass {
                    pipeline,
                    workgroup,
                })
            }
        };
        Ok(Self { plan })
    }

    /// Correlate one unbatched f32 signal on the device.
    pub(crate) fn correlate<T: Scalar>(
        &self,
        input: &[T],
        out: &mut [T],
        shape: &[usize],
        spec: &KernelSpec<T>,
        modes: &[BoundaryMode],
    ) -> Result<()> {
        if T::PRECISION != matfree_core::precision::Precision::Single {
            return Err(Error::Backend(
                "the GPU backend computes in f32; build the stencil on f32 data".to_string(),
            ));
        }
        let xs: &[f32] = bytemuck::cast_slice(input);
        let ctx = context()?;
        let bytes = (xs.len() * 4) as u64;

        let buf_a = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("stencil_src"),
                contents: bytemuck::cast_slice(xs),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            });
        let buf_b = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stencil_dst"),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stencil_encoder"),
            });

        // (src, dst) flips after every pass
        let mut src = &buf_a;
        let mut dst = &buf_b;
        let mut passes_run = 0usize;

        match (&self.plan, spec) {
            (Plan::Separable(passes), KernelSpec::Separable(axes)) => {
                for pass in passes {
                    let k = &axes[pass.axis];
                    let pre: usize = shape[..pass.axis].iter().product();
                    let n = shape[pass.axis];
                    let post: usize = shape[pass.axis + 1..].iter().product();

                    let params = AxisParams {
                        pre: pre as u32,
                        n: n as u32,
                        post: post as u32,
                        klen: k.len() as u32,
                        center: k.center() as u32,
                        mode: mode_code(modes[pass.axis]),
                        _pad0: 0,
                        _pad1: 0,
                    };
                    let taps: Vec<f32> = k.taps().iter().map(|t| t.as_f64() as f32).collect();
                    let counts = plan_dispatch(&[post, n, pre], pass.workgroup);
                    self.encode_pass(
                        ctx,
                        &mut encoder,
                        &pass.pipeline,
                        bytemuck::bytes_of(&params),
                        &taps,
                        src,
                        dst,
                        counts,
                    );
                    std::mem::swap(&mut src, &mut dst);
                    passes_run += 1;
                }
            }
            (Plan::Full(pass), KernelSpec::Full(k)) => {
                let mode_codes: Vec<usize> =
                    modes.iter().map(|&m| mode_code(m) as usize).collect();
                let params = NdParams {
                    shape: pad4(grid_order(shape, 1)),
                    kshape: pad4(grid_order(k.shape(), 1)),
                    center: pad4(grid_order(k.center(), 0)),
                    modes: pad4(grid_order(&mode_codes, 0)),
                };
                let taps: Vec<f32> = k.data().iter().map(|t| t.as_f64() as f32).collect();
                let counts = plan_dispatch(
                    &grid_order(shape, 1).map(|v| v as usize),
                    pass.workgroup,
                );
                self.encode_pass(
                    ctx,
                    &mut encoder,
                    &pass.pipeline,
                    bytemuck::bytes_of(&params),
                    &taps,
                    src,
                    dst,
                    counts,
                );
                std::mem::swap(&mut src, &mut dst);
                passes_run += 1;
            }
            _ => {
                return Err(Error::Backend(
                    "kernel form changed after pipeline construction".to_string(),
                ))
            }
        }

        if passes_run == 0 {
            // identity stencil
            out.copy_from_slice(input);
            return Ok(());
        }

        // the final result lives in `src` after the last swap
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stencil_staging"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_buffer_to_buffer(src, 0, &staging, 0, bytes);
        ctx.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            assert!(r.is_ok());
        });
        ctx.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| Error::Backend(format!("device poll failed: {e:?}")))?;

        let data = slice.get_mapped_range();
        bytemuck::cast_slice_mut::<T, f32>(out).copy_from_slice(bytemuck::cast_slice(&data));
        drop(data);
        staging.unmap();
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_pass(
        &self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        params: &[u8],
        taps: &[f32],
        src: &wgpu::Buffer,
        dst: &wgpu::Buffer,
        counts: [u32; 3],
    ) {
        let params_buf = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("stencil_params"),
                contents: params,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let taps_buf = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("stencil_taps"),
                contents: bytemuck::cast_slice(taps),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stencil_bind_group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: taps_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: src.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: dst.as_entire_binding(),
                },
            ],
        });
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("stencil_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(counts[0], counts[1], counts[2]);
    }
}

fn pad4(values: [u32; 3]) -> [u32; 4] {
    [values[0], values[1], values[2], 0]
}
