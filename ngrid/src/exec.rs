//! Dispatches a cataloged kernel against the shared context (specification
//! §2 "Control flow", §4.5's "compute convenience" combined dispatch).
//!
//! Every `NGrid` operation funnels through [`dispatch`]: it resolves (or
//! builds and caches) the `(ComputePipeline, DescriptorSetLayout)` pair
//! for a [`ngrid_shaders::Kernel`] at a given workgroup size, allocates a
//! descriptor set from the shared pool, binds the caller's buffers in
//! declared order, and blocks on a transient fence — matching §2's "By
//! default waits on a fence before returning the result."

use std::sync::Arc;

use gctx::error::fatal;
use gctx::vk;
use gctx::{ComputePipeline, DescriptorSetLayout, DescriptorSetLayoutBuilder, QueueFamilyRole, SharedContext, ShaderModule, WorkgroupSize};
use ngrid_shaders::Kernel;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Overall deadline for a single dispatch-and-wait: the per-cycle timeout
/// (`ContextConfig::fence_timeout_nanos`) is repeated until this elapses,
/// per §5's "default fence timeout ... repeated until signaled."
const MAX_WAIT_NANOS: u64 = 30_000_000_000;

struct CachedKernel {
    pipeline: ComputePipeline,
    layout: DescriptorSetLayout,
}

type CacheKey = (Kernel, u32, u32, u32);

static CACHE: OnceCell<Mutex<FxHashMap<CacheKey, Arc<CachedKernel>>>> = OnceCell::new();

/// Number of storage-buffer bindings each kernel's shader declares, in
/// binding order — see the corresponding `.comp` source in
/// `ngrid-shaders/shaders/`.
fn binding_count(kernel: Kernel) -> u32 {
    match kernel {
        Kernel::ElementwiseBinary => 5,
        Kernel::ElementwiseScalar => 3,
        Kernel::ElementwiseUnary => 2,
        Kernel::Trig => 2,
        Kernel::Comparison => 5,
        Kernel::Activation => 2,
        Kernel::Fill => 2,
        Kernel::RandomFill => 1,
        Kernel::ReduceLocal => 2,
        Kernel::ReduceGlobal => 2,
        Kernel::Matmul => 3,
        Kernel::Hadamard => 3,
        Kernel::Transpose => 6,
        Kernel::Concatenate => 4,
        Kernel::Padding => 6,
        Kernel::Mirror => 4,
        Kernel::Subgrid => 5,
        Kernel::Convolution => 3,
        Kernel::Pool => 2,
        Kernel::SortBrick => 1,
        Kernel::LuPivot => 2,
        Kernel::LuSwap => 2,
        Kernel::LuLcol => 1,
        Kernel::LuUtrail => 1,
        Kernel::TriInvLower => 2,
        Kernel::TriInvUpper => 2,
    }
}

/// Byte size of each kernel's push-constant block, matching its `.comp`
/// source's `PushConstants` struct (every field is a 4-byte `uint` or
/// `float`).
fn push_constant_size(kernel: Kernel) -> u32 {
    match kernel {
        Kernel::ElementwiseBinary => 16,
        Kernel::ElementwiseScalar => 12,
        Kernel::ElementwiseUnary => 8,
        Kernel::Trig => 16,
        Kernel::Comparison => 16,
        Kernel::Activation => 16,
        Kernel::Fill => 24,
        Kernel::RandomFill => 24,
        Kernel::ReduceLocal => 8,
        Kernel::ReduceGlobal => 16,
        Kernel::Matmul => 12,
        Kernel::Hadamard => 4,
        Kernel::Transpose => 8,
        Kernel::Concatenate => 20,
        Kernel::Padding => 8,
        Kernel::Mirror => 12,
        Kernel::Subgrid => 8,
        Kernel::Convolution => 20,
        Kernel::Pool => 40,
        Kernel::SortBrick => 16,
        Kernel::LuPivot => 8,
        Kernel::LuSwap => 8,
        Kernel::LuLcol => 8,
        Kernel::LuUtrail => 8,
        Kernel::TriInvLower => 8,
        Kernel::TriInvUpper => 8,
    }
}

fn get_or_build(kernel: Kernel, workgroup: WorkgroupSize) -> Arc<CachedKernel> {
    let cache = CACHE.get_or_init(|| Mutex::new(FxHashMap::default()));
    let key = (kernel, workgroup.x, workgroup.y, workgroup.z);

    if let Some(existing) = cache.lock().get(&key) {
        return existing.clone();
    }

    let ctx = SharedContext::get();
    let device = ctx.device.shared();

    let shader = ShaderModule::new(&device, kernel.spirv_bytes());
    let mut builder = DescriptorSetLayoutBuilder::new();
    for _ in 0..binding_count(kernel) {
        builder = builder.push_storage_buffer(vk::ShaderStageFlags::COMPUTE);
    }
    let layout = builder.finalize(&device);
    let pipeline = ComputePipeline::new(
        &device,
        &shader,
        kernel.entry_point(),
        &layout,
        push_constant_size(kernel),
        workgroup,
    );

    let built = Arc::new(CachedKernel { pipeline, layout });
    cache.lock().insert(key, built.clone());
    built
}

/// Binds `buffers` (in the kernel's declared binding order) and
/// `push_constants`, dispatches over `global_size`, and blocks until the
/// GPU completes, per the "compute convenience" contract of §4.5.
pub fn dispatch(
    kernel: Kernel,
    workgroup: WorkgroupSize,
    buffers: &[vk::Buffer],
    push_constants: &[u8],
    global_size: (u32, u32, u32),
) {
    if buffers.len() as u32 != binding_count(kernel) {
        fatal(format!(
            "{kernel:?} expects {} bound buffers, got {}",
            binding_count(kernel),
            buffers.len()
        ));
    }
    if push_constants.len() as u32 != push_constant_size(kernel) {
        fatal(format!(
            "{kernel:?} expects {} push-constant bytes, got {}",
            push_constant_size(kernel),
            push_constants.len()
        ));
    }

    let cached = get_or_build(kernel, workgroup);
    let ctx = SharedContext::get();
    let mut set = ctx.descriptor_pool.allocate(&cached.layout);
    for (i, &buffer) in buffers.iter().enumerate() {
        set.bind_buffer(i as u32, buffer, vk::DescriptorType::STORAGE_BUFFER);
    }

    let queue = ctx.queue(QueueFamilyRole::Compute);
    let pool = ctx.pool_for(QueueFamilyRole::Compute);
    let device = ctx.device.shared();

    let result = gctx::dispatch_compute_and_wait(
        pool,
        &device,
        queue.raw(),
        &cached.pipeline,
        &set,
        push_constants,
        global_size,
        ctx.config.fence_timeout_nanos,
        MAX_WAIT_NANOS,
    );
    if let Err(err) = result {
        fatal(format!("{kernel:?} dispatch timed out: {err}"));
    }
}

/// Dispatches `n` elements over a 1-D grid using the context's configured
/// default workgroup size (§6's "default workgroup size for 1-D
/// dispatches (default 256)").
pub fn dispatch_1d(kernel: Kernel, n: u32, buffers: &[vk::Buffer], push_constants: &[u8]) {
    let wg = SharedContext::get().config.default_workgroup_size_1d;
    dispatch(kernel, WorkgroupSize::new_1d(wg), buffers, push_constants, (n, 1, 1));
}

/// Dispatches over a 2-D grid using the context's configured default 2-D
/// workgroup size.
pub fn dispatch_2d(
    kernel: Kernel,
    gx: u32,
    gy: u32,
    buffers: &[vk::Buffer],
    push_constants: &[u8],
) {
    let (wx, wy) = SharedContext::get().config.default_workgroup_size_2d;
    dispatch(kernel, WorkgroupSize::new_2d(wx, wy), buffers, push_constants, (gx, gy, 1));
}

/// Dispatches over a 3-D grid (used by convolution/pooling's
/// width×height×channels geometry), reusing the default 2-D workgroup
/// size for the x/y extent and a unit size on z.
pub fn dispatch_3d(
    kernel: Kernel,
    gx: u32,
    gy: u32,
    gz: u32,
    buffers: &[vk::Buffer],
    push_constants: &[u8],
) {
    let (wx, wy) = SharedContext::get().config.default_workgroup_size_2d;
    dispatch(kernel, WorkgroupSize { x: wx, y: wy, z: 1 }, buffers, push_constants, (gx, gy, gz));
}
