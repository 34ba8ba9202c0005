//! `NGrid`: the n-dimensional GPU tensor value type (specification §3,
//! §4.8).

use std::sync::Arc;

use gctx::error::fatal;
use gctx::vk;
use gctx::{Buffer, BufferUsage, MemoryFlags, QueueFamilyRole, SharedContext};
use ngrid_shaders::Kernel;

use crate::exec;
use crate::shape::Shape;

/// A data buffer's element type is `f32` for every `NGrid`, per §3:
/// "Floats are the sole element type; integer semantics are encoded by
/// values being whole numbers."
pub struct NGrid {
    shape: Shape,
    data: Buffer<f32>,
    shape_buf: Buffer<u32>,
}

type Allocator = Arc<parking_lot::Mutex<gpu_alloc::GpuAllocator<vk::DeviceMemory>>>;

fn device_and_allocator() -> (Arc<gctx::DeviceShared>, Allocator) {
    let ctx = SharedContext::get();
    (ctx.device.shared(), ctx.allocator.clone())
}

pub(crate) fn alloc_data_buffer(count: usize) -> Buffer<f32> {
    let (device, allocator) = device_and_allocator();
    Buffer::new(&device, &allocator, BufferUsage::Storage, count.max(1), MemoryFlags::DEFAULT)
}

fn alloc_shape_buffer(dims: &[u32]) -> Buffer<u32> {
    let (device, allocator) = device_and_allocator();
    let mut buf = Buffer::new(
        &device,
        &allocator,
        BufferUsage::Storage,
        dims.len().max(1),
        MemoryFlags::DEFAULT,
    );
    if !dims.is_empty() {
        buf.write(dims, dims.len(), 0, 0);
    }
    buf
}

/// Allocates a small host-visible storage buffer of `u32` auxiliary
/// parameters (strides, permutations, offsets) for a single dispatch.
pub(crate) fn temp_u32_buffer(values: &[u32]) -> Buffer<u32> {
    let (device, allocator) = device_and_allocator();
    let mut buf = Buffer::new(
        &device,
        &allocator,
        BufferUsage::Storage,
        values.len().max(1),
        MemoryFlags::DEFAULT,
    );
    if !values.is_empty() {
        buf.write(values, values.len(), 0, 0);
    }
    buf
}

impl NGrid {
    /// Shapeless, zero-element grid (§3: "created empty (shapeless, N=0)").
    pub fn empty() -> Self {
        Self {
            shape: Shape::default(),
            data: alloc_data_buffer(0),
            shape_buf: alloc_shape_buffer(&[]),
        }
    }

    /// Allocates a grid of the given shape with every element zeroed.
    pub fn new(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let grid = Self {
            data: alloc_data_buffer(shape.len()),
            shape_buf: alloc_shape_buffer(shape.dims()),
            shape,
        };
        grid.fill_zero_in_place();
        grid
    }

    /// Rank-1 grid constructed from a host vector (§4.8).
    pub fn from_vec(data: Vec<f32>) -> Self {
        let shape = Shape::new(vec![data.len() as u32]);
        let mut buf = alloc_data_buffer(data.len());
        buf.write(&data, data.len(), 0, 0);
        Self {
            shape_buf: alloc_shape_buffer(shape.dims()),
            shape,
            data: buf,
        }
    }

    /// Rank-1 grid constructed from a host pointer and element count
    /// (§4.8's "from host pointer + count (rank-1)"). Caller must ensure
    /// `ptr` is valid for `count` reads of `f32`.
    pub unsafe fn from_raw_parts(ptr: *const f32, count: usize) -> Self {
        let slice = std::slice::from_raw_parts(ptr, count);
        Self::from_vec(slice.to_vec())
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn len(&self) -> usize {
        self.shape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty() || self.shape.len() == 0
    }

    /// Reads the entire grid back to the host. A suspension point per §5:
    /// blocks until prior device work affecting this buffer completes
    /// (host-coherent memory means no explicit flush is needed once the
    /// producing dispatch's fence has been waited on).
    pub fn to_vec(&self) -> Vec<f32> {
        if self.len() == 0 {
            return Vec::new();
        }
        self.data.read(self.len(), 0)
    }

    pub fn get(&self, flat_index: usize) -> f32 {
        self.data.get(flat_index)
    }

    pub fn set(&mut self, flat_index: usize, value: f32) {
        self.data.set(flat_index, value);
    }

    pub(crate) fn data_buf(&self) -> vk::Buffer {
        self.data.raw_handle()
    }

    pub(crate) fn shape_buf_raw(&self) -> vk::Buffer {
        self.shape_buf.raw_handle()
    }

    /// Blocks until the shared context's compute queue is idle, without
    /// reading any data back — the ambient `synchronize()` surface named
    /// in SPEC_FULL's supplemented-features section, useful for
    /// benchmarking a chain of non-read-back operations.
    pub fn synchronize(&self) {
        SharedContext::get().device.wait_idle();
    }

    fn fill_zero_in_place(&self) {
        if self.len() == 0 {
            return;
        }
        let rank = self.rank() as u32;
        let mut push = Vec::with_capacity(24);
        push.extend_from_slice(&(self.len() as u32).to_le_bytes());
        push.extend_from_slice(&rank.to_le_bytes());
        push.extend_from_slice(&0u32.to_le_bytes()); // OP_ZERO
        push.extend_from_slice(&0.0f32.to_le_bytes());
        push.extend_from_slice(&0.0f32.to_le_bytes());
        push.extend_from_slice(&0.0f32.to_le_bytes());
        exec::dispatch_1d(
            Kernel::Fill,
            self.len() as u32,
            &[self.shape_buf_raw(), self.data_buf()],
            &push,
        );
    }

    /// Device-to-device copy of `src`'s first `min(src.len(), dst.len())`
    /// elements into `dst`, via a raw buffer copy + fence wait — used by
    /// [`Clone`] and by [`NGrid::reshape`]'s "copies overlapping prefix"
    /// rule (§4.8).
    fn copy_prefix_from(&mut self, src: &NGrid) {
        let n = self.len().min(src.len());
        if n == 0 {
            return;
        }
        let ctx = SharedContext::get();
        let pool = ctx.pool_for(QueueFamilyRole::Transfer);
        let device = ctx.device.shared();
        let queue = ctx.queue(QueueFamilyRole::Transfer);

        let mut cmd = pool.allocate();
        let region = vk::BufferCopy::builder()
            .src_offset(0)
            .dst_offset(0)
            .size((n * std::mem::size_of::<f32>()) as u64)
            .build();
        cmd.copy_buffer(src.data_buf(), self.data_buf(), &[region]);

        let fence = gctx::Fence::new(&device, false);
        cmd.submit(queue.raw(), Some(&fence));
        if let Err(err) = fence.wait(ctx.config.fence_timeout_nanos, 30_000_000_000) {
            fatal(format!("buffer copy timed out: {err}"));
        }
        cmd.reset();
    }

    /// `reshape(new_shape)`: copies the overlapping prefix; when the new
    /// shape holds more elements than the current one, the tail is
    /// zero-filled (§9 open question, resolved for determinism — see
    /// DESIGN.md).
    pub fn reshape(&self, new_shape: impl Into<Shape>) -> NGrid {
        let new_shape = new_shape.into();
        let mut result = NGrid::new(new_shape);
        result.copy_prefix_from(self);
        result
    }

    pub fn flatten(&self) -> NGrid {
        self.reshape(Shape::new(vec![self.len() as u32]))
    }

    /// `subgrid(offset, shape)`: extracts an axis-aligned region. Every
    /// destination coordinate is in-bounds by construction (the caller
    /// supplies `offset + shape ≤ self.shape` componentwise); out-of-range
    /// requests are a fatal usage error, matching §7's shape-mismatch
    /// policy for linear-algebra-adjacent shape operations.
    pub fn subgrid(&self, offset: &[u32], shape: impl Into<Shape>) -> NGrid {
        let shape = shape.into();
        if offset.len() != self.rank() || shape.rank() != self.rank() {
            fatal("subgrid: offset/shape rank must match the source grid's rank");
        }
        for i in 0..self.rank() {
            if offset[i] + shape.dims()[i] > self.shape.dims()[i] {
                fatal(format!(
                    "subgrid: region [{}, {}) exceeds axis {i} of size {}",
                    offset[i],
                    offset[i] + shape.dims()[i],
                    self.shape.dims()[i]
                ));
            }
        }

        let result = NGrid::new(shape.clone());
        let src_strides = temp_u32_buffer(&self.shape.strides());
        let out_strides = temp_u32_buffer(&shape.strides());
        let starts = temp_u32_buffer(offset);

        let n = result.len() as u32;
        let mut push = Vec::with_capacity(8);
        push.extend_from_slice(&n.to_le_bytes());
        push.extend_from_slice(&(self.rank() as u32).to_le_bytes());

        exec::dispatch_1d(
            Kernel::Subgrid,
            n,
            &[
                self.data_buf(),
                src_strides.raw_handle(),
                out_strides.raw_handle(),
                starts.raw_handle(),
                result.data_buf(),
            ],
            &push,
        );
        result
    }

    /// `transpose(target_axis_order)`: permutes dimensions per §4.8:
    /// `result_multi_index[target_axis_order[i]] = source_multi_index[i]`.
    pub fn transpose(&self, target_axis_order: &[u32]) -> NGrid {
        if target_axis_order.len() != self.rank() {
            fatal("transpose: permutation length must match the source grid's rank");
        }
        let rank = self.rank();
        let mut new_dims = vec![0u32; rank];
        for (src_axis, &dst_axis) in target_axis_order.iter().enumerate() {
            new_dims[dst_axis as usize] = self.shape.dims()[src_axis];
        }
        let new_shape = Shape::new(new_dims);
        let result = NGrid::new(new_shape.clone());

        // The kernel decodes an output multi-index and, for each output
        // axis `d`, needs the source axis whose stride to apply — i.e.
        // the inverse permutation of `target_axis_order`.
        let mut inverse_perm = vec![0u32; rank];
        for (src_axis, &dst_axis) in target_axis_order.iter().enumerate() {
            inverse_perm[dst_axis as usize] = src_axis as u32;
        }

        let strides = temp_u32_buffer(&self.shape.strides());
        let perm = temp_u32_buffer(&inverse_perm);
        let out_strides = temp_u32_buffer(&new_shape.strides());

        let n = result.len() as u32;
        let mut push = Vec::with_capacity(8);
        push.extend_from_slice(&n.to_le_bytes());
        push.extend_from_slice(&(rank as u32).to_le_bytes());

        exec::dispatch_1d(
            Kernel::Transpose,
            n,
            &[
                self.data_buf(),
                self.shape_buf_raw(),
                strides.raw_handle(),
                perm.raw_handle(),
                out_strides.raw_handle(),
                result.data_buf(),
            ],
            &push,
        );
        result
    }

    /// `concatenate(other, axis)`: result shape equals source shape with
    /// `axis` summed against `other`'s (§4.8). Dispatched once per input
    /// grid, each writing into its pre-offset region of the result.
    pub fn concatenate(&self, other: &NGrid, axis: usize) -> NGrid {
        if self.rank() != other.rank() {
            fatal("concatenate: operand ranks must match");
        }
        if axis >= self.rank() {
            fatal(format!("concatenate: axis {axis} out of range for rank {}", self.rank()));
        }
        for i in 0..self.rank() {
            if i != axis && self.shape.dims()[i] != other.shape.dims()[i] {
                fatal(format!("concatenate: shapes differ on non-concatenated axis {i}"));
            }
        }

        let mut new_dims = self.shape.dims().to_vec();
        new_dims[axis] += other.shape.dims()[axis];
        let new_shape = Shape::new(new_dims);
        let result = NGrid::new(new_shape.clone());
        let out_strides = temp_u32_buffer(&new_shape.strides());
        let out_axis_stride = new_shape.strides()[axis];

        for (grid, axis_offset) in [(self, 0u32), (other, self.shape.dims()[axis])] {
            let grid_shape = temp_u32_buffer(grid.shape.dims());
            let n = grid.len() as u32;
            let mut push = Vec::with_capacity(20);
            push.extend_from_slice(&n.to_le_bytes());
            push.extend_from_slice(&(self.rank() as u32).to_le_bytes());
            push.extend_from_slice(&(axis as u32).to_le_bytes());
            push.extend_from_slice(&axis_offset.to_le_bytes());
            push.extend_from_slice(&out_axis_stride.to_le_bytes());

            exec::dispatch_1d(
                Kernel::Concatenate,
                n,
                &[grid.data_buf(), grid_shape.raw_handle(), out_strides.raw_handle(), result.data_buf()],
                &push,
            );
        }
        result
    }

    /// `padding(amount, init_value)`: expands every axis by `amount` on
    /// both sides; padded cells take `init_value` (§4.8).
    pub fn padding(&self, amount: u32, init_value: f32) -> NGrid {
        let new_dims: Vec<u32> = self.shape.dims().iter().map(|&d| d + 2 * amount).collect();
        let new_shape = Shape::new(new_dims);
        let result = NGrid::new(new_shape.clone());
        if init_value != 0.0 {
            result.fill_constant_in_place(init_value);
        }

        let strides = temp_u32_buffer(&self.shape.strides());
        let out_strides = temp_u32_buffer(&new_shape.strides());
        let offsets = temp_u32_buffer(&vec![amount; self.rank()]);

        // Dispatched over the OUTPUT element count: out-of-source
        // coordinates return early, relying on `result` already holding
        // `init_value` everywhere from the fill pass above.
        let n_out = result.len() as u32;
        let mut push = Vec::with_capacity(8);
        push.extend_from_slice(&n_out.to_le_bytes());
        push.extend_from_slice(&(self.rank() as u32).to_le_bytes());

        exec::dispatch_1d(
            Kernel::Padding,
            n_out,
            &[
                self.data_buf(),
                self.shape_buf_raw(),
                strides.raw_handle(),
                out_strides.raw_handle(),
                offsets.raw_handle(),
                result.data_buf(),
            ],
            &push,
        );
        result
    }

    /// `mirror(axes)`: flips indices along every axis set in the
    /// bitmask, per §4.8.
    pub fn mirror(&self, axis_mask: u32) -> NGrid {
        let result = NGrid::new(self.shape.clone());
        let strides = temp_u32_buffer(&self.shape.strides());

        let n = self.len() as u32;
        let mut push = Vec::with_capacity(12);
        push.extend_from_slice(&n.to_le_bytes());
        push.extend_from_slice(&(self.rank() as u32).to_le_bytes());
        push.extend_from_slice(&axis_mask.to_le_bytes());

        exec::dispatch_1d(
            Kernel::Mirror,
            n,
            &[self.data_buf(), self.shape_buf_raw(), strides.raw_handle(), result.data_buf()],
            &push,
        );
        result
    }

    pub(crate) fn fill_constant_in_place(&self, value: f32) {
        if self.len() == 0 {
            return;
        }
        let mut push = Vec::with_capacity(24);
        push.extend_from_slice(&(self.len() as u32).to_le_bytes());
        push.extend_from_slice(&(self.rank() as u32).to_le_bytes());
        push.extend_from_slice(&1u32.to_le_bytes()); // OP_CONST
        push.extend_from_slice(&value.to_le_bytes());
        push.extend_from_slice(&0.0f32.to_le_bytes());
        push.extend_from_slice(&0.0f32.to_le_bytes());
        exec::dispatch_1d(Kernel::Fill, self.len() as u32, &[self.shape_buf_raw(), self.data_buf()], &push);
    }
}

impl Clone for NGrid {
    /// Allocates new buffers with identical shape, records a
    /// device-to-device copy, and awaits completion (§4.8).
    fn clone(&self) -> Self {
        let mut result = NGrid::new(self.shape.clone());
        result.copy_prefix_from(self);
        result
    }
}

impl std::fmt::Debug for NGrid {
    /// Reads the grid back to host and pretty-prints it, the ambient
    /// debug surface named in SPEC_FULL's supplemented-features section
    /// (§5's "print" suspension point).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NGrid")
            .field("shape", &self.shape.dims())
            .field("data", &self.to_vec())
            .finish()
    }
}

#[macro_export]
macro_rules! shape {
    ($($dim:expr),+ $(,)?) => {
        $crate::shape::Shape::new(vec![$($dim as u32),+])
    };
}
