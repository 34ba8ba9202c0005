//! Typed GPU buffer abstraction (specification §4.2, §3 "GPU buffer").

use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use ash::vk;
use bytemuck::Zeroable;
use gpu_alloc::{GpuAllocator, MemoryBlock, Request, UsageFlags};
use gpu_alloc_ash::AshMemoryDevice;

use crate::device::DeviceShared;
use crate::error::{fatal, recoverable};

bitflags::bitflags! {
    /// Mirrors §3's "memory property flags (device-local ∧/∨ host-visible
    /// ∧ host-coherent)".
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct MemoryFlags: u32 {
        const DEVICE_LOCAL  = 0b0001;
        const HOST_VISIBLE  = 0b0010;
        const HOST_COHERENT = 0b0100;
    }
}

impl MemoryFlags {
    /// The default buffer memory class named in §3's NGrid invariants:
    /// "device-local but host-visible and host-coherent by default so
    /// reads and writes require no explicit flush."
    pub const DEFAULT: Self = Self::from_bits_truncate(
        Self::DEVICE_LOCAL.bits() | Self::HOST_VISIBLE.bits() | Self::HOST_COHERENT.bits(),
    );

    pub(crate) fn to_usage_flags(self) -> UsageFlags {
        let mut flags = UsageFlags::empty();
        if self.contains(Self::DEVICE_LOCAL) {
            flags |= UsageFlags::FAST_DEVICE_ACCESS;
        }
        if self.contains(Self::HOST_VISIBLE) {
            flags |= UsageFlags::HOST_ACCESS;
        }
        flags
    }

    pub fn is_host_visible(self) -> bool {
        self.contains(Self::HOST_VISIBLE)
    }
}

/// Usage class of a buffer, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
    Storage,
    Transfer,
}

impl BufferUsage {
    fn to_vk(self) -> vk::BufferUsageFlags {
        let base = match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
            BufferUsage::Transfer => vk::BufferUsageFlags::TRANSFER_SRC,
        };
        base | vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST
    }
}

/// A value that can be packed into a GPU buffer element slot. `NGrid`
/// uses `f32` for data and `u32` for its shape buffer (§3).
pub trait GpuElement: Copy + bytemuck::Pod {}
impl GpuElement for f32 {}
impl GpuElement for u32 {}
impl GpuElement for i32 {}

/// Typed GPU buffer, element count `N`, element type `T`. Non-copyable,
/// movable, released on [`Drop`] — exactly the lifecycle of §3.
pub struct Buffer<T: GpuElement> {
    device: Arc<DeviceShared>,
    allocator: Arc<parking_lot::Mutex<GpuAllocator<vk::DeviceMemory>>>,
    pub(crate) raw: vk::Buffer,
    block: parking_lot::Mutex<Option<MemoryBlock<vk::DeviceMemory>>>,
    count: usize,
    flags: MemoryFlags,
    usage: BufferUsage,
    _marker: PhantomData<T>,
}

impl<T: GpuElement> Buffer<T> {
    /// Allocates both the buffer and its backing memory and binds them.
    /// Memory-type selection is delegated to `gpu_alloc`, which
    /// implements the same "first index satisfying (memoryTypeBits mask)
    /// ∧ (properties ⊇ requested)" search named in §4.2.
    pub fn new(
        device: &Arc<DeviceShared>,
        allocator: &Arc<parking_lot::Mutex<GpuAllocator<vk::DeviceMemory>>>,
        usage: BufferUsage,
        count: usize,
        flags: MemoryFlags,
    ) -> Self {
        let byte_size = (count * mem::size_of::<T>()) as u64;
        let create_info = vk::BufferCreateInfo::builder()
            .size(byte_size.max(mem::size_of::<T>() as u64))
            .usage(usage.to_vk())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let raw = match unsafe { device.raw.create_buffer(&create_info, None) } {
            Ok(buf) => buf,
            Err(err) => fatal(format!("buffer creation failed: {err}")),
        };

        let requirements = unsafe { device.raw.get_buffer_memory_requirements(raw) };
        let block = {
            let mut allocator_guard = allocator.lock();
            unsafe {
                allocator_guard.alloc(
                    AshMemoryDevice::wrap(&device.raw),
                    Request {
                        size: requirements.size,
                        align_mask: requirements.alignment - 1,
                        usage: flags.to_usage_flags(),
                        memory_types: requirements.memory_type_bits,
                    },
                )
            }
        };
        let block = match block {
            Ok(block) => block,
            Err(err) => fatal(format!("out of device memory allocating buffer: {err}")),
        };

        if let Err(err) =
            unsafe { device.raw.bind_buffer_memory(raw, *block.memory(), block.offset()) }
        {
            fatal(format!("failed to bind buffer memory: {err}"));
        }

        Self {
            device: device.clone(),
            allocator: allocator.clone(),
            raw,
            block: parking_lot::Mutex::new(Some(block)),
            count,
            flags,
            usage,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn byte_size(&self) -> u64 {
        (self.count * mem::size_of::<T>()) as u64
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn memory_flags(&self) -> MemoryFlags {
        self.flags
    }

    pub fn is_host_visible(&self) -> bool {
        self.flags.is_host_visible()
    }

    /// The raw API handle, for binding into a descriptor set. Exposed
    /// because callers outside this crate (the tensor engine) need to
    /// wire buffers into descriptor writes themselves.
    pub fn raw_handle(&self) -> vk::Buffer {
        self.raw
    }

    /// Maps `[dst_offset, dst_offset + n)`, memcpys from `host`, unmaps.
    /// `count = 0` means "copy all remaining". Clips to buffer bounds
    /// with a warning (§4.2 recoverable-usage policy); fatal if the
    /// buffer is not host-visible.
    #[track_caller]
    pub fn write(&mut self, host: &[T], count: usize, src_offset: usize, dst_offset: usize) {
        if !self.is_host_visible() {
            fatal("write() called on a non-host-visible buffer");
        }
        let requested = if count == 0 {
            host.len().saturating_sub(src_offset)
        } else {
            count
        };
        let available_src = host.len().saturating_sub(src_offset);
        let available_dst = self.count.saturating_sub(dst_offset);
        let n = requested.min(available_src).min(available_dst);
        if n < requested {
            recoverable(format!(
                "write clipped from {requested} to {n} elements (src len {}, dst len {})",
                host.len(),
                self.count
            ));
        }
        if n == 0 {
            return;
        }

        let mut guard = self.block.lock();
        let block = guard.as_mut().expect("buffer memory block missing");
        let byte_offset = (dst_offset * mem::size_of::<T>()) as u64;
        let byte_len = n * mem::size_of::<T>();
        unsafe {
            let mapped = match block.map(
                AshMemoryDevice::wrap(&self.device.raw),
                byte_offset,
                byte_len,
            ) {
                Ok(ptr) => ptr,
                Err(err) => fatal(format!("failed to map buffer for write: {err}")),
            };
            let src_bytes = bytemuck::cast_slice(&host[src_offset..src_offset + n]);
            std::ptr::copy_nonoverlapping(src_bytes.as_ptr(), mapped.as_ptr(), byte_len);
            block.unmap(AshMemoryDevice::wrap(&self.device.raw));
        }
    }

    /// Inverse of [`Buffer::write`].
    #[track_caller]
    pub fn read(&self, count: usize, src_offset: usize) -> Vec<T> {
        if !self.is_host_visible() {
            fatal("read() called on a non-host-visible buffer");
        }
        let requested = if count == 0 {
            self.count.saturating_sub(src_offset)
        } else {
            count
        };
        let available = self.count.saturating_sub(src_offset);
        let n = requested.min(available);
        if n < requested {
            recoverable(format!(
                "read clipped from {requested} to {n} elements (buffer len {})",
                self.count
            ));
        }
        if n == 0 {
            return Vec::new();
        }

        let mut guard = self.block.lock();
        let block = guard.as_mut().expect("buffer memory block missing");
        let byte_offset = (src_offset * mem::size_of::<T>()) as u64;
        let byte_len = n * mem::size_of::<T>();
        let mut out: Vec<T> = vec![T::zeroed(); n];
        unsafe {
            let mapped = match block.map(
                AshMemoryDevice::wrap(&self.device.raw),
                byte_offset,
                byte_len,
            ) {
                Ok(ptr) => ptr,
                Err(err) => fatal(format!("failed to map buffer for read: {err}")),
            };
            let dst_bytes = bytemuck::cast_slice_mut(&mut out);
            std::ptr::copy_nonoverlapping(mapped.as_ptr(), dst_bytes.as_mut_ptr(), byte_len);
            block.unmap(AshMemoryDevice::wrap(&self.device.raw));
        }
        out
    }

    /// Single-element access; out-of-bounds is fatal per §4.2.
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        if index >= self.count {
            fatal(format!(
                "out-of-bounds single-element read at index {index} (len {})",
                self.count
            ));
        }
        self.read(1, index)[0]
    }

    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) {
        if index >= self.count {
            fatal(format!(
                "out-of-bounds single-element write at index {index} (len {})",
                self.count
            ));
        }
        self.write(&[value], 1, 0, index);
    }

    /// Fills a contiguous range with `value`, clipped to buffer bounds.
    #[track_caller]
    pub fn set_all(&mut self, value: T, offset: usize, count: usize) {
        let requested = if count == 0 {
            self.count.saturating_sub(offset)
        } else {
            count
        };
        let available = self.count.saturating_sub(offset);
        let n = requested.min(available);
        if n < requested {
            recoverable(format!(
                "set_all clipped from {requested} to {n} elements (buffer len {})",
                self.count
            ));
        }
        let values = vec![value; n];
        self.write(&values, n, 0, offset);
    }
}

impl<T: GpuElement> Drop for Buffer<T> {
    fn drop(&mut self) {
        unsafe {
            self.device.raw.destroy_buffer(self.raw, None);
        }
        if let Some(block) = self.block.get_mut().take() {
            let mut allocator = self.allocator.lock();
            unsafe {
                allocator.dealloc(AshMemoryDevice::wrap(&self.device.raw), block);
            }
        }
    }
}
