//! Descriptor-set binding table, layout, and pool (specification §4.3,
//! §4.12 "Descriptor set layout states").

use std::sync::Arc;

use ash::vk;
use gpu_descriptor::{DescriptorAllocator, DescriptorSetLayoutCreateFlags, DescriptorTotalCount};
use gpu_descriptor_ash::AshDescriptorDevice;

use crate::device::DeviceShared;
use crate::error::fatal;

/// One (binding-index, descriptor-type, resource-handle) triple. The
/// binding index equals insertion order, per §3.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub index: u32,
    pub descriptor_type: vk::DescriptorType,
    pub stage_flags: vk::ShaderStageFlags,
}

/// Mutable binding-table builder. Finalizing constructs the immutable
/// [`DescriptorSetLayout`]; §4.12's "mutable → finalized" state machine.
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<Binding>,
}

impl DescriptorSetLayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding, assigning it the next dense index starting at
    /// zero, per §4.3's invariant.
    pub fn push_storage_buffer(mut self, stage_flags: vk::ShaderStageFlags) -> Self {
        let index = self.bindings.len() as u32;
        self.bindings.push(Binding {
            index,
            descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
            stage_flags,
        });
        self
    }

    pub fn push_uniform_buffer(mut self, stage_flags: vk::ShaderStageFlags) -> Self {
        let index = self.bindings.len() as u32;
        self.bindings.push(Binding {
            index,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            stage_flags,
        });
        self
    }

    pub fn finalize(self, device: &Arc<DeviceShared>) -> DescriptorSetLayout {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = self
            .bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(b.index)
                    .descriptor_type(b.descriptor_type)
                    .descriptor_count(1)
                    .stage_flags(b.stage_flags)
                    .build()
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&vk_bindings);
        let raw = match unsafe { device.raw.create_descriptor_set_layout(&create_info, None) } {
            Ok(layout) => layout,
            Err(err) => fatal(format!("descriptor set layout creation failed: {err}")),
        };

        DescriptorSetLayout {
            device: device.clone(),
            raw,
            bindings: self.bindings,
        }
    }
}

/// The finalized, allocatable binding table. No new bindings may be added
/// after this point; existing bindings may still be rebound to a new
/// resource at the same index, per §4.3.
pub struct DescriptorSetLayout {
    device: Arc<DeviceShared>,
    pub(crate) raw: vk::DescriptorSetLayout,
    bindings: Vec<Binding>,
}

impl DescriptorSetLayout {
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.raw.destroy_descriptor_set_layout(self.raw, None);
        }
    }
}

/// The shared descriptor pool owned by [`crate::manager::SharedContext`],
/// per §5's "Shared resources": sized to the maximum in-flight dispatch
/// concurrency (default 20).
pub struct DescriptorPool {
    device: Arc<DeviceShared>,
    allocator: parking_lot::Mutex<DescriptorAllocator<vk::DescriptorPool, vk::DescriptorSet>>,
    max_sets: u32,
    allocated: std::sync::atomic::AtomicU32,
}

impl DescriptorPool {
    pub fn new(device: &Arc<DeviceShared>, max_sets: u32) -> Self {
        Self {
            device: device.clone(),
            allocator: parking_lot::Mutex::new(DescriptorAllocator::new(0)),
            max_sets,
            allocated: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Allocates a set from this layout. Refuses beyond the pool's
    /// configured maximum (§4.3's pool invariant).
    pub fn allocate(&self, layout: &DescriptorSetLayout) -> DescriptorSet {
        use std::sync::atomic::Ordering;
        let previous = self.allocated.fetch_add(1, Ordering::AcqRel);
        if previous >= self.max_sets {
            self.allocated.fetch_sub(1, Ordering::AcqRel);
            fatal(format!(
                "descriptor pool exhausted: refusing allocation beyond max_sets={}",
                self.max_sets
            ));
        }

        let mut counts = DescriptorTotalCount::default();
        for binding in layout.bindings() {
            match binding.descriptor_type {
                vk::DescriptorType::STORAGE_BUFFER => counts.storage_buffer += 1,
                vk::DescriptorType::UNIFORM_BUFFER => counts.uniform_buffer += 1,
                _ => {}
            }
        }

        let raw = unsafe {
            self.allocator.lock().allocate(
                AshDescriptorDevice::wrap(&self.device.raw),
                &layout.raw,
                DescriptorSetLayoutCreateFlags::empty(),
                &counts,
                1,
            )
        };
        let mut raw = match raw {
            Ok(sets) => sets,
            Err(err) => fatal(format!("descriptor allocation failed: {err}")),
        };
        let set = raw.pop().expect("gpu-descriptor returned zero sets for count 1");

        DescriptorSet {
            pool: self,
            raw: Some(set),
            bound_buffers: Vec::new(),
        }
    }
}

/// An allocated, rebindable descriptor set.
pub struct DescriptorSet<'pool> {
    pool: &'pool DescriptorPool,
    raw: Option<gpu_descriptor::DescriptorSet<vk::DescriptorSet>>,
    bound_buffers: Vec<(u32, vk::Buffer, vk::DescriptorType)>,
}

impl<'pool> DescriptorSet<'pool> {
    pub fn raw(&self) -> vk::DescriptorSet {
        *self.raw.as_ref().expect("descriptor set already freed").raw()
    }

    /// Binds (or rebinds) a storage/uniform buffer at `binding`, per
    /// §4.3: "existing bindings may be replaced (rebinding a new
    /// resource at the same index through a descriptor write)."
    pub fn bind_buffer(&mut self, binding: u32, buffer: vk::Buffer, descriptor_type: vk::DescriptorType) {
        let device = &self.pool.device.raw;
        let buffer_info = [vk::DescriptorBufferInfo::builder()
            .buffer(buffer)
            .offset(0)
            .range(vk::WHOLE_SIZE)
            .build()];
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.raw())
            .dst_binding(binding)
            .descriptor_type(descriptor_type)
            .buffer_info(&buffer_info)
            .build();
        unsafe { device.update_descriptor_sets(&[write], &[]) };

        if let Some(slot) = self.bound_buffers.iter_mut().find(|(b, ..)| *b == binding) {
            *slot = (binding, buffer, descriptor_type);
        } else {
            self.bound_buffers.push((binding, buffer, descriptor_type));
        }
    }
}

impl<'pool> Drop for DescriptorSet<'pool> {
    fn drop(&mut self) {
        if let Some(set) = self.raw.take() {
            unsafe {
                self.pool
                    .allocator
                    .lock()
                    .free(AshDescriptorDevice::wrap(&self.pool.device.raw), Some(set));
            }
            self.pool
                .allocated
                .fetch_sub(1, std::sync::atomic::Ordering::AcqRel);
        }
    }
}
