//! Process-wide shared context (specification §4.1, §9).
//!
//! Modeled as an explicit state object behind a narrow accessor rather
//! than ambient global state, per §9's design note: "tests should be able
//! to inject a mock context by constructing the engine against an
//! injected handle."

use std::sync::Arc;

use ash::vk;
use gpu_alloc::{Config, GpuAllocator};
use once_cell::sync::OnceCell;

use crate::adapter::{Adapter, QueueFamilyRole};
use crate::config::ContextConfig;
use crate::descriptor::DescriptorPool;
use crate::device::Device;
use crate::command::CommandPool;
use crate::error::fatal;
use crate::instance::Instance;

static GLOBAL: OnceCell<SharedContext> = OnceCell::new();

/// The process-wide singleton described in §4.1: "current instance,
/// logical device, and command pools for each queue family."
// Field order matters: Rust drops struct fields top-to-bottom, so the
// command pools and descriptor pool — which must be destroyed before the
// device, which must be destroyed before the instance (§4.1) — are
// declared first.
pub struct SharedContext {
    pub graphics_pool: CommandPool,
    pub compute_pool: CommandPool,
    pub transfer_pool: CommandPool,
    pub descriptor_pool: DescriptorPool,
    pub allocator: Arc<parking_lot::Mutex<GpuAllocator<vk::DeviceMemory>>>,
    pub device: Device,
    pub adapter: Adapter,
    pub instance: Instance,
    pub config: ContextConfig,
}

impl SharedContext {
    fn build(config: ContextConfig) -> Self {
        let instance = Instance::new(&config);
        let adapter = instance.pick_adapter(&config);
        let device = adapter.create_device(&config);

        let props = unsafe {
            gpu_alloc_ash::device_properties(instance.raw(), ash::vk::API_VERSION_1_1, adapter.raw)
        }
        .unwrap_or_else(|err| fatal(format!("failed to query device properties for allocator: {err}")));
        let allocator = Arc::new(parking_lot::Mutex::new(GpuAllocator::new(
            allocator_config(),
            props,
        )));

        let descriptor_pool = DescriptorPool::new(&device.shared, config.max_descriptor_sets);

        let graphics_pool = CommandPool::new(&device.shared, device.graphics_queue.family_index);
        let compute_pool = CommandPool::new(&device.shared, device.compute_queue.family_index);
        let transfer_pool = CommandPool::new(&device.shared, device.transfer_queue.family_index);

        Self {
            instance,
            adapter,
            device,
            allocator,
            descriptor_pool,
            graphics_pool,
            compute_pool,
            transfer_pool,
            config,
        }
    }

    /// Lazily initializes the singleton on first use, per §4.1.
    pub fn get_or_init(config: ContextConfig) -> &'static SharedContext {
        GLOBAL.get_or_init(|| Self::build(config))
    }

    pub fn get() -> &'static SharedContext {
        GLOBAL
            .get()
            .unwrap_or_else(|| fatal("SharedContext accessed before initialization"))
    }

    /// Narrow accessor for a queue by role (§9 design note).
    pub fn queue(&self, role: QueueFamilyRole) -> &crate::device::Queue {
        self.device.queue(role)
    }

    pub fn pool_for(&self, role: QueueFamilyRole) -> &CommandPool {
        match role {
            QueueFamilyRole::Graphics => &self.graphics_pool,
            QueueFamilyRole::Compute => &self.compute_pool,
            QueueFamilyRole::Transfer => &self.transfer_pool,
        }
    }

    /// Builds an already-initialized context from a caller-supplied
    /// instance/adapter/device triple, bypassing the global singleton.
    /// Exists purely so tests can inject a mock or headless context
    /// without touching process-wide state, per §9.
    pub fn for_testing(instance: Instance, adapter: Adapter, device: Device, config: ContextConfig) -> Self {
        let props = unsafe {
            gpu_alloc_ash::device_properties(instance.raw(), ash::vk::API_VERSION_1_1, adapter.raw)
        }
        .unwrap_or_else(|err| fatal(format!("failed to query device properties for allocator: {err}")));
        let allocator = Arc::new(parking_lot::Mutex::new(GpuAllocator::new(
            allocator_config(),
            props,
        )));
        let descriptor_pool = DescriptorPool::new(&device.shared, config.max_descriptor_sets);
        let graphics_pool = CommandPool::new(&device.shared, device.graphics_queue.family_index);
        let compute_pool = CommandPool::new(&device.shared, device.compute_queue.family_index);
        let transfer_pool = CommandPool::new(&device.shared, device.transfer_queue.family_index);

        Self {
            instance,
            adapter,
            device,
            allocator,
            descriptor_pool,
            graphics_pool,
            compute_pool,
            transfer_pool,
            config,
        }
    }
}

fn allocator_config() -> Config {
    Config {
        dedicated_threshold: 32 * 1024 * 1024,
        preferred_dedicated_threshold: 1024 * 1024,
        transient_dedicated_threshold: 128 * 1024 * 1024,
        starting_free_list_chunk: 1024 * 1024,
        final_free_list_chunk: 1024 * 1024 * 1024,
        minimal_buddy_size: 1024,
        initial_buddy_dedicated_size: 8 * 1024 * 1024,
    }
}
