//! Logical device and queue handles (specification §4.1, §3 "Device
//! context").

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;

use crate::adapter::{Adapter, QueueFamilyRole, QueueFamilySelection};
use crate::config::ContextConfig;
use crate::error::fatal;
use crate::instance::InstanceShared;

pub struct Queue {
    pub(crate) raw: vk::Queue,
    pub family_index: u32,
    pub role: QueueFamilyRole,
    pub dedicated: bool,
}

impl Queue {
    pub fn raw(&self) -> vk::Queue {
        self.raw
    }
}

pub struct DeviceShared {
    pub(crate) instance: Arc<InstanceShared>,
    pub(crate) raw: ash::Device,
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe { self.raw.destroy_device(None) };
    }
}

/// The logical device plus its three queue handles, per §3 "Device
/// context": "a chosen physical adapter, a logical device, up to three
/// queues (graphics/compute/transfer) with their family indices".
pub struct Device {
    pub(crate) shared: Arc<DeviceShared>,
    pub graphics_queue: Queue,
    pub compute_queue: Queue,
    pub transfer_queue: Queue,
}

impl Device {
    pub(crate) fn new(adapter: &Adapter, config: &ContextConfig) -> Self {
        let selections = adapter.select_queue_families();
        let mut unique_families: Vec<u32> = selections.iter().map(|s| s.family_index).collect();
        unique_families.sort_unstable();
        unique_families.dedup();

        let priorities = [1.0_f32];
        let queue_create_infos: Vec<_> = unique_families
            .iter()
            .map(|&family_index| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family_index)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let ext_names: Vec<CString> = config
            .device_extensions
            .iter()
            .map(|s| CString::new(s.as_str()).unwrap())
            .collect();
        let ext_ptrs: Vec<*const i8> = ext_names.iter().map(|s| s.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&ext_ptrs);

        let raw = match unsafe {
            adapter
                .instance
                .raw
                .create_device(adapter.raw, &create_info, None)
        } {
            Ok(device) => device,
            Err(err) => fatal(format!("device creation failed: {err}")),
        };

        let queue_for = |sel: QueueFamilySelection, role: QueueFamilyRole| {
            let raw_queue = unsafe { raw.get_device_queue(sel.family_index, 0) };
            Queue {
                raw: raw_queue,
                family_index: sel.family_index,
                role,
                dedicated: sel.dedicated,
            }
        };

        let shared = Arc::new(DeviceShared {
            instance: adapter.instance.clone(),
            raw,
        });

        Self {
            shared,
            graphics_queue: queue_for(selections[0], QueueFamilyRole::Graphics),
            compute_queue: queue_for(selections[1], QueueFamilyRole::Compute),
            transfer_queue: queue_for(selections[2], QueueFamilyRole::Transfer),
        }
    }

    pub fn raw(&self) -> &ash::Device {
        &self.shared.raw
    }

    /// Returns the shared device handle, for constructing resources
    /// (buffers, pipelines, command pools) that take `&Arc<DeviceShared>`
    /// directly, outside this crate.
    pub fn shared(&self) -> Arc<DeviceShared> {
        self.shared.clone()
    }

    /// Narrow accessor for a queue by role, replacing ambient global
    /// access per the §9 design note.
    pub fn queue(&self, role: QueueFamilyRole) -> &Queue {
        match role {
            QueueFamilyRole::Graphics => &self.graphics_queue,
            QueueFamilyRole::Compute => &self.compute_queue,
            QueueFamilyRole::Transfer => &self.transfer_queue,
        }
    }

    pub fn wait_idle(&self) {
        if let Err(err) = unsafe { self.shared.raw.device_wait_idle() } {
            fatal(format!("device_wait_idle failed: {err}"));
        }
    }
}
