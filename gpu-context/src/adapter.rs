//! Physical adapter selection and queue-family scanning (specification
//! §4.1).

use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::instance::{as_cstr, InstanceShared};

/// The three queue-family roles tracked by the shared context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFamilyRole {
    Graphics,
    Compute,
    Transfer,
}

/// Result of the dedicated-then-shared queue-family selection policy.
#[derive(Debug, Clone, Copy)]
pub struct QueueFamilySelection {
    pub family_index: u32,
    pub dedicated: bool,
}

pub struct Adapter {
    pub(crate) instance: Arc<InstanceShared>,
    pub(crate) raw: vk::PhysicalDevice,
    pub(crate) queue_family_properties: Vec<vk::QueueFamilyProperties>,
    pub(crate) memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl Adapter {
    pub(crate) fn supports_compute(instance: &ash::Instance, pd: vk::PhysicalDevice) -> bool {
        let families = unsafe { instance.get_physical_device_queue_family_properties(pd) };
        families
            .iter()
            .any(|f| f.queue_flags.contains(vk::QueueFlags::COMPUTE))
    }

    pub(crate) fn new(instance: Arc<InstanceShared>, raw: vk::PhysicalDevice) -> Self {
        let queue_family_properties =
            unsafe { instance.raw.get_physical_device_queue_family_properties(raw) };
        let memory_properties = unsafe { instance.raw.get_physical_device_memory_properties(raw) };
        Self {
            instance,
            raw,
            queue_family_properties,
            memory_properties,
        }
    }

    pub fn name(&self) -> String {
        let props = unsafe { self.instance.raw.get_physical_device_properties(self.raw) };
        as_cstr(&props.device_name).to_string_lossy().into_owned()
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Implements the exact policy of §4.1: scan adapter queue families;
    /// the first family advertising each capability bit is chosen as
    /// dedicated; if none is found for a capability, fall back to the
    /// first other family that also supports it (shared queue), logging
    /// a warning for each fallback.
    pub fn select_queue_families(&self) -> [QueueFamilySelection; 3] {
        let bit_for = |role: QueueFamilyRole| match role {
            QueueFamilyRole::Graphics => vk::QueueFlags::GRAPHICS,
            QueueFamilyRole::Compute => vk::QueueFlags::COMPUTE,
            QueueFamilyRole::Transfer => vk::QueueFlags::TRANSFER,
        };

        let mut dedicated_used: Vec<u32> = Vec::new();
        let mut pick = |role: QueueFamilyRole| -> QueueFamilySelection {
            let flag = bit_for(role);
            // Prefer a family that exposes *only* this capability bit among
            // the three we care about, so graphics/compute/transfer don't
            // all collapse onto family 0 on adapters that advertise a
            // single general-purpose queue family for everything.
            let exclusive = self.queue_family_properties.iter().enumerate().find(|(idx, f)| {
                f.queue_flags.contains(flag) && !dedicated_used.contains(&(*idx as u32))
                    && (vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER)
                        & f.queue_flags
                        == flag
            });

            if let Some((idx, _)) = exclusive {
                dedicated_used.push(idx as u32);
                return QueueFamilySelection {
                    family_index: idx as u32,
                    dedicated: true,
                };
            }

            let any_unused = self
                .queue_family_properties
                .iter()
                .enumerate()
                .find(|(idx, f)| f.queue_flags.contains(flag) && !dedicated_used.contains(&(*idx as u32)));

            if let Some((idx, _)) = any_unused {
                dedicated_used.push(idx as u32);
                return QueueFamilySelection {
                    family_index: idx as u32,
                    dedicated: true,
                };
            }

            let shared = self
                .queue_family_properties
                .iter()
                .enumerate()
                .find(|(_, f)| f.queue_flags.contains(flag))
                .unwrap_or_else(|| {
                    crate::error::fatal(format!("no queue family supports {role:?}"))
                });
            log::warn!(
                "no dedicated queue family for {role:?}; falling back to shared family {}",
                shared.0
            );
            QueueFamilySelection {
                family_index: shared.0 as u32,
                dedicated: false,
            }
        };

        [
            pick(QueueFamilyRole::Graphics),
            pick(QueueFamilyRole::Compute),
            pick(QueueFamilyRole::Transfer),
        ]
    }

    /// Creates the logical device and its three queue handles.
    pub fn create_device(&self, config: &crate::config::ContextConfig) -> Device {
        Device::new(self, config)
    }
}

