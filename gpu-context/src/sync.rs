//! Synchronization primitives (specification §4.6).

use std::sync::Arc;

use ash::vk;

use crate::device::DeviceShared;
use crate::error::{fatal, DeviceError};

/// Host-visible signaling primitive.
pub struct Fence {
    device: Arc<DeviceShared>,
    pub(crate) raw: vk::Fence,
}

impl Fence {
    pub fn new(device: &Arc<DeviceShared>, signaled: bool) -> Self {
        let mut flags = vk::FenceCreateFlags::empty();
        if signaled {
            flags |= vk::FenceCreateFlags::SIGNALED;
        }
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let raw = match unsafe { device.raw.create_fence(&create_info, None) } {
            Ok(fence) => fence,
            Err(err) => fatal(format!("fence creation failed: {err}")),
        };
        Self {
            device: device.clone(),
            raw,
        }
    }

    /// Waits up to `timeout_nanos`, repeated per §5's "default fence
    /// timeout is 10,000 nanoseconds per wait cycle, repeated until
    /// signaled." An overall `max_wait_nanos` deadline classifies an
    /// unmet wait as [`DeviceError::Timeout`] and returns control to the
    /// caller with GPU work left in flight, per §5 "Cancellation &
    /// timeouts."
    pub fn wait(&self, timeout_nanos: u64, max_wait_nanos: u64) -> Result<(), DeviceError> {
        let mut elapsed = 0u64;
        loop {
            let result = unsafe {
                self.device
                    .raw
                    .wait_for_fences(&[self.raw], true, timeout_nanos)
            };
            match result {
                Ok(()) => return Ok(()),
                Err(vk::Result::TIMEOUT) => {
                    elapsed += timeout_nanos;
                    if elapsed >= max_wait_nanos {
                        return Err(DeviceError::Timeout);
                    }
                }
                Err(err) => fatal(format!("fence wait failed: {err}")),
            }
        }
    }

    pub fn reset(&self) {
        if let Err(err) = unsafe { self.device.raw.reset_fences(&[self.raw]) } {
            fatal(format!("fence reset failed: {err}"));
        }
    }

    pub fn signaled(&self) -> bool {
        match unsafe { self.device.raw.get_fence_status(self.raw) } {
            Ok(signaled) => signaled,
            Err(err) => fatal(format!("fence status query failed: {err}")),
        }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe { self.device.raw.destroy_fence(self.raw, None) };
    }
}

/// Device-only signaling primitive, binary or timeline.
pub enum Semaphore {
    Binary {
        device: Arc<DeviceShared>,
        raw: vk::Semaphore,
    },
    Timeline {
        device: Arc<DeviceShared>,
        raw: vk::Semaphore,
    },
}

impl Semaphore {
    pub fn new_binary(device: &Arc<DeviceShared>) -> Self {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let raw = match unsafe { device.raw.create_semaphore(&create_info, None) } {
            Ok(sem) => sem,
            Err(err) => fatal(format!("semaphore creation failed: {err}")),
        };
        Self::Binary {
            device: device.clone(),
            raw,
        }
    }

    pub fn new_timeline(device: &Arc<DeviceShared>, initial_value: u64) -> Self {
        let mut type_info = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let create_info = vk::SemaphoreCreateInfo::builder().push_next(&mut type_info);
        let raw = match unsafe { device.raw.create_semaphore(&create_info, None) } {
            Ok(sem) => sem,
            Err(err) => fatal(format!("semaphore creation failed: {err}")),
        };
        Self::Timeline {
            device: device.clone(),
            raw,
        }
    }

    pub fn raw(&self) -> vk::Semaphore {
        match self {
            Semaphore::Binary { raw, .. } | Semaphore::Timeline { raw, .. } => *raw,
        }
    }

    fn device(&self) -> &Arc<DeviceShared> {
        match self {
            Semaphore::Binary { device, .. } | Semaphore::Timeline { device, .. } => device,
        }
    }

    /// Only meaningful for timeline semaphores.
    pub fn wait(&self, value: u64, timeout_nanos: u64) -> Result<(), DeviceError> {
        let semaphores = [self.raw()];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::builder()
            .semaphores(&semaphores)
            .values(&values);
        match unsafe { self.device().raw.wait_semaphores(&wait_info, timeout_nanos) } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(DeviceError::Timeout),
            Err(err) => fatal(format!("semaphore wait failed: {err}")),
        }
    }

    pub fn signal(&self, value: u64) {
        let signal_info = vk::SemaphoreSignalInfo::builder().semaphore(self.raw()).value(value);
        if let Err(err) = unsafe { self.device().raw.signal_semaphore(&signal_info) } {
            fatal(format!("semaphore signal failed: {err}"));
        }
    }

    pub fn counter(&self) -> u64 {
        match unsafe { self.device().raw.get_semaphore_counter_value(self.raw()) } {
            Ok(value) => value,
            Err(err) => fatal(format!("semaphore counter query failed: {err}")),
        }
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe { self.device().raw.destroy_semaphore(self.raw(), None) };
    }
}

/// Fine-grained intra-queue synchronization, with an attached dependency
/// descriptor (the stage/access masks that `set`/`wait` apply).
pub struct Event {
    device: Arc<DeviceShared>,
    pub(crate) raw: vk::Event,
    pub dependency: EventDependency,
}

#[derive(Debug, Clone, Copy)]
pub struct EventDependency {
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

impl Event {
    pub fn new(device: &Arc<DeviceShared>, dependency: EventDependency) -> Self {
        let create_info = vk::EventCreateInfo::builder();
        let raw = match unsafe { device.raw.create_event(&create_info, None) } {
            Ok(event) => event,
            Err(err) => fatal(format!("event creation failed: {err}")),
        };
        Self {
            device: device.clone(),
            raw,
            dependency,
        }
    }

    pub fn signaled(&self) -> bool {
        match unsafe { self.device.raw.get_event_status(self.raw) } {
            Ok(signaled) => signaled,
            Err(err) => fatal(format!("event status query failed: {err}")),
        }
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        unsafe { self.device.raw.destroy_event(self.raw, None) };
    }
}

/// A small table of common image-layout transitions, used to infer
/// stage/access masks for the command-buffer image-barrier helper
/// (§4.6).
pub fn infer_image_barrier_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> (vk::PipelineStageFlags, vk::AccessFlags, vk::PipelineStageFlags, vk::AccessFlags) {
    use vk::ImageLayout as L;
    match (old_layout, new_layout) {
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => (
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::TRANSFER,
            vk::AccessFlags::TRANSFER_WRITE,
        ),
        (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => (
            vk::PipelineStageFlags::TRANSFER,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::AccessFlags::SHADER_READ,
        ),
        (L::UNDEFINED, L::COLOR_ATTACHMENT_OPTIMAL) => (
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ),
        (L::COLOR_ATTACHMENT_OPTIMAL, L::PRESENT_SRC_KHR) => (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::AccessFlags::empty(),
        ),
        _ => (
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::AccessFlags::MEMORY_READ,
        ),
    }
}
