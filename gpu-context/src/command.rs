//! Command pools and buffers (specification §4.5, §4.12 "Command buffer
//! states").

use std::sync::Arc;

use ash::vk;

use crate::descriptor::DescriptorSet;
use crate::device::DeviceShared;
use crate::error::fatal;
use crate::pipeline::{ComputePipeline, GraphicsPipeline};
use crate::sync::{EventDependency, Fence};

/// Per-queue-family command pool. Command buffers reference their pool
/// and device but do not own them, per §9's cyclic-ownership-avoidance
/// note.
pub struct CommandPool {
    device: Arc<DeviceShared>,
    pub(crate) raw: vk::CommandPool,
    pub family_index: u32,
}

impl CommandPool {
    pub fn new(device: &Arc<DeviceShared>, family_index: u32) -> Self {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let raw = match unsafe { device.raw.create_command_pool(&create_info, None) } {
            Ok(pool) => pool,
            Err(err) => fatal(format!("command pool creation failed: {err}")),
        };
        Self {
            device: device.clone(),
            raw,
            family_index,
        }
    }

    /// Allocates a command buffer and immediately begins recording with
    /// the one-time-submit hint, per §4.5: "on creation, recording is
    /// begun with the one-time-submit hint set."
    pub fn allocate(&self) -> CommandBuffer {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.raw)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let raw = match unsafe { self.device.raw.allocate_command_buffers(&alloc_info) } {
            Ok(mut buffers) => buffers.remove(0),
            Err(err) => fatal(format!("command buffer allocation failed: {err}")),
        };

        let mut buffer = CommandBuffer {
            device: self.device.clone(),
            pool: self.raw,
            raw,
            state: CommandBufferState::Invalid,
            bound_pipeline_layout: None,
            bound_workgroup_size: None,
        };
        buffer.begin();
        buffer
    }

    /// Resets the whole pool, returning every buffer allocated from it to
    /// the initial state, per §4.5's "`reset` returns the buffer to
    /// recording state" applied pool-wide.
    pub fn reset(&self) {
        if let Err(err) = unsafe {
            self.device
                .raw
                .reset_command_pool(self.raw, vk::CommandPoolResetFlags::empty())
        } {
            fatal(format!("command pool reset failed: {err}"));
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe { self.device.raw.destroy_command_pool(self.raw, None) };
    }
}

/// The four observable states of §4.12: *recording* → *executable* (after
/// `submit`'s internal `end`) → *pending* (after the queue submit call)
/// → *executable* again once the GPU completes, unless the one-time-
/// submit flag is set, in which case the buffer becomes *invalid*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    Recording,
    Executable,
    Pending,
    Invalid,
}

/// A command-buffer recorder belonging to a specific queue family. Carries
/// state (bound pipeline, bound descriptor set, pipeline layout,
/// workgroup dimensions from the last-bound compute pipeline), per §4.5.
pub struct CommandBuffer {
    device: Arc<DeviceShared>,
    pool: vk::CommandPool,
    pub(crate) raw: vk::CommandBuffer,
    state: CommandBufferState,
    bound_pipeline_layout: Option<vk::PipelineLayout>,
    bound_workgroup_size: Option<(u32, u32, u32)>,
}

impl CommandBuffer {
    pub fn state(&self) -> CommandBufferState {
        self.state
    }

    fn begin(&mut self) {
        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        if let Err(err) = unsafe { self.device.raw.begin_command_buffer(self.raw, &begin_info) } {
            fatal(format!("failed to begin command buffer: {err}"));
        }
        self.state = CommandBufferState::Recording;
    }

    #[track_caller]
    fn require_recording(&self) {
        if self.state != CommandBufferState::Recording {
            fatal(format!(
                "command buffer operation requires the recording state, found {:?}",
                self.state
            ));
        }
    }

    pub fn bind_compute_pipeline(&mut self, pipeline: &ComputePipeline) {
        self.require_recording();
        unsafe {
            self.device
                .raw
                .cmd_bind_pipeline(self.raw, vk::PipelineBindPoint::COMPUTE, pipeline.raw);
        }
        self.bound_pipeline_layout = Some(pipeline.layout);
        self.bound_workgroup_size = Some((
            pipeline.workgroup_size.x,
            pipeline.workgroup_size.y,
            pipeline.workgroup_size.z,
        ));
    }

    pub fn bind_graphics_pipeline(&mut self, pipeline: &GraphicsPipeline) {
        self.require_recording();
        unsafe {
            self.device
                .raw
                .cmd_bind_pipeline(self.raw, vk::PipelineBindPoint::GRAPHICS, pipeline.raw);
        }
        self.bound_pipeline_layout = Some(pipeline.layout);
        self.bound_workgroup_size = None;
    }

    pub fn bind_descriptor_set(&mut self, bind_point: vk::PipelineBindPoint, set: &DescriptorSet) {
        self.require_recording();
        let layout = self
            .bound_pipeline_layout
            .unwrap_or_else(|| fatal("bind_descriptor_set called with no pipeline bound"));
        unsafe {
            self.device.raw.cmd_bind_descriptor_sets(
                self.raw,
                bind_point,
                layout,
                0,
                &[set.raw()],
                &[],
            );
        }
    }

    pub fn push_constants(&mut self, stage_flags: vk::ShaderStageFlags, bytes: &[u8]) {
        self.require_recording();
        let layout = self
            .bound_pipeline_layout
            .unwrap_or_else(|| fatal("push_constants called with no pipeline bound"));
        unsafe {
            self.device
                .raw
                .cmd_push_constants(self.raw, layout, stage_flags, 0, bytes);
        }
    }

    /// Dispatches `(gx, gy, gz)` global invocations, converting to
    /// workgroup counts as ⌈gᵢ/local_size_i⌉ using the workgroup
    /// dimensions of the last bound compute pipeline, per §4.5.
    pub fn dispatch(&mut self, gx: u32, gy: u32, gz: u32) {
        self.require_recording();
        let (lx, ly, lz) = self
            .bound_workgroup_size
            .unwrap_or_else(|| fatal("dispatch called with no compute pipeline bound"));
        let div_ceil = |a: u32, b: u32| (a + b - 1) / b.max(1);
        unsafe {
            self.device.raw.cmd_dispatch(
                self.raw,
                div_ceil(gx, lx),
                div_ceil(gy, ly),
                div_ceil(gz, lz),
            );
        }
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.require_recording();
        unsafe {
            self.device
                .raw
                .cmd_draw(self.raw, vertex_count, instance_count, first_vertex, first_instance);
        }
    }

    pub fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        self.require_recording();
        unsafe { self.device.raw.cmd_copy_buffer(self.raw, src, dst, regions) };
    }

    /// Global memory barrier (no buffer/image specificity).
    pub fn memory_barrier(
        &mut self,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        src_access: vk::AccessFlags,
        dst_access: vk::AccessFlags,
    ) {
        self.require_recording();
        let barrier = vk::MemoryBarrier::builder()
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .build();
        unsafe {
            self.device.raw.cmd_pipeline_barrier(
                self.raw,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[barrier],
                &[],
                &[],
            );
        }
    }

    /// Buffer-memory barrier. The LU decomposition's four-phase
    /// dispatch-per-column relies on exactly this to serialize phases
    /// (§5, §4.11).
    pub fn buffer_barrier(
        &mut self,
        buffer: vk::Buffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        src_access: vk::AccessFlags,
        dst_access: vk::AccessFlags,
    ) {
        self.require_recording();
        let barrier = vk::BufferMemoryBarrier::builder()
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .buffer(buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE)
            .build();
        unsafe {
            self.device.raw.cmd_pipeline_barrier(
                self.raw,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[barrier],
                &[],
            );
        }
    }

    pub fn image_barrier(
        &mut self,
        image: vk::Image,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        src_access: vk::AccessFlags,
        dst_access: vk::AccessFlags,
        subresource_range: vk::ImageSubresourceRange,
    ) {
        self.require_recording();
        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .image(image)
            .subresource_range(subresource_range)
            .build();
        unsafe {
            self.device.raw.cmd_pipeline_barrier(
                self.raw,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    /// Infers stage/access masks from the common-transitions table
    /// (§4.6) and records the corresponding image barrier.
    pub fn transition_image_layout(
        &mut self,
        image: vk::Image,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        subresource_range: vk::ImageSubresourceRange,
    ) {
        let (src_stage, src_access, dst_stage, dst_access) =
            crate::sync::infer_image_barrier_masks(old_layout, new_layout);
        self.image_barrier(
            image,
            old_layout,
            new_layout,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
            subresource_range,
        );
    }

    pub fn set_event(&mut self, event: &crate::sync::Event) {
        self.require_recording();
        unsafe {
            self.device
                .raw
                .cmd_set_event(self.raw, event.raw, event.dependency.src_stage);
        }
    }

    pub fn reset_event(&mut self, event: &crate::sync::Event) {
        self.require_recording();
        unsafe {
            self.device
                .raw
                .cmd_reset_event(self.raw, event.raw, event.dependency.dst_stage);
        }
    }

    pub fn wait_event(&mut self, event: &crate::sync::Event, dependency: EventDependency) {
        self.require_recording();
        unsafe {
            self.device.raw.cmd_wait_events(
                self.raw,
                &[event.raw],
                dependency.src_stage,
                dependency.dst_stage,
                &[],
                &[],
                &[],
            );
        }
    }

    /// Ends recording and enqueues onto `queue`. An optional fence
    /// signals completion; absent fence means fire-and-forget, per
    /// §4.5.
    pub fn submit(&mut self, queue: vk::Queue, signal_fence: Option<&Fence>) {
        self.require_recording();
        if let Err(err) = unsafe { self.device.raw.end_command_buffer(self.raw) } {
            fatal(format!("failed to end command buffer: {err}"));
        }
        self.state = CommandBufferState::Executable;

        let buffers = [self.raw];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&buffers).build();
        let fence_raw = signal_fence.map(|f| f.raw).unwrap_or(vk::Fence::null());
        if let Err(err) =
            unsafe { self.device.raw.queue_submit(queue, &[submit_info], fence_raw) }
        {
            fatal(format!("queue submit failed: {err}"));
        }
        self.state = CommandBufferState::Pending;
    }

    /// Returns the buffer to the recording state.
    pub fn reset(&mut self) {
        if let Err(err) = unsafe {
            self.device
                .raw
                .reset_command_buffer(self.raw, vk::CommandBufferResetFlags::empty())
        } {
            fatal(format!("command buffer reset failed: {err}"));
        }
        self.begin();
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .raw
                .free_command_buffers(self.pool, &[self.raw]);
        }
    }
}

/// The "compute convenience" combined operation of §4.5: binds the
/// pipeline, binds its descriptor set, pushes its constants, dispatches
/// the requested global size, creates a transient fence and busy-waits
/// until signaled, submits, and resets. This is the default execution
/// path used by every `NGrid` operation (§2 "Control flow").
pub fn dispatch_compute_and_wait(
    pool: &CommandPool,
    device: &Arc<DeviceShared>,
    queue: vk::Queue,
    pipeline: &ComputePipeline,
    set: &DescriptorSet,
    push_constants: &[u8],
    global_size: (u32, u32, u32),
    fence_timeout_nanos: u64,
    max_wait_nanos: u64,
) -> Result<(), crate::error::DeviceError> {
    let mut cmd = pool.allocate();
    cmd.bind_compute_pipeline(pipeline);
    cmd.bind_descriptor_set(vk::PipelineBindPoint::COMPUTE, set);
    if !push_constants.is_empty() {
        cmd.push_constants(vk::ShaderStageFlags::COMPUTE, push_constants);
    }
    cmd.dispatch(global_size.0, global_size.1, global_size.2);

    let fence = Fence::new(device, false);
    cmd.submit(queue, Some(&fence));
    let result = fence.wait(fence_timeout_nanos, max_wait_nanos);
    cmd.reset();
    result
}
