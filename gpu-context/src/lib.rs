/*! A thin, safe wrapper over a low-level Vulkan compute/graphics context.
 *
 *  This crate implements the context layer of the tensor-engine
 *  specification: device selection, typed GPU buffers, descriptor sets
 *  and pools, pipelines, command-buffer recording, and host/device
 *  synchronization. It has no notion of tensors, shapes, or kernels;
 *  `ngrid` is built on top of it.
 */

#![allow(clippy::too_many_arguments, clippy::new_without_default)]

pub mod adapter;
pub mod buffer;
pub mod capture;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod instance;
pub mod manager;
pub mod pipeline;
pub mod sync;

pub use adapter::{Adapter, QueueFamilyRole, QueueFamilySelection};
pub use buffer::{Buffer, BufferUsage, GpuElement, MemoryFlags};
pub use command::{dispatch_compute_and_wait, CommandBuffer, CommandBufferState, CommandPool};
pub use config::{ContextConfig, LogLevel};
pub use descriptor::{DescriptorPool, DescriptorSet, DescriptorSetLayout, DescriptorSetLayoutBuilder};
pub use device::{Device, DeviceShared, Queue};
pub use error::DeviceError;
pub use instance::Instance;
pub use manager::SharedContext;
pub use pipeline::{ComputePipeline, GraphicsPipeline, GraphicsPipelineDescriptor, ShaderModule, WorkgroupSize};
pub use sync::{Event, EventDependency, Fence, Semaphore};

/// Re-exported so downstream crates (`ngrid`) never need a direct `ash`
/// dependency for vulkan type names used in this crate's public API.
pub use ash::vk;
