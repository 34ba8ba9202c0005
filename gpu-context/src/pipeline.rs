//! Pipeline objects (specification §4.4).

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;

use crate::descriptor::DescriptorSetLayout;
use crate::device::DeviceShared;
use crate::error::fatal;

/// A compiled shader module, built from the byte sequence embedded by
/// `ngrid-shaders` (§4.7, §6).
pub struct ShaderModule {
    device: Arc<DeviceShared>,
    pub(crate) raw: vk::ShaderModule,
}

impl ShaderModule {
    pub fn new(device: &Arc<DeviceShared>, spirv: &[u8]) -> Self {
        assert_eq!(spirv.len() % 4, 0, "SPIR-V byte length must be a multiple of 4");
        let words: Vec<u32> = spirv
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);
        let raw = match unsafe { device.raw.create_shader_module(&create_info, None) } {
            Ok(module) => module,
            Err(err) => fatal(format!("shader module creation failed: {err}")),
        };
        Self {
            device: device.clone(),
            raw,
        }
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe { self.device.raw.destroy_shader_module(self.raw, None) };
    }
}

/// Workgroup dimensions injected as specialization constants IDs 0/1/2,
/// per §4.4: "this makes one shader reusable across dispatch geometries."
#[derive(Debug, Clone, Copy)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupSize {
    pub fn new_1d(x: u32) -> Self {
        Self { x, y: 1, z: 1 }
    }

    pub fn new_2d(x: u32, y: u32) -> Self {
        Self { x, y, z: 1 }
    }
}

/// A compute pipeline: (shader module, push-constants layout,
/// descriptor-set layout, workgroup dimensions).
pub struct ComputePipeline {
    device: Arc<DeviceShared>,
    pub(crate) raw: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    pub workgroup_size: WorkgroupSize,
}

impl ComputePipeline {
    pub fn new(
        device: &Arc<DeviceShared>,
        shader: &ShaderModule,
        entry_point: &str,
        set_layout: &DescriptorSetLayout,
        push_constant_bytes: u32,
        workgroup_size: WorkgroupSize,
    ) -> Self {
        assert_eq!(push_constant_bytes % 4, 0, "push constants must be a multiple of 4 bytes");

        let set_layouts = [set_layout.raw];
        let push_constant_ranges = [vk::PushConstantRange::builder()
            .stage_flags(vk::ShaderStageFlags::COMPUTE)
            .offset(0)
            .size(push_constant_bytes)
            .build()];
        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        let layout = match unsafe { device.raw.create_pipeline_layout(&layout_info, None) } {
            Ok(layout) => layout,
            Err(err) => fatal(format!("pipeline layout creation failed: {err}")),
        };

        let entry = CString::new(entry_point).unwrap();

        // Specialization constants IDs 0/1/2 map to local_size_x/y/z.
        let spec_data: [u32; 3] = [workgroup_size.x, workgroup_size.y, workgroup_size.z];
        let spec_entries = [
            vk::SpecializationMapEntry::builder().constant_id(0).offset(0).size(4).build(),
            vk::SpecializationMapEntry::builder().constant_id(1).offset(4).size(4).build(),
            vk::SpecializationMapEntry::builder().constant_id(2).offset(8).size(4).build(),
        ];
        let spec_info = vk::SpecializationInfo::builder()
            .map_entries(&spec_entries)
            .data(bytes_of_u32_array(&spec_data));

        let stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(shader.raw)
            .name(&entry)
            .specialization_info(&spec_info)
            .build();

        let create_info = vk::ComputePipelineCreateInfo::builder()
            .stage(stage)
            .layout(layout)
            .build();

        let raw = match unsafe {
            device
                .raw
                .create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
        } {
            Ok(mut pipelines) => pipelines.remove(0),
            Err((_, err)) => fatal(format!("compute pipeline creation failed: {err}")),
        };

        Self {
            device: device.clone(),
            raw,
            layout,
            workgroup_size,
        }
    }

    /// Computes workgroup counts as ⌈gᵢ/local_size_i⌉, per §4.5.
    pub fn dispatch_counts(&self, gx: u32, gy: u32, gz: u32) -> (u32, u32, u32) {
        let div_ceil = |a: u32, b: u32| (a + b - 1) / b.max(1);
        (
            div_ceil(gx, self.workgroup_size.x),
            div_ceil(gy, self.workgroup_size.y),
            div_ceil(gz, self.workgroup_size.z),
        )
    }
}

impl Drop for ComputePipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.raw.destroy_pipeline(self.raw, None);
            self.device.raw.destroy_pipeline_layout(self.layout, None);
        }
    }
}

fn bytes_of_u32_array(data: &[u32]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, data.len() * 4) }
}

/// Fixed-function state for a graphics pipeline. Not exercised by the
/// tensor engine; documented at interface granularity only (§4.4, §1).
#[derive(Debug, Clone, Default)]
pub struct GraphicsPipelineDescriptor {
    pub vertex_input: Vec<vk::VertexInputBindingDescription>,
    pub topology: Option<vk::PrimitiveTopology>,
    pub cull_mode: Option<vk::CullModeFlags>,
    pub depth_test_enable: bool,
    pub blend_enable: bool,
    pub dynamic_states: Vec<vk::DynamicState>,
}

/// A graphics pipeline. Owns its layout and destroys it on teardown, like
/// [`ComputePipeline`]. No compute-tensor operation dispatches through
/// this type.
pub struct GraphicsPipeline {
    device: Arc<DeviceShared>,
    pub(crate) raw: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Constructs the pipeline from the fixed-function state in
    /// `descriptor`, plus the vertex/fragment shader modules and an
    /// optional descriptor-set layout. Kept at interface granularity:
    /// render-pass compatibility and attachment formats are the caller's
    /// responsibility.
    pub fn new(
        device: &Arc<DeviceShared>,
        vertex: &ShaderModule,
        fragment: &ShaderModule,
        set_layout: Option<&DescriptorSetLayout>,
        descriptor: &GraphicsPipelineDescriptor,
        render_pass: vk::RenderPass,
    ) -> Self {
        let set_layouts: Vec<vk::DescriptorSetLayout> =
            set_layout.map(|l| vec![l.raw]).unwrap_or_default();
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let layout = match unsafe { device.raw.create_pipeline_layout(&layout_info, None) } {
            Ok(layout) => layout,
            Err(err) => fatal(format!("pipeline layout creation failed: {err}")),
        };

        let entry = CString::new("main").unwrap();
        let stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex.raw)
                .name(&entry)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment.raw)
                .name(&entry)
                .build(),
        ];

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder();
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(descriptor.topology.unwrap_or(vk::PrimitiveTopology::TRIANGLE_LIST));
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);
        let rasterization = vk::PipelineRasterizationStateCreateInfo::builder()
            .cull_mode(descriptor.cull_mode.unwrap_or(vk::CullModeFlags::NONE))
            .line_width(1.0);
        let multisample = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(descriptor.depth_test_enable);
        let attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .blend_enable(descriptor.blend_enable)
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .build()];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::builder().attachments(&attachments);
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&descriptor.dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0)
            .build();

        let raw = match unsafe {
            device
                .raw
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
        } {
            Ok(mut pipelines) => pipelines.remove(0),
            Err((_, err)) => fatal(format!("graphics pipeline creation failed: {err}")),
        };

        Self {
            device: device.clone(),
            raw,
            layout,
        }
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.raw.destroy_pipeline(self.raw, None);
            self.device.raw.destroy_pipeline_layout(self.layout, None);
        }
    }
}
