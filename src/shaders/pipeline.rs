// SPDX-License-Identifier: GPL-3.0-only

//! Multi-pass compute graph
//!
//! Every shader effect runs the same recipe: upload the (padded, row-aligned)
//! source bitmap, run an ordered list of compute passes that each read some
//! textures and write one, then read a chosen texture back. [`Kernel`] holds a
//! compiled pipeline with its explicit bind group layout; [`ComputeGraph`]
//! describes one invocation and executes it in a single command buffer.
//!
//! Graph structure is checked on the host by [`GraphPlan::validate`] before any
//! GPU resource is created.

use crate::bitmap::{Bitmap, aligned_width, byte_len};
use crate::constants::{BYTES_PER_PIXEL, SamplerMode, TEXTURE_FORMAT, WORKGROUP_SIZE};
use crate::errors::{EffectResult, GpuError};
use crate::gpu::{GpuContext, wgpu};
use crate::shaders::gpu_processor::{
    compute_dispatch_size, pop_validation_scope, read_buffer_async,
};
use tracing::{debug, info};

/// Resource type of one bind group slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    /// Sampled `texture_2d<f32>`
    Texture,
    /// Write-only `texture_storage_2d<rgba8unorm, write>`
    StorageTexture,
    /// Filtering sampler (nearest samplers are also accepted)
    Sampler,
    /// Uniform buffer
    Uniform,
}

/// Create a bind group layout entry with common defaults
pub fn layout_entry(binding: u32, kind: BindingKind) -> wgpu::BindGroupLayoutEntry {
    let ty = match kind {
        BindingKind::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        BindingKind::StorageTexture => wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: TEXTURE_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        BindingKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        BindingKind::Uniform => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
    };
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty,
        count: None,
    }
}

/// Create a bind group layout from a list of binding kinds, numbered from 0
pub fn create_layout(
    device: &wgpu::Device,
    label: &str,
    bindings: &[BindingKind],
) -> wgpu::BindGroupLayout {
    let entries: Vec<_> = bindings
        .iter()
        .enumerate()
        .map(|(i, kind)| layout_entry(i as u32, *kind))
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

/// A compiled compute pipeline plus the layout its passes bind against
#[derive(Debug)]
pub struct Kernel {
    label: String,
    bindings: Vec<BindingKind>,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl Kernel {
    /// Compile `wgsl` and build its pipeline
    ///
    /// Shader and layout errors are captured with a validation scope and
    /// returned instead of reaching the uncaptured error handler.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        wgsl: &str,
        entry_point: &str,
        bindings: &[BindingKind],
    ) -> Result<Self, GpuError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });

        let layout = create_layout(device, &format!("{}_layout", label), bindings);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_pipeline_layout", label)),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        pollster::block_on(pop_validation_scope(device, label))?;

        info!(kernel = label, bindings = bindings.len(), "Compute kernel created");

        Ok(Self {
            label: label.to_string(),
            bindings: bindings.to_vec(),
            layout,
            pipeline,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bindings(&self) -> &[BindingKind] {
        &self.bindings
    }
}

/// Handle to a texture in a graph
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot(usize);

impl Slot {
    /// The uploaded source bitmap
    pub const SOURCE: Slot = Slot(0);
}

/// What a pass binds at one binding index
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    /// Sample from a texture
    Texture(Slot),
    /// Write into a texture
    StorageTexture(Slot),
    /// The graph's sampler
    Sampler,
    /// Uniform block contents
    Uniform(Vec<u8>),
}

impl Resource {
    /// Uniform block from a `#[repr(C)]` Pod struct
    pub fn uniform<T: bytemuck::Pod>(value: &T) -> Self {
        Resource::Uniform(bytemuck::bytes_of(value).to_vec())
    }

    pub fn kind(&self) -> BindingKind {
        match self {
            Resource::Texture(_) => BindingKind::Texture,
            Resource::StorageTexture(_) => BindingKind::StorageTexture,
            Resource::Sampler => BindingKind::Sampler,
            Resource::Uniform(_) => BindingKind::Uniform,
        }
    }
}

/// One dispatch, as recorded in a plan
#[derive(Clone, Debug, PartialEq)]
pub struct PassPlan {
    pub label: String,
    pub layout: Vec<BindingKind>,
    pub resources: Vec<Resource>,
}

impl PassPlan {
    fn reads(&self) -> impl Iterator<Item = Slot> + '_ {
        self.resources.iter().filter_map(|r| match r {
            Resource::Texture(slot) => Some(*slot),
            _ => None,
        })
    }

    fn writes(&self) -> impl Iterator<Item = Slot> + '_ {
        self.resources.iter().filter_map(|r| match r {
            Resource::StorageTexture(slot) => Some(*slot),
            _ => None,
        })
    }
}

/// Device-independent description of a compute graph
#[derive(Clone, Debug, PartialEq)]
pub struct GraphPlan {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub slots: Vec<String>,
    pub sampler: SamplerMode,
    pub passes: Vec<PassPlan>,
    pub output: Option<Slot>,
}

impl GraphPlan {
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
            slots: vec!["source".to_string()],
            sampler: SamplerMode::default(),
            passes: Vec::new(),
            output: None,
        }
    }

    pub fn add_texture(&mut self, label: &str) -> Slot {
        self.slots.push(label.to_string());
        Slot(self.slots.len() - 1)
    }

    pub fn add_pass(&mut self, label: &str, layout: &[BindingKind], resources: Vec<Resource>) {
        self.passes.push(PassPlan {
            label: label.to_string(),
            layout: layout.to_vec(),
            resources,
        });
    }

    fn slot_name(&self, slot: Slot) -> &str {
        self.slots.get(slot.0).map_or("<invalid>", String::as_str)
    }

    /// Check the graph is well formed before touching the GPU
    pub fn validate(&self) -> Result<(), GpuError> {
        let fail = |msg: String| Err(GpuError::Graph(format!("{}: {}", self.label, msg)));

        if self.width == 0 || self.height == 0 {
            return fail(format!("empty dimensions {}x{}", self.width, self.height));
        }
        if aligned_width(self.width, BYTES_PER_PIXEL) != self.width {
            return fail(format!("width {} is not row aligned", self.width));
        }
        if self.passes.is_empty() {
            return fail("no passes".to_string());
        }

        let mut written = vec![false; self.slots.len()];
        written[Slot::SOURCE.0] = true;

        for pass in &self.passes {
            if pass.resources.len() != pass.layout.len() {
                return fail(format!(
                    "pass '{}' binds {} resources but its kernel expects {}",
                    pass.label,
                    pass.resources.len(),
                    pass.layout.len()
                ));
            }

            let bindings = pass.resources.iter().zip(&pass.layout).enumerate();
            for (index, (resource, expected)) in bindings {
                if resource.kind() != *expected {
                    return fail(format!(
                        "pass '{}' binding {} is {:?}, kernel expects {:?}",
                        pass.label,
                        index,
                        resource.kind(),
                        expected
                    ));
                }
                let uniform_len = match resource {
                    Resource::Uniform(bytes) => Some(bytes.len()),
                    _ => None,
                };
                if let Some(len) = uniform_len.filter(|len| *len == 0 || len % 16 != 0) {
                    return fail(format!(
                        "pass '{}' uniform at binding {} is {} bytes, \
                         expected a non-empty multiple of 16",
                        pass.label,
                        index,
                        len
                    ));
                }
            }

            for slot in pass.reads().chain(pass.writes()) {
                if slot.0 >= self.slots.len() {
                    return fail(format!("pass '{}' uses unknown slot {}", pass.label, slot.0));
                }
            }

            for slot in pass.reads() {
                if !written[slot.0] {
                    return fail(format!(
                        "pass '{}' reads '{}' before any pass writes it",
                        pass.label,
                        self.slot_name(slot)
                    ));
                }
            }

            for slot in pass.writes() {
                if slot == Slot::SOURCE {
                    return fail(format!("pass '{}' writes the source texture", pass.label));
                }
                if pass.reads().any(|r| r == slot) {
                    return fail(format!(
                        "pass '{}' reads and writes '{}'",
                        pass.label,
                        self.slot_name(slot)
                    ));
                }
            }

            for slot in pass.writes() {
                written[slot.0] = true;
            }
        }

        match self.output {
            None => fail("no output texture".to_string()),
            Some(slot) if slot == Slot::SOURCE => fail("output is the source texture".to_string()),
            Some(slot) if slot.0 >= self.slots.len() || !written[slot.0] => fail(format!(
                "output '{}' is never written",
                self.slot_name(slot)
            )),
            Some(_) => Ok(()),
        }
    }
}

/// A graph bound to compiled kernels, ready to run
pub struct ComputeGraph<'k> {
    plan: GraphPlan,
    kernels: Vec<&'k Kernel>,
}

impl<'k> ComputeGraph<'k> {
    /// Graph over a row-aligned `width`×`height` source
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self {
            plan: GraphPlan::new(label, width, height),
            kernels: Vec::new(),
        }
    }

    pub fn source(&self) -> Slot {
        Slot::SOURCE
    }

    /// Add an intermediate or result texture the size of the source
    pub fn texture(&mut self, label: &str) -> Slot {
        self.plan.add_texture(label)
    }

    pub fn sampler(&mut self, mode: SamplerMode) -> &mut Self {
        self.plan.sampler = mode;
        self
    }

    /// Append a pass; bindings are numbered in the order given
    pub fn pass(&mut self, kernel: &'k Kernel, resources: Vec<Resource>) -> &mut Self {
        self.plan.add_pass(kernel.label(), kernel.bindings(), resources);
        self.kernels.push(kernel);
        self
    }

    pub fn output(&mut self, slot: Slot) -> &mut Self {
        self.plan.output = Some(slot);
        self
    }

    pub fn plan(&self) -> &GraphPlan {
        &self.plan
    }

    pub fn validate(&self) -> Result<(), GpuError> {
        self.plan.validate()
    }

    /// Upload `bitmap`, run every pass and read the output back
    ///
    /// The bitmap is padded to a row-aligned width first and cropped back
    /// afterwards, so callers may pass any size. The graph must have been
    /// created with the aligned dimensions (see [`ComputeGraph::for_bitmap`]).
    pub async fn run(&self, gpu: &GpuContext, bitmap: &Bitmap) -> EffectResult<Bitmap> {
        let aligned = bitmap.add_alignment_padding();
        let pixels = self.execute(gpu, &aligned.data).await?;
        let result = Bitmap::from_rgba(aligned.width, aligned.height, pixels)?;
        Ok(result.remove_alignment_padding(bitmap.width, bitmap.height))
    }

    /// Graph sized for `bitmap` after alignment padding
    pub fn for_bitmap(label: &str, bitmap: &Bitmap) -> Self {
        Self::new(label, aligned_width(bitmap.width, BYTES_PER_PIXEL), bitmap.height)
    }

    /// Run the graph on raw row-aligned RGBA pixels
    pub async fn execute(&self, gpu: &GpuContext, pixels: &[u8]) -> Result<Vec<u8>, GpuError> {
        self.validate()?;

        let plan = &self.plan;
        let (width, height) = (plan.width, plan.height);
        gpu.check_dimensions(width, height)?;
        let expected = byte_len(width, height)?;
        if pixels.len() != expected {
            return Err(GpuError::Graph(format!(
                "{}: source has {} bytes, expected {}",
                plan.label,
                pixels.len(),
                expected
            )));
        }
        // byte_len bounds the width, so the row size fits in u32
        let bytes_per_row = width * BYTES_PER_PIXEL;

        let device = &gpu.device;
        let queue = &gpu.queue;

        debug!(
            graph = %plan.label,
            width,
            height,
            textures = plan.slots.len(),
            passes = plan.passes.len(),
            "Allocating compute graph resources"
        );

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let textures: Vec<wgpu::Texture> = plan
            .slots
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let usage = if index == Slot::SOURCE.0 {
                    wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
                } else {
                    wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::STORAGE_BINDING
                        | wgpu::TextureUsages::COPY_SRC
                };
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("{}_{}", plan.label, name)),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: TEXTURE_FORMAT,
                    usage,
                    view_formats: &[],
                })
            })
            .collect();

        let views: Vec<wgpu::TextureView> = textures
            .iter()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &textures[Slot::SOURCE.0],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            extent,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{}_sampler", plan.label)),
            address_mode_u: plan.sampler.address_mode(),
            address_mode_v: plan.sampler.address_mode(),
            address_mode_w: plan.sampler.address_mode(),
            mag_filter: plan.sampler.filter_mode(),
            min_filter: plan.sampler.filter_mode(),
            ..Default::default()
        });

        // One uniform buffer per uniform binding, in pass order
        let mut uniform_buffers: Vec<Vec<wgpu::Buffer>> = Vec::with_capacity(plan.passes.len());
        for pass in &plan.passes {
            let mut buffers = Vec::new();
            for resource in &pass.resources {
                if let Resource::Uniform(bytes) = resource {
                    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some(&format!("{}_params", pass.label)),
                        size: bytes.len() as u64,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    });
                    queue.write_buffer(&buffer, 0, bytes);
                    buffers.push(buffer);
                }
            }
            uniform_buffers.push(buffers);
        }

        let bind_groups: Vec<wgpu::BindGroup> = plan
            .passes
            .iter()
            .zip(&self.kernels)
            .zip(&uniform_buffers)
            .map(|((pass, kernel), buffers)| {
                let mut next_uniform = buffers.iter();
                let entries: Vec<wgpu::BindGroupEntry> = pass
                    .resources
                    .iter()
                    .enumerate()
                    .filter_map(|(binding, resource)| {
                        let resource = match resource {
                            Resource::Texture(slot) | Resource::StorageTexture(slot) => {
                                wgpu::BindingResource::TextureView(&views[slot.0])
                            }
                            Resource::Sampler => wgpu::BindingResource::Sampler(&sampler),
                            Resource::Uniform(_) => next_uniform.next()?.as_entire_binding(),
                        };
                        Some(wgpu::BindGroupEntry {
                            binding: binding as u32,
                            resource,
                        })
                    })
                    .collect();
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{}_bind_group", pass.label)),
                    layout: &kernel.layout,
                    entries: &entries,
                })
            })
            .collect();

        let output = plan
            .output
            .ok_or_else(|| GpuError::Graph(format!("{}: no output texture", plan.label)))?;

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{}_staging", plan.label)),
            size: expected as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&format!("{}_encoder", plan.label)),
        });

        let workgroups_x = compute_dispatch_size(width, WORKGROUP_SIZE);
        let workgroups_y = compute_dispatch_size(height, WORKGROUP_SIZE);

        // Separate compute passes so each one sees the previous pass's writes
        let passes = plan.passes.iter().zip(&self.kernels).zip(&bind_groups);
        for ((pass, kernel), bind_group) in passes {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&pass.label),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&kernel.pipeline);
            compute_pass.set_bind_group(0, Some(bind_group), &[]);
            compute_pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &textures[output.0],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            extent,
        );

        queue.submit(std::iter::once(encoder.finish()));

        pop_validation_scope(device, &plan.label).await?;

        read_buffer_async(device, &staging_buffer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUR_LAYOUT: [BindingKind; 4] = [
        BindingKind::Texture,
        BindingKind::StorageTexture,
        BindingKind::Sampler,
        BindingKind::Uniform,
    ];

    fn uniform() -> Resource {
        Resource::Uniform(vec![0; 16])
    }

    fn two_pass_plan() -> GraphPlan {
        let mut plan = GraphPlan::new("blur", 64, 10);
        let intermediate = plan.add_texture("intermediate");
        let result = plan.add_texture("result");
        plan.add_pass(
            "vertical",
            &BLUR_LAYOUT,
            vec![
                Resource::Texture(Slot::SOURCE),
                Resource::StorageTexture(intermediate),
                Resource::Sampler,
                uniform(),
            ],
        );
        plan.add_pass(
            "horizontal",
            &BLUR_LAYOUT,
            vec![
                Resource::Texture(intermediate),
                Resource::StorageTexture(result),
                Resource::Sampler,
                uniform(),
            ],
        );
        plan.output = Some(result);
        plan
    }

    #[test]
    fn test_valid_two_pass_plan() {
        assert_eq!(two_pass_plan().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_unaligned_width() {
        let mut plan = two_pass_plan();
        plan.width = 65;
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_rejects_binding_mismatch() {
        let mut plan = two_pass_plan();
        plan.passes[0].resources.swap(2, 3);
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("binding 2"));
    }

    #[test]
    fn test_rejects_read_write_same_slot() {
        let mut plan = two_pass_plan();
        plan.passes[1].resources[1] = Resource::StorageTexture(Slot(1));
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_rejects_reading_unwritten_texture() {
        let mut plan = two_pass_plan();
        plan.passes.swap(0, 1);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_rejects_writing_source() {
        let mut plan = two_pass_plan();
        plan.passes[0].resources[1] = Resource::StorageTexture(Slot::SOURCE);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_rejects_unwritten_output() {
        let mut plan = two_pass_plan();
        let spare = plan.add_texture("spare");
        plan.output = Some(spare);
        assert!(plan.validate().is_err());

        plan.output = None;
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_rejects_odd_uniform_size() {
        let mut plan = two_pass_plan();
        plan.passes[0].resources[3] = Resource::Uniform(vec![0; 20]);
        assert!(plan.validate().is_err());
    }
}
