/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Handles are raw Vulkan handles (`Handle::as_raw`). Images and buffers are
/// backed by gpu-allocator allocations tracked per handle; every other object
/// is tracked in a live set so that anything still alive at drop time is
/// released before the context tears down the device.

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::{AllocationError, MemoryLocation as GpuMemoryLocation};
use rustc_hash::{FxHashMap, FxHashSet};

use frameline_gpu::frameline::device::{
    BindPoint, BufferDesc, BufferHandle, BufferImageCopy, ClearValue, CommandStreamHandle,
    ComputePipelineDesc, DescriptorPoolDesc, DescriptorPoolHandle, DescriptorResource,
    DescriptorSetHandle, DescriptorSetLayoutDesc, DescriptorSetLayoutHandle, DescriptorType,
    DescriptorWrite, GraphicsDevice, GraphicsPipelineDesc, ImageBarrier, ImageHandle,
    ImageViewHandle, IndexType, IndirectDraw, LoadOp, MemoryLocation, MipBlit, PipelineHandle,
    PipelineLayoutDesc, PipelineLayoutHandle, Rect2D, RenderingAttachment, RenderingInfo,
    SamplerDesc, SamplerHandle, ShaderModuleHandle, ShaderStage, ShaderStageFlags, SubmitMode,
    TextureDesc, TextureFormat, TextureUsage, Viewport, is_cube,
};
use frameline_gpu::frameline::{Error, Result};
use frameline_gpu::{engine_bail, engine_debug, engine_err, engine_error, engine_warn};

use crate::vulkan_context::{GpuContext, VulkanConfig};
use crate::vulkan_convert::*;

const SOURCE: &str = "frameline::vulkan::VulkanGraphicsDevice";

struct ImageEntry {
    image: vk::Image,
    allocation: Option<Allocation>,
}

struct BufferEntry {
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

/// Objects without memory of their own, tracked for teardown
#[derive(Default)]
struct LiveObjects {
    image_views: FxHashSet<vk::ImageView>,
    samplers: FxHashSet<vk::Sampler>,
    shader_modules: FxHashSet<vk::ShaderModule>,
    set_layouts: FxHashSet<vk::DescriptorSetLayout>,
    pipeline_layouts: FxHashSet<vk::PipelineLayout>,
    descriptor_pools: FxHashSet<vk::DescriptorPool>,
    pipelines: FxHashSet<vk::Pipeline>,
    command_buffers: FxHashSet<vk::CommandBuffer>,
}

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    images: FxHashMap<u64, ImageEntry>,
    buffers: FxHashMap<u64, BufferEntry>,
    live: LiveObjects,

    command_pool: vk::CommandPool,
    /// One fence per frame slot, created signaled on first use
    frame_fences: Vec<vk::Fence>,
    /// Unsignaled fence used by `SubmitMode::WaitIdle`
    idle_fence: vk::Fence,

    /// Declared last: dropped after `Drop::drop` released every object above
    context: GpuContext,
}

fn allocation_error(e: AllocationError) -> Error {
    match e {
        AllocationError::OutOfMemory => Error::OutOfMemory,
        other => engine_err!(SOURCE, "GPU allocation failed: {:?}", other),
    }
}

fn memory_location(location: MemoryLocation) -> GpuMemoryLocation {
    match location {
        MemoryLocation::GpuOnly => GpuMemoryLocation::GpuOnly,
        MemoryLocation::CpuToGpu => GpuMemoryLocation::CpuToGpu,
        MemoryLocation::GpuToCpu => GpuMemoryLocation::GpuToCpu,
    }
}

fn resource_type(resource: &DescriptorResource) -> DescriptorType {
    match resource {
        DescriptorResource::UniformBuffer { .. } => DescriptorType::UniformBuffer,
        DescriptorResource::StorageBuffer { .. } => DescriptorType::StorageBuffer,
        DescriptorResource::SampledImage { .. } => DescriptorType::SampledImage,
        DescriptorResource::StorageImage { .. } => DescriptorType::StorageImage,
    }
}

fn clear_value_to_vk(load: LoadOp) -> vk::ClearValue {
    match load {
        LoadOp::Clear(ClearValue::Color(color)) => vk::ClearValue {
            color: vk::ClearColorValue { float32: color },
        },
        LoadOp::Clear(ClearValue::DepthStencil { depth, stencil }) => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
        LoadOp::Load | LoadOp::DontCare => vk::ClearValue::default(),
    }
}

fn attachment_to_vk(attachment: &RenderingAttachment, layout: vk::ImageLayout) -> vk::RenderingAttachmentInfo<'static> {
    vk::RenderingAttachmentInfo::default()
        .image_view(vk::ImageView::from_raw(attachment.view.raw()))
        .image_layout(layout)
        .load_op(load_op_to_vk(attachment.load))
        .store_op(vk::AttachmentStoreOp::STORE)
        .clear_value(clear_value_to_vk(attachment.load))
}

fn mip_offset(extent: (u32, u32, u32)) -> vk::Offset3D {
    vk::Offset3D {
        x: extent.0 as i32,
        y: extent.1 as i32,
        z: extent.2 as i32,
    }
}

impl VulkanGraphicsDevice {
    /// Create the Vulkan context and the device-level objects of this backend
    pub fn new(config: &VulkanConfig) -> Result<Self> {
        let context = GpuContext::new(config)?;

        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(context.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = context.device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_error!(SOURCE, "Failed to create command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?;

            let idle_fence = match context.device.create_fence(&vk::FenceCreateInfo::default(), None) {
                Ok(fence) => fence,
                Err(e) => {
                    context.device.destroy_command_pool(command_pool, None);
                    engine_error!(SOURCE, "Failed to create idle fence: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create fence: {:?}", e)));
                }
            };

            Ok(Self {
                images: FxHashMap::default(),
                buffers: FxHashMap::default(),
                live: LiveObjects::default(),
                command_pool,
                frame_fences: Vec::new(),
                idle_fence,
                context,
            })
        }
    }

    /// Shared Vulkan objects (instance, device, queue)
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    fn vk_image(&self, image: ImageHandle) -> vk::Image {
        vk::Image::from_raw(image.raw())
    }

    fn vk_buffer(&self, buffer: BufferHandle) -> vk::Buffer {
        vk::Buffer::from_raw(buffer.raw())
    }

    fn vk_cmd(&self, stream: CommandStreamHandle) -> vk::CommandBuffer {
        vk::CommandBuffer::from_raw(stream.raw())
    }

    /// Fence of `slot`, created signaled when the slot is first used
    fn frame_fence(&mut self, slot: usize) -> Result<vk::Fence> {
        while self.frame_fences.len() <= slot {
            let info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let fence = unsafe { self.context.device.create_fence(&info, None) }
                .map_err(|e| engine_err!(SOURCE, "Failed to create frame fence: {:?}", e))?;
            self.frame_fences.push(fence);
        }
        Ok(self.frame_fences[slot])
    }

    fn buffer_entry(&self, buffer: BufferHandle) -> Result<&BufferEntry> {
        self.buffers
            .get(&buffer.raw())
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {:?}", buffer)))
    }

    fn subresource_layers(format: TextureFormat, mip_level: u32, base_layer: u32, layer_count: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: copy_aspect_mask(format),
            mip_level,
            base_array_layer: base_layer,
            layer_count,
        }
    }

    fn buffer_image_copy(format: TextureFormat, region: &BufferImageCopy) -> vk::BufferImageCopy {
        vk::BufferImageCopy {
            buffer_offset: region.buffer_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: Self::subresource_layers(format, region.mip_level, region.base_layer, region.layer_count),
            image_offset: vk::Offset3D {
                x: region.offset[0] as i32,
                y: region.offset[1] as i32,
                z: region.offset[2] as i32,
            },
            image_extent: vk::Extent3D {
                width: region.extent[0],
                height: region.extent[1],
                depth: region.extent[2],
            },
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn name(&self) -> &str {
        &self.context.device_name
    }

    // ===== IMAGES & SAMPLERS =====

    fn create_image(&mut self, desc: &TextureDesc) -> Result<ImageHandle> {
        let flags = if is_cube(desc.shape) {
            vk::ImageCreateFlags::CUBE_COMPATIBLE
        } else {
            vk::ImageCreateFlags::empty()
        };
        let info = vk::ImageCreateInfo::default()
            .flags(flags)
            .image_type(image_type_to_vk(desc.shape))
            .format(texture_format_to_vk(desc.format))
            .extent(vk::Extent3D {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth: desc.depth.max(1),
            })
            .mip_levels(desc.mip_levels.max(1))
            .array_layers(desc.image_layers())
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(texture_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let device = &self.context.device;
            let image = device
                .create_image(&info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create image: {:?}", e))?;
            let requirements = device.get_image_memory_requirements(image);

            let allocation = match self.context.allocator.allocate(&AllocationCreateDesc {
                name: "frameline image",
                requirements,
                location: GpuMemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(allocation_error(e));
                }
            };

            if let Err(e) = device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.context.allocator.free(allocation).ok();
                device.destroy_image(image, None);
                engine_bail!(SOURCE, "Failed to bind image memory: {:?}", e);
            }

            self.images.insert(image.as_raw(), ImageEntry { image, allocation: Some(allocation) });
            Ok(ImageHandle(image.as_raw()))
        }
    }

    fn destroy_image(&mut self, image: ImageHandle) {
        let Some(mut entry) = self.images.remove(&image.raw()) else {
            engine_warn!(SOURCE, "destroy_image: unknown image {:?}", image);
            return;
        };
        unsafe {
            self.context.device.destroy_image(entry.image, None);
        }
        if let Some(allocation) = entry.allocation.take() {
            if let Err(e) = self.context.allocator.free(allocation) {
                engine_error!(SOURCE, "Failed to free image memory: {:?}", e);
            }
        }
    }

    fn create_image_view(&mut self, image: ImageHandle, desc: &TextureDesc) -> Result<ImageViewHandle> {
        // attachments need every aspect, sampled depth views only the depth aspect
        let aspect = if desc.usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT) {
            aspect_mask(desc.format)
        } else {
            copy_aspect_mask(desc.format)
        };
        let info = vk::ImageViewCreateInfo::default()
            .image(self.vk_image(image))
            .view_type(image_view_type_to_vk(desc.shape))
            .format(texture_format_to_vk(desc.format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: desc.mip_levels.max(1),
                base_array_layer: 0,
                layer_count: desc.image_layers(),
            });

        let view = unsafe { self.context.device.create_image_view(&info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create image view: {:?}", e))?;
        self.live.image_views.insert(view);
        Ok(ImageViewHandle(view.as_raw()))
    }

    fn destroy_image_view(&mut self, view: ImageViewHandle) {
        let view = vk::ImageView::from_raw(view.raw());
        if self.live.image_views.remove(&view) {
            unsafe { self.context.device.destroy_image_view(view, None) };
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle> {
        let filter = filter_to_vk(desc.filter);
        let address = address_mode_to_vk(desc.address_mode);
        let mipmap_mode = match filter {
            vk::Filter::NEAREST => vk::SamplerMipmapMode::NEAREST,
            _ => vk::SamplerMipmapMode::LINEAR,
        };
        let info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(mipmap_mode)
            .address_mode_u(address)
            .address_mode_v(address)
            .address_mode_w(address)
            .min_lod(0.0)
            .max_lod(if desc.mipmaps { vk::LOD_CLAMP_NONE } else { 0.0 });

        let sampler = unsafe { self.context.device.create_sampler(&info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create sampler: {:?}", e))?;
        self.live.samplers.insert(sampler);
        Ok(SamplerHandle(sampler.as_raw()))
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        let sampler = vk::Sampler::from_raw(sampler.raw());
        if self.live.samplers.remove(&sampler) {
            unsafe { self.context.device.destroy_sampler(sampler, None) };
        }
    }

    fn supports_linear_blit(&self, format: TextureFormat) -> bool {
        let properties = unsafe {
            self.context
                .instance
                .get_physical_device_format_properties(self.context.physical_device, texture_format_to_vk(format))
        };
        properties.optimal_tiling_features.contains(
            vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR
                | vk::FormatFeatureFlags::BLIT_SRC
                | vk::FormatFeatureFlags::BLIT_DST,
        )
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        let info = vk::BufferCreateInfo::default()
            .size(desc.size.max(1))
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        unsafe {
            let device = &self.context.device;
            let buffer = device
                .create_buffer(&info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer: {:?}", e))?;
            let requirements = device.get_buffer_memory_requirements(buffer);

            let allocation = match self.context.allocator.allocate(&AllocationCreateDesc {
                name: "frameline buffer",
                requirements,
                location: memory_location(desc.location),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(allocation_error(e));
                }
            };

            if let Err(e) = device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.context.allocator.free(allocation).ok();
                device.destroy_buffer(buffer, None);
                engine_bail!(SOURCE, "Failed to bind buffer memory: {:?}", e);
            }

            self.buffers.insert(
                buffer.as_raw(),
                BufferEntry { buffer, allocation: Some(allocation), size: desc.size },
            );
            Ok(BufferHandle(buffer.as_raw()))
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        let Some(mut entry) = self.buffers.remove(&buffer.raw()) else {
            engine_warn!(SOURCE, "destroy_buffer: unknown buffer {:?}", buffer);
            return;
        };
        unsafe {
            self.context.device.destroy_buffer(entry.buffer, None);
        }
        if let Some(allocation) = entry.allocation.take() {
            if let Err(e) = self.context.allocator.free(allocation) {
                engine_error!(SOURCE, "Failed to free buffer memory: {:?}", e);
            }
        }
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let entry = self
            .buffers
            .get_mut(&buffer.raw())
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {:?}", buffer)))?;
        let end = offset.checked_add(data.len() as u64).unwrap_or(u64::MAX);
        if end > entry.size {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} exceeds buffer size {}", data.len(), offset, entry.size
            )));
        }
        let mapped = entry
            .allocation
            .as_mut()
            .and_then(|a| a.mapped_slice_mut())
            .ok_or_else(|| Error::InvalidResource("buffer is not CPU-visible".to_string()))?;
        mapped[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn invalidate_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        // gpu-allocator only maps host-coherent memory
        self.buffer_entry(buffer).map(|_| ())
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()> {
        let entry = self.buffer_entry(buffer)?;
        let end = offset.checked_add(out.len() as u64).unwrap_or(u64::MAX);
        if end > entry.size {
            return Err(Error::InvalidResource(format!(
                "read of {} bytes at {} exceeds buffer size {}", out.len(), offset, entry.size
            )));
        }
        let mapped = entry
            .allocation
            .as_ref()
            .and_then(|a| a.mapped_slice())
            .ok_or_else(|| Error::InvalidResource("buffer is not CPU-visible".to_string()))?;
        out.copy_from_slice(&mapped[offset as usize..end as usize]);
        Ok(())
    }

    // ===== SHADERS & LAYOUTS =====

    fn create_shader_module(&mut self, stage: ShaderStage, code: &[u32]) -> Result<ShaderModuleHandle> {
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe { self.context.device.create_shader_module(&info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create {:?} shader module: {:?}", stage, e))?;
        self.live.shader_modules.insert(module);
        Ok(ShaderModuleHandle(module.as_raw()))
    }

    fn destroy_shader_module(&mut self, module: ShaderModuleHandle) {
        let module = vk::ShaderModule::from_raw(module.raw());
        if self.live.shader_modules.remove(&module) {
            unsafe { self.context.device.destroy_shader_module(module, None) };
        }
    }

    fn create_descriptor_set_layout(&mut self, desc: &DescriptorSetLayoutDesc) -> Result<DescriptorSetLayoutHandle> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc
            .bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(descriptor_type_to_vk(b.descriptor_type))
                    .descriptor_count(b.count)
                    .stage_flags(stage_flags_to_vk(b.stages))
            })
            .collect();

        let binding_flags: Vec<vk::DescriptorBindingFlags> = desc
            .bindings
            .iter()
            .map(|b| {
                let mut flags = vk::DescriptorBindingFlags::empty();
                if desc.update_after_bind {
                    flags |= vk::DescriptorBindingFlags::UPDATE_AFTER_BIND | vk::DescriptorBindingFlags::PARTIALLY_BOUND;
                }
                if b.variable_count {
                    flags |= vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT | vk::DescriptorBindingFlags::PARTIALLY_BOUND;
                }
                flags
            })
            .collect();
        let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags);

        let create_flags = if desc.update_after_bind {
            vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL
        } else {
            vk::DescriptorSetLayoutCreateFlags::empty()
        };
        let info = vk::DescriptorSetLayoutCreateInfo::default()
            .flags(create_flags)
            .bindings(&bindings)
            .push_next(&mut flags_info);

        let layout = unsafe { self.context.device.create_descriptor_set_layout(&info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create descriptor set layout: {:?}", e))?;
        self.live.set_layouts.insert(layout);
        Ok(DescriptorSetLayoutHandle(layout.as_raw()))
    }

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) {
        let layout = vk::DescriptorSetLayout::from_raw(layout.raw());
        if self.live.set_layouts.remove(&layout) {
            unsafe { self.context.device.destroy_descriptor_set_layout(layout, None) };
        }
    }

    fn create_pipeline_layout(&mut self, desc: &PipelineLayoutDesc) -> Result<PipelineLayoutHandle> {
        let set_layouts: Vec<vk::DescriptorSetLayout> = desc
            .set_layouts
            .iter()
            .map(|l| vk::DescriptorSetLayout::from_raw(l.raw()))
            .collect();
        let push_constant_ranges = if desc.push_constant_size > 0 {
            vec![vk::PushConstantRange {
                stage_flags: stage_flags_to_vk(desc.push_constant_stages),
                offset: 0,
                size: desc.push_constant_size,
            }]
        } else {
            Vec::new()
        };
        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);

        let layout = unsafe { self.context.device.create_pipeline_layout(&info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create pipeline layout: {:?}", e))?;
        self.live.pipeline_layouts.insert(layout);
        Ok(PipelineLayoutHandle(layout.as_raw()))
    }

    fn destroy_pipeline_layout(&mut self, layout: PipelineLayoutHandle) {
        let layout = vk::PipelineLayout::from_raw(layout.raw());
        if self.live.pipeline_layouts.remove(&layout) {
            unsafe { self.context.device.destroy_pipeline_layout(layout, None) };
        }
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_pool(&mut self, desc: &DescriptorPoolDesc) -> Result<DescriptorPoolHandle> {
        let pool_sizes: Vec<vk::DescriptorPoolSize> = desc
            .sizes
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(ty, count)| vk::DescriptorPoolSize {
                ty: descriptor_type_to_vk(*ty),
                descriptor_count: *count,
            })
            .collect();
        let flags = if desc.update_after_bind {
            vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND
        } else {
            vk::DescriptorPoolCreateFlags::empty()
        };
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(flags)
            .max_sets(desc.max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { self.context.device.create_descriptor_pool(&info, None) }.map_err(|e| match e {
            vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfMemory,
            other => engine_err!(SOURCE, "Failed to create descriptor pool: {:?}", other),
        })?;
        self.live.descriptor_pools.insert(pool);
        engine_debug!(SOURCE, "Created descriptor pool ({} sets)", desc.max_sets);
        Ok(DescriptorPoolHandle(pool.as_raw()))
    }

    fn reset_descriptor_pool(&mut self, pool: DescriptorPoolHandle) -> Result<()> {
        let pool = vk::DescriptorPool::from_raw(pool.raw());
        unsafe {
            self.context
                .device
                .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
        }
        .map_err(|e| engine_err!(SOURCE, "Failed to reset descriptor pool: {:?}", e))
    }

    fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle) {
        let pool = vk::DescriptorPool::from_raw(pool.raw());
        if self.live.descriptor_pools.remove(&pool) {
            unsafe { self.context.device.destroy_descriptor_pool(pool, None) };
        }
    }

    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
        variable_count: u32,
    ) -> Result<DescriptorSetHandle> {
        let set_layouts = [vk::DescriptorSetLayout::from_raw(layout.raw())];
        let counts = [variable_count];
        let mut variable_info = vk::DescriptorSetVariableDescriptorCountAllocateInfo::default().descriptor_counts(&counts);

        let mut info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(vk::DescriptorPool::from_raw(pool.raw()))
            .set_layouts(&set_layouts);
        if variable_count > 0 {
            info = info.push_next(&mut variable_info);
        }

        let sets = unsafe { self.context.device.allocate_descriptor_sets(&info) }.map_err(|e| match e {
            vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => Error::OutOfPoolMemory,
            other => engine_err!(SOURCE, "Failed to allocate descriptor set: {:?}", other),
        })?;
        sets.first()
            .map(|set| DescriptorSetHandle(set.as_raw()))
            .ok_or_else(|| engine_err!(SOURCE, "Descriptor set allocation returned no set"))
    }

    fn write_descriptor_set(&mut self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) {
        let dst_set = vk::DescriptorSet::from_raw(set.raw());
        let device = &self.context.device;

        for write in writes {
            let base = vk::WriteDescriptorSet::default()
                .dst_set(dst_set)
                .dst_binding(write.binding)
                .dst_array_element(write.array_element)
                .descriptor_type(descriptor_type_to_vk(resource_type(&write.resource)));

            match write.resource {
                DescriptorResource::UniformBuffer { buffer, offset, range }
                | DescriptorResource::StorageBuffer { buffer, offset, range } => {
                    let info = [vk::DescriptorBufferInfo {
                        buffer: vk::Buffer::from_raw(buffer.raw()),
                        offset,
                        range: if range == 0 { vk::WHOLE_SIZE } else { range },
                    }];
                    unsafe { device.update_descriptor_sets(&[base.buffer_info(&info)], &[]) };
                }
                DescriptorResource::SampledImage { view, sampler } => {
                    let info = [vk::DescriptorImageInfo {
                        sampler: vk::Sampler::from_raw(sampler.raw()),
                        image_view: vk::ImageView::from_raw(view.raw()),
                        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    }];
                    unsafe { device.update_descriptor_sets(&[base.image_info(&info)], &[]) };
                }
                DescriptorResource::StorageImage { view } => {
                    let info = [vk::DescriptorImageInfo {
                        sampler: vk::Sampler::null(),
                        image_view: vk::ImageView::from_raw(view.raw()),
                        image_layout: vk::ImageLayout::GENERAL,
                    }];
                    unsafe { device.update_descriptor_sets(&[base.image_info(&info)], &[]) };
                }
            }
        }
    }

    // ===== PIPELINES =====

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<PipelineHandle> {
        let mut stages = vec![vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vk::ShaderModule::from_raw(desc.vertex_shader.raw()))
            .name(c"main")];
        if let Some(fragment) = desc.fragment_shader {
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(vk::ShaderModule::from_raw(fragment.raw()))
                    .name(c"main"),
            );
        }

        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
            .vertex_layout
            .bindings
            .iter()
            .map(|b| vk::VertexInputBindingDescription {
                binding: b.binding,
                stride: b.stride,
                input_rate: input_rate_to_vk(b.input_rate),
            })
            .collect();
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_layout
            .attributes
            .iter()
            .map(|a| vk::VertexInputAttributeDescription {
                location: a.location,
                binding: a.binding,
                format: vertex_format_to_vk(a.format),
                offset: a.offset,
            })
            .collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.fixed.topology))
            .primitive_restart_enable(false);

        // viewport and scissor are dynamic
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let raster = &desc.fixed.rasterization;
        let mut rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(polygon_mode_to_vk(raster.polygon_mode))
            .cull_mode(cull_mode_to_vk(raster.cull_mode))
            .front_face(front_face_to_vk(raster.front_face))
            .line_width(1.0);
        if let Some(bias) = raster.depth_bias {
            rasterization = rasterization
                .depth_bias_enable(true)
                .depth_bias_constant_factor(bias.constant_factor)
                .depth_bias_slope_factor(bias.slope_factor)
                .depth_bias_clamp(bias.clamp);
        }

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(sample_count_to_vk(desc.fixed.multisample.sample_count))
            .alpha_to_coverage_enable(desc.fixed.multisample.alpha_to_coverage);

        let ds = &desc.fixed.depth_stencil;
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(ds.depth_test_enable)
            .depth_write_enable(ds.depth_write_enable)
            .depth_compare_op(compare_op_to_vk(ds.depth_compare_op))
            .stencil_test_enable(ds.stencil_test_enable)
            .front(stencil_op_state_to_vk(&ds.front))
            .back(stencil_op_state_to_vk(&ds.back));

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = (0..desc.color_formats.len())
            .map(|i| {
                let blend = desc.fixed.blend_for(i);
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(blend.blend_enable)
                    .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
                    .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
                    .color_blend_op(blend_op_to_vk(blend.color_blend_op))
                    .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
                    .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
                    .alpha_blend_op(blend_op_to_vk(blend.alpha_blend_op))
                    .color_write_mask(color_write_mask_to_vk(&blend.color_write_mask))
            })
            .collect();
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [
            vk::DynamicState::VIEWPORT,
            vk::DynamicState::SCISSOR,
            vk::DynamicState::STENCIL_REFERENCE,
        ];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_formats: Vec<vk::Format> = desc.color_formats.iter().map(|f| texture_format_to_vk(*f)).collect();
        let mut rendering = vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);
        if let Some(depth) = desc.depth_format {
            rendering = rendering.depth_attachment_format(texture_format_to_vk(depth));
            if depth.has_stencil() {
                rendering = rendering.stencil_attachment_format(texture_format_to_vk(depth));
            }
        }

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(vk::PipelineLayout::from_raw(desc.layout.raw()))
            .push_next(&mut rendering);

        let pipelines = unsafe {
            self.context
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
        }
        .map_err(|(_, e)| engine_err!(SOURCE, "Failed to create graphics pipeline: {:?}", e))?;

        let pipeline = pipelines
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Graphics pipeline creation returned no pipeline"))?;
        self.live.pipelines.insert(pipeline);
        Ok(PipelineHandle(pipeline.as_raw()))
    }

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<PipelineHandle> {
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(vk::ShaderModule::from_raw(desc.shader.raw()))
            .name(c"main");
        let info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(vk::PipelineLayout::from_raw(desc.layout.raw()));

        let pipelines = unsafe {
            self.context
                .device
                .create_compute_pipelines(vk::PipelineCache::null(), &[info], None)
        }
        .map_err(|(_, e)| engine_err!(SOURCE, "Failed to create compute pipeline: {:?}", e))?;

        let pipeline = pipelines
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Compute pipeline creation returned no pipeline"))?;
        self.live.pipelines.insert(pipeline);
        Ok(PipelineHandle(pipeline.as_raw()))
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        let pipeline = vk::Pipeline::from_raw(pipeline.raw());
        if self.live.pipelines.remove(&pipeline) {
            unsafe { self.context.device.destroy_pipeline(pipeline, None) };
        }
    }

    // ===== COMMAND STREAMS & SUBMISSION =====

    fn create_command_stream(&mut self) -> Result<CommandStreamHandle> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.context.device.allocate_command_buffers(&info) }
            .map_err(|e| engine_err!(SOURCE, "Failed to allocate command buffer: {:?}", e))?;
        let cmd = buffers
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Command buffer allocation returned nothing"))?;
        self.live.command_buffers.insert(cmd);
        Ok(CommandStreamHandle(cmd.as_raw()))
    }

    fn destroy_command_stream(&mut self, stream: CommandStreamHandle) {
        let cmd = self.vk_cmd(stream);
        if self.live.command_buffers.remove(&cmd) {
            unsafe { self.context.device.free_command_buffers(self.command_pool, &[cmd]) };
        }
    }

    fn begin_command_stream(&mut self, stream: CommandStreamHandle) -> Result<()> {
        let cmd = self.vk_cmd(stream);
        let info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            let device = &self.context.device;
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!(SOURCE, "Failed to reset command buffer: {:?}", e))?;
            device
                .begin_command_buffer(cmd, &info)
                .map_err(|e| engine_err!(SOURCE, "Failed to begin command buffer: {:?}", e))
        }
    }

    fn end_command_stream(&mut self, stream: CommandStreamHandle) -> Result<()> {
        let cmd = self.vk_cmd(stream);
        unsafe { self.context.device.end_command_buffer(cmd) }
            .map_err(|e| engine_err!(SOURCE, "Failed to end command buffer: {:?}", e))
    }

    fn submit(&mut self, streams: &[CommandStreamHandle], mode: SubmitMode) -> Result<()> {
        let command_buffers: Vec<vk::CommandBuffer> = streams.iter().map(|s| self.vk_cmd(*s)).collect();
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        let fence = match mode {
            SubmitMode::WaitIdle => self.idle_fence,
            SubmitMode::SignalFrame(slot) => {
                let fence = self.frame_fence(slot)?;
                unsafe { self.context.device.reset_fences(&[fence]) }
                    .map_err(|e| engine_err!(SOURCE, "Failed to reset frame fence: {:?}", e))?;
                fence
            }
        };

        unsafe {
            let device = &self.context.device;
            device
                .queue_submit(self.context.graphics_queue, &[submit_info], fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to submit command buffers: {:?}", e))?;

            if mode == SubmitMode::WaitIdle {
                device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(|e| engine_err!(SOURCE, "Failed to wait for submission: {:?}", e))?;
                device
                    .reset_fences(&[fence])
                    .map_err(|e| engine_err!(SOURCE, "Failed to reset idle fence: {:?}", e))?;
            }
        }
        Ok(())
    }

    fn wait_frame(&mut self, slot: usize) -> Result<()> {
        // a slot that never signaled has nothing in flight
        let Some(&fence) = self.frame_fences.get(slot) else {
            return Ok(());
        };
        unsafe { self.context.device.wait_for_fences(&[fence], true, u64::MAX) }
            .map_err(|e| engine_err!(SOURCE, "Failed to wait for frame slot {}: {:?}", slot, e))
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe { self.context.device.device_wait_idle() }
            .map_err(|e| engine_err!(SOURCE, "Failed to wait for device idle: {:?}", e))
    }

    // ===== RECORDING =====

    fn cmd_image_barrier(&mut self, stream: CommandStreamHandle, barrier: &ImageBarrier) {
        let (src_access, src_stage) = layout_access(barrier.old_layout);
        let (dst_access, dst_stage) = layout_access(barrier.new_layout);
        let image_barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .old_layout(image_layout_to_vk(barrier.old_layout))
            .new_layout(image_layout_to_vk(barrier.new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.vk_image(barrier.image))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_mask(barrier.format),
                base_mip_level: barrier.base_mip,
                level_count: barrier.mip_count,
                base_array_layer: barrier.base_layer,
                layer_count: barrier.layer_count,
            });
        unsafe {
            self.context.device.cmd_pipeline_barrier(
                self.vk_cmd(stream),
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[image_barrier],
            );
        }
    }

    fn cmd_copy_buffer(
        &mut self,
        stream: CommandStreamHandle,
        src: BufferHandle,
        dst: BufferHandle,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    ) {
        let region = vk::BufferCopy { src_offset, dst_offset, size };
        unsafe {
            self.context
                .device
                .cmd_copy_buffer(self.vk_cmd(stream), self.vk_buffer(src), self.vk_buffer(dst), &[region]);
        }
    }

    fn cmd_copy_buffer_to_image(
        &mut self,
        stream: CommandStreamHandle,
        src: BufferHandle,
        dst: ImageHandle,
        format: TextureFormat,
        region: &BufferImageCopy,
    ) {
        let copy = Self::buffer_image_copy(format, region);
        unsafe {
            self.context.device.cmd_copy_buffer_to_image(
                self.vk_cmd(stream),
                self.vk_buffer(src),
                self.vk_image(dst),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[copy],
            );
        }
    }

    fn cmd_copy_image_to_buffer(
        &mut self,
        stream: CommandStreamHandle,
        src: ImageHandle,
        format: TextureFormat,
        dst: BufferHandle,
        region: &BufferImageCopy,
    ) {
        let copy = Self::buffer_image_copy(format, region);
        unsafe {
            self.context.device.cmd_copy_image_to_buffer(
                self.vk_cmd(stream),
                self.vk_image(src),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                self.vk_buffer(dst),
                &[copy],
            );
        }
    }

    fn cmd_blit_mip(&mut self, stream: CommandStreamHandle, blit: &MipBlit) {
        let subresource = |mip_level: u32| vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level,
            base_array_layer: blit.base_layer,
            layer_count: blit.layer_count,
        };
        let region = vk::ImageBlit {
            src_subresource: subresource(blit.src_level),
            src_offsets: [vk::Offset3D::default(), mip_offset(blit.src_extent)],
            dst_subresource: subresource(blit.src_level + 1),
            dst_offsets: [vk::Offset3D::default(), mip_offset(blit.dst_extent)],
        };
        let image = self.vk_image(blit.image);
        unsafe {
            self.context.device.cmd_blit_image(
                self.vk_cmd(stream),
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                vk::Filter::LINEAR,
            );
        }
    }

    fn cmd_begin_rendering(&mut self, stream: CommandStreamHandle, info: &RenderingInfo) {
        let colors: Vec<vk::RenderingAttachmentInfo> = info
            .color_attachments
            .iter()
            .map(|a| attachment_to_vk(a, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL))
            .collect();
        let depth = info
            .depth_attachment
            .as_ref()
            .map(|a| attachment_to_vk(a, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL));

        let mut rendering = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: info.width, height: info.height },
            })
            .layer_count(1)
            .color_attachments(&colors);
        if let Some(depth) = depth.as_ref() {
            rendering = rendering.depth_attachment(depth);
            if info.depth_attachment.is_some_and(|a| a.format.has_stencil()) {
                rendering = rendering.stencil_attachment(depth);
            }
        }

        unsafe {
            self.context.device.cmd_begin_rendering(self.vk_cmd(stream), &rendering);
        }
    }

    fn cmd_end_rendering(&mut self, stream: CommandStreamHandle) {
        unsafe {
            self.context.device.cmd_end_rendering(self.vk_cmd(stream));
        }
    }

    fn cmd_set_viewport(&mut self, stream: CommandStreamHandle, viewport: &Viewport) {
        let vp = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.context.device.cmd_set_viewport(self.vk_cmd(stream), 0, &[vp]);
        }
    }

    fn cmd_set_scissor(&mut self, stream: CommandStreamHandle, scissor: &Rect2D) {
        let rect = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };
        unsafe {
            self.context.device.cmd_set_scissor(self.vk_cmd(stream), 0, &[rect]);
        }
    }

    fn cmd_set_stencil_reference(&mut self, stream: CommandStreamHandle, reference: u32) {
        unsafe {
            self.context.device.cmd_set_stencil_reference(
                self.vk_cmd(stream),
                vk::StencilFaceFlags::FRONT_AND_BACK,
                reference,
            );
        }
    }

    fn cmd_bind_pipeline(&mut self, stream: CommandStreamHandle, bind_point: BindPoint, pipeline: PipelineHandle) {
        let bind_point = match bind_point {
            BindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
            BindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
        };
        unsafe {
            self.context.device.cmd_bind_pipeline(
                self.vk_cmd(stream),
                bind_point,
                vk::Pipeline::from_raw(pipeline.raw()),
            );
        }
    }

    fn cmd_bind_descriptor_sets(
        &mut self,
        stream: CommandStreamHandle,
        bind_point: BindPoint,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    ) {
        let bind_point = match bind_point {
            BindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
            BindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
        };
        let sets: Vec<vk::DescriptorSet> = sets.iter().map(|s| vk::DescriptorSet::from_raw(s.raw())).collect();
        unsafe {
            self.context.device.cmd_bind_descriptor_sets(
                self.vk_cmd(stream),
                bind_point,
                vk::PipelineLayout::from_raw(layout.raw()),
                first_set,
                &sets,
                &[],
            );
        }
    }

    fn cmd_push_constants(
        &mut self,
        stream: CommandStreamHandle,
        layout: PipelineLayoutHandle,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        unsafe {
            self.context.device.cmd_push_constants(
                self.vk_cmd(stream),
                vk::PipelineLayout::from_raw(layout.raw()),
                stage_flags_to_vk(stages),
                offset,
                data,
            );
        }
    }

    fn cmd_bind_vertex_buffers(&mut self, stream: CommandStreamHandle, first_binding: u32, buffers: &[(BufferHandle, u64)]) {
        let handles: Vec<vk::Buffer> = buffers.iter().map(|(b, _)| self.vk_buffer(*b)).collect();
        let offsets: Vec<u64> = buffers.iter().map(|(_, offset)| *offset).collect();
        unsafe {
            self.context
                .device
                .cmd_bind_vertex_buffers(self.vk_cmd(stream), first_binding, &handles, &offsets);
        }
    }

    fn cmd_bind_index_buffer(&mut self, stream: CommandStreamHandle, buffer: BufferHandle, offset: u64, index_type: IndexType) {
        unsafe {
            self.context.device.cmd_bind_index_buffer(
                self.vk_cmd(stream),
                self.vk_buffer(buffer),
                offset,
                index_type_to_vk(index_type),
            );
        }
    }

    fn cmd_draw(
        &mut self,
        stream: CommandStreamHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.context
                .device
                .cmd_draw(self.vk_cmd(stream), vertex_count, instance_count, first_vertex, first_instance);
        }
    }

    fn cmd_draw_indexed(
        &mut self,
        stream: CommandStreamHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.context.device.cmd_draw_indexed(
                self.vk_cmd(stream),
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    fn cmd_draw_indirect(&mut self, stream: CommandStreamHandle, draw: &IndirectDraw) {
        let cmd = self.vk_cmd(stream);
        let buffer = self.vk_buffer(draw.buffer);
        unsafe {
            if draw.indexed {
                self.context
                    .device
                    .cmd_draw_indexed_indirect(cmd, buffer, draw.offset, draw.draw_count, draw.stride);
            } else {
                self.context
                    .device
                    .cmd_draw_indirect(cmd, buffer, draw.offset, draw.draw_count, draw.stride);
            }
        }
    }

    fn cmd_dispatch(&mut self, stream: CommandStreamHandle, x: u32, y: u32, z: u32) {
        unsafe {
            self.context.device.cmd_dispatch(self.vk_cmd(stream), x, y, z);
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.context.device.device_wait_idle().ok();

            let leaked = self.images.len()
                + self.buffers.len()
                + self.live.image_views.len()
                + self.live.samplers.len()
                + self.live.shader_modules.len()
                + self.live.set_layouts.len()
                + self.live.pipeline_layouts.len()
                + self.live.descriptor_pools.len()
                + self.live.pipelines.len();
            if leaked > 0 {
                engine_warn!(SOURCE, "{} device objects still alive at shutdown, releasing them", leaked);
            }

            let device = &self.context.device;

            // 1. Objects referencing other objects first
            for pipeline in self.live.pipelines.drain() {
                device.destroy_pipeline(pipeline, None);
            }
            for pool in self.live.descriptor_pools.drain() {
                device.destroy_descriptor_pool(pool, None);
            }
            for layout in self.live.pipeline_layouts.drain() {
                device.destroy_pipeline_layout(layout, None);
            }
            for layout in self.live.set_layouts.drain() {
                device.destroy_descriptor_set_layout(layout, None);
            }
            for module in self.live.shader_modules.drain() {
                device.destroy_shader_module(module, None);
            }
            for sampler in self.live.samplers.drain() {
                device.destroy_sampler(sampler, None);
            }
            for view in self.live.image_views.drain() {
                device.destroy_image_view(view, None);
            }

            // 2. Memory-backed objects, allocations returned to the allocator
            for (_, mut entry) in self.images.drain() {
                device.destroy_image(entry.image, None);
                if let Some(allocation) = entry.allocation.take() {
                    self.context.allocator.free(allocation).ok();
                }
            }
            for (_, mut entry) in self.buffers.drain() {
                device.destroy_buffer(entry.buffer, None);
                if let Some(allocation) = entry.allocation.take() {
                    self.context.allocator.free(allocation).ok();
                }
            }

            // 3. Synchronization and command objects
            for fence in self.frame_fences.drain(..) {
                device.destroy_fence(fence, None);
            }
            device.destroy_fence(self.idle_fence, None);
            self.live.command_buffers.clear();
            device.destroy_command_pool(self.command_pool, None);
        }
        // `context` is dropped next: allocator, messenger, device, instance
    }
}
