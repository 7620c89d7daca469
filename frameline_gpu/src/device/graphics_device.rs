/// GraphicsDevice trait - the backend seam of the frame-execution layer
///
/// Every device-level object creation, destruction, command recording and
/// submission goes through this trait. Components above it never touch a
/// backend API directly, so the whole layer runs unchanged over the Vulkan
/// backend or the in-memory `MockGraphicsDevice`.

use crate::error::Result;
use crate::device::{
    BindPoint, BufferDesc, BufferHandle, BufferImageCopy, CommandStreamHandle,
    ComputePipelineDesc, DescriptorPoolDesc, DescriptorPoolHandle, DescriptorSetHandle,
    DescriptorSetLayoutDesc, DescriptorSetLayoutHandle, DescriptorWrite, GraphicsPipelineDesc,
    ImageBarrier, ImageHandle, ImageViewHandle, IndexType, IndirectDraw, MipBlit,
    PipelineHandle, PipelineLayoutDesc, PipelineLayoutHandle, Rect2D, RenderingInfo,
    SamplerDesc, SamplerHandle, ShaderModuleHandle, ShaderStage, ShaderStageFlags,
    SubmitMode, TextureDesc, TextureFormat, Viewport,
};

/// Backend device interface
///
/// Object creation returns `Result`; destruction and recording cannot fail.
/// Destroy calls are only issued once the frame-age protocol guarantees the
/// device no longer references the object.
pub trait GraphicsDevice {
    /// Backend name (for logs)
    fn name(&self) -> &str;

    // ===== IMAGES & SAMPLERS =====

    /// Create a device image with memory bound
    fn create_image(&mut self, desc: &TextureDesc) -> Result<ImageHandle>;

    fn destroy_image(&mut self, image: ImageHandle);

    /// Create a view covering every mip level and layer of `image`
    fn create_image_view(&mut self, image: ImageHandle, desc: &TextureDesc) -> Result<ImageViewHandle>;

    fn destroy_image_view(&mut self, view: ImageViewHandle);

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle>;

    fn destroy_sampler(&mut self, sampler: SamplerHandle);

    /// Whether `format` supports linear-filtered blits (mip generation)
    fn supports_linear_blit(&self, format: TextureFormat) -> bool;

    // ===== BUFFERS =====

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Write into a CPU-visible buffer mapping (flushed before return)
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Invalidate the CPU mapping so device writes become visible
    fn invalidate_buffer(&mut self, buffer: BufferHandle) -> Result<()>;

    /// Read from a CPU-visible buffer mapping
    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()>;

    // ===== SHADERS & LAYOUTS =====

    fn create_shader_module(&mut self, stage: ShaderStage, code: &[u32]) -> Result<ShaderModuleHandle>;

    fn destroy_shader_module(&mut self, module: ShaderModuleHandle);

    fn create_descriptor_set_layout(&mut self, desc: &DescriptorSetLayoutDesc) -> Result<DescriptorSetLayoutHandle>;

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle);

    fn create_pipeline_layout(&mut self, desc: &PipelineLayoutDesc) -> Result<PipelineLayoutHandle>;

    fn destroy_pipeline_layout(&mut self, layout: PipelineLayoutHandle);

    // ===== DESCRIPTORS =====

    fn create_descriptor_pool(&mut self, desc: &DescriptorPoolDesc) -> Result<DescriptorPoolHandle>;

    /// Return every set of the pool to it at once
    fn reset_descriptor_pool(&mut self, pool: DescriptorPoolHandle) -> Result<()>;

    fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle);

    /// Allocate one set; `Err(Error::OutOfPoolMemory)` when the pool is exhausted.
    /// `variable_count` sizes a runtime-array binding (0 when the layout has none).
    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
        variable_count: u32,
    ) -> Result<DescriptorSetHandle>;

    fn write_descriptor_set(&mut self, set: DescriptorSetHandle, writes: &[DescriptorWrite]);

    // ===== PIPELINES =====

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<PipelineHandle>;

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<PipelineHandle>;

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle);

    // ===== COMMAND STREAMS & SUBMISSION =====

    fn create_command_stream(&mut self) -> Result<CommandStreamHandle>;

    fn destroy_command_stream(&mut self, stream: CommandStreamHandle);

    /// Reset and begin recording
    fn begin_command_stream(&mut self, stream: CommandStreamHandle) -> Result<()>;

    fn end_command_stream(&mut self, stream: CommandStreamHandle) -> Result<()>;

    /// Submit recorded streams in order
    fn submit(&mut self, streams: &[CommandStreamHandle], mode: SubmitMode) -> Result<()>;

    /// Block until the last submission that signaled `slot` has completed
    fn wait_frame(&mut self, slot: usize) -> Result<()>;

    /// Block until the device is idle
    fn wait_idle(&mut self) -> Result<()>;

    // ===== RECORDING =====

    fn cmd_image_barrier(&mut self, stream: CommandStreamHandle, barrier: &ImageBarrier);

    fn cmd_copy_buffer(
        &mut self,
        stream: CommandStreamHandle,
        src: BufferHandle,
        dst: BufferHandle,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    );

    fn cmd_copy_buffer_to_image(
        &mut self,
        stream: CommandStreamHandle,
        src: BufferHandle,
        dst: ImageHandle,
        format: TextureFormat,
        region: &BufferImageCopy,
    );

    fn cmd_copy_image_to_buffer(
        &mut self,
        stream: CommandStreamHandle,
        src: ImageHandle,
        format: TextureFormat,
        dst: BufferHandle,
        region: &BufferImageCopy,
    );

    /// Linear blit `src_level` into `src_level + 1`
    fn cmd_blit_mip(&mut self, stream: CommandStreamHandle, blit: &MipBlit);

    fn cmd_begin_rendering(&mut self, stream: CommandStreamHandle, info: &RenderingInfo);

    fn cmd_end_rendering(&mut self, stream: CommandStreamHandle);

    fn cmd_set_viewport(&mut self, stream: CommandStreamHandle, viewport: &Viewport);

    fn cmd_set_scissor(&mut self, stream: CommandStreamHandle, scissor: &Rect2D);

    fn cmd_set_stencil_reference(&mut self, stream: CommandStreamHandle, reference: u32);

    fn cmd_bind_pipeline(&mut self, stream: CommandStreamHandle, bind_point: BindPoint, pipeline: PipelineHandle);

    fn cmd_bind_descriptor_sets(
        &mut self,
        stream: CommandStreamHandle,
        bind_point: BindPoint,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    );

    fn cmd_push_constants(
        &mut self,
        stream: CommandStreamHandle,
        layout: PipelineLayoutHandle,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    );

    fn cmd_bind_vertex_buffers(&mut self, stream: CommandStreamHandle, first_binding: u32, buffers: &[(BufferHandle, u64)]);

    fn cmd_bind_index_buffer(&mut self, stream: CommandStreamHandle, buffer: BufferHandle, offset: u64, index_type: IndexType);

    fn cmd_draw(
        &mut self,
        stream: CommandStreamHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    fn cmd_draw_indexed(
        &mut self,
        stream: CommandStreamHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    fn cmd_draw_indirect(&mut self, stream: CommandStreamHandle, draw: &IndirectDraw);

    fn cmd_dispatch(&mut self, stream: CommandStreamHandle, x: u32, y: u32, z: u32);
}
