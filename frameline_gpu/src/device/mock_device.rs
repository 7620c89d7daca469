/// Mock graphics device (no GPU required)
///
/// Tracks every created/destroyed object, simulates descriptor-pool capacity,
/// keeps buffer and image memory in plain byte vectors and executes copy
/// commands at submit time. Barriers are checked against the per-mip layout
/// the image has when the barrier executes. Used by the unit and integration tests, and
/// usable for headless tooling that only needs the bookkeeping.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::device::{
    BindPoint, BufferDesc, BufferHandle, BufferImageCopy, CommandStreamHandle,
    ComputePipelineDesc, DescriptorPoolDesc, DescriptorPoolHandle, DescriptorSetHandle,
    DescriptorSetLayoutDesc, DescriptorSetLayoutHandle, DescriptorWrite, GraphicsDevice,
    GraphicsPipelineDesc, ImageBarrier, ImageHandle, ImageLayout, ImageViewHandle, IndexType, IndirectDraw,
    MemoryLocation, MipBlit, PipelineHandle, PipelineLayoutDesc, PipelineLayoutHandle, Rect2D,
    RenderingInfo, SamplerDesc, SamplerHandle, ShaderModuleHandle, ShaderStage,
    ShaderStageFlags, SubmitMode, TextureDesc, TextureFormat, Viewport,
};

/// Kind of object tracked by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockObjectKind {
    Image,
    ImageView,
    Sampler,
    Buffer,
    ShaderModule,
    DescriptorSetLayout,
    PipelineLayout,
    DescriptorPool,
    Pipeline,
    CommandStream,
}

struct MockImage {
    desc: TextureDesc,
    /// Mip 0 of every layer, layer-major, tightly packed
    data: Vec<u8>,
    /// Layout of each mip level at execution time
    layouts: Vec<ImageLayout>,
}

impl MockImage {
    fn layer_size(&self) -> usize {
        self.desc.region_size(self.desc.width, self.desc.height, self.desc.depth, 1) as usize
    }

    fn texel_index(&self, layer: u32, x: u32, y: u32, z: u32) -> usize {
        let bpp = self.desc.format.bytes_per_pixel() as usize;
        layer as usize * self.layer_size()
            + ((z as usize * self.desc.height as usize + y as usize) * self.desc.width as usize + x as usize) * bpp
    }
}

struct MockBuffer {
    desc: BufferDesc,
    data: Vec<u8>,
}

struct MockPool {
    max_sets: u32,
    allocated: u32,
}

enum MockCommand {
    CopyBuffer { src: BufferHandle, dst: BufferHandle, src_offset: u64, dst_offset: u64, size: u64 },
    CopyBufferToImage { src: BufferHandle, dst: ImageHandle, region: BufferImageCopy },
    CopyImageToBuffer { src: ImageHandle, dst: BufferHandle, region: BufferImageCopy },
    Barrier(ImageBarrier),
    Other,
}

#[derive(Default)]
struct MockStream {
    recording: bool,
    commands: Vec<MockCommand>,
    names: Vec<String>,
}

/// In-memory GraphicsDevice implementation
pub struct MockGraphicsDevice {
    next_handle: u64,
    live: FxHashMap<u64, MockObjectKind>,
    destroyed: Vec<(MockObjectKind, u64)>,
    images: FxHashMap<u64, MockImage>,
    buffers: FxHashMap<u64, MockBuffer>,
    pools: FxHashMap<u64, MockPool>,
    set_pools: FxHashMap<u64, u64>,
    set_writes: FxHashMap<u64, Vec<DescriptorWrite>>,
    streams: FxHashMap<u64, MockStream>,
    executed: Vec<String>,
    submissions: Vec<(Vec<CommandStreamHandle>, SubmitMode)>,
    frame_waits: Vec<usize>,
    layout_errors: Vec<String>,

    /// Number of destroy calls on unknown or already destroyed handles
    pub invalid_destroys: u32,
    /// Number of pipelines built
    pub pipelines_created: u32,
    /// Number of wait_idle calls
    pub wait_idle_count: u32,
    /// Fail every buffer creation with OutOfMemory
    pub fail_buffer_creation: bool,
    /// Fail every descriptor pool creation with OutOfMemory
    pub fail_pool_creation: bool,
    /// Formats reported without linear-blit support (depth formats never support it)
    pub formats_without_linear_blit: Vec<TextureFormat>,
}

impl MockGraphicsDevice {
    /// Create a new mock device
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            live: FxHashMap::default(),
            destroyed: Vec::new(),
            images: FxHashMap::default(),
            buffers: FxHashMap::default(),
            pools: FxHashMap::default(),
            set_pools: FxHashMap::default(),
            set_writes: FxHashMap::default(),
            streams: FxHashMap::default(),
            executed: Vec::new(),
            submissions: Vec::new(),
            frame_waits: Vec::new(),
            layout_errors: Vec::new(),
            invalid_destroys: 0,
            pipelines_created: 0,
            wait_idle_count: 0,
            fail_buffer_creation: false,
            fail_pool_creation: false,
            formats_without_linear_blit: Vec::new(),
        }
    }

    // ===== INSPECTION =====

    /// Number of live objects of `kind`
    pub fn live_count(&self, kind: MockObjectKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    /// Number of live objects of every kind
    pub fn live_object_count(&self) -> usize {
        self.live.len()
    }

    /// Whether the raw handle is alive
    pub fn is_live(&self, raw: u64) -> bool {
        self.live.contains_key(&raw)
    }

    /// How many times the raw handle has been destroyed
    pub fn destroy_count(&self, raw: u64) -> usize {
        self.destroyed.iter().filter(|(_, h)| *h == raw).count()
    }

    /// Every destroyed object, in destruction order
    pub fn destroyed(&self) -> &[(MockObjectKind, u64)] {
        &self.destroyed
    }

    /// Names of the commands recorded into `stream` since its last begin
    pub fn recorded_commands(&self, stream: CommandStreamHandle) -> Vec<String> {
        self.streams.get(&stream.0).map(|s| s.names.clone()).unwrap_or_default()
    }

    /// Names of every command executed by a submission, in order
    pub fn executed_commands(&self) -> &[String] {
        &self.executed
    }

    /// Every submission (streams, mode), in order
    pub fn submissions(&self) -> &[(Vec<CommandStreamHandle>, SubmitMode)] {
        &self.submissions
    }

    /// Frame slots waited on, in order
    pub fn frame_waits(&self) -> &[usize] {
        &self.frame_waits
    }

    /// Barriers whose old layout disagreed with the image at execution time,
    /// and barriers from `Undefined` that discarded initialized contents
    pub fn layout_errors(&self) -> &[String] {
        &self.layout_errors
    }

    /// Execution-time layout of one mip level
    pub fn image_layout(&self, image: ImageHandle, mip: u32) -> Option<ImageLayout> {
        self.images.get(&image.0).and_then(|i| i.layouts.get(mip as usize).copied())
    }

    /// Last writes applied to a descriptor set, indexed by array element
    pub fn descriptor_writes(&self, set: DescriptorSetHandle) -> Vec<DescriptorWrite> {
        self.set_writes.get(&set.0).cloned().unwrap_or_default()
    }

    /// Sets currently allocated from a pool
    pub fn pool_allocated(&self, pool: DescriptorPoolHandle) -> Option<u32> {
        self.pools.get(&pool.0).map(|p| p.allocated)
    }

    /// Mip-0 contents of an image
    pub fn image_data(&self, image: ImageHandle) -> Option<&[u8]> {
        self.images.get(&image.0).map(|i| i.data.as_slice())
    }

    /// Overwrite mip-0 contents of an image (simulates rendering)
    pub fn fill_image(&mut self, image: ImageHandle, mut f: impl FnMut(usize) -> u8) {
        if let Some(img) = self.images.get_mut(&image.0) {
            for (i, byte) in img.data.iter_mut().enumerate() {
                *byte = f(i);
            }
        }
    }

    /// Contents of a buffer
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(|b| b.data.as_slice())
    }

    // ===== INTERNALS =====

    fn alloc_handle(&mut self, kind: MockObjectKind) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.live.insert(handle, kind);
        handle
    }

    fn release(&mut self, kind: MockObjectKind, raw: u64) -> bool {
        match self.live.get(&raw) {
            Some(k) if *k == kind => {
                self.live.remove(&raw);
                self.destroyed.push((kind, raw));
                true
            }
            _ => {
                self.invalid_destroys += 1;
                false
            }
        }
    }

    fn record(&mut self, stream: CommandStreamHandle, name: &str, command: MockCommand) {
        if let Some(s) = self.streams.get_mut(&stream.0) {
            s.names.push(name.to_string());
            s.commands.push(command);
        }
    }

    fn execute(&mut self, command: &MockCommand) {
        match command {
            MockCommand::CopyBuffer { src, dst, src_offset, dst_offset, size } => {
                let bytes = match self.buffers.get(&src.0) {
                    Some(b) => {
                        let start = *src_offset as usize;
                        let end = start + *size as usize;
                        if end > b.data.len() {
                            return;
                        }
                        b.data[start..end].to_vec()
                    }
                    None => return,
                };
                if let Some(b) = self.buffers.get_mut(&dst.0) {
                    let start = *dst_offset as usize;
                    if start + bytes.len() <= b.data.len() {
                        b.data[start..start + bytes.len()].copy_from_slice(&bytes);
                    }
                }
            }
            MockCommand::CopyBufferToImage { src, dst, region } => {
                if region.mip_level != 0 {
                    return;
                }
                let (Some(buffer), Some(image)) = (self.buffers.get(&src.0), self.images.get_mut(&dst.0)) else {
                    return;
                };
                let bpp = image.desc.format.bytes_per_pixel() as usize;
                let row = region.extent[0] as usize * bpp;
                let mut cursor = region.buffer_offset as usize;
                for layer in 0..region.layer_count {
                    for z in 0..region.extent[2] {
                        for y in 0..region.extent[1] {
                            let dst_index = image.texel_index(
                                region.base_layer + layer,
                                region.offset[0],
                                region.offset[1] + y,
                                region.offset[2] + z,
                            );
                            if cursor + row <= buffer.data.len() && dst_index + row <= image.data.len() {
                                image.data[dst_index..dst_index + row]
                                    .copy_from_slice(&buffer.data[cursor..cursor + row]);
                            }
                            cursor += row;
                        }
                    }
                }
            }
            MockCommand::CopyImageToBuffer { src, dst, region } => {
                if region.mip_level != 0 {
                    return;
                }
                let (Some(image), Some(buffer)) = (self.images.get(&src.0), self.buffers.get_mut(&dst.0)) else {
                    return;
                };
                let bpp = image.desc.format.bytes_per_pixel() as usize;
                let row = region.extent[0] as usize * bpp;
                let mut cursor = region.buffer_offset as usize;
                for layer in 0..region.layer_count {
                    for z in 0..region.extent[2] {
                        for y in 0..region.extent[1] {
                            let src_index = image.texel_index(
                                region.base_layer + layer,
                                region.offset[0],
                                region.offset[1] + y,
                                region.offset[2] + z,
                            );
                            if src_index + row <= image.data.len() && cursor + row <= buffer.data.len() {
                                buffer.data[cursor..cursor + row]
                                    .copy_from_slice(&image.data[src_index..src_index + row]);
                            }
                            cursor += row;
                        }
                    }
                }
            }
            MockCommand::Barrier(barrier) => {
                let Some(image) = self.images.get_mut(&barrier.image.0) else {
                    return;
                };
                let end = (barrier.base_mip + barrier.mip_count).min(image.layouts.len() as u32);
                for level in barrier.base_mip..end {
                    let layout = &mut image.layouts[level as usize];
                    if barrier.old_layout == ImageLayout::Undefined {
                        if *layout != ImageLayout::Undefined {
                            self.layout_errors.push(format!(
                                "image {} mip {}: Undefined -> {:?} discards contents in {:?}",
                                barrier.image.0, level, barrier.new_layout, layout
                            ));
                        }
                    } else if *layout != barrier.old_layout {
                        self.layout_errors.push(format!(
                            "image {} mip {}: barrier from {:?} but image is in {:?}",
                            barrier.image.0, level, barrier.old_layout, layout
                        ));
                    }
                    *layout = barrier.new_layout;
                }
            }
            MockCommand::Other => {}
        }
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn name(&self) -> &str {
        "mock"
    }

    // ===== IMAGES & SAMPLERS =====

    fn create_image(&mut self, desc: &TextureDesc) -> Result<ImageHandle> {
        if desc.width == 0 || desc.height == 0 || desc.depth == 0 {
            return Err(Error::InvalidResource(format!(
                "zero-sized image {}x{}x{}", desc.width, desc.height, desc.depth
            )));
        }
        let handle = self.alloc_handle(MockObjectKind::Image);
        let size = desc.region_size(desc.width, desc.height, desc.depth, desc.image_layers()) as usize;
        let layouts = vec![ImageLayout::Undefined; desc.mip_levels.max(1) as usize];
        self.images.insert(handle, MockImage { desc: desc.clone(), data: vec![0; size], layouts });
        Ok(ImageHandle(handle))
    }

    fn destroy_image(&mut self, image: ImageHandle) {
        if self.release(MockObjectKind::Image, image.0) {
            self.images.remove(&image.0);
        }
    }

    fn create_image_view(&mut self, image: ImageHandle, _desc: &TextureDesc) -> Result<ImageViewHandle> {
        if !self.images.contains_key(&image.0) {
            return Err(Error::InvalidResource(format!("unknown image {}", image.0)));
        }
        Ok(ImageViewHandle(self.alloc_handle(MockObjectKind::ImageView)))
    }

    fn destroy_image_view(&mut self, view: ImageViewHandle) {
        self.release(MockObjectKind::ImageView, view.0);
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<SamplerHandle> {
        Ok(SamplerHandle(self.alloc_handle(MockObjectKind::Sampler)))
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        self.release(MockObjectKind::Sampler, sampler.0);
    }

    fn supports_linear_blit(&self, format: TextureFormat) -> bool {
        !format.is_depth() && !self.formats_without_linear_blit.contains(&format)
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        if self.fail_buffer_creation {
            return Err(Error::OutOfMemory);
        }
        let handle = self.alloc_handle(MockObjectKind::Buffer);
        self.buffers.insert(handle, MockBuffer { desc: *desc, data: vec![0; desc.size as usize] });
        Ok(BufferHandle(handle))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.release(MockObjectKind::Buffer, buffer.0) {
            self.buffers.remove(&buffer.0);
        }
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let b = self.buffers.get_mut(&buffer.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {}", buffer.0)))?;
        if b.desc.location == MemoryLocation::GpuOnly {
            return Err(Error::BackendError("Buffer is not CPU-accessible".to_string()));
        }
        let start = offset as usize;
        let end = start.saturating_add(data.len());
        if end > b.data.len() {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} overflows buffer of {} bytes", data.len(), offset, b.data.len()
            )));
        }
        b.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn invalidate_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        if self.buffers.contains_key(&buffer.0) {
            Ok(())
        } else {
            Err(Error::InvalidResource(format!("unknown buffer {}", buffer.0)))
        }
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()> {
        let b = self.buffers.get(&buffer.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {}", buffer.0)))?;
        if b.desc.location == MemoryLocation::GpuOnly {
            return Err(Error::BackendError("Buffer is not CPU-accessible".to_string()));
        }
        let start = offset as usize;
        let end = start.saturating_add(out.len());
        if end > b.data.len() {
            return Err(Error::InvalidResource(format!(
                "read of {} bytes at {} overflows buffer of {} bytes", out.len(), offset, b.data.len()
            )));
        }
        out.copy_from_slice(&b.data[start..end]);
        Ok(())
    }

    // ===== SHADERS & LAYOUTS =====

    fn create_shader_module(&mut self, _stage: ShaderStage, code: &[u32]) -> Result<ShaderModuleHandle> {
        if code.is_empty() {
            return Err(Error::InvalidResource("empty shader module".to_string()));
        }
        Ok(ShaderModuleHandle(self.alloc_handle(MockObjectKind::ShaderModule)))
    }

    fn destroy_shader_module(&mut self, module: ShaderModuleHandle) {
        self.release(MockObjectKind::ShaderModule, module.0);
    }

    fn create_descriptor_set_layout(&mut self, _desc: &DescriptorSetLayoutDesc) -> Result<DescriptorSetLayoutHandle> {
        Ok(DescriptorSetLayoutHandle(self.alloc_handle(MockObjectKind::DescriptorSetLayout)))
    }

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) {
        self.release(MockObjectKind::DescriptorSetLayout, layout.0);
    }

    fn create_pipeline_layout(&mut self, _desc: &PipelineLayoutDesc) -> Result<PipelineLayoutHandle> {
        Ok(PipelineLayoutHandle(self.alloc_handle(MockObjectKind::PipelineLayout)))
    }

    fn destroy_pipeline_layout(&mut self, layout: PipelineLayoutHandle) {
        self.release(MockObjectKind::PipelineLayout, layout.0);
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_pool(&mut self, desc: &DescriptorPoolDesc) -> Result<DescriptorPoolHandle> {
        if self.fail_pool_creation {
            return Err(Error::OutOfMemory);
        }
        let handle = self.alloc_handle(MockObjectKind::DescriptorPool);
        self.pools.insert(handle, MockPool { max_sets: desc.max_sets, allocated: 0 });
        Ok(DescriptorPoolHandle(handle))
    }

    fn reset_descriptor_pool(&mut self, pool: DescriptorPoolHandle) -> Result<()> {
        let p = self.pools.get_mut(&pool.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown pool {}", pool.0)))?;
        p.allocated = 0;
        let stale: Vec<u64> = self.set_pools.iter()
            .filter(|(_, owner)| **owner == pool.0)
            .map(|(set, _)| *set)
            .collect();
        for set in stale {
            self.set_pools.remove(&set);
            self.set_writes.remove(&set);
        }
        Ok(())
    }

    fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle) {
        if self.release(MockObjectKind::DescriptorPool, pool.0) {
            self.pools.remove(&pool.0);
            self.set_pools.retain(|_, owner| *owner != pool.0);
        }
    }

    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        _layout: DescriptorSetLayoutHandle,
        _variable_count: u32,
    ) -> Result<DescriptorSetHandle> {
        let p = self.pools.get_mut(&pool.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown pool {}", pool.0)))?;
        if p.allocated >= p.max_sets {
            return Err(Error::OutOfPoolMemory);
        }
        p.allocated += 1;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.set_pools.insert(handle, pool.0);
        Ok(DescriptorSetHandle(handle))
    }

    fn write_descriptor_set(&mut self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) {
        let entries = self.set_writes.entry(set.0).or_default();
        for write in writes {
            if let Some(existing) = entries.iter_mut()
                .find(|w| w.binding == write.binding && w.array_element == write.array_element)
            {
                *existing = *write;
            } else {
                entries.push(*write);
            }
        }
        entries.sort_by_key(|w| (w.binding, w.array_element));
    }

    // ===== PIPELINES =====

    fn create_graphics_pipeline(&mut self, _desc: &GraphicsPipelineDesc) -> Result<PipelineHandle> {
        self.pipelines_created += 1;
        Ok(PipelineHandle(self.alloc_handle(MockObjectKind::Pipeline)))
    }

    fn create_compute_pipeline(&mut self, _desc: &ComputePipelineDesc) -> Result<PipelineHandle> {
        self.pipelines_created += 1;
        Ok(PipelineHandle(self.alloc_handle(MockObjectKind::Pipeline)))
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        self.release(MockObjectKind::Pipeline, pipeline.0);
    }

    // ===== COMMAND STREAMS & SUBMISSION =====

    fn create_command_stream(&mut self) -> Result<CommandStreamHandle> {
        let handle = self.alloc_handle(MockObjectKind::CommandStream);
        self.streams.insert(handle, MockStream::default());
        Ok(CommandStreamHandle(handle))
    }

    fn destroy_command_stream(&mut self, stream: CommandStreamHandle) {
        if self.release(MockObjectKind::CommandStream, stream.0) {
            self.streams.remove(&stream.0);
        }
    }

    fn begin_command_stream(&mut self, stream: CommandStreamHandle) -> Result<()> {
        let s = self.streams.get_mut(&stream.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown command stream {}", stream.0)))?;
        if s.recording {
            return Err(Error::BackendError("Command stream already recording".to_string()));
        }
        s.recording = true;
        s.commands.clear();
        s.names.clear();
        Ok(())
    }

    fn end_command_stream(&mut self, stream: CommandStreamHandle) -> Result<()> {
        let s = self.streams.get_mut(&stream.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown command stream {}", stream.0)))?;
        if !s.recording {
            return Err(Error::BackendError("Command stream not recording".to_string()));
        }
        s.recording = false;
        Ok(())
    }

    fn submit(&mut self, streams: &[CommandStreamHandle], mode: SubmitMode) -> Result<()> {
        for stream in streams {
            let s = self.streams.get_mut(&stream.0)
                .ok_or_else(|| Error::InvalidResource(format!("unknown command stream {}", stream.0)))?;
            if s.recording {
                return Err(Error::BackendError("Cannot submit a stream that is still recording".to_string()));
            }
            let commands = std::mem::take(&mut s.commands);
            let names = s.names.clone();
            for command in &commands {
                self.execute(command);
            }
            self.executed.extend(names);
        }
        self.submissions.push((streams.to_vec(), mode));
        Ok(())
    }

    fn wait_frame(&mut self, slot: usize) -> Result<()> {
        self.frame_waits.push(slot);
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.wait_idle_count += 1;
        Ok(())
    }

    // ===== RECORDING =====

    fn cmd_image_barrier(&mut self, stream: CommandStreamHandle, barrier: &ImageBarrier) {
        self.record(stream, "image_barrier", MockCommand::Barrier(*barrier));
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
        self.record(stream, "copy_buffer", MockCommand::CopyBuffer { src, dst, src_offset, dst_offset, size });
    }

    fn cmd_copy_buffer_to_image(
        &mut self,
        stream: CommandStreamHandle,
        src: BufferHandle,
        dst: ImageHandle,
        _format: TextureFormat,
        region: &BufferImageCopy,
    ) {
        self.record(stream, "copy_buffer_to_image", MockCommand::CopyBufferToImage { src, dst, region: *region });
    }

    fn cmd_copy_image_to_buffer(
        &mut self,
        stream: CommandStreamHandle,
        src: ImageHandle,
        _format: TextureFormat,
        dst: BufferHandle,
        region: &BufferImageCopy,
    ) {
        self.record(stream, "copy_image_to_buffer", MockCommand::CopyImageToBuffer { src, dst, region: *region });
    }

    fn cmd_blit_mip(&mut self, stream: CommandStreamHandle, _blit: &MipBlit) {
        self.record(stream, "blit_mip", MockCommand::Other);
    }

    fn cmd_begin_rendering(&mut self, stream: CommandStreamHandle, _info: &RenderingInfo) {
        self.record(stream, "begin_rendering", MockCommand::Other);
    }

    fn cmd_end_rendering(&mut self, stream: CommandStreamHandle) {
        self.record(stream, "end_rendering", MockCommand::Other);
    }

    fn cmd_set_viewport(&mut self, stream: CommandStreamHandle, _viewport: &Viewport) {
        self.record(stream, "set_viewport", MockCommand::Other);
    }

    fn cmd_set_scissor(&mut self, stream: CommandStreamHandle, _scissor: &Rect2D) {
        self.record(stream, "set_scissor", MockCommand::Other);
    }

    fn cmd_set_stencil_reference(&mut self, stream: CommandStreamHandle, _reference: u32) {
        self.record(stream, "set_stencil_reference", MockCommand::Other);
    }

    fn cmd_bind_pipeline(&mut self, stream: CommandStreamHandle, _bind_point: BindPoint, _pipeline: PipelineHandle) {
        self.record(stream, "bind_pipeline", MockCommand::Other);
    }

    fn cmd_bind_descriptor_sets(
        &mut self,
        stream: CommandStreamHandle,
        _bind_point: BindPoint,
        _layout: PipelineLayoutHandle,
        _first_set: u32,
        _sets: &[DescriptorSetHandle],
    ) {
        self.record(stream, "bind_descriptor_sets", MockCommand::Other);
    }

    fn cmd_push_constants(
        &mut self,
        stream: CommandStreamHandle,
        _layout: PipelineLayoutHandle,
        _stages: ShaderStageFlags,
        _offset: u32,
        _data: &[u8],
    ) {
        self.record(stream, "push_constants", MockCommand::Other);
    }

    fn cmd_bind_vertex_buffers(&mut self, stream: CommandStreamHandle, _first_binding: u32, _buffers: &[(BufferHandle, u64)]) {
        self.record(stream, "bind_vertex_buffers", MockCommand::Other);
    }

    fn cmd_bind_index_buffer(&mut self, stream: CommandStreamHandle, _buffer: BufferHandle, _offset: u64, _index_type: IndexType) {
        self.record(stream, "bind_index_buffer", MockCommand::Other);
    }

    fn cmd_draw(&mut self, stream: CommandStreamHandle, _vertex_count: u32, _instance_count: u32, _first_vertex: u32, _first_instance: u32) {
        self.record(stream, "draw", MockCommand::Other);
    }

    fn cmd_draw_indexed(
        &mut self,
        stream: CommandStreamHandle,
        _index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.record(stream, "draw_indexed", MockCommand::Other);
    }

    fn cmd_draw_indirect(&mut self, stream: CommandStreamHandle, _draw: &IndirectDraw) {
        self.record(stream, "draw_indirect", MockCommand::Other);
    }

    fn cmd_dispatch(&mut self, stream: CommandStreamHandle, _x: u32, _y: u32, _z: u32) {
        self.record(stream, "dispatch", MockCommand::Other);
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
