/// Texture, buffer, mesh and program management of a `RenderContext`

use crate::device::{
    AddressMode, BufferDesc, BufferUsage, DescriptorSetLayoutHandle, Filter, GraphicsDevice,
    ImageHandle, ImageLayout, ImageViewHandle, MemoryLocation, SamplerDesc, TextureDesc,
    TextureFormat,
};
use crate::error::Error;
use crate::frame::ResourceToDelete;
use crate::resource::{
    Buffer, BufferKey, DeviceTexture, Mesh, MeshDesc, MeshKey, Program, ProgramKey,
    ShaderStageDesc, Texture, TextureKey,
};
use crate::transfer::{
    record_mip_generation, record_texture_download, record_texture_upload, AsyncTaskId, CpuImage,
    TextureRegion,
};
use crate::{engine_error, engine_protocol_violation, engine_warn};

use super::{RenderContext, SOURCE};

/// 2x2 magenta/black checkerboard
const PLACEHOLDER_TEXELS: [u8; 16] = [
    255, 0, 255, 255, 0, 0, 0, 255,
    0, 0, 0, 255, 255, 0, 255, 255,
];

impl<D: GraphicsDevice> RenderContext<D> {
    // ===== TEXTURES =====

    pub(super) fn create_placeholder(&mut self) -> TextureKey {
        let desc = TextureDesc::tex2d(2, 2, TextureFormat::R8G8B8A8_UNORM);
        let sampler = SamplerDesc {
            filter: Filter::Nearest,
            address_mode: AddressMode::Repeat,
            mipmaps: false,
        };
        let key = self.create_texture(desc, sampler);
        if !self.upload_texture(key, &TextureRegion::rect(0, 0, 2, 2, 1), &PLACEHOLDER_TEXELS) {
            engine_warn!(SOURCE, "Placeholder texture has no contents");
        }
        key
    }

    /// Texture substituted for textures without a device side
    pub fn placeholder_texture(&self) -> TextureKey {
        self.placeholder
    }

    /// Register a texture and create its device side
    ///
    /// The key stays valid when device creation fails; the texture then
    /// reports `is_ready() == false` and is replaced by the placeholder
    /// wherever it is sampled.
    pub fn create_texture(&mut self, desc: TextureDesc, sampler_desc: SamplerDesc) -> TextureKey {
        let key = self.textures.insert(Texture::new(desc.clone(), sampler_desc));
        self.setup_texture(key, desc, sampler_desc);
        key
    }

    /// (Re)create the device side of `key` for `desc`
    ///
    /// Nothing happens when the texture is ready with the same descriptors.
    /// The previous device side is retired on the current frame. The new
    /// image enters its resting layout on the upload stream, so operations
    /// recorded on either stream start from the resting layout.
    pub fn setup_texture(&mut self, key: TextureKey, desc: TextureDesc, sampler_desc: SamplerDesc) -> bool {
        let frame = self.clock.current();
        let upload_stream = self.streams.upload_stream();
        let Some(texture) = self.textures.get_mut(key) else {
            engine_error!(SOURCE, "setup_texture: unknown texture {:?}", key);
            return false;
        };
        if texture.is_external() {
            engine_error!(SOURCE, "setup_texture: {:?} is owned by the presentation layer", key);
            return false;
        }
        if texture.is_ready() && *texture.desc() == desc && *texture.sampler_desc() == sampler_desc {
            return true;
        }

        match DeviceTexture::create(&mut self.device, &desc, &sampler_desc) {
            Ok(device_texture) => {
                texture.replace_device(desc, sampler_desc, device_texture, &mut self.deletion_queue, frame);
                // upload stream executes before the render stream of the same frame
                texture.restore(&mut self.device, upload_stream);
                true
            }
            Err(e) => {
                engine_error!(
                    SOURCE,
                    "Failed to create texture {}x{} {:?}: {}",
                    desc.width,
                    desc.height,
                    desc.format,
                    e
                );
                false
            }
        }
    }

    /// Wrap an image owned by the presentation layer (back-buffer)
    ///
    /// `layout` is the layout the image is in and is returned to after use.
    pub fn register_external_texture(
        &mut self,
        desc: TextureDesc,
        image: ImageHandle,
        view: ImageViewHandle,
        layout: ImageLayout,
    ) -> TextureKey {
        self.textures.insert(Texture::external(desc, image, view, layout))
    }

    /// Remove a texture; its device side is destroyed once no frame in flight uses it
    pub fn destroy_texture(&mut self, key: TextureKey) -> bool {
        if self.target.as_ref().is_some_and(|t| t.textures.contains(&key)) {
            self.unbind_framebuffer_if_needed();
        }
        let frame = self.clock.current();
        match self.textures.remove(key) {
            Some(mut texture) => {
                texture.retire(&mut self.deletion_queue, frame);
                true
            }
            None => false,
        }
    }

    pub fn texture(&self, key: TextureKey) -> Option<&Texture> {
        self.textures.get(key)
    }

    /// Record an upload of `data` into `region` on the upload stream
    pub fn upload_texture(&mut self, key: TextureKey, region: &TextureRegion, data: &[u8]) -> bool {
        let frame = self.clock.current();
        let stream = self.streams.upload_stream();
        let assert_on_violation = self.config.assert_on_protocol_violation;
        let Some(texture) = self.textures.get_mut(key) else {
            engine_error!(SOURCE, "upload_texture: unknown texture {:?}", key);
            return false;
        };
        if texture.current_layout() != ImageLayout::Undefined && !texture.is_at_rest() {
            engine_protocol_violation!(
                assert_on_violation,
                SOURCE,
                "upload into {:?} while it is in {:?}",
                key,
                texture.current_layout()
            );
            return false;
        }

        match record_texture_upload(&mut self.device, stream, texture, region, data, &mut self.deletion_queue, frame) {
            Ok(()) => true,
            Err(e) => {
                engine_error!(SOURCE, "Texture upload into {:?} failed: {}", key, e);
                false
            }
        }
    }

    /// Download `region` and wait for the result
    ///
    /// Flushes the frame recorded so far. Only legal while the texture sits
    /// in its resting layout.
    pub fn download_texture_sync(&mut self, key: TextureKey, region: &TextureRegion) -> Option<CpuImage> {
        let Some(texture) = self.textures.get(key) else {
            engine_error!(SOURCE, "download_texture_sync: unknown texture {:?}", key);
            return None;
        };
        if !texture.is_ready() {
            engine_error!(SOURCE, "download_texture_sync: {:?} has no device side", key);
            return None;
        }
        if !texture.is_at_rest() {
            engine_protocol_violation!(
                self.config.assert_on_protocol_violation,
                SOURCE,
                "synchronous download of {:?} while it is in {:?}",
                key,
                texture.current_layout()
            );
            return None;
        }

        if let Err(e) = self.flush() {
            engine_error!(SOURCE, "Flush before synchronous download failed: {}", e);
            return None;
        }
        let stream = match self.streams.begin_one_off(&mut self.device) {
            Ok(stream) => stream,
            Err(e) => {
                engine_error!(SOURCE, "Failed to begin one-off stream: {}", e);
                return None;
            }
        };
        let recorded = match self.textures.get_mut(key) {
            Some(texture) => record_texture_download(&mut self.device, stream, texture, region),
            None => Err(Error::InvalidResource(format!("texture {:?} vanished", key))),
        };
        let submitted = self.streams.submit_one_off(&mut self.device);

        let (staging, mut image) = match recorded {
            Ok(recorded) => recorded,
            Err(e) => {
                engine_error!(SOURCE, "Synchronous download of {:?} failed: {}", key, e);
                return None;
            }
        };
        let result = submitted
            .and_then(|_| self.device.invalidate_buffer(staging))
            .and_then(|_| self.device.read_buffer(staging, 0, &mut image.data));
        self.device.destroy_buffer(staging);

        match result {
            Ok(()) => Some(image),
            Err(e) => {
                engine_error!(SOURCE, "Synchronous download of {:?} failed: {}", key, e);
                None
            }
        }
    }

    /// Download `region` without blocking
    ///
    /// The copy is recorded on the render stream now; `callback` receives
    /// the image once the current frame has provably finished on the device.
    pub fn download_texture_async<F>(&mut self, key: TextureKey, region: &TextureRegion, callback: F) -> Option<AsyncTaskId>
    where
        F: FnOnce(CpuImage) + 'static,
    {
        if !self.streams.require_no_render_pass("download_texture_async") {
            return None;
        }
        let frame = self.clock.current();
        let stream = self.streams.render_stream();
        let Some(texture) = self.textures.get_mut(key) else {
            engine_error!(SOURCE, "download_texture_async: unknown texture {:?}", key);
            return None;
        };

        match self.transfers.download_async(&mut self.device, stream, texture, region, frame, Box::new(callback)) {
            Ok(id) => Some(id),
            Err(e) => {
                engine_error!(SOURCE, "Asynchronous download of {:?} failed: {}", key, e);
                None
            }
        }
    }

    /// Cancel a pending download; its callback will never run
    pub fn cancel_async(&mut self, id: AsyncTaskId) -> bool {
        let frame = self.clock.current();
        self.transfers.cancel(id, &mut self.deletion_queue, frame)
    }

    /// Fill mip levels 1.. from mip 0 on the render stream
    ///
    /// Formats without linear-blit support are skipped with a warning.
    pub fn generate_mip_maps(&mut self, key: TextureKey) -> bool {
        if !self.streams.require_no_render_pass("generate_mip_maps") {
            return false;
        }
        let stream = self.streams.render_stream();
        let Some(texture) = self.textures.get_mut(key) else {
            engine_error!(SOURCE, "generate_mip_maps: unknown texture {:?}", key);
            return false;
        };

        match record_mip_generation(&mut self.device, stream, texture) {
            Ok(()) => true,
            Err(Error::Unsupported(what)) => {
                engine_warn!(SOURCE, "Mip generation of {:?} skipped: {} unsupported", key, what);
                false
            }
            Err(e) => {
                engine_error!(SOURCE, "Mip generation of {:?} failed: {}", key, e);
                false
            }
        }
    }

    // ===== BUFFERS =====

    /// Register a buffer and create its device side
    pub fn create_buffer(&mut self, desc: BufferDesc) -> BufferKey {
        let key = self.buffers.insert(Buffer::new(desc));
        self.setup_buffer(key, desc);
        key
    }

    /// (Re)create the device side of `key` for `desc`
    pub fn setup_buffer(&mut self, key: BufferKey, desc: BufferDesc) -> bool {
        let frame = self.clock.current();
        let Some(buffer) = self.buffers.get_mut(key) else {
            engine_error!(SOURCE, "setup_buffer: unknown buffer {:?}", key);
            return false;
        };
        match buffer.setup(&mut self.device, desc, &mut self.deletion_queue, frame) {
            Ok(()) => true,
            Err(e) => {
                engine_error!(SOURCE, "Failed to create buffer of {} bytes: {}", desc.size, e);
                false
            }
        }
    }

    pub fn destroy_buffer(&mut self, key: BufferKey) -> bool {
        let frame = self.clock.current();
        match self.buffers.remove(key) {
            Some(mut buffer) => {
                buffer.retire(&mut self.deletion_queue, frame);
                true
            }
            None => false,
        }
    }

    pub fn buffer(&self, key: BufferKey) -> Option<&Buffer> {
        self.buffers.get(key)
    }

    /// Record a staged copy of `data` to `offset` on the upload stream
    pub fn upload_buffer(&mut self, key: BufferKey, offset: u64, data: &[u8]) -> bool {
        let Some(buffer) = self.buffers.get(key) else {
            engine_error!(SOURCE, "upload_buffer: unknown buffer {:?}", key);
            return false;
        };
        let handle = buffer.handle();
        if handle.is_null() {
            engine_error!(SOURCE, "upload_buffer: {:?} has no device side", key);
            return false;
        }
        let size = data.len() as u64;
        if offset.checked_add(size).is_none_or(|end| end > buffer.desc().size) {
            engine_error!(
                SOURCE,
                "upload_buffer: {} bytes at {} overflow buffer of {} bytes",
                size,
                offset,
                buffer.desc().size
            );
            return false;
        }
        if data.is_empty() {
            return true;
        }

        let staging = match self.device.create_buffer(&BufferDesc {
            size,
            usage: BufferUsage::TRANSFER_SRC,
            location: MemoryLocation::CpuToGpu,
        }) {
            Ok(staging) => staging,
            Err(e) => {
                engine_error!(SOURCE, "Failed to create upload staging buffer: {}", e);
                return false;
            }
        };
        if let Err(e) = self.device.write_buffer(staging, 0, data) {
            engine_error!(SOURCE, "Failed to fill upload staging buffer: {}", e);
            self.device.destroy_buffer(staging);
            return false;
        }

        let stream = self.streams.upload_stream();
        self.device.cmd_copy_buffer(stream, staging, handle, 0, offset, size);
        self.deletion_queue.retire(ResourceToDelete::Buffer(staging), self.clock.current());
        true
    }

    /// Read `size` bytes at `offset` and wait for the result
    ///
    /// Flushes the frame recorded so far.
    pub fn download_buffer_sync(&mut self, key: BufferKey, offset: u64, size: u64) -> Option<Vec<u8>> {
        let Some(buffer) = self.buffers.get(key) else {
            engine_error!(SOURCE, "download_buffer_sync: unknown buffer {:?}", key);
            return None;
        };
        let handle = buffer.handle();
        if handle.is_null() || offset.checked_add(size).is_none_or(|end| end > buffer.desc().size) {
            engine_error!(SOURCE, "download_buffer_sync: invalid range {}+{} of {:?}", offset, size, key);
            return None;
        }
        if let Err(e) = self.flush() {
            engine_error!(SOURCE, "Flush before synchronous download failed: {}", e);
            return None;
        }

        let staging = match self.device.create_buffer(&BufferDesc {
            size,
            usage: BufferUsage::TRANSFER_DST,
            location: MemoryLocation::GpuToCpu,
        }) {
            Ok(staging) => staging,
            Err(e) => {
                engine_error!(SOURCE, "Failed to create readback staging buffer: {}", e);
                return None;
            }
        };

        let mut data = vec![0u8; size as usize];
        let result = self
            .streams
            .begin_one_off(&mut self.device)
            .and_then(|stream| {
                self.device.cmd_copy_buffer(stream, handle, staging, offset, 0, size);
                self.streams.submit_one_off(&mut self.device)
            })
            .and_then(|_| self.device.invalidate_buffer(staging))
            .and_then(|_| self.device.read_buffer(staging, 0, &mut data));
        self.device.destroy_buffer(staging);

        match result {
            Ok(()) => Some(data),
            Err(e) => {
                engine_error!(SOURCE, "Synchronous download of {:?} failed: {}", key, e);
                None
            }
        }
    }

    // ===== MESHES =====

    /// Register a mesh over existing buffers
    ///
    /// Expects one ready vertex buffer per binding of the vertex layout.
    pub fn setup_mesh(&mut self, desc: &MeshDesc) -> Option<MeshKey> {
        if desc.vertex_buffers.len() != desc.vertex_layout.bindings.len() {
            engine_error!(
                SOURCE,
                "setup_mesh: {} vertex buffers for {} layout bindings",
                desc.vertex_buffers.len(),
                desc.vertex_layout.bindings.len()
            );
            return None;
        }
        let index_key = desc.index_buffer.map(|(key, _)| key);
        for key in desc.vertex_buffers.iter().chain(index_key.iter()) {
            if !self.buffers.get(*key).is_some_and(Buffer::is_ready) {
                engine_error!(SOURCE, "setup_mesh: buffer {:?} is missing or not ready", key);
                return None;
            }
        }

        let layout = self.pipelines.vertex_layouts_mut().intern(&desc.vertex_layout);
        Some(self.meshes.insert(Mesh::new(desc, layout)))
    }

    /// Forget a mesh; its buffers are left alone
    pub fn destroy_mesh(&mut self, key: MeshKey) -> bool {
        self.meshes.remove(key).is_some()
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    // ===== PROGRAMS =====

    fn bindless_layout(&self) -> DescriptorSetLayoutHandle {
        self.bindless
            .as_ref()
            .map(|table| table.layout())
            .unwrap_or(DescriptorSetLayoutHandle::NULL)
    }

    /// Build a program from compiled stages and their reflection
    pub fn create_program(&mut self, stages: &[ShaderStageDesc]) -> Option<ProgramKey> {
        let id = self.next_program_id;
        self.next_program_id += 1;
        let bindless_layout = self.bindless_layout();

        match Program::create(&mut self.device, id, stages, bindless_layout) {
            Ok(program) => Some(self.programs.insert(program)),
            Err(e) => {
                engine_error!(SOURCE, "Failed to create program {}: {}", id, e);
                None
            }
        }
    }

    /// Replace a program with freshly compiled stages
    ///
    /// Waits for the device to go idle first. Every cached pipeline built
    /// from the previous version is retired and rebuilt on its next use.
    pub fn reload_program(&mut self, key: ProgramKey, stages: &[ShaderStageDesc]) -> bool {
        if !self.programs.contains_key(key) {
            engine_error!(SOURCE, "reload_program: unknown program {:?}", key);
            return false;
        }
        if let Err(e) = self.flush() {
            engine_error!(SOURCE, "Flush before program reload failed: {}", e);
            return false;
        }
        let frame = self.clock.current();
        let bindless_layout = self.bindless_layout();
        let Some(program) = self.programs.get_mut(key) else {
            return false;
        };

        match program.reload(&mut self.device, stages, bindless_layout) {
            Ok(()) => {
                self.pipelines.retire_program(program.id(), frame);
                true
            }
            Err(e) => {
                engine_error!(SOURCE, "Reload of program {} failed, keeping previous build: {}", program.id(), e);
                false
            }
        }
    }

    /// Destroy a program once the device is idle
    ///
    /// Its cached pipelines are retired with it.
    pub fn destroy_program(&mut self, key: ProgramKey) -> bool {
        if !self.programs.contains_key(key) {
            return false;
        }
        if let Err(e) = self.flush() {
            engine_error!(SOURCE, "Flush before program destruction failed: {}", e);
        }
        match self.programs.remove(key) {
            Some(mut program) => {
                self.pipelines.retire_program(program.id(), self.clock.current());
                program.destroy(&mut self.device);
                true
            }
            None => false,
        }
    }

    pub fn program(&self, key: ProgramKey) -> Option<&Program> {
        self.programs.get(key)
    }
}
