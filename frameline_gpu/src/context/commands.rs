/// Framebuffer binding, draws, dispatches and descriptor sets of a `RenderContext`

use glam::Vec2;

use crate::descriptor::{BindlessEntry, DescriptorSet};
use crate::device::{
    BindPoint, BufferDesc, BufferHandle, BufferUsage, CommandStreamHandle, DescriptorResource,
    DescriptorSetHandle, DescriptorSetLayoutHandle, DescriptorWrite, FixedFunctionState,
    GraphicsDevice, ImageLayout, IndirectDraw, LoadOp, MemoryLocation, PipelineLayoutHandle,
    PrimitiveTopology, Rect2D, RenderingAttachment, RenderingInfo, ShaderStage, ShaderStageFlags,
    VertexAttribute, VertexBinding, VertexFormat, VertexInputRate, VertexLayout, Viewport,
    MAX_COLOR_ATTACHMENTS,
};
use crate::pipeline::{
    ComputePipelineState, DynamicState, GraphicsPipelineState, RenderTargetSignature, VertexLayoutId,
};
use crate::resource::{BufferKey, MeshKey, ProgramKey, TextureKey};
use crate::{engine_error, engine_protocol_violation, engine_warn};

use super::{BoundTarget, QuadGeometry, RenderContext, SOURCE};

/// Triangle-strip fullscreen quad in clip space
const QUAD_POSITIONS: [Vec2; 4] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(1.0, 1.0),
];

/// One attachment of a framebuffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramebufferAttachment {
    pub texture: TextureKey,
    pub load: LoadOp,
}

/// Render target made of registered textures
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Framebuffer {
    pub color: Vec<FramebufferAttachment>,
    pub depth: Option<FramebufferAttachment>,
}

/// Program, state and resources of a draw
#[derive(Debug, Clone, Copy)]
pub struct DrawBinding<'a> {
    pub program: ProgramKey,
    pub fixed: &'a FixedFunctionState,
    pub dynamic: &'a DynamicState,
    /// Bound from set 0 in order
    pub descriptor_sets: &'a [DescriptorSetHandle],
    pub push_constants: &'a [u8],
}

/// Program and resources of a dispatch
#[derive(Debug, Clone, Copy)]
pub struct ComputeBinding<'a> {
    pub program: ProgramKey,
    pub descriptor_sets: &'a [DescriptorSetHandle],
    pub push_constants: &'a [u8],
}

/// Bind descriptor sets and push constants shared by draws and dispatches
fn bind_resources(
    device: &mut dyn GraphicsDevice,
    stream: CommandStreamHandle,
    bind_point: BindPoint,
    layout: PipelineLayoutHandle,
    push_stages: ShaderStageFlags,
    sets: &[DescriptorSetHandle],
    push_constants: &[u8],
) {
    if !sets.is_empty() {
        device.cmd_bind_descriptor_sets(stream, bind_point, layout, 0, sets);
    }
    if !push_constants.is_empty() {
        device.cmd_push_constants(stream, layout, push_stages, 0, push_constants);
    }
}

fn has_null_set(sets: &[DescriptorSetHandle]) -> bool {
    sets.iter().any(DescriptorSetHandle::is_null)
}

impl<D: GraphicsDevice> RenderContext<D> {
    // ===== FRAMEBUFFER =====

    /// Begin rendering into `framebuffer` on the render stream
    ///
    /// A previously bound framebuffer is unbound first. Attachments move to
    /// their attachment layouts until the framebuffer is unbound.
    pub fn bind_framebuffer(&mut self, framebuffer: &Framebuffer) -> bool {
        let mut info = RenderingInfo {
            color_attachments: Vec::with_capacity(framebuffer.color.len()),
            depth_attachment: None,
            width: 0,
            height: 0,
        };
        let mut signature = RenderTargetSignature::default();
        let mut extent: Option<(u32, u32)> = None;

        let attachments = framebuffer
            .color
            .iter()
            .map(|a| (a, false))
            .chain(framebuffer.depth.iter().map(|a| (a, true)));
        for (attachment, is_depth) in attachments {
            let Some(texture) = self.textures.get(attachment.texture) else {
                engine_error!(SOURCE, "bind_framebuffer: unknown texture {:?}", attachment.texture);
                return false;
            };
            let Some(device_texture) = texture.device_texture() else {
                engine_error!(SOURCE, "bind_framebuffer: {:?} has no device side", attachment.texture);
                return false;
            };
            let format = texture.desc().format;
            let rendering = RenderingAttachment { view: device_texture.view, format, load: attachment.load };
            if is_depth {
                info.depth_attachment = Some(rendering);
                signature.depth_format = Some(format);
            } else {
                info.color_attachments.push(rendering);
                signature.color_formats.push(format);
            }
            if extent.is_none() {
                extent = Some((texture.desc().width, texture.desc().height));
            }
        }

        if !self.streams.check_attachments(&info) {
            return false;
        }
        if info.color_attachments.len() > MAX_COLOR_ATTACHMENTS {
            engine_error!(
                SOURCE,
                "bind_framebuffer: {} color attachments exceed the limit of {}",
                info.color_attachments.len(),
                MAX_COLOR_ATTACHMENTS
            );
            return false;
        }
        let (width, height) = extent.unwrap_or((0, 0));
        info.width = width;
        info.height = height;

        self.unbind_framebuffer_if_needed();

        let stream = self.streams.render_stream();
        let mut keys = Vec::with_capacity(framebuffer.color.len() + 1);
        for attachment in &framebuffer.color {
            if let Some(texture) = self.textures.get_mut(attachment.texture) {
                texture.transition(&mut self.device, stream, ImageLayout::ColorAttachment);
            }
            keys.push(attachment.texture);
        }
        if let Some(attachment) = &framebuffer.depth {
            if let Some(texture) = self.textures.get_mut(attachment.texture) {
                texture.transition(&mut self.device, stream, ImageLayout::DepthStencilAttachment);
            }
            keys.push(attachment.texture);
        }

        let target = BoundTarget { textures: keys, signature, width, height };
        if !self.streams.begin_render_pass(&mut self.device, &info) {
            for key in &target.textures {
                if let Some(texture) = self.textures.get_mut(*key) {
                    texture.restore(&mut self.device, stream);
                }
            }
            return false;
        }
        self.pipelines.mark_transition();
        self.target = Some(target);
        true
    }

    /// Close the render pass and return the attachments to their resting layouts
    ///
    /// Returns whether a framebuffer was bound.
    pub fn unbind_framebuffer_if_needed(&mut self) -> bool {
        let Some(target) = self.target.take() else {
            return false;
        };
        self.streams.end_render_pass_if_needed(&mut self.device);

        let stream = self.streams.render_stream();
        for key in &target.textures {
            if let Some(texture) = self.textures.get_mut(*key) {
                texture.restore(&mut self.device, stream);
            }
        }
        self.pipelines.mark_transition();
        true
    }

    /// Attachment formats of the bound framebuffer
    pub fn bound_target(&self) -> Option<&RenderTargetSignature> {
        self.target.as_ref().map(|t| &t.signature)
    }

    // ===== DRAWS =====

    /// Bind the graphics pipeline, dynamic state and resources of `binding`
    fn prepare_draw(&mut self, binding: &DrawBinding, layout: VertexLayoutId, topology: PrimitiveTopology) -> bool {
        let Some(target) = self.target.as_ref() else {
            return false;
        };
        if has_null_set(binding.descriptor_sets) {
            engine_warn!(SOURCE, "Draw skipped: null descriptor set bound");
            return false;
        }
        let Some(program) = self.programs.get_mut(binding.program) else {
            engine_error!(SOURCE, "Draw skipped: unknown program {:?}", binding.program);
            return false;
        };
        let Some(vertex_shader) = program.module(ShaderStage::Vertex) else {
            engine_error!(SOURCE, "Draw skipped: program {} has no vertex stage", program.id());
            return false;
        };

        let mut fixed = binding.fixed.clone();
        fixed.topology = topology;
        let state = GraphicsPipelineState {
            program: program.identity(),
            layout: program.pipeline_layout(),
            vertex_shader,
            fragment_shader: program.module(ShaderStage::Fragment),
            vertex_layout: layout,
            target: target.signature.clone(),
            fixed,
            dynamic: binding.dynamic.clone(),
        };

        let stream = self.streams.render_stream();
        let pipeline = self.pipelines.bind_graphics(&mut self.device, stream, &state, self.clock.current());
        if pipeline.is_null() {
            return false;
        }
        program.acknowledge_reload();

        let viewport = binding.dynamic.viewport.unwrap_or(Viewport {
            x: 0.0,
            y: 0.0,
            width: target.width as f32,
            height: target.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        let scissor = binding.dynamic.scissor.unwrap_or(Rect2D {
            x: 0,
            y: 0,
            width: target.width,
            height: target.height,
        });
        self.device.cmd_set_viewport(stream, &viewport);
        self.device.cmd_set_scissor(stream, &scissor);
        if state.fixed.depth_stencil.stencil_test_enable {
            self.device.cmd_set_stencil_reference(stream, binding.dynamic.stencil_reference);
        }

        bind_resources(
            &mut self.device,
            stream,
            BindPoint::Graphics,
            state.layout,
            program.reflection().push_constant_stages,
            binding.descriptor_sets,
            binding.push_constants,
        );
        true
    }

    /// Resolve a mesh's buffers: (vertex buffers with offsets, index buffer)
    fn mesh_buffers(
        &self,
        key: MeshKey,
        offsets: &[u64],
    ) -> Option<(Vec<(BufferHandle, u64)>, Option<BufferHandle>)> {
        let Some(mesh) = self.meshes.get(key) else {
            engine_error!(SOURCE, "Draw skipped: unknown mesh {:?}", key);
            return None;
        };
        let resolve = |buffer: &BufferKey| {
            self.buffers
                .get(*buffer)
                .map(|b| b.handle())
                .filter(|h| !h.is_null())
        };

        let mut vertex_buffers = Vec::with_capacity(mesh.vertex_buffers.len());
        for (index, buffer) in mesh.vertex_buffers.iter().enumerate() {
            let Some(handle) = resolve(buffer) else {
                engine_error!(SOURCE, "Draw skipped: mesh {:?} references a destroyed buffer", key);
                return None;
            };
            vertex_buffers.push((handle, offsets.get(index).copied().unwrap_or(0)));
        }
        let index_buffer = match &mesh.index_buffer {
            Some((buffer, _)) => match resolve(buffer) {
                Some(handle) => Some(handle),
                None => {
                    engine_error!(SOURCE, "Draw skipped: mesh {:?} references a destroyed index buffer", key);
                    return None;
                }
            },
            None => None,
        };
        Some((vertex_buffers, index_buffer))
    }

    /// Record a draw of `mesh` inside the bound framebuffer
    pub fn draw_mesh(&mut self, mesh: MeshKey, binding: &DrawBinding, instance_count: u32) -> bool {
        if !self.streams.require_render_pass("draw_mesh") {
            return false;
        }
        let Some((vertex_buffers, index_buffer)) = self.mesh_buffers(mesh, &binding.dynamic.vertex_offsets) else {
            return false;
        };
        let Some(mesh) = self.meshes.get(mesh).cloned() else {
            return false;
        };
        if !self.prepare_draw(binding, mesh.layout, mesh.topology) {
            return false;
        }

        let stream = self.streams.render_stream();
        self.device.cmd_bind_vertex_buffers(stream, 0, &vertex_buffers);
        match (index_buffer, mesh.index_buffer) {
            (Some(handle), Some((_, index_type))) => {
                self.device.cmd_bind_index_buffer(stream, handle, 0, index_type);
                self.device.cmd_draw_indexed(stream, mesh.index_count, instance_count, 0, 0, 0);
            }
            _ => self.device.cmd_draw(stream, mesh.vertex_count, instance_count, 0, 0),
        }
        self.draw_calls += 1;
        true
    }

    /// Record an indirect draw of `mesh` with arguments read from `indirect`
    pub fn draw_indirect_mesh(
        &mut self,
        mesh: MeshKey,
        binding: &DrawBinding,
        indirect: BufferKey,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> bool {
        if !self.streams.require_render_pass("draw_indirect_mesh") {
            return false;
        }
        let Some(indirect_handle) = self.buffers.get(indirect).map(|b| b.handle()).filter(|h| !h.is_null()) else {
            engine_error!(SOURCE, "Indirect draw skipped: argument buffer {:?} is not ready", indirect);
            return false;
        };
        let Some((vertex_buffers, index_buffer)) = self.mesh_buffers(mesh, &binding.dynamic.vertex_offsets) else {
            return false;
        };
        let Some(mesh) = self.meshes.get(mesh).cloned() else {
            return false;
        };
        if !self.prepare_draw(binding, mesh.layout, mesh.topology) {
            return false;
        }

        let stream = self.streams.render_stream();
        self.device.cmd_bind_vertex_buffers(stream, 0, &vertex_buffers);
        let indexed = match (index_buffer, mesh.index_buffer) {
            (Some(handle), Some((_, index_type))) => {
                self.device.cmd_bind_index_buffer(stream, handle, 0, index_type);
                true
            }
            _ => false,
        };
        self.device.cmd_draw_indirect(
            stream,
            &IndirectDraw {
                buffer: indirect_handle,
                offset,
                draw_count,
                stride,
                indexed,
            },
        );
        self.draw_calls += 1;
        true
    }

    fn quad_geometry(&mut self) -> Option<QuadGeometry> {
        if let Some(quad) = self.quad {
            return Some(quad);
        }
        let bytes: &[u8] = bytemuck::cast_slice(&QUAD_POSITIONS);
        let buffer = match self.device.create_buffer(&BufferDesc {
            size: bytes.len() as u64,
            usage: BufferUsage::VERTEX,
            location: MemoryLocation::CpuToGpu,
        }) {
            Ok(buffer) => buffer,
            Err(e) => {
                engine_error!(SOURCE, "Failed to create the fullscreen quad: {}", e);
                return None;
            }
        };
        if let Err(e) = self.device.write_buffer(buffer, 0, bytes) {
            engine_error!(SOURCE, "Failed to fill the fullscreen quad: {}", e);
            self.device.destroy_buffer(buffer);
            return None;
        }

        let layout = self.pipelines.vertex_layouts_mut().intern(&VertexLayout {
            bindings: vec![VertexBinding {
                binding: 0,
                stride: std::mem::size_of::<Vec2>() as u32,
                input_rate: VertexInputRate::Vertex,
            }],
            attributes: vec![VertexAttribute {
                location: 0,
                binding: 0,
                format: VertexFormat::R32G32_SFLOAT,
                offset: 0,
            }],
        });
        let quad = QuadGeometry { buffer, layout };
        self.quad = Some(quad);
        Some(quad)
    }

    /// Record a fullscreen quad (4-vertex triangle strip, `vec2` positions at location 0)
    pub fn draw_quad(&mut self, binding: &DrawBinding) -> bool {
        if !self.streams.require_render_pass("draw_quad") {
            return false;
        }
        let Some(quad) = self.quad_geometry() else {
            return false;
        };
        if !self.prepare_draw(binding, quad.layout, PrimitiveTopology::TriangleStrip) {
            return false;
        }

        let stream = self.streams.render_stream();
        self.device.cmd_bind_vertex_buffers(stream, 0, &[(quad.buffer, 0)]);
        self.device.cmd_draw(stream, QUAD_POSITIONS.len() as u32, 1, 0, 0);
        self.draw_calls += 1;
        true
    }

    // ===== COMPUTE =====

    /// Record a compute dispatch; illegal while a framebuffer is bound
    pub fn dispatch(&mut self, binding: &ComputeBinding, x: u32, y: u32, z: u32) -> bool {
        if !self.streams.require_no_render_pass("dispatch") {
            return false;
        }
        if has_null_set(binding.descriptor_sets) {
            engine_warn!(SOURCE, "Dispatch skipped: null descriptor set bound");
            return false;
        }
        let Some(program) = self.programs.get_mut(binding.program) else {
            engine_error!(SOURCE, "Dispatch skipped: unknown program {:?}", binding.program);
            return false;
        };
        let Some(shader) = program.module(ShaderStage::Compute) else {
            engine_protocol_violation!(
                self.config.assert_on_protocol_violation,
                SOURCE,
                "dispatch of program {} without a compute stage",
                program.id()
            );
            return false;
        };

        let state = ComputePipelineState {
            program: program.identity(),
            layout: program.pipeline_layout(),
            shader,
        };
        let stream = self.streams.render_stream();
        let pipeline = self.pipelines.bind_compute(&mut self.device, stream, &state, self.clock.current());
        if pipeline.is_null() {
            return false;
        }
        program.acknowledge_reload();

        bind_resources(
            &mut self.device,
            stream,
            BindPoint::Compute,
            state.layout,
            program.reflection().push_constant_stages,
            binding.descriptor_sets,
            binding.push_constants,
        );
        self.device.cmd_dispatch(stream, x, y, z);
        self.dispatches += 1;
        true
    }

    // ===== DESCRIPTOR SETS =====

    /// Allocate a set for descriptor set `set` of `program`
    pub fn allocate_set(&mut self, program: ProgramKey, set: u32) -> DescriptorSet {
        let Some(program) = self.programs.get(program) else {
            engine_error!(SOURCE, "allocate_set: unknown program {:?}", program);
            return DescriptorSet::NULL;
        };
        if program.reflection().bindless_set() == Some(set) {
            engine_error!(
                SOURCE,
                "allocate_set: set {} of program {} is the bindless table, use bindless_set()",
                set,
                program.id()
            );
            return DescriptorSet::NULL;
        }
        let Some(layout) = program.set_layout(set) else {
            engine_error!(SOURCE, "allocate_set: program {} has no set {}", program.id(), set);
            return DescriptorSet::NULL;
        };
        self.descriptors.allocate_set(&mut self.device, layout, self.clock.current())
    }

    /// Allocate a set for an externally integrated UI layout
    pub fn allocate_ui_set(&mut self, layout: DescriptorSetLayoutHandle) -> DescriptorSet {
        self.descriptors.allocate_ui_set(&mut self.device, layout, self.clock.current())
    }

    /// Allocate an extra set with the bindless table layout sized for `count` textures
    pub fn allocate_bindless_set(&mut self, count: u32) -> DescriptorSet {
        let Some(layout) = self.bindless.as_ref().map(|t| t.layout()) else {
            engine_error!(SOURCE, "allocate_bindless_set: no bindless table configured");
            return DescriptorSet::NULL;
        };
        self.descriptors.allocate_bindless_set(&mut self.device, layout, count, self.clock.current())
    }

    /// Return a set to its pool
    pub fn free_set(&mut self, set: DescriptorSet) {
        self.descriptors.free_set(set, self.clock.current());
    }

    /// Write descriptors into `set`
    pub fn write_set(&mut self, set: DescriptorSet, writes: &[DescriptorWrite]) {
        if set.is_null() {
            return;
        }
        self.device.write_descriptor_set(set.handle, writes);
    }

    pub(super) fn bindless_entry(&self, key: TextureKey) -> Option<BindlessEntry> {
        self.textures
            .get(key)
            .and_then(|t| t.device_texture())
            .filter(|d| !d.sampler.is_null())
            .map(|d| BindlessEntry { view: d.view, sampler: d.sampler })
    }

    /// Sampled-image descriptor of `key`, the placeholder when it has no device side
    pub fn sampled_texture(&self, key: TextureKey) -> Option<DescriptorResource> {
        self.bindless_entry(key)
            .or_else(|| self.bindless_entry(self.placeholder))
            .map(|e| DescriptorResource::SampledImage { view: e.view, sampler: e.sampler })
    }

    // ===== BINDLESS TABLE =====

    /// Rewrite the bindless table with `textures`, in index order
    ///
    /// Textures without a device side are replaced by the placeholder.
    /// Returns the number of entries written.
    pub fn update_bindless_textures(&mut self, textures: &[TextureKey]) -> u32 {
        if self.bindless.is_none() {
            engine_error!(SOURCE, "update_bindless_textures: no bindless table configured");
            return 0;
        }
        let placeholder = self.bindless_entry(self.placeholder);
        let entries: Vec<BindlessEntry> = textures
            .iter()
            .filter_map(|key| self.bindless_entry(*key).or(placeholder))
            .collect();
        if entries.len() < textures.len() {
            engine_warn!(SOURCE, "{} bindless textures dropped without a placeholder", textures.len() - entries.len());
        }

        match self.bindless.as_mut() {
            Some(table) => table.update(&mut self.device, &entries),
            None => 0,
        }
    }

    /// Active bindless table set (NULL without a table)
    pub fn bindless_set(&self) -> DescriptorSetHandle {
        self.bindless
            .as_ref()
            .map(|t| t.active_set())
            .unwrap_or(DescriptorSetHandle::NULL)
    }
}
