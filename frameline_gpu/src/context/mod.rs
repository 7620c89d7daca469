/// Render context
///
/// Explicitly constructed owner of the backend device and of every
/// frame-execution component. All GPU-facing state lives here and is mutated
/// from the single recording thread; nothing is reached through globals.
///
/// A context is always recording a frame: the streams of frame 0 are opened
/// at construction and `next_frame` closes one frame and opens the next.

mod resources;
mod commands;

pub use commands::{ComputeBinding, DrawBinding, Framebuffer, FramebufferAttachment};

use slotmap::SlotMap;

use crate::config::RenderConfig;
use crate::descriptor::{BindlessTextureTable, DescriptorPoolAllocator};
use crate::device::{BufferHandle, GraphicsDevice};
use crate::error::{Error, Result};
use crate::frame::{CommandStreamOrchestrator, DeferredDestructionQueue, FrameClock, ResourceToDelete};
use crate::pipeline::{PipelineStateCache, RenderTargetSignature, VertexLayoutId};
use crate::resource::{Buffer, BufferKey, Mesh, MeshKey, Program, ProgramKey, Texture, TextureKey};
use crate::transfer::AsyncTransferQueue;
use crate::{engine_debug, engine_error, engine_info};

const SOURCE: &str = "frameline::RenderContext";

/// Counters of the current frame plus component bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frame being recorded
    pub frame: u64,
    /// Draws recorded this frame
    pub draw_calls: u32,
    /// Dispatches recorded this frame
    pub dispatches: u32,
    /// Pipeline objects built since creation
    pub pipeline_builds: u64,
    /// Pipeline binds skipped since creation
    pub pipeline_bind_skips: u64,
    pub cached_pipelines: usize,
    /// General-purpose descriptor pools
    pub descriptor_pools: usize,
    pub pending_deletions: usize,
    pub pending_async_tasks: usize,
}

/// Render target currently bound on the render stream
struct BoundTarget {
    textures: Vec<TextureKey>,
    signature: RenderTargetSignature,
    width: u32,
    height: u32,
}

/// Fullscreen quad used by `draw_quad`
#[derive(Clone, Copy)]
struct QuadGeometry {
    buffer: BufferHandle,
    layout: VertexLayoutId,
}

/// Owner of the device and of every resource and frame component
pub struct RenderContext<D: GraphicsDevice> {
    device: D,
    config: RenderConfig,

    clock: FrameClock,
    streams: CommandStreamOrchestrator,
    deletion_queue: DeferredDestructionQueue,
    descriptors: DescriptorPoolAllocator,
    pipelines: PipelineStateCache,
    transfers: AsyncTransferQueue,
    bindless: Option<BindlessTextureTable>,

    textures: SlotMap<TextureKey, Texture>,
    buffers: SlotMap<BufferKey, Buffer>,
    meshes: SlotMap<MeshKey, Mesh>,
    programs: SlotMap<ProgramKey, Program>,
    next_program_id: u64,

    placeholder: TextureKey,
    quad: Option<QuadGeometry>,
    target: Option<BoundTarget>,

    draw_calls: u32,
    dispatches: u32,
    cleaned_up: bool,
}

impl<D: GraphicsDevice> RenderContext<D> {
    /// Take ownership of `device` and start recording frame 0
    pub fn new(mut device: D, config: RenderConfig) -> Result<Self> {
        let frames_in_flight = config.frames_in_flight.max(1);
        let assert_on_violation = config.assert_on_protocol_violation;

        let streams = CommandStreamOrchestrator::new(&mut device, frames_in_flight, assert_on_violation)
            .map_err(|e| Error::InitializationFailed(format!("command streams: {}", e)))?;
        let descriptors = DescriptorPoolAllocator::new(&config);

        let mut context = Self {
            device,
            clock: FrameClock::new(frames_in_flight),
            streams,
            deletion_queue: DeferredDestructionQueue::new(frames_in_flight, assert_on_violation),
            descriptors,
            pipelines: PipelineStateCache::new(frames_in_flight),
            transfers: AsyncTransferQueue::new(frames_in_flight),
            bindless: None,
            textures: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            next_program_id: 1,
            placeholder: TextureKey::default(),
            quad: None,
            target: None,
            draw_calls: 0,
            dispatches: 0,
            cleaned_up: false,
            config,
        };

        if context.config.max_bindless_textures > 0 {
            let table = BindlessTextureTable::new(
                &mut context.device,
                &mut context.descriptors,
                context.config.max_bindless_textures,
                0,
            )
            .map_err(|e| Error::InitializationFailed(format!("bindless table: {}", e)))?;
            context.bindless = Some(table);
        }

        context.streams.begin_frame(&mut context.device, context.clock.slot())?;
        context.placeholder = context.create_placeholder();
        let fallback = context.bindless_entry(context.placeholder);
        if let Some(table) = context.bindless.as_mut() {
            table.set_fallback(fallback);
        }

        engine_info!(
            SOURCE,
            "Render context created on {} ({} frames in flight)",
            context.device.name(),
            frames_in_flight
        );
        Ok(context)
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Frame being recorded
    pub fn current_frame(&self) -> u64 {
        self.clock.current()
    }

    pub fn frames_in_flight(&self) -> u32 {
        self.clock.frames_in_flight()
    }

    pub fn descriptor_allocator(&self) -> &DescriptorPoolAllocator {
        &self.descriptors
    }

    pub fn pipeline_cache(&self) -> &PipelineStateCache {
        &self.pipelines
    }

    pub fn bindless_table(&self) -> Option<&BindlessTextureTable> {
        self.bindless.as_ref()
    }

    pub fn stats(&self) -> FrameStats {
        let pipelines = self.pipelines.stats();
        FrameStats {
            frame: self.clock.current(),
            draw_calls: self.draw_calls,
            dispatches: self.dispatches,
            pipeline_builds: pipelines.builds,
            pipeline_bind_skips: pipelines.bind_skips,
            cached_pipelines: pipelines.graphics_pipelines + pipelines.compute_pipelines,
            descriptor_pools: self.descriptors.pool_count(),
            pending_deletions: self.deletion_queue.len(),
            pending_async_tasks: self.transfers.pending_count(),
        }
    }

    // ===== FRAME LIFECYCLE =====

    /// Submit the current frame and start recording the next one
    ///
    /// Once the new frame's slot is free again, retired objects and async
    /// downloads that are `frames_in_flight` frames old are finalized.
    /// Returns the new frame number.
    pub fn next_frame(&mut self) -> Result<u64> {
        self.unbind_framebuffer_if_needed();
        self.streams.end_frame(&mut self.device)?;
        self.pipelines.mark_transition();

        let frame = self.clock.advance();
        self.streams.begin_frame(&mut self.device, self.clock.slot())?;

        let destroyed = self.deletion_queue.drain(&mut self.device, frame);
        let resolved = self.transfers.process(&mut self.device, frame, false);
        let interval = self.config.pipeline_prune_interval.max(1);
        if frame % interval == 0 {
            self.pipelines.prune_outdated(&mut self.device, frame);
        }

        if destroyed > 0 || resolved > 0 {
            engine_debug!(
                SOURCE,
                "Frame {}: destroyed {} objects, resolved {} downloads",
                frame,
                destroyed,
                resolved
            );
        }
        self.draw_calls = 0;
        self.dispatches = 0;
        Ok(frame)
    }

    /// Submit everything recorded so far and wait until the device is idle
    ///
    /// The bound framebuffer is unbound and every retired object is
    /// destroyed. Recording continues in the same frame.
    pub fn flush(&mut self) -> Result<()> {
        self.unbind_framebuffer_if_needed();
        self.streams.flush(&mut self.device)?;
        self.device.wait_idle()?;
        self.pipelines.mark_transition();
        let destroyed = self.deletion_queue.flush_all(&mut self.device);
        engine_debug!(SOURCE, "Flush at frame {} destroyed {} objects", self.clock.current(), destroyed);
        Ok(())
    }

    /// Release every device object owned by the context
    ///
    /// Pending downloads are resolved (their callbacks run once). Called by
    /// `Drop` when not called explicitly.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        self.unbind_framebuffer_if_needed();
        if let Err(e) = self.streams.end_frame(&mut self.device) {
            engine_error!(SOURCE, "Failed to submit the last frame: {}", e);
        }
        if let Err(e) = self.device.wait_idle() {
            engine_error!(SOURCE, "wait_idle failed during cleanup: {}", e);
        }

        let frame = self.clock.current();
        let resolved = self.transfers.process(&mut self.device, frame, true);

        for (_, mut texture) in self.textures.drain() {
            texture.retire(&mut self.deletion_queue, frame);
        }
        for (_, mut buffer) in self.buffers.drain() {
            buffer.retire(&mut self.deletion_queue, frame);
        }
        self.meshes.clear();
        if let Some(quad) = self.quad.take() {
            self.deletion_queue.retire(ResourceToDelete::Buffer(quad.buffer), frame);
        }
        let destroyed = self.deletion_queue.flush_all(&mut self.device);

        self.pipelines.cleanup(&mut self.device);
        for (_, mut program) in self.programs.drain() {
            program.destroy(&mut self.device);
        }
        if let Some(mut table) = self.bindless.take() {
            table.cleanup(&mut self.device, &mut self.descriptors, frame);
        }
        self.descriptors.cleanup(&mut self.device);
        self.streams.cleanup(&mut self.device);

        engine_info!(
            SOURCE,
            "Render context cleaned up at frame {} ({} objects destroyed, {} downloads resolved)",
            frame,
            destroyed,
            resolved
        );
    }
}

impl<D: GraphicsDevice> Drop for RenderContext<D> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
