/// Pipeline object cache
///
/// Maps snapshots to built pipeline objects. Lookups hash the
/// equivalence-relevant fields (program generation excluded) and then run the
/// equivalence predicate over the bucket. An entry whose program has been
/// reloaded since it was built is rebuilt in place; the superseded pipeline
/// is kept in an outdated list until no in-flight frame can reference it.

use rustc_hash::FxHashMap;

use crate::device::{
    BindPoint, CommandStreamHandle, ComputePipelineDesc, GraphicsDevice, GraphicsPipelineDesc,
    PipelineHandle,
};
use crate::frame::FrameClock;
use crate::pipeline::{ComputePipelineState, GraphicsPipelineState, VertexLayoutRegistry};
use crate::{engine_debug, engine_error};

const SOURCE: &str = "frameline::PipelineStateCache";

struct GraphicsEntry {
    state: GraphicsPipelineState,
    pipeline: PipelineHandle,
}

struct ComputeEntry {
    state: ComputePipelineState,
    pipeline: PipelineHandle,
}

/// Cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineCacheStats {
    pub graphics_pipelines: usize,
    pub compute_pipelines: usize,
    /// Pipelines superseded by a rebuild and not destroyed yet
    pub outdated_pipelines: usize,
    /// Pipeline objects built since creation
    pub builds: u64,
    /// Bind calls skipped because the pipeline was already bound
    pub bind_skips: u64,
}

/// Snapshot-keyed pipeline cache with redundant-bind elimination
pub struct PipelineStateCache {
    graphics: FxHashMap<u64, Vec<GraphicsEntry>>,
    compute: FxHashMap<u64, Vec<ComputeEntry>>,
    outdated: Vec<(PipelineHandle, u64)>,
    vertex_layouts: VertexLayoutRegistry,

    bound_graphics: Option<PipelineHandle>,
    bound_compute: Option<PipelineHandle>,
    /// Set by render-pass and frame transitions, forces the next bind
    transition: bool,

    frames_in_flight: u32,
    builds: u64,
    bind_skips: u64,
}

impl PipelineStateCache {
    pub fn new(frames_in_flight: u32) -> Self {
        Self {
            graphics: FxHashMap::default(),
            compute: FxHashMap::default(),
            outdated: Vec::new(),
            vertex_layouts: VertexLayoutRegistry::new(),
            bound_graphics: None,
            bound_compute: None,
            transition: true,
            frames_in_flight: frames_in_flight.max(1),
            builds: 0,
            bind_skips: 0,
        }
    }

    /// Vertex layout interner shared by meshes and snapshots
    pub fn vertex_layouts(&self) -> &VertexLayoutRegistry {
        &self.vertex_layouts
    }

    pub fn vertex_layouts_mut(&mut self) -> &mut VertexLayoutRegistry {
        &mut self.vertex_layouts
    }

    // ===== LOOKUP =====

    /// Pipeline for `state`, built on a miss
    ///
    /// Returns `PipelineHandle::NULL` (logged) when the build fails.
    pub fn get_graphics_pipeline(
        &mut self,
        device: &mut dyn GraphicsDevice,
        state: &GraphicsPipelineState,
        frame: u64,
    ) -> PipelineHandle {
        let key = state.cache_key();
        let bucket = self.graphics.entry(key).or_default();

        if let Some(entry) = bucket.iter().find(|e| e.state.is_equivalent(state)) {
            return entry.pipeline;
        }

        let stale = bucket.iter().position(|e| e.state.is_compatible_ignoring_generation(state));

        let Some(vertex_layout) = self.vertex_layouts.get(state.vertex_layout) else {
            engine_error!(SOURCE, "Unknown vertex layout {:?}", state.vertex_layout);
            return PipelineHandle::NULL;
        };
        let desc = GraphicsPipelineDesc {
            layout: state.layout,
            vertex_shader: state.vertex_shader,
            fragment_shader: state.fragment_shader,
            vertex_layout: vertex_layout.clone(),
            fixed: state.fixed.clone(),
            color_formats: state.target.color_formats.clone(),
            depth_format: state.target.depth_format,
        };

        let pipeline = match device.create_graphics_pipeline(&desc) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                engine_error!(SOURCE, "Failed to build graphics pipeline for program {}: {}", state.program.id, e);
                return PipelineHandle::NULL;
            }
        };
        self.builds += 1;

        let entry = GraphicsEntry { state: state.clone(), pipeline };
        match stale {
            Some(index) => {
                let old = std::mem::replace(&mut bucket[index], entry);
                engine_debug!(
                    SOURCE,
                    "Program {} reloaded (generation {} -> {}), rebuilt graphics pipeline",
                    state.program.id,
                    old.state.program.generation,
                    state.program.generation
                );
                self.outdated.push((old.pipeline, frame));
            }
            None => bucket.push(entry),
        }
        pipeline
    }

    /// Compute pipeline for `state`, built on a miss
    pub fn get_compute_pipeline(
        &mut self,
        device: &mut dyn GraphicsDevice,
        state: &ComputePipelineState,
        frame: u64,
    ) -> PipelineHandle {
        let bucket = self.compute.entry(state.program.id).or_default();

        if let Some(entry) = bucket.iter().find(|e| e.state.is_equivalent(state)) {
            return entry.pipeline;
        }

        let desc = ComputePipelineDesc { layout: state.layout, shader: state.shader };
        let pipeline = match device.create_compute_pipeline(&desc) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                engine_error!(SOURCE, "Failed to build compute pipeline for program {}: {}", state.program.id, e);
                return PipelineHandle::NULL;
            }
        };
        self.builds += 1;

        // one compute pipeline per program: any other entry is an older generation
        for old in bucket.drain(..) {
            self.outdated.push((old.pipeline, frame));
        }
        bucket.push(ComputeEntry { state: *state, pipeline });
        pipeline
    }

    // ===== BINDING =====

    /// Look up and bind the graphics pipeline for `state`
    ///
    /// The bind command is skipped when the same pipeline is still bound and
    /// no transition happened since. Returns the pipeline (NULL on failure,
    /// nothing is bound then).
    pub fn bind_graphics(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stream: CommandStreamHandle,
        state: &GraphicsPipelineState,
        frame: u64,
    ) -> PipelineHandle {
        let pipeline = self.get_graphics_pipeline(device, state, frame);
        if pipeline.is_null() {
            return pipeline;
        }
        if !self.transition && self.bound_graphics == Some(pipeline) {
            self.bind_skips += 1;
            return pipeline;
        }
        device.cmd_bind_pipeline(stream, BindPoint::Graphics, pipeline);
        self.bound_graphics = Some(pipeline);
        self.transition = false;
        pipeline
    }

    /// Look up and bind the compute pipeline for `state`
    pub fn bind_compute(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stream: CommandStreamHandle,
        state: &ComputePipelineState,
        frame: u64,
    ) -> PipelineHandle {
        let pipeline = self.get_compute_pipeline(device, state, frame);
        if pipeline.is_null() {
            return pipeline;
        }
        if !self.transition && self.bound_compute == Some(pipeline) {
            self.bind_skips += 1;
            return pipeline;
        }
        device.cmd_bind_pipeline(stream, BindPoint::Compute, pipeline);
        self.bound_compute = Some(pipeline);
        self.transition = false;
        pipeline
    }

    /// Render pass begin/end or frame finish: the next bind is always issued
    pub fn mark_transition(&mut self) {
        self.transition = true;
        self.bound_graphics = None;
        self.bound_compute = None;
    }

    // ===== PRUNING / SHUTDOWN =====

    /// Move every pipeline built from program `program_id` to the outdated list
    ///
    /// Used when a program is reloaded or destroyed. The pipelines are
    /// destroyed by `prune_outdated` once `frame` has left the in-flight
    /// window. Returns the number of retired pipelines.
    pub fn retire_program(&mut self, program_id: u64, frame: u64) -> usize {
        let before = self.outdated.len();
        for bucket in self.graphics.values_mut() {
            let mut index = 0;
            while index < bucket.len() {
                if bucket[index].state.program.id == program_id {
                    let entry = bucket.swap_remove(index);
                    self.outdated.push((entry.pipeline, frame));
                } else {
                    index += 1;
                }
            }
        }
        self.graphics.retain(|_, bucket| !bucket.is_empty());
        if let Some(bucket) = self.compute.remove(&program_id) {
            self.outdated.extend(bucket.into_iter().map(|entry| (entry.pipeline, frame)));
        }

        let retired = self.outdated.len() - before;
        if retired > 0 {
            self.mark_transition();
            engine_debug!(SOURCE, "Retired {} pipelines of program {} at frame {}", retired, program_id, frame);
        }
        retired
    }

    /// Destroy outdated pipelines older than the in-flight window
    pub fn prune_outdated(&mut self, device: &mut dyn GraphicsDevice, current_frame: u64) -> usize {
        let frames_in_flight = self.frames_in_flight;
        let before = self.outdated.len();
        self.outdated.retain(|(pipeline, frame)| {
            if FrameClock::is_frame_safe(*frame, current_frame, frames_in_flight) {
                device.destroy_pipeline(*pipeline);
                false
            } else {
                true
            }
        });
        let pruned = before - self.outdated.len();
        if pruned > 0 {
            engine_debug!(SOURCE, "Pruned {} outdated pipelines at frame {}", pruned, current_frame);
        }
        pruned
    }

    pub fn stats(&self) -> PipelineCacheStats {
        PipelineCacheStats {
            graphics_pipelines: self.graphics.values().map(Vec::len).sum(),
            compute_pipelines: self.compute.values().map(Vec::len).sum(),
            outdated_pipelines: self.outdated.len(),
            builds: self.builds,
            bind_skips: self.bind_skips,
        }
    }

    /// Destroy every pipeline; the device must be idle
    pub fn cleanup(&mut self, device: &mut dyn GraphicsDevice) {
        for (pipeline, _) in self.outdated.drain(..) {
            device.destroy_pipeline(pipeline);
        }
        for entry in self.graphics.drain().flat_map(|(_, bucket)| bucket) {
            device.destroy_pipeline(entry.pipeline);
        }
        for entry in self.compute.drain().flat_map(|(_, bucket)| bucket) {
            device.destroy_pipeline(entry.pipeline);
        }
        self.bound_graphics = None;
        self.bound_compute = None;
        self.transition = true;
    }
}

#[cfg(test)]
#[path = "pipeline_cache_tests.rs"]
mod tests;
