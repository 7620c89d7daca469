/// Pipeline state snapshots
///
/// A snapshot aggregates everything that is baked into a pipeline object:
/// program identity, vertex layout, render-target formats and fixed-function
/// state. Snapshots are compared with an equivalence predicate rather than
/// plain equality: dynamic state (viewport, scissor, stencil reference,
/// buffer offsets) never forces a rebuild, and a program reload always does.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::device::{
    FixedFunctionState, PipelineLayoutHandle, Rect2D, ShaderModuleHandle, TextureFormat, Viewport,
    MAX_COLOR_ATTACHMENTS,
};
use crate::pipeline::VertexLayoutId;

/// Identity of a compiled program
///
/// `generation` is bumped on every reload; snapshots taken before a reload
/// are never equivalent to snapshots taken after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramIdentity {
    pub id: u64,
    pub generation: u64,
}

/// Attachment formats of the bound render target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RenderTargetSignature {
    pub color_formats: Vec<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
}

impl RenderTargetSignature {
    pub fn attachment_count(&self) -> usize {
        self.color_formats.len() + usize::from(self.depth_format.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.attachment_count() == 0
    }

    /// Whether the signature fits the backend limit
    pub fn is_valid(&self) -> bool {
        self.color_formats.len() <= MAX_COLOR_ATTACHMENTS
    }
}

/// Per-draw state applied with dynamic commands, ignored by equivalence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicState {
    /// Viewport (None = full render target)
    pub viewport: Option<Viewport>,
    /// Scissor (None = full render target)
    pub scissor: Option<Rect2D>,
    pub stencil_reference: u32,
    /// Byte offsets applied to the bound vertex buffers
    pub vertex_offsets: Vec<u64>,
}

/// Graphics pipeline snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineState {
    pub program: ProgramIdentity,
    pub layout: PipelineLayoutHandle,
    pub vertex_shader: ShaderModuleHandle,
    pub fragment_shader: Option<ShaderModuleHandle>,
    pub vertex_layout: VertexLayoutId,
    pub target: RenderTargetSignature,
    pub fixed: FixedFunctionState,
    pub dynamic: DynamicState,
}

impl GraphicsPipelineState {
    /// Same pipeline object can serve both snapshots
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.program == other.program && self.is_compatible_ignoring_generation(other)
    }

    /// Equivalent except possibly for the program generation
    pub(crate) fn is_compatible_ignoring_generation(&self, other: &Self) -> bool {
        self.program.id == other.program.id
            && self.vertex_layout == other.vertex_layout
            && self.target == other.target
            && fixed_state_bits_equal(&self.fixed, &other.fixed)
    }

    /// Hash of the equivalence-relevant fields, excluding the program generation
    pub(crate) fn cache_key(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.program.id.hash(&mut hasher);
        self.vertex_layout.hash(&mut hasher);
        self.target.hash(&mut hasher);
        hash_fixed_state(&self.fixed, &mut hasher);
        hasher.finish()
    }
}

/// Compute pipeline snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputePipelineState {
    pub program: ProgramIdentity,
    pub layout: PipelineLayoutHandle,
    pub shader: ShaderModuleHandle,
}

impl ComputePipelineState {
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.program == other.program
    }
}

/// Byte equality of the fixed-function block (floats compared by bit pattern)
fn fixed_state_bits_equal(a: &FixedFunctionState, b: &FixedFunctionState) -> bool {
    let bias_bits = |s: &FixedFunctionState| {
        s.rasterization
            .depth_bias
            .map(|d| (d.constant_factor.to_bits(), d.slope_factor.to_bits(), d.clamp.to_bits()))
    };
    a.topology == b.topology
        && a.rasterization.cull_mode == b.rasterization.cull_mode
        && a.rasterization.front_face == b.rasterization.front_face
        && a.rasterization.polygon_mode == b.rasterization.polygon_mode
        && bias_bits(a) == bias_bits(b)
        && a.depth_stencil == b.depth_stencil
        && a.color_blend == b.color_blend
        && a.multisample == b.multisample
}

fn hash_fixed_state<H: Hasher>(fixed: &FixedFunctionState, state: &mut H) {
    fixed.topology.hash(state);
    fixed.rasterization.cull_mode.hash(state);
    fixed.rasterization.front_face.hash(state);
    fixed.rasterization.polygon_mode.hash(state);
    if let Some(bias) = fixed.rasterization.depth_bias {
        bias.constant_factor.to_bits().hash(state);
        bias.slope_factor.to_bits().hash(state);
        bias.clamp.to_bits().hash(state);
    }
    fixed.depth_stencil.hash(state);
    fixed.color_blend.hash(state);
    fixed.multisample.hash(state);
}

#[cfg(test)]
#[path = "pipeline_state_tests.rs"]
mod tests;
