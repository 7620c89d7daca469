/// Pipeline state snapshots and the pipeline object cache

mod vertex_layouts;
mod pipeline_state;
mod pipeline_cache;

pub use vertex_layouts::{VertexLayoutId, VertexLayoutRegistry};
pub use pipeline_state::{
    ComputePipelineState, DynamicState, GraphicsPipelineState, ProgramIdentity, RenderTargetSignature,
};
pub use pipeline_cache::{PipelineCacheStats, PipelineStateCache};
