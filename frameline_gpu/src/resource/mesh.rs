/// Mesh resource: vertex/index buffer references plus an interned vertex layout

use slotmap::new_key_type;

use crate::device::{IndexType, PrimitiveTopology, VertexLayout};
use crate::pipeline::VertexLayoutId;
use crate::resource::BufferKey;

new_key_type! {
    /// Stable key of a mesh inside a `RenderContext`
    pub struct MeshKey;
}

/// Mesh setup parameters
#[derive(Debug, Clone)]
pub struct MeshDesc {
    /// One buffer per vertex binding, in binding order
    pub vertex_buffers: Vec<BufferKey>,
    pub index_buffer: Option<(BufferKey, IndexType)>,
    pub vertex_layout: VertexLayout,
    pub vertex_count: u32,
    /// Ignored without an index buffer
    pub index_count: u32,
    pub topology: PrimitiveTopology,
}

/// Mesh resource
#[derive(Debug, Clone)]
pub struct Mesh {
    pub(crate) vertex_buffers: Vec<BufferKey>,
    pub(crate) index_buffer: Option<(BufferKey, IndexType)>,
    pub(crate) layout: VertexLayoutId,
    pub(crate) vertex_count: u32,
    pub(crate) index_count: u32,
    pub(crate) topology: PrimitiveTopology,
}

impl Mesh {
    pub(crate) fn new(desc: &MeshDesc, layout: VertexLayoutId) -> Self {
        Self {
            vertex_buffers: desc.vertex_buffers.clone(),
            index_buffer: desc.index_buffer,
            layout,
            vertex_count: desc.vertex_count,
            index_count: desc.index_count,
            topology: desc.topology,
        }
    }

    pub fn vertex_layout(&self) -> VertexLayoutId {
        self.layout
    }

    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
