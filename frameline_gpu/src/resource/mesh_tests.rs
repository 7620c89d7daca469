use super::*;
use slotmap::SlotMap;

use crate::device::{VertexAttribute, VertexBinding, VertexFormat, VertexInputRate};

fn position_layout() -> VertexLayout {
    VertexLayout {
        bindings: vec![VertexBinding { binding: 0, stride: 12, input_rate: VertexInputRate::Vertex }],
        attributes: vec![VertexAttribute {
            location: 0,
            binding: 0,
            format: VertexFormat::R32G32B32_SFLOAT,
            offset: 0,
        }],
    }
}

fn keys() -> (BufferKey, BufferKey) {
    let mut buffers: SlotMap<BufferKey, ()> = SlotMap::with_key();
    (buffers.insert(()), buffers.insert(()))
}

#[test]
fn test_non_indexed_mesh() {
    let (vertices, _) = keys();
    let mesh = Mesh::new(
        &MeshDesc {
            vertex_buffers: vec![vertices],
            index_buffer: None,
            vertex_layout: position_layout(),
            vertex_count: 3,
            index_count: 0,
            topology: PrimitiveTopology::TriangleList,
        },
        VertexLayoutId(4),
    );

    assert!(!mesh.is_indexed());
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.vertex_layout(), VertexLayoutId(4));
    assert_eq!(mesh.topology(), PrimitiveTopology::TriangleList);
}

#[test]
fn test_indexed_mesh_keeps_buffer_keys() {
    let (vertices, indices) = keys();
    let mesh = Mesh::new(
        &MeshDesc {
            vertex_buffers: vec![vertices],
            index_buffer: Some((indices, IndexType::U16)),
            vertex_layout: position_layout(),
            vertex_count: 4,
            index_count: 6,
            topology: PrimitiveTopology::TriangleList,
        },
        VertexLayoutId(0),
    );

    assert!(mesh.is_indexed());
    assert_eq!(mesh.index_count(), 6);
    assert_eq!(mesh.vertex_buffers, vec![vertices]);
    assert_eq!(mesh.index_buffer, Some((indices, IndexType::U16)));
}
