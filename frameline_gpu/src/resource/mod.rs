/// CPU-side resource objects addressed by slot-map keys

pub mod texture;
pub mod buffer;
pub mod mesh;
pub mod program;

pub use texture::{DeviceTexture, Texture, TextureKey};
pub use buffer::{Buffer, BufferKey, DeviceBuffer};
pub use mesh::{Mesh, MeshDesc, MeshKey};
pub use program::{
    merge_reflection, BufferBinding, BufferKind, ImageBinding, ImageKind, MergedReflection,
    Program, ProgramKey, SetLayoutInfo, ShaderStageDesc, StageReflection,
};
