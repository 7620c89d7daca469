/// Backend device abstraction
///
/// Handles, descriptors and the `GraphicsDevice` trait implemented by the
/// Vulkan backend and by the in-memory mock.

mod handles;
mod types;
mod pipeline_desc;
mod graphics_device;
pub mod mock_device;

pub use handles::*;
pub use types::*;
pub use pipeline_desc::*;
pub use graphics_device::GraphicsDevice;
pub use mock_device::{MockGraphicsDevice, MockObjectKind};
