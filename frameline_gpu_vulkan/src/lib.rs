/*!
# Frameline GPU - Vulkan Backend

Vulkan implementation of the `GraphicsDevice` trait from `frameline_gpu`.

Built on ash (Vulkan 1.3, dynamic rendering, descriptor indexing) and
gpu-allocator for memory management. The backend is headless: presentation
is left to the caller.

```no_run
use frameline_gpu::frameline::{RenderConfig, RenderContext};
use frameline_gpu_vulkan::{VulkanConfig, VulkanGraphicsDevice};

let device = VulkanGraphicsDevice::new(&VulkanConfig::default())?;
let mut context = RenderContext::new(device, RenderConfig::default())?;
context.next_frame()?;
# Ok::<(), frameline_gpu::frameline::Error>(())
```
*/

mod debug;
mod vulkan_context;
mod vulkan_convert;
mod vulkan_device;

pub use vulkan_context::{GpuContext, VulkanConfig};
pub use vulkan_device::VulkanGraphicsDevice;

// Re-export debug utilities
pub use debug::{
    ValidationSeverity, ValidationStats, get_validation_stats, print_validation_stats_report,
};
