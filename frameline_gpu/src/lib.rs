/*!
# Frameline GPU

GPU resource and frame-execution management layer.

The device consumes recorded command streams several frames behind the CPU.
This crate keeps recorded work correct under that lag: it owns device object
lifetimes, recycles descriptor pools, caches pipeline objects by render-state
equivalence and runs asynchronous readbacks that are delivered exactly once.

## Architecture

- **GraphicsDevice**: backend trait (Vulkan in `frameline_gpu_vulkan`, in-memory mock here)
- **FrameClock / DeferredDestructionQueue**: frame-age protocol for destruction
- **CommandStreamOrchestrator**: upload + render streams per frame slot
- **DescriptorPoolAllocator / BindlessTextureTable**: descriptor set management
- **PipelineStateCache**: snapshot-keyed pipeline objects
- **AsyncTransferQueue**: deferred GPU -> CPU readbacks
- **RenderContext**: explicitly constructed owner of all of the above
*/

// Internal modules
mod error;
mod config;
pub mod log;
pub mod device;
pub mod frame;
pub mod descriptor;
pub mod pipeline;
pub mod resource;
pub mod transfer;
pub mod context;

#[cfg(test)]
mod test_support;

// Main frameline namespace module
pub mod frameline {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::RenderConfig;

    // Render context
    pub use crate::context::{
        ComputeBinding, DrawBinding, FrameStats, Framebuffer, FramebufferAttachment, RenderContext,
    };

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger, log, reset_logger, set_logger};
    }

    // Backend seam: handles, descriptors, trait and mock
    pub mod device {
        pub use crate::device::*;
    }

    // Frame-execution components
    pub mod frame {
        pub use crate::frame::*;
    }

    pub mod descriptor {
        pub use crate::descriptor::*;
    }

    pub mod pipeline {
        pub use crate::pipeline::*;
    }

    pub mod resource {
        pub use crate::resource::*;
    }

    pub mod transfer {
        pub use crate::transfer::*;
    }
}

// Re-export math library at crate root
pub use glam;
