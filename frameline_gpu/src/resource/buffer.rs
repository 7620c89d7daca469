/// Buffer resource

use slotmap::new_key_type;

use crate::device::{BufferDesc, BufferHandle, GraphicsDevice};
use crate::error::Result;
use crate::frame::{DeferredDestructionQueue, ResourceToDelete};

new_key_type! {
    /// Stable key of a buffer inside a `RenderContext`
    pub struct BufferKey;
}

/// Device object backing a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceBuffer {
    pub handle: BufferHandle,
    pub size: u64,
}

/// Buffer resource: descriptor plus optional device side
pub struct Buffer {
    desc: BufferDesc,
    device: Option<Box<DeviceBuffer>>,
}

impl Buffer {
    pub fn new(desc: BufferDesc) -> Self {
        Self { desc, device: None }
    }

    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    pub fn device_buffer(&self) -> Option<&DeviceBuffer> {
        self.device.as_deref()
    }

    pub fn handle(&self) -> BufferHandle {
        self.device.as_ref().map(|d| d.handle).unwrap_or(BufferHandle::NULL)
    }

    pub fn is_ready(&self) -> bool {
        self.device.is_some()
    }

    /// Create the device side for `desc`, retiring the previous one
    ///
    /// Keeps the current device side when the descriptor is unchanged.
    pub(crate) fn setup(
        &mut self,
        device: &mut dyn GraphicsDevice,
        desc: BufferDesc,
        queue: &mut DeferredDestructionQueue,
        frame: u64,
    ) -> Result<()> {
        if self.device.is_some() && self.desc == desc {
            return Ok(());
        }
        let handle = device.create_buffer(&desc)?;
        self.retire(queue, frame);
        self.desc = desc;
        self.device = Some(Box::new(DeviceBuffer { handle, size: desc.size }));
        Ok(())
    }

    pub(crate) fn retire(&mut self, queue: &mut DeferredDestructionQueue, frame: u64) {
        if let Some(device_buffer) = self.device.take() {
            queue.retire(ResourceToDelete::Buffer(device_buffer.handle), frame);
        }
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
