/// Asynchronous GPU -> CPU readbacks
///
/// A download records its copy into the current frame's render stream right
/// away and queues a task. Once the submission frame is provably finished,
/// `process` copies the staged bytes into the result image and hands it to
/// the task's callback, exactly once. Tasks resolve in submission order.

use std::collections::VecDeque;

use crate::device::{BufferHandle, CommandStreamHandle, GraphicsDevice};
use crate::error::Result;
use crate::frame::{DeferredDestructionQueue, FrameClock, ResourceToDelete};
use crate::resource::Texture;
use crate::transfer::{record_texture_download, CpuImage, TextureRegion};
use crate::{engine_debug, engine_error};

const SOURCE: &str = "frameline::AsyncTransferQueue";

/// Continuation receiving the downloaded image
pub type AsyncCallback = Box<dyn FnOnce(CpuImage)>;

/// Identifier of a pending download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AsyncTaskId(pub u64);

struct AsyncTextureTask {
    id: AsyncTaskId,
    frame: u64,
    staging: BufferHandle,
    result: CpuImage,
    callback: AsyncCallback,
}

/// FIFO of pending texture downloads
pub struct AsyncTransferQueue {
    tasks: VecDeque<AsyncTextureTask>,
    next_id: u64,
    frames_in_flight: u32,
}

impl AsyncTransferQueue {
    pub fn new(frames_in_flight: u32) -> Self {
        Self {
            tasks: VecDeque::new(),
            next_id: 1,
            frames_in_flight: frames_in_flight.max(1),
        }
    }

    /// Record a download of `region` and queue its resolution
    ///
    /// The result image has the region's width/height and
    /// `min(requested layers, texture layers)` layers.
    pub fn download_async(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stream: CommandStreamHandle,
        texture: &mut Texture,
        region: &TextureRegion,
        frame: u64,
        callback: AsyncCallback,
    ) -> Result<AsyncTaskId> {
        let (staging, result) = record_texture_download(device, stream, texture, region)?;

        let id = AsyncTaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push_back(AsyncTextureTask {
            id,
            frame,
            staging,
            result,
            callback,
        });
        engine_debug!(SOURCE, "Queued download {:?} at frame {}", id, frame);
        Ok(id)
    }

    /// Resolve finished tasks in submission order
    ///
    /// Stops at the first task whose frame may still be in flight, unless
    /// `force_all` is set (the device must then be idle). Returns the number
    /// of callbacks invoked.
    pub fn process(&mut self, device: &mut dyn GraphicsDevice, current_frame: u64, force_all: bool) -> usize {
        let mut resolved = 0;
        while let Some(task) = self.tasks.front() {
            if !force_all && !FrameClock::is_frame_safe(task.frame, current_frame, self.frames_in_flight) {
                break;
            }
            let Some(mut task) = self.tasks.pop_front() else {
                break;
            };

            let read = device
                .invalidate_buffer(task.staging)
                .and_then(|_| device.read_buffer(task.staging, 0, &mut task.result.data));
            if let Err(e) = read {
                engine_error!(SOURCE, "Readback of {:?} failed: {}", task.id, e);
            }
            device.destroy_buffer(task.staging);

            (task.callback)(task.result);
            resolved += 1;
        }
        resolved
    }

    /// Drop a pending task; its callback is never invoked
    ///
    /// The staging buffer may still be written by the device and goes
    /// through the deferred destruction queue. Returns false for unknown
    /// or already resolved ids.
    pub fn cancel(&mut self, id: AsyncTaskId, queue: &mut DeferredDestructionQueue, frame: u64) -> bool {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        if let Some(task) = self.tasks.remove(index) {
            queue.retire(ResourceToDelete::Buffer(task.staging), frame);
            engine_debug!(SOURCE, "Cancelled download {:?}", id);
        }
        true
    }

    /// Number of unresolved tasks
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_pending(&self, id: AsyncTaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }
}

#[cfg(test)]
#[path = "async_transfer_tests.rs"]
mod tests;
