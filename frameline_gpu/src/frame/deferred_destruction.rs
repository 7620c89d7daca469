/// Deferred destruction of device objects
///
/// Objects dropped by the CPU may still be referenced by command streams the
/// device has not executed yet. They are queued here with the frame they
/// were retired on and physically destroyed once that frame is provably
/// finished.

use std::collections::VecDeque;

use crate::device::{BufferHandle, GraphicsDevice, ImageHandle, ImageViewHandle, SamplerHandle};
use crate::frame::FrameClock;
use crate::{engine_protocol_violation, engine_trace};

const SOURCE: &str = "frameline::DeferredDestructionQueue";

/// Device object awaiting destruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceToDelete {
    ImageView(ImageViewHandle),
    Sampler(SamplerHandle),
    Image(ImageHandle),
    Buffer(BufferHandle),
}

impl ResourceToDelete {
    fn destroy(self, device: &mut dyn GraphicsDevice) {
        match self {
            ResourceToDelete::ImageView(view) => device.destroy_image_view(view),
            ResourceToDelete::Sampler(sampler) => device.destroy_sampler(sampler),
            ResourceToDelete::Image(image) => device.destroy_image(image),
            ResourceToDelete::Buffer(buffer) => device.destroy_buffer(buffer),
        }
    }

    fn is_null(&self) -> bool {
        match self {
            ResourceToDelete::ImageView(h) => h.is_null(),
            ResourceToDelete::Sampler(h) => h.is_null(),
            ResourceToDelete::Image(h) => h.is_null(),
            ResourceToDelete::Buffer(h) => h.is_null(),
        }
    }
}

/// FIFO of retired device objects, ordered by retirement frame
///
/// Entries must be pushed in non-decreasing frame order: draining stops at
/// the first entry that is still in flight, so an older entry queued behind a
/// newer one would be held back. Out-of-order retirement is reported and
/// the entry is re-stamped with the newest frame seen.
pub struct DeferredDestructionQueue {
    entries: VecDeque<(ResourceToDelete, u64)>,
    frames_in_flight: u32,
    last_frame: u64,
    assert_on_violation: bool,
}

impl DeferredDestructionQueue {
    pub fn new(frames_in_flight: u32, assert_on_violation: bool) -> Self {
        Self {
            entries: VecDeque::new(),
            frames_in_flight: frames_in_flight.max(1),
            last_frame: 0,
            assert_on_violation,
        }
    }

    /// Queue `resource` for destruction, retired on `frame`
    pub fn retire(&mut self, resource: ResourceToDelete, frame: u64) {
        if resource.is_null() {
            return;
        }

        let mut frame = frame;
        if frame < self.last_frame {
            engine_protocol_violation!(
                self.assert_on_violation,
                SOURCE,
                "{:?} retired on frame {} after an entry of frame {}",
                resource,
                frame,
                self.last_frame
            );
            frame = self.last_frame;
        }
        self.last_frame = frame;
        self.entries.push_back((resource, frame));
    }

    /// Destroy every entry that is finished at `current_frame`
    ///
    /// Returns the number of destroyed objects.
    pub fn drain(&mut self, device: &mut dyn GraphicsDevice, current_frame: u64) -> usize {
        let mut destroyed = 0;
        while let Some((_, frame)) = self.entries.front() {
            if !FrameClock::is_frame_safe(*frame, current_frame, self.frames_in_flight) {
                break;
            }
            if let Some((resource, _)) = self.entries.pop_front() {
                resource.destroy(device);
                destroyed += 1;
            }
        }
        if destroyed > 0 {
            engine_trace!(SOURCE, "Destroyed {} retired objects at frame {}", destroyed, current_frame);
        }
        destroyed
    }

    /// Destroy everything regardless of age
    ///
    /// The caller must have waited for the device to go idle.
    pub fn flush_all(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        let destroyed = self.entries.len();
        for (resource, _) in self.entries.drain(..) {
            resource.destroy(device);
        }
        destroyed
    }

    /// Number of objects awaiting destruction
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `resource` is still queued
    pub fn contains(&self, resource: ResourceToDelete) -> bool {
        self.entries.iter().any(|(r, _)| *r == resource)
    }
}

#[cfg(test)]
#[path = "deferred_destruction_tests.rs"]
mod tests;
