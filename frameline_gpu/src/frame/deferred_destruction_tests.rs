use super::*;
use crate::device::{BufferDesc, BufferUsage, MemoryLocation, MockGraphicsDevice, MockObjectKind};

fn make_buffer(device: &mut MockGraphicsDevice) -> BufferHandle {
    device
        .create_buffer(&BufferDesc {
            size: 64,
            usage: BufferUsage::VERTEX,
            location: MemoryLocation::GpuOnly,
        })
        .unwrap()
}

#[test]
fn test_retire_at_10_freed_at_12() {
    let mut device = MockGraphicsDevice::new();
    let mut queue = DeferredDestructionQueue::new(2, false);
    let buffer = make_buffer(&mut device);

    queue.retire(ResourceToDelete::Buffer(buffer), 10);

    assert_eq!(queue.drain(&mut device, 11), 0);
    assert_eq!(queue.len(), 1);
    assert!(device.is_live(buffer.0));

    assert_eq!(queue.drain(&mut device, 12), 1);
    assert!(queue.is_empty());
    assert!(!device.is_live(buffer.0));
}

#[test]
fn test_drain_frees_exactly_once() {
    let mut device = MockGraphicsDevice::new();
    let mut queue = DeferredDestructionQueue::new(2, false);
    let buffer = make_buffer(&mut device);
    queue.retire(ResourceToDelete::Buffer(buffer), 3);

    for frame in 3..20 {
        queue.drain(&mut device, frame);
    }
    assert_eq!(device.destroy_count(buffer.0), 1);
    assert_eq!(device.invalid_destroys, 0);
}

#[test]
fn test_drain_stops_at_first_unfinished_entry() {
    let mut device = MockGraphicsDevice::new();
    let mut queue = DeferredDestructionQueue::new(2, false);
    let a = make_buffer(&mut device);
    let b = make_buffer(&mut device);
    let c = make_buffer(&mut device);
    queue.retire(ResourceToDelete::Buffer(a), 1);
    queue.retire(ResourceToDelete::Buffer(b), 2);
    queue.retire(ResourceToDelete::Buffer(c), 5);

    assert_eq!(queue.drain(&mut device, 4), 2);
    assert!(queue.contains(ResourceToDelete::Buffer(c)));
    assert!(device.is_live(c.0));
}

#[test]
fn test_texture_parts_destroyed_in_retirement_order() {
    let mut device = MockGraphicsDevice::new();
    let mut queue = DeferredDestructionQueue::new(2, false);
    let desc = crate::device::TextureDesc::tex2d(2, 2, crate::device::TextureFormat::R8_UNORM);
    let image = device.create_image(&desc).unwrap();
    let view = device.create_image_view(image, &desc).unwrap();

    queue.retire(ResourceToDelete::ImageView(view), 0);
    queue.retire(ResourceToDelete::Image(image), 0);
    queue.drain(&mut device, 2);

    let order: Vec<MockObjectKind> = device.destroyed().iter().map(|(k, _)| *k).collect();
    assert_eq!(order, vec![MockObjectKind::ImageView, MockObjectKind::Image]);
}

#[test]
fn test_null_handles_are_ignored() {
    let mut queue = DeferredDestructionQueue::new(2, false);
    queue.retire(ResourceToDelete::Buffer(BufferHandle::NULL), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_out_of_order_retire_is_restamped() {
    let mut device = MockGraphicsDevice::new();
    let mut queue = DeferredDestructionQueue::new(2, false);
    let a = make_buffer(&mut device);
    let b = make_buffer(&mut device);
    queue.retire(ResourceToDelete::Buffer(a), 8);
    queue.retire(ResourceToDelete::Buffer(b), 5);

    // b was clamped to frame 8, so it is not freed at frame 7
    assert_eq!(queue.drain(&mut device, 7), 0);
    assert_eq!(queue.drain(&mut device, 10), 2);
}

#[test]
#[should_panic(expected = "protocol violation")]
fn test_out_of_order_retire_asserts_when_enabled() {
    let mut queue = DeferredDestructionQueue::new(2, true);
    queue.retire(ResourceToDelete::Buffer(BufferHandle(1)), 8);
    queue.retire(ResourceToDelete::Buffer(BufferHandle(2)), 5);
}

#[test]
fn test_flush_all_ignores_frame_age() {
    let mut device = MockGraphicsDevice::new();
    let mut queue = DeferredDestructionQueue::new(2, false);
    let a = make_buffer(&mut device);
    queue.retire(ResourceToDelete::Buffer(a), 100);

    assert_eq!(queue.flush_all(&mut device), 1);
    assert!(queue.is_empty());
    assert!(!device.is_live(a.0));
}
