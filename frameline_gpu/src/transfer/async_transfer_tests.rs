use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::device::{
    MockGraphicsDevice, MockObjectKind, SamplerDesc, SubmitMode, TextureDesc, TextureFormat,
};
use crate::resource::DeviceTexture;

struct Fixture {
    device: MockGraphicsDevice,
    deferred: DeferredDestructionQueue,
    queue: AsyncTransferQueue,
    stream: CommandStreamHandle,
    texture: Texture,
}

impl Fixture {
    fn new(desc: TextureDesc) -> Self {
        let mut device = MockGraphicsDevice::new();
        let mut deferred = DeferredDestructionQueue::new(2, false);
        let stream = device.create_command_stream().unwrap();
        device.begin_command_stream(stream).unwrap();

        let mut texture = Texture::new(desc.clone(), SamplerDesc::default());
        let dt = DeviceTexture::create(&mut device, &desc, &SamplerDesc::default()).unwrap();
        texture.replace_device(desc, SamplerDesc::default(), dt, &mut deferred, 0);
        device.fill_image(dt.image, |i| i as u8);

        Self { device, deferred, queue: AsyncTransferQueue::new(2), stream, texture }
    }

    fn submit(&mut self) {
        self.device.end_command_stream(self.stream).unwrap();
        self.device.submit(&[self.stream], SubmitMode::SignalFrame(0)).unwrap();
        self.device.begin_command_stream(self.stream).unwrap();
    }
}

fn recorder() -> (Rc<RefCell<Vec<CpuImage>>>, AsyncCallback) {
    let results = Rc::new(RefCell::new(Vec::new()));
    let sink = results.clone();
    (results, Box::new(move |image: CpuImage| sink.borrow_mut().push(image)))
}

#[test]
fn test_download_resolves_after_two_frames() {
    let mut f = Fixture::new(TextureDesc::tex2d(8, 8, TextureFormat::R8G8B8A8_UNORM));
    let (results, callback) = recorder();

    let region = TextureRegion::rect(0, 0, 4, 4, 1);
    f.queue
        .download_async(&mut f.device, f.stream, &mut f.texture, &region, 5, callback)
        .unwrap();
    f.submit();

    assert_eq!(f.queue.process(&mut f.device, 6, false), 0);
    assert!(results.borrow().is_empty());

    assert_eq!(f.queue.process(&mut f.device, 7, false), 1);
    let results = results.borrow();
    assert_eq!(results.len(), 1);
    assert_eq!((results[0].width, results[0].height, results[0].layers), (4, 4, 1));
    assert_eq!(results[0].data.len(), 4 * 4 * 4);
    // first row of the 8-wide source: bytes 0..16
    assert_eq!(&results[0].data[..16], &(0u8..16).collect::<Vec<_>>()[..]);
}

#[test]
fn test_callback_invoked_exactly_once() {
    let mut f = Fixture::new(TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM));
    let (results, callback) = recorder();
    let region = TextureRegion::full(&f.texture);
    f.queue.download_async(&mut f.device, f.stream, &mut f.texture, &region, 0, callback).unwrap();
    f.submit();

    for frame in 0..10 {
        f.queue.process(&mut f.device, frame, false);
    }
    f.queue.process(&mut f.device, 10, true);
    assert_eq!(results.borrow().len(), 1);
    assert_eq!(f.queue.pending_count(), 0);
}

#[test]
fn test_layers_clamped_to_texture() {
    let mut desc = TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM);
    desc.shape = crate::device::TextureShape::Tex2DArray;
    desc.layers = 2;
    let mut f = Fixture::new(desc);
    let (results, callback) = recorder();

    let region = TextureRegion::rect(0, 0, 4, 4, 6);
    f.queue.download_async(&mut f.device, f.stream, &mut f.texture, &region, 0, callback).unwrap();
    f.submit();
    f.queue.process(&mut f.device, 2, false);

    assert_eq!(results.borrow()[0].layers, 2);
}

#[test]
fn test_resolution_in_submission_order() {
    let mut f = Fixture::new(TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM));
    let order = Rc::new(RefCell::new(Vec::new()));
    let region = TextureRegion::rect(0, 0, 1, 1, 1);

    for (tag, frame) in [(1, 3u64), (2, 3), (3, 4)] {
        let sink = order.clone();
        f.queue
            .download_async(&mut f.device, f.stream, &mut f.texture, &region, frame,
                Box::new(move |_: CpuImage| sink.borrow_mut().push(tag)))
            .unwrap();
    }
    f.submit();

    assert_eq!(f.queue.process(&mut f.device, 5, false), 2);
    assert_eq!(*order.borrow(), vec![1, 2]);
    assert_eq!(f.queue.process(&mut f.device, 6, false), 1);
    assert_eq!(*order.borrow(), vec![1, 2, 3]);
}

#[test]
fn test_cancelled_task_never_calls_back() {
    let mut f = Fixture::new(TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM));
    let (results, callback) = recorder();
    let region = TextureRegion::full(&f.texture);
    let id = f.queue.download_async(&mut f.device, f.stream, &mut f.texture, &region, 0, callback).unwrap();

    assert!(f.queue.cancel(id, &mut f.deferred, 0));
    assert!(!f.queue.cancel(id, &mut f.deferred, 0));
    assert!(!f.queue.is_pending(id));

    f.queue.process(&mut f.device, 100, true);
    assert!(results.borrow().is_empty());
    // staging buffer goes through deferred destruction
    assert_eq!(f.deferred.len(), 1);
    assert_eq!(f.deferred.drain(&mut f.device, 2), 1);
    assert_eq!(f.device.live_count(MockObjectKind::Buffer), 0);
}

#[test]
fn test_staging_destroyed_on_resolution() {
    let mut f = Fixture::new(TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM));
    let (_results, callback) = recorder();
    let region = TextureRegion::full(&f.texture);
    f.queue.download_async(&mut f.device, f.stream, &mut f.texture, &region, 0, callback).unwrap();
    assert_eq!(f.device.live_count(MockObjectKind::Buffer), 1);

    f.submit();
    f.queue.process(&mut f.device, 2, false);
    assert_eq!(f.device.live_count(MockObjectKind::Buffer), 0);
}

#[test]
fn test_invalid_region_queues_nothing() {
    let mut f = Fixture::new(TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM));
    let (_results, callback) = recorder();
    let region = TextureRegion::rect(0, 0, 16, 16, 1);
    assert!(f.queue.download_async(&mut f.device, f.stream, &mut f.texture, &region, 0, callback).is_err());
    assert_eq!(f.queue.pending_count(), 0);
}
