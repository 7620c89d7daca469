use super::*;
use crate::device::{
    MockGraphicsDevice, MockObjectKind, TextureFormat, TextureShape, TextureUsage,
};

fn sampled_desc() -> TextureDesc {
    TextureDesc::tex2d(8, 8, TextureFormat::R8G8B8A8_UNORM)
}

#[test]
fn test_new_texture_has_no_device_side() {
    let texture = Texture::new(sampled_desc(), SamplerDesc::default());
    assert!(!texture.is_ready());
    assert_eq!(texture.current_layout(), ImageLayout::Undefined);
    assert_eq!(texture.resting_layout(), ImageLayout::ShaderReadOnly);
}

#[test]
fn test_resting_layout_follows_usage() {
    let mut desc = sampled_desc();
    desc.usage = TextureUsage::STORAGE | TextureUsage::SAMPLED;
    assert_eq!(Texture::new(desc, SamplerDesc::default()).resting_layout(), ImageLayout::General);

    let mut depth = TextureDesc::tex2d(8, 8, TextureFormat::D32_FLOAT);
    depth.usage = TextureUsage::DEPTH_STENCIL_ATTACHMENT;
    assert_eq!(
        Texture::new(depth, SamplerDesc::default()).resting_layout(),
        ImageLayout::DepthStencilAttachment
    );
}

#[test]
fn test_layer_count_for_cube_array() {
    let mut desc = sampled_desc();
    desc.shape = TextureShape::CubeArray;
    desc.layers = 2;
    assert_eq!(Texture::new(desc, SamplerDesc::default()).layer_count(), 12);
}

#[test]
fn test_device_texture_create_and_replace() {
    let mut device = MockGraphicsDevice::new();
    let mut queue = DeferredDestructionQueue::new(2, false);
    let mut texture = Texture::new(sampled_desc(), SamplerDesc::default());

    let first = DeviceTexture::create(&mut device, &sampled_desc(), &SamplerDesc::default()).unwrap();
    texture.replace_device(sampled_desc(), SamplerDesc::default(), first, &mut queue, 0);
    assert!(texture.is_ready());
    assert!(queue.is_empty());

    let bigger = TextureDesc::tex2d(16, 16, TextureFormat::R8G8B8A8_UNORM);
    let second = DeviceTexture::create(&mut device, &bigger, &SamplerDesc::default()).unwrap();
    texture.replace_device(bigger, SamplerDesc::default(), second, &mut queue, 4);

    assert_eq!(texture.desc().width, 16);
    assert_eq!(queue.len(), 3);
    assert!(queue.contains(ResourceToDelete::Image(first.image)));
    // old objects are still alive until the queue drains
    assert!(device.is_live(first.image.0));
}

#[test]
fn test_failed_view_creation_cleans_up_image() {
    let mut device = MockGraphicsDevice::new();
    let bad = TextureDesc::tex2d(0, 8, TextureFormat::R8_UNORM);
    assert!(DeviceTexture::create(&mut device, &bad, &SamplerDesc::default()).is_err());
    assert_eq!(device.live_count(MockObjectKind::Image), 0);
}

#[test]
fn test_transition_records_single_barrier() {
    let mut device = MockGraphicsDevice::new();
    let mut queue = DeferredDestructionQueue::new(2, false);
    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();

    let mut texture = Texture::new(sampled_desc(), SamplerDesc::default());
    let dt = DeviceTexture::create(&mut device, &sampled_desc(), &SamplerDesc::default()).unwrap();
    texture.replace_device(sampled_desc(), SamplerDesc::default(), dt, &mut queue, 0);

    texture.transition(&mut device, stream, ImageLayout::TransferDst);
    texture.transition(&mut device, stream, ImageLayout::TransferDst);
    assert!(!texture.is_at_rest());
    texture.restore(&mut device, stream);

    assert!(texture.is_at_rest());
    assert_eq!(device.recorded_commands(stream), vec!["image_barrier", "image_barrier"]);
}

#[test]
fn test_external_texture_is_never_retired() {
    let mut queue = DeferredDestructionQueue::new(2, false);
    let mut texture = Texture::external(
        TextureDesc::tex2d(640, 480, TextureFormat::B8G8R8A8_SRGB),
        ImageHandle(77),
        ImageViewHandle(78),
        ImageLayout::Present,
    );
    assert!(texture.is_external());
    assert!(texture.is_at_rest());

    texture.retire(&mut queue, 1);
    assert!(queue.is_empty());
    assert!(!texture.is_ready());
}
