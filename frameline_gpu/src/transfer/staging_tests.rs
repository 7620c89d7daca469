use super::*;
use crate::device::{
    MockGraphicsDevice, SamplerDesc, SubmitMode, TextureDesc, TextureShape,
};
use crate::resource::DeviceTexture;

struct Fixture {
    device: MockGraphicsDevice,
    queue: DeferredDestructionQueue,
    stream: CommandStreamHandle,
}

impl Fixture {
    fn new() -> Self {
        let mut device = MockGraphicsDevice::new();
        let stream = device.create_command_stream().unwrap();
        device.begin_command_stream(stream).unwrap();
        Self { device, queue: DeferredDestructionQueue::new(2, false), stream }
    }

    fn texture(&mut self, desc: TextureDesc) -> Texture {
        let mut texture = Texture::new(desc.clone(), SamplerDesc::default());
        let dt = DeviceTexture::create(&mut self.device, &desc, &SamplerDesc::default()).unwrap();
        texture.replace_device(desc, SamplerDesc::default(), dt, &mut self.queue, 0);
        texture
    }

    fn submit(&mut self) {
        self.device.end_command_stream(self.stream).unwrap();
        self.device.submit(&[self.stream], SubmitMode::WaitIdle).unwrap();
        self.device.begin_command_stream(self.stream).unwrap();
    }
}

fn array_desc(layers: u32) -> TextureDesc {
    let mut desc = TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM);
    desc.shape = TextureShape::Tex2DArray;
    desc.layers = layers;
    desc
}

#[test]
fn test_region_clamps_layers() {
    let mut f = Fixture::new();
    let texture = f.texture(array_desc(2));
    let region = TextureRegion::rect(0, 0, 4, 4, 5).clamp_to(&texture).unwrap();
    assert_eq!(region.layer_count, 2);
}

#[test]
fn test_region_out_of_bounds_fails() {
    let mut f = Fixture::new();
    let texture = f.texture(array_desc(1));
    assert!(TextureRegion::rect(2, 2, 4, 4, 1).clamp_to(&texture).is_err());
    assert!(TextureRegion::rect(0, 0, 0, 4, 1).clamp_to(&texture).is_err());
}

#[test]
fn test_region_offset_near_u32_max_fails() {
    let mut f = Fixture::new();
    let texture = f.texture(array_desc(1));
    let region = TextureRegion {
        offset: [u32::MAX - 1, 0, 0],
        extent: [4, 4, 1],
        ..TextureRegion::rect(0, 0, 4, 4, 1)
    };
    assert!(matches!(region.clamp_to(&texture), Err(Error::InvalidResource(_))));

    let region = TextureRegion { offset: [0, 0, u32::MAX], extent: [4, 4, 1], ..region };
    assert!(region.clamp_to(&texture).is_err());
}

#[test]
fn test_full_region_covers_mip0() {
    let mut f = Fixture::new();
    let texture = f.texture(array_desc(3));
    let region = TextureRegion::full(&texture);
    assert_eq!(region.extent, [4, 4, 1]);
    assert_eq!(region.layer_count, 3);
    assert_eq!(region.byte_size(TextureFormat::R8_UNORM), 48);
}

#[test]
fn test_upload_then_download_roundtrip() {
    let mut f = Fixture::new();
    let mut texture = f.texture(array_desc(1));
    let pixels: Vec<u8> = (0..16).collect();

    let region = TextureRegion::full(&texture);
    record_texture_upload(&mut f.device, f.stream, &mut texture, &region, &pixels, &mut f.queue, 0)
        .unwrap();
    let (staging, mut image) =
        record_texture_download(&mut f.device, f.stream, &mut texture, &TextureRegion::rect(1, 1, 2, 2, 1)).unwrap();
    f.submit();

    f.device.read_buffer(staging, 0, &mut image.data).unwrap();
    assert_eq!(image.data, vec![5, 6, 9, 10]);
    assert_eq!((image.width, image.height, image.layers), (2, 2, 1));
    assert!(texture.is_at_rest());
    // staging of the upload waits in the deferred queue
    assert_eq!(f.queue.len(), 1);
}

#[test]
fn test_upload_with_short_data_fails() {
    let mut f = Fixture::new();
    let mut texture = f.texture(array_desc(1));
    let region = TextureRegion::full(&texture);
    let result = record_texture_upload(
        &mut f.device, f.stream, &mut texture, &region, &[1, 2, 3], &mut f.queue, 0,
    );
    assert!(result.is_err());
    assert!(f.queue.is_empty());
}

#[test]
fn test_upload_without_device_side_fails() {
    let mut f = Fixture::new();
    let mut texture = Texture::new(array_desc(1), SamplerDesc::default());
    let region = TextureRegion::rect(0, 0, 4, 4, 1);
    assert!(record_texture_upload(&mut f.device, f.stream, &mut texture, &region, &[0; 16], &mut f.queue, 0).is_err());
}

#[test]
fn test_mip_generation_records_one_blit_per_level() {
    let mut f = Fixture::new();
    let mut desc = TextureDesc::tex2d(8, 8, TextureFormat::R8G8B8A8_UNORM);
    desc.mip_levels = desc.full_mip_chain();
    let mut texture = f.texture(desc);

    record_mip_generation(&mut f.device, f.stream, &mut texture).unwrap();

    let blits = f.device.recorded_commands(f.stream).iter().filter(|c| *c == "blit_mip").count();
    assert_eq!(blits, 3);
    assert!(texture.is_at_rest());
}

#[test]
fn test_mip_generation_unsupported_format() {
    let mut f = Fixture::new();
    let mut desc = TextureDesc::tex2d(8, 8, TextureFormat::R32G32B32A32_SFLOAT);
    desc.mip_levels = 4;
    f.device.formats_without_linear_blit.push(TextureFormat::R32G32B32A32_SFLOAT);
    let mut texture = f.texture(desc);

    let result = record_mip_generation(&mut f.device, f.stream, &mut texture);
    assert!(matches!(result, Err(Error::Unsupported(_))));
    assert!(f.device.recorded_commands(f.stream).is_empty());
}

#[test]
fn test_cpu_image_layers() {
    let region = TextureRegion::rect(0, 0, 2, 2, 2);
    let mut image = CpuImage::for_region(&region, TextureFormat::R8_UNORM);
    image.data = (0..8).collect();
    assert_eq!(image.layer(1), Some(&[4u8, 5, 6, 7][..]));
    assert_eq!(image.layer(2), None);
}
