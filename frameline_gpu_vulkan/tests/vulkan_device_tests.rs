//! Tests for the Vulkan GraphicsDevice backend
//!
//! Every test needs a Vulkan 1.3 capable GPU and is marked with #[ignore].
//!
//! Run with: cargo test -p frameline_gpu_vulkan --test vulkan_device_tests -- --ignored

use frameline_gpu::frameline::device::{
    BufferDesc, BufferUsage, DescriptorBindingDesc, DescriptorPoolDesc, DescriptorSetLayoutDesc,
    DescriptorType, GraphicsDevice, MemoryLocation, SamplerDesc, ShaderStageFlags, SubmitMode,
    TextureDesc, TextureFormat,
};
use frameline_gpu::frameline::transfer::TextureRegion;
use frameline_gpu::frameline::{Error, RenderConfig, RenderContext};
use frameline_gpu_vulkan::{VulkanConfig, VulkanGraphicsDevice};
use serial_test::serial;

fn create_device() -> VulkanGraphicsDevice {
    let config = VulkanConfig {
        app_name: "frameline vulkan tests".to_string(),
        enable_validation: false,
        ..VulkanConfig::default()
    };
    VulkanGraphicsDevice::new(&config).unwrap()
}

// ============================================================================
// DEVICE OBJECTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_device_reports_adapter_name() {
    let device = create_device();
    assert!(!device.name().is_empty());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_buffer_write_read_round_trip() {
    let mut device = create_device();
    let buffer = device
        .create_buffer(&BufferDesc {
            size: 64,
            usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
            location: MemoryLocation::CpuToGpu,
        })
        .unwrap();

    let data: Vec<u8> = (0..16).collect();
    device.write_buffer(buffer, 8, &data).unwrap();

    let mut out = vec![0u8; 16];
    device.read_buffer(buffer, 8, &mut out).unwrap();
    assert_eq!(out, data);

    // writes past the end are rejected
    assert!(device.write_buffer(buffer, 60, &data).is_err());

    device.destroy_buffer(buffer);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_gpu_copy_between_buffers() {
    let mut device = create_device();
    let desc = BufferDesc {
        size: 32,
        usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
        location: MemoryLocation::CpuToGpu,
    };
    let src = device.create_buffer(&desc).unwrap();
    let dst = device
        .create_buffer(&BufferDesc { location: MemoryLocation::GpuToCpu, ..desc })
        .unwrap();
    device.write_buffer(src, 0, &[7u8; 32]).unwrap();

    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    device.cmd_copy_buffer(stream, src, dst, 0, 0, 32);
    device.end_command_stream(stream).unwrap();
    device.submit(&[stream], SubmitMode::WaitIdle).unwrap();

    let mut out = [0u8; 32];
    device.invalidate_buffer(dst).unwrap();
    device.read_buffer(dst, 0, &mut out).unwrap();
    assert_eq!(out, [7u8; 32]);

    device.destroy_command_stream(stream);
    device.destroy_buffer(src);
    device.destroy_buffer(dst);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_texture_and_sampler() {
    let mut device = create_device();
    let desc = TextureDesc::tex2d(64, 64, TextureFormat::R8G8B8A8_UNORM);
    let image = device.create_image(&desc).unwrap();
    let view = device.create_image_view(image, &desc).unwrap();
    let sampler = device.create_sampler(&SamplerDesc::default()).unwrap();

    assert!(!image.is_null());
    assert!(!view.is_null());
    assert!(device.supports_linear_blit(TextureFormat::R8G8B8A8_UNORM));

    device.destroy_sampler(sampler);
    device.destroy_image_view(view);
    device.destroy_image(image);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_descriptor_pool_exhaustion() {
    let mut device = create_device();
    let layout = device
        .create_descriptor_set_layout(&DescriptorSetLayoutDesc {
            bindings: vec![DescriptorBindingDesc {
                binding: 0,
                descriptor_type: DescriptorType::UniformBuffer,
                count: 1,
                stages: ShaderStageFlags::VERTEX,
                variable_count: false,
            }],
            update_after_bind: false,
        })
        .unwrap();
    let pool = device
        .create_descriptor_pool(&DescriptorPoolDesc {
            max_sets: 2,
            sizes: vec![(DescriptorType::UniformBuffer, 2)],
            update_after_bind: false,
        })
        .unwrap();

    assert!(device.allocate_descriptor_set(pool, layout, 0).is_ok());
    assert!(device.allocate_descriptor_set(pool, layout, 0).is_ok());
    assert_eq!(device.allocate_descriptor_set(pool, layout, 0), Err(Error::OutOfPoolMemory));

    device.reset_descriptor_pool(pool).unwrap();
    assert!(device.allocate_descriptor_set(pool, layout, 0).is_ok());

    device.destroy_descriptor_pool(pool);
    device.destroy_descriptor_set_layout(layout);
}

// ============================================================================
// RENDER CONTEXT OVER VULKAN
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_context_frames_and_texture_readback() {
    let mut context = RenderContext::new(create_device(), RenderConfig::default()).unwrap();

    let key = context.create_texture(
        TextureDesc::tex2d(4, 4, TextureFormat::R8G8B8A8_UNORM),
        SamplerDesc::default(),
    );
    let pixels: Vec<u8> = (0..64).collect();
    let region = TextureRegion::rect(0, 0, 4, 4, 1);
    assert!(context.upload_texture(key, &region, &pixels));

    for _ in 0..4 {
        context.next_frame().unwrap();
    }

    let image = context.download_texture_sync(key, &region).unwrap();
    assert_eq!(image.data, pixels);

    context.cleanup();
}
