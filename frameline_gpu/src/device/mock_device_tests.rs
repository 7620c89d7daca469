/// Unit tests for MockGraphicsDevice.
///
/// The mock is the foundation of every component test, so its bookkeeping
/// (handle tracking, pool capacity, deferred copy execution) is checked here.

use crate::device::mock_device::*;
use crate::device::*;
use crate::error::Error;

fn staging(size: u64, location: MemoryLocation) -> BufferDesc {
    BufferDesc {
        size,
        usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
        location,
    }
}

// ============================================================================
// Handle tracking
// ============================================================================

#[test]
fn test_handles_are_unique_and_non_null() {
    let mut device = MockGraphicsDevice::new();
    let a = device.create_sampler(&SamplerDesc::default()).unwrap();
    let b = device.create_sampler(&SamplerDesc::default()).unwrap();
    assert!(!a.is_null());
    assert!(!b.is_null());
    assert_ne!(a, b);
    assert_eq!(device.live_count(MockObjectKind::Sampler), 2);
}

#[test]
fn test_destroy_releases_handle() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&TextureDesc::tex2d(4, 4, TextureFormat::R8G8B8A8_UNORM)).unwrap();
    assert!(device.is_live(image.0));

    device.destroy_image(image);
    assert!(!device.is_live(image.0));
    assert_eq!(device.destroy_count(image.0), 1);
    assert_eq!(device.invalid_destroys, 0);
}

#[test]
fn test_double_destroy_is_counted() {
    let mut device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(&staging(16, MemoryLocation::CpuToGpu)).unwrap();
    device.destroy_buffer(buffer);
    device.destroy_buffer(buffer);
    assert_eq!(device.destroy_count(buffer.0), 1);
    assert_eq!(device.invalid_destroys, 1);
}

#[test]
fn test_destroy_with_wrong_kind_is_invalid() {
    let mut device = MockGraphicsDevice::new();
    let sampler = device.create_sampler(&SamplerDesc::default()).unwrap();
    device.destroy_buffer(BufferHandle(sampler.0));
    assert!(device.is_live(sampler.0));
    assert_eq!(device.invalid_destroys, 1);
}

#[test]
fn test_zero_sized_image_is_rejected() {
    let mut device = MockGraphicsDevice::new();
    let result = device.create_image(&TextureDesc::tex2d(0, 4, TextureFormat::R8_UNORM));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

// ============================================================================
// Buffers
// ============================================================================

#[test]
fn test_buffer_write_then_read() {
    let mut device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(&staging(8, MemoryLocation::CpuToGpu)).unwrap();
    device.write_buffer(buffer, 2, &[1, 2, 3]).unwrap();

    let mut out = [0u8; 8];
    device.read_buffer(buffer, 0, &mut out).unwrap();
    assert_eq!(out, [0, 0, 1, 2, 3, 0, 0, 0]);
}

#[test]
fn test_buffer_write_overflow_fails() {
    let mut device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(&staging(4, MemoryLocation::CpuToGpu)).unwrap();
    assert!(device.write_buffer(buffer, 2, &[1, 2, 3]).is_err());
}

#[test]
fn test_gpu_only_buffer_is_not_mappable() {
    let mut device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(&staging(4, MemoryLocation::GpuOnly)).unwrap();
    assert!(device.write_buffer(buffer, 0, &[1]).is_err());
}

#[test]
fn test_buffer_creation_failure_injection() {
    let mut device = MockGraphicsDevice::new();
    device.fail_buffer_creation = true;
    assert_eq!(device.create_buffer(&staging(4, MemoryLocation::CpuToGpu)), Err(Error::OutOfMemory));
}

// ============================================================================
// Descriptor pools
// ============================================================================

fn pool_desc(max_sets: u32) -> DescriptorPoolDesc {
    DescriptorPoolDesc {
        max_sets,
        sizes: vec![(DescriptorType::UniformBuffer, max_sets)],
        update_after_bind: false,
    }
}

#[test]
fn test_pool_exhaustion_returns_out_of_pool_memory() {
    let mut device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc::default()).unwrap();
    let pool = device.create_descriptor_pool(&pool_desc(2)).unwrap();

    assert!(device.allocate_descriptor_set(pool, layout, 0).is_ok());
    assert!(device.allocate_descriptor_set(pool, layout, 0).is_ok());
    assert_eq!(device.allocate_descriptor_set(pool, layout, 0), Err(Error::OutOfPoolMemory));
    assert_eq!(device.pool_allocated(pool), Some(2));
}

#[test]
fn test_pool_reset_restores_capacity() {
    let mut device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc::default()).unwrap();
    let pool = device.create_descriptor_pool(&pool_desc(1)).unwrap();
    device.allocate_descriptor_set(pool, layout, 0).unwrap();

    device.reset_descriptor_pool(pool).unwrap();
    assert_eq!(device.pool_allocated(pool), Some(0));
    assert!(device.allocate_descriptor_set(pool, layout, 0).is_ok());
}

#[test]
fn test_descriptor_writes_replace_same_slot() {
    let mut device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc::default()).unwrap();
    let pool = device.create_descriptor_pool(&pool_desc(1)).unwrap();
    let set = device.allocate_descriptor_set(pool, layout, 0).unwrap();

    let write = |view: u64| DescriptorWrite {
        binding: 0,
        array_element: 3,
        resource: DescriptorResource::StorageImage { view: ImageViewHandle(view) },
    };
    device.write_descriptor_set(set, &[write(10)]);
    device.write_descriptor_set(set, &[write(11)]);

    let writes = device.descriptor_writes(set);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], write(11));
}

// ============================================================================
// Command streams
// ============================================================================

#[test]
fn test_recording_is_tracked_by_name() {
    let mut device = MockGraphicsDevice::new();
    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    device.cmd_dispatch(stream, 1, 1, 1);
    device.cmd_draw(stream, 3, 1, 0, 0);
    assert_eq!(device.recorded_commands(stream), vec!["dispatch", "draw"]);
}

#[test]
fn test_begin_twice_fails() {
    let mut device = MockGraphicsDevice::new();
    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    assert!(device.begin_command_stream(stream).is_err());
}

#[test]
fn test_submit_while_recording_fails() {
    let mut device = MockGraphicsDevice::new();
    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    assert!(device.submit(&[stream], SubmitMode::WaitIdle).is_err());
}

#[test]
fn test_copies_execute_at_submit() {
    let mut device = MockGraphicsDevice::new();
    let desc = TextureDesc::tex2d(2, 2, TextureFormat::R8_UNORM);
    let image = device.create_image(&desc).unwrap();
    let upload = device.create_buffer(&staging(4, MemoryLocation::CpuToGpu)).unwrap();
    let readback = device.create_buffer(&staging(4, MemoryLocation::GpuToCpu)).unwrap();
    device.write_buffer(upload, 0, &[1, 2, 3, 4]).unwrap();

    let region = BufferImageCopy {
        buffer_offset: 0,
        mip_level: 0,
        base_layer: 0,
        layer_count: 1,
        offset: [0, 0, 0],
        extent: [2, 2, 1],
    };
    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    device.cmd_copy_buffer_to_image(stream, upload, image, desc.format, &region);
    device.cmd_copy_image_to_buffer(stream, image, desc.format, readback, &region);
    device.end_command_stream(stream).unwrap();

    // nothing happens before submission
    assert_eq!(device.image_data(image), Some(&[0u8, 0, 0, 0][..]));

    device.submit(&[stream], SubmitMode::WaitIdle).unwrap();
    assert_eq!(device.image_data(image), Some(&[1u8, 2, 3, 4][..]));
    assert_eq!(device.buffer_data(readback), Some(&[1u8, 2, 3, 4][..]));
    assert_eq!(device.executed_commands(), &["copy_buffer_to_image", "copy_image_to_buffer"]);
    assert_eq!(device.submissions().len(), 1);
}

#[test]
fn test_sub_region_readback() {
    let mut device = MockGraphicsDevice::new();
    let desc = TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM);
    let image = device.create_image(&desc).unwrap();
    device.fill_image(image, |i| i as u8);
    let readback = device.create_buffer(&staging(4, MemoryLocation::GpuToCpu)).unwrap();

    let region = BufferImageCopy {
        buffer_offset: 0,
        mip_level: 0,
        base_layer: 0,
        layer_count: 1,
        offset: [1, 2, 0],
        extent: [2, 2, 1],
    };
    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    device.cmd_copy_image_to_buffer(stream, image, desc.format, readback, &region);
    device.end_command_stream(stream).unwrap();
    device.submit(&[stream], SubmitMode::WaitIdle).unwrap();

    // rows 2 and 3, columns 1..3 of a 4-wide image
    assert_eq!(device.buffer_data(readback), Some(&[9u8, 10, 13, 14][..]));
}

#[test]
fn test_buffer_to_buffer_copy() {
    let mut device = MockGraphicsDevice::new();
    let src = device.create_buffer(&staging(4, MemoryLocation::CpuToGpu)).unwrap();
    let dst = device.create_buffer(&staging(8, MemoryLocation::GpuToCpu)).unwrap();
    device.write_buffer(src, 0, &[5, 6, 7, 8]).unwrap();

    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    device.cmd_copy_buffer(stream, src, dst, 1, 4, 3);
    device.end_command_stream(stream).unwrap();
    device.submit(&[stream], SubmitMode::SignalFrame(0)).unwrap();

    assert_eq!(device.buffer_data(dst), Some(&[0u8, 0, 0, 0, 6, 7, 8, 0][..]));
    assert_eq!(device.submissions()[0].1, SubmitMode::SignalFrame(0));
}

#[test]
fn test_linear_blit_support() {
    let mut device = MockGraphicsDevice::new();
    assert!(device.supports_linear_blit(TextureFormat::R8G8B8A8_UNORM));
    assert!(!device.supports_linear_blit(TextureFormat::D32_FLOAT));

    device.formats_without_linear_blit.push(TextureFormat::R32G32B32A32_SFLOAT);
    assert!(!device.supports_linear_blit(TextureFormat::R32G32B32A32_SFLOAT));
}

#[test]
fn test_waits_are_recorded() {
    let mut device = MockGraphicsDevice::new();
    device.wait_frame(1).unwrap();
    device.wait_frame(0).unwrap();
    device.wait_idle().unwrap();
    assert_eq!(device.frame_waits(), &[1, 0]);
    assert_eq!(device.wait_idle_count, 1);
}

// ============================================================================
// Layout tracking
// ============================================================================

fn barrier(image: ImageHandle, old_layout: ImageLayout, new_layout: ImageLayout) -> ImageBarrier {
    ImageBarrier {
        image,
        format: TextureFormat::R8G8B8A8_UNORM,
        old_layout,
        new_layout,
        base_mip: 0,
        mip_count: 1,
        base_layer: 0,
        layer_count: 1,
    }
}

#[test]
fn test_barriers_track_layout_at_execution() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&TextureDesc::tex2d(2, 2, TextureFormat::R8G8B8A8_UNORM)).unwrap();
    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    device.cmd_image_barrier(stream, &barrier(image, ImageLayout::Undefined, ImageLayout::TransferDst));
    device.cmd_image_barrier(stream, &barrier(image, ImageLayout::TransferDst, ImageLayout::ShaderReadOnly));
    device.end_command_stream(stream).unwrap();

    // recording alone does not move the image
    assert_eq!(device.image_layout(image, 0), Some(ImageLayout::Undefined));
    device.submit(&[stream], SubmitMode::WaitIdle).unwrap();
    assert_eq!(device.image_layout(image, 0), Some(ImageLayout::ShaderReadOnly));
    assert!(device.layout_errors().is_empty());
}

#[test]
fn test_mismatched_and_discarding_barriers_are_reported() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&TextureDesc::tex2d(2, 2, TextureFormat::R8G8B8A8_UNORM)).unwrap();
    let stream = device.create_command_stream().unwrap();
    device.begin_command_stream(stream).unwrap();
    device.cmd_image_barrier(stream, &barrier(image, ImageLayout::ShaderReadOnly, ImageLayout::TransferDst));
    device.cmd_image_barrier(stream, &barrier(image, ImageLayout::Undefined, ImageLayout::ColorAttachment));
    device.end_command_stream(stream).unwrap();
    device.submit(&[stream], SubmitMode::WaitIdle).unwrap();

    let errors = device.layout_errors();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("but image is in Undefined"));
    assert!(errors[1].contains("discards contents"));
}
