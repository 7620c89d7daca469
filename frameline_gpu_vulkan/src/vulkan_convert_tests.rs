//! Unit tests for Vulkan conversion functions
//!
//! Pure mappings, no GPU required.

use super::*;

// ============================================================================
// FORMATS
// ============================================================================

#[test]
fn test_texture_format_to_vk_color_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::R8_UNORM), vk::Format::R8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_UNORM), vk::Format::B8G8R8A8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(
        texture_format_to_vk(TextureFormat::R16G16B16A16_SFLOAT),
        vk::Format::R16G16B16A16_SFLOAT
    );
    assert_eq!(texture_format_to_vk(TextureFormat::R32_SFLOAT), vk::Format::R32_SFLOAT);
}

#[test]
fn test_texture_format_to_vk_depth_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::D16_UNORM), vk::Format::D16_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(texture_format_to_vk(TextureFormat::D24_UNORM_S8_UINT), vk::Format::D24_UNORM_S8_UINT);
}

#[test]
fn test_aspect_masks() {
    assert_eq!(aspect_mask(TextureFormat::R8G8B8A8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
    // copies address one aspect at a time
    assert_eq!(copy_aspect_mask(TextureFormat::D24_UNORM_S8_UINT), vk::ImageAspectFlags::DEPTH);
}

#[test]
fn test_vertex_format_to_vk() {
    assert_eq!(vertex_format_to_vk(VertexFormat::R32G32B32_SFLOAT), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::R32_UINT), vk::Format::R32_UINT);
    assert_eq!(vertex_format_to_vk(VertexFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
}

// ============================================================================
// IMAGES
// ============================================================================

#[test]
fn test_shape_to_image_and_view_types() {
    assert_eq!(image_type_to_vk(TextureShape::Cube), vk::ImageType::TYPE_2D);
    assert_eq!(image_type_to_vk(TextureShape::Tex3D), vk::ImageType::TYPE_3D);
    assert_eq!(image_view_type_to_vk(TextureShape::Tex2DArray), vk::ImageViewType::TYPE_2D_ARRAY);
    assert_eq!(image_view_type_to_vk(TextureShape::CubeArray), vk::ImageViewType::CUBE_ARRAY);
}

#[test]
fn test_texture_usage_to_vk() {
    let usage = TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST;
    assert_eq!(
        texture_usage_to_vk(usage),
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST
    );
}

#[test]
fn test_image_layouts() {
    assert_eq!(image_layout_to_vk(ImageLayout::ShaderReadOnly), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(image_layout_to_vk(ImageLayout::Present), vk::ImageLayout::PRESENT_SRC_KHR);

    let (access, stage) = layout_access(ImageLayout::TransferDst);
    assert_eq!(access, vk::AccessFlags::TRANSFER_WRITE);
    assert_eq!(stage, vk::PipelineStageFlags::TRANSFER);

    let (access, stage) = layout_access(ImageLayout::Undefined);
    assert!(access.is_empty());
    assert_eq!(stage, vk::PipelineStageFlags::TOP_OF_PIPE);
}

#[test]
fn test_load_op_ignores_clear_value() {
    use frameline_gpu::frameline::device::ClearValue;

    let clear = LoadOp::Clear(ClearValue::Color([0.0, 0.0, 0.0, 1.0]));
    assert_eq!(load_op_to_vk(clear), vk::AttachmentLoadOp::CLEAR);
    assert_eq!(load_op_to_vk(LoadOp::Load), vk::AttachmentLoadOp::LOAD);
}

// ============================================================================
// DESCRIPTORS / BUFFERS
// ============================================================================

#[test]
fn test_sampled_image_is_combined_sampler() {
    assert_eq!(
        descriptor_type_to_vk(DescriptorType::SampledImage),
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
    assert_eq!(descriptor_type_to_vk(DescriptorType::StorageImage), vk::DescriptorType::STORAGE_IMAGE);
}

#[test]
fn test_stage_flags_to_vk() {
    let flags = ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT;
    assert_eq!(
        stage_flags_to_vk(flags),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(stage_flags_to_vk(ShaderStageFlags::empty()), vk::ShaderStageFlags::empty());
}

#[test]
fn test_buffer_usage_to_vk() {
    let usage = BufferUsage::VERTEX | BufferUsage::TRANSFER_DST;
    assert_eq!(
        buffer_usage_to_vk(usage),
        vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
    );
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
}

// ============================================================================
// PIPELINE STATE
// ============================================================================

#[test]
fn test_stencil_state_reference_is_dynamic() {
    let state = StencilOpState {
        pass_op: StencilOp::Replace,
        compare_op: CompareOp::Equal,
        ..StencilOpState::default()
    };
    let vk_state = stencil_op_state_to_vk(&state);
    assert_eq!(vk_state.pass_op, vk::StencilOp::REPLACE);
    assert_eq!(vk_state.compare_op, vk::CompareOp::EQUAL);
    assert_eq!(vk_state.compare_mask, 0xFF);
    assert_eq!(vk_state.reference, 0);
}

#[test]
fn test_color_write_mask_to_vk() {
    assert_eq!(
        color_write_mask_to_vk(&ColorWriteMask::ALL),
        vk::ColorComponentFlags::R | vk::ColorComponentFlags::G | vk::ColorComponentFlags::B | vk::ColorComponentFlags::A
    );
    assert!(color_write_mask_to_vk(&ColorWriteMask::NONE).is_empty());
    let rg = ColorWriteMask { r: true, g: true, b: false, a: false };
    assert_eq!(color_write_mask_to_vk(&rg), vk::ColorComponentFlags::R | vk::ColorComponentFlags::G);
}

#[test]
fn test_fixed_function_enums() {
    assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
    assert_eq!(front_face_to_vk(FrontFace::Clockwise), vk::FrontFace::CLOCKWISE);
    assert_eq!(polygon_mode_to_vk(PolygonMode::Line), vk::PolygonMode::LINE);
    assert_eq!(blend_factor_to_vk(BlendFactor::OneMinusSrcAlpha), vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    assert_eq!(blend_op_to_vk(BlendOp::ReverseSubtract), vk::BlendOp::REVERSE_SUBTRACT);
    assert_eq!(sample_count_to_vk(SampleCount::S4), vk::SampleCountFlags::TYPE_4);
    assert_eq!(topology_to_vk(PrimitiveTopology::LineList), vk::PrimitiveTopology::LINE_LIST);
    assert_eq!(input_rate_to_vk(VertexInputRate::Instance), vk::VertexInputRate::INSTANCE);
    assert_eq!(filter_to_vk(Filter::Nearest), vk::Filter::NEAREST);
    assert_eq!(address_mode_to_vk(AddressMode::ClampToEdge), vk::SamplerAddressMode::CLAMP_TO_EDGE);
    assert_eq!(shader_stage_to_vk(ShaderStage::Compute), vk::ShaderStageFlags::COMPUTE);
}
