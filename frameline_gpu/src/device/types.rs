/// Formats, usage flags, resource descriptors and command parameters
/// shared by the `GraphicsDevice` trait and its callers.

use bitflags::bitflags;
use crate::device::{
    BufferHandle, ImageHandle, ImageViewHandle, SamplerHandle,
};

// ===== TEXTURE FORMAT =====

/// Texture pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Size in bytes of one texel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8_UNORM => 1,
            TextureFormat::D16_UNORM => 2,
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::R32_SFLOAT
            | TextureFormat::D32_FLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 4,
            TextureFormat::R16G16B16A16_SFLOAT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }

    /// Whether this is a depth (or depth/stencil) format
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM | TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    /// Whether this format carries a stencil aspect
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT)
    }
}

// ===== TEXTURE SHAPE =====

bitflags! {
    /// Bit composition of a texture shape
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShapeBits: u32 {
        const DIM_1D = 0x01;
        const DIM_2D = 0x02;
        const DIM_3D = 0x04;
        const CUBE = 0x08;
        const ARRAY = 0x10;
    }
}

/// Texture shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureShape {
    Tex1D,
    Tex2D,
    Tex2DArray,
    Cube,
    CubeArray,
    Tex3D,
}

impl TextureShape {
    /// Bit composition of this shape
    pub fn bits(self) -> ShapeBits {
        match self {
            TextureShape::Tex1D => ShapeBits::DIM_1D,
            TextureShape::Tex2D => ShapeBits::DIM_2D,
            TextureShape::Tex2DArray => ShapeBits::DIM_2D | ShapeBits::ARRAY,
            TextureShape::Cube => ShapeBits::DIM_2D | ShapeBits::CUBE,
            TextureShape::CubeArray => ShapeBits::DIM_2D | ShapeBits::CUBE | ShapeBits::ARRAY,
            TextureShape::Tex3D => ShapeBits::DIM_3D,
        }
    }
}

/// Whether the shape is an array shape (2D array, cube array)
pub fn is_array(shape: TextureShape) -> bool {
    shape.bits().contains(ShapeBits::ARRAY)
}

/// Whether the shape is a cube shape (cube, cube array)
pub fn is_cube(shape: TextureShape) -> bool {
    shape.bits().contains(ShapeBits::CUBE)
}

/// Whether the shape is a volume texture
pub fn is_3d(shape: TextureShape) -> bool {
    shape.bits().contains(ShapeBits::DIM_3D)
}

/// Number of image layers backing `layers` elements of `shape`
///
/// Cubes use six layers per element; non-array shapes always have one element.
pub fn image_layer_count(shape: TextureShape, layers: u32) -> u32 {
    let elements = if is_array(shape) { layers.max(1) } else { 1 };
    if is_cube(shape) { elements * 6 } else { elements }
}

// ===== TEXTURE USAGE / LAYOUT =====

bitflags! {
    /// How a texture may be used by the device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 0x01;
        const STORAGE = 0x02;
        const COLOR_ATTACHMENT = 0x04;
        const DEPTH_STENCIL_ATTACHMENT = 0x08;
        const TRANSFER_SRC = 0x10;
        const TRANSFER_DST = 0x20;
    }
}

/// Image layout as tracked by this layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ShaderReadOnly,
    ColorAttachment,
    DepthStencilAttachment,
    TransferSrc,
    TransferDst,
    Present,
}

impl ImageLayout {
    /// Layout a texture with `usage` returns to between operations
    pub fn resting_for(usage: TextureUsage, format: TextureFormat) -> Self {
        if usage.contains(TextureUsage::STORAGE) {
            ImageLayout::General
        } else if usage.contains(TextureUsage::SAMPLED) {
            ImageLayout::ShaderReadOnly
        } else if format.is_depth() {
            ImageLayout::DepthStencilAttachment
        } else if usage.contains(TextureUsage::COLOR_ATTACHMENT) {
            ImageLayout::ColorAttachment
        } else {
            ImageLayout::General
        }
    }

    /// Transfer layouts only exist for the duration of one recorded operation
    pub fn is_transient(&self) -> bool {
        matches!(self, ImageLayout::TransferSrc | ImageLayout::TransferDst | ImageLayout::Undefined)
    }
}

/// CPU-side texture descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    /// Depth in texels (3D textures only, 1 otherwise)
    pub depth: u32,
    /// Array elements (cubes for cube arrays)
    pub layers: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub shape: TextureShape,
    pub usage: TextureUsage,
}

impl TextureDesc {
    /// Simple sampled 2D texture
    pub fn tex2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            depth: 1,
            layers: 1,
            mip_levels: 1,
            format,
            shape: TextureShape::Tex2D,
            usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST | TextureUsage::TRANSFER_SRC,
        }
    }

    /// Number of device image layers
    pub fn image_layers(&self) -> u32 {
        image_layer_count(self.shape, self.layers)
    }

    /// Full mip chain length for the texture extent
    pub fn full_mip_chain(&self) -> u32 {
        let largest = self.width.max(self.height).max(self.depth).max(1);
        32 - largest.leading_zeros()
    }

    /// Extent of a mip level
    pub fn mip_extent(&self, level: u32) -> (u32, u32, u32) {
        (
            (self.width >> level).max(1),
            (self.height >> level).max(1),
            (self.depth >> level).max(1),
        )
    }

    /// Byte size of a tightly packed `width x height x depth` region over `layers` layers
    pub fn region_size(&self, width: u32, height: u32, depth: u32, layers: u32) -> u64 {
        width as u64 * height as u64 * depth as u64 * layers as u64 * self.format.bytes_per_pixel() as u64
    }
}

// ===== SAMPLER =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

/// Sampler descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub address_mode: AddressMode,
    pub mipmaps: bool,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter: Filter::Linear,
            address_mode: AddressMode::Repeat,
            mipmaps: true,
        }
    }
}

// ===== BUFFER =====

bitflags! {
    /// How a buffer may be used by the device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 0x01;
        const INDEX = 0x02;
        const UNIFORM = 0x04;
        const STORAGE = 0x08;
        const INDIRECT = 0x10;
        const TRANSFER_SRC = 0x20;
        const TRANSFER_DST = 0x40;
    }
}

/// Where buffer memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Device-local, not CPU-visible
    GpuOnly,
    /// CPU-writable staging / streaming memory
    CpuToGpu,
    /// CPU-readable readback memory
    GpuToCpu,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

// ===== SHADERS & DESCRIPTORS =====

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

bitflags! {
    /// Shader stage visibility flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0x01;
        const FRAGMENT = 0x02;
        const COMPUTE = 0x04;
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => ShaderStageFlags::COMPUTE,
        }
    }
}

/// Type of resource bound at a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    /// Combined image + sampler
    SampledImage,
    StorageImage,
}

/// One binding slot of a descriptor-set layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorBindingDesc {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub count: u32,
    pub stages: ShaderStageFlags,
    /// Runtime-sized array (bindless); only valid on the last binding
    pub variable_count: bool,
}

/// Descriptor-set layout blueprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DescriptorSetLayoutDesc {
    pub bindings: Vec<DescriptorBindingDesc>,
    /// Layout may be written while bound (bindless table)
    pub update_after_bind: bool,
}

/// Pipeline layout blueprint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineLayoutDesc {
    pub set_layouts: Vec<crate::device::DescriptorSetLayoutHandle>,
    pub push_constant_size: u32,
    pub push_constant_stages: ShaderStageFlags,
}

/// Descriptor pool blueprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPoolDesc {
    pub max_sets: u32,
    pub sizes: Vec<(DescriptorType, u32)>,
    pub update_after_bind: bool,
}

/// Resource written into a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescriptorResource {
    UniformBuffer { buffer: BufferHandle, offset: u64, range: u64 },
    StorageBuffer { buffer: BufferHandle, offset: u64, range: u64 },
    SampledImage { view: ImageViewHandle, sampler: SamplerHandle },
    StorageImage { view: ImageViewHandle },
}

/// One descriptor write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub array_element: u32,
    pub resource: DescriptorResource,
}

// ===== COMMAND PARAMETERS =====

/// Buffer <-> image copy region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferImageCopy {
    /// Byte offset into the buffer (data tightly packed)
    pub buffer_offset: u64,
    pub mip_level: u32,
    pub base_layer: u32,
    pub layer_count: u32,
    /// Texel offset (x, y, z)
    pub offset: [u32; 3],
    /// Texel extent (width, height, depth)
    pub extent: [u32; 3],
}

/// Layout transition of a subresource range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub format: TextureFormat,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

/// Linear-filtered downsample from one mip level to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipBlit {
    pub image: ImageHandle,
    pub src_level: u32,
    pub src_extent: (u32, u32, u32),
    pub dst_extent: (u32, u32, u32),
    pub base_layer: u32,
    pub layer_count: u32,
}

/// Attachment load behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    Load,
    Clear(ClearValue),
    DontCare,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// One attachment of a dynamic rendering scope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderingAttachment {
    pub view: ImageViewHandle,
    pub format: TextureFormat,
    pub load: LoadOp,
}

/// Begin-rendering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingInfo {
    pub color_attachments: Vec<RenderingAttachment>,
    pub depth_attachment: Option<RenderingAttachment>,
    pub width: u32,
    pub height: u32,
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Pipeline bind point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindPoint {
    Graphics,
    Compute,
}

/// Synchronization requested for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Block until the device has finished the submitted work
    WaitIdle,
    /// Signal the fence of the given frame slot on completion
    SignalFrame(usize),
}

/// Indirect draw parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectDraw {
    pub buffer: BufferHandle,
    pub offset: u64,
    pub draw_count: u32,
    pub stride: u32,
    pub indexed: bool,
}
