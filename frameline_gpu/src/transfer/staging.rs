/// Recording of staged texture transfers and mip generation
///
/// Every recorded operation starts from the texture's tracked layout and
/// leaves it in its resting layout.

use crate::device::{
    BufferDesc, BufferHandle, BufferImageCopy, BufferUsage, CommandStreamHandle, GraphicsDevice,
    ImageBarrier, ImageLayout, MemoryLocation, MipBlit, TextureFormat,
};
use crate::error::{Error, Result};
use crate::frame::{DeferredDestructionQueue, ResourceToDelete};
use crate::resource::Texture;

/// Sub-region of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    pub mip_level: u32,
    pub base_layer: u32,
    pub layer_count: u32,
    /// Texel offset (x, y, z)
    pub offset: [u32; 3],
    /// Texel extent (width, height, depth)
    pub extent: [u32; 3],
}

impl TextureRegion {
    /// Whole mip 0 of every layer
    pub fn full(texture: &Texture) -> Self {
        let desc = texture.desc();
        Self {
            mip_level: 0,
            base_layer: 0,
            layer_count: texture.layer_count(),
            offset: [0, 0, 0],
            extent: [desc.width, desc.height, desc.depth],
        }
    }

    /// 2D region of the first `layer_count` layers at mip 0
    pub fn rect(x: u32, y: u32, width: u32, height: u32, layer_count: u32) -> Self {
        Self {
            mip_level: 0,
            base_layer: 0,
            layer_count,
            offset: [x, y, 0],
            extent: [width, height, 1],
        }
    }

    /// Clamp the layer range to the texture and check the texel range
    pub fn clamp_to(&self, texture: &Texture) -> Result<Self> {
        let desc = texture.desc();
        if self.mip_level >= desc.mip_levels {
            return Err(Error::InvalidResource(format!(
                "mip level {} out of range ({} levels)", self.mip_level, desc.mip_levels
            )));
        }
        let layers = texture.layer_count();
        if self.base_layer >= layers {
            return Err(Error::InvalidResource(format!(
                "base layer {} out of range ({} layers)", self.base_layer, layers
            )));
        }
        let (w, h, d) = desc.mip_extent(self.mip_level);
        let limit = [w, h, d];
        for axis in 0..3 {
            let end = self.offset[axis].checked_add(self.extent[axis]);
            if self.extent[axis] == 0 || end.is_none_or(|end| end > limit[axis]) {
                return Err(Error::InvalidResource(format!(
                    "region {:?}+{:?} exceeds mip extent {:?}", self.offset, self.extent, limit
                )));
            }
        }
        let mut clamped = *self;
        clamped.layer_count = self.layer_count.max(1).min(layers - self.base_layer);
        Ok(clamped)
    }

    fn copy(&self, buffer_offset: u64) -> BufferImageCopy {
        BufferImageCopy {
            buffer_offset,
            mip_level: self.mip_level,
            base_layer: self.base_layer,
            layer_count: self.layer_count,
            offset: self.offset,
            extent: self.extent,
        }
    }

    /// Tightly packed byte size of the region in `format`
    pub fn byte_size(&self, format: TextureFormat) -> u64 {
        self.extent[0] as u64
            * self.extent[1] as u64
            * self.extent[2] as u64
            * self.layer_count as u64
            * format.bytes_per_pixel() as u64
    }
}

/// CPU-side image delivered by a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuImage {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub layers: u32,
    pub format: TextureFormat,
    /// Layer-major, tightly packed texels
    pub data: Vec<u8>,
}

impl CpuImage {
    /// Zero-filled image sized for `region`
    pub fn for_region(region: &TextureRegion, format: TextureFormat) -> Self {
        Self {
            width: region.extent[0],
            height: region.extent[1],
            depth: region.extent[2],
            layers: region.layer_count,
            format,
            data: vec![0; region.byte_size(format) as usize],
        }
    }

    /// Bytes of one layer
    pub fn layer(&self, index: u32) -> Option<&[u8]> {
        let size = self.width as usize * self.height as usize * self.depth as usize
            * self.format.bytes_per_pixel() as usize;
        let start = index as usize * size;
        self.data.get(start..start + size)
    }
}

fn create_staging(device: &mut dyn GraphicsDevice, size: u64, location: MemoryLocation) -> Result<BufferHandle> {
    device.create_buffer(&BufferDesc {
        size,
        usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
        location,
    })
}

/// Record an upload of `data` into `region`
///
/// The staging buffer is retired on `frame` and destroyed once the upload
/// has provably executed.
pub fn record_texture_upload(
    device: &mut dyn GraphicsDevice,
    stream: CommandStreamHandle,
    texture: &mut Texture,
    region: &TextureRegion,
    data: &[u8],
    queue: &mut DeferredDestructionQueue,
    frame: u64,
) -> Result<()> {
    let Some(image) = texture.device_texture().map(|d| d.image) else {
        return Err(Error::InvalidResource("texture has no device side".to_string()));
    };
    let region = region.clamp_to(texture)?;
    let format = texture.desc().format;
    let size = region.byte_size(format);
    if (data.len() as u64) < size {
        return Err(Error::InvalidResource(format!(
            "upload of {} bytes, region needs {}", data.len(), size
        )));
    }

    let staging = create_staging(device, size, MemoryLocation::CpuToGpu)?;
    if let Err(e) = device.write_buffer(staging, 0, &data[..size as usize]) {
        device.destroy_buffer(staging);
        return Err(e);
    }

    texture.transition(device, stream, ImageLayout::TransferDst);
    device.cmd_copy_buffer_to_image(stream, staging, image, format, &region.copy(0));
    texture.restore(device, stream);

    queue.retire(ResourceToDelete::Buffer(staging), frame);
    Ok(())
}

/// Record a copy of `region` into a new CPU-readable staging buffer
///
/// Returns the staging buffer and the zeroed result image the bytes will be
/// copied into once the device has executed the copy.
pub fn record_texture_download(
    device: &mut dyn GraphicsDevice,
    stream: CommandStreamHandle,
    texture: &mut Texture,
    region: &TextureRegion,
) -> Result<(BufferHandle, CpuImage)> {
    let Some(image) = texture.device_texture().map(|d| d.image) else {
        return Err(Error::InvalidResource("texture has no device side".to_string()));
    };
    let region = region.clamp_to(texture)?;
    let format = texture.desc().format;

    let staging = create_staging(device, region.byte_size(format), MemoryLocation::GpuToCpu)?;

    texture.transition(device, stream, ImageLayout::TransferSrc);
    device.cmd_copy_image_to_buffer(stream, image, format, staging, &region.copy(0));
    texture.restore(device, stream);

    Ok((staging, CpuImage::for_region(&region, format)))
}

/// Record a full mip chain generation from mip 0
///
/// Returns `Err(Error::Unsupported)` when the format cannot be linearly blitted.
pub fn record_mip_generation(
    device: &mut dyn GraphicsDevice,
    stream: CommandStreamHandle,
    texture: &mut Texture,
) -> Result<()> {
    let Some(image) = texture.device_texture().map(|d| d.image) else {
        return Err(Error::InvalidResource("texture has no device side".to_string()));
    };
    let desc = texture.desc().clone();
    if desc.mip_levels <= 1 {
        return Ok(());
    }
    if !device.supports_linear_blit(desc.format) {
        return Err(Error::Unsupported(format!("linear blit of {:?}", desc.format)));
    }

    let layers = texture.layer_count();
    let resting = texture.resting_layout();
    let level_barrier = |level: u32, old_layout: ImageLayout, new_layout: ImageLayout| ImageBarrier {
        image,
        format: desc.format,
        old_layout,
        new_layout,
        base_mip: level,
        mip_count: 1,
        base_layer: 0,
        layer_count: layers,
    };

    texture.transition(device, stream, ImageLayout::TransferDst);
    for level in 1..desc.mip_levels {
        device.cmd_image_barrier(stream, &level_barrier(level - 1, ImageLayout::TransferDst, ImageLayout::TransferSrc));
        device.cmd_blit_mip(
            stream,
            &MipBlit {
                image,
                src_level: level - 1,
                src_extent: desc.mip_extent(level - 1),
                dst_extent: desc.mip_extent(level),
                base_layer: 0,
                layer_count: layers,
            },
        );
        device.cmd_image_barrier(stream, &level_barrier(level - 1, ImageLayout::TransferSrc, resting));
    }
    device.cmd_image_barrier(stream, &level_barrier(desc.mip_levels - 1, ImageLayout::TransferDst, resting));
    texture.set_current_layout(resting);
    Ok(())
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
