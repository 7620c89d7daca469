/// Texture resource
///
/// A texture couples its CPU-side descriptor with an optional device side
/// (image, full view, sampler) owned through a single box. The device side
/// is replaced in place when the descriptor changes; the old handles go to
/// the deferred destruction queue.

use slotmap::new_key_type;

use crate::device::{
    GraphicsDevice, ImageBarrier, ImageHandle, ImageLayout, ImageViewHandle, SamplerDesc,
    SamplerHandle, CommandStreamHandle, TextureDesc,
};
use crate::error::Result;
use crate::frame::{DeferredDestructionQueue, ResourceToDelete};

new_key_type! {
    /// Stable key of a texture inside a `RenderContext`
    pub struct TextureKey;
}

/// Device objects backing a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTexture {
    pub image: ImageHandle,
    pub view: ImageViewHandle,
    pub sampler: SamplerHandle,
}

impl DeviceTexture {
    /// Create image, view and sampler; partial results are destroyed on failure
    pub fn create(device: &mut dyn GraphicsDevice, desc: &TextureDesc, sampler: &SamplerDesc) -> Result<Self> {
        let image = device.create_image(desc)?;
        let view = match device.create_image_view(image, desc) {
            Ok(view) => view,
            Err(e) => {
                device.destroy_image(image);
                return Err(e);
            }
        };
        let sampler = match device.create_sampler(sampler) {
            Ok(sampler) => sampler,
            Err(e) => {
                device.destroy_image_view(view);
                device.destroy_image(image);
                return Err(e);
            }
        };
        Ok(Self { image, view, sampler })
    }
}

/// Texture resource
pub struct Texture {
    desc: TextureDesc,
    sampler_desc: SamplerDesc,
    device: Option<Box<DeviceTexture>>,
    current_layout: ImageLayout,
    resting_layout: ImageLayout,
    /// Owned by the presentation layer, never destroyed here
    external: bool,
}

impl Texture {
    /// Texture without a device side
    pub fn new(desc: TextureDesc, sampler_desc: SamplerDesc) -> Self {
        let resting_layout = ImageLayout::resting_for(desc.usage, desc.format);
        Self {
            desc,
            sampler_desc,
            device: None,
            current_layout: ImageLayout::Undefined,
            resting_layout,
            external: false,
        }
    }

    /// Wrap an image owned elsewhere (back-buffer)
    pub fn external(desc: TextureDesc, image: ImageHandle, view: ImageViewHandle, layout: ImageLayout) -> Self {
        let mut texture = Self::new(desc, SamplerDesc::default());
        texture.device = Some(Box::new(DeviceTexture {
            image,
            view,
            sampler: SamplerHandle::NULL,
        }));
        texture.current_layout = layout;
        texture.resting_layout = layout;
        texture.external = true;
        texture
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn sampler_desc(&self) -> &SamplerDesc {
        &self.sampler_desc
    }

    /// Device side, if created
    pub fn device_texture(&self) -> Option<&DeviceTexture> {
        self.device.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn current_layout(&self) -> ImageLayout {
        self.current_layout
    }

    pub fn resting_layout(&self) -> ImageLayout {
        self.resting_layout
    }

    /// Whether the texture sits in its resting layout
    pub fn is_at_rest(&self) -> bool {
        self.current_layout == self.resting_layout
    }

    /// Number of device image layers
    pub fn layer_count(&self) -> u32 {
        self.desc.image_layers()
    }

    /// Install a freshly created device side, retiring the previous one
    pub(crate) fn replace_device(
        &mut self,
        desc: TextureDesc,
        sampler_desc: SamplerDesc,
        device_texture: DeviceTexture,
        queue: &mut DeferredDestructionQueue,
        frame: u64,
    ) {
        self.retire(queue, frame);
        self.resting_layout = ImageLayout::resting_for(desc.usage, desc.format);
        self.desc = desc;
        self.sampler_desc = sampler_desc;
        self.device = Some(Box::new(device_texture));
        self.current_layout = ImageLayout::Undefined;
        self.external = false;
    }

    /// Hand the device side to the deferred destruction queue
    pub(crate) fn retire(&mut self, queue: &mut DeferredDestructionQueue, frame: u64) {
        let Some(device_texture) = self.device.take() else {
            return;
        };
        self.current_layout = ImageLayout::Undefined;
        if self.external {
            return;
        }
        queue.retire(ResourceToDelete::ImageView(device_texture.view), frame);
        queue.retire(ResourceToDelete::Sampler(device_texture.sampler), frame);
        queue.retire(ResourceToDelete::Image(device_texture.image), frame);
    }

    /// Record a whole-image transition to `layout` (no-op when already there)
    pub(crate) fn transition(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stream: CommandStreamHandle,
        layout: ImageLayout,
    ) {
        let Some(device_texture) = self.device.as_deref() else {
            return;
        };
        if self.current_layout == layout {
            return;
        }
        device.cmd_image_barrier(
            stream,
            &ImageBarrier {
                image: device_texture.image,
                format: self.desc.format,
                old_layout: self.current_layout,
                new_layout: layout,
                base_mip: 0,
                mip_count: self.desc.mip_levels,
                base_layer: 0,
                layer_count: self.layer_count(),
            },
        );
        self.current_layout = layout;
    }

    /// Return to the resting layout after a recorded operation
    pub(crate) fn restore(&mut self, device: &mut dyn GraphicsDevice, stream: CommandStreamHandle) {
        let resting = self.resting_layout;
        self.transition(device, stream, resting);
    }

    /// Record the layout an external producer left the image in
    pub(crate) fn set_current_layout(&mut self, layout: ImageLayout) {
        self.current_layout = layout;
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
