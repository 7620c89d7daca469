/// Bindless texture table
///
/// One runtime-sized array of combined image samplers exposing every texture
/// to shaders by index. The table exists in two generations: `update` writes
/// the inactive one, then swaps. The previously active generation stays
/// intact for command streams that still reference it and becomes the
/// target of the next update.
///
/// Slots at `len()` and above still hold whatever an older update wrote
/// there. With a fallback entry set, those slots are rewritten to the
/// fallback on every update; without one their contents are undefined and
/// shaders must not index them.

use crate::descriptor::{DescriptorPoolAllocator, DescriptorSet};
use crate::device::{
    DescriptorBindingDesc, DescriptorResource, DescriptorSetHandle, DescriptorSetLayoutDesc,
    DescriptorSetLayoutHandle, DescriptorType, DescriptorWrite, GraphicsDevice, ImageViewHandle,
    SamplerHandle, ShaderStageFlags,
};
use crate::error::{Error, Result};
use crate::{engine_error, engine_trace};

const SOURCE: &str = "frameline::BindlessTextureTable";

/// Binding index of the texture array inside the table's set
pub const BINDLESS_BINDING: u32 = 0;

/// One table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindlessEntry {
    pub view: ImageViewHandle,
    pub sampler: SamplerHandle,
}

/// Double-buffered bindless descriptor table
pub struct BindlessTextureTable {
    layout: DescriptorSetLayoutHandle,
    generations: [DescriptorSet; 2],
    lengths: [u32; 2],
    /// Highest slot count ever written per generation
    written: [u32; 2],
    fallback: Option<BindlessEntry>,
    active: usize,
    max_textures: u32,
}

impl BindlessTextureTable {
    /// Create the table layout and both generations
    pub fn new(
        device: &mut dyn GraphicsDevice,
        allocator: &mut DescriptorPoolAllocator,
        max_textures: u32,
        frame: u64,
    ) -> Result<Self> {
        let max_textures = max_textures.max(1);
        let layout = device.create_descriptor_set_layout(&Self::layout_desc(max_textures))?;

        let first = allocator.allocate_bindless_set(device, layout, max_textures, frame);
        let second = allocator.allocate_bindless_set(device, layout, max_textures, frame);
        if first.is_null() || second.is_null() {
            allocator.free_set(first, frame);
            allocator.free_set(second, frame);
            device.destroy_descriptor_set_layout(layout);
            return Err(Error::OutOfPoolMemory);
        }

        Ok(Self {
            layout,
            generations: [first, second],
            lengths: [0, 0],
            written: [0, 0],
            fallback: None,
            active: 0,
            max_textures,
        })
    }

    /// Layout of one table generation
    pub fn layout_desc(max_textures: u32) -> DescriptorSetLayoutDesc {
        DescriptorSetLayoutDesc {
            bindings: vec![DescriptorBindingDesc {
                binding: BINDLESS_BINDING,
                descriptor_type: DescriptorType::SampledImage,
                count: max_textures,
                stages: ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT | ShaderStageFlags::COMPUTE,
                variable_count: true,
            }],
            update_after_bind: true,
        }
    }

    /// Entry written over stale slots past the new length of a generation
    ///
    /// Must stay alive for as long as the table.
    pub fn set_fallback(&mut self, entry: Option<BindlessEntry>) {
        self.fallback = entry;
    }

    /// Write `entries` into the inactive generation and make it active
    ///
    /// Entries past the table maximum are dropped with an error log.
    /// Returns the number of entries written.
    pub fn update(&mut self, device: &mut dyn GraphicsDevice, entries: &[BindlessEntry]) -> u32 {
        let mut count = entries.len();
        if count > self.max_textures as usize {
            engine_error!(
                SOURCE,
                "Bindless update of {} textures exceeds the table maximum of {}, truncating",
                count,
                self.max_textures
            );
            count = self.max_textures as usize;
        }

        let target = 1 - self.active;
        let stale = match self.fallback {
            Some(fallback) => {
                let end = (self.written[target] as usize).max(count);
                vec![fallback; end - count]
            }
            None => Vec::new(),
        };
        let writes: Vec<DescriptorWrite> = entries[..count]
            .iter()
            .chain(stale.iter())
            .enumerate()
            .map(|(index, entry)| DescriptorWrite {
                binding: BINDLESS_BINDING,
                array_element: index as u32,
                resource: DescriptorResource::SampledImage {
                    view: entry.view,
                    sampler: entry.sampler,
                },
            })
            .collect();

        if !writes.is_empty() {
            device.write_descriptor_set(self.generations[target].handle, &writes);
        }
        self.lengths[target] = count as u32;
        self.written[target] = self.written[target].max(count as u32);
        self.active = target;

        engine_trace!(SOURCE, "Generation {} active with {} textures", target, count);
        count as u32
    }

    /// Set to bind for commands recorded from now on
    pub fn active_set(&self) -> DescriptorSetHandle {
        self.generations[self.active].handle
    }

    /// Index (0 or 1) of the active generation
    pub fn active_generation(&self) -> usize {
        self.active
    }

    /// Set of generation `index` (0 or 1)
    pub fn generation_set(&self, index: usize) -> DescriptorSetHandle {
        self.generations[index & 1].handle
    }

    /// Number of textures in the active generation
    pub fn len(&self) -> u32 {
        self.lengths[self.active]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_textures(&self) -> u32 {
        self.max_textures
    }

    pub fn layout(&self) -> DescriptorSetLayoutHandle {
        self.layout
    }

    /// Return both generations and destroy the layout
    pub fn cleanup(&mut self, device: &mut dyn GraphicsDevice, allocator: &mut DescriptorPoolAllocator, frame: u64) {
        for set in self.generations {
            allocator.free_set(set, frame);
        }
        self.generations = [DescriptorSet::NULL; 2];
        if !self.layout.is_null() {
            device.destroy_descriptor_set_layout(self.layout);
            self.layout = DescriptorSetLayoutHandle::NULL;
        }
    }
}

#[cfg(test)]
#[path = "bindless_table_tests.rs"]
mod tests;
