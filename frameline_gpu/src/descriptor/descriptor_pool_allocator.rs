/// Descriptor pool allocator
///
/// Sets are carved from fixed-capacity pools. Allocation always targets the
/// newest pool; when it is exhausted, a fully freed pool that has been idle
/// long enough for the device to have dropped every reference to its sets is
/// reset and moved to the back of the list. Only when none qualifies is a
/// new pool created, up to a process-wide ceiling.
///
/// Two dedicated pools sit beside the general list: one for UI widget
/// descriptors and one (update-after-bind) for the bindless texture table.
/// Neither is recycled; both live until `cleanup`.

use crate::config::RenderConfig;
use crate::device::{
    DescriptorPoolDesc, DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle,
    DescriptorType, GraphicsDevice,
};
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error, engine_protocol_violation};

const SOURCE: &str = "frameline::DescriptorPoolAllocator";

/// Sets reserved in the bindless pool (two table generations plus headroom)
const BINDLESS_POOL_SETS: u32 = 4;

/// Pool a descriptor set was allocated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolId {
    /// General-purpose pool with a stable numeric id
    General(u32),
    /// UI widget pool
    Ui,
    /// Bindless texture table pool
    Bindless,
}

/// Allocated descriptor set
///
/// Not owned: the requester returns it with `free_set` when done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSet {
    pub handle: DescriptorSetHandle,
    pub pool: PoolId,
}

impl DescriptorSet {
    /// Returned when allocation failed
    pub const NULL: Self = Self {
        handle: DescriptorSetHandle::NULL,
        pool: PoolId::General(u32::MAX),
    };

    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }
}

/// Snapshot of one pool's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub id: PoolId,
    pub allocated: u32,
    pub capacity: u32,
    pub last_frame: u64,
}

struct DescriptorPool {
    id: PoolId,
    handle: DescriptorPoolHandle,
    allocated: u32,
    capacity: u32,
    last_frame: u64,
}

impl DescriptorPool {
    fn stats(&self) -> PoolStats {
        PoolStats {
            id: self.id,
            allocated: self.allocated,
            capacity: self.capacity,
            last_frame: self.last_frame,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.allocated >= self.capacity
    }

    /// Allocate one set, keeping the counter in sync with the device
    fn allocate(
        &mut self,
        device: &mut dyn GraphicsDevice,
        layout: DescriptorSetLayoutHandle,
        variable_count: u32,
        frame: u64,
    ) -> Result<DescriptorSet> {
        if self.is_exhausted() {
            return Err(Error::OutOfPoolMemory);
        }
        let handle = device.allocate_descriptor_set(self.handle, layout, variable_count)?;
        self.allocated += 1;
        self.last_frame = frame;
        Ok(DescriptorSet { handle, pool: self.id })
    }
}

/// Descriptor-set allocator over recyclable pools
pub struct DescriptorPoolAllocator {
    pools: Vec<DescriptorPool>,
    ui_pool: Option<DescriptorPool>,
    bindless_pool: Option<DescriptorPool>,
    next_pool_id: u32,

    pool_capacity: u32,
    descriptors_per_type: u32,
    max_pools: u32,
    ui_capacity: u32,
    max_bindless_textures: u32,
    frames_in_flight: u32,
    assert_on_violation: bool,
}

impl DescriptorPoolAllocator {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            pools: Vec::new(),
            ui_pool: None,
            bindless_pool: None,
            next_pool_id: 0,
            pool_capacity: config.descriptor_pool_capacity.max(1),
            descriptors_per_type: config.descriptors_per_type().max(1),
            max_pools: config.max_descriptor_pools.max(1),
            ui_capacity: config.ui_descriptor_pool_capacity.max(1),
            max_bindless_textures: config.max_bindless_textures.max(1),
            frames_in_flight: config.frames_in_flight.max(1),
            assert_on_violation: config.assert_on_protocol_violation,
        }
    }

    // ===== GENERAL POOLS =====

    /// Allocate a set for `layout`
    ///
    /// Returns `DescriptorSet::NULL` (and logs an error) when no pool can
    /// serve the request.
    pub fn allocate_set(
        &mut self,
        device: &mut dyn GraphicsDevice,
        layout: DescriptorSetLayoutHandle,
        frame: u64,
    ) -> DescriptorSet {
        // newest pool first
        if let Some(pool) = self.pools.last_mut() {
            match pool.allocate(device, layout, 0, frame) {
                Ok(set) => return set,
                Err(Error::OutOfPoolMemory) => {}
                Err(e) => {
                    engine_error!(SOURCE, "Descriptor set allocation failed: {}", e);
                    return DescriptorSet::NULL;
                }
            }
        }

        let index = match self.find_recyclable(frame) {
            Some(index) => match self.recycle(device, index) {
                Ok(index) => index,
                Err(e) => {
                    engine_error!(SOURCE, "Failed to reset descriptor pool: {}", e);
                    return DescriptorSet::NULL;
                }
            },
            None => {
                if self.pools.len() as u32 >= self.max_pools {
                    engine_error!(
                        SOURCE,
                        "Descriptor pool ceiling reached ({} pools, none recyclable at frame {})",
                        self.max_pools,
                        frame
                    );
                    return DescriptorSet::NULL;
                }
                match self.create_general_pool(device, frame) {
                    Ok(index) => index,
                    Err(e) => {
                        engine_error!(SOURCE, "Failed to create descriptor pool: {}", e);
                        return DescriptorSet::NULL;
                    }
                }
            }
        };

        match self.pools[index].allocate(device, layout, 0, frame) {
            Ok(set) => set,
            Err(e) => {
                engine_error!(SOURCE, "Descriptor set allocation failed on a fresh pool: {}", e);
                DescriptorSet::NULL
            }
        }
    }

    /// Return `set` to its pool
    ///
    /// Freeing more sets than a pool handed out is reported and ignored.
    pub fn free_set(&mut self, set: DescriptorSet, frame: u64) {
        if set.is_null() {
            return;
        }

        let assert_on_violation = self.assert_on_violation;
        let pool = match set.pool {
            PoolId::General(id) => self.pools.iter_mut().find(|p| p.id == PoolId::General(id)),
            PoolId::Ui => self.ui_pool.as_mut(),
            PoolId::Bindless => self.bindless_pool.as_mut(),
        };

        let Some(pool) = pool else {
            engine_protocol_violation!(
                assert_on_violation,
                SOURCE,
                "freeing set {:?} of unknown pool {:?}",
                set.handle,
                set.pool
            );
            return;
        };

        if pool.allocated == 0 {
            engine_protocol_violation!(
                assert_on_violation,
                SOURCE,
                "double free of descriptor set {:?} (pool {:?} has no live sets)",
                set.handle,
                set.pool
            );
            return;
        }

        pool.allocated -= 1;
        pool.last_frame = frame;
    }

    fn find_recyclable(&self, frame: u64) -> Option<usize> {
        self.pools
            .iter()
            .position(|p| p.allocated == 0 && p.last_frame + (self.frames_in_flight as u64) < frame)
    }

    /// Reset the pool at `index` and move it to the back of the list
    fn recycle(&mut self, device: &mut dyn GraphicsDevice, index: usize) -> Result<usize> {
        device.reset_descriptor_pool(self.pools[index].handle)?;
        let pool = self.pools.remove(index);
        engine_debug!(SOURCE, "Recycled descriptor pool {:?}", pool.id);
        self.pools.push(pool);
        Ok(self.pools.len() - 1)
    }

    fn create_general_pool(&mut self, device: &mut dyn GraphicsDevice, frame: u64) -> Result<usize> {
        let per_type = self.descriptors_per_type;
        let handle = device.create_descriptor_pool(&DescriptorPoolDesc {
            max_sets: self.pool_capacity,
            sizes: vec![
                (DescriptorType::UniformBuffer, per_type),
                (DescriptorType::StorageBuffer, per_type),
                (DescriptorType::SampledImage, per_type),
                (DescriptorType::StorageImage, per_type),
            ],
            update_after_bind: false,
        })?;

        let id = PoolId::General(self.next_pool_id);
        self.next_pool_id += 1;
        engine_debug!(SOURCE, "Created descriptor pool {:?} ({} sets)", id, self.pool_capacity);

        self.pools.push(DescriptorPool {
            id,
            handle,
            allocated: 0,
            capacity: self.pool_capacity,
            last_frame: frame,
        });
        Ok(self.pools.len() - 1)
    }

    // ===== DEDICATED POOLS =====

    /// Allocate a UI widget set from the dedicated UI pool
    pub fn allocate_ui_set(
        &mut self,
        device: &mut dyn GraphicsDevice,
        layout: DescriptorSetLayoutHandle,
        frame: u64,
    ) -> DescriptorSet {
        if self.ui_pool.is_none() {
            let desc = DescriptorPoolDesc {
                max_sets: self.ui_capacity,
                sizes: vec![
                    (DescriptorType::SampledImage, self.ui_capacity),
                    (DescriptorType::UniformBuffer, self.ui_capacity),
                ],
                update_after_bind: false,
            };
            match device.create_descriptor_pool(&desc) {
                Ok(handle) => {
                    self.ui_pool = Some(DescriptorPool {
                        id: PoolId::Ui,
                        handle,
                        allocated: 0,
                        capacity: self.ui_capacity,
                        last_frame: frame,
                    });
                }
                Err(e) => {
                    engine_error!(SOURCE, "Failed to create UI descriptor pool: {}", e);
                    return DescriptorSet::NULL;
                }
            }
        }

        let Some(pool) = self.ui_pool.as_mut() else {
            return DescriptorSet::NULL;
        };
        match pool.allocate(device, layout, 0, frame) {
            Ok(set) => set,
            Err(e) => {
                engine_error!(SOURCE, "UI descriptor set allocation failed: {}", e);
                DescriptorSet::NULL
            }
        }
    }

    /// Allocate a bindless table set sized for `count` textures
    ///
    /// `count` is clamped to the configured table maximum.
    pub fn allocate_bindless_set(
        &mut self,
        device: &mut dyn GraphicsDevice,
        layout: DescriptorSetLayoutHandle,
        count: u32,
        frame: u64,
    ) -> DescriptorSet {
        if self.bindless_pool.is_none() {
            let desc = DescriptorPoolDesc {
                max_sets: BINDLESS_POOL_SETS,
                sizes: vec![(DescriptorType::SampledImage, self.max_bindless_textures * BINDLESS_POOL_SETS)],
                update_after_bind: true,
            };
            match device.create_descriptor_pool(&desc) {
                Ok(handle) => {
                    self.bindless_pool = Some(DescriptorPool {
                        id: PoolId::Bindless,
                        handle,
                        allocated: 0,
                        capacity: BINDLESS_POOL_SETS,
                        last_frame: frame,
                    });
                }
                Err(e) => {
                    engine_error!(SOURCE, "Failed to create bindless descriptor pool: {}", e);
                    return DescriptorSet::NULL;
                }
            }
        }

        let count = count.min(self.max_bindless_textures);
        let Some(pool) = self.bindless_pool.as_mut() else {
            return DescriptorSet::NULL;
        };
        match pool.allocate(device, layout, count, frame) {
            Ok(set) => set,
            Err(e) => {
                engine_error!(SOURCE, "Bindless descriptor set allocation failed: {}", e);
                DescriptorSet::NULL
            }
        }
    }

    // ===== INSPECTION / SHUTDOWN =====

    /// Number of general-purpose pools
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Bookkeeping of every pool (general pools in list order, then UI, then bindless)
    pub fn pool_stats(&self) -> Vec<PoolStats> {
        self.pools
            .iter()
            .chain(self.ui_pool.iter())
            .chain(self.bindless_pool.iter())
            .map(DescriptorPool::stats)
            .collect()
    }

    /// Destroy every pool; outstanding sets become invalid
    pub fn cleanup(&mut self, device: &mut dyn GraphicsDevice) {
        for pool in self.pools.drain(..) {
            device.destroy_descriptor_pool(pool.handle);
        }
        if let Some(pool) = self.ui_pool.take() {
            device.destroy_descriptor_pool(pool.handle);
        }
        if let Some(pool) = self.bindless_pool.take() {
            device.destroy_descriptor_pool(pool.handle);
        }
    }
}

#[cfg(test)]
#[path = "descriptor_pool_allocator_tests.rs"]
mod tests;
