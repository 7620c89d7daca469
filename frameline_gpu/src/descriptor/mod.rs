/// Descriptor-set allocation and the bindless texture table

mod descriptor_pool_allocator;
mod bindless_table;

pub use descriptor_pool_allocator::{DescriptorPoolAllocator, DescriptorSet, PoolId, PoolStats};
pub use bindless_table::{BindlessEntry, BindlessTextureTable, BINDLESS_BINDING};
