/// Render context configuration

/// Configuration shared by every component of a `RenderContext`
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Number of frames the device may lag behind the CPU.
    /// Resources retired on frame F are destroyed once the clock reaches F + frames_in_flight.
    pub frames_in_flight: u32,
    /// Number of descriptor sets served by one general-purpose pool
    pub descriptor_pool_capacity: u32,
    /// Process-wide ceiling on general-purpose descriptor pools
    pub max_descriptor_pools: u32,
    /// Number of sets in the pool reserved for UI widget descriptors
    pub ui_descriptor_pool_capacity: u32,
    /// Maximum number of entries in the bindless texture table
    pub max_bindless_textures: u32,
    /// Frames between two prunes of outdated pipeline objects
    pub pipeline_prune_interval: u64,
    /// Panic after logging a protocol violation (dispatch inside a render pass, double free, ...)
    pub assert_on_protocol_violation: bool,
}

impl RenderConfig {
    /// Descriptors of each type reserved per general-purpose pool
    pub fn descriptors_per_type(&self) -> u32 {
        self.descriptor_pool_capacity * 4
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            descriptor_pool_capacity: 256,
            max_descriptor_pools: 64,
            ui_descriptor_pool_capacity: 64,
            max_bindless_textures: 4096,
            pipeline_prune_interval: 16,
            assert_on_protocol_violation: cfg!(debug_assertions),
        }
    }
}
