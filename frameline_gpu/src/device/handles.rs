/// Opaque device object handles
///
/// Every handle is a plain `u64` as produced by the backend (Vulkan handles
/// round-trip through `Handle::as_raw`/`from_raw`). Zero is the null handle.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u64);

        impl $name {
            /// The null handle
            pub const NULL: Self = Self(0);

            /// Whether this is the null handle
            pub fn is_null(&self) -> bool {
                self.0 == 0
            }

            /// Raw backend value
            pub fn raw(&self) -> u64 {
                self.0
            }
        }
    };
}

define_handle!(
    /// Device image (texture storage)
    ImageHandle
);
define_handle!(
    /// View onto a device image
    ImageViewHandle
);
define_handle!(
    /// Texture sampler
    SamplerHandle
);
define_handle!(
    /// Device buffer
    BufferHandle
);
define_handle!(
    /// Compiled shader stage module
    ShaderModuleHandle
);
define_handle!(DescriptorSetLayoutHandle);
define_handle!(PipelineLayoutHandle);
define_handle!(DescriptorPoolHandle);
define_handle!(DescriptorSetHandle);
define_handle!(
    /// Graphics or compute pipeline object
    PipelineHandle
);
define_handle!(
    /// Recordable command stream (command buffer)
    CommandStreamHandle
);
