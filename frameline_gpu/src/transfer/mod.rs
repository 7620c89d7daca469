/// Staging transfers between CPU memory and device resources

mod staging;
mod async_transfer;

pub use staging::{
    record_mip_generation, record_texture_download, record_texture_upload, CpuImage, TextureRegion,
};
pub use async_transfer::{AsyncCallback, AsyncTaskId, AsyncTransferQueue};
