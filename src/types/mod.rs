mod config;
mod config_blob;
mod source_image;

pub use config::EpdParameters;
pub use config_blob::ConfigBlob;
pub use source_image::{IndexedImage, SourceImage};
