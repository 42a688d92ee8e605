pub mod services;

pub use services::{remove_image, store_image, UploadItem};
