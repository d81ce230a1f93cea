pub mod error;
pub mod raw;
pub mod averaging;
pub mod image_tools;
pub mod quality;
