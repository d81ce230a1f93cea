pub mod error;
pub mod geometry;
pub mod validate;
pub mod reconcile;
pub mod stitcher;
pub mod surface;
pub mod stitch_config;
pub mod pipeline;
