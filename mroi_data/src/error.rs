use ndarray::ShapeError;
use ndarray_stats::errors::MinMaxError;
use thiserror::Error;

#[derive(Debug,Error)]
pub enum DataError {
    #[error("raw buffer holds {actual} bytes, expected {expected} for shape {shape:?}")]
    ByteCount {
        expected:usize,
        actual:usize,
        shape:[usize;3],
    },

    #[error("cannot build array: {0}")]
    Shape(#[from] ShapeError),

    #[error("stack has {actual} frames along its leading axis, expected {expected}")]
    FrameCount {
        expected:usize,
        actual:usize,
    },

    #[error("frame shape {actual:?} does not match accumulator shape {expected:?}")]
    FrameShape {
        expected:[usize;2],
        actual:[usize;2],
    },

    #[error("plane {plane} is out of range for an accumulator with {n_planes} planes")]
    PlaneIndex {
        plane:usize,
        n_planes:usize,
    },

    #[error("plane {plane} received {count} frames while plane 0 received {expected}")]
    UnevenRepeats {
        plane:usize,
        count:usize,
        expected:usize,
    },

    #[error("image is empty")]
    EmptyImage,

    #[error("image of shape {shape:?} is too small: {reason}")]
    TooSmall {
        shape:[usize;2],
        reason:&'static str,
    },

    #[error("cannot reduce image: {0}")]
    MinMax(#[from] MinMaxError),

    #[error("maximum value {max} does not fit in 16 bits; rescale first")]
    U16Overflow {
        max:f64,
    },
}
