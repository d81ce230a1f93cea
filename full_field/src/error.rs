use mroi_data::error::DataError;
use si_header::error::MetadataFieldError;
use thiserror::Error;
use crate::geometry::PixelRect;

/// Geometric preconditions a layout has to meet before anything is stitched.
#[derive(Debug,Error,PartialEq)]
pub enum LayoutError {
    #[error("only channel 1 can be stitched, the acquisition saved channels {channels:?}")]
    MultiChannel {
        channels:Vec<u32>,
    },

    #[error("stack definition '{stack_type}' is not supported, expected uniform or bounded")]
    UnsupportedStackType {
        stack_type:String,
    },

    #[error("roi {roi} is in discrete plane mode")]
    DiscretePlaneRoi {
        roi:usize,
    },

    #[error("roi {roi} declares {count} scanfields, expected exactly 1")]
    MultiScanfieldRoi {
        roi:usize,
        count:usize,
    },

    #[error("roi {first} has pixel resolution {first_xy:?} but roi {second} has {second_xy:?}")]
    ResolutionMismatch {
        first:usize,
        second:usize,
        first_xy:(usize,usize),
        second_xy:(usize,usize),
    },

    #[error("roi {first} spans {first_xy:?} degrees but roi {second} spans {second_xy:?}")]
    SizeMismatch {
        first:usize,
        second:usize,
        first_xy:(f64,f64),
        second_xy:(f64,f64),
    },

    #[error("roi {roi} has resolution {resolution_xy:?} over {size_xy:?} degrees, pixel per degree is undefined")]
    DegenerateRoi {
        roi:usize,
        resolution_xy:(usize,usize),
        size_xy:(f64,f64),
    },
}

/// The raw stack does not have the shape the layout implies.
#[derive(Debug,Error,PartialEq,Eq)]
#[error("raw stack of shape {shape:?} has {actual} along axis {axis}, expected {expected}: {reason}")]
pub struct ShapeMismatchError {
    pub shape:[usize;3],
    pub axis:usize,
    pub expected:usize,
    pub actual:usize,
    pub reason:&'static str,
}

#[derive(Debug,Error,PartialEq,Eq)]
#[error("destination of roi {second} overlaps roi {first}")]
pub struct CompositingOverlapError {
    pub first:usize,
    pub second:usize,
}

#[derive(Debug,Error,PartialEq,Eq)]
#[error("destination {rect:?} of roi {roi} leaves the canvas of shape (x,y) {canvas_shape_xy:?}")]
pub struct OutOfCanvasError {
    pub roi:usize,
    pub rect:PixelRect,
    pub canvas_shape_xy:(usize,usize),
}

#[derive(Debug,Error)]
pub enum ConfigError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Everything that can stop a stitching run.
#[derive(Debug,Error)]
pub enum StitchError {
    #[error(transparent)]
    Metadata(#[from] MetadataFieldError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Shape(#[from] ShapeMismatchError),
    #[error(transparent)]
    Overlap(#[from] CompositingOverlapError),
    #[error(transparent)]
    OutOfCanvas(#[from] OutOfCanvasError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
