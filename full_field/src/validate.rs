use serde::{Deserialize, Serialize};
use si_header::layout::{AcquisitionLayout, RoiGeometry, StackType};
use tracing::debug;
use crate::error::LayoutError;
use crate::geometry::{canvas_extent_xy, canvas_origin_degrees, place, PixelRect};

/// Geometry shared by every roi of a validated layout.
#[derive(Clone,Copy,Debug,PartialEq,Serialize,Deserialize)]
pub struct DerivedGeometry {
    pub pixel_per_degree_xy:(f64,f64),
    pub canvas_origin_degrees:(f64,f64),
}

/// An acquisition layout that passed [`validate`]. There is no other way to build one.
#[derive(Clone,Debug,PartialEq)]
pub struct ValidatedLayout {
    layout:AcquisitionLayout,
    derived:DerivedGeometry,
}

impl ValidatedLayout {
    pub fn layout(&self) -> &AcquisitionLayout {
        &self.layout
    }

    pub fn derived(&self) -> &DerivedGeometry {
        &self.derived
    }

    pub fn rois(&self) -> &[RoiGeometry] {
        &self.layout.rois
    }

    pub fn n_rois(&self) -> usize {
        self.layout.rois.len()
    }

    /// resolution (x, y) shared by all rois
    pub fn roi_resolution_xy(&self) -> (usize,usize) {
        self.layout.rois[0].pixel_resolution_xy
    }

    /// Canvas rectangle of every roi in declaration order, not yet checked for overlap.
    pub fn roi_rects(&self) -> Vec<PixelRect> {
        self.layout.rois.iter().map(|roi| self.place(roi.top_left_degrees(),roi.pixel_resolution_xy)).collect()
    }

    /// Places a footprint given in degrees and full field pixels (x, y) on the canvas.
    pub fn place(&self,top_left_degrees:(f64,f64),shape_xy:(usize,usize)) -> PixelRect {
        place(top_left_degrees,shape_xy,self.derived.canvas_origin_degrees,self.derived.pixel_per_degree_xy)
    }

    /// bounding box of all roi rectangles in full field pixels (x, y)
    pub fn canvas_extent_xy(&self) -> (usize,usize) {
        canvas_extent_xy(&self.roi_rects())
    }
}

pub fn validate(layout:&AcquisitionLayout) -> Result<ValidatedLayout,LayoutError> {
    if layout.channel_save != [1] {
        return Err(LayoutError::MultiChannel {channels:layout.channel_save.clone()});
    }
    match &layout.stack_type {
        StackType::Uniform | StackType::Bounded => (),
        other => return Err(LayoutError::UnsupportedStackType {stack_type:other.print()})
    }
    for (roi,geom) in layout.rois.iter().enumerate() {
        if geom.discrete_plane_mode {
            return Err(LayoutError::DiscretePlaneRoi {roi});
        }
        if geom.scanfield_count != 1 {
            return Err(LayoutError::MultiScanfieldRoi {roi,count:geom.scanfield_count});
        }
    }
    let first = layout.rois.first().ok_or(LayoutError::DegenerateRoi {roi:0,resolution_xy:(0,0),size_xy:(0.0,0.0)})?;
    for (i,geom) in layout.rois.iter().enumerate().skip(1) {
        if geom.pixel_resolution_xy != first.pixel_resolution_xy {
            return Err(LayoutError::ResolutionMismatch {
                first:0,
                second:i,
                first_xy:first.pixel_resolution_xy,
                second_xy:geom.pixel_resolution_xy,
            });
        }
    }
    for (i,geom) in layout.rois.iter().enumerate().skip(1) {
        if geom.size_xy_degrees != first.size_xy_degrees {
            return Err(LayoutError::SizeMismatch {
                first:0,
                second:i,
                first_xy:first.size_xy_degrees,
                second_xy:geom.size_xy_degrees,
            });
        }
    }
    check_degenerate(0,first)?;

    let derived = DerivedGeometry {
        pixel_per_degree_xy:first.pixel_per_degree_xy(),
        canvas_origin_degrees:canvas_origin_degrees(&layout.rois),
    };
    debug!(n_rois = layout.rois.len(),ppd_x = derived.pixel_per_degree_xy.0,ppd_y = derived.pixel_per_degree_xy.1,"layout validated");
    Ok(ValidatedLayout {
        layout:layout.clone(),
        derived,
    })
}

/// pixel per degree has to be a finite positive number on both axes
pub(crate) fn check_degenerate(roi:usize,geom:&RoiGeometry) -> Result<(),LayoutError> {
    let (rx,ry) = geom.pixel_resolution_xy;
    let (sx,sy) = geom.size_xy_degrees;
    let ok_size = |s:f64| s.is_finite() && s > 0.0;
    match rx > 0 && ry > 0 && ok_size(sx) && ok_size(sy) {
        true => Ok(()),
        false => Err(LayoutError::DegenerateRoi {roi,resolution_xy:geom.pixel_resolution_xy,size_xy:geom.size_xy_degrees})
    }
}
