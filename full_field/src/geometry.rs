use serde::{Deserialize, Serialize};
use si_header::layout::RoiGeometry;
use crate::error::{CompositingOverlapError, OutOfCanvasError, StitchError};

/// Metadata speaks (x, y), arrays are indexed (row, col). Every crossing between the two goes through here.
pub fn xy_to_row_col<T>(xy:(T,T)) -> (T,T) {
    (xy.1,xy.0)
}

/// Pixel offset (x, y) of a degree position relative to the canvas origin.
pub fn degrees_to_pixels(position_xy:(f64,f64),origin_xy:(f64,f64),pixel_per_degree_xy:(f64,f64)) -> (i64,i64) {
    (((position_xy.0 - origin_xy.0)*pixel_per_degree_xy.0).round() as i64,
     ((position_xy.1 - origin_xy.1)*pixel_per_degree_xy.1).round() as i64)
}

/// Smallest top-left corner over all rois, in degrees.
pub fn canvas_origin_degrees(rois:&[RoiGeometry]) -> (f64,f64) {
    rois.iter().map(|r| r.top_left_degrees()).fold((f64::INFINITY,f64::INFINITY),|acc,tl| (acc.0.min(tl.0),acc.1.min(tl.1)))
}

/// Rectangle of an roi footprint on the canvas: top-left rounded to the nearest pixel, extent taken as is.
pub fn place(top_left_degrees:(f64,f64),shape_xy:(usize,usize),origin_xy:(f64,f64),pixel_per_degree_xy:(f64,f64)) -> PixelRect {
    PixelRect::from_xy(degrees_to_pixels(top_left_degrees,origin_xy,pixel_per_degree_xy),shape_xy)
}

/// Extent (x, y) in pixels covering every rectangle, so the canvas and the placements share one rounding.
pub fn canvas_extent_xy(rects:&[PixelRect]) -> (usize,usize) {
    let (rows,cols) = rects.iter().fold((0,0),|(rows,cols),r| (rows.max(r.row_end()),cols.max(r.col_end())));
    (cols.max(0) as usize,rows.max(0) as usize)
}

/// A destination rectangle on the canvas in storage order.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub struct PixelRect {
    pub row:i64,
    pub col:i64,
    pub rows:usize,
    pub cols:usize,
}

impl PixelRect {
    /// from a top-left pixel (x, y) and an extent (x, y)
    pub fn from_xy(top_left_xy:(i64,i64),shape_xy:(usize,usize)) -> Self {
        let (row,col) = xy_to_row_col(top_left_xy);
        let (rows,cols) = xy_to_row_col(shape_xy);
        Self {
            row,
            col,
            rows,
            cols
        }
    }

    pub fn row_end(&self) -> i64 {
        self.row + self.rows as i64
    }

    pub fn col_end(&self) -> i64 {
        self.col + self.cols as i64
    }

    /// true when the rectangles share at least one pixel
    pub fn overlaps(&self,other:&PixelRect) -> bool {
        self.row < other.row_end() && other.row < self.row_end() &&
        self.col < other.col_end() && other.col < self.col_end()
    }

    pub fn fits(&self,canvas_shape_xy:(usize,usize)) -> bool {
        let (rows,cols) = xy_to_row_col(canvas_shape_xy);
        self.row >= 0 && self.col >= 0 && self.row_end() <= rows as i64 && self.col_end() <= cols as i64
    }
}

/// Checks that every rectangle lies inside the canvas and that no two of them share a pixel.
pub fn check_placements(rects:&[PixelRect],canvas_shape_xy:(usize,usize)) -> Result<(),StitchError> {
    for (i,rect) in rects.iter().enumerate() {
        if !rect.fits(canvas_shape_xy) {
            return Err(OutOfCanvasError {roi:i,rect:*rect,canvas_shape_xy}.into());
        }
        for (j,earlier) in rects[0..i].iter().enumerate() {
            if rect.overlaps(earlier) {
                return Err(CompositingOverlapError {first:j,second:i}.into());
            }
        }
    }
    Ok(())
}
