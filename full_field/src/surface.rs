use mroi_data::averaging::{average_repeats, AveragingPolicy, RepeatDims};
use mroi_data::image_tools::{negative_rescale, offset_to_zero, resample};
use mroi_data::raw::Sample;
use ndarray::{s, Array2, ArrayBase, ArrayView2, ArrayView3, DataMut, Ix2};
use si_header::layout::{AcquisitionLayout, RoiGeometry};
use tracing::{debug, info};
use crate::error::{ShapeMismatchError, StitchError};
use crate::geometry::{check_placements, xy_to_row_col, PixelRect};
use crate::reconcile::reconcile;
use crate::stitch_config::SurfaceIntensity;
use crate::stitcher::{paste, roi_block};
use crate::validate::{check_degenerate, validate, ValidatedLayout};

/// One surface image and the scan geometry it was acquired with.
#[derive(Clone,Debug,PartialEq)]
pub struct SurfaceTile {
    pub image:Array2<f64>,
    pub geometry:RoiGeometry,
}

/// A surface capture made of one or more tiles.
#[derive(Clone,Debug,PartialEq)]
pub struct SurfaceCapture {
    pub tiles:Vec<SurfaceTile>,
}

impl SurfaceCapture {

    pub fn single(image:Array2<f64>,geometry:RoiGeometry) -> Self {
        Self {
            tiles:vec![SurfaceTile {image,geometry}]
        }
    }

    /// Builds the tiles from a raw surface acquisition: validated and reconciled like a full
    /// field run, every repeat averaged, and each roi block cut out of the averaged frame.
    pub fn from_acquisition<T:Sample>(layout:&AcquisitionLayout,raw:ArrayView3<T>) -> Result<Self,StitchError> {
        let validated = validate(layout)?;
        let sh = raw.shape();
        let reconciled = reconcile([sh[0],sh[1],sh[2]],&validated)?;
        let dims = RepeatDims::new(layout.num_volumes,layout.num_slices,layout.frames_per_slice);
        let averaged = average_repeats(raw,dims,&AveragingPolicy::default())?;
        let frame = averaged.slice(s![0,..,..]);
        let (_,roi_rows) = validated.roi_resolution_xy();
        let tiles = validated.rois().iter().enumerate().map(|(i,geometry)| SurfaceTile {
            image:roi_block(frame,i,roi_rows,reconciled.gap).to_owned(),
            geometry:geometry.clone(),
        }).collect();
        Ok(Self {tiles})
    }
}

/// Ratio (x, y) of the tile's pixel density to the full field's.
pub fn downsample_factor_xy(tile:&RoiGeometry,full_pixel_per_degree_xy:(f64,f64)) -> (f64,f64) {
    let (sx,sy) = tile.pixel_per_degree_xy();
    (sx/full_pixel_per_degree_xy.0,sy/full_pixel_per_degree_xy.1)
}

/// Size (x, y) of a tile once brought to full field pixel density.
pub fn target_shape_xy(tile:&RoiGeometry,full_pixel_per_degree_xy:(f64,f64)) -> (usize,usize) {
    let (fx,fy) = downsample_factor_xy(tile,full_pixel_per_degree_xy);
    let (rx,ry) = tile.pixel_resolution_xy;
    ((rx as f64/fx).round() as usize,(ry as f64/fy).round() as usize)
}

/// Surface tiles leveled and resampled to full field density once, ready to be pasted onto any
/// number of planes of one canvas shape.
#[derive(Clone,Debug,PartialEq)]
pub struct PreparedSurface {
    canvas_shape_xy:(usize,usize),
    tiles:Vec<(PixelRect,Array2<f64>)>,
}

impl PreparedSurface {

    pub fn new(canvas_shape_xy:(usize,usize),layout:&ValidatedLayout,surface:&SurfaceCapture,intensity:&SurfaceIntensity) -> Result<Self,StitchError> {
        let ppd = layout.derived().pixel_per_degree_xy;
        let mut rects = Vec::<PixelRect>::with_capacity(surface.tiles.len());
        for (i,tile) in surface.tiles.iter().enumerate() {
            check_degenerate(i,&tile.geometry)?;
            let expected = xy_to_row_col(tile.geometry.pixel_resolution_xy);
            if tile.image.dim() != expected {
                return Err(ShapeMismatchError {
                    shape:[1,tile.image.nrows(),tile.image.ncols()],
                    axis:if tile.image.nrows() != expected.0 {1} else {2},
                    expected:if tile.image.nrows() != expected.0 {expected.0} else {expected.1},
                    actual:if tile.image.nrows() != expected.0 {tile.image.nrows()} else {tile.image.ncols()},
                    reason:"surface image does not match its roi resolution",
                }.into());
            }
            rects.push(layout.place(tile.geometry.top_left_degrees(),target_shape_xy(&tile.geometry,ppd)));
        }
        check_placements(&rects,canvas_shape_xy)?;

        let mut tiles = Vec::<(PixelRect,Array2<f64>)>::with_capacity(rects.len());
        for (i,(tile,rect)) in surface.tiles.iter().zip(rects).enumerate() {
            let leveled = match intensity.rescale_max {
                Some(max) => negative_rescale(tile.image.view(),max)?,
                None => offset_to_zero(tile.image.view())?,
            };
            let resampled = resample(leveled.view(),rect.rows,rect.cols)?;
            debug!(tile = i,factor_x = downsample_factor_xy(&tile.geometry,ppd).0,rows = rect.rows,cols = rect.cols,"surface tile resampled");
            tiles.push((rect,resampled));
        }
        Ok(Self {canvas_shape_xy,tiles})
    }

    pub fn n_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Pastes every tile onto a plane of the canvas shape the tiles were prepared for.
    pub fn overlay<S:DataMut<Elem=f64>>(&self,plane:&mut ArrayBase<S,Ix2>) -> Result<(),StitchError> {
        let (rows,cols) = xy_to_row_col(self.canvas_shape_xy);
        let (r,c) = plane.dim();
        if (r,c) != (rows,cols) {
            return Err(ShapeMismatchError {
                shape:[1,r,c],
                axis:if r != rows {1} else {2},
                expected:if r != rows {rows} else {cols},
                actual:if r != rows {r} else {c},
                reason:"plane does not have the canvas shape the surface was prepared for",
            }.into());
        }
        for (rect,image) in &self.tiles {
            paste(plane,image.view(),rect);
        }
        Ok(())
    }
}

/// Overlays every surface tile on a copy of the stitched canvas.
pub fn composite(canvas:ArrayView2<f64>,layout:&ValidatedLayout,surface:&SurfaceCapture,intensity:&SurfaceIntensity) -> Result<Array2<f64>,StitchError> {
    let (rows,cols) = canvas.dim();
    let prepared = PreparedSurface::new((cols,rows),layout,surface,intensity)?;
    let mut out = canvas.to_owned();
    prepared.overlay(&mut out)?;
    info!(n_tiles = prepared.n_tiles(),"surface composited");
    Ok(out)
}
