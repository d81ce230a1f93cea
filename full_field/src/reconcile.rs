use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::ShapeMismatchError;
use crate::validate::ValidatedLayout;

/// What the raw stack shape tells us beyond the metadata.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub struct Reconciled {
    /// padding rows between consecutive roi blocks
    pub gap:usize,
    pub canvas_shape_xy:(usize,usize),
}

/// Raw shape [frames, rows, cols] a layout implies for a given gap.
pub fn expected_raw_shape(layout:&ValidatedLayout,gap:usize) -> [usize;3] {
    let (res_x,res_y) = layout.roi_resolution_xy();
    let n = layout.n_rois();
    [layout.layout().n_frames(),res_y*n + gap*(n - 1),res_x]
}

/// Checks the raw shape against the layout and solves for the gap.
pub fn reconcile(raw_shape:[usize;3],layout:&ValidatedLayout) -> Result<Reconciled,ShapeMismatchError> {
    let mismatch = |axis:usize,expected:usize,reason:&'static str| ShapeMismatchError {
        shape:raw_shape,
        axis,
        expected,
        actual:raw_shape[axis],
        reason,
    };
    let n_frames = layout.layout().n_frames();
    if raw_shape[0] != n_frames {
        return Err(mismatch(0,n_frames,"frame count is slices*volumes*frames per slice"));
    }
    let (res_x,res_y) = layout.roi_resolution_xy();
    if raw_shape[2] != res_x {
        return Err(mismatch(2,res_x,"pixels per line must equal the roi x resolution"));
    }

    let n = layout.n_rois();
    let rows = raw_shape[1];
    let roi_rows = res_y*n;
    let gap = match n {
        1 => {
            if rows != res_y {
                return Err(mismatch(1,res_y,"a single roi has no gap"));
            }
            0
        }
        _ => {
            if rows < roi_rows {
                return Err(mismatch(1,roi_rows,"fewer rows than the rois need"));
            }
            let padding = rows - roi_rows;
            if padding % (n - 1) != 0 {
                // closest row count with a whole gap
                let expected = roi_rows + (padding/(n - 1))*(n - 1);
                return Err(mismatch(1,expected,"padding rows do not split into equal gaps"));
            }
            padding/(n - 1)
        }
    };

    let canvas_shape_xy = layout.canvas_extent_xy();
    debug!(gap,canvas_x = canvas_shape_xy.0,canvas_y = canvas_shape_xy.1,"reconciled raw shape");
    Ok(Reconciled {
        gap,
        canvas_shape_xy,
    })
}
