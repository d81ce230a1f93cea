use ndarray::{s, Array2, Array3, ArrayBase, ArrayView2, ArrayView3, Axis, DataMut, Ix2};
use tracing::debug;
use crate::error::{ShapeMismatchError, StitchError};
use crate::geometry::{check_placements, xy_to_row_col, PixelRect};
use crate::reconcile::{expected_raw_shape, Reconciled};
use crate::validate::ValidatedLayout;

/// Canvas rectangles of every roi, in declaration order.
pub fn roi_placements(layout:&ValidatedLayout,reconciled:&Reconciled) -> Result<Vec<PixelRect>,StitchError> {
    let rects = layout.roi_rects();
    check_placements(&rects,reconciled.canvas_shape_xy)?;
    Ok(rects)
}

/// Rows of roi `index` inside a raw (or averaged) frame. The frame must have the reconciled shape.
pub(crate) fn roi_block(frame:ArrayView2<f64>,index:usize,roi_rows:usize,gap:usize) -> ArrayView2<f64> {
    let start = index*(roi_rows + gap);
    frame.slice_move(s![start..start + roi_rows,..])
}

/// Copies every roi block of one averaged frame to its place on a fresh canvas.
pub(crate) fn stitch_plane(frame:ArrayView2<f64>,layout:&ValidatedLayout,reconciled:&Reconciled,placements:&[PixelRect]) -> Array2<f64> {
    let (canvas_rows,canvas_cols) = xy_to_row_col(reconciled.canvas_shape_xy);
    let mut canvas = Array2::<f64>::zeros((canvas_rows,canvas_cols));
    let (_,roi_rows) = layout.roi_resolution_xy();
    for (i,rect) in placements.iter().enumerate() {
        let block = roi_block(frame,i,roi_rows,reconciled.gap);
        paste(&mut canvas,block,rect);
    }
    canvas
}

/// Stitch every plane of an averaged stack of shape (planes, raw rows, cols).
pub fn stitch(averaged:ArrayView3<f64>,layout:&ValidatedLayout,reconciled:&Reconciled) -> Result<Array3<f64>,StitchError> {
    let expected = expected_raw_shape(layout,reconciled.gap);
    let sh = averaged.shape();
    if let Some(axis) = (1..3).find(|&a| sh[a] != expected[a]) {
        return Err(ShapeMismatchError {
            shape:[sh[0],sh[1],sh[2]],
            axis,
            expected:expected[axis],
            actual:sh[axis],
            reason:"averaged frames do not have the reconciled shape",
        }.into());
    }
    let placements = roi_placements(layout,reconciled)?;
    for (i,rect) in placements.iter().enumerate() {
        debug!(roi = i,row = rect.row,col = rect.col,"roi placement");
    }
    let (canvas_rows,canvas_cols) = xy_to_row_col(reconciled.canvas_shape_xy);
    let mut out = Array3::<f64>::zeros((averaged.len_of(Axis(0)),canvas_rows,canvas_cols));
    for (frame,mut dest) in averaged.outer_iter().zip(out.outer_iter_mut()) {
        dest.assign(&stitch_plane(frame,layout,reconciled,&placements));
    }
    Ok(out)
}

/// Rectangles must have been checked against the canvas with [`check_placements`].
pub(crate) fn paste<S:DataMut<Elem=f64>>(canvas:&mut ArrayBase<S,Ix2>,block:ArrayView2<f64>,rect:&PixelRect) {
    let r0 = rect.row as usize;
    let c0 = rect.col as usize;
    canvas.slice_mut(s![r0..r0 + rect.rows,c0..c0 + rect.cols]).assign(&block);
}

#[cfg(test)]
mod tests {
    use super::*;
    use si_header::layout::{AcquisitionLayout, RoiGeometry, StackType};
    use crate::error::StitchError;
    use crate::reconcile::reconcile;
    use crate::validate::validate;

    fn layout(rois:Vec<RoiGeometry>) -> AcquisitionLayout {
        AcquisitionLayout {
            num_slices:1,
            num_volumes:1,
            z_step:0.0,
            all_zs:vec![0.0],
            frames_per_slice:1,
            channel_save:vec![1],
            stack_type:StackType::Uniform,
            rois,
        }
    }

    #[test]
    fn two_strips_side_by_side(){
        // 4x2 rois, 1 row gap
        let l = validate(&layout(vec![
            RoiGeometry::new((4,2),(4.0,2.0),(2.0,1.0)),
            RoiGeometry::new((4,2),(4.0,2.0),(6.0,1.0)),
        ])).unwrap();
        let raw = Array2::from_shape_fn((5,4),|(r,c)| (r*10 + c) as f64);
        let rec = reconcile([1,5,4],&l).unwrap();
        assert_eq!(rec.gap,1);
        assert_eq!(rec.canvas_shape_xy,(8,2));
        let placements = roi_placements(&l,&rec).unwrap();
        let canvas = stitch_plane(raw.view(),&l,&rec,&placements);
        assert_eq!(canvas.dim(),(2,8));
        assert_eq!(canvas[[0,0]],0.0);
        assert_eq!(canvas[[1,3]],13.0);
        // second roi starts after the gap row
        assert_eq!(canvas[[0,4]],30.0);
        assert_eq!(canvas[[1,7]],43.0);
    }

    #[test]
    fn vertical_stacking_uses_rows(){
        let l = validate(&layout(vec![
            RoiGeometry::new((3,2),(3.0,2.0),(1.5,1.0)),
            RoiGeometry::new((3,2),(3.0,2.0),(1.5,3.0)),
        ])).unwrap();
        let raw = Array2::from_shape_fn((4,3),|(r,c)| (r*3 + c) as f64);
        let rec = reconcile([1,4,3],&l).unwrap();
        assert_eq!(rec.canvas_shape_xy,(3,4));
        let placements = roi_placements(&l,&rec).unwrap();
        let canvas = stitch_plane(raw.view(),&l,&rec,&placements);
        assert_eq!(canvas,raw);
    }

    #[test]
    fn overlapping_rois_fail(){
        let l = validate(&layout(vec![
            RoiGeometry::new((4,2),(4.0,2.0),(2.0,1.0)),
            RoiGeometry::new((4,2),(4.0,2.0),(5.0,1.0)),
        ])).unwrap();
        let rec = reconcile([1,4,4],&l).unwrap();
        match roi_placements(&l,&rec) {
            Err(StitchError::Overlap(e)) => assert_eq!((e.first,e.second),(0,1)),
            other => panic!("unexpected {:?}",other)
        }
    }

    #[test]
    fn stack_must_match_the_reconciled_shape(){
        let l = validate(&layout(vec![
            RoiGeometry::new((4,4),(4.0,4.0),(2.0,2.0)),
            RoiGeometry::new((4,4),(4.0,4.0),(6.0,2.0)),
        ])).unwrap();
        let rec = reconcile([1,10,4],&l).unwrap();
        assert_eq!(rec.gap,2);
        let short = ndarray::Array3::<f64>::zeros((1,8,4));
        match stitch(short.view(),&l,&rec) {
            Err(StitchError::Shape(e)) => assert_eq!((e.axis,e.expected,e.actual),(1,10,8)),
            other => panic!("unexpected {:?}",other)
        }
        let narrow = ndarray::Array3::<f64>::zeros((1,10,3));
        assert!(matches!(stitch(narrow.view(),&l,&rec),Err(StitchError::Shape(e)) if e.axis == 2));
        let ok = ndarray::Array3::<f64>::zeros((1,10,4));
        assert_eq!(stitch(ok.view(),&l,&rec).unwrap().shape(),&[1,4,8]);
    }

    #[test]
    fn half_pixel_offset_roi_fits_its_canvas(){
        let size = 0.64823;
        let ppd = 512.0/size;
        let l = validate(&layout(vec![
            RoiGeometry::new((512,512),(size,size),(size/2.0,size/2.0)),
            RoiGeometry::new((512,512),(size,size),(1.5*size,size/2.0 + 0.5/ppd)),
        ])).unwrap();
        let rec = reconcile([1,1024,512],&l).unwrap();
        let placements = roi_placements(&l,&rec).unwrap();
        assert_eq!(rec.canvas_shape_xy,(1024,512 + placements[1].row as usize));
        let raw = ndarray::Array3::from_shape_fn((1,1024,512),|(_,r,_)| r as f64);
        let out = stitch(raw.view(),&l,&rec).unwrap();
        let r1 = placements[1].row as usize;
        assert_eq!(out[[0,r1,512]],512.0);
        assert_eq!(out[[0,r1 + 511,1023]],1023.0);
    }
}
