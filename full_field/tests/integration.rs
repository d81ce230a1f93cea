use byteorder::{ByteOrder, LittleEndian};
use full_field::error::{LayoutError, StitchError};
use full_field::pipeline::{stitch_full_field, stitch_raw_stack};
use full_field::reconcile::reconcile;
use full_field::stitch_config::{Config, StitchSettings};
use full_field::stitcher::stitch;
use full_field::surface::{downsample_factor_xy, target_shape_xy, SurfaceCapture};
use full_field::validate::validate;
use mroi_data::averaging::{average_repeats, AveragingPolicy, RepeatDims};
use mroi_data::raw::{RawStack, SampleType};
use ndarray::{s, Array2, Array3, ArrayView2};
use rand::prelude::*;
use si_header::layout::{AcquisitionLayout, RoiGeometry, StackType};
use si_header::metadata::ScanImageMetadata;

fn layout_with(rois:Vec<RoiGeometry>,num_volumes:usize) -> AcquisitionLayout {
    AcquisitionLayout {
        num_slices:1,
        num_volumes,
        z_step:0.0,
        all_zs:vec![0.0],
        frames_per_slice:1,
        channel_save:vec![1],
        stack_type:StackType::Uniform,
        rois,
    }
}

/// six 512x128 strips, 5 degrees wide, tiled along x
fn six_strips() -> Vec<RoiGeometry> {
    (0..6).map(|i| RoiGeometry::new((512,128),(5.0,1.25),(2.5 + 5.0*i as f64,0.0))).collect()
}

/// cut every roi rectangle out of a canvas and stack the blocks with `gap` blank rows between them
fn unstitch(canvas:&Array2<f64>,rois:&[RoiGeometry],ppd:f64,origin:(f64,f64),gap:usize) -> Array3<f64> {
    let (res_x,res_y) = rois[0].pixel_resolution_xy;
    let n = rois.len();
    let mut raw = Array3::<f64>::zeros((1,res_y*n + gap*(n - 1),res_x));
    for (i,roi) in rois.iter().enumerate() {
        let tl = roi.top_left_degrees();
        let col = ((tl.0 - origin.0)*ppd).round() as usize;
        let row = ((tl.1 - origin.1)*ppd).round() as usize;
        let start = i*(res_y + gap);
        raw.slice_mut(s![0,start..start + res_y,..]).assign(&canvas.slice(s![row..row + res_y,col..col + res_x]));
    }
    raw
}


#[test]
fn six_strip_scenario(){
    let layout = layout_with(six_strips(),1);
    let raw = Array3::from_shape_fn((1,888,512),|(_,r,c)| (r*512 + c) as u32);
    let ff = stitch_full_field(&layout,raw.view(),None,&StitchSettings::default()).unwrap();
    assert_eq!(ff.layout.gap,24);
    assert_eq!(ff.layout.canvas_shape_xy,(3072,128));
    assert_eq!(ff.planes.shape(),&[1,128,3072]);
    for (i,rect) in ff.layout.roi_rects.iter().enumerate() {
        assert_eq!((rect.row,rect.col,rect.rows,rect.cols),(0,512*i as i64,128,512));
        let src_row = i*(128 + 24);
        assert_eq!(ff.planes[[0,0,512*i]],(src_row*512) as f64);
        assert_eq!(ff.planes[[0,127,512*i + 511]],((src_row + 127)*512 + 511) as f64);
    }
}

#[test]
fn round_trip_through_inverse(){
    let rois = six_strips();
    let layout = layout_with(rois.clone(),1);
    let mut rng = StdRng::seed_from_u64(3);
    let canvas = Array2::from_shape_fn((128,3072),|_| rng.gen_range(0.0..1000.0));
    for gap in [0,7,24] {
        let raw = unstitch(&canvas,&rois,102.4,(0.0,-0.625),gap);
        let validated = validate(&layout).unwrap();
        let sh = raw.shape();
        let rec = reconcile([sh[0],sh[1],sh[2]],&validated).unwrap();
        assert_eq!(rec.gap,gap);
        let out = stitch(raw.view(),&validated,&rec).unwrap();
        assert_eq!(out.slice(s![0,..,..]),canvas);
    }
}

#[test]
fn single_roi_is_unchanged(){
    // off-origin center, the canvas is the roi itself
    let layout = layout_with(vec![RoiGeometry::new((64,32),(4.0,2.0),(10.0,-3.0))],1);
    let raw = Array3::from_shape_fn((1,32,64),|(_,r,c)| (r*64 + c) as f64);
    let ff = stitch_full_field(&layout,raw.view(),None,&StitchSettings::default()).unwrap();
    assert_eq!(ff.layout.gap,0);
    assert_eq!(ff.planes,raw);
}

#[test]
fn averaging_collapsed_stack_is_a_no_op(){
    let raw = Array3::from_shape_fn((1,16,8),|(_,r,c)| (r*c) as f64 + 0.25);
    let dims = RepeatDims::new(1,1,1);
    let once = average_repeats(raw.view(),dims,&AveragingPolicy::default()).unwrap();
    let twice = average_repeats(once.view(),dims,&AveragingPolicy::default()).unwrap();
    assert_eq!(once,raw);
    assert_eq!(twice,once);
}

#[test]
fn one_extra_row_is_rejected(){
    let layout = layout_with(six_strips(),1);
    for rows in [887,889] {
        let raw = Array3::<u16>::zeros((1,rows,512));
        match stitch_full_field(&layout,raw.view(),None,&StitchSettings::default()) {
            Err(StitchError::Shape(e)) => assert_eq!((e.axis,e.actual),(1,rows)),
            other => panic!("unexpected {:?}",other.map(|f| f.layout))
        }
    }
    let single = layout_with(vec![RoiGeometry::new((512,128),(5.0,1.25),(0.0,0.0))],1);
    let raw = Array3::<u16>::zeros((1,129,512));
    assert!(matches!(stitch_full_field(&single,raw.view(),None,&StitchSettings::default()),Err(StitchError::Shape(_))));
}

#[test]
fn one_pixel_resolution_mismatch(){
    let mut rois = six_strips();
    rois[4].pixel_resolution_xy = (512,127);
    let err = validate(&layout_with(rois,1)).unwrap_err();
    assert_eq!(err,LayoutError::ResolutionMismatch {first:0,second:4,first_xy:(512,128),second_xy:(512,127)});
    let msg = err.to_string();
    assert!(msg.contains("roi 0") && msg.contains("roi 4"));
}

#[test]
fn noise_converges_with_volume_count(){
    let rois = vec![RoiGeometry::new((16,16),(1.0,1.0),(0.0,0.0))];
    let truth = Array2::from_shape_fn((16,16),|(r,c)| 100.0 + (r*16 + c) as f64);
    let mut rng = StdRng::seed_from_u64(11);
    let mut max_error = |volumes:usize| -> f64 {
        let layout = layout_with(rois.clone(),volumes);
        let raw = Array3::from_shape_fn((volumes,16,16),|(_,r,c)| truth[[r,c]] + rng.gen_range(-10.0..10.0));
        let ff = stitch_full_field(&layout,raw.view(),None,&StitchSettings::default()).unwrap();
        (&ff.planes.slice(s![0,..,..]) - &truth).iter().fold(0.0,|m:f64,e| m.max(e.abs()))
    };
    let e10 = max_error(10);
    let e1000 = max_error(1000);
    assert!(e10 < 10.0);
    assert!(e1000 < e10);
    assert!(e1000 < 1.5);
}

#[test]
fn surface_at_half_density(){
    // two 512x512 rois side by side, surface over the second one at 256x256
    let rois = vec![
        RoiGeometry::new((512,512),(5.0,5.0),(2.5,2.5)),
        RoiGeometry::new((512,512),(5.0,5.0),(7.5,2.5)),
    ];
    let layout = layout_with(rois,1);
    let surface_geometry = RoiGeometry::new((256,256),(5.0,5.0),(7.5,2.5));
    assert_eq!(downsample_factor_xy(&surface_geometry,(102.4,102.4)),(0.5,0.5));
    assert_eq!(target_shape_xy(&surface_geometry,(102.4,102.4)),(512,512));

    let surface_image = Array2::from_shape_fn((256,256),|(r,c)| 50.0 + ((r + c) % 7) as f64);
    let surface = SurfaceCapture::single(surface_image,surface_geometry);
    let raw = Array3::<f64>::from_elem((1,1024,512),500.0);
    let ff = stitch_full_field(&layout,raw.view(),Some(&surface),&StitchSettings::default()).unwrap();
    assert_eq!(ff.layout.surface_tiles,1);
    assert_eq!(ff.planes.shape(),&[1,512,1024]);
    // left roi untouched, right roi replaced by the min-subtracted surface
    assert_eq!(ff.planes[[0,300,511]],500.0);
    let right: ArrayView2<f64> = ff.planes.slice(s![0,..,512..]);
    assert!(right.iter().all(|v| *v >= 0.0 && *v <= 6.0));
    // corners land on the first and last surface samples
    assert_eq!(right[[0,0]],0.0);
    assert_eq!(right[[511,511]],((255 + 255) % 7) as f64);
}

#[test]
fn metadata_to_full_field(){
    let header = "\
SI.hChannels.channelSave = 1
SI.hStackManager.actualNumSlices = 1
SI.hStackManager.actualNumVolumes = 2
SI.hStackManager.actualStackZStepSize = 0
SI.hStackManager.framesPerSlice = 2
SI.hStackManager.stackDefinition = 'bounded'
SI.hStackManager.zsAllActuators = -100
";
    let roi = |cx:f64| format!(r#"{{"discretePlaneMode":false,"scanfields":{{"pixelResolutionXY":[8,4],"sizeXY":[2.0,1.0],"centerXY":[{},0.5]}}}}"#,cx);
    let json = format!(r#"{{"RoiGroups":{{"imagingRoiGroup":{{"rois":[{},{}]}}}}}}"#,roi(1.0),roi(3.0));
    let layout = ScanImageMetadata::from_header(header,&json).unwrap().layout().unwrap();
    assert_eq!(layout.all_zs,vec![-100.0]);

    // 4 frames of 4 + 3 + 4 rows, written as little-endian i16
    let samples:Vec<i16> = (0..4*11*8).map(|i| ((i % 88) as i16) - 10).collect();
    let mut bytes = vec![0u8;samples.len()*2];
    LittleEndian::write_i16_into(&samples,&mut bytes);
    let raw = RawStack::from_le_bytes(&bytes,SampleType::I16,[4,11,8]).unwrap();

    let ff = stitch_raw_stack(&layout,&raw,None,&StitchSettings::default()).unwrap();
    assert_eq!(ff.layout.gap,3);
    assert_eq!(ff.planes.shape(),&[1,4,16]);
    assert_eq!(ff.planes[[0,0,0]],-10.0);
    // roi 1 starts at raw row 7
    assert_eq!(ff.planes[[0,0,8]],(7*8 - 10) as f64);
    assert_eq!(ff.quality.len(),1);
    assert!(ff.layout.to_txt().contains("stack_type=bounded\n"));
}
