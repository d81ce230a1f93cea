use std::collections::HashMap;
use mroi_data::averaging::{average_repeats, AveragingPolicy, RepeatDims};
use mroi_data::image_tools::{align_line_phase, estimate_line_phase};
use mroi_data::error::DataError;
use mroi_data::quality::QualityReport;
use mroi_data::raw::{RawStack, RawVisitor, Sample};
use ndarray::{Array3, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use si_header::layout::AcquisitionLayout;
use tracing::{info, warn};
use utils::{plane_label, vec_to_string};
use crate::error::StitchError;
use crate::geometry::PixelRect;
use crate::reconcile::reconcile;
use crate::stitch_config::StitchSettings;
use crate::stitcher::{roi_placements, stitch};
use crate::surface::{PreparedSurface, SurfaceCapture};
use crate::validate::{validate, DerivedGeometry};

/// The acquisition layout together with everything the pipeline worked out about it.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct EnrichedLayout {
    pub acquisition:AcquisitionLayout,
    pub derived:DerivedGeometry,
    pub gap:usize,
    pub canvas_shape_xy:(usize,usize),
    pub roi_rects:Vec<PixelRect>,
    pub averaging:AveragingPolicy,
    /// z of every output plane, None where slices were averaged together
    pub plane_z:Vec<Option<f64>>,
    /// bidirectional offset removed from every plane, empty when no correction ran
    pub line_phase:Vec<i64>,
    pub surface_tiles:usize,
}

impl EnrichedLayout {
    pub fn n_planes(&self) -> usize {
        self.plane_z.len()
    }

    pub fn to_json(&self) -> Result<String,serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_hash(&self) -> HashMap<String,String> {
        let mut h = self.acquisition.to_hash();
        let d = &self.derived;
        h.insert(String::from("pixel_per_degree_xy"),format!("{} {}",d.pixel_per_degree_xy.0,d.pixel_per_degree_xy.1));
        h.insert(String::from("canvas_origin_degrees"),format!("{} {}",d.canvas_origin_degrees.0,d.canvas_origin_degrees.1));
        h.insert(String::from("gap"),self.gap.to_string());
        h.insert(String::from("canvas_shape_xy"),format!("{} {}",self.canvas_shape_xy.0,self.canvas_shape_xy.1));
        h.insert(String::from("average_frames_per_slice"),self.averaging.average_frames_per_slice.to_string());
        h.insert(String::from("average_volumes"),self.averaging.average_volumes.to_string());
        h.insert(String::from("average_slices"),self.averaging.average_slices.to_string());
        h.insert(String::from("n_planes"),self.n_planes().to_string());
        h.insert(String::from("surface_tiles"),self.surface_tiles.to_string());
        for (i,r) in self.roi_rects.iter().enumerate() {
            h.insert(format!("roi{}_canvas_row_col",i),format!("{} {}",r.row,r.col));
        }
        let n = self.n_planes();
        for (i,z) in self.plane_z.iter().enumerate() {
            let z = match z {
                Some(z) => z.to_string(),
                None => String::from("averaged")
            };
            h.insert(format!("{}_z",plane_label(i,n)),z);
        }
        if !self.line_phase.is_empty() {
            h.insert(String::from("line_phase"),vec_to_string(&self.line_phase));
        }
        h
    }

    /// key=value lines sorted by key
    pub fn to_txt(&self) -> String {
        let h = self.to_hash();
        let mut keys:Vec<&String> = h.keys().collect();
        keys.sort();
        let mut strbuf = String::new();
        for key in keys {
            strbuf.push_str(key);
            strbuf.push('=');
            strbuf.push_str(&h[key]);
            strbuf.push('\n');
        }
        strbuf
    }
}

/// Stitched planes (planes, height_y, width_x) with their layout and a quality report per plane.
#[derive(Clone,Debug)]
pub struct FullField {
    pub planes:Array3<f64>,
    pub layout:EnrichedLayout,
    /// None for planes too small to measure
    pub quality:Vec<Option<QualityReport>>,
}

/// Runs validation, shape reconciliation, averaging, optional line-phase correction,
/// stitching and optional surface compositing on one acquisition.
pub fn stitch_full_field<T:Sample>(layout:&AcquisitionLayout,raw:ArrayView3<T>,surface:Option<&SurfaceCapture>,settings:&StitchSettings) -> Result<FullField,StitchError> {
    let validated = validate(layout)?;
    let sh = raw.shape();
    let reconciled = reconcile([sh[0],sh[1],sh[2]],&validated)?;
    info!(n_rois = validated.n_rois(),gap = reconciled.gap,"raw stack reconciled");

    let dims = RepeatDims::new(layout.num_volumes,layout.num_slices,layout.frames_per_slice);
    let mut averaged = average_repeats(raw,dims,&settings.averaging)?;
    info!(n_planes = averaged.len_of(Axis(0)),"repeats averaged");

    let mut line_phase = Vec::<i64>::new();
    if settings.correct_line_phase {
        for mut plane in averaged.outer_iter_mut() {
            let offset = estimate_line_phase(plane.view());
            if offset != 0 {
                let aligned = align_line_phase(plane.view(),offset);
                plane.assign(&aligned);
            }
            line_phase.push(offset);
        }
        info!(offsets = %vec_to_string(&line_phase),"line phase corrected");
    }

    let mut planes = stitch(averaged.view(),&validated,&reconciled)?;
    info!(canvas_x = reconciled.canvas_shape_xy.0,canvas_y = reconciled.canvas_shape_xy.1,"planes stitched");

    let surface_tiles = match surface {
        Some(capture) => {
            let prepared = PreparedSurface::new(reconciled.canvas_shape_xy,&validated,capture,&settings.surface)?;
            for mut plane in planes.outer_iter_mut() {
                prepared.overlay(&mut plane)?;
            }
            info!(n_tiles = prepared.n_tiles(),"surface composited");
            prepared.n_tiles()
        }
        None => 0
    };

    let quality = planes.outer_iter().enumerate()
        .map(|(i,plane)| match QualityReport::measure(plane,settings.quality_block.as_ref()) {
            Ok(report) => Ok(Some(report)),
            Err(DataError::TooSmall {shape,reason}) => {
                warn!(plane = i,rows = shape[0],cols = shape[1],reason,"quality metrics skipped");
                Ok(None)
            }
            Err(e) => Err(e)
        })
        .collect::<Result<Vec<Option<QualityReport>>,_>>()?;

    let out_dims = settings.averaging.output_dims(dims);
    let plane_z = (0..out_dims.n_frames()).map(|i|{
        let (_,slice,_) = out_dims.decompose(i);
        match settings.averaging.average_slices {
            true => None,
            false => layout.all_zs.get(slice).copied()
        }
    }).collect();

    let enriched = EnrichedLayout {
        acquisition:layout.clone(),
        derived:*validated.derived(),
        gap:reconciled.gap,
        canvas_shape_xy:reconciled.canvas_shape_xy,
        roi_rects:roi_placements(&validated,&reconciled)?,
        averaging:settings.averaging,
        plane_z,
        line_phase,
        surface_tiles,
    };

    Ok(FullField {
        planes,
        layout:enriched,
        quality,
    })
}

struct StitchVisitor<'a> {
    layout:&'a AcquisitionLayout,
    surface:Option<&'a SurfaceCapture>,
    settings:&'a StitchSettings,
}

impl RawVisitor for StitchVisitor<'_> {
    type Output = Result<FullField,StitchError>;
    fn visit<T:Sample>(self,raw:ArrayView3<T>) -> Self::Output {
        stitch_full_field(self.layout,raw,self.surface,self.settings)
    }
}

/// [`stitch_full_field`] for a decoded stack of any sample type.
pub fn stitch_raw_stack(layout:&AcquisitionLayout,raw:&RawStack,surface:Option<&SurfaceCapture>,settings:&StitchSettings) -> Result<FullField,StitchError> {
    raw.with_view(StitchVisitor {layout,surface,settings})
}
