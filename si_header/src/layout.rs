use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use utils::vec_to_string;

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub enum StackType {
    Uniform,
    Bounded,
    Other(String),
}

impl StackType {
    pub fn from_definition(definition:&str) -> Self {
        match definition.trim().to_lowercase().as_str() {
            "uniform" => StackType::Uniform,
            "bounded" => StackType::Bounded,
            _ => StackType::Other(definition.trim().to_string())
        }
    }

    pub fn print(&self) -> String {
        match &self {
            StackType::Uniform => String::from("uniform"),
            StackType::Bounded => String::from("bounded"),
            StackType::Other(s) => s.clone(),
        }
    }
}

/// Geometry of one imaging roi, taken from its (first) scanfield.
/// Degrees are scan angles, X is the fast (line) axis.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct RoiGeometry {
    pub name:Option<String>,
    pub pixel_resolution_xy:(usize,usize),
    pub size_xy_degrees:(f64,f64),
    pub center_xy_degrees:(f64,f64),
    pub discrete_plane_mode:bool,
    pub scanfield_count:usize,
}

impl RoiGeometry {
    /// a plain single-scanfield roi
    pub fn new(pixel_resolution_xy:(usize,usize),size_xy_degrees:(f64,f64),center_xy_degrees:(f64,f64)) -> Self {
        Self {
            name:None,
            pixel_resolution_xy,
            size_xy_degrees,
            center_xy_degrees,
            discrete_plane_mode:false,
            scanfield_count:1,
        }
    }

    pub fn top_left_degrees(&self) -> (f64,f64) {
        (self.center_xy_degrees.0 - self.size_xy_degrees.0/2.0,
         self.center_xy_degrees.1 - self.size_xy_degrees.1/2.0)
    }

    pub fn bottom_right_degrees(&self) -> (f64,f64) {
        (self.center_xy_degrees.0 + self.size_xy_degrees.0/2.0,
         self.center_xy_degrees.1 + self.size_xy_degrees.1/2.0)
    }

    pub fn pixel_per_degree_xy(&self) -> (f64,f64) {
        (self.pixel_resolution_xy.0 as f64/self.size_xy_degrees.0,
         self.pixel_resolution_xy.1 as f64/self.size_xy_degrees.1)
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct AcquisitionLayout {
    pub num_slices:usize,
    pub num_volumes:usize,
    pub z_step:f64,
    pub all_zs:Vec<f64>,
    pub frames_per_slice:usize,
    pub channel_save:Vec<u32>,
    pub stack_type:StackType,
    pub rois:Vec<RoiGeometry>,
}

impl AcquisitionLayout {
    pub fn n_rois(&self) -> usize {
        self.rois.len()
    }

    /// number of frames the raw stack holds along its leading axis
    pub fn n_frames(&self) -> usize {
        self.num_slices*self.num_volumes*self.frames_per_slice
    }

    pub fn to_hash(&self) -> HashMap<String,String> {
        let mut h = HashMap::<String,String>::new();
        h.insert(String::from("num_slices"),self.num_slices.to_string());
        h.insert(String::from("num_volumes"),self.num_volumes.to_string());
        h.insert(String::from("z_step"),self.z_step.to_string());
        h.insert(String::from("all_zs"),vec_to_string(&self.all_zs));
        h.insert(String::from("frames_per_slice"),self.frames_per_slice.to_string());
        h.insert(String::from("channel_save"),vec_to_string(&self.channel_save));
        h.insert(String::from("stack_type"),self.stack_type.print());
        h.insert(String::from("n_rois"),self.n_rois().to_string());
        for (i,roi) in self.rois.iter().enumerate() {
            h.insert(format!("roi{}_pixel_resolution_xy",i),format!("{} {}",roi.pixel_resolution_xy.0,roi.pixel_resolution_xy.1));
            h.insert(format!("roi{}_size_xy",i),format!("{} {}",roi.size_xy_degrees.0,roi.size_xy_degrees.1));
            h.insert(format!("roi{}_center_xy",i),format!("{} {}",roi.center_xy_degrees.0,roi.center_xy_degrees.1));
            if let Some(name) = &roi.name {
                h.insert(format!("roi{}_name",i),name.clone());
            }
        }
        h
    }
}
