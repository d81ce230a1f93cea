use serde_json::Value;
use tracing::debug;
use crate::error::MetadataFieldError;
use crate::header::ScanImageHeader;
use crate::layout::{AcquisitionLayout, RoiGeometry, StackType};

pub const NUM_SLICES:&str = "SI.hStackManager.actualNumSlices";
pub const NUM_VOLUMES:&str = "SI.hStackManager.actualNumVolumes";
pub const Z_STEP:&str = "SI.hStackManager.actualStackZStepSize";
pub const ALL_ZS:&str = "SI.hStackManager.zsAllActuators";
pub const FRAMES_PER_SLICE:&str = "SI.hStackManager.framesPerSlice";
pub const CHANNEL_SAVE:&str = "SI.hChannels.channelSave";
pub const STACK_DEFINITION:&str = "SI.hStackManager.stackDefinition";
pub const ROIS:&str = "RoiGroups.imagingRoiGroup.rois";

/// The two halves of a ScanImage metadata record: the general settings and the roi group structure.
#[derive(Clone,Debug)]
pub struct ScanImageMetadata {
    pub general:Value,
    pub roi_data:Value,
}

impl ScanImageMetadata {

    pub fn new(general:Value,roi_data:Value) -> Self {
        Self {
            general,
            roi_data
        }
    }

    /// header text (key = value lines) plus the roi group json
    pub fn from_header(header_str:&str,roi_json:&str) -> Result<Self,MetadataFieldError> {
        let general = Value::Object(ScanImageHeader::parse(header_str));
        let roi_data:Value = serde_json::from_str(roi_json)?;
        Ok(Self::new(general,roi_data))
    }

    pub fn layout(&self) -> Result<AcquisitionLayout,MetadataFieldError> {
        extract_layout(&self.general,&self.roi_data)
    }
}

pub fn extract_layout(general:&Value,roi_data:&Value) -> Result<AcquisitionLayout,MetadataFieldError> {
    let num_slices = positive_count(lookup(general,NUM_SLICES)?,NUM_SLICES)?;
    let num_volumes = positive_count(lookup(general,NUM_VOLUMES)?,NUM_VOLUMES)?;
    let z_step = float(lookup(general,Z_STEP)?,Z_STEP)?;
    let all_zs = actuator_zs(lookup(general,ALL_ZS)?)?;
    let frames_per_slice = positive_count(lookup(general,FRAMES_PER_SLICE)?,FRAMES_PER_SLICE)?;
    let channel_save = channels(lookup(general,CHANNEL_SAVE)?)?;
    let stack_type = match lookup(general,STACK_DEFINITION)? {
        Value::String(s) => StackType::from_definition(s),
        _ => return Err(MetadataFieldError::malformed(STACK_DEFINITION,"string"))
    };

    let rois = roi_entries(lookup(roi_data,ROIS)?)?
        .iter()
        .enumerate()
        .map(|(i,roi)| roi_geometry(i,roi))
        .collect::<Result<Vec<RoiGeometry>,MetadataFieldError>>()?;

    debug!(num_slices,num_volumes,frames_per_slice,n_rois = rois.len(),"extracted acquisition layout");

    Ok(AcquisitionLayout {
        num_slices,
        num_volumes,
        z_step,
        all_zs,
        frames_per_slice,
        channel_save,
        stack_type,
        rois,
    })
}

/// Finds a dotted key either stored flat ("SI.hStackManager.x") or as nested objects.
pub fn lookup<'a>(record:&'a Value,key:&str) -> Result<&'a Value,MetadataFieldError> {
    if let Some(v) = record.get(key) {
        return Ok(v);
    }
    let mut current = record;
    for part in key.split('.') {
        current = current.get(part).ok_or_else(|| MetadataFieldError::missing(key))?;
    }
    Ok(current)
}

/// A single roi is written as an object rather than a one-element list. Both come back as a slice.
fn roi_entries(rois:&Value) -> Result<Vec<&Value>,MetadataFieldError> {
    let entries:Vec<&Value> = match rois {
        Value::Array(list) => list.iter().collect(),
        Value::Object(_) => {
            debug!("single roi stored as an object, normalizing to a list");
            vec![rois]
        }
        _ => return Err(MetadataFieldError::malformed(ROIS,"object or list of objects"))
    };
    if entries.is_empty() {
        return Err(MetadataFieldError::malformed(ROIS,"at least one roi"));
    }
    Ok(entries)
}

fn roi_geometry(index:usize,roi:&Value) -> Result<RoiGeometry,MetadataFieldError> {
    let key = |field:&str| format!("{}[{}].{}",ROIS,index,field);

    let discrete_key = key("discretePlaneMode");
    let discrete_plane_mode = match roi.get("discretePlaneMode") {
        Some(Value::Bool(b)) => *b,
        Some(v) => match v.as_f64() {
            Some(n) if n == 0.0 => false,
            Some(n) if n == 1.0 => true,
            _ => return Err(MetadataFieldError::malformed(&discrete_key,"0, 1 or a boolean"))
        }
        None => return Err(MetadataFieldError::missing(&discrete_key))
    };

    let scanfields_key = key("scanfields");
    let (scanfield,scanfield_count) = match roi.get("scanfields") {
        Some(sf @ Value::Object(_)) => (sf,1),
        Some(Value::Array(list)) => match list.first() {
            Some(first) => (first,list.len()),
            None => return Err(MetadataFieldError::malformed(&scanfields_key,"at least one scanfield"))
        }
        Some(_) => return Err(MetadataFieldError::malformed(&scanfields_key,"object or list of objects")),
        None => return Err(MetadataFieldError::missing(&scanfields_key))
    };

    let (v,k) = scanfield_entry(scanfield,&scanfields_key,"pixelResolutionXY")?;
    let pixel_resolution_xy = usize_pair(v,&k)?;
    let (v,k) = scanfield_entry(scanfield,&scanfields_key,"sizeXY")?;
    let size_xy_degrees = float_pair(v,&k)?;
    let (v,k) = scanfield_entry(scanfield,&scanfields_key,"centerXY")?;
    let center_xy_degrees = float_pair(v,&k)?;

    let name = roi.get("name").and_then(|n| n.as_str()).map(|n| n.to_string());

    Ok(RoiGeometry {
        name,
        pixel_resolution_xy,
        size_xy_degrees,
        center_xy_degrees,
        discrete_plane_mode,
        scanfield_count,
    })
}

fn scanfield_entry<'a>(scanfield:&'a Value,prefix:&str,name:&str) -> Result<(&'a Value,String),MetadataFieldError> {
    let key = format!("{}.{}",prefix,name);
    match scanfield.get(name) {
        Some(v) => Ok((v,key)),
        None => Err(MetadataFieldError::missing(&key))
    }
}

fn integer(v:&Value) -> Option<i64> {
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    // matlab writes every number as a double
    match v.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(f as i64),
        _ => None
    }
}

fn positive_count(v:&Value,key:&str) -> Result<usize,MetadataFieldError> {
    match integer(v) {
        Some(i) if i > 0 => Ok(i as usize),
        _ => Err(MetadataFieldError::malformed(key,"positive integer"))
    }
}

fn float(v:&Value,key:&str) -> Result<f64,MetadataFieldError> {
    v.as_f64().ok_or_else(|| MetadataFieldError::malformed(key,"number"))
}

fn usize_pair(v:&Value,key:&str) -> Result<(usize,usize),MetadataFieldError> {
    let err = || MetadataFieldError::malformed(key,"pair of non-negative integers");
    match v.as_array() {
        Some(a) if a.len() == 2 => {
            let x = integer(&a[0]).filter(|x| *x >= 0).ok_or_else(err)?;
            let y = integer(&a[1]).filter(|y| *y >= 0).ok_or_else(err)?;
            Ok((x as usize,y as usize))
        }
        _ => Err(err())
    }
}

fn float_pair(v:&Value,key:&str) -> Result<(f64,f64),MetadataFieldError> {
    let err = || MetadataFieldError::malformed(key,"pair of numbers");
    match v.as_array() {
        Some(a) if a.len() == 2 => {
            let x = a[0].as_f64().ok_or_else(err)?;
            let y = a[1].as_f64().ok_or_else(err)?;
            Ok((x,y))
        }
        _ => Err(err())
    }
}

/// channelSave is a scalar when one channel is saved and a (row or column) vector otherwise
fn channels(v:&Value) -> Result<Vec<u32>,MetadataFieldError> {
    let err = || MetadataFieldError::malformed(CHANNEL_SAVE,"integer or list of integers");
    let mut out = Vec::<u32>::new();
    let mut stack = vec![v];
    while let Some(item) = stack.pop() {
        match item {
            Value::Array(list) => list.iter().rev().for_each(|x| stack.push(x)),
            other => {
                let c = integer(other).filter(|c| *c >= 0 && *c <= u32::MAX as i64).ok_or_else(err)?;
                out.push(c as u32);
            }
        }
    }
    Ok(out)
}

/// z of every slice. zsAllActuators has one row per slice and one column per actuator,
/// the second column is the fast-z actuator.
fn actuator_zs(v:&Value) -> Result<Vec<f64>,MetadataFieldError> {
    let err = || MetadataFieldError::malformed(ALL_ZS,"number, list of numbers or matrix");
    match v {
        Value::Array(rows) => rows.iter().map(|row| match row {
            Value::Array(cols) => cols.get(1).or_else(|| cols.first()).and_then(|z| z.as_f64()).ok_or_else(err),
            other => other.as_f64().ok_or_else(err)
        }).collect(),
        other => other.as_f64().map(|z| vec![z]).ok_or_else(err)
    }
}
