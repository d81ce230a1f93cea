use ndarray::{s, Array3, ArrayView2, ArrayView3, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::DataError;
use crate::raw::{RawStack, RawVisitor, Sample};

/// Which repeated dimensions of a stack get collapsed by their mean.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub struct AveragingPolicy {
    pub average_frames_per_slice:bool,
    pub average_volumes:bool,
    pub average_slices:bool,
}

impl Default for AveragingPolicy {
    /// average everything that repeats, one image per roi row layout
    fn default() -> Self {
        Self {
            average_frames_per_slice:true,
            average_volumes:true,
            average_slices:true,
        }
    }
}

impl AveragingPolicy {
    /// keep every frame
    pub fn none() -> Self {
        Self {
            average_frames_per_slice:false,
            average_volumes:false,
            average_slices:false,
        }
    }

    /// the repeat structure left over once this policy is applied
    pub fn output_dims(&self,dims:RepeatDims) -> RepeatDims {
        RepeatDims {
            volumes:if self.average_volumes {1} else {dims.volumes},
            slices:if self.average_slices {1} else {dims.slices},
            frames_per_slice:if self.average_frames_per_slice {1} else {dims.frames_per_slice},
        }
    }

    fn output_plane(&self,dims:RepeatDims,frame:usize) -> usize {
        let (v,s,f) = dims.decompose(frame);
        let out = self.output_dims(dims);
        let v = if self.average_volumes {0} else {v};
        let s = if self.average_slices {0} else {s};
        let f = if self.average_frames_per_slice {0} else {f};
        out.frame_index(v,s,f)
    }
}

/// Repeat structure of the leading axis of a raw stack. Frames are stored volume-major,
/// then slice, then frame within the slice.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub struct RepeatDims {
    pub volumes:usize,
    pub slices:usize,
    pub frames_per_slice:usize,
}

impl RepeatDims {
    pub fn new(volumes:usize,slices:usize,frames_per_slice:usize) -> Self {
        Self {
            volumes,
            slices,
            frames_per_slice
        }
    }

    pub fn n_frames(&self) -> usize {
        self.volumes*self.slices*self.frames_per_slice
    }

    pub fn frame_index(&self,volume:usize,slice:usize,frame:usize) -> usize {
        (volume*self.slices + slice)*self.frames_per_slice + frame
    }

    /// (volume, slice, frame) of a leading-axis index
    pub fn decompose(&self,index:usize) -> (usize,usize,usize) {
        let frame = index % self.frames_per_slice;
        let slice = (index/self.frames_per_slice) % self.slices;
        let volume = index/(self.frames_per_slice*self.slices);
        (volume,slice,frame)
    }
}

/// Running per-plane sums in double precision. Frames can be pushed one at a time so the
/// repeats never have to be in memory together.
pub struct MeanAccumulator {
    sums:Array3<f64>,
    counts:Vec<usize>,
}

impl MeanAccumulator {

    pub fn new(n_planes:usize,rows:usize,cols:usize) -> Self {
        Self {
            sums:Array3::zeros((n_planes,rows,cols)),
            counts:vec![0;n_planes],
        }
    }

    pub fn push<T:Sample>(&mut self,plane:usize,frame:ArrayView2<T>) -> Result<(),DataError> {
        let n_planes = self.counts.len();
        if plane >= n_planes {
            return Err(DataError::PlaneIndex {plane,n_planes});
        }
        let sh = self.sums.shape();
        let expected = [sh[1],sh[2]];
        let actual = [frame.nrows(),frame.ncols()];
        if expected != actual {
            return Err(DataError::FrameShape {expected,actual});
        }
        Zip::from(self.sums.slice_mut(s![plane,..,..]))
            .and(&frame)
            .for_each(|acc,&x| *acc += x.into());
        self.counts[plane] += 1;
        Ok(())
    }

    /// Divides the sums by their counts. Every plane has to have seen the same number of frames,
    /// which is what makes the single pass equal to collapsing one dimension after the other.
    pub fn finish(self) -> Result<Array3<f64>,DataError> {
        let MeanAccumulator {mut sums,counts} = self;
        let expected = counts.first().copied().unwrap_or(0);
        for (plane,&count) in counts.iter().enumerate() {
            if count == 0 || count != expected {
                return Err(DataError::UnevenRepeats {plane,count,expected});
            }
        }
        sums.outer_iter_mut().zip(counts.iter()).for_each(|(mut plane,&count)|{
            let inv = 1.0/count as f64;
            plane.mapv_inplace(|x| x*inv);
        });
        Ok(sums)
    }
}

/// Collapse the repeated dimensions of a raw stack selected by `policy`.
/// Returns (planes, rows, cols) with planes ordered volume, slice, frame like the input.
pub fn average_repeats<T:Sample>(raw:ArrayView3<T>,dims:RepeatDims,policy:&AveragingPolicy) -> Result<Array3<f64>,DataError> {
    let n_frames = raw.shape()[0];
    if n_frames != dims.n_frames() {
        return Err(DataError::FrameCount {expected:dims.n_frames(),actual:n_frames});
    }
    let out = policy.output_dims(dims);
    debug!(n_frames,n_planes = out.n_frames(),"averaging repeats");
    let mut acc = MeanAccumulator::new(out.n_frames(),raw.shape()[1],raw.shape()[2]);
    for (index,frame) in raw.outer_iter().enumerate() {
        acc.push(policy.output_plane(dims,index),frame)?;
    }
    acc.finish()
}

struct AverageVisitor<'a> {
    dims:RepeatDims,
    policy:&'a AveragingPolicy,
}

impl RawVisitor for AverageVisitor<'_> {
    type Output = Result<Array3<f64>,DataError>;
    fn visit<T:Sample>(self,raw:ArrayView3<T>) -> Self::Output {
        average_repeats(raw,self.dims,self.policy)
    }
}

impl RawStack {
    pub fn average(&self,dims:RepeatDims,policy:&AveragingPolicy) -> Result<Array3<f64>,DataError> {
        self.with_view(AverageVisitor {dims,policy})
    }
}
