use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::error::DataError;

/// numpy-style percentile (linear interpolation between the closest ranks)
pub fn percentile(image:ArrayView2<f64>,p:f64) -> Result<f64,DataError> {
    if image.is_empty() {
        return Err(DataError::EmptyImage);
    }
    let mut v = image.iter().cloned().collect::<Vec<f64>>();
    v.sort_by(|a,b| a.total_cmp(b));
    let pos = (p.clamp(0.0,100.0)/100.0)*(v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Ok(v[lo] + (v[hi] - v[lo])*(pos - lo as f64))
}

/// (p_max - p_min)/(p_max + p_min)
pub fn contrast(image:ArrayView2<f64>,percentile_max:f64,percentile_min:f64) -> Result<f64,DataError> {
    let i_max = percentile(image,percentile_max)?;
    let i_min = percentile(image,percentile_min)?;
    let denom = i_max + i_min;
    if denom == 0.0 {
        warn!(i_max,i_min,"percentiles sum to zero, contrast set to 0");
        return Ok(0.0);
    }
    Ok((i_max - i_min)/denom)
}

/// Central differences in the interior, one-sided at the borders.
fn gradient_1d(line:&[f64],out:&mut [f64]) {
    let n = line.len();
    out[0] = line[1] - line[0];
    out[n-1] = line[n-1] - line[n-2];
    for i in 1..n-1 {
        out[i] = (line[i+1] - line[i-1])/2.0;
    }
}

/// Sharpness: mean of the squared gradient magnitude.
pub fn acutance(image:ArrayView2<f64>) -> Result<f64,DataError> {
    let (rows,cols) = image.dim();
    if rows < 2 || cols < 2 {
        return Err(DataError::TooSmall {shape:[rows,cols],reason:"gradient needs two samples per axis"});
    }
    let mut sq = Array2::<f64>::zeros((rows,cols));
    let mut buf_in = vec![0.0;rows.max(cols)];
    let mut buf_out = vec![0.0;rows.max(cols)];
    for (r,line) in image.outer_iter().enumerate() {
        line.iter().zip(buf_in.iter_mut()).for_each(|(x,b)| *b = *x);
        gradient_1d(&buf_in[0..cols],&mut buf_out[0..cols]);
        for c in 0..cols {
            sq[[r,c]] = buf_out[c]*buf_out[c];
        }
    }
    for (c,line) in image.columns().into_iter().enumerate() {
        line.iter().zip(buf_in.iter_mut()).for_each(|(x,b)| *b = *x);
        gradient_1d(&buf_in[0..rows],&mut buf_out[0..rows]);
        for r in 0..rows {
            sq[[r,c]] += buf_out[r]*buf_out[r];
        }
    }
    Ok(sq.sum()/(rows*cols) as f64)
}

/// std/mean over all pixels
pub fn basic_snr(image:ArrayView2<f64>) -> Result<f64,DataError> {
    let mean = image.mean().ok_or(DataError::EmptyImage)?;
    if mean == 0.0 {
        warn!("zero mean image, basic snr set to 0");
        return Ok(0.0);
    }
    Ok(image.std(0.0)/mean)
}

/// sqrt of the mean pixel value
pub fn photon_flux(image:ArrayView2<f64>) -> Result<f64,DataError> {
    let mean = image.mean().ok_or(DataError::EmptyImage)?;
    if mean < 0.0 {
        warn!(mean,"negative mean clamped to 0 for photon flux");
        return Ok(0.0);
    }
    Ok(mean.sqrt())
}

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum SnrMetric {
    Basic,
    PhotonFlux,
    Acutance,
}

impl SnrMetric {
    pub fn measure(&self,image:ArrayView2<f64>) -> Result<f64,DataError> {
        match self {
            SnrMetric::Basic => basic_snr(image),
            SnrMetric::PhotonFlux => photon_flux(image),
            SnrMetric::Acutance => acutance(image),
        }
    }
}

/// How block snr is aggregated: non-overlapping blocks of `block_shape` (rows, cols) are scored,
/// sorted, and the scores in `window` (start, end) are averaged.
#[derive(Clone,Copy,Debug,PartialEq,Serialize,Deserialize)]
pub struct BlockSnr {
    pub block_shape:(usize,usize),
    pub window:(usize,usize),
    pub metric:SnrMetric,
}

impl BlockSnr {
    /// Trailing rows and columns that do not fill a whole block are left out.
    pub fn measure(&self,image:ArrayView2<f64>) -> Result<f64,DataError> {
        let (br,bc) = self.block_shape;
        let (rows,cols) = image.dim();
        if br == 0 || bc == 0 || br > rows || bc > cols {
            return Err(DataError::TooSmall {shape:[rows,cols],reason:"no complete block fits"});
        }
        let mut scores = image.exact_chunks((br,bc))
            .into_iter()
            .map(|block| self.metric.measure(block))
            .collect::<Result<Vec<f64>,DataError>>()?;
        scores.sort_by(|a,b| a.total_cmp(b));
        let end = self.window.1.min(scores.len());
        let start = self.window.0.min(end);
        let picked = &scores[start..end];
        if picked.is_empty() {
            return Err(DataError::TooSmall {shape:[rows,cols],reason:"block window selects no blocks"});
        }
        Ok(picked.iter().sum::<f64>()/picked.len() as f64)
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct QualityReport {
    pub contrast:f64,
    pub acutance:f64,
    pub basic_snr:f64,
    pub photon_flux:f64,
    pub block_snr:Option<f64>,
}

impl QualityReport {
    pub fn measure(image:ArrayView2<f64>,block:Option<&BlockSnr>) -> Result<Self,DataError> {
        Ok(Self {
            contrast:contrast(image,95.0,5.0)?,
            acutance:acutance(image)?,
            basic_snr:basic_snr(image)?,
            photon_flux:photon_flux(image)?,
            block_snr:match block {
                Some(b) => Some(b.measure(image)?),
                None => None
            },
        })
    }
}
