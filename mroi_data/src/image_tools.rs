use ndarray::{Array2, ArrayView2, Axis};
use ndarray_stats::QuantileExt;
use tracing::debug;
use utils::{argmax, cross_correlation};
use crate::error::DataError;

pub fn min_max(image:ArrayView2<f64>) -> Result<(f64,f64),DataError> {
    if image.is_empty() {
        return Err(DataError::EmptyImage);
    }
    Ok((*image.min()?,*image.max()?))
}

/// shift intensities so the minimum sits at zero
pub fn offset_to_zero(image:ArrayView2<f64>) -> Result<Array2<f64>,DataError> {
    let (min,_) = min_max(image)?;
    Ok(image.mapv(|x| x - min))
}

/// map intensities linearly onto [0, max_value]. A flat image maps to zero.
pub fn negative_rescale(image:ArrayView2<f64>,max_value:f64) -> Result<Array2<f64>,DataError> {
    let (min,max) = min_max(image)?;
    let range = max - min;
    if range == 0.0 {
        return Ok(Array2::zeros(image.raw_dim()));
    }
    let scale = max_value/range;
    Ok(image.mapv(|x| (x - min)*scale))
}

/// Resample to (out_rows, out_cols). Each axis is handled separately: area averaging when an
/// axis shrinks (or keeps its size), bilinear interpolation between pixel centers when it grows.
pub fn resample(image:ArrayView2<f64>,out_rows:usize,out_cols:usize) -> Result<Array2<f64>,DataError> {
    let (rows,cols) = image.dim();
    if rows == 0 || cols == 0 || out_rows == 0 || out_cols == 0 {
        return Err(DataError::EmptyImage);
    }
    let col_weights = axis_weights(cols,out_cols);
    let row_weights = axis_weights(rows,out_rows);

    let mut tmp = Array2::<f64>::zeros((rows,out_cols));
    for (r,line) in image.outer_iter().enumerate() {
        for (oc,w) in col_weights.iter().enumerate() {
            tmp[[r,oc]] = w.iter().map(|&(ic,wt)| line[ic]*wt).sum::<f64>();
        }
    }
    let mut out = Array2::<f64>::zeros((out_rows,out_cols));
    for (or,w) in row_weights.iter().enumerate() {
        for &(ir,wt) in w.iter() {
            out.row_mut(or).scaled_add(wt,&tmp.row(ir));
        }
    }
    Ok(out)
}

/// For every output sample, the input samples it draws from and their weights (summing to one).
fn axis_weights(n_in:usize,n_out:usize) -> Vec<Vec<(usize,f64)>> {
    let scale = n_in as f64/n_out as f64;
    (0..n_out).map(|o|{
        if scale >= 1.0 {
            let start = o as f64*scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(n_in);
            (first..last).filter_map(|i|{
                let overlap = (end.min(i as f64 + 1.0) - start.max(i as f64)).max(0.0);
                match overlap > 0.0 {
                    true => Some((i,overlap/scale)),
                    false => None
                }
            }).collect()
        } else {
            let x = ((o as f64 + 0.5)*scale - 0.5).clamp(0.0,(n_in - 1) as f64);
            let i0 = x.floor() as usize;
            let i1 = (i0 + 1).min(n_in - 1);
            let t = x - i0 as f64;
            match i0 == i1 {
                true => vec![(i0,1.0)],
                false => vec![(i0,1.0 - t),(i1,t)]
            }
        }
    }).collect()
}

/// Estimate the bidirectional scan offset: how far odd lines sit to the right of the even
/// line scanned just before them, averaged over all line pairs with any structure in them.
pub fn estimate_line_phase(image:ArrayView2<f64>) -> i64 {
    let n = image.ncols();
    let mut offsets = Vec::<f64>::new();
    let mut r = 0;
    while r + 1 < image.nrows() {
        let a = centered(image.row(r).to_vec());
        let b = centered(image.row(r+1).to_vec());
        r += 2;
        if a.iter().all(|x| *x == 0.0) || b.iter().all(|x| *x == 0.0) {
            continue;
        }
        let c = cross_correlation(&a,&b);
        if let Some(peak) = argmax(&c) {
            let lag = peak as i64 - (n as i64 - 1);
            // b[i] ~ a[i+lag], so the odd line is moved by -lag
            offsets.push(-lag as f64);
        }
    }
    if offsets.is_empty() {
        return 0;
    }
    let mean = offsets.iter().sum::<f64>()/offsets.len() as f64;
    debug!(n_pairs = offsets.len(),mean,"estimated line phase");
    mean.round() as i64
}

fn centered(mut line:Vec<f64>) -> Vec<f64> {
    let mean = line.iter().sum::<f64>()/line.len().max(1) as f64;
    line.iter_mut().for_each(|x| *x -= mean);
    line
}

/// Move every odd line back by `offset` pixels. The width is kept and vacated samples are zero.
pub fn align_line_phase(image:ArrayView2<f64>,offset:i64) -> Array2<f64> {
    let mut out = image.to_owned();
    if offset == 0 {
        return out;
    }
    let n = image.ncols() as i64;
    for (r,mut line) in out.axis_iter_mut(Axis(0)).enumerate() {
        if r % 2 == 0 {
            continue;
        }
        let src = image.row(r);
        for j in 0..n {
            let k = j + offset;
            line[j as usize] = if k >= 0 && k < n {src[k as usize]} else {0.0};
        }
    }
    out
}

/// Convert to 16 bit for writing. Negative data is offset to zero first; data above
/// u16::MAX has to be rescaled by the caller.
pub fn to_u16(image:ArrayView2<f64>) -> Result<Array2<u16>,DataError> {
    let (min,max) = min_max(image)?;
    let offset = if min < 0.0 {min} else {0.0};
    if max - offset > u16::MAX as f64 {
        return Err(DataError::U16Overflow {max:max - offset});
    }
    Ok(image.mapv(|x| (x - offset).round() as u16))
}
