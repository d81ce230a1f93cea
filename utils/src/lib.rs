use rustfft::FftPlanner;
use num_complex::Complex;

/// zero-padded plane labels (p0..p9, p00..p99 ...) for a series of n_elements planes
pub fn plane_label_formatter(n_elements:usize) -> Vec<String> {
    (0..n_elements).map(|index| plane_label(index,n_elements)).collect()
}

pub fn plane_label(index:usize,n_total:usize) -> String {
    let w = label_width(n_total);
    format!("p{:0width$}",index,width=w)
}

fn label_width(n_total:usize) -> usize {
    match n_total {
        0 | 1 => 1,
        n => ((n-1) as f64).log10().floor() as usize + 1
    }
}

pub fn vec_to_string<T>(vec:&[T]) -> String
    where T:std::string::ToString {
    let vstr:Vec<String> = vec.iter().map(|num| num.to_string()).collect();
    vstr.join(" ")
}

/// index of the largest value. NaN entries are ignored.
pub fn argmax(values:&[f64]) -> Option<usize> {
    values.iter()
        .enumerate()
        .filter(|(_,v)| !v.is_nan())
        .fold(None,|best:Option<(usize,f64)>,(i,&v)| match best {
            Some((_,b)) if b >= v => best,
            _ => Some((i,v))
        })
        .map(|(i,_)| i)
}

/// Linear cross-correlation c[lag] = sum_i a[i+lag]*b[i] computed with a zero-padded fft.
/// Both inputs must have the same length n. The returned vector has 2n-1 entries ordered
/// from lag -(n-1) to lag n-1, so the zero-lag term sits at index n-1.
pub fn cross_correlation(a:&[f64],b:&[f64]) -> Vec<f64> {
    let n = a.len().min(b.len());
    if n == 0 {
        return vec![];
    }
    let m = (2*n-1).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let fwd = planner.plan_fft_forward(m);
    let inv = planner.plan_fft_inverse(m);

    let mut fa:Vec<Complex<f64>> = vec![Complex::new(0.0,0.0);m];
    let mut fb:Vec<Complex<f64>> = vec![Complex::new(0.0,0.0);m];
    for i in 0..n {
        fa[i] = Complex::new(a[i],0.0);
        fb[i] = Complex::new(b[i],0.0);
    }
    fwd.process(&mut fa);
    fwd.process(&mut fb);

    let mut prod:Vec<Complex<f64>> = fa.iter().zip(fb.iter()).map(|(x,y)| x*y.conj()).collect();
    inv.process(&mut prod);

    // rustfft leaves the inverse unnormalized
    let scale = 1.0/m as f64;
    let mut out = Vec::<f64>::with_capacity(2*n-1);
    for lag in (1..n).rev() {
        out.push(prod[m-lag].re*scale);
    }
    for lag in 0..n {
        out.push(prod[lag].re*scale);
    }
    out
}
