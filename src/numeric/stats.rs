use rolling_stats::Stats;

/// Arithmetic mean, or 0 for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Standard deviation over the slice
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let mut stats: Stats<f64> = Stats::new();
    data.iter().for_each(|&v| stats.update(v));
    stats.std_dev
}

/// Index of the element with the largest magnitude (first on ties)
pub fn argmax_abs(data: &[f64]) -> Option<usize> {
    data.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if v.abs() <= b => best,
            _ => Some((i, v.abs())),
        })
        .map(|(i, _)| i)
}

/// Least-squares slope of y against x
///
/// Returns `None` with fewer than two points or no spread in x.
pub fn linear_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let (sxy, sxx) = x[..n]
        .iter()
        .zip(&y[..n])
        .fold((0.0, 0.0), |(sxy, sxx), (&xi, &yi)| {
            (sxy + (xi - mx) * (yi - my), sxx + (xi - mx) * (xi - mx))
        });
    if sxx <= 0.0 {
        return None;
    }
    Some(sxy / sxx)
}
