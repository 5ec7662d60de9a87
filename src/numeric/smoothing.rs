/// Gaussian smoothing with half-sample symmetric ("reflect") boundaries
///
/// The kernel is truncated at four standard deviations and normalized to unit
/// sum.
///
/// # Arguments
/// * `data` - Input sequence
/// * `sigma` - Kernel standard deviation in samples
pub fn gaussian_filter(data: &[f64], sigma: f64) -> Vec<f64> {
    let n = data.len();
    if n == 0 || sigma <= 0.0 {
        return data.to_vec();
    }

    let radius = (4.0 * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let norm: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= norm);

    (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(w, k)| w * data[reflect_index(i + k, n)])
                .sum()
        })
        .collect()
}

/// Fold an out-of-range index back into [0, n) as d c b a | a b c d | d c b a
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n { m as usize } else { (period - 1 - m) as usize }
}

/// Discrete derivative with unit spacing
///
/// Central differences in the interior and one-sided differences at the ends.
pub fn gradient(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    data[1] - data[0]
                } else if i == n - 1 {
                    data[n - 1] - data[n - 2]
                } else {
                    0.5 * (data[i + 1] - data[i - 1])
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gaussian_preserves_constant() {
        let data = vec![3.5; 50];
        for v in gaussian_filter(&data, 30.0) {
            assert_abs_diff_eq!(v, 3.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gaussian_symmetric_step() {
        // A centered step stays antisymmetric about its midpoint
        let data: Vec<f64> = (0..101).map(|i| if i < 50 { 1.0 } else if i == 50 { 0.0 } else { -1.0 }).collect();
        let smooth = gaussian_filter(&data, 5.0);
        assert_abs_diff_eq!(smooth[50], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(smooth[40], -smooth[60], epsilon = 1e-12);
        assert!(smooth[45] < 1.0 && smooth[45] > 0.0);
    }

    #[test]
    fn test_gaussian_wide_kernel_short_input() {
        // Kernel radius far exceeds the data length
        let data = vec![1.0, 2.0, 3.0];
        let smooth = gaussian_filter(&data, 30.0);
        assert_eq!(smooth.len(), 3);
        for v in smooth {
            assert_abs_diff_eq!(v, 2.0, epsilon = 0.05);
        }
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(9, 4), 1);
    }

    #[test]
    fn test_gradient() {
        let data = [0.0, 1.0, 4.0, 9.0];
        assert_eq!(gradient(&data), vec![1.0, 2.0, 4.0, 5.0]);
        assert_eq!(gradient(&[2.0]), vec![0.0]);
    }
}
