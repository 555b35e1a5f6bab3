//! Small numeric helpers shared by the sampler and the posterior reduction.

/// Response factor `2 / (1 + exp(x))`.
///
/// Equals `1` at `x = 0`, tends to `2` for `x → -inf` and to `0` for
/// `x → +inf` (overflow of `exp` yields exactly `0`).
#[inline]
pub fn response_factor(x: f64) -> f64 {
    2.0 / (1.0 + x.exp())
}

/// `n` evenly spaced values over `[start, stop]`, both endpoints included.
///
/// `n == 1` yields `[start]`, `n == 0` an empty grid.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            out[n - 1] = stop;
            out
        }
    }
}

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population mean and standard deviation (divisor `n`), two-pass.
pub fn mean_std(xs: &[f64]) -> (f64, f64) {
    let m = mean(xs);
    let var = xs.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64;
    (m, var.sqrt())
}

/// Column-wise population mean and standard deviation of a row-major table.
///
/// All rows must share the width of the first one.
pub fn column_mean_std(rows: &[Vec<f64>]) -> Vec<(f64, f64)> {
    let width = rows.first().map_or(0, Vec::len);
    let mut column = Vec::with_capacity(rows.len());
    (0..width)
        .map(|j| {
            column.clear();
            column.extend(rows.iter().map(|r| r[j]));
            mean_std(&column)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_response_factor_limits() {
        assert_eq!(response_factor(0.0), 1.0);
        assert_relative_eq!(response_factor(-50.0), 2.0, max_relative = 1e-15);
        assert_eq!(response_factor(1e6), 0.0);
        assert_relative_eq!(response_factor(1.0) + response_factor(-1.0), 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_linspace_endpoints() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
        assert_eq!(linspace(0.0, 1.0, 2), vec![0.0, 1.0]);

        let g = linspace(0.0, 1.0, 5);
        assert_eq!(g, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let g = linspace(0.0, 1.0, 100);
        assert_eq!(g.len(), 100);
        assert_eq!(g[99], 1.0);
        assert!(g.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_mean_std_is_population() {
        let (m, s) = mean_std(&[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(m, 2.5);
        assert_relative_eq!(s, 1.25f64.sqrt(), epsilon = 1e-15);

        let (m, s) = mean_std(&[7.0]);
        assert_eq!((m, s), (7.0, 0.0));

        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_column_mean_std() {
        let rows = vec![vec![0.0, 1.0], vec![2.0, 1.0], vec![4.0, 1.0]];
        let cols = column_mean_std(&rows);
        assert_eq!(cols.len(), 2);
        assert_relative_eq!(cols[0].0, 2.0);
        assert_relative_eq!(cols[0].1, (8.0f64 / 3.0).sqrt(), epsilon = 1e-15);
        assert_eq!(cols[1], (1.0, 0.0));
    }
}
