//! Numeric utilities shared by Algos and streaming accumulators.
//!
//! Matrices are row-major `Vec<Vec<f64>>`. Functions that take a covariance
//! or correlation matrix check that it is square and matches the length of
//! any accompanying weight vector.

use crate::domain::error::QuantkitError;

pub type Matrix = Vec<Vec<f64>>;

/// Default tolerance below which a quantity is treated as zero.
pub const ZERO_TOLERANCE: f64 = 1e-16;

/// One row of a scipy-style linkage matrix: `[left, right, distance, count]`.
pub type LinkageRow = [f64; 4];

pub fn is_zero(x: f64, tolerance: f64) -> bool {
    x.abs() < tolerance
}

/// Format a fraction as a percentage, e.g. `0.1234` -> `"12.34%"`.
pub fn format_pct(x: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, x * 100.0)
}

/// Format a number with a fixed number of decimals and thousands separators.
pub fn format_decimal(x: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, x.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if x < 0.0 && raw.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Exponential decay weights for lags `T, T-1, .., 0` with half-life `h`.
///
/// The result has `T + 1` elements, one per lag including lag 0. The first
/// is `0.5^(T/h)` (oldest observation) and the last is 1 (most recent
/// observation). Take the last `T` elements for a window of `T` periods.
pub fn decay_factor(halflife: f64, periods: usize) -> Vec<f64> {
    (0..=periods)
        .rev()
        .map(|age| 0.5_f64.powf(age as f64 / halflife))
        .collect()
}

/// Smoothing factor for an exponentially weighted mean with the given span.
pub fn decay_span(span: f64) -> f64 {
    2.0 / (span + 1.0)
}

/// Quantiles of one column at each breakpoint, ignoring NaN entries.
///
/// Uses linear interpolation between order statistics. A column with no
/// finite values yields NaN for every breakpoint.
pub fn quantiles(column: &[f64], breakpoints: &[f64]) -> Result<Vec<f64>, QuantkitError> {
    if let Some(b) = breakpoints.iter().find(|b| !(0.0..=1.0).contains(*b)) {
        return Err(QuantkitError::invalid_input(format!(
            "quantile breakpoint {b} outside [0, 1]"
        )));
    }

    let mut sorted: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);

    if sorted.is_empty() {
        return Ok(vec![f64::NAN; breakpoints.len()]);
    }

    let last = (sorted.len() - 1) as f64;
    Ok(breakpoints
        .iter()
        .map(|&b| {
            let pos = b * last;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        })
        .collect())
}

/// Per-column quantiles; `columns[j]` is the j-th column.
pub fn quantile_columns(
    columns: &[Vec<f64>],
    breakpoints: &[f64],
) -> Result<Vec<Vec<f64>>, QuantkitError> {
    columns
        .iter()
        .map(|col| quantiles(col, breakpoints))
        .collect()
}

fn check_square(matrix: &[Vec<f64>], name: &str) -> Result<usize, QuantkitError> {
    let n = matrix.len();
    if matrix.iter().any(|row| row.len() != n) {
        return Err(QuantkitError::invalid_input(format!(
            "{name} must be a square matrix"
        )));
    }
    Ok(n)
}

fn check_weights(weights: &[f64], n: usize) -> Result<(), QuantkitError> {
    if weights.len() != n {
        return Err(QuantkitError::invalid_input(format!(
            "weight vector has {} entries, covariance has {n}",
            weights.len()
        )));
    }
    Ok(())
}

/// Correlation-based distance `sqrt(clip((1 - C) / 2, 0, 1))`, elementwise.
pub fn distance_matrix(corr: &[Vec<f64>]) -> Result<Matrix, QuantkitError> {
    check_square(corr, "correlation matrix")?;
    Ok(corr
        .iter()
        .map(|row| {
            row.iter()
                .map(|&c| ((1.0 - c) / 2.0).clamp(0.0, 1.0).sqrt())
                .collect()
        })
        .collect())
}

/// Upper-triangle (i < j) entries of a square matrix, row by row.
pub fn condensed(matrix: &[Vec<f64>]) -> Result<Vec<f64>, QuantkitError> {
    let n = check_square(matrix, "distance matrix")?;
    let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            out.push(matrix[i][j]);
        }
    }
    Ok(out)
}

fn observations_from_condensed(len: usize) -> Result<usize, QuantkitError> {
    let n = ((1.0 + (1.0 + 8.0 * len as f64).sqrt()) / 2.0).round() as usize;
    if n * (n - 1) / 2 != len {
        return Err(QuantkitError::invalid_input(format!(
            "condensed distance vector of length {len} is not triangular"
        )));
    }
    Ok(n)
}

/// Single-linkage agglomerative clustering of a condensed distance vector.
///
/// Returns `n - 1` rows in merge order. Original observations are numbered
/// `0..n`, the cluster formed at step `k` is numbered `n + k`.
pub fn linkage_matrix(condensed: &[f64]) -> Result<Vec<LinkageRow>, QuantkitError> {
    if condensed.is_empty() {
        return Ok(Vec::new());
    }
    let n = observations_from_condensed(condensed.len())?;

    let mut dist = vec![vec![0.0; n]; n];
    let mut k = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            dist[i][j] = condensed[k];
            dist[j][i] = condensed[k];
            k += 1;
        }
    }

    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1usize; n];
    let mut rows = Vec::with_capacity(n - 1);

    for step in 0..(n - 1) {
        let active = ids.len();
        let (mut bi, mut bj, mut best) = (0, 1, f64::INFINITY);
        for i in 0..active {
            for j in (i + 1)..active {
                if dist[i][j] < best {
                    best = dist[i][j];
                    bi = i;
                    bj = j;
                }
            }
        }

        let (a, b) = (ids[bi], ids[bj]);
        let size = sizes[bi] + sizes[bj];
        rows.push([a.min(b) as f64, a.max(b) as f64, best, size as f64]);

        for other in 0..active {
            let merged = dist[bi][other].min(dist[bj][other]);
            dist[bi][other] = merged;
            dist[other][bi] = merged;
        }
        dist[bi][bi] = 0.0;
        dist.remove(bj);
        for row in dist.iter_mut() {
            row.remove(bj);
        }

        ids[bi] = n + step;
        sizes[bi] = size;
        ids.remove(bj);
        sizes.remove(bj);
    }

    Ok(rows)
}

/// Leaf order from a pre-order traversal of the linkage tree.
///
/// Strongly linked observations end up adjacent, which is what makes the
/// reordered covariance matrix quasi-diagonal.
pub fn get_quasi_diag(linkage: &[LinkageRow]) -> Vec<usize> {
    if linkage.is_empty() {
        return Vec::new();
    }
    let n = linkage.len() + 1;
    let mut order = Vec::with_capacity(n);
    let mut stack = vec![2 * n - 2];

    while let Some(id) = stack.pop() {
        if id < n {
            order.push(id);
        } else {
            let row = &linkage[id - n];
            stack.push(row[1] as usize);
            stack.push(row[0] as usize);
        }
    }
    order
}

/// Inverse-variance weights `1 / Σ_ii`, normalised to sum to one.
pub fn inverse_variance_weights(cov: &[Vec<f64>]) -> Result<Vec<f64>, QuantkitError> {
    let n = check_square(cov, "covariance matrix")?;
    let inv: Vec<f64> = (0..n).map(|i| 1.0 / cov[i][i]).collect();
    let total: f64 = inv.iter().sum();
    Ok(inv.into_iter().map(|w| w / total).collect())
}

/// Variance `wᵀ Σ w` of the inverse-variance portfolio.
pub fn inverse_variance(cov: &[Vec<f64>]) -> Result<f64, QuantkitError> {
    let w = inverse_variance_weights(cov)?;
    let mrc = marginal_risk_contribution(&w, cov)?;
    Ok(w.iter().zip(&mrc).map(|(a, b)| a * b).sum())
}

/// Inverse-variance portfolio variance on the principal submatrix `indices`.
pub fn sliced_inverse_variance(
    cov: &[Vec<f64>],
    indices: &[usize],
) -> Result<f64, QuantkitError> {
    let n = check_square(cov, "covariance matrix")?;
    if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
        return Err(QuantkitError::invalid_input(format!(
            "index {bad} out of bounds for {n}x{n} covariance"
        )));
    }
    let sub: Matrix = indices
        .iter()
        .map(|&i| indices.iter().map(|&j| cov[i][j]).collect())
        .collect();
    inverse_variance(&sub)
}

/// Marginal risk contribution `Σ w`.
pub fn marginal_risk_contribution(
    weights: &[f64],
    cov: &[Vec<f64>],
) -> Result<Vec<f64>, QuantkitError> {
    let n = check_square(cov, "covariance matrix")?;
    check_weights(weights, n)?;
    Ok(cov
        .iter()
        .map(|row| row.iter().zip(weights).map(|(c, w)| c * w).sum())
        .collect())
}

/// Portfolio volatility `sqrt(wᵀ Σ w)`.
pub fn portfolio_vol(weights: &[f64], cov: &[Vec<f64>]) -> Result<f64, QuantkitError> {
    let mrc = marginal_risk_contribution(weights, cov)?;
    let variance: f64 = weights.iter().zip(&mrc).map(|(w, m)| w * m).sum();
    Ok(variance.sqrt())
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when `A` is singular (or numerically close to it).
pub fn solve_linear_system(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    let mut m: Matrix = a
        .iter()
        .zip(b)
        .map(|(row, &rhs)| {
            let mut r = row.clone();
            r.push(rhs);
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (m[row][n] - tail) / m[row][row];
    }
    Some(x)
}
