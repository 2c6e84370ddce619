//! Small dense linear algebra for model fitting.

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Pivots smaller than this (relative to the largest entry) are treated as
/// singular.
const SINGULAR_EPSILON: f64 = 1e-10;

/// Solves `matrix * x = rhs` by Gaussian elimination with partial
/// pivoting. Returns `None` if the system is singular.
#[must_use]
pub fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let n = rhs.len();
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return None;
    }
    let scale = matrix
        .iter()
        .flatten()
        .fold(1.0_f64, |acc, v| acc.max(v.abs()));

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|a, b| matrix[*a][col].abs().total_cmp(&matrix[*b][col].abs()))?;
        if matrix[pivot][col].abs() < SINGULAR_EPSILON * scale {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..n {
            let factor = matrix[row][col] / matrix[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| matrix[row][k] * x[k]).sum();
        x[row] = (rhs[row] - tail) / matrix[row][row];
    }
    Some(x)
}

/// Ordinary least squares via the normal equations.
///
/// `design` holds one row of regressors per observation.
#[must_use]
pub fn least_squares(design: &[Vec<f64>], target: &[f64]) -> Option<Vec<f64>> {
    let k = design.first()?.len();
    if design.len() != target.len() || design.len() < k {
        return None;
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, y) in design.iter().zip(target) {
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    solve(xtx, xty)
}

/// MA(infinity) weights of an AR polynomial `1 - sum(ar[i] B^(i+1))`,
/// truncated to `count` terms.
#[must_use]
pub fn psi_weights(ar: &[f64], count: usize) -> Vec<f64> {
    let mut psi: Vec<f64> = Vec::with_capacity(count);
    for j in 0..count {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let value = ar
            .iter()
            .enumerate()
            .take(j)
            .map(|(i, phi)| phi * psi[j - i - 1])
            .sum();
        psi.push(value);
    }
    psi
}

/// Coefficients of the AR polynomial after multiplying by `(1 - B)`, used
/// to propagate uncertainty through first differencing.
#[must_use]
pub fn integrate_ar(phi: &[f64]) -> Vec<f64> {
    let p = phi.len();
    let mut out = vec![0.0; p + 1];
    out[0] = 1.0 + phi.first().copied().unwrap_or(0.0);
    for i in 1..p {
        out[i] = phi[i] - phi[i - 1];
    }
    if p > 0 {
        out[p] = -phi[p - 1];
    }
    out
}

/// Arithmetic mean; `0.0` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population variance; `0.0` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}
