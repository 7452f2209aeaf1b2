//! Ridge regression solved by Gauss-Jordan elimination.

/// Pivots smaller than this are treated as singular.
const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `a · x = b` by Gauss-Jordan elimination with partial pivoting.
///
/// Returns `None` when the system is singular or the shapes disagree.
///
/// # Examples
///
/// ```
/// use vitals_insight::regression::solve_linear_system;
///
/// let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
/// let x = solve_linear_system(a, vec![3.0, 5.0]).unwrap();
/// assert!((x[0] - 0.8).abs() < 1e-12);
/// assert!((x[1] - 1.4).abs() < 1e-12);
/// ```
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|i, j| a[*i][col].abs().total_cmp(&a[*j][col].abs()))?;
        if a[pivot_row][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col][col];
        for v in a[col].iter_mut() {
            *v /= pivot;
        }
        b[col] /= pivot;

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    Some(b)
}

/// Fit `β` minimizing `‖Xβ - y‖² + α‖β‖²`.
///
/// Solves the normal equations `(XᵀX + αI)β = Xᵀy`. Returns `None` for
/// empty input or a singular system.
pub fn ridge_fit(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Option<Vec<f64>> {
    let p = x.first()?.len();
    if p == 0 || x.len() != y.len() {
        return None;
    }

    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];
    for (row, target) in x.iter().zip(y) {
        for i in 0..p {
            xty[i] += row[i] * target;
            for j in 0..p {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += alpha;
    }

    solve_linear_system(xtx, xty)
}

/// `X · β` per row.
pub fn predict(x: &[Vec<f64>], beta: &[f64]) -> Vec<f64> {
    x.iter()
        .map(|row| row.iter().zip(beta).map(|(v, b)| v * b).sum())
        .collect()
}

/// Coefficient of determination; 0.0 when the target is constant.
pub fn r_squared(y: &[f64], predicted: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    let ss_res: f64 = y.iter().zip(predicted).map(|(v, p)| (v - p).powi(2)).sum();
    1.0 - ss_res / ss_tot
}

/// A fitted ridge model.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
    pub alpha: f64,
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
}

/// Fit at every alpha in `alphas`, keeping the first with the highest R².
///
/// Alphas whose system is singular are skipped.
pub fn fit_best_alpha(x: &[Vec<f64>], y: &[f64], alphas: &[f64]) -> Option<RidgeFit> {
    let mut best: Option<RidgeFit> = None;
    for &alpha in alphas {
        let Some(coefficients) = ridge_fit(x, y, alpha) else {
            continue;
        };
        let r2 = r_squared(y, &predict(x, &coefficients));
        if best.as_ref().map_or(true, |b| r2 > b.r_squared) {
            best = Some(RidgeFit {
                alpha,
                coefficients,
                r_squared: r2,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect()
    }

    #[test]
    fn identity_design_shrinks_by_alpha() {
        let x = identity(6);
        let y = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        for alpha in [0.1, 0.5, 1.0, 2.0, 5.0] {
            let beta = ridge_fit(&x, &y, alpha).unwrap();
            assert!((beta[0] - 1.0 / (1.0 + alpha)).abs() < 1e-12);
            assert!(beta[1..].iter().all(|b| b.abs() < 1e-12));
        }
    }

    #[test]
    fn partial_pivoting_handles_zero_diagonal() {
        let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let x = solve_linear_system(a, vec![2.0, 3.0]).unwrap();
        assert_eq!(x, vec![3.0, 2.0]);
    }

    #[test]
    fn singular_system_is_none() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve_linear_system(a, vec![1.0, 2.0]).is_none());
        assert!(ridge_fit(&[vec![1.0, 1.0]], &[1.0], 0.0).is_none());
    }

    #[test]
    fn r_squared_constant_target_is_zero() {
        assert_eq!(r_squared(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
    }

    #[test]
    fn best_alpha_prefers_smallest_shrinkage_on_clean_data() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![f64::from(i), 1.0]).collect();
        let y: Vec<f64> = (0..8).map(|i| 2.0 * f64::from(i) + 1.0).collect();
        let fit = fit_best_alpha(&x, &y, &[5.0, 0.1, 1.0]).unwrap();
        assert_eq!(fit.alpha, 0.1);
        assert!(fit.r_squared > 0.99);
    }
}
