//! Holdout scoring metrics

/// Coefficient of determination.
///
/// Returns 0 when the targets have no spread, so a constant series never
/// scores as a perfect fit.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mean = actual[..n].iter().sum::<f64>() / n as f64;
    let total: f64 = actual[..n].iter().map(|y| (y - mean).powi(2)).sum();
    if total <= f64::EPSILON {
        return 0.0;
    }
    let residual: f64 = actual[..n]
        .iter()
        .zip(&predicted[..n])
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    1.0 - residual / total
}

/// Share of rows where prediction and target have the same sign
pub fn directional_accuracy(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let hits = actual
        .iter()
        .zip(predicted)
        .take(n)
        .filter(|(y, p)| y.signum() == p.signum())
        .count();
    hits as f64 / n as f64
}

/// Pearson correlation, 0 when either side is constant
pub fn correlation(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = actual[..n].iter().sum::<f64>() / n as f64;
    let mean_p = predicted[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_p = 0.0;
    for (a, p) in actual.iter().zip(predicted).take(n) {
        let da = a - mean_a;
        let dp = p - mean_p;
        cov += da * dp;
        var_a += da * da;
        var_p += dp * dp;
    }
    let denom = (var_a * var_p).sqrt();
    if denom <= f64::EPSILON { 0.0 } else { cov / denom }
}
