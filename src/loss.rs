//! Cost functions used by the course demos.

/// Half squared error for one output: `½(y − t)²`.
pub fn half_squared_error(pred: f64, target: f64) -> f64 {
    let e = pred - target;
    0.5 * e * e
}

/// Half sum of squared errors over a layer: `½Σ(yᵢ − tᵢ)²`.
pub fn half_sum_squared_error(pred: &[f64], target: &[f64]) -> f64 {
    if pred.len() != target.len() {
        panic!("Pred and target size mismatch");
    }
    0.5 * pred
        .iter()
        .zip(target)
        .map(|(&p, &t)| (p - t).powi(2))
        .sum::<f64>()
}

/// Bell-shaped bowl used by the 1-D descent demo: `J(θ) = 1 − e^{−θ²/2}`.
pub fn bell_curve_cost(theta: f64) -> f64 {
    1.0 - (-0.5 * theta * theta).exp()
}

/// `dJ/dθ = θ·e^{−θ²/2}`.
pub fn bell_curve_gradient(theta: f64) -> f64 {
    theta * (-0.5 * theta * theta).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_squared_error_matches_layer_form() {
        let single = half_squared_error(0.7, 0.9) + half_squared_error(0.4, 0.1);
        let layer = half_sum_squared_error(&[0.7, 0.4], &[0.9, 0.1]);
        assert!((single - layer).abs() < 1e-15);
    }

    #[test]
    fn bell_curve_minimum_at_origin() {
        assert_eq!(bell_curve_cost(0.0), 0.0);
        assert_eq!(bell_curve_gradient(0.0), 0.0);
        assert!(bell_curve_cost(3.0) < 1.0);
        assert!(bell_curve_gradient(1.0) > 0.0 && bell_curve_gradient(-1.0) < 0.0);
    }

    #[test]
    #[should_panic]
    fn mismatched_lengths_panic() {
        half_sum_squared_error(&[1.0], &[1.0, 2.0]);
    }
}
