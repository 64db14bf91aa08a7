use crate::errors::EngineError;

/// Ordinary least-squares fit of `y = slope * x + intercept`.
///
/// Fails on fewer than two points or a degenerate x spread (all
/// observations at one value), which would make the fit singular.
pub fn least_squares(xs: &[f64], ys: &[f64]) -> Result<(f64, f64), EngineError> {
    if xs.len() != ys.len() {
        return Err(EngineError::ComputationError(
            "mismatched regression inputs".into(),
        ));
    }
    let n = xs.len() as f64;
    if xs.len() < 2 {
        return Err(EngineError::InsufficientData(
            "regression needs at least two points".into(),
        ));
    }

    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }

    if sxx <= f64::EPSILON {
        return Err(EngineError::ComputationError(
            "singular fit: no spread in x".into(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(EngineError::ComputationError(
            "non-finite regression coefficients".into(),
        ));
    }
    Ok((slope, intercept))
}

/// Demand elasticity as the slope of log quantity on log price.
///
/// Quantities are shifted by one before the log so zero-demand price
/// points stay in the fit; non-positive prices cannot be logged and
/// fail the estimate.
pub fn log_log_elasticity(prices: &[f64], quantities: &[f64]) -> Result<f64, EngineError> {
    if prices.iter().any(|p| *p <= 0.0) {
        return Err(EngineError::ComputationError(
            "non-positive price in elasticity fit".into(),
        ));
    }
    if quantities.iter().any(|q| *q < 0.0) {
        return Err(EngineError::ComputationError(
            "negative quantity in elasticity fit".into(),
        ));
    }
    let log_prices: Vec<f64> = prices.iter().map(|p| p.ln()).collect();
    let log_quantities: Vec<f64> = quantities.iter().map(|q| (q + 1.0).ln()).collect();
    let (slope, _) = least_squares(&log_prices, &log_quantities)?;
    Ok(slope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_known_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let (slope, intercept) = least_squares(&xs, &ys).unwrap();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_x_is_singular() {
        let err = least_squares(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, EngineError::ComputationError(_)));
    }

    #[test]
    fn elasticity_is_negative_when_demand_falls_with_price() {
        // quantity halves as price doubles
        let prices = [10.0, 20.0, 40.0];
        let quantities = [80.0, 40.0, 20.0];
        let elasticity = log_log_elasticity(&prices, &quantities).unwrap();
        assert!(elasticity < -0.8, "elasticity {}", elasticity);
    }

    #[test]
    fn zero_price_fails_the_fit() {
        let err = log_log_elasticity(&[0.0, 10.0], &[5.0, 3.0]).unwrap_err();
        assert!(matches!(err, EngineError::ComputationError(_)));
    }

    #[test]
    fn zero_quantities_survive_the_log_shift() {
        let elasticity = log_log_elasticity(&[10.0, 20.0, 30.0], &[4.0, 1.0, 0.0]).unwrap();
        assert!(elasticity.is_finite());
        assert!(elasticity < 0.0);
    }
}
