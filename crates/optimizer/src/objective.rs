//! Portfolio-level objective functions.
//!
//! Every function scores a weight vector `w` against an in-sample return
//! matrix `R` (rows = dates, columns = assets) through the portfolio return
//! series `p = R·w`. Inputs are expected to be free of NaN. A metric that
//! cannot be computed yields `NaN`, which the solver rejects.

use analytics::metrics;
use nalgebra::{DMatrix, DVector};

/// Daily portfolio returns `R·w`.
pub fn portfolio_returns(w: &[f64], returns: &DMatrix<f64>) -> DVector<f64> {
    returns * DVector::from_column_slice(w)
}

/// Annualized return of the portfolio.
pub fn ret(w: &[f64], returns: &DMatrix<f64>) -> f64 {
    let p = portfolio_returns(w, returns);
    metrics::annualized_return(p.as_slice()).unwrap_or(f64::NAN)
}

/// Annualized volatility of the portfolio.
pub fn vol(w: &[f64], returns: &DMatrix<f64>) -> f64 {
    let p = portfolio_returns(w, returns);
    metrics::annualized_volatility(p.as_slice()).unwrap_or(f64::NAN)
}

/// Annualized Sharpe ratio with a zero risk-free rate.
pub fn sharpe(w: &[f64], returns: &DMatrix<f64>) -> f64 {
    let p = portfolio_returns(w, returns);
    metrics::sharpe(p.as_slice(), 0.0).unwrap_or(f64::NAN)
}

/// Conditional value at risk at percentile `level`.
pub fn cvar(w: &[f64], returns: &DMatrix<f64>, level: f64) -> f64 {
    let p = portfolio_returns(w, returns);
    metrics::conditional_value_at_risk(p.as_slice(), level).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matrix() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            2,
            &[0.01, 0.02, -0.01, 0.00, 0.02, -0.01, 0.00, 0.01],
        )
    }

    #[test]
    fn test_portfolio_returns_is_weighted_sum() {
        let p = portfolio_returns(&[0.5, 0.5], &matrix());
        assert_relative_eq!(p[0], 0.015);
        assert_relative_eq!(p[1], -0.005);
        assert_relative_eq!(p[2], 0.005);
        assert_relative_eq!(p[3], 0.005);
    }

    #[test]
    fn test_objectives_match_series_metrics() {
        let r = matrix();
        let w = [0.3, 0.7];
        let p = portfolio_returns(&w, &r);
        assert_relative_eq!(ret(&w, &r), metrics::annualized_return(p.as_slice()).unwrap());
        assert_relative_eq!(vol(&w, &r), metrics::annualized_volatility(p.as_slice()).unwrap());
        assert_relative_eq!(
            cvar(&w, &r, 50.0),
            metrics::conditional_value_at_risk(p.as_slice(), 50.0).unwrap()
        );
    }

    #[test]
    fn test_undefined_metric_is_nan() {
        // One observation has no volatility.
        let r = DMatrix::from_row_slice(1, 2, &[0.01, 0.02]);
        assert!(vol(&[0.5, 0.5], &r).is_nan());
        assert!(sharpe(&[0.5, 0.5], &r).is_nan());
    }
}
