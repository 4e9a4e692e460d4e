//! Risk and return statistics over a return series.
//!
//! Every function is pure. Returns are fractional per-period returns, assumed
//! daily with [`PERIODS_PER_YEAR`] periods per year.

use crate::error::AnalyticsError;
use core_types::ReturnSeries;

pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Length of the trailing window used to find the running peak in drawdowns.
pub const DRAWDOWN_WINDOW: usize = 252;

fn require(metric: &str, r: &[f64], required: usize) -> Result<(), AnalyticsError> {
    if r.len() < required {
        return Err(AnalyticsError::InsufficientData {
            metric: metric.to_string(),
            required,
            actual: r.len(),
        });
    }
    Ok(())
}

fn divide(metric: &str, numerator: f64, denominator: f64) -> Result<f64, AnalyticsError> {
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(AnalyticsError::DivisionByZero(metric.to_string()));
    }
    Ok(numerator / denominator)
}

fn mean(r: &[f64]) -> f64 {
    r.iter().sum::<f64>() / r.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
fn sample_std(r: &[f64]) -> f64 {
    let m = mean(r);
    let ss: f64 = r.iter().map(|x| (x - m) * (x - m)).sum();
    (ss / (r.len() - 1) as f64).sqrt()
}

/// Running product of `(1 + r_i)`.
pub fn cumulative_return(r: &[f64]) -> Vec<f64> {
    r.iter()
        .scan(1.0, |acc, x| {
            *acc *= 1.0 + x;
            Some(*acc)
        })
        .collect()
}

/// Simple returns from a cumulative value curve that implicitly starts at 1.
pub fn returns_from_cumulative(cumulative: &[f64]) -> Vec<f64> {
    let mut previous = 1.0;
    cumulative
        .iter()
        .map(|&value| {
            let r = value / previous - 1.0;
            previous = value;
            r
        })
        .collect()
}

pub fn total_return(r: &[f64]) -> f64 {
    r.iter().map(|x| 1.0 + x).product::<f64>() - 1.0
}

pub fn annualized_return(r: &[f64]) -> Result<f64, AnalyticsError> {
    require("annualized_return", r, 1)?;
    let growth: f64 = r.iter().map(|x| 1.0 + x).product();
    Ok(growth.powf(PERIODS_PER_YEAR / r.len() as f64) - 1.0)
}

pub fn annualized_volatility(r: &[f64]) -> Result<f64, AnalyticsError> {
    require("annualized_volatility", r, 2)?;
    Ok(sample_std(r) * PERIODS_PER_YEAR.sqrt())
}

pub fn sharpe(r: &[f64], rfr: f64) -> Result<f64, AnalyticsError> {
    let vol = annualized_volatility(r)?;
    divide("sharpe", annualized_return(r)? - rfr, vol)
}

/// Annualized sample standard deviation of the negative returns only.
pub fn downside_deviation(r: &[f64]) -> Result<f64, AnalyticsError> {
    require("downside_deviation", r, 2)?;
    let negative: Vec<f64> = r.iter().copied().filter(|x| *x < 0.0).collect();
    require("downside_deviation", &negative, 2)?;
    Ok(sample_std(&negative) * PERIODS_PER_YEAR.sqrt())
}

pub fn sortino(r: &[f64], rfr: f64) -> Result<f64, AnalyticsError> {
    let downside = downside_deviation(r)?;
    divide("sortino", annualized_return(r)? - rfr, downside)
}

fn aligned(r: &ReturnSeries, market: &ReturnSeries) -> Result<(ReturnSeries, ReturnSeries), AnalyticsError> {
    r.overlap(market).ok_or_else(|| {
        AnalyticsError::MisalignedSeries(format!(
            "{:?}..{:?} vs {:?}..{:?}",
            r.first_date(),
            r.last_date(),
            market.first_date(),
            market.last_date()
        ))
    })
}

/// Covariance with the market over variance of the market, computed on the
/// dates the two series share within their overlapping range.
pub fn beta(r: &ReturnSeries, market: &ReturnSeries) -> Result<f64, AnalyticsError> {
    let (p, m) = aligned(r, market)?;
    beta_aligned(p.values(), m.values())
}

fn beta_aligned(p: &[f64], m: &[f64]) -> Result<f64, AnalyticsError> {
    require("beta", p, 2)?;
    let (mp, mm) = (mean(p), mean(m));
    let cov: f64 = p.iter().zip(m).map(|(a, b)| (a - mp) * (b - mm)).sum::<f64>();
    let var: f64 = m.iter().map(|b| (b - mm) * (b - mm)).sum::<f64>();
    divide("beta", cov, var)
}

pub fn treynor(r: &ReturnSeries, market: &ReturnSeries, rfr: f64) -> Result<f64, AnalyticsError> {
    let (p, m) = aligned(r, market)?;
    let b = beta_aligned(p.values(), m.values())?;
    divide("treynor", annualized_return(p.values())? - rfr, b)
}

/// The `level`-th percentile (0-100) of the returns, interpolating linearly
/// between order statistics.
pub fn value_at_risk(r: &[f64], level: f64) -> Result<f64, AnalyticsError> {
    require("value_at_risk", r, 1)?;
    if !(0.0..=100.0).contains(&level) {
        return Err(AnalyticsError::Calculation(format!(
            "percentile level {} is outside [0, 100]",
            level
        )));
    }
    let mut sorted = r.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (sorted.len() - 1) as f64 * level / 100.0;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Mean of every return at or below the VaR at `level`.
pub fn conditional_value_at_risk(r: &[f64], level: f64) -> Result<f64, AnalyticsError> {
    let var = value_at_risk(r, level)?;
    let tail: Vec<f64> = r.iter().copied().filter(|x| *x <= var).collect();
    // The minimum is always <= any percentile, so the tail is never empty.
    Ok(mean(&tail))
}

pub fn starr_ratio(r: &[f64], level: f64) -> Result<f64, AnalyticsError> {
    let cvar = conditional_value_at_risk(r, level)?;
    divide("starr_ratio", annualized_return(r)?, cvar)
}

/// Per-period drawdown of the cumulative curve against its trailing
/// [`DRAWDOWN_WINDOW`]-period peak.
pub fn drawdown_series(r: &[f64]) -> Vec<f64> {
    let cumulative = cumulative_return(r);
    (0..cumulative.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(DRAWDOWN_WINDOW);
            let peak = cumulative[start..=i]
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            cumulative[i] / peak - 1.0
        })
        .collect()
}

/// The most negative value of [`drawdown_series`]; zero for a curve that never falls.
pub fn max_drawdown(r: &[f64]) -> Result<f64, AnalyticsError> {
    require("max_drawdown", r, 1)?;
    Ok(drawdown_series(r).into_iter().fold(0.0, f64::min))
}

/// Adjusted Fisher-Pearson sample skewness.
pub fn skewness(r: &[f64]) -> Result<f64, AnalyticsError> {
    require("skewness", r, 3)?;
    let n = r.len() as f64;
    let m = mean(r);
    let m2 = r.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n;
    let m3 = r.iter().map(|x| (x - m).powi(3)).sum::<f64>() / n;
    let g1 = divide("skewness", m3, m2.powf(1.5))?;
    Ok(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

/// Unbiased sample excess kurtosis.
pub fn kurtosis(r: &[f64]) -> Result<f64, AnalyticsError> {
    require("kurtosis", r, 4)?;
    let n = r.len() as f64;
    let m = mean(r);
    let m2 = r.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n;
    let m4 = r.iter().map(|x| (x - m).powi(4)).sum::<f64>() / n;
    let g2 = divide("kurtosis", m4, m2 * m2)? - 3.0;
    Ok(((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0)))
}

/// Applies `metric` to every trailing `window` of the series, dated at the
/// window's last observation. Windows where the metric is undefined are skipped.
pub fn rolling<F>(series: &ReturnSeries, window: usize, metric: F) -> ReturnSeries
where
    F: Fn(&[f64]) -> Result<f64, AnalyticsError>,
{
    let mut out = ReturnSeries::default();
    if window == 0 || series.len() < window {
        return out;
    }
    for end in window..=series.len() {
        if let Ok(value) = metric(&series.values()[end - window..end]) {
            // Dates come from an already ordered series.
            let _ = out.push(series.dates()[end - 1], value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(start_day: u32, values: &[f64]) -> ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, start_day).unwrap();
        ReturnSeries::new(
            (0..values.len()).map(|i| start + chrono::Duration::days(i as i64)).collect(),
            values.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_cumulative_round_trips_to_simple_returns() {
        let r = [0.01, -0.02, 0.035, 0.0, -0.5, 1.0];
        let back = returns_from_cumulative(&cumulative_return(&r));
        for (a, b) in r.iter().zip(&back) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_total_and_annualized_return() {
        let r = [0.1, -0.1];
        assert_relative_eq!(total_return(&r), -0.01, epsilon = 1e-12);

        let daily = vec![0.001; 252];
        assert_relative_eq!(annualized_return(&daily).unwrap(), 1.001f64.powi(252) - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        assert!(matches!(
            annualized_return(&[]),
            Err(AnalyticsError::InsufficientData { required: 1, actual: 0, .. })
        ));
        assert!(matches!(
            annualized_volatility(&[0.01]),
            Err(AnalyticsError::InsufficientData { required: 2, actual: 1, .. })
        ));
        assert!(sharpe(&[0.01], 0.0).is_err());
        assert!(max_drawdown(&[]).is_err());
    }

    #[test]
    fn test_volatility_uses_sample_std() {
        let r = [0.01, 0.03];
        // sample std of [0.01, 0.03] = sqrt(0.0002)
        assert_relative_eq!(
            annualized_volatility(&r).unwrap(),
            0.0002f64.sqrt() * 252f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sharpe_with_zero_volatility_is_division_by_zero() {
        let r = [0.01, 0.01, 0.01];
        assert!(matches!(sharpe(&r, 0.0), Err(AnalyticsError::DivisionByZero(_))));
    }

    #[test]
    fn test_sortino_uses_downside_deviation() {
        let r = [0.02, -0.01, 0.03, -0.03, 0.01];
        let expected = annualized_return(&r).unwrap() / downside_deviation(&r).unwrap();
        assert_relative_eq!(sortino(&r, 0.0).unwrap(), expected, epsilon = 1e-12);
        assert!(downside_deviation(&[0.01, 0.02, -0.01]).is_err());
    }

    #[test]
    fn test_value_at_risk_interpolates_like_numpy() {
        let r = [0.05, -0.02, 0.01, -0.04, 0.03];
        // sorted: -0.04 -0.02 0.01 0.03 0.05; rank = 4 * 0.05 = 0.2
        assert_relative_eq!(value_at_risk(&r, 5.0).unwrap(), -0.04 + 0.02 * 0.2, epsilon = 1e-12);
        assert_relative_eq!(value_at_risk(&r, 50.0).unwrap(), 0.01, epsilon = 1e-12);
        assert_relative_eq!(value_at_risk(&r, 100.0).unwrap(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_cvar_averages_tail() {
        let r = [0.05, -0.02, 0.01, -0.04, 0.03];
        // VaR(50) = 0.01 -> mean of -0.04, -0.02, 0.01
        assert_relative_eq!(conditional_value_at_risk(&r, 50.0).unwrap(), -0.05 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(conditional_value_at_risk(&r, 100.0).unwrap(), 0.006, epsilon = 1e-12);
    }

    #[test]
    fn test_starr_is_return_over_cvar() {
        let r = [0.05, -0.02, 0.01, -0.04, 0.03];
        let expected = annualized_return(&r).unwrap() / conditional_value_at_risk(&r, 5.0).unwrap();
        assert_relative_eq!(starr_ratio(&r, 5.0).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_max_drawdown_of_rising_curve_is_zero() {
        let r = [0.01, 0.02, 0.0, 0.03];
        assert_eq!(max_drawdown(&r).unwrap(), 0.0);
    }

    #[test]
    fn test_max_drawdown_of_halving_then_recovery() {
        let r = [0.1, -0.5, 1.0, 0.05];
        assert_relative_eq!(max_drawdown(&r).unwrap(), -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_drawdown_peak_only_looks_back_one_year() {
        // A 50% fall followed by 300 flat days: the old peak leaves the window.
        let mut r = vec![-0.5];
        r.insert(0, 0.0);
        r.extend(std::iter::repeat(0.0).take(300));
        let dd = drawdown_series(&r);
        assert_relative_eq!(dd[1], -0.5, epsilon = 1e-12);
        assert_relative_eq!(*dd.last().unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beta_aligns_to_overlap() {
        let market = series(1, &[0.01, -0.02, 0.03, 0.01, -0.01]);
        // Same values, doubled, but starting two days later and one day longer.
        let strategy = series(3, &[0.06, 0.02, -0.02, 0.5]);
        // Overlap is day 3..5: strategy [0.06, 0.02, -0.02] vs market [0.03, 0.01, -0.01]
        assert_relative_eq!(beta(&strategy, &market).unwrap(), 2.0, epsilon = 1e-12);

        let expected = annualized_return(&[0.06, 0.02, -0.02]).unwrap() / 2.0;
        assert_relative_eq!(treynor(&strategy, &market, 0.0).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_beta_without_overlap_is_misaligned() {
        let a = series(1, &[0.01, 0.02]);
        let b = series(10, &[0.01, 0.02]);
        assert!(matches!(beta(&a, &b), Err(AnalyticsError::MisalignedSeries(_))));
    }

    #[test]
    fn test_skewness_and_kurtosis_of_symmetric_sample() {
        let r = [-0.02, -0.01, 0.0, 0.01, 0.02];
        assert_relative_eq!(skewness(&r).unwrap(), 0.0, epsilon = 1e-12);
        // pandas: pd.Series([-2, -1, 0, 1, 2]).kurt() == -1.2
        assert_relative_eq!(kurtosis(&r).unwrap(), -1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_rolling_dates_at_window_end() {
        let s = series(1, &[0.01, 0.02, 0.03, 0.04]);
        let rolled = rolling(&s, 2, |w| Ok(total_return(w)));
        assert_eq!(rolled.len(), 3);
        assert_eq!(rolled.first_date(), s.dates().get(1).copied());
        assert_relative_eq!(rolled.values()[0], 1.01 * 1.02 - 1.0, epsilon = 1e-12);
        assert!(rolling(&s, 5, |w| Ok(total_return(w))).is_empty());
    }
}
