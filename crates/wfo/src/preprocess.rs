use configuration::SimulationConfig;
use core_types::ReturnMatrix;

/// Rolling period of the RSI momentum filter, in observations.
pub const RSI_PERIOD: usize = 84;

/// Assets whose latest RSI reaches this level are left out of a window.
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Optional transformations applied to a window's in-sample slice before the
/// allocation rule sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessing {
    /// EWMA span. `1` leaves returns untouched.
    pub smoothing_span: usize,
    pub momentum_filter: bool,
}

impl Default for Preprocessing {
    fn default() -> Self {
        Self {
            smoothing_span: 1,
            momentum_filter: false,
        }
    }
}

impl Preprocessing {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            smoothing_span: config.smoothing_span,
            momentum_filter: config.momentum_filter,
        }
    }

    /// Smooths, then filters. Expects a slice without missing values.
    pub fn apply(&self, in_sample: &ReturnMatrix) -> ReturnMatrix {
        let smoothed = if self.smoothing_span > 1 {
            in_sample.map_columns(|column| backward_ewma(column, self.smoothing_span))
        } else {
            in_sample.clone()
        };

        if !self.momentum_filter {
            return smoothed;
        }

        let keep: Vec<usize> = (0..smoothed.asset_count())
            .filter(|&j| match relative_strength(&smoothed.column(j), RSI_PERIOD) {
                Some(rsi) => rsi < RSI_OVERBOUGHT,
                None => true,
            })
            .collect();

        if keep.len() < smoothed.asset_count() {
            tracing::debug!(
                kept = keep.len(),
                total = smoothed.asset_count(),
                "Momentum filter excluded overbought assets."
            );
        }
        smoothed.select_columns(&keep)
    }
}

/// Exponentially weighted moving average run from the newest observation back
/// to the oldest, with smoothing factor `2 / (span + 1)`.
///
/// The newest value is kept as is; every older value blends in the more
/// recent ones.
pub fn backward_ewma(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = vec![0.0; values.len()];
    let mut previous: Option<f64> = None;
    for (i, &x) in values.iter().enumerate().rev() {
        let y = match previous {
            Some(p) => (1.0 - alpha) * p + alpha * x,
            None => x,
        };
        out[i] = y;
        previous = Some(y);
    }
    out
}

/// Relative strength index over the last `period` returns:
/// `100 - 100 / (1 + up / down)`, where `up` is the mean of the positive parts
/// and `down` the mean magnitude of the negative parts.
///
/// `None` with fewer than `period` observations or when every return in the
/// window is zero.
pub fn relative_strength(returns: &[f64], period: usize) -> Option<f64> {
    if period == 0 || returns.len() < period {
        return None;
    }
    let recent = &returns[returns.len() - period..];
    let up = recent.iter().map(|r| r.max(0.0)).sum::<f64>() / period as f64;
    let down = recent.iter().map(|r| (-r).max(0.0)).sum::<f64>() / period as f64;

    if down == 0.0 {
        return if up > 0.0 { Some(100.0) } else { None };
    }
    Some(100.0 - 100.0 / (1.0 + up / down))
}
