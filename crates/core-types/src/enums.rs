use serde::{Deserialize, Serialize};

/// The allocation rule a strategy uses to turn an in-sample return slice into
/// portfolio weights.
///
/// Deserialized from the `method` key of a `[[strategies]]` entry, with the
/// method arguments living next to it:
///
/// ```toml
/// [[strategies]]
/// name = "Min CVaR"
/// method = "min_cvar"
/// level = 5.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AllocationMethod {
    /// `1/N` on every asset with a complete in-sample history.
    EquallyWeighted,
    /// Uniform random draws renormalized to sum to one.
    Random,
    /// Minimum annualized volatility, optionally above a required annual return.
    MinVol {
        #[serde(default)]
        target_return: Option<f64>,
    },
    /// Maximum annualized Sharpe ratio (risk-free rate of zero).
    MaxSharpe,
    /// Maximum conditional value at risk (least severe tail) at a percentile level.
    MinCvar { level: f64 },
    /// Maximum return while matching the benchmark's CVaR spread between every
    /// ordered pair of tail percentiles.
    MaxReturnWithTailMatching,
    /// Maximin of `benchmark CVaR - portfolio CVaR` over a fixed percentile grid.
    StochasticDominance,
}

impl AllocationMethod {
    /// Whether this method needs the benchmark return series.
    pub fn requires_benchmark(&self) -> bool {
        matches!(
            self,
            AllocationMethod::MaxReturnWithTailMatching | AllocationMethod::StochasticDominance
        )
    }

    /// The snake_case name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            AllocationMethod::EquallyWeighted => "equally_weighted",
            AllocationMethod::Random => "random",
            AllocationMethod::MinVol { .. } => "min_vol",
            AllocationMethod::MaxSharpe => "max_sharpe",
            AllocationMethod::MinCvar { .. } => "min_cvar",
            AllocationMethod::MaxReturnWithTailMatching => "max_return_with_tail_matching",
            AllocationMethod::StochasticDominance => "stochastic_dominance",
        }
    }
}

/// What the simulator does when a window's weight calculation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the window out of the weight history, log it and keep going.
    #[default]
    Skip,
    /// Fail the whole simulation once every window has finished.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Entry {
        #[serde(flatten)]
        method: AllocationMethod,
    }

    #[test]
    fn test_method_reads_arguments_next_to_tag() {
        let entry: Entry = serde_json::from_str(r#"{"method":"min_cvar","level":5.0}"#).unwrap();
        assert_eq!(entry.method, AllocationMethod::MinCvar { level: 5.0 });
        assert!(!entry.method.requires_benchmark());
    }

    #[test]
    fn test_min_vol_target_is_optional() {
        let entry: Entry = serde_json::from_str(r#"{"method":"min_vol"}"#).unwrap();
        assert_eq!(entry.method, AllocationMethod::MinVol { target_return: None });
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let entry = serde_json::from_str::<Entry>(r#"{"method":"min_vol_master"}"#);
        assert!(entry.is_err());
    }

    #[test]
    fn test_benchmark_methods_and_names() {
        assert!(!AllocationMethod::Random.requires_benchmark());
        assert!(AllocationMethod::StochasticDominance.requires_benchmark());
        assert_eq!(AllocationMethod::MaxReturnWithTailMatching.name(), "max_return_with_tail_matching");
    }
}
