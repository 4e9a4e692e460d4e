use crate::window::Window;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Weights at or below this value are treated as "not held" when counting positions.
pub const POSITION_THRESHOLD: f64 = 1e-5;

/// Weight changes at or below this value are ignored in rebalance summaries.
const REBALANCE_THRESHOLD: f64 = 1e-6;

/// The portfolio weights governing one window's out-of-sample period.
///
/// Sparse: an asset that is not present has zero exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    window: Window,
    weights: BTreeMap<String, f64>,
}

impl WeightVector {
    pub fn new(window: Window, weights: BTreeMap<String, f64>) -> Self {
        Self { window, weights }
    }

    /// Pairs `assets[i]` with `values[i]`.
    pub fn from_assets(window: Window, assets: &[String], values: &[f64]) -> Self {
        let weights = assets.iter().cloned().zip(values.iter().copied()).collect();
        Self { window, weights }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn label(&self) -> String {
        self.window.label()
    }

    /// The weight of `asset`, zero when the asset is not held.
    pub fn get(&self, asset: &str) -> f64 {
        self.weights.get(asset).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Number of positions with a weight above `threshold`.
    pub fn size(&self, threshold: f64) -> usize {
        self.weights.values().filter(|w| **w > threshold).count()
    }
}

/// What changed between one rebalance and the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceSummary {
    pub label: String,
    /// Capital rotated into new or increased positions. `None` for the first window.
    pub turnover: Option<f64>,
    pub positions_left: usize,
    pub positions_added: usize,
    pub size: usize,
    /// Held positions, heaviest first.
    pub holdings: Vec<(String, f64)>,
}

/// One weight vector per successfully computed window, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightHistory {
    rows: Vec<WeightVector>,
}

impl WeightHistory {
    pub fn new(mut rows: Vec<WeightVector>) -> Self {
        rows.sort_by_key(|r| *r.window());
        Self { rows }
    }

    pub fn rows(&self) -> &[WeightVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of every asset held in any window.
    pub fn assets(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .flat_map(|r| r.weights.keys().cloned())
            .collect()
    }

    /// Sum of positive weight deltas between each consecutive pair of windows.
    pub fn turnovers(&self) -> Vec<f64> {
        let assets = self.assets();
        self.rows
            .windows(2)
            .map(|pair| {
                assets
                    .iter()
                    .map(|a| pair[1].get(a) - pair[0].get(a))
                    .filter(|delta| *delta > 0.0)
                    .sum()
            })
            .collect()
    }

    /// Mean turnover across rebalances. Undefined with fewer than two windows.
    pub fn average_turnover(&self) -> Option<f64> {
        mean(&self.turnovers())
    }

    /// Mean number of positions above [`POSITION_THRESHOLD`].
    pub fn average_size(&self) -> Option<f64> {
        let sizes: Vec<f64> = self
            .rows
            .iter()
            .map(|r| r.size(POSITION_THRESHOLD) as f64)
            .collect();
        mean(&sizes)
    }

    pub fn rebalances(&self) -> Vec<RebalanceSummary> {
        let assets = self.assets();
        let mut summaries = Vec::with_capacity(self.rows.len());

        for (i, row) in self.rows.iter().enumerate() {
            let (turnover, positions_left, positions_added) = match i.checked_sub(1) {
                Some(prev) => {
                    let previous = &self.rows[prev];
                    let mut turnover = 0.0;
                    let mut left = 0;
                    let mut added = 0;
                    for asset in &assets {
                        let (before, after) = (previous.get(asset), row.get(asset));
                        let delta = after - before;
                        if delta > REBALANCE_THRESHOLD {
                            turnover += delta;
                        }
                        if after < REBALANCE_THRESHOLD && before > REBALANCE_THRESHOLD {
                            left += 1;
                        }
                        if after > REBALANCE_THRESHOLD && before < REBALANCE_THRESHOLD {
                            added += 1;
                        }
                    }
                    (Some(turnover), left, added)
                }
                None => (None, 0, 0),
            };

            let mut holdings: Vec<(String, f64)> = row
                .iter()
                .filter(|(_, w)| *w > REBALANCE_THRESHOLD)
                .map(|(a, w)| (a.to_string(), w))
                .collect();
            holdings.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

            summaries.push(RebalanceSummary {
                label: row.label(),
                turnover,
                positions_left,
                positions_added,
                size: holdings.len(),
                holdings,
            });
        }

        summaries
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
