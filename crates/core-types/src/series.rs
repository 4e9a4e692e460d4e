use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A dated series of `f64` values with strictly increasing, unique dates.
///
/// Used for simple returns, for compounded share values and for any derived
/// per-date metric (rolling statistics, drawdowns).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, CoreError> {
        if dates.len() != values.len() {
            return Err(CoreError::InvalidInput(
                "ReturnSeries".to_string(),
                format!("{} dates but {} values", dates.len(), values.len()),
            ));
        }
        check_increasing(&dates)?;
        Ok(Self { dates, values })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let (dates, values) = pairs.into_iter().unzip();
        Self::new(dates, values)
    }

    /// Appends an observation. The date must come after the current last date.
    pub fn push(&mut self, date: NaiveDate, value: f64) -> Result<(), CoreError> {
        if let Some(&last) = self.dates.last() {
            if date <= last {
                return Err(CoreError::UnorderedDates {
                    previous: last,
                    current: date,
                });
            }
        }
        self.dates.push(date);
        self.values.push(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Looks up the value recorded on `date`.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    /// The observations dated within `[from, to]`, both ends inclusive.
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> Self {
        let (start, end) = inclusive_range(&self.dates, from, to);
        Self {
            dates: self.dates[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }

    /// The last `n` observations. `0`, or anything longer than the series,
    /// returns the whole series.
    pub fn tail(&self, n: usize) -> Self {
        if n == 0 || n >= self.len() {
            return self.clone();
        }
        let start = self.len() - n;
        Self {
            dates: self.dates[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Restricts both series to their overlapping date range and keeps only the
    /// dates present in both. Returns `None` when nothing overlaps.
    pub fn overlap(&self, other: &ReturnSeries) -> Option<(ReturnSeries, ReturnSeries)> {
        let from = self.first_date()?.max(other.first_date()?);
        let to = self.last_date()?.min(other.last_date()?);
        if from > to {
            return None;
        }

        let left = self.between(from, to);
        let right = other.between(from, to);

        let mut a = ReturnSeries::default();
        let mut b = ReturnSeries::default();
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            match left.dates[i].cmp(&right.dates[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    a.dates.push(left.dates[i]);
                    a.values.push(left.values[i]);
                    b.dates.push(right.dates[j]);
                    b.values.push(right.values[j]);
                    i += 1;
                    j += 1;
                }
            }
        }

        if a.is_empty() { None } else { Some((a, b)) }
    }
}

/// A dates × assets table of fractional returns. `NaN` marks a missing
/// observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnMatrix {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    pub fn new(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, CoreError> {
        if dates.len() != rows.len() {
            return Err(CoreError::InvalidInput(
                "ReturnMatrix".to_string(),
                format!("{} dates but {} rows", dates.len(), rows.len()),
            ));
        }
        check_increasing(&dates)?;

        let mut seen = HashSet::new();
        for asset in &assets {
            if !seen.insert(asset.as_str()) {
                return Err(CoreError::InvalidInput(
                    "ReturnMatrix".to_string(),
                    format!("duplicate asset column '{}'", asset),
                ));
            }
        }

        for (row, values) in rows.iter().enumerate() {
            if values.len() != assets.len() {
                return Err(CoreError::RowWidth {
                    row,
                    expected: assets.len(),
                    actual: values.len(),
                });
            }
        }

        Ok(Self { dates, assets, rows })
    }

    /// Builds a matrix from per-asset columns sharing one date index.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, CoreError> {
        if columns.len() != assets.len() {
            return Err(CoreError::InvalidInput(
                "ReturnMatrix".to_string(),
                format!("{} assets but {} columns", assets.len(), columns.len()),
            ));
        }
        let rows = (0..dates.len())
            .map(|i| columns.iter().map(|c| c.get(i).copied().unwrap_or(f64::NAN)).collect())
            .collect();
        Self::new(dates, assets, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn value(&self, row: usize, column: usize) -> f64 {
        self.rows[row][column]
    }

    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[index]).collect()
    }

    /// The rows dated within `[from, to]`, both ends inclusive.
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> Self {
        let (start, end) = inclusive_range(&self.dates, from, to);
        Self {
            dates: self.dates[start..end].to_vec(),
            assets: self.assets.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// Drops the first `n` rows.
    pub fn skip_rows(&self, n: usize) -> Self {
        let start = n.min(self.len());
        Self {
            dates: self.dates[start..].to_vec(),
            assets: self.assets.clone(),
            rows: self.rows[start..].to_vec(),
        }
    }

    /// Keeps only the given columns, in the given order.
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        Self {
            dates: self.dates.clone(),
            assets: indices.iter().map(|&j| self.assets[j].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&j| r[j]).collect())
                .collect(),
        }
    }

    /// Replaces every column with `f(column)`, keeping dates and assets.
    /// Missing output values become `NaN`, extra ones are dropped.
    pub fn map_columns<F>(&self, f: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let columns: Vec<Vec<f64>> = (0..self.asset_count()).map(|j| f(&self.column(j))).collect();
        let rows = (0..self.len())
            .map(|i| columns.iter().map(|c| c.get(i).copied().unwrap_or(f64::NAN)).collect())
            .collect();
        Self {
            dates: self.dates.clone(),
            assets: self.assets.clone(),
            rows,
        }
    }

    /// Drops every column holding at least one missing value.
    pub fn complete_columns(&self) -> Self {
        let keep: Vec<usize> = (0..self.asset_count())
            .filter(|&j| self.rows.iter().all(|r| !r[j].is_nan()))
            .collect();
        self.select_columns(&keep)
    }
}

fn check_increasing(dates: &[NaiveDate]) -> Result<(), CoreError> {
    for pair in dates.windows(2) {
        if pair[1] <= pair[0] {
            return Err(CoreError::UnorderedDates {
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}

fn inclusive_range(dates: &[NaiveDate], from: NaiveDate, to: NaiveDate) -> (usize, usize) {
    let start = dates.partition_point(|d| *d < from);
    let end = dates.partition_point(|d| *d <= to).max(start);
    (start, end)
}
