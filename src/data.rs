//! CSV loading for the return tables.
//!
//! Both files are `date,column1,column2,...` with ISO dates. An empty cell is
//! a missing observation.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use core_types::{ReturnMatrix, ReturnSeries};
use csv::ReaderBuilder;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads an asset return table, one column per asset.
pub fn load_returns(path: &Path) -> Result<ReturnMatrix> {
    let (assets, dates, rows) = read_table(path)?;
    tracing::info!(
        path = %path.display(),
        assets = assets.len(),
        dates = dates.len(),
        "Loaded return table."
    );
    Ok(ReturnMatrix::new(dates, assets, rows)?)
}

/// Reads a benchmark series from the first value column of a table.
/// Dates without a value are skipped.
pub fn load_benchmark(path: &Path) -> Result<ReturnSeries> {
    let (columns, dates, rows) = read_table(path)?;
    if columns.is_empty() {
        bail!("{} has no value column", path.display());
    }
    let series = ReturnSeries::from_pairs(
        dates
            .into_iter()
            .zip(rows)
            .map(|(date, row)| (date, row[0]))
            .filter(|(_, value)| !value.is_nan()),
    )?;
    tracing::info!(path = %path.display(), dates = series.len(), "Loaded benchmark.");
    Ok(series)
}

fn read_table(path: &Path) -> Result<(Vec<String>, Vec<NaiveDate>, Vec<Vec<f64>>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let columns: Vec<String> = reader.headers()?.iter().skip(1).map(str::to_string).collect();
    let mut dates = Vec::new();
    let mut rows = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: bad record {}", path.display(), line + 2))?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .with_context(|| format!("{}: invalid date '{}' on line {}", path.display(), raw_date, line + 2))?;

        let row = (1..=columns.len())
            .map(|i| match record.get(i) {
                None | Some("") => Ok(f64::NAN),
                Some(cell) => cell
                    .parse::<f64>()
                    .with_context(|| format!("{}: invalid number '{}' on line {}", path.display(), cell, line + 2)),
            })
            .collect::<Result<Vec<f64>>>()?;

        dates.push(date);
        rows.push(row);
    }

    Ok((columns, dates, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_cells_are_missing() {
        let f = file("date,A,B\n2020-01-01,0.01,\n2020-01-02,-0.02,0.03\n");
        let matrix = load_returns(f.path()).unwrap();
        assert_eq!(matrix.assets(), &["A".to_string(), "B".to_string()]);
        assert!(matrix.value(0, 1).is_nan());
        assert_eq!(matrix.value(1, 1), 0.03);
    }

    #[test]
    fn test_benchmark_skips_missing_dates() {
        let f = file("date,Index\n2020-01-01,0.01\n2020-01-02,\n2020-01-03,0.02\n");
        let series = load_benchmark(f.path()).unwrap();
        assert_eq!(series.values(), &[0.01, 0.02]);
    }

    #[test]
    fn test_bad_date_is_reported() {
        let f = file("date,A\n01/02/2020,0.01\n");
        let err = load_returns(f.path()).unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }
}
