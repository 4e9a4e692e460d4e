use crate::error::WfoError;
use chrono::{Days, Months, NaiveDate};
use configuration::SimulationConfig;
use core_types::Window;

/// Generates the rolling windows between `date_from` and `date_to`.
///
/// Each window optimizes on `in_sample_months` of history and holds the result
/// for `out_of_sample_months`. Consecutive out-of-sample periods are
/// contiguous. Month steps are always taken from `date_from`, so a month-end
/// start date stays at month end instead of drifting.
///
/// The last window's out-of-sample end is clamped to `date_to`.
pub fn generate(
    in_sample_months: u32,
    out_of_sample_months: u32,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> Result<Vec<Window>, WfoError> {
    if in_sample_months == 0 || out_of_sample_months == 0 {
        return Err(WfoError::DateError(format!(
            "periods must be at least one month (in-sample {}, out-of-sample {})",
            in_sample_months, out_of_sample_months
        )));
    }
    if date_from >= date_to {
        return Err(WfoError::DateError(format!(
            "date_from ({}) must be before date_to ({})",
            date_from, date_to
        )));
    }

    let add_months = |months: u32| {
        date_from
            .checked_add_months(Months::new(months))
            .ok_or_else(|| WfoError::DateError(format!("{} + {} months overflows", date_from, months)))
    };

    let mut windows = Vec::new();
    for step in 0.. {
        let offset = step * out_of_sample_months;
        let is_start = add_months(offset)?;
        let os_start = add_months(offset + in_sample_months)?;
        if os_start > date_to {
            break;
        }
        let is_end = os_start
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| WfoError::DateError(format!("no day before {}", os_start)))?;
        let os_end = add_months(offset + in_sample_months + out_of_sample_months)?;

        if os_end > date_to {
            windows.push(Window::new(is_start, is_end, os_start, date_to)?);
            break;
        }
        windows.push(Window::new(is_start, is_end, os_start, os_end)?);
    }

    if windows.is_empty() {
        return Err(WfoError::EmptyWindowSequence {
            from: date_from,
            to: date_to,
        });
    }
    Ok(windows)
}

/// The windows a simulation config asks for: rolling windows, or a single
/// window with identical in-sample and out-of-sample periods.
pub fn from_config(config: &SimulationConfig) -> Result<Vec<Window>, WfoError> {
    if config.os_equals_is {
        return Ok(vec![Window::coincident(config.date_from, config.date_to)?]);
    }
    generate(
        config.in_sample_months,
        config.out_of_sample_months,
        config.date_from,
        config.date_to,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_yearly_in_sample_quarterly_out_of_sample() {
        let windows = generate(12, 3, date(2013, 1, 1), date(2017, 12, 31)).unwrap();
        assert_eq!(windows.len(), 16);

        let first = windows[0];
        assert_eq!(first.is_start(), date(2013, 1, 1));
        assert_eq!(first.is_end(), date(2013, 12, 31));
        assert_eq!(first.os_start(), date(2014, 1, 1));
        assert_eq!(first.os_end(), date(2014, 4, 1));

        let last = windows[windows.len() - 1];
        assert_eq!(last.os_start(), date(2017, 10, 1));
        assert_eq!(last.os_end(), date(2017, 12, 31));
    }

    #[test]
    fn test_out_of_sample_periods_are_contiguous() {
        let windows = generate(6, 2, date(2010, 3, 15), date(2014, 7, 2)).unwrap();
        for pair in windows.windows(2) {
            assert_eq!(pair[0].os_end(), pair[1].os_start());
            assert_eq!(pair[1].is_start(), pair[0].is_start().checked_add_months(Months::new(2)).unwrap());
        }
    }

    #[test]
    fn test_month_end_start_does_not_drift() {
        let windows = generate(1, 1, date(2020, 1, 31), date(2020, 6, 30)).unwrap();
        assert_eq!(windows[0].os_start(), date(2020, 2, 29));
        assert_eq!(windows[1].os_start(), date(2020, 3, 31));
        assert_eq!(windows[1].is_start(), date(2020, 2, 29));
    }

    #[test]
    fn test_range_shorter_than_in_sample_is_empty() {
        let result = generate(12, 3, date(2020, 1, 1), date(2020, 6, 30));
        assert!(matches!(result, Err(WfoError::EmptyWindowSequence { .. })));
    }

    #[test]
    fn test_window_starting_on_last_date_is_kept() {
        let windows = generate(1, 1, date(2020, 1, 1), date(2020, 2, 1)).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].os_start(), date(2020, 2, 1));
        assert_eq!(windows[0].os_end(), date(2020, 2, 1));
    }

    #[test]
    fn test_zero_length_periods_are_rejected() {
        assert!(matches!(
            generate(0, 3, date(2013, 1, 1), date(2017, 12, 31)),
            Err(WfoError::DateError(_))
        ));
        assert!(matches!(
            generate(12, 0, date(2013, 1, 1), date(2017, 12, 31)),
            Err(WfoError::DateError(_))
        ));
    }

    #[test]
    fn test_coincident_mode_yields_one_window() {
        let mut config = SimulationConfig::new(date(2015, 1, 1), date(2016, 1, 1));
        config.os_equals_is = true;
        let windows = from_config(&config).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].is_start(), windows[0].os_start());
        assert_eq!(windows[0].is_end(), windows[0].os_end());
    }
}
