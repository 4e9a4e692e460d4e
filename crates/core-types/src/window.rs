use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One rebalancing period: weights are fitted on the in-sample dates and
/// applied over the out-of-sample dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Window {
    is_start: NaiveDate,
    is_end: NaiveDate,
    os_start: NaiveDate,
    os_end: NaiveDate,
}

impl Window {
    /// Builds a window, enforcing `is_start <= is_end < os_start <= os_end`.
    pub fn new(
        is_start: NaiveDate,
        is_end: NaiveDate,
        os_start: NaiveDate,
        os_end: NaiveDate,
    ) -> Result<Self, CoreError> {
        let window = Self {
            is_start,
            is_end,
            os_start,
            os_end,
        };
        if is_start <= is_end && is_end < os_start && os_start <= os_end {
            Ok(window)
        } else {
            Err(CoreError::InvalidWindow(window.to_string()))
        }
    }

    /// A window whose in-sample and out-of-sample periods are both `[from, to]`.
    pub fn coincident(from: NaiveDate, to: NaiveDate) -> Result<Self, CoreError> {
        if from > to {
            return Err(CoreError::InvalidWindow(format!("{} > {}", from, to)));
        }
        Ok(Self {
            is_start: from,
            is_end: to,
            os_start: from,
            os_end: to,
        })
    }

    pub fn is_start(&self) -> NaiveDate {
        self.is_start
    }

    pub fn is_end(&self) -> NaiveDate {
        self.is_end
    }

    pub fn os_start(&self) -> NaiveDate {
        self.os_start
    }

    pub fn os_end(&self) -> NaiveDate {
        self.os_end
    }

    /// Whether `date` falls in the half-open out-of-sample range `[os_start, os_end)`.
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.os_start <= date && date < self.os_end
    }

    /// The row label of the weight vector this window produces.
    pub fn label(&self) -> String {
        format!("{}/{}", self.os_start, self.os_end)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IS {} -> {}, OS {} -> {}",
            self.is_start, self.is_end, self.os_start, self.os_end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_enforces_ordering() {
        let ok = Window::new(date(2020, 1, 1), date(2020, 12, 31), date(2021, 1, 1), date(2021, 4, 1));
        assert!(ok.is_ok());

        let overlapping = Window::new(date(2020, 1, 1), date(2021, 1, 1), date(2021, 1, 1), date(2021, 4, 1));
        assert!(matches!(overlapping, Err(CoreError::InvalidWindow(_))));
    }

    #[test]
    fn test_out_of_sample_range_is_half_open() {
        let w = Window::new(date(2020, 1, 1), date(2020, 12, 31), date(2021, 1, 1), date(2021, 4, 1)).unwrap();
        assert!(w.applies_to(date(2021, 1, 1)));
        assert!(w.applies_to(date(2021, 3, 31)));
        assert!(!w.applies_to(date(2021, 4, 1)));
        assert_eq!(w.label(), "2021-01-01/2021-04-01");
    }

    #[test]
    fn test_coincident_window_spans_full_range() {
        let w = Window::coincident(date(2013, 1, 1), date(2017, 12, 31)).unwrap();
        assert_eq!(w.is_start(), w.os_start());
        assert_eq!(w.is_end(), w.os_end());
        assert!(Window::coincident(date(2018, 1, 1), date(2017, 1, 1)).is_err());
    }
}
