use crate::error::{CommodityPriceError, Result};
use crate::month_key::MonthKey;

/// Inclusive range of accepted years. The upper bound is always one year past
/// the current year so forward-dated contracts survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    min_year: i32,
    max_year: i32,
}

impl RecencyWindow {
    pub fn new(min_year: i32, current_year: i32) -> Result<Self> {
        let max_year = current_year.saturating_add(1);
        if min_year > max_year {
            return Err(CommodityPriceError::InvalidYearWindow(format!(
                "minimum year {} is after the maximum year {}",
                min_year, max_year
            )));
        }
        Ok(Self { min_year, max_year })
    }

    pub fn years_back(current_year: i32, max_years_back: u32) -> Self {
        let years_back = i32::try_from(max_years_back).unwrap_or(i32::MAX);
        Self {
            min_year: current_year.saturating_sub(years_back),
            max_year: current_year.saturating_add(1),
        }
    }

    pub fn min_year(&self) -> i32 {
        self.min_year
    }

    pub fn max_year(&self) -> i32 {
        self.max_year
    }

    pub fn contains(&self, key: &MonthKey) -> bool {
        (self.min_year..=self.max_year).contains(&key.year())
    }
}

pub fn in_window(key: &MonthKey, max_years_back: u32, current_year: i32) -> bool {
    RecencyWindow::years_back(current_year, max_years_back).contains(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(year: i32) -> MonthKey {
        MonthKey::new(year, 6).unwrap()
    }

    #[test]
    fn test_years_back_boundaries() {
        assert!(in_window(&key(2021), 5, 2026));
        assert!(!in_window(&key(2020), 5, 2026));
        assert!(in_window(&key(2026), 5, 2026));
        assert!(in_window(&key(2027), 5, 2026));
        assert!(!in_window(&key(2028), 5, 2026));
    }

    #[test]
    fn test_zero_years_back() {
        let window = RecencyWindow::years_back(2026, 0);
        assert_eq!(window.min_year(), 2026);
        assert_eq!(window.max_year(), 2027);
        assert!(!window.contains(&key(2025)));
    }

    #[test]
    fn test_explicit_min_year() {
        let window = RecencyWindow::new(2019, 2026).unwrap();
        assert!(window.contains(&key(2019)));
        assert!(!window.contains(&key(2018)));

        assert!(matches!(
            RecencyWindow::new(2030, 2026),
            Err(CommodityPriceError::InvalidYearWindow(_))
        ));
    }

    #[test]
    fn test_huge_years_back_saturates() {
        let june = key(2026);
        assert!(in_window(&june, u32::MAX, 2026));
        assert!(in_window(&june, 1 << 31, 2026));
        assert!(in_window(&key(0), u32::MAX, 2026));

        let window = RecencyWindow::years_back(2026, u32::MAX);
        assert_eq!(window.max_year(), 2027);
        assert!(window.min_year() < 0);
    }

    #[test]
    fn test_extreme_current_year_does_not_overflow() {
        let window = RecencyWindow::years_back(i32::MAX, 5);
        assert_eq!(window.max_year(), i32::MAX);
        assert!(!window.contains(&key(2026)));

        let window = RecencyWindow::years_back(i32::MIN, u32::MAX);
        assert_eq!(window.min_year(), i32::MIN);
        assert!(RecencyWindow::new(0, i32::MAX).is_ok());
    }
}
