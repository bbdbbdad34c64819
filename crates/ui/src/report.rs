// crates/ui/src/report.rs
//! State for the analytics report overlay (spec.md §4.5). The view owns
//! nothing but which `Period` is selected; the actual aggregation always
//! goes through `taskboard_db::analytics`, run fresh whenever the period
//! changes or the overlay opens.

use taskboard_db::Period;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportState {
    pub period: Period,
}

impl Default for ReportState {
    fn default() -> Self {
        Self { period: Period::Week }
    }
}

impl ReportState {
    pub fn cycle_period(&mut self) {
        self.period = match self.period {
            Period::Day => Period::Week,
            Period::Week => Period::Month,
            Period::Month => Period::Day,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_period_wraps_day_week_month() {
        let mut r = ReportState::default();
        assert_eq!(r.period, Period::Week);
        r.cycle_period();
        assert_eq!(r.period, Period::Month);
        r.cycle_period();
        assert_eq!(r.period, Period::Day);
        r.cycle_period();
        assert_eq!(r.period, Period::Week);
    }
}
