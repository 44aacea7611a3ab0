use crate::models::{AttendanceStatus, StatsView};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregateStats {
    pub percentage: f64,
    pub present_count: u32,
    pub absent_count: u32,
    pub half_present_count: u32,
    pub half_absent_count: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Good,
    Warning,
    Low,
}

impl AggregateStats {
    /// Half-present and half-absent are reported together.
    pub fn half_count(&self) -> u32 {
        self.half_present_count + self.half_absent_count
    }

    pub fn effective_present(&self) -> f64 {
        f64::from(self.present_count)
            + 0.5 * f64::from(self.half_present_count)
            + 0.5 * f64::from(self.half_absent_count)
    }

    pub fn percentage_label(&self) -> String {
        format!("{:.1}", self.percentage)
    }

    pub fn standing(&self) -> Standing {
        if self.percentage >= 75.0 {
            Standing::Good
        } else if self.percentage >= 60.0 {
            Standing::Warning
        } else {
            Standing::Low
        }
    }

    pub fn view(&self) -> StatsView {
        StatsView {
            percentage: self.percentage,
            percentage_label: self.percentage_label(),
            present_count: self.present_count,
            absent_count: self.absent_count,
            half_count: self.half_count(),
            total: self.total,
            standing: self.standing(),
        }
    }
}

pub fn aggregate<I>(statuses: I) -> AggregateStats
where
    I: IntoIterator<Item = AttendanceStatus>,
{
    let mut stats = AggregateStats::default();
    for status in statuses {
        stats.total += 1;
        match status {
            AttendanceStatus::Present => stats.present_count += 1,
            AttendanceStatus::Absent => stats.absent_count += 1,
            AttendanceStatus::HalfPresent => stats.half_present_count += 1,
            AttendanceStatus::HalfAbsent => stats.half_absent_count += 1,
        }
    }

    if stats.total > 0 {
        let raw = 100.0 * stats.effective_present() / f64::from(stats.total);
        stats.percentage = round_one_decimal(raw);
    }
    stats
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttendanceStatus::*;

    #[test]
    fn empty_set_is_zero() {
        let stats = aggregate(Vec::<AttendanceStatus>::new());
        assert_eq!(stats, AggregateStats::default());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percentage_label(), "0.0");
        assert_eq!(stats.half_count(), 0);
    }

    #[test]
    fn all_present_is_full() {
        let stats = aggregate(vec![Present; 7]);
        assert_eq!(stats.percentage, 100.0);
        assert_eq!(stats.percentage_label(), "100.0");
        assert_eq!(stats.standing(), Standing::Good);
    }

    #[test]
    fn half_statuses_weigh_half() {
        let stats = aggregate(vec![Present, Present, HalfPresent, HalfPresent]);
        assert_eq!(stats.effective_present(), 3.0);
        assert_eq!(stats.percentage, 75.0);

        let mixed = aggregate(vec![Present, Present, HalfPresent, HalfAbsent]);
        assert_eq!(mixed.percentage, 75.0);
        assert_eq!(mixed.half_count(), 2);
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        let stats = aggregate(vec![Present, Absent, Absent]);
        assert_eq!(stats.percentage, 33.3);
        assert_eq!(stats.percentage_label(), "33.3");

        let stats = aggregate(vec![Present, Present, Absent]);
        assert_eq!(stats.percentage_label(), "66.7");
        assert_eq!(stats.standing(), Standing::Warning);
    }

    #[test]
    fn mixed_month_matches_expected_breakdown() {
        let stats = aggregate(vec![Present, HalfPresent, Absent]);
        let view = stats.view();
        assert_eq!(view.present_count, 1);
        assert_eq!(view.absent_count, 1);
        assert_eq!(view.half_count, 1);
        assert_eq!(view.total, 3);
        assert_eq!(view.percentage, 50.0);
        assert_eq!(view.percentage_label, "50.0");
        assert_eq!(view.standing, Standing::Low);
    }
}
