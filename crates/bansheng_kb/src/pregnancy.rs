//! Pregnancy progress and the per-week context handed to the prompt
//!
//! 40 weeks of 7 days, counted back from the due date.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

pub const PREGNANCY_WEEKS: u32 = 40;
pub const DAYS_PER_WEEK: u32 = 7;
pub const TOTAL_PREGNANCY_DAYS: i64 = (PREGNANCY_WEEKS * DAYS_PER_WEEK) as i64;

/// Where a pregnancy stands on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PregnancyProgress {
    /// 1..=40
    pub current_week: u32,
    /// 1..=7
    pub current_day: u32,
    /// 1..=3
    pub trimester: u8,
    /// Days elapsed since the start (>= 0)
    pub total_days: u32,
    /// Days left until the due date (>= 0)
    pub days_until_due: u32,
    /// 0.0..=100.0, one decimal
    pub progress_percent: f64,
}

/// Progress on `today` for a pregnancy due on `due_date`
pub fn calculate_progress(due_date: NaiveDate, today: NaiveDate) -> PregnancyProgress {
    let days_until_due = (due_date - today).num_days();
    let total_days = TOTAL_PREGNANCY_DAYS - days_until_due;

    let week = total_days.div_euclid(DAYS_PER_WEEK as i64) + 1;
    let day = (total_days % DAYS_PER_WEEK as i64) + 1;
    let current_week = week.clamp(1, PREGNANCY_WEEKS as i64) as u32;

    let percent = (total_days as f64 / TOTAL_PREGNANCY_DAYS as f64 * 100.0).clamp(0.0, 100.0);

    PregnancyProgress {
        current_week,
        current_day: day.clamp(1, DAYS_PER_WEEK as i64) as u32,
        trimester: trimester_for_week(current_week),
        total_days: total_days.max(0) as u32,
        days_until_due: days_until_due.max(0) as u32,
        progress_percent: (percent * 10.0).round() / 10.0,
    }
}

/// Progress as of the local calendar day
pub fn progress_today(due_date: NaiveDate) -> PregnancyProgress {
    calculate_progress(due_date, Local::now().date_naive())
}

pub fn trimester_for_week(week: u32) -> u8 {
    match week {
        0..=13 => 1,
        14..=27 => 2,
        _ => 3,
    }
}

pub fn trimester_name(trimester: u8) -> &'static str {
    match trimester {
        1 => "孕早期",
        2 => "孕中期",
        _ => "孕晚期",
    }
}

/// `第N周第D天`
pub fn format_week_display(week: u32, day: u32) -> String {
    format!("第{}周第{}天", week, day)
}

/// Due date from the first day of the last menstrual period
pub fn due_date_from_last_period(last_period: NaiveDate) -> NaiveDate {
    last_period + chrono::Duration::days(TOTAL_PREGNANCY_DAYS)
}

// =============================================================================
// Baby size
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BabySize {
    pub size: &'static str,
    pub weight: &'static str,
    pub comparison: &'static str,
}

const fn size(size: &'static str, weight: &'static str, comparison: &'static str) -> BabySize {
    BabySize {
        size,
        weight,
        comparison,
    }
}

const BABY_SIZES: [BabySize; PREGNANCY_WEEKS as usize] = [
    size("0.1mm", "-", "一粒尘埃"),
    size("0.2mm", "-", "一粒罂粟籽"),
    size("0.3mm", "-", "一粒芝麻"),
    size("1mm", "-", "一粒罂粟籽"),
    size("2mm", "-", "一粒芝麻"),
    size("6mm", "1g", "一颗扁豆"),
    size("1cm", "1g", "一颗蓝莓"),
    size("1.6cm", "1g", "一颗覆盆子"),
    size("2.3cm", "2g", "一颗樱桃"),
    size("3.1cm", "4g", "一颗草莓"),
    size("4.1cm", "7g", "一颗无花果"),
    size("5.4cm", "14g", "一颗青柠"),
    size("7.4cm", "23g", "一个柠檬"),
    size("8.7cm", "43g", "一个桃子"),
    size("10.1cm", "70g", "一个苹果"),
    size("11.6cm", "100g", "一个牛油果"),
    size("13cm", "140g", "一个石榴"),
    size("14.2cm", "190g", "一个甜椒"),
    size("15.3cm", "240g", "一个芒果"),
    size("16.4cm", "300g", "一根香蕉"),
    size("26.7cm", "360g", "一根胡萝卜"),
    size("27.8cm", "430g", "一个木瓜"),
    size("28.9cm", "500g", "一个大芒果"),
    size("30cm", "600g", "一根玉米棒"),
    size("34.6cm", "660g", "一个大头菜"),
    size("35.6cm", "760g", "一颗生菜"),
    size("36.6cm", "875g", "一颗花椰菜"),
    size("37.6cm", "1kg", "一颗茄子"),
    size("38.6cm", "1.15kg", "一颗南瓜"),
    size("39.9cm", "1.3kg", "一颗大白菜"),
    size("41.1cm", "1.5kg", "一个椰子"),
    size("42.4cm", "1.7kg", "一颗哈密瓜"),
    size("43.7cm", "1.9kg", "一个菠萝"),
    size("45cm", "2.1kg", "一个哈密瓜"),
    size("46.2cm", "2.4kg", "一个蜜瓜"),
    size("47.4cm", "2.6kg", "一颗罗马生菜"),
    size("48.6cm", "2.9kg", "一颗瑞士甜菜"),
    size("49.8cm", "3kg", "一颗韭葱"),
    size("50.7cm", "3.3kg", "一个小西瓜"),
    size("51.2cm", "3.5kg", "一个小南瓜"),
];

/// Size comparison for a week; out-of-range weeks are clamped
pub fn baby_size(week: u32) -> BabySize {
    let index = week.clamp(1, PREGNANCY_WEEKS) - 1;
    BABY_SIZES[index as usize]
}

// =============================================================================
// Prompt context
// =============================================================================

/// Caller state interpolated into the base prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PregnancyContext {
    pub current_week: u32,
    pub current_day: u32,
    pub trimester: u8,
    pub days_until_due: u32,
    #[serde(default)]
    pub warning_signs: Vec<String>,
}

impl PregnancyContext {
    pub fn from_progress(progress: &PregnancyProgress) -> Self {
        Self {
            current_week: progress.current_week,
            current_day: progress.current_day,
            trimester: progress.trimester,
            days_until_due: progress.days_until_due,
            warning_signs: Vec::new(),
        }
    }

    pub fn with_warning_signs(mut self, signs: Vec<String>) -> Self {
        self.warning_signs = signs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_progress_midway() {
        let due = date(2026, 10, 1);
        // 140 days before due: exactly half way
        let today = due - chrono::Duration::days(140);
        let p = calculate_progress(due, today);
        assert_eq!(p.total_days, 140);
        assert_eq!(p.current_week, 21);
        assert_eq!(p.current_day, 1);
        assert_eq!(p.trimester, 2);
        assert_eq!(p.days_until_due, 140);
        assert_eq!(p.progress_percent, 50.0);
    }

    #[test]
    fn test_progress_rounds_to_one_decimal() {
        let due = date(2026, 10, 1);
        let p = calculate_progress(due, due - chrono::Duration::days(279));
        assert_eq!(p.current_week, 1);
        assert_eq!(p.current_day, 2);
        assert_eq!(p.progress_percent, 0.4);
    }

    #[test]
    fn test_progress_clamps_out_of_range() {
        let due = date(2026, 10, 1);

        let overdue = calculate_progress(due, due + chrono::Duration::days(10));
        assert_eq!(overdue.current_week, 40);
        assert_eq!(overdue.days_until_due, 0);
        assert_eq!(overdue.progress_percent, 100.0);

        let early = calculate_progress(due, due - chrono::Duration::days(300));
        assert_eq!(early.current_week, 1);
        assert_eq!(early.current_day, 1);
        assert_eq!(early.total_days, 0);
        assert_eq!(early.progress_percent, 0.0);
    }

    #[test]
    fn test_trimesters() {
        assert_eq!(trimester_for_week(13), 1);
        assert_eq!(trimester_for_week(14), 2);
        assert_eq!(trimester_for_week(27), 2);
        assert_eq!(trimester_for_week(28), 3);
        assert_eq!(trimester_name(2), "孕中期");
    }

    #[test]
    fn test_baby_size_clamped() {
        assert_eq!(baby_size(20).comparison, "一根香蕉");
        assert_eq!(baby_size(0), baby_size(1));
        assert_eq!(baby_size(99).comparison, "一个小南瓜");
    }

    #[test]
    fn test_due_date_from_last_period() {
        assert_eq!(due_date_from_last_period(date(2026, 1, 1)), date(2026, 10, 8));
        assert_eq!(format_week_display(12, 3), "第12周第3天");
    }
}
