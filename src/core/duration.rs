//! 將各後端的計費週期 (unit + 倍數) 正規化為 `Duration`，並提供顯示文字

use crate::domain::model::{Duration, DurationFormat, PeriodUnit};

/// 正規化計費週期
///
/// 常見週期對應到具名值 (weekly, everyTwoWeeks, monthly, ...)，其餘落到通用形式
/// `Days(n)` / `Weeks(n)` / `Months(n)` / `Years(n)`。沒有單位或倍數為 0 視為 lifetime。
pub fn normalize(unit: Option<PeriodUnit>, count: u32) -> Duration {
    let Some(unit) = unit else {
        return Duration::Lifetime;
    };
    if count == 0 {
        return Duration::Lifetime;
    }

    match (unit, count) {
        (PeriodUnit::Week, 1) => Duration::Weekly,
        (PeriodUnit::Week, 2) => Duration::EveryTwoWeeks,
        (PeriodUnit::Month, 1) => Duration::Monthly,
        (PeriodUnit::Month, 2) => Duration::EveryTwoMonths,
        (PeriodUnit::Month, 3) => Duration::EveryThreeMonths,
        (PeriodUnit::Month, 6) => Duration::EverySixMonths,
        (PeriodUnit::Year, 1) => Duration::Yearly,
        (PeriodUnit::Day, n) => Duration::Days(n),
        (PeriodUnit::Week, n) => Duration::Weeks(n),
        (PeriodUnit::Month, n) => Duration::Months(n),
        (PeriodUnit::Year, n) => Duration::Years(n),
    }
}

/// 解析 ISO-8601 週期，例如 `P1M`、`P2W`、`P1Y`、`P3D`
///
/// 只接受單一單位；`P1Y6M` 這類組合回傳 None。
pub fn parse_iso8601_period(raw: &str) -> Option<(PeriodUnit, u32)> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix('P')
        .or_else(|| trimmed.strip_prefix('p'))?;
    let designator = body.chars().last()?;
    let digits = &body[..body.len() - designator.len_utf8()];
    // 只接受 ASCII 數字，"+1"、全形數字都不算
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let count: u32 = digits.parse().ok()?;
    let unit = match designator.to_ascii_uppercase() {
        'D' => PeriodUnit::Day,
        'W' => PeriodUnit::Week,
        'M' => PeriodUnit::Month,
        'Y' => PeriodUnit::Year,
        _ => return None,
    };
    Some((unit, count))
}

impl Duration {
    /// 顯示文字，對任何值都有結果
    pub fn render(&self, format: DurationFormat) -> String {
        let only = format == DurationFormat::DurationOnly;
        match *self {
            Duration::Weekly => pick(only, "Week", "Weekly"),
            Duration::EveryTwoWeeks => pick(only, "2 Weeks", "Every 2 weeks"),
            Duration::Monthly => pick(only, "Month", "Monthly"),
            Duration::EveryTwoMonths => pick(only, "2 Months", "Every 2 months"),
            Duration::EveryThreeMonths => pick(only, "3 Months", "Every 3 months"),
            Duration::EverySixMonths => pick(only, "6 Months", "Every 6 months"),
            Duration::Yearly => pick(only, "Year", "Yearly"),
            Duration::Days(n) => generic(only, n, "Day", "Daily", "days"),
            Duration::Weeks(n) => generic(only, n, "Week", "Weekly", "weeks"),
            Duration::Months(n) => generic(only, n, "Month", "Monthly", "months"),
            Duration::Years(n) => generic(only, n, "Year", "Yearly", "years"),
            Duration::Lifetime => "Lifetime".to_string(),
        }
    }
}

fn pick(only: bool, noun: &str, adjective: &str) -> String {
    let text = if only { noun } else { adjective };
    text.to_string()
}

fn generic(only: bool, count: u32, noun: &str, adjective: &str, plural: &str) -> String {
    match count {
        0 => "Lifetime".to_string(),
        1 => pick(only, noun, adjective),
        n if only => format!("{} {}{}", n, &plural[..1].to_uppercase(), &plural[1..]),
        n => format!("Every {} {}", n, plural),
    }
}
