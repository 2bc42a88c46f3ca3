use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];
const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a calendar day typed by a user.
/// Supports `YYYY-MM-DD`, `YYYY/MM/DD` and `DD/MM/YYYY`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}

/// Parses a 24-hour time of day (`HH:MM` or `HH:MM:SS`).
pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(input, format).ok())
}

/// Parses a wall-clock date and time.
///
/// ISO 8601 forms (with `T` or a space) are tried first, then a bare date
/// (meaning midnight), then whatever `dateparser` recognizes. Values carrying
/// an offset are read in UTC; everything else is taken as wall-clock time.
pub fn parse_date_time(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(parsed) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
    {
        return Some(parsed);
    }

    if let Some(day) = parse_date(input) {
        return Some(day.and_time(NaiveTime::MIN));
    }

    dateparser::parse_with_timezone(input, &Utc)
        .ok()
        .map(|parsed| parsed.naive_utc())
}

/// Joins a day and a time of day into one instant.
pub fn combine(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}

/// Parses a non-negative amount, accepting `_` or `,` as thousands separators.
///
/// Separators are only accepted between groups of three digits.
pub fn parse_price(input: &str) -> Option<Decimal> {
    let trimmed = input.trim().trim_start_matches('₡');
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if fraction.contains([',', '_']) || !has_valid_grouping(whole) {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| *c != '_' && *c != ',')
        .collect();
    Decimal::from_str(&cleaned)
        .ok()
        .filter(|amount| !amount.is_sign_negative())
}

fn has_valid_grouping(whole: &str) -> bool {
    let digits = whole.trim_start_matches(['-', '+']);
    if !digits.contains([',', '_']) {
        return true;
    }
    let mut groups = digits.split([',', '_']);
    let first_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.chars().all(|c| c.is_ascii_digit()));
    first_ok && groups.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

/// Formats an amount in colones with thousands separators and two decimals.
pub fn format_price(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}₡{}.{}", sign, grouped, fraction)
}
