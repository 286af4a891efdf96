//! Named comparators. Sorting is stable, so ties keep declared order.

use std::cmp::Ordering;

use databyte_api_types::Record;
use time::{Date, macros::format_description};

use crate::domain::collections::Comparator;

pub fn sort_records(records: &mut [&Record], comparator: Comparator) {
    match comparator {
        Comparator::TextAscending(field) => {
            records.sort_by(|left, right| compare_text(left.text(field), right.text(field)));
        }
        Comparator::DateAscending(field) => {
            records.sort_by(|left, right| {
                compare_dates(parse_date(left, field), parse_date(right, field), false)
            });
        }
        Comparator::DateDescending(field) => {
            records.sort_by(|left, right| {
                compare_dates(parse_date(left, field), parse_date(right, field), true)
            });
        }
    }
}

/// Case-insensitive first, raw text as tie-break; missing values sort last.
fn compare_text(left: Option<&str>, right: Option<&str>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left
            .to_lowercase()
            .cmp(&right.to_lowercase())
            .then_with(|| left.cmp(right)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Unparsable or missing dates sort last in either direction.
fn compare_dates(left: Option<Date>, right: Option<Date>, descending: bool) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) if descending => right.cmp(&left),
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn parse_date(record: &Record, field: &str) -> Option<Date> {
    let raw = record.text(field)?;
    // Timestamps such as `2024-02-10T08:00:00Z` sort by their calendar day.
    let day = raw.get(..10).unwrap_or(raw);
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}
