//! Lenient query-string parsing. Malformed input is coerced, never rejected.

use std::collections::BTreeMap;

use databyte_api_types::MAX_PAGE_LIMIT;
use url::form_urlencoded;

const PAGE_PARAM: &str = "page";
const LIMIT_PARAM: &str = "limit";
const SORT_PARAM: &str = "sort";

/// Value that disables a filter dimension.
pub const ALL_SENTINEL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub page: usize,
    pub limit: usize,
    pub filters: BTreeMap<String, String>,
    pub sort: Option<String>,
}

impl QueryParams {
    /// First page of `default_limit` items with no filters or sort.
    pub fn new(default_limit: usize) -> Self {
        Self {
            page: 1,
            limit: clamp_limit(None, default_limit),
            filters: BTreeMap::new(),
            sort: None,
        }
    }

    /// Parse a raw query string; the last occurrence of a repeated key wins.
    pub fn parse(raw: Option<&str>, default_limit: usize) -> Self {
        let mut page = None;
        let mut limit = None;
        let mut sort = None;
        let mut filters = BTreeMap::new();

        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                PAGE_PARAM => page = Some(value.into_owned()),
                LIMIT_PARAM => limit = Some(value.into_owned()),
                SORT_PARAM => sort = Some(value.into_owned()),
                _ => {
                    filters.insert(key.into_owned(), value.into_owned());
                }
            }
        }

        Self {
            page: clamp_page(page.as_deref()),
            limit: clamp_limit(limit.as_deref(), default_limit),
            filters,
            sort: sort.filter(|value| !value.trim().is_empty()),
        }
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    /// Filters that actually constrain the result set.
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .filter(|(_, value)| is_active_filter(value))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

pub fn is_active_filter(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(ALL_SENTINEL)
}

fn clamp_page(raw: Option<&str>) -> usize {
    match raw.and_then(parse_int_prefix) {
        Some(page) if page >= 1 => usize::try_from(page).unwrap_or(usize::MAX),
        _ => 1,
    }
}

fn clamp_limit(raw: Option<&str>, default_limit: usize) -> usize {
    let requested = match raw.and_then(parse_int_prefix) {
        Some(0) | None => i64::try_from(default_limit).unwrap_or(i64::MAX),
        Some(value) => value,
    };
    let bounded = requested.clamp(1, MAX_PAGE_LIMIT as i64);
    usize::try_from(bounded).unwrap_or(1)
}

/// Leading-integer parse: optional whitespace and sign, then digits; saturates on overflow.
fn parse_int_prefix(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        seen_digit = true;
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(byte - b'0'));
    }

    seen_digit.then_some(if negative { -value } else { value })
}
