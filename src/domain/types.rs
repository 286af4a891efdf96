//! Shared domain enumerations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named preset of downstream cache durations applied to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    /// Never cached; for collections expected to change between requests.
    #[default]
    None,
    Short,
    Medium,
    Long,
}

/// Durations, in seconds, carried by a cacheable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDurations {
    pub browser_max_age: u32,
    pub shared_max_age: u32,
    pub stale_while_revalidate: u32,
}

impl CacheDurations {
    const fn from_ages(browser_max_age: u32, shared_max_age: u32) -> Self {
        Self {
            browser_max_age,
            shared_max_age,
            stale_while_revalidate: shared_max_age * 2,
        }
    }
}

impl CacheTier {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheTier::None => "none",
            CacheTier::Short => "short",
            CacheTier::Medium => "medium",
            CacheTier::Long => "long",
        }
    }

    /// `None` for the uncached tier.
    pub fn durations(self) -> Option<CacheDurations> {
        match self {
            CacheTier::None => None,
            CacheTier::Short => Some(CacheDurations::from_ages(60, 300)),
            CacheTier::Medium => Some(CacheDurations::from_ages(300, 600)),
            CacheTier::Long => Some(CacheDurations::from_ages(3600, 86_400)),
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown cache tier `{0}` (expected none|short|medium|long)")]
pub struct ParseCacheTierError(String);

impl FromStr for CacheTier {
    type Err = ParseCacheTierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CacheTier::None),
            "short" => Ok(CacheTier::Short),
            "medium" => Ok(CacheTier::Medium),
            "long" => Ok(CacheTier::Long),
            _ => Err(ParseCacheTierError(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_window_is_twice_the_shared_age() {
        for tier in [CacheTier::Short, CacheTier::Medium, CacheTier::Long] {
            let durations = tier.durations().expect("cacheable tier");
            assert_eq!(
                durations.stale_while_revalidate,
                durations.shared_max_age * 2
            );
        }
        assert!(CacheTier::None.durations().is_none());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("LONG".parse::<CacheTier>().unwrap(), CacheTier::Long);
        assert!("forever".parse::<CacheTier>().is_err());
    }
}
