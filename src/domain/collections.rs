//! Catalogue of the queryable collections and their filter/sort vocabulary.

use super::types::CacheTier;

/// Name of the statistics document served outside the collection catalogue.
pub const STATS_DOCUMENT: &str = "stats";

/// How a filter value is compared against a raw record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive equality.
    Exact,
    /// Case-insensitive substring or equality.
    Contains,
}

/// Maps a normalized filter value to the raw values tagging may use for it.
pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

/// Upstream tagging is inconsistent, so each domain id accepts its spelled-out forms.
pub const DOMAIN_ALIASES: AliasTable = &[
    ("cv", &["computer vision", "cv"]),
    ("nlp", &["nlp", "natural language processing"]),
    ("web", &["web development", "web dev", "web"]),
    ("design", &["design", "ui/ux", "creative"]),
    ("ml", &["machine learning", "ml"]),
    ("dl", &["deep learning", "dl"]),
    ("rl", &["reinforcement learning", "rl"]),
];

#[derive(Debug, Clone, Copy)]
pub struct FilterDimension {
    /// Query parameter name.
    pub name: &'static str,
    /// Record field the dimension reads.
    pub field: &'static str,
    pub mode: MatchMode,
    pub aliases: AliasTable,
}

impl FilterDimension {
    /// Lowercased raw values accepted for `value`.
    pub fn acceptable_values(&self, value: &str) -> Vec<String> {
        let needle = value.trim().to_lowercase();
        match self
            .aliases
            .iter()
            .find(|(alias, _)| *alias == needle.as_str())
        {
            Some((_, accepted)) => accepted.iter().map(|raw| raw.to_string()).collect(),
            None => vec![needle],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    TextAscending(&'static str),
    DateAscending(&'static str),
    DateDescending(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct SortOption {
    pub key: &'static str,
    pub comparator: Comparator,
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub default_limit: usize,
    pub filters: &'static [FilterDimension],
    pub sorts: &'static [SortOption],
    /// Ordering applied when no known sort key is requested; `None` keeps declared order.
    pub default_order: Option<Comparator>,
    pub cache_tier: CacheTier,
}

impl CollectionSpec {
    pub fn filter(&self, name: &str) -> Option<&FilterDimension> {
        self.filters.iter().find(|dimension| dimension.name == name)
    }

    /// Comparator for `key`, falling back to the default ordering for unknown keys.
    pub fn comparator(&self, key: Option<&str>) -> Option<Comparator> {
        key.and_then(|key| {
            self.sorts
                .iter()
                .find(|option| option.key == key)
                .map(|option| option.comparator)
        })
        .or(self.default_order)
    }
}

pub const PROJECTS: CollectionSpec = CollectionSpec {
    name: "projects",
    default_limit: 6,
    filters: &[
        FilterDimension {
            name: "category",
            field: "category",
            mode: MatchMode::Exact,
            aliases: DOMAIN_ALIASES,
        },
        FilterDimension {
            name: "status",
            field: "status",
            mode: MatchMode::Exact,
            aliases: &[],
        },
    ],
    sorts: &[SortOption {
        key: "name",
        comparator: Comparator::TextAscending("name"),
    }],
    default_order: None,
    cache_tier: CacheTier::None,
};

pub const MEMBERS: CollectionSpec = CollectionSpec {
    name: "members",
    default_limit: 9,
    filters: &[
        FilterDimension {
            name: "batch",
            field: "batch",
            mode: MatchMode::Exact,
            aliases: &[],
        },
        FilterDimension {
            name: "domain",
            field: "domain",
            mode: MatchMode::Contains,
            aliases: DOMAIN_ALIASES,
        },
    ],
    sorts: &[],
    default_order: None,
    cache_tier: CacheTier::None,
};

pub const BLOGS: CollectionSpec = CollectionSpec {
    name: "blogs",
    default_limit: 6,
    filters: &[],
    sorts: &[
        SortOption {
            key: "newest",
            comparator: Comparator::DateDescending("date"),
        },
        SortOption {
            key: "oldest",
            comparator: Comparator::DateAscending("date"),
        },
    ],
    default_order: Some(Comparator::DateDescending("date")),
    cache_tier: CacheTier::None,
};

pub const CATALOGUE: &[CollectionSpec] = &[PROJECTS, MEMBERS, BLOGS];

pub fn find(name: &str) -> Option<&'static CollectionSpec> {
    CATALOGUE.iter().find(|spec| spec.name == name)
}
