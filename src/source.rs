//! Provenance of metadata values.
//!
//! Every scalar field and every photo-label association records the source
//! that last wrote it. Sources are totally ordered by a [`PriorityTable`];
//! a value may only be overwritten by a source of equal or higher priority.

use std::collections::HashMap;

pub const SRC_AUTO: &str = "auto";
pub const SRC_ESTIMATE: &str = "estimate";
pub const SRC_NAME: &str = "name";
pub const SRC_LOCATION: &str = "location";
pub const SRC_IMAGE: &str = "image";
pub const SRC_KEYWORD: &str = "keyword";
pub const SRC_META: &str = "meta";
pub const SRC_XMP: &str = "xmp";
pub const SRC_VISION: &str = "vision";
pub const SRC_MANUAL: &str = "manual";
pub const SRC_BATCH: &str = "batch";
pub const SRC_ADMIN: &str = "admin";

/// All sources known to the default table.
pub const ALL_SOURCES: &[&str] = &[
    SRC_AUTO,
    SRC_ESTIMATE,
    SRC_NAME,
    SRC_LOCATION,
    SRC_IMAGE,
    SRC_KEYWORD,
    SRC_META,
    SRC_XMP,
    SRC_VISION,
    SRC_MANUAL,
    SRC_BATCH,
    SRC_ADMIN,
];

/// Immutable mapping from source name to priority.
///
/// Unknown sources rank at 0, below everything in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    priorities: HashMap<String, i32>,
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::from_pairs([
            (SRC_AUTO, 1),
            (SRC_ESTIMATE, 2),
            (SRC_NAME, 4),
            (SRC_LOCATION, 8),
            (SRC_IMAGE, 8),
            (SRC_KEYWORD, 16),
            (SRC_META, 16),
            (SRC_XMP, 32),
            (SRC_VISION, 64),
            (SRC_MANUAL, 64),
            (SRC_BATCH, 64),
            (SRC_ADMIN, 128),
        ])
    }
}

impl PriorityTable {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        Self {
            priorities: pairs.into_iter().map(|(s, p)| (s.into(), p)).collect(),
        }
    }

    /// Default table with entries replaced or added from `overrides`.
    pub fn with_overrides(overrides: &HashMap<String, i32>) -> Self {
        let mut table = Self::default();
        for (source, priority) in overrides {
            table.priorities.insert(source.clone(), *priority);
        }
        table
    }

    pub fn priority(&self, source: &str) -> i32 {
        self.priorities.get(source).copied().unwrap_or(0)
    }

    /// True if a value from `a` may replace a value from `b`.
    pub fn higher_or_equal(&self, a: &str, b: &str) -> bool {
        self.priority(a) >= self.priority(b)
    }

    /// Entries ordered by priority, ties broken by name. For display only.
    pub fn entries(&self) -> Vec<(&str, i32)> {
        let mut entries: Vec<(&str, i32)> = self
            .priorities
            .iter()
            .map(|(s, p)| (s.as_str(), *p))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}
