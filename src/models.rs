use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated phantom-dependency findings for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub package_name: String,
    #[serde(default)]
    pub phantom_deps: BTreeSet<String>,
    #[serde(default)]
    pub download_count: Option<u64>,
    #[serde(rename = "timestamp")]
    pub last_updated: DateTime<Utc>,
}

/// Aggregate view over the whole store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_packages: usize,
    pub total_phantom_deps: usize,
    /// Sorted by descending count, ties broken by ascending name.
    pub most_common_phantom_deps: Vec<DependencyCount>,
    pub average_phantom_deps_per_package: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyCount {
    pub name: String,
    pub packages: usize,
}

/// Half-open `[start, end)` slice of the package-name universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl std::fmt::Display for IndexRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}]", self.start, self.end)
    }
}
