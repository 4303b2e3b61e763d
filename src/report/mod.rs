//! Report renderers for the findings store.
//!
//! - [`terminal`]: summary box plus tables for the analysis report, and a
//!   findings table for `list` / `search` / `show`.
//!
//! The JSON form of every report is built from [`Analysis`].

pub mod terminal;

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Finding, Stats};
use crate::store::FindingsStore;

/// Two phantom dependencies that show up in the same package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyPair {
    pub first: String,
    pub second: String,
    pub packages: usize,
}

/// Everything the `report` command shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub stats: Stats,
    pub newest: Vec<Finding>,
    pub common_pairs: Vec<DependencyPair>,
}

impl Analysis {
    pub const TOP_DEPS: usize = 10;
    const NEWEST: usize = 5;
    const TOP_PAIRS: usize = 5;

    pub fn from_store(store: &FindingsStore) -> Self {
        Self::build(&store.list_all(), store.compute_statistics())
    }

    fn build(findings: &[Finding], stats: Stats) -> Self {
        let mut newest = findings.to_vec();
        newest.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        newest.truncate(Self::NEWEST);

        let mut common_pairs = dependency_pairs(findings);
        common_pairs.retain(|p| p.packages > 1);
        common_pairs.truncate(Self::TOP_PAIRS);

        Self {
            stats,
            newest,
            common_pairs,
        }
    }
}

/// Count, for every unordered pair of phantom dependencies, how many packages
/// carry both. Sorted by descending count, then by pair.
pub fn dependency_pairs(findings: &[Finding]) -> Vec<DependencyPair> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for finding in findings {
        // BTreeSet iteration is sorted, so (a, b) always has a < b.
        let deps: Vec<&str> = finding.phantom_deps.iter().map(String::as_str).collect();
        for (i, first) in deps.iter().enumerate() {
            for second in &deps[i + 1..] {
                *counts.entry((*first, *second)).or_insert(0) += 1;
            }
        }
    }

    let mut pairs: Vec<DependencyPair> = counts
        .into_iter()
        .map(|((first, second), packages)| DependencyPair {
            first: first.to_string(),
            second: second.to_string(),
            packages,
        })
        .collect();
    pairs.sort_by(|a, b| {
        b.packages
            .cmp(&a.packages)
            .then_with(|| (&a.first, &a.second).cmp(&(&b.first, &b.second)))
    });
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::compute_statistics;
    use std::collections::BTreeSet;
    use chrono::{TimeZone, Utc};

    fn finding(name: &str, deps: &[&str], day: u32) -> Finding {
        Finding {
            package_name: name.to_string(),
            phantom_deps: deps.iter().map(|s| s.to_string()).collect(),
            download_count: None,
            last_updated: Utc.with_ymd_and_hms(2025, 10, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_dependency_pairs() {
        let findings = vec![
            finding("a", &["react", "lodash"], 1),
            finding("b", &["lodash", "react", "chalk"], 2),
            finding("c", &["chalk"], 3),
        ];
        let pairs = dependency_pairs(&findings);
        assert_eq!(
            pairs[0],
            DependencyPair {
                first: "lodash".into(),
                second: "react".into(),
                packages: 2,
            }
        );
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_analysis_keeps_only_repeated_pairs_and_newest_first() {
        let findings = vec![
            finding("old", &["x", "y"], 1),
            finding("new", &["x", "y"], 9),
            finding("mid", &["z", "w"], 5),
        ];
        let analysis = Analysis::build(&findings, compute_statistics(&findings));
        assert_eq!(analysis.common_pairs.len(), 1);
        assert_eq!(analysis.newest[0].package_name, "new");
        assert_eq!(analysis.newest[2].package_name, "old");
        assert_eq!(analysis.stats.total_packages, 3);
    }

    #[test]
    fn test_analysis_of_empty_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FindingsStore::open(dir.path().join("db.json")).unwrap();
        let analysis = Analysis::from_store(&store);
        assert!(analysis.newest.is_empty());
        assert!(analysis.common_pairs.is_empty());
        assert_eq!(analysis.stats.average_phantom_deps_per_package, 0.0);
    }

    #[test]
    fn test_analysis_from_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FindingsStore::open(dir.path().join("db.json")).unwrap();
        let deps = |names: &[&str]| -> BTreeSet<String> { names.iter().map(|s| s.to_string()).collect() };
        store.upsert("a", &deps(&["x", "y"]), None).unwrap();
        store.upsert("b", &deps(&["x", "y"]), Some(3)).unwrap();

        let analysis = Analysis::from_store(&store);
        assert_eq!(analysis.stats, store.compute_statistics());
        assert_eq!(analysis.stats.total_phantom_deps, 4);
        assert_eq!(analysis.common_pairs.len(), 1);
        assert_eq!(analysis.newest.len(), 2);
    }
}
