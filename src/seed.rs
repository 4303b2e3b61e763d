//! One-shot import of findings from the line-oriented text format:
//!
//! ```text
//! <package_name>: <dep1> <dep2> ...
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::store::FindingsStore;

/// Split a line into package name and dependency set. Lines without a
/// colon, or with nothing after it, yield `None`.
pub fn parse_line(line: &str) -> Option<(String, BTreeSet<String>)> {
    let (name, deps) = line.split_once(':')?;
    let name = name.trim();
    let deps: BTreeSet<String> = deps.split_whitespace().map(str::to_string).collect();
    if name.is_empty() || deps.is_empty() {
        return None;
    }
    Some((name.to_string(), deps))
}

/// Upsert every valid line of `content`; returns how many lines were applied.
pub fn seed_from_str(store: &FindingsStore, content: &str) -> Result<usize> {
    let mut count = 0;
    for (name, deps) in content.lines().filter_map(parse_line) {
        store.upsert(&name, &deps, None)?;
        count += 1;
    }
    Ok(count)
}

pub fn seed_from_file(store: &FindingsStore, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("{} not found or unreadable", path.display()))?;
    seed_from_str(store, &content)
}
