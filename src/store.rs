//! Flat-file findings store.
//!
//! The whole store is one JSON array of [`Finding`] records. Every read parses
//! the file in full and every mutation rewrites it in full, so the store is
//! only safe with a single writer. Reads are fail-soft: a missing, empty, or
//! unparseable file reads as an empty store. Writes never discard data they
//! could not parse.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{DependencyCount, Finding, Stats};

#[derive(Debug)]
pub struct FindingsStore {
    path: PathBuf,
}

impl FindingsStore {
    /// Open the store at `path`, creating an empty file if none exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: path.clone(),
                    source,
                })?;
            }
            std::fs::write(&path, "").map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "Created empty findings store");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge `phantom_deps` into the record for `package_name`.
    ///
    /// An empty dependency set leaves the store untouched. A provided
    /// `download_count` replaces the stored one; `None` keeps it.
    pub fn upsert(
        &self,
        package_name: &str,
        phantom_deps: &BTreeSet<String>,
        download_count: Option<u64>,
    ) -> Result<(), StoreError> {
        if phantom_deps.is_empty() {
            return Ok(());
        }

        let mut findings = self.read_strict()?;
        let now = Utc::now();

        match findings.iter_mut().find(|f| f.package_name == package_name) {
            Some(existing) => {
                existing.phantom_deps.extend(phantom_deps.iter().cloned());
                if download_count.is_some() {
                    existing.download_count = download_count;
                }
                existing.last_updated = now;
            }
            None => findings.push(Finding {
                package_name: package_name.to_string(),
                phantom_deps: phantom_deps.clone(),
                download_count,
                last_updated: now,
            }),
        }

        self.write(&findings)
    }

    pub fn get(&self, package_name: &str) -> Option<Finding> {
        self.list_all()
            .into_iter()
            .find(|f| f.package_name == package_name)
    }

    /// Every finding in persisted order.
    pub fn list_all(&self) -> Vec<Finding> {
        match self.read_strict() {
            Ok(findings) => findings,
            Err(err) => {
                warn!("{err}; treating store as empty");
                Vec::new()
            }
        }
    }

    /// Findings whose phantom dependencies include `dependency_name`,
    /// compared case-insensitively and exactly.
    pub fn search_by_dependency(&self, dependency_name: &str) -> Vec<Finding> {
        let needle = dependency_name.to_lowercase();
        self.list_all()
            .into_iter()
            .filter(|f| f.phantom_deps.iter().any(|d| d.to_lowercase() == needle))
            .collect()
    }

    pub fn compute_statistics(&self) -> Stats {
        compute_statistics(&self.list_all())
    }

    /// Truncate the store to empty.
    pub fn clear(&self) -> Result<(), StoreError> {
        std::fs::write(&self.path, "").map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Parse the store, distinguishing "empty" from "unreadable".
    fn read_strict(&self) -> Result<Vec<Finding>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, findings: &[Finding]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(findings)?;
        std::fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Statistics over an already-loaded set of findings.
pub fn compute_statistics(findings: &[Finding]) -> Stats {
    let total_packages = findings.len();
    let total_phantom_deps: usize = findings.iter().map(|f| f.phantom_deps.len()).sum();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for dep in findings.iter().flat_map(|f| f.phantom_deps.iter()) {
        *counts.entry(dep.as_str()).or_insert(0) += 1;
    }

    let mut most_common: Vec<DependencyCount> = counts
        .into_iter()
        .map(|(name, packages)| DependencyCount {
            name: name.to_string(),
            packages,
        })
        .collect();
    most_common.sort_by(|a, b| b.packages.cmp(&a.packages).then_with(|| a.name.cmp(&b.name)));

    let average_phantom_deps_per_package = if total_packages > 0 {
        total_phantom_deps as f64 / total_packages as f64
    } else {
        0.0
    };

    Stats {
        total_packages,
        total_phantom_deps,
        most_common_phantom_deps: most_common,
        average_phantom_deps_per_package,
    }
}
