use std::path::Path;

use anyhow::{Context, Result};

use crate::models::IndexRange;

/// The ordered list of every package name batches index into.
#[derive(Debug, Clone)]
pub struct Universe {
    names: Vec<String>,
}

impl Universe {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Read a JSON array of package names.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read package names from {}", path.display()))?;
        let names: Vec<String> = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a JSON array of names", path.display()))?;
        Ok(Self::new(names))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Names in `range`, clamped to the universe.
    pub fn slice(&self, range: IndexRange) -> &[String] {
        let end = range.end.min(self.names.len());
        let start = range.start.min(end);
        &self.names[start..end]
    }
}
