use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::IndexRange;
use crate::retry::RetryPolicy;

/// Root configuration structure, deserialized from `.phantom-scan/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub universe: UniverseConfig,
    pub registry: RegistryConfig,
    pub downloads: DownloadsConfig,
    pub batch: BatchConfig,
    pub checker: CheckerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Findings file, rewritten on every update.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("phantom_deps.json"),
        }
    }
}

/// Where the ordered list of npm package names comes from.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// JSON array of package names.
    pub names: PathBuf,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            names: PathBuf::from("all-the-package-names.json"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub metadata_url: String,
    pub downloads_url: String,
    pub user_agent: String,
    /// Total attempts per request, including the first.
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            metadata_url: "https://registry.npmjs.org".to_string(),
            downloads_url: "https://api.npmjs.org".to_string(),
            user_agent: concat!("phantom-scan/", env!("CARGO_PKG_VERSION")).to_string(),
            retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl RegistryConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retries,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Historical window the download counts are summed over.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    /// `YYYY-MM-DD`, inclusive.
    pub start: String,
    /// `YYYY-MM-DD`, inclusive.
    pub end: String,
    /// Packages at or below this many downloads are skipped. `0` disables the gate.
    pub threshold: u64,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            start: "2024-10-01".to_string(),
            end: "2025-09-30".to_string(),
            threshold: 10_000,
        }
    }
}

impl DownloadsConfig {
    /// The `start:end` string the downloads endpoint expects.
    pub fn period(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Preconfigured index range used by the "auto" tasks.
    pub auto_start: usize,
    pub auto_end: usize,
    /// Report progress after this many packages.
    pub progress_every: usize,
    /// Checkouts are cloned into `<repos_dir>/<package name>`.
    pub repos_dir: PathBuf,
    pub keep_checkouts: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            auto_start: 0,
            auto_end: 1000,
            progress_every: 20,
            repos_dir: PathBuf::from("repos"),
            keep_checkouts: true,
        }
    }
}

impl BatchConfig {
    pub fn auto_range(&self) -> IndexRange {
        IndexRange {
            start: self.auto_start,
            end: self.auto_end,
        }
    }
}

/// Invocation of the external dependency-usage checker.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Program followed by its leading arguments.
    pub command: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub ignore_matches: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            command: vec!["npx".into(), "--yes".into(), "depcheck".into()],
            ignore_dirs: vec!["dist".into(), "build".into(), "test".into()],
            ignore_matches: vec!["eslint*".into(), "eslint-plugin".into()],
        }
    }
}

impl Config {
    /// Reject values that would only fail later, mid-batch.
    pub fn validate(&self) -> Result<()> {
        let start = parse_date(&self.downloads.start).context("invalid [downloads] start")?;
        let end = parse_date(&self.downloads.end).context("invalid [downloads] end")?;
        if end < start {
            bail!(
                "[downloads] end ({}) is before start ({})",
                self.downloads.end,
                self.downloads.start
            );
        }
        if self.batch.auto_end < self.batch.auto_start {
            bail!(
                "[batch] auto_end ({}) is less than auto_start ({})",
                self.batch.auto_end,
                self.batch.auto_start
            );
        }
        if self.checker.command.is_empty() {
            bail!("[checker] command must name a program");
        }
        Ok(())
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got {value:?}"))
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `./.phantom-scan/config.toml`
/// 3. `~/.config/phantom-scan/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(working_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    let config: Config = match find_config(working_dir, config_override) {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

fn find_config(working_dir: &Path, config_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = config_override {
        return Some(path.to_path_buf());
    }

    let local = working_dir.join(".phantom-scan").join("config.toml");
    if local.exists() {
        return Some(local);
    }

    let home = dirs::home_dir()?
        .join(".config")
        .join("phantom-scan")
        .join("config.toml");
    home.exists().then_some(home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.store.path, PathBuf::from("phantom_deps.json"));
        assert_eq!(cfg.registry.retries, 3);
        assert_eq!(cfg.registry.retry_delay_ms, 1000);
        assert_eq!(cfg.downloads.threshold, 10_000);
        assert_eq!(cfg.batch.progress_every, 20);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml = r#"
[downloads]
start = "2025-01-01"
end = "2025-06-30"

[batch]
auto_start = 100
auto_end = 200
"#;
        let cfg: Config = toml::from_str(toml).unwrap();
        assert_eq!(cfg.downloads.period(), "2025-01-01:2025-06-30");
        assert_eq!(cfg.downloads.threshold, 10_000);
        assert_eq!(cfg.batch.auto_range(), IndexRange { start: 100, end: 200 });
        assert_eq!(cfg.batch.repos_dir, PathBuf::from("repos"));
        assert_eq!(cfg.checker.ignore_dirs, vec!["dist", "build", "test"]);
    }

    #[test]
    fn test_rejects_bad_dates() {
        let cfg: Config = toml::from_str("[downloads]\nstart = \"2025-13-01\"").unwrap();
        assert!(cfg.validate().is_err());

        let cfg: Config =
            toml::from_str("[downloads]\nstart = \"2025-06-01\"\nend = \"2025-01-01\"").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_auto_range() {
        let cfg: Config = toml::from_str("[batch]\nauto_start = 10\nauto_end = 5").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_override_path_wins() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "[store]\npath = \"custom.json\"\n").unwrap();
        let dir = TempDir::new().unwrap();
        let cfg = load_config(dir.path(), Some(f.path())).unwrap();
        assert_eq!(cfg.store.path, PathBuf::from("custom.json"));
    }

    #[test]
    fn test_project_config_is_found() {
        let dir = TempDir::new().unwrap();
        let cfg_dir = dir.path().join(".phantom-scan");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[registry]\nretries = 5\n").unwrap();
        let cfg = load_config(dir.path(), None).unwrap();
        assert_eq!(cfg.registry.retries, 5);
        assert_eq!(cfg.registry.retry_policy().attempts, 5);
    }
}
