use std::path::{Path, PathBuf};

use tracing::debug;

use super::run_tool;
use crate::error::ScanError;

/// A working copy of a package's repository under the repos directory.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub dir: PathBuf,
}

impl Checkout {
    /// `<repos_dir>/<package name>`; scoped names nest one level deeper.
    pub fn for_package(repos_dir: &Path, package: &str) -> Self {
        Self {
            dir: repos_dir.join(package),
        }
    }

    /// Clone (depth 1) unless a previous run left a checkout, then install
    /// declared dependencies with lifecycle scripts disabled.
    pub async fn prepare(&self, repository: &str, verbose: bool) -> Result<(), ScanError> {
        if self.dir.join(".git").exists() {
            debug!(dir = %self.dir.display(), "Reusing existing checkout");
        } else {
            if let Some(parent) = self.dir.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| super::tooling("git", e.to_string()))?;
            }
            run_tool("git", &clone_args(repository, &self.dir), None, verbose).await?;
        }

        run_tool("npm", &install_args(), Some(&self.dir), verbose).await
    }

    pub async fn remove(&self) {
        if let Err(err) = tokio::fs::remove_dir_all(&self.dir).await {
            debug!(dir = %self.dir.display(), "Could not remove checkout: {err}");
        }
    }
}

fn clone_args(repository: &str, dir: &Path) -> Vec<String> {
    vec![
        "clone".to_string(),
        "--depth=1".to_string(),
        repository.to_string(),
        dir.to_string_lossy().into_owned(),
    ]
}

fn install_args() -> Vec<String> {
    vec!["install".to_string(), "--ignore-scripts".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_dir_follows_package_name() {
        let repos = Path::new("repos");
        assert_eq!(Checkout::for_package(repos, "express").dir, PathBuf::from("repos/express"));
        assert_eq!(
            Checkout::for_package(repos, "@babel/core").dir,
            PathBuf::from("repos/@babel/core")
        );
    }

    #[test]
    fn test_clone_is_shallow() {
        let args = clone_args("https://github.com/a/b", Path::new("repos/b"));
        assert_eq!(args, vec!["clone", "--depth=1", "https://github.com/a/b", "repos/b"]);
    }

    #[test]
    fn test_install_skips_scripts() {
        assert!(install_args().contains(&"--ignore-scripts".to_string()));
    }

    #[tokio::test]
    async fn test_remove_missing_dir_is_quiet() {
        let dir = tempfile::TempDir::new().unwrap();
        let checkout = Checkout::for_package(dir.path(), "gone");
        checkout.remove().await;
        assert!(!checkout.dir.exists());
    }
}
