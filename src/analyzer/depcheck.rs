use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;

use super::{capture_tool, tooling};
use crate::config::CheckerConfig;
use crate::error::ScanError;

/// The external dependency-usage checker (`depcheck` by default).
pub struct Depcheck<'a> {
    config: &'a CheckerConfig,
}

impl<'a> Depcheck<'a> {
    pub fn new(config: &'a CheckerConfig) -> Self {
        Self { config }
    }

    /// Module names imported somewhere under `dir` but not declared in its
    /// `package.json`.
    pub async fn missing(&self, dir: &Path) -> Result<BTreeSet<String>, ScanError> {
        let (program, leading) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| tooling("checker", "no command configured".to_string()))?;

        let mut args = leading.to_vec();
        args.extend(self.args());

        // depcheck exits non-zero whenever it reports anything, so the exit
        // status says nothing about success. Unparseable output does.
        let output = capture_tool(program, &args, dir).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_missing(&stdout).ok_or_else(|| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tooling(
                program,
                format!("unreadable report ({}): {}", output.status, stderr.trim()),
            )
        })
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![".".to_string(), "--json".to_string()];
        if !self.config.ignore_dirs.is_empty() {
            args.push(format!("--ignore-dirs={}", self.config.ignore_dirs.join(",")));
        }
        if !self.config.ignore_matches.is_empty() {
            args.push(format!("--ignores={}", self.config.ignore_matches.join(",")));
        }
        args
    }
}

/// Keys of the report's `missing` object. `None` if the report isn't JSON.
fn parse_missing(report: &str) -> Option<BTreeSet<String>> {
    let json: Value = serde_json::from_str(report.trim()).ok()?;
    let missing = json
        .get("missing")
        .and_then(|m| m.as_object())
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    Some(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_missing() {
        let report = r#"{
  "dependencies": ["unused-dep"],
  "devDependencies": [],
  "missing": {
    "lodash": ["/repo/src/index.js"],
    "@types/node": ["/repo/src/a.ts", "/repo/src/b.ts"]
  },
  "using": {},
  "invalidFiles": {},
  "invalidDirs": {}
}"#;
        let missing = parse_missing(report).unwrap();
        assert_eq!(
            missing.into_iter().collect::<Vec<_>>(),
            vec!["@types/node".to_string(), "lodash".to_string()]
        );
    }

    #[test]
    fn test_clean_report_has_no_missing() {
        let missing = parse_missing(r#"{"dependencies":[],"missing":{}}"#).unwrap();
        assert!(missing.is_empty());
        assert!(parse_missing(r#"{"dependencies":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_report_is_rejected() {
        assert!(parse_missing("npm ERR! something broke").is_none());
        assert!(parse_missing("").is_none());
    }

    #[test]
    fn test_args_carry_ignores() {
        let config = CheckerConfig::default();
        let args = Depcheck::new(&config).args();
        assert_eq!(
            args,
            vec![
                ".",
                "--json",
                "--ignore-dirs=dist,build,test",
                "--ignores=eslint*,eslint-plugin",
            ]
        );
    }
}
