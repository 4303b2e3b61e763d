use reqwest::Client;
use serde_json::Value;

use super::repository::UrlRules;
use crate::error::ScanError;
use crate::retry::RetryPolicy;

/// Latest published version of a package and the repository to clone for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub version: String,
    pub repository: String,
}

/// Fetch the full registry document (the "packument") for a package.
pub async fn fetch_packument(
    client: &Client,
    registry_url: &str,
    name: &str,
    retry: &RetryPolicy,
) -> Result<Value, ScanError> {
    // Scoped packages need URL encoding: @scope/pkg → %40scope%2Fpkg
    let encoded_name = name.replace('@', "%40").replace('/', "%2F");
    let url = format!("{}/{}", registry_url.trim_end_matches('/'), encoded_name);

    super::get_json(client, &url, retry)
        .await?
        .ok_or_else(|| ScanError::NotFound(name.to_string()))
}

/// `dist-tags.latest`, the registry's notion of the current release.
pub fn latest_version(packument: &Value) -> Option<&str> {
    packument
        .get("dist-tags")
        .and_then(|d| d.get("latest"))
        .and_then(|v| v.as_str())
}

/// Work out a cloneable repository URL for the latest version.
///
/// The declared `repository` wins when it is a git repository; otherwise a
/// GitHub `homepage` is used. Anything else is unresolvable.
pub fn resolve(packument: &Value, name: &str, rules: &UrlRules) -> Result<ResolvedPackage, ScanError> {
    let unresolvable = |reason: String| ScanError::Unresolvable {
        package: name.to_string(),
        reason,
    };

    let version = latest_version(packument)
        .ok_or_else(|| unresolvable("no dist-tags.latest".to_string()))?;

    let manifest = packument
        .get("versions")
        .and_then(|vs| vs.get(version))
        .ok_or_else(|| unresolvable(format!("latest version {version} missing from versions")))?;

    let repository = match declared_git_url(manifest) {
        Some(url) => rules
            .normalize(url)
            .ok_or_else(|| unresolvable(format!("unsupported repository url {url}")))?,
        None => manifest
            .get("homepage")
            .and_then(|h| h.as_str())
            .and_then(|h| rules.github_homepage(h))
            .ok_or_else(|| unresolvable("no git repository or GitHub homepage".to_string()))?,
    };

    Ok(ResolvedPackage {
        version: version.to_string(),
        repository,
    })
}

/// `repository.url` when the repository is git (or untyped), or a bare
/// string `repository`.
fn declared_git_url(manifest: &Value) -> Option<&str> {
    match manifest.get("repository")? {
        Value::String(url) => Some(url.as_str()),
        Value::Object(repo) => {
            let is_git = repo
                .get("type")
                .and_then(|t| t.as_str())
                .map_or(true, |t| t == "git");
            if !is_git {
                return None;
            }
            repo.get("url")
                .and_then(|u| u.as_str())
                .filter(|u| !u.trim().is_empty())
        }
        _ => None,
    }
}
