use reqwest::Client;
use serde_json::Value;

use crate::error::ScanError;
use crate::retry::RetryPolicy;

/// Total downloads of `name` over `period` (`YYYY-MM-DD:YYYY-MM-DD`).
///
/// A package the metrics endpoint doesn't know counts as zero, and so does a
/// response body that isn't JSON.
pub async fn count_downloads(
    client: &Client,
    downloads_url: &str,
    period: &str,
    name: &str,
    retry: &RetryPolicy,
) -> Result<u64, ScanError> {
    let url = format!(
        "{}/downloads/range/{}/{}",
        downloads_url.trim_end_matches('/'),
        period,
        name
    );

    match super::get_json(client, &url, retry).await {
        Ok(data) => Ok(data.as_ref().map_or(0, sum_downloads)),
        Err(ScanError::Malformed { .. }) => Ok(0),
        Err(err) => Err(err),
    }
}

/// Sum the `downloads[].downloads` series; malformed entries count as zero.
pub fn sum_downloads(data: &Value) -> u64 {
    data.get("downloads")
        .and_then(|d| d.as_array())
        .map(|days| {
            days.iter()
                .filter_map(|day| day.get("downloads").and_then(|n| n.as_u64()))
                .sum()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sums_daily_series() {
        let data = json!({
            "start": "2025-01-01",
            "end": "2025-01-03",
            "package": "left-pad",
            "downloads": [
                { "downloads": 10, "day": "2025-01-01" },
                { "downloads": 20, "day": "2025-01-02" },
                { "downloads": 5, "day": "2025-01-03" }
            ]
        });
        assert_eq!(sum_downloads(&data), 35);
    }

    #[test]
    fn test_absent_series_is_zero() {
        assert_eq!(sum_downloads(&json!({ "error": "package not found" })), 0);
        assert_eq!(sum_downloads(&json!({ "downloads": "nope" })), 0);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let data = json!({ "downloads": [ { "downloads": 7 }, { "day": "x" }, { "downloads": -1 } ] });
        assert_eq!(sum_downloads(&data), 7);
    }

    #[tokio::test]
    async fn test_counts_series_from_endpoint() {
        let base = crate::registry::stub::serve(r#"{"downloads":[{"downloads":5},{"downloads":7}]}"#).await;
        let client = Client::new();
        let retry = RetryPolicy { attempts: 1, delay: std::time::Duration::ZERO };
        let count = count_downloads(&client, &base, "2025-01-01:2025-01-31", "left-pad", &retry)
            .await
            .unwrap();
        assert_eq!(count, 12);
    }

    #[tokio::test]
    async fn test_non_json_body_counts_as_zero() {
        let base = crate::registry::stub::serve("<html>maintenance</html>").await;
        let client = Client::new();
        let retry = RetryPolicy { attempts: 3, delay: std::time::Duration::ZERO };
        let count = count_downloads(&client, &base, "2025-01-01:2025-01-31", "left-pad", &retry)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
