//! Pull-request insights
//!
//! Merge-time and acceptance statistics over the last 100 closed PRs.
//! Computed fresh on every call: the sample changes with every merge and a
//! stale acceptance rate is worse than no caching.

use crate::error::GatewayError;
use crate::gateway::Gateway;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Merge-time and acceptance statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrInsights {
    /// Mean open-to-merge time in milliseconds, `null` when nothing merged
    pub average_merge_time: Option<f64>,
    /// Share of closed PRs that were merged, rounded percent
    pub acceptance_rate: u32,
    pub total_closed: usize,
    pub merged_count: usize,
}

impl Gateway {
    pub async fn pr_insights(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<PrInsights, GatewayError> {
        let cred = self.credential(session_user).await;
        let client = self.client_for(&cred);
        let prs = client
            .get_json(
                &format!("/repos/{owner}/{repo}/pulls"),
                &[("state", "closed"), ("per_page", "100")],
            )
            .await
            .map_err(|e| e.describing("pull request insights"))?;

        let prs = prs.as_array().cloned().unwrap_or_default();
        Ok(compute_insights(&prs))
    }
}

fn compute_insights(prs: &[Value]) -> PrInsights {
    let merge_durations: Vec<i64> = prs
        .iter()
        .filter_map(|pr| {
            let merged_at = DateTime::parse_from_rfc3339(pr["merged_at"].as_str()?).ok()?;
            let created_at = DateTime::parse_from_rfc3339(pr["created_at"].as_str()?).ok()?;
            Some((merged_at - created_at).num_milliseconds())
        })
        .collect();

    let average_merge_time = if merge_durations.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        Some(merge_durations.iter().sum::<i64>() as f64 / merge_durations.len() as f64)
    };

    let acceptance_rate = if prs.is_empty() {
        0
    } else {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            (merge_durations.len() as f64 / prs.len() as f64 * 100.0).round() as u32
        }
    };

    PrInsights {
        average_merge_time,
        acceptance_rate,
        total_closed: prs.len(),
        merged_count: merge_durations.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pr(created_at: &str, merged_at: Option<&str>) -> Value {
        json!({ "created_at": created_at, "merged_at": merged_at })
    }

    #[test]
    fn test_compute_insights_empty_sample() {
        let insights = compute_insights(&[]);
        assert_eq!(insights.average_merge_time, None);
        assert_eq!(insights.acceptance_rate, 0);
        assert_eq!(insights.total_closed, 0);
        assert_eq!(insights.merged_count, 0);
    }

    #[test]
    fn test_compute_insights_counts_merged_only() {
        let prs = vec![
            pr("2024-01-01T00:00:00Z", Some("2024-01-01T01:00:00Z")),
            pr("2024-01-01T00:00:00Z", Some("2024-01-01T03:00:00Z")),
            pr("2024-01-01T00:00:00Z", None),
            pr("2024-01-01T00:00:00Z", None),
        ];

        let insights = compute_insights(&prs);
        // mean of 1h and 3h in milliseconds
        assert_eq!(insights.average_merge_time, Some(2.0 * 3600.0 * 1000.0));
        assert_eq!(insights.acceptance_rate, 50);
        assert_eq!(insights.total_closed, 4);
        assert_eq!(insights.merged_count, 2);
    }

    #[test]
    fn test_compute_insights_all_merged() {
        let prs = vec![pr("2024-01-01T00:00:00Z", Some("2024-01-02T00:00:00Z"))];
        let insights = compute_insights(&prs);
        assert_eq!(insights.acceptance_rate, 100);
    }
}
