//! Data types shared by the Rate-Limit Governor.
//!
//! The Governor itself is a stateful, per-process, mutex-guarded object
//! (it lives in the runtime crate, not here) — these types describe the
//! samples it ingests and the reports it produces, so that both the
//! governor implementation and its callers agree on shapes without
//! depending on the runtime crate.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An observation fed to the governor on every forge call.
///
/// Process-local; never persisted across restarts. Samples older than 24
/// hours are evicted by the governor that holds them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSample {
    pub timestamp: DateTime<Utc>,
    pub remaining: u32,
    pub limit: u32,
    pub cost: u32,
    pub query_type: String,
    pub items_processed: u32,
}

/// Mutable thresholds governing alerts and recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GovernorThresholds {
    /// Remaining budget below which a warning alert fires.
    pub warning: u32,
    /// Remaining budget below which a critical alert fires.
    pub critical: u32,
    /// Cost-per-item above which an efficiency alert fires.
    pub efficiency: f64,
}

impl Default for GovernorThresholds {
    fn default() -> Self {
        Self {
            warning: 1000,
            critical: 100,
            efficiency: 5.0,
        }
    }
}

/// Severity of a governor alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernorAlertSeverity {
    Info,
    Warning,
    Critical,
}

/// An alert emitted by the governor's `track` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorAlert {
    pub severity: GovernorAlertSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl GovernorAlert {
    pub fn new(severity: GovernorAlertSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Maximum number of alerts retained (spec §4.3: "keep only the most
/// recent 50 alerts").
pub const MAX_GOVERNOR_ALERTS: usize = 50;

/// Priority of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Medium,
    High,
    Critical,
}

/// A derived recommendation from `generateReport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub message: String,
    pub priority: RecommendationPriority,
}

/// Result of the governor's `predict` operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredictResult {
    pub average_cost: f64,
    pub predicted_cost: f64,
    pub current_remaining: u32,
    pub will_exceed_limit: bool,
    pub safe_queries: u32,
}

/// A per-query-type efficiency summary in a `generateReport` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTypeSummary {
    pub query_type: String,
    pub average_cost: f64,
    pub sample_count: u32,
}

/// Full report produced by the governor's `generateReport` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorReport {
    pub summary: Vec<QueryTypeSummary>,
    pub efficiency: f64,
    pub alerts: Vec<GovernorAlert>,
    pub recommendations: Vec<Recommendation>,
}

/// Convert a rate-exhaustion condition into a retry-after duration,
/// honoring the "governor's `resetAt` or one minute, whichever is
/// sooner" worker policy from spec §7.
pub fn retry_after_for_reset(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let until_reset = (reset_at - now).to_std().unwrap_or_default();
    until_reset.min(Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn default_thresholds_match_spec() {
        let thresholds = GovernorThresholds::default();
        assert_eq!(thresholds.warning, 1000);
        assert_eq!(thresholds.critical, 100);
        assert_eq!(thresholds.efficiency, 5.0);
    }

    #[test]
    fn retry_after_caps_at_one_minute() {
        let now = Utc::now();
        let far = now + ChronoDuration::hours(1);
        assert_eq!(retry_after_for_reset(far, now), Duration::from_secs(60));
    }

    #[test]
    fn retry_after_uses_reset_when_sooner() {
        let now = Utc::now();
        let soon = now + ChronoDuration::seconds(10);
        assert_eq!(retry_after_for_reset(soon, now), Duration::from_secs(10));
    }
}
