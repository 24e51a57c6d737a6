//! The Rate-Limit Governor: a per-process, mutex-guarded tracker of forge
//! cost-budget consumption. Advisory only — it records and reports, it
//! never blocks a call itself (spec §4.3).

use std::collections::VecDeque;
use std::sync::RwLock;

use capture_core::rate_limit::{
    GovernorAlert, GovernorAlertSeverity, GovernorReport, GovernorThresholds, PredictResult,
    QueryTypeSummary, RateLimitSample, Recommendation, RecommendationPriority,
    MAX_GOVERNOR_ALERTS,
};
use chrono::{Duration as ChronoDuration, Utc};

const SAMPLE_WINDOW_HOURS: i64 = 24;
const PREDICT_WINDOW: usize = 10;

struct GovernorState {
    samples: VecDeque<RateLimitSample>,
    alerts: VecDeque<GovernorAlert>,
    thresholds: GovernorThresholds,
}

/// Tracks remaining budget, predicts exhaustion, emits efficiency alerts.
/// Shared across a process's forge clients via `Arc<Governor>`; `track`
/// takes the write half of the lock, `predict`/`generate_report` the read
/// half (spec §5: "mutual exclusion on writes, read-only access on
/// reads").
pub struct Governor {
    state: RwLock<GovernorState>,
}

impl Governor {
    pub fn new(thresholds: GovernorThresholds) -> Self {
        Self {
            state: RwLock::new(GovernorState {
                samples: VecDeque::new(),
                alerts: VecDeque::new(),
                thresholds,
            }),
        }
    }

    pub fn set_thresholds(&self, thresholds: GovernorThresholds) {
        self.state.write().unwrap().thresholds = thresholds;
    }

    /// Record an observation and evaluate it against the current
    /// thresholds, producing 0 or more alerts.
    pub fn track(&self, sample: RateLimitSample) {
        let mut state = self.state.write().unwrap();
        let cutoff = Utc::now() - ChronoDuration::hours(SAMPLE_WINDOW_HOURS);

        let mut new_alerts = Vec::new();
        if sample.remaining < state.thresholds.critical {
            new_alerts.push(GovernorAlert::new(
                GovernorAlertSeverity::Critical,
                format!(
                    "remaining budget {} below critical threshold {}",
                    sample.remaining, state.thresholds.critical
                ),
            ));
        } else if sample.remaining < state.thresholds.warning {
            new_alerts.push(GovernorAlert::new(
                GovernorAlertSeverity::Warning,
                format!(
                    "remaining budget {} below warning threshold {}",
                    sample.remaining, state.thresholds.warning
                ),
            ));
        }

        if sample.items_processed > 0 {
            let per_item = sample.cost as f64 / sample.items_processed as f64;
            if per_item > state.thresholds.efficiency {
                new_alerts.push(GovernorAlert::new(
                    GovernorAlertSeverity::Info,
                    format!(
                        "query type '{}' cost {:.2} points/item above efficiency threshold {:.2}",
                        sample.query_type, per_item, state.thresholds.efficiency
                    ),
                ));
            }
        }

        for alert in &new_alerts {
            match alert.severity {
                GovernorAlertSeverity::Critical => {
                    tracing::error!(message = %alert.message, "governor alert")
                }
                GovernorAlertSeverity::Warning => {
                    tracing::warn!(message = %alert.message, "governor alert")
                }
                GovernorAlertSeverity::Info => {
                    tracing::info!(message = %alert.message, "governor alert")
                }
            }
        }

        state.samples.push_back(sample);
        while state
            .samples
            .front()
            .map(|s| s.timestamp < cutoff)
            .unwrap_or(false)
        {
            state.samples.pop_front();
        }

        state.alerts.extend(new_alerts);
        while state.alerts.len() > MAX_GOVERNOR_ALERTS {
            state.alerts.pop_front();
        }
    }

    /// Whether the most recent sample shows remaining budget below the
    /// critical threshold. A client MAY use this to refuse a call before
    /// it's issued (spec §4.3: "the client MAY refuse...").
    pub fn is_critical(&self) -> bool {
        let state = self.state.read().unwrap();
        state
            .samples
            .back()
            .map(|s| s.remaining < state.thresholds.critical)
            .unwrap_or(false)
    }

    pub fn predict(&self, queries_remaining: u32) -> PredictResult {
        let state = self.state.read().unwrap();
        let window: Vec<&RateLimitSample> =
            state.samples.iter().rev().take(PREDICT_WINDOW).collect();

        let average_cost = if window.is_empty() {
            0.0
        } else {
            window.iter().map(|s| s.cost as f64).sum::<f64>() / window.len() as f64
        };

        let current_remaining = state.samples.back().map(|s| s.remaining).unwrap_or(0);
        let predicted_cost = queries_remaining as f64 * average_cost;
        let safe_queries = if average_cost <= 0.0 {
            current_remaining
        } else {
            (current_remaining as f64 / average_cost).floor() as u32
        };

        PredictResult {
            average_cost,
            predicted_cost,
            current_remaining,
            will_exceed_limit: predicted_cost > current_remaining as f64,
            safe_queries,
        }
    }

    pub fn generate_report(&self) -> GovernorReport {
        let state = self.state.read().unwrap();

        let mut by_type: Vec<(String, Vec<f64>)> = Vec::new();
        for sample in &state.samples {
            if let Some(entry) = by_type.iter_mut().find(|(t, _)| t == &sample.query_type) {
                entry.1.push(sample.cost as f64);
            } else {
                by_type.push((sample.query_type.clone(), vec![sample.cost as f64]));
            }
        }

        let summary: Vec<QueryTypeSummary> = by_type
            .iter()
            .map(|(query_type, costs)| QueryTypeSummary {
                query_type: query_type.clone(),
                average_cost: costs.iter().sum::<f64>() / costs.len() as f64,
                sample_count: costs.len() as u32,
            })
            .collect();

        let total_cost: u32 = state.samples.iter().map(|s| s.cost).sum();
        let total_items: u32 = state.samples.iter().map(|s| s.items_processed).sum();
        let efficiency = if total_items == 0 {
            0.0
        } else {
            total_cost as f64 / total_items as f64
        };

        let mut recommendations = Vec::new();
        if efficiency > 3.0 {
            recommendations.push(Recommendation {
                message: "prefer compound queries to reduce points".to_string(),
                priority: RecommendationPriority::High,
            });
        }
        let high_cost_types: Vec<&str> = summary
            .iter()
            .filter(|s| s.average_cost > 10.0)
            .map(|s| s.query_type.as_str())
            .collect();
        if !high_cost_types.is_empty() {
            recommendations.push(Recommendation {
                message: format!("high-cost queries: {}", high_cost_types.join(", ")),
                priority: RecommendationPriority::Medium,
            });
        }
        let current_remaining = state.samples.back().map(|s| s.remaining).unwrap_or(0);
        if current_remaining < 500 {
            recommendations.push(Recommendation {
                message: "throttle or switch to fine-grained path".to_string(),
                priority: RecommendationPriority::Critical,
            });
        }

        GovernorReport {
            summary,
            efficiency,
            alerts: state.alerts.iter().cloned().collect(),
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(remaining: u32, cost: u32, query_type: &str, items: u32) -> RateLimitSample {
        RateLimitSample {
            timestamp: Utc::now(),
            remaining,
            limit: 5000,
            cost,
            query_type: query_type.to_string(),
            items_processed: items,
        }
    }

    #[test]
    fn critical_alert_fires_below_threshold() {
        let governor = Governor::new(GovernorThresholds::default());
        governor.track(sample(50, 1, "compound", 1));
        let report = governor.generate_report();
        assert!(report
            .alerts
            .iter()
            .any(|a| a.severity == GovernorAlertSeverity::Critical));
        assert!(governor.is_critical());
    }

    #[test]
    fn predict_uses_last_ten_samples() {
        let governor = Governor::new(GovernorThresholds::default());
        for i in 0..15 {
            governor.track(sample(5000 - i, 2, "compound", 1));
        }
        let predicted = governor.predict(10);
        assert_eq!(predicted.average_cost, 2.0);
        assert_eq!(predicted.predicted_cost, 20.0);
    }

    #[test]
    fn recommendation_fires_when_remaining_is_low() {
        let governor = Governor::new(GovernorThresholds::default());
        governor.track(sample(400, 1, "compound", 1));
        let report = governor.generate_report();
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.priority == RecommendationPriority::Critical));
    }

    #[test]
    fn alerts_are_capped_at_fifty() {
        let governor = Governor::new(GovernorThresholds::default());
        for _ in 0..60 {
            governor.track(sample(10, 1, "compound", 1));
        }
        let report = governor.generate_report();
        assert_eq!(report.alerts.len(), MAX_GOVERNOR_ALERTS);
    }
}
