use serde::{Deserialize, Serialize};

/// Hybrid Router concurrency and classification tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Low-latency back-end concurrency cap (spec §5: ≤10 simultaneous
    /// jobs per process).
    #[serde(default = "default_lowlatency_concurrency")]
    pub lowlatency_concurrency: usize,

    /// Per-job item cap on the low-latency back-end (spec §4.1: ≤50).
    #[serde(default = "default_lowlatency_item_cap")]
    pub lowlatency_item_cap: usize,

    /// `prNumbers` length threshold below which a request classifies as
    /// low-latency (spec §4.1 condition (b)).
    #[serde(default = "default_small_pr_set_threshold")]
    pub small_pr_set_threshold: usize,

    /// `timeRangeDays` threshold at or below which a request classifies
    /// as low-latency (spec §4.1 condition (a)).
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i32,

    /// Batch job hard ceiling in minutes (spec §5: 120).
    #[serde(default = "default_batch_timeout_minutes")]
    pub batch_timeout_minutes: u64,

    /// `dispatch(workflowName, inputMap)` endpoint of the external job
    /// runner the batch back-end posts to (spec §4.1, §6). Left empty by
    /// default since the runner is an external collaborator named only
    /// by its contract; a deployment wires this through config or
    /// `JOB_RUNNER_DISPATCH_URL`.
    #[serde(default)]
    pub batch_dispatch_url: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            lowlatency_concurrency: default_lowlatency_concurrency(),
            lowlatency_item_cap: default_lowlatency_item_cap(),
            small_pr_set_threshold: default_small_pr_set_threshold(),
            recent_window_days: default_recent_window_days(),
            batch_timeout_minutes: default_batch_timeout_minutes(),
            batch_dispatch_url: String::new(),
        }
    }
}

fn default_lowlatency_concurrency() -> usize {
    10
}

fn default_lowlatency_item_cap() -> usize {
    50
}

fn default_small_pr_set_threshold() -> usize {
    10
}

fn default_recent_window_days() -> i32 {
    1
}

fn default_batch_timeout_minutes() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = RouterConfig::default();
        assert_eq!(config.lowlatency_concurrency, 10);
        assert_eq!(config.lowlatency_item_cap, 50);
        assert_eq!(config.small_pr_set_threshold, 10);
        assert_eq!(config.recent_window_days, 1);
        assert_eq!(config.batch_timeout_minutes, 120);
    }
}
