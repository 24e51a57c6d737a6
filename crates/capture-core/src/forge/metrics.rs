//! Metrics Counters (spec §3): in-memory counts maintained by the Hybrid
//! Forge Client across its compound and fine-grained paths.

use serde::{Deserialize, Serialize};

/// Per-process counters maintained by the Hybrid Forge Client.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ForgeMetrics {
    pub compound_queries: u64,
    pub fine_grained_queries: u64,
    pub fallbacks: u64,
    pub total_points_saved: i64,
}

impl ForgeMetrics {
    /// Record a successful compound call that saved `reported_compound_cost`
    /// points relative to the five-call fine-grained equivalent.
    pub fn record_compound_success(&mut self, reported_compound_cost: u32) {
        self.compound_queries += 1;
        let saved = 5i64.saturating_sub(reported_compound_cost as i64).max(0);
        self.total_points_saved += saved;
    }

    /// Record a fallback from the compound path to the fine-grained path.
    pub fn record_fallback(&mut self) {
        self.fallbacks += 1;
    }

    /// Record one fine-grained call (the fallback path issues up to five).
    pub fn record_fine_grained_call(&mut self) {
        self.fine_grained_queries += 1;
    }

    /// `fallbackRate = fallbacks / (compoundQueries + fallbacks)`.
    pub fn fallback_rate(&self) -> f64 {
        let denom = self.compound_queries + self.fallbacks;
        if denom == 0 {
            0.0
        } else {
            self.fallbacks as f64 / denom as f64
        }
    }

    /// `efficiency = totalPointsSaved / totalQueries`.
    pub fn efficiency(&self) -> f64 {
        let total = self.compound_queries + self.fine_grained_queries;
        if total == 0 {
            0.0
        } else {
            self.total_points_saved as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_points_saved_never_negative() {
        let mut metrics = ForgeMetrics::default();
        metrics.record_compound_success(7);
        assert_eq!(metrics.total_points_saved, 0);
        metrics.record_compound_success(2);
        assert_eq!(metrics.total_points_saved, 3);
        assert!(metrics.total_points_saved >= 0);
    }

    #[test]
    fn fallback_rate_is_zero_with_no_calls() {
        let metrics = ForgeMetrics::default();
        assert_eq!(metrics.fallback_rate(), 0.0);
    }

    #[test]
    fn fallback_rate_and_efficiency() {
        let mut metrics = ForgeMetrics::default();
        metrics.record_compound_success(3);
        metrics.record_compound_success(3);
        metrics.record_fallback();
        for _ in 0..5 {
            metrics.record_fine_grained_call();
        }
        assert!((metrics.fallback_rate() - (1.0 / 3.0)).abs() < 1e-9);
        assert_eq!(metrics.efficiency(), 4.0 / 7.0);
    }
}
