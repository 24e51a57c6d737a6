use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default feature name per spec §6.
pub const DEFAULT_FEATURE: &str = "hybrid_progressive_capture";

/// Admission strategy for a Rollout Configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutStrategy {
    Percentage,
    Whitelist,
    RepositorySize,
}

/// Repository size bucket used by the `repository_size` strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryCategory {
    Test,
    Small,
    Medium,
    Large,
}

impl RepositoryCategory {
    /// The percentage at which this category's stage opens, per the
    /// `test -> small -> medium -> large` ordering in spec §4.4.
    ///
    /// The 25/50/75/100 thresholds are inferred from operator
    /// documentation (spec §9 Open Questions); the source is silent on
    /// whether they are configurable, so this implementation fixes them.
    pub fn opens_at_percentage(&self) -> u8 {
        match self {
            Self::Test => 25,
            Self::Small => 50,
            Self::Medium => 75,
            Self::Large => 100,
        }
    }

    pub fn is_opened(&self, percentage: u8) -> bool {
        percentage >= self.opens_at_percentage()
    }
}

/// One row per feature name (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutConfiguration {
    pub feature: String,
    pub percentage: u8,
    pub strategy: RolloutStrategy,
    pub emergency_stop: bool,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl RolloutConfiguration {
    /// Fresh configuration: `(is_active=true, stop=false, percentage=0)`
    /// per the state machine's initial state in spec §4.4.
    pub fn initial(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            percentage: 0,
            strategy: RolloutStrategy::Percentage,
            emergency_stop: false,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    /// The percentage actually in effect: 0 whenever `emergency_stop` is
    /// true, regardless of the stored percentage (spec §3 invariant).
    pub fn effective_percentage(&self) -> u8 {
        if self.emergency_stop {
            0
        } else {
            self.percentage
        }
    }
}

/// Action recorded in the append-only Rollout History log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutAction {
    Updated,
    Rollback,
    Stop,
    Resume,
}

/// One append-only audit entry (spec §3). Entries are never edited or
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutHistoryEntry {
    pub id: i64,
    pub feature: String,
    pub action: RolloutAction,
    pub previous_percentage: u8,
    pub new_percentage: u8,
    pub reason: String,
    pub triggered_by: String,
    pub created_at: DateTime<Utc>,
}

/// Caller identity used by `automated_health_check` rollbacks, distinct
/// from a human operator's `manual` tag.
pub const TRIGGERED_BY_AUTOMATED_HEALTH_CHECK: &str = "automated_health_check";
pub const TRIGGERED_BY_MANUAL: &str = "manual";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_stop_forces_zero_effective_percentage() {
        let mut config = RolloutConfiguration::initial(DEFAULT_FEATURE);
        config.percentage = 50;
        config.emergency_stop = true;
        assert_eq!(config.effective_percentage(), 0);
    }

    #[test]
    fn repository_category_staging_order() {
        assert!(!RepositoryCategory::Small.is_opened(25));
        assert!(RepositoryCategory::Test.is_opened(25));
        assert!(RepositoryCategory::Small.is_opened(50));
        assert!(!RepositoryCategory::Medium.is_opened(50));
        assert!(RepositoryCategory::Large.is_opened(100));
    }

    #[test]
    fn initial_state_matches_spec() {
        let config = RolloutConfiguration::initial(DEFAULT_FEATURE);
        assert_eq!(config.percentage, 0);
        assert!(!config.emergency_stop);
        assert!(config.is_active);
    }
}
