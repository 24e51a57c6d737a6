use capture_core::error::{CaptureError, Result};
use capture_core::rollout::{
    rollout_hash, RepositoryCategory, RolloutAction, RolloutConfiguration, RolloutHistoryEntry,
    RolloutStrategy, TRIGGERED_BY_AUTOMATED_HEALTH_CHECK, TRIGGERED_BY_MANUAL,
};

use super::store::RolloutStore;

/// Gates what fraction of traffic is permitted to use the hybrid path
/// (spec §4.4). The live configuration always comes from the store — no
/// in-process cache — so every process sees the same gate.
pub struct RolloutController {
    store: RolloutStore,
}

impl RolloutController {
    pub fn new(store: RolloutStore) -> Self {
        Self { store }
    }

    pub async fn query(&self, feature: &str) -> Result<RolloutConfiguration> {
        self.store.get_or_init(feature).await
    }

    /// `update(feature, newPercentage, reason)`, triggered by a human
    /// operator (spec §6 CLI semantics).
    pub async fn update(&self, feature: &str, new_percentage: u8, reason: &str) -> Result<RolloutConfiguration> {
        self.apply_update(feature, new_percentage, reason, TRIGGERED_BY_MANUAL, RolloutAction::Updated)
            .await
    }

    /// `rollback(feature, 0, reason)`, triggered by the health collaborator.
    /// Operationally identical to `update` except for the triggered-by tag
    /// and the `rollback` action recorded in history.
    pub async fn rollback(&self, feature: &str, new_percentage: u8, reason: &str) -> Result<RolloutConfiguration> {
        self.apply_update(
            feature,
            new_percentage,
            reason,
            TRIGGERED_BY_AUTOMATED_HEALTH_CHECK,
            RolloutAction::Rollback,
        )
        .await
    }

    async fn apply_update(
        &self,
        feature: &str,
        new_percentage: u8,
        reason: &str,
        triggered_by: &str,
        action: RolloutAction,
    ) -> Result<RolloutConfiguration> {
        if new_percentage > 100 {
            return Err(CaptureError::InvalidArgument(format!(
                "percentage {new_percentage} out of range [0,100]"
            )));
        }

        let current = self.store.get_or_init(feature).await?;
        if current.emergency_stop {
            return Err(CaptureError::EmergencyStopped(format!(
                "rollout for '{feature}' is emergency-stopped; update is a no-op"
            )));
        }

        self.store
            .apply(
                &current,
                new_percentage,
                current.strategy,
                current.emergency_stop,
                current.is_active,
                action,
                reason,
                triggered_by,
            )
            .await
    }

    /// `verify(expectedPercentage)`: read back the configuration and
    /// confirm the effective percentage matches. Used after an automated
    /// rollback; a mismatch is a fatal alert for the caller to raise.
    pub async fn verify(&self, feature: &str, expected_percentage: u8) -> Result<bool> {
        let config = self.store.get_or_init(feature).await?;
        Ok(config.effective_percentage() == expected_percentage)
    }

    pub async fn stop(&self, feature: &str, reason: &str) -> Result<RolloutConfiguration> {
        let current = self.store.get_or_init(feature).await?;
        self.store
            .apply(
                &current,
                current.percentage,
                current.strategy,
                true,
                false,
                RolloutAction::Stop,
                reason,
                TRIGGERED_BY_MANUAL,
            )
            .await
    }

    pub async fn resume(&self, feature: &str, reason: &str) -> Result<RolloutConfiguration> {
        let current = self.store.get_or_init(feature).await?;
        self.store
            .apply(
                &current,
                current.percentage,
                current.strategy,
                false,
                true,
                RolloutAction::Resume,
                reason,
                TRIGGERED_BY_MANUAL,
            )
            .await
    }

    pub async fn history(&self, feature: &str, limit: i64) -> Result<Vec<RolloutHistoryEntry>> {
        self.store.history(feature, limit).await
    }

    /// `isAllowed(feature, repositoryId)`, computed fresh from the live
    /// configuration per call (spec §4.4 algorithm).
    pub async fn is_allowed(&self, feature: &str, repository_id: &str, repository_category: RepositoryCategory) -> Result<bool> {
        let config = self.store.get_or_init(feature).await?;

        if !config.is_active || config.emergency_stop {
            return Ok(false);
        }

        match config.strategy {
            RolloutStrategy::Percentage => {
                let h = rollout_hash(feature, repository_id);
                Ok((h as u16) < config.percentage as u16)
            }
            RolloutStrategy::Whitelist => self.store.whitelist_contains(feature, repository_id).await,
            RolloutStrategy::RepositorySize => Ok(repository_category.is_opened(config.percentage)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_gate_uses_strict_less_than() {
        // h < percentage, not <=, so percentage=0 admits nothing.
        assert!(!(50u16 < 0u16));
        assert!(25u16 < 30u16);
    }
}
