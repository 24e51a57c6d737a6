use capture_core::error::{CaptureError, Result};
use capture_core::rollout::{RolloutAction, RolloutConfiguration, RolloutHistoryEntry, RolloutStrategy};
use sqlx::{PgPool, Row};

/// Persistence for `rollout_configuration` and `rollout_history`.
///
/// `update`/`stop`/`resume` write both tables inside one `sqlx::Transaction`
/// so a configuration row and its history entry either both land or neither
/// does, satisfying the ordering guarantee in spec §5.
#[derive(Clone)]
pub struct RolloutStore {
    pool: PgPool,
}

impl RolloutStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read the current configuration, creating the initial row on first
    /// access for a feature that has never been written.
    pub async fn get_or_init(&self, feature: &str) -> Result<RolloutConfiguration> {
        if let Some(config) = self.get(feature).await? {
            return Ok(config);
        }

        let initial = RolloutConfiguration::initial(feature);
        sqlx::query(
            r#"
            INSERT INTO rollout_configuration (feature, percentage, strategy, emergency_stop, is_active, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (feature) DO NOTHING
            "#,
        )
        .bind(&initial.feature)
        .bind(initial.percentage as i16)
        .bind(strategy_str(initial.strategy))
        .bind(initial.emergency_stop)
        .bind(initial.is_active)
        .bind(initial.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        self.get(feature)
            .await?
            .ok_or_else(|| CaptureError::StoreError(format!("failed to initialise rollout row for {feature}")))
    }

    pub async fn get(&self, feature: &str) -> Result<Option<RolloutConfiguration>> {
        let row = sqlx::query(
            r#"
            SELECT feature, percentage, strategy, emergency_stop, is_active, updated_at
            FROM rollout_configuration
            WHERE feature = $1
            "#,
        )
        .bind(feature)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        row.map(|r| row_to_config(&r)).transpose()
    }

    /// Write a new configuration row and append a history entry atomically.
    pub async fn apply(
        &self,
        previous: &RolloutConfiguration,
        new_percentage: u8,
        strategy: RolloutStrategy,
        emergency_stop: bool,
        is_active: bool,
        action: RolloutAction,
        reason: &str,
        triggered_by: &str,
    ) -> Result<RolloutConfiguration> {
        let mut tx = self.pool.begin().await.map_err(|e| CaptureError::StoreError(e.to_string()))?;
        let updated_at = chrono::Utc::now();

        sqlx::query(
            r#"
            UPDATE rollout_configuration
            SET percentage = $2, strategy = $3, emergency_stop = $4, is_active = $5, updated_at = $6
            WHERE feature = $1
            "#,
        )
        .bind(&previous.feature)
        .bind(new_percentage as i16)
        .bind(strategy_str(strategy))
        .bind(emergency_stop)
        .bind(is_active)
        .bind(updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        // `previous_percentage` records the *effective* percentage in force
        // immediately before this transition (0 while emergency-stopped),
        // not the raw stored column. For `resume` this can differ from
        // `new_percentage` (e.g. 0 -> 50) even though §4.4's state-machine
        // prose describes `resume` as restoring `new_percentage` unchanged
        // -- the testable invariant in spec §8 ("previous_percentage equals
        // the value in effect immediately before") is the one this follows.
        sqlx::query(
            r#"
            INSERT INTO rollout_history
                (feature, action, previous_percentage, new_percentage, reason, triggered_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&previous.feature)
        .bind(action_str(action))
        .bind(previous.effective_percentage() as i16)
        .bind(new_percentage as i16)
        .bind(reason)
        .bind(triggered_by)
        .bind(updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        tx.commit().await.map_err(|e| CaptureError::StoreError(e.to_string()))?;

        tracing::info!(
            feature = %previous.feature,
            action = ?action,
            previous_percentage = previous.effective_percentage(),
            new_percentage,
            triggered_by,
            "rollout configuration updated"
        );

        Ok(RolloutConfiguration {
            feature: previous.feature.clone(),
            percentage: new_percentage,
            strategy,
            emergency_stop,
            is_active,
            updated_at,
        })
    }

    pub async fn history(&self, feature: &str, limit: i64) -> Result<Vec<RolloutHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, feature, action, previous_percentage, new_percentage, reason, triggered_by, created_at
            FROM rollout_history
            WHERE feature = $1
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
        .bind(feature)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        rows.iter().map(row_to_history).collect()
    }

    /// Repository ids admitted under the `whitelist` strategy.
    pub async fn whitelist_contains(&self, feature: &str, repository_id: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM rollout_whitelist WHERE feature = $1 AND repository_id = $2
            "#,
        )
        .bind(feature)
        .bind(repository_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        Ok(row.is_some())
    }
}

fn strategy_str(strategy: RolloutStrategy) -> &'static str {
    match strategy {
        RolloutStrategy::Percentage => "percentage",
        RolloutStrategy::Whitelist => "whitelist",
        RolloutStrategy::RepositorySize => "repository_size",
    }
}

fn strategy_from_str(s: &str) -> Result<RolloutStrategy> {
    match s {
        "percentage" => Ok(RolloutStrategy::Percentage),
        "whitelist" => Ok(RolloutStrategy::Whitelist),
        "repository_size" => Ok(RolloutStrategy::RepositorySize),
        other => Err(CaptureError::StoreError(format!("unknown rollout strategy '{other}'"))),
    }
}

fn action_str(action: RolloutAction) -> &'static str {
    match action {
        RolloutAction::Updated => "updated",
        RolloutAction::Rollback => "rollback",
        RolloutAction::Stop => "stop",
        RolloutAction::Resume => "resume",
    }
}

fn action_from_str(s: &str) -> Result<RolloutAction> {
    match s {
        "updated" => Ok(RolloutAction::Updated),
        "rollback" => Ok(RolloutAction::Rollback),
        "stop" => Ok(RolloutAction::Stop),
        "resume" => Ok(RolloutAction::Resume),
        other => Err(CaptureError::StoreError(format!("unknown rollout action '{other}'"))),
    }
}

fn row_to_config(row: &sqlx::postgres::PgRow) -> Result<RolloutConfiguration> {
    let strategy: String = row.get("strategy");
    let percentage: i16 = row.get("percentage");
    Ok(RolloutConfiguration {
        feature: row.get("feature"),
        percentage: percentage as u8,
        strategy: strategy_from_str(&strategy)?,
        emergency_stop: row.get("emergency_stop"),
        is_active: row.get("is_active"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_history(row: &sqlx::postgres::PgRow) -> Result<RolloutHistoryEntry> {
    let action: String = row.get("action");
    let previous_percentage: i16 = row.get("previous_percentage");
    let new_percentage: i16 = row.get("new_percentage");
    Ok(RolloutHistoryEntry {
        id: row.get("id"),
        feature: row.get("feature"),
        action: action_from_str(&action)?,
        previous_percentage: previous_percentage as u8,
        new_percentage: new_percentage as u8,
        reason: row.get("reason"),
        triggered_by: row.get("triggered_by"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_round_trips() {
        for s in [
            RolloutStrategy::Percentage,
            RolloutStrategy::Whitelist,
            RolloutStrategy::RepositorySize,
        ] {
            assert_eq!(strategy_from_str(strategy_str(s)).unwrap(), s);
        }
    }

    #[test]
    fn action_round_trips() {
        for a in [
            RolloutAction::Updated,
            RolloutAction::Rollback,
            RolloutAction::Stop,
            RolloutAction::Resume,
        ] {
            assert_eq!(action_from_str(action_str(a)).unwrap(), a);
        }
    }
}
