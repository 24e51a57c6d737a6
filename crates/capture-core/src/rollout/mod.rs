mod hash;
mod types;

pub use hash::rollout_hash;
pub use types::{
    RepositoryCategory, RolloutAction, RolloutConfiguration, RolloutHistoryEntry, RolloutStrategy,
    DEFAULT_FEATURE, TRIGGERED_BY_AUTOMATED_HEALTH_CHECK, TRIGGERED_BY_MANUAL,
};
