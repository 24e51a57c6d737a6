mod controller;
mod error_rate;
mod health;
mod store;

pub use controller::RolloutController;
pub use error_rate::JobErrorRateSource;
pub use health::{ErrorRateSource, HealthCollaborator, IncidentReport};
pub use store::RolloutStore;
