pub mod db;
pub mod forge_client;
pub mod governor;
pub mod rollout;
pub mod router;
pub mod store;
pub mod workers;

pub use db::Database;
pub use forge_client::{CompoundClient, FineGrainedClient, HybridForgeClient, HttpTransport, ReqwestTransport};
pub use governor::Governor;
pub use rollout::{
    ErrorRateSource, HealthCollaborator, IncidentReport, JobErrorRateSource, RolloutController,
    RolloutStore,
};
pub use router::{BatchBackend, LowLatencyBackend, Router};
pub use store::{CaptureStore, JobStore, ProgressStore};
pub use workers::{
    CaptureWorker, CommentsWorker, DetailsWorker, FileChangesWorker, HistoricalSyncWorker,
    ReviewsWorker, WorkerContext,
};
