mod traits;
mod types;

pub use traits::{BackendHandle, BackoffStrategy, RetryConfig};
pub use types::{
    Job, JobData, JobKind, JobStatus, Progress, ProgressError, TriggerSource, BackendKind,
    MAX_RECENT_ERRORS,
};
