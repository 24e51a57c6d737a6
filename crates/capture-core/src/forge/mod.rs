mod metrics;
mod traits;
mod types;

pub use metrics::ForgeMetrics;
pub use traits::ForgeReader;
pub use types::{
    Author, FileChange, IssueComment, PullRequest, PullRequestComplete, PullRequestState,
    PullRequestTimestamps, RateLimitInfo, Review, ReviewComment,
};
