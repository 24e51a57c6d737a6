mod capture;
mod jobs;
mod progress;

pub use capture::CaptureStore;
pub use jobs::JobStore;
pub use progress::ProgressStore;
