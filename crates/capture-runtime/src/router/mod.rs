mod batch;
mod classifier;
mod dispatch;
mod lowlatency;

pub use batch::BatchBackend;
pub use classifier::classify;
pub use dispatch::Router;
pub use lowlatency::LowLatencyBackend;
