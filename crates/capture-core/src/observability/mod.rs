mod alert;
mod log;
mod metric;

pub use alert::{Alert, AlertCondition, AlertSeverity, AlertState, AlertStatus};
pub use log::{LogEntry, LogLevel};
pub use metric::{Metric, MetricKind, MetricLabels, MetricValue};
