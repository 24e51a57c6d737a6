use crate::error::{CaptureError, Result};
use crate::job::TriggerSource;

/// Per-invocation capture parameters read from the environment (spec
/// §6): `REPOSITORY_ID`, `REPOSITORY_NAME`, `PR_NUMBERS`, `TIME_RANGE`,
/// `MAX_ITEMS`, `JOB_ID`, `DAYS_BACK`.
#[derive(Debug, Clone)]
pub struct CaptureInvocation {
    pub repository_id: String,
    pub repository_name: String,
    pub pr_numbers: Option<Vec<i64>>,
    pub time_range_days: Option<i32>,
    pub max_items: Option<i32>,
    pub job_id: Option<String>,
    pub days_back: Option<i32>,
}

impl CaptureInvocation {
    pub fn from_env() -> Result<Self> {
        let repository_id = std::env::var("REPOSITORY_ID")
            .map_err(|_| CaptureError::Config("REPOSITORY_ID is required".into()))?;
        let repository_name = std::env::var("REPOSITORY_NAME")
            .map_err(|_| CaptureError::Config("REPOSITORY_NAME is required".into()))?;

        let pr_numbers = match std::env::var("PR_NUMBERS") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.split(',')
                    .map(|s| s.trim().parse::<i64>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| CaptureError::Config(format!("invalid PR_NUMBERS: {e}")))?,
            ),
            _ => None,
        };

        let time_range_days = parse_optional_i32("TIME_RANGE")?;
        let max_items = parse_optional_i32("MAX_ITEMS")?;
        let days_back = parse_optional_i32("DAYS_BACK")?;
        let job_id = std::env::var("JOB_ID").ok();

        Ok(Self {
            repository_id,
            repository_name,
            pr_numbers,
            time_range_days,
            max_items,
            job_id,
            days_back,
        })
    }

    /// Requests always originate from an operator-triggered invocation of
    /// this CLI, never from an internal scheduler: they are always
    /// `manual` per spec's `triggerSource` field, unless a caller
    /// overrides it.
    pub fn trigger_source(&self) -> TriggerSource {
        TriggerSource::Manual
    }
}

fn parse_optional_i32(var: &str) -> Result<Option<i32>> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|e| CaptureError::Config(format!("invalid {var}: {e}"))),
        _ => Ok(None),
    }
}

/// The health collaborator's control parameters (spec §6):
/// `CHECK_TYPE`, `FORCE_CHECK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    Full,
    ErrorRates,
    MetricsOnly,
}

#[derive(Debug, Clone)]
pub struct HealthCheckParams {
    pub check_type: CheckType,
    pub force_check: bool,
}

impl HealthCheckParams {
    pub fn from_env() -> Result<Self> {
        let check_type = match std::env::var("CHECK_TYPE").as_deref() {
            Ok("full") | Err(_) => CheckType::Full,
            Ok("error_rates") => CheckType::ErrorRates,
            Ok("metrics_only") => CheckType::MetricsOnly,
            Ok(other) => {
                return Err(CaptureError::Config(format!(
                    "invalid CHECK_TYPE: {other}"
                )))
            }
        };
        let force_check = matches!(std::env::var("FORCE_CHECK").as_deref(), Ok("true"));
        Ok(Self {
            check_type,
            force_check,
        })
    }
}

/// Automated-rollback inputs (spec §6): `ROLLBACK_PERCENTAGE`,
/// `ROLLBACK_REASON`, `TRIGGERED_BY`.
#[derive(Debug, Clone)]
pub struct RollbackParams {
    pub percentage: u8,
    pub reason: String,
    pub triggered_by: String,
}

impl RollbackParams {
    pub fn from_env() -> Result<Self> {
        let percentage = std::env::var("ROLLBACK_PERCENTAGE")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<u8>()
            .map_err(|e| CaptureError::Config(format!("invalid ROLLBACK_PERCENTAGE: {e}")))?;
        let reason = std::env::var("ROLLBACK_REASON")
            .unwrap_or_else(|_| "automated rollback".to_string());
        let triggered_by =
            std::env::var("TRIGGERED_BY").unwrap_or_else(|_| "automated_health_check".to_string());
        Ok(Self {
            percentage,
            reason,
            triggered_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_optional_i32_handles_missing_and_empty() {
        std::env::remove_var("TESTVAR_MISSING");
        assert_eq!(parse_optional_i32("TESTVAR_MISSING").unwrap(), None);

        std::env::set_var("TESTVAR_EMPTY", "");
        assert_eq!(parse_optional_i32("TESTVAR_EMPTY").unwrap(), None);
        std::env::remove_var("TESTVAR_EMPTY");

        std::env::set_var("TESTVAR_SET", "42");
        assert_eq!(parse_optional_i32("TESTVAR_SET").unwrap(), Some(42));
        std::env::remove_var("TESTVAR_SET");
    }

    #[test]
    fn rollback_params_default_to_automated_health_check() {
        std::env::remove_var("ROLLBACK_PERCENTAGE");
        std::env::remove_var("ROLLBACK_REASON");
        std::env::remove_var("TRIGGERED_BY");
        let params = RollbackParams::from_env().unwrap();
        assert_eq!(params.percentage, 0);
        assert_eq!(params.triggered_by, "automated_health_check");
    }
}
