use capture_core::job::{BackendKind, JobData, TriggerSource};

/// Classify a capture request into a back-end. Pure function of its
/// input — no store or forge access — per the design note in spec §9.
///
/// Evaluated in order, first match wins:
/// (a) `time_range_days <= 1`
/// (b) `pr_numbers` non-empty and `len <= 10`
/// (c) `trigger_source == manual`
///
/// Otherwise batch.
pub fn classify(data: &JobData) -> BackendKind {
    if let Some(days) = data.time_range_days {
        if days <= 1 {
            return BackendKind::LowLatency;
        }
    }

    if let Some(prs) = &data.pr_numbers {
        if !prs.is_empty() && prs.len() <= 10 {
            return BackendKind::LowLatency;
        }
    }

    if data.trigger_source == TriggerSource::Manual {
        return BackendKind::LowLatency;
    }

    BackendKind::Batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> JobData {
        JobData {
            repository_id: "r1".into(),
            repository_name: "acme/repo".into(),
            pr_numbers: None,
            time_range_days: None,
            max_items: None,
            trigger_source: TriggerSource::Scheduled,
        }
    }

    #[test]
    fn recent_window_is_low_latency() {
        let data = JobData {
            time_range_days: Some(1),
            ..base()
        };
        assert_eq!(classify(&data), BackendKind::LowLatency);
    }

    #[test]
    fn small_pr_set_is_low_latency() {
        let data = JobData {
            pr_numbers: Some(vec![1, 2, 3]),
            ..base()
        };
        assert_eq!(classify(&data), BackendKind::LowLatency);
    }

    #[test]
    fn large_pr_set_without_other_signals_is_batch() {
        let data = JobData {
            pr_numbers: Some((1..=11).collect()),
            ..base()
        };
        assert_eq!(classify(&data), BackendKind::Batch);
    }

    #[test]
    fn manual_trigger_is_low_latency() {
        let data = JobData {
            trigger_source: TriggerSource::Manual,
            ..base()
        };
        assert_eq!(classify(&data), BackendKind::LowLatency);
    }

    #[test]
    fn historical_scheduled_sync_is_batch() {
        let data = JobData {
            time_range_days: Some(180),
            max_items: Some(1000),
            ..base()
        };
        assert_eq!(classify(&data), BackendKind::Batch);
    }

    #[test]
    fn first_match_wins_even_when_a_later_condition_would_disagree() {
        // time_range_days <= 1 wins even though pr_numbers is large and
        // trigger_source is scheduled.
        let data = JobData {
            time_range_days: Some(1),
            pr_numbers: Some((1..=50).collect()),
            ..base()
        };
        assert_eq!(classify(&data), BackendKind::LowLatency);
    }
}
