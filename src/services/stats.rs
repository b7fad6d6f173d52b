// src/services/stats.rs

use std::sync::Arc;

use crate::{
    config::RECENT_ATTEMPTS_LIMIT,
    error::ExamError,
    models::exam_record::{ExamStats, RecentAttempt},
    store::RecordStore,
};

/// Per-user score statistics.
#[derive(Clone)]
pub struct StatsAggregator {
    records: Arc<dyn RecordStore>,
}

impl StatsAggregator {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Aggregates cover graded attempts only; `recent_attempts` lists any status.
    pub async fn stats(&self, user_id: i64) -> Result<ExamStats, ExamError> {
        let summary = self.records.graded_summary(user_id).await?;
        let recent = self
            .records
            .recent_records(user_id, RECENT_ATTEMPTS_LIMIT)
            .await?;

        let avg_score = if summary.count > 0 {
            summary.total_score / summary.count as f64
        } else {
            0.0
        };

        Ok(ExamStats {
            count: summary.count,
            total_score: summary.total_score,
            avg_score,
            max_score: summary.max_score,
            min_score: summary.min_score,
            recent_attempts: recent.into_iter().map(RecentAttempt::from).collect(),
        })
    }
}
