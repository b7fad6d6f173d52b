// src/models/exam_record.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "record_status", rename_all = "lowercase")]
pub enum RecordStatus {
    Ongoing,
    Submitted,
    Graded,
}

/// Represents the 'exam_records' table in the database.
/// One row per (exam, user) attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamRecord {
    pub id: i64,
    pub exam_id: i64,
    pub user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and submission.
    pub duration: Option<i32>,
    pub total_score: Option<f64>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<ExamAnswer>,
}

/// Represents the 'exam_answers' table. Written once at grading time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamAnswer {
    pub id: i64,
    pub record_id: i64,
    pub question_id: i64,
    pub user_answer: String,
    pub score: f64,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

/// One graded answer, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub user_answer: String,
    pub score: f64,
    pub is_correct: bool,
}

/// Everything written when an attempt moves from ongoing to graded.
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub end_time: DateTime<Utc>,
    pub duration: i32,
    pub total_score: f64,
    pub answers: Vec<GradedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerInput {
    pub question_id: i64,
    pub user_answer: String,
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitExamRequest {
    pub record_id: i64,
    #[validate(length(max = 500))]
    pub answers: Vec<AnswerInput>,
}

/// Aggregates over graded attempts, as read from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow)]
pub struct ScoreSummary {
    pub count: i64,
    pub total_score: f64,
    pub max_score: f64,
    pub min_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentAttempt {
    pub id: i64,
    pub exam_id: i64,
    pub total_score: Option<f64>,
    pub start_time: DateTime<Utc>,
    pub status: RecordStatus,
}

impl From<ExamRecord> for RecentAttempt {
    fn from(r: ExamRecord) -> Self {
        Self {
            id: r.id,
            exam_id: r.exam_id,
            total_score: r.total_score,
            start_time: r.start_time,
            status: r.status,
        }
    }
}

/// Per-user statistics returned by `GET /api/records/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct ExamStats {
    pub count: i64,
    pub total_score: f64,
    pub avg_score: f64,
    pub max_score: f64,
    pub min_score: f64,
    pub recent_attempts: Vec<RecentAttempt>,
}
