// src/store/mod.rs

//! Persistence seams of the exam engine.
//!
//! Services receive these traits as `Arc<dyn ...>` at construction, so the
//! Postgres store can be swapped for the in-memory double in tests.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::ExamError,
    models::{
        exam::{Exam, NewExam},
        exam_record::{ExamAnswer, ExamRecord, GradedSubmission, ScoreSummary},
        pagination::Page,
        question::{AnswerKey, NewBank, NewQuestion, Question, QuestionBank, SampleFilter},
        user::{NewUser, User},
    },
};

pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, ExamError>;

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn insert_bank(&self, bank: NewBank) -> StoreResult<QuestionBank>;
    async fn find_bank(&self, id: i64) -> StoreResult<Option<QuestionBank>>;
    async fn list_banks(
        &self,
        subject: Option<&str>,
        page: Page,
    ) -> StoreResult<(Vec<QuestionBank>, i64)>;

    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question>;
    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>>;
    async fn list_questions_by_bank(
        &self,
        bank_id: i64,
        page: Page,
    ) -> StoreResult<(Vec<Question>, i64)>;

    /// Up to `count` matching questions in random order.
    async fn sample_questions(&self, filter: &SampleFilter, count: i64)
    -> StoreResult<Vec<Question>>;
}

#[async_trait]
pub trait ExamStore: Send + Sync {
    /// Current time according to the store.
    async fn now(&self) -> StoreResult<DateTime<Utc>>;

    /// Inserts the exam and links `question_ids` with sequence 1..n, atomically.
    /// Returns the new exam id.
    async fn insert_exam(&self, exam: NewExam, question_ids: &[i64]) -> StoreResult<i64>;

    /// Exam row without its questions.
    async fn find_exam(&self, id: i64) -> StoreResult<Option<Exam>>;

    /// Questions of an exam ordered by sequence.
    async fn exam_questions(&self, exam_id: i64) -> StoreResult<Vec<Question>>;

    /// Canonical answers of the questions that belong to an exam.
    async fn exam_answer_keys(&self, exam_id: i64) -> StoreResult<Vec<AnswerKey>>;

    async fn list_exams(&self, page: Page) -> StoreResult<(Vec<Exam>, i64)>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_record(&self, id: i64) -> StoreResult<Option<ExamRecord>>;
    async fn find_record_for(&self, exam_id: i64, user_id: i64)
    -> StoreResult<Option<ExamRecord>>;

    /// Inserts an ongoing attempt starting at `start_time`.
    /// A second attempt for the same (exam, user) is `DuplicateAttempt`.
    async fn insert_record(
        &self,
        exam_id: i64,
        user_id: i64,
        start_time: DateTime<Utc>,
    ) -> StoreResult<ExamRecord>;

    /// Moves an ongoing attempt through submitted to graded and stores its answers
    /// as one unit. Fails with `InvalidState` if the attempt is no longer ongoing.
    async fn finalize_submission(
        &self,
        record_id: i64,
        submission: &GradedSubmission,
    ) -> StoreResult<ExamRecord>;

    async fn record_answers(&self, record_id: i64) -> StoreResult<Vec<ExamAnswer>>;
    async fn list_records(&self, user_id: i64, page: Page) -> StoreResult<(Vec<ExamRecord>, i64)>;
    async fn graded_summary(&self, user_id: i64) -> StoreResult<ScoreSummary>;
    async fn recent_records(&self, user_id: i64, limit: i64) -> StoreResult<Vec<ExamRecord>>;
}

/// Identity and role lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Returns `None` when the username is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<Option<User>>;
}
