// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::ExamError,
    models::{
        exam::{Exam, NewExam},
        exam_record::{ExamAnswer, ExamRecord, GradedSubmission, RecordStatus, ScoreSummary},
        pagination::Page,
        question::{AnswerKey, NewBank, NewQuestion, Question, QuestionBank, SampleFilter},
        user::{NewUser, User},
    },
    store::{ExamStore, QuestionStore, RecordStore, StoreResult, UserDirectory},
};

const BANK_COLUMNS: &str = "id, name, description, subject, created_by, created_at, updated_at";

const QUESTION_COLUMNS: &str = "\
    q.id, q.bank_id, q.type, q.content, q.options, q.answer, q.score, \
    q.difficulty, q.analysis, q.created_by, q.created_at, q.updated_at";

const EXAM_COLUMNS: &str = "\
    id, title, description, subject, total_score, duration, start_time, end_time, \
    status, created_by, created_at, updated_at";

const RECORD_COLUMNS: &str = "\
    id, exam_id, user_id, start_time, end_time, duration, total_score, status, \
    created_at, updated_at";

const ANSWER_COLUMNS: &str =
    "id, record_id, question_id, user_answer, score, is_correct, created_at";

const USER_COLUMNS: &str = "\
    id, username, password, role, name, department, job_title, phone, status, created_at";

/// Postgres-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn insert_bank(&self, bank: NewBank) -> StoreResult<QuestionBank> {
        let bank = sqlx::query_as::<_, QuestionBank>(&format!(
            "INSERT INTO question_banks (name, description, subject, created_by) \
             VALUES ($1, $2, $3, $4) RETURNING {BANK_COLUMNS}"
        ))
        .bind(bank.name)
        .bind(bank.description)
        .bind(bank.subject)
        .bind(bank.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(bank)
    }

    async fn find_bank(&self, id: i64) -> StoreResult<Option<QuestionBank>> {
        let bank = sqlx::query_as::<_, QuestionBank>(&format!(
            "SELECT {BANK_COLUMNS} FROM question_banks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bank)
    }

    async fn list_banks(
        &self,
        subject: Option<&str>,
        page: Page,
    ) -> StoreResult<(Vec<QuestionBank>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM question_banks WHERE ($1::TEXT IS NULL OR subject = $1)",
        )
        .bind(subject)
        .fetch_one(&self.pool)
        .await?;

        let banks = sqlx::query_as::<_, QuestionBank>(&format!(
            "SELECT {BANK_COLUMNS} FROM question_banks \
             WHERE ($1::TEXT IS NULL OR subject = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(subject)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((banks, total))
    }

    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "WITH q AS ( \
                INSERT INTO questions \
                    (bank_id, type, content, options, answer, score, difficulty, analysis, created_by) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                RETURNING * \
             ) SELECT {QUESTION_COLUMNS} FROM q"
        ))
        .bind(question.bank_id)
        .bind(question.question_type)
        .bind(question.content)
        .bind(Json(question.options))
        .bind(question.answer)
        .bind(question.score)
        .bind(question.difficulty)
        .bind(question.analysis)
        .bind(question.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // Bank deleted between the existence check and the insert.
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ExamError::not_found("Question bank not found")
            }
            _ => ExamError::Store(e),
        })?;

        Ok(question)
    }

    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(question)
    }

    async fn list_questions_by_bank(
        &self,
        bank_id: i64,
        page: Page,
    ) -> StoreResult<(Vec<Question>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE bank_id = $1")
            .bind(bank_id)
            .fetch_one(&self.pool)
            .await?;

        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.bank_id = $1 \
             ORDER BY q.created_at DESC, q.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(bank_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((questions, total))
    }

    async fn sample_questions(
        &self,
        filter: &SampleFilter,
        count: i64,
    ) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q \
             WHERE ($1::TEXT IS NULL OR q.bank_id IN \
                    (SELECT id FROM question_banks WHERE subject = $1)) \
               AND ($2::TEXT IS NULL OR q.difficulty = $2) \
             ORDER BY RANDOM() LIMIT $3"
        ))
        .bind(filter.subject.as_deref())
        .bind(filter.difficulty.as_deref())
        .bind(count)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn now(&self) -> StoreResult<DateTime<Utc>> {
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }

    async fn insert_exam(&self, exam: NewExam, question_ids: &[i64]) -> StoreResult<i64> {
        // Dropping the transaction without commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        let exam_id: i64 = sqlx::query_scalar(
            "INSERT INTO exams \
                (title, description, subject, total_score, duration, start_time, end_time, status, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(exam.title)
        .bind(exam.description)
        .bind(exam.subject)
        .bind(exam.total_score)
        .bind(exam.duration)
        .bind(exam.start_time)
        .bind(exam.end_time)
        .bind(exam.status)
        .bind(exam.created_by)
        .fetch_one(&mut *tx)
        .await?;

        if !question_ids.is_empty() {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO exam_questions (exam_id, question_id, sequence) ",
            );
            query_builder.push_values(question_ids.iter().enumerate(), |mut row, (i, id)| {
                row.push_bind(exam_id)
                    .push_bind(*id)
                    .push_bind(i as i32 + 1);
            });
            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(exam_id)
    }

    async fn find_exam(&self, id: i64) -> StoreResult<Option<Exam>> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(exam)
    }

    async fn exam_questions(&self, exam_id: i64) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q \
             JOIN exam_questions eq ON q.id = eq.question_id \
             WHERE eq.exam_id = $1 ORDER BY eq.sequence"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn exam_answer_keys(&self, exam_id: i64) -> StoreResult<Vec<AnswerKey>> {
        let keys = sqlx::query_as::<_, AnswerKey>(
            "SELECT q.id AS question_id, q.answer, q.score FROM questions q \
             JOIN exam_questions eq ON q.id = eq.question_id \
             WHERE eq.exam_id = $1 ORDER BY eq.sequence",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn list_exams(&self, page: Page) -> StoreResult<(Vec<Exam>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exams")
            .fetch_one(&self.pool)
            .await?;

        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((exams, total))
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_record(&self, id: i64) -> StoreResult<Option<ExamRecord>> {
        let record = sqlx::query_as::<_, ExamRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM exam_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_record_for(
        &self,
        exam_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<ExamRecord>> {
        let record = sqlx::query_as::<_, ExamRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM exam_records WHERE exam_id = $1 AND user_id = $2"
        ))
        .bind(exam_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert_record(
        &self,
        exam_id: i64,
        user_id: i64,
        start_time: DateTime<Utc>,
    ) -> StoreResult<ExamRecord> {
        sqlx::query_as::<_, ExamRecord>(&format!(
            "INSERT INTO exam_records (exam_id, user_id, start_time, status) \
             VALUES ($1, $2, $3, $4) RETURNING {RECORD_COLUMNS}"
        ))
        .bind(exam_id)
        .bind(user_id)
        .bind(start_time)
        .bind(RecordStatus::Ongoing)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ExamError::DuplicateAttempt("You have already taken this exam".to_string())
            } else {
                ExamError::Store(e)
            }
        })
    }

    async fn finalize_submission(
        &self,
        record_id: i64,
        submission: &GradedSubmission,
    ) -> StoreResult<ExamRecord> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent submissions of the same attempt.
        let status: Option<RecordStatus> =
            sqlx::query_scalar("SELECT status FROM exam_records WHERE id = $1 FOR UPDATE")
                .bind(record_id)
                .fetch_optional(&mut *tx)
                .await?;

        match status {
            None => return Err(ExamError::not_found("Exam record not found")),
            Some(RecordStatus::Ongoing) => {}
            Some(_) => {
                return Err(ExamError::InvalidState(
                    "Exam has already been submitted".to_string(),
                ));
            }
        }

        sqlx::query(
            "UPDATE exam_records \
             SET end_time = $2, duration = $3, status = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(record_id)
        .bind(submission.end_time)
        .bind(submission.duration)
        .bind(RecordStatus::Submitted)
        .execute(&mut *tx)
        .await?;

        if !submission.answers.is_empty() {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO exam_answers (record_id, question_id, user_answer, score, is_correct) ",
            );
            query_builder.push_values(&submission.answers, |mut row, answer| {
                row.push_bind(record_id)
                    .push_bind(answer.question_id)
                    .push_bind(answer.user_answer.as_str())
                    .push_bind(answer.score)
                    .push_bind(answer.is_correct);
            });
            query_builder.build().execute(&mut *tx).await?;
        }

        let record = sqlx::query_as::<_, ExamRecord>(&format!(
            "UPDATE exam_records \
             SET total_score = $2, status = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record_id)
        .bind(submission.total_score)
        .bind(RecordStatus::Graded)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn record_answers(&self, record_id: i64) -> StoreResult<Vec<ExamAnswer>> {
        let answers = sqlx::query_as::<_, ExamAnswer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM exam_answers WHERE record_id = $1 ORDER BY id"
        ))
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    async fn list_records(&self, user_id: i64, page: Page) -> StoreResult<(Vec<ExamRecord>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exam_records WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let records = sqlx::query_as::<_, ExamRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM exam_records WHERE user_id = $1 \
             ORDER BY start_time DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((records, total))
    }

    async fn graded_summary(&self, user_id: i64) -> StoreResult<ScoreSummary> {
        let summary = sqlx::query_as::<_, ScoreSummary>(
            "SELECT \
                COUNT(*) AS count, \
                COALESCE(SUM(total_score), 0)::FLOAT8 AS total_score, \
                COALESCE(MAX(total_score), 0)::FLOAT8 AS max_score, \
                COALESCE(MIN(total_score), 0)::FLOAT8 AS min_score \
             FROM exam_records WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(RecordStatus::Graded)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    async fn recent_records(&self, user_id: i64, limit: i64) -> StoreResult<Vec<ExamRecord>> {
        let records = sqlx::query_as::<_, ExamRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM exam_records WHERE user_id = $1 \
             ORDER BY start_time DESC, id DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password, role, name, department, job_title, phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (username) DO NOTHING RETURNING {USER_COLUMNS}"
        ))
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.role)
        .bind(user.profile.name)
        .bind(user.profile.department)
        .bind(user.profile.job_title)
        .bind(user.profile.phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
