// src/services/attempts.rs

use std::sync::Arc;

use crate::{
    error::ExamError,
    models::{
        exam::ExamStatus,
        exam_record::{AnswerInput, ExamRecord, GradedSubmission, RecordStatus},
        pagination::Page,
    },
    services::grading::GradingEngine,
    store::{ExamStore, RecordStore},
};

/// Attempt lifecycle: ongoing -> submitted -> graded.
#[derive(Clone)]
pub struct AttemptService {
    exams: Arc<dyn ExamStore>,
    records: Arc<dyn RecordStore>,
    grader: GradingEngine,
}

impl AttemptService {
    pub fn new(
        exams: Arc<dyn ExamStore>,
        records: Arc<dyn RecordStore>,
        grader: GradingEngine,
    ) -> Self {
        Self {
            exams,
            records,
            grader,
        }
    }

    /// Opens an attempt for `user_id`, inside the exam window, at most once per exam.
    pub async fn start(&self, exam_id: i64, user_id: i64) -> Result<ExamRecord, ExamError> {
        let exam = self
            .exams
            .find_exam(exam_id)
            .await?
            .ok_or_else(|| ExamError::not_found("Exam not found"))?;

        if exam.status != ExamStatus::Published {
            return Err(ExamError::InvalidState("Exam is not published".to_string()));
        }

        let now = self.exams.now().await?;
        if now < exam.start_time {
            return Err(ExamError::Window("Exam has not started yet".to_string()));
        }
        if now > exam.end_time {
            return Err(ExamError::Window("Exam has already ended".to_string()));
        }

        // Fast path only; the store's unique constraint is the authority.
        if self.records.find_record_for(exam_id, user_id).await?.is_some() {
            return Err(ExamError::DuplicateAttempt(
                "You have already taken this exam".to_string(),
            ));
        }

        let record = self.records.insert_record(exam_id, user_id, now).await?;
        tracing::info!(record_id = record.id, exam_id, user_id, "exam attempt started");
        Ok(record)
    }

    /// Grades an ongoing attempt and stores the result in one unit.
    pub async fn submit(
        &self,
        record_id: i64,
        answers: &[AnswerInput],
    ) -> Result<ExamRecord, ExamError> {
        let record = self
            .records
            .find_record(record_id)
            .await?
            .ok_or_else(|| ExamError::not_found("Exam record not found"))?;

        if record.status != RecordStatus::Ongoing {
            return Err(ExamError::InvalidState(
                "Exam has already been submitted".to_string(),
            ));
        }

        let now = self.exams.now().await?;
        let duration = (now - record.start_time).num_seconds().clamp(0, i32::MAX as i64) as i32;

        let (total_score, graded) = self.grader.grade(record.exam_id, answers).await?;

        let mut record = self
            .records
            .finalize_submission(
                record_id,
                &GradedSubmission {
                    end_time: now,
                    duration,
                    total_score,
                    answers: graded,
                },
            )
            .await?;
        record.answers = self.records.record_answers(record_id).await?;

        tracing::info!(
            record_id,
            exam_id = record.exam_id,
            user_id = record.user_id,
            total_score,
            duration,
            "exam attempt graded"
        );
        Ok(record)
    }

    /// Attempt with its graded answers.
    pub async fn record(&self, record_id: i64) -> Result<ExamRecord, ExamError> {
        let mut record = self
            .records
            .find_record(record_id)
            .await?
            .ok_or_else(|| ExamError::not_found("Exam record not found"))?;
        record.answers = self.records.record_answers(record_id).await?;
        Ok(record)
    }

    pub async fn list_records(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<(Vec<ExamRecord>, i64), ExamError> {
        self.records.list_records(user_id, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam::NewExam;
    use crate::services::fixtures::{self, Context};

    fn answer(question_id: i64, user_answer: &str) -> AnswerInput {
        AnswerInput {
            question_id,
            user_answer: user_answer.to_string(),
        }
    }

    /// Two-question exam scored {5, 10} with answers {"A", "B"}, window open at the store's "now".
    async fn two_question_exam(ctx: &Context) -> (i64, Vec<i64>) {
        let bank = fixtures::bank(&ctx.questions, "math").await;
        let q1 = fixtures::question(&ctx.questions, bank.id, "A", 5.0, "").await;
        let q2 = fixtures::question(&ctx.questions, bank.id, "B", 10.0, "").await;
        let exam = ctx
            .generator
            .generate(fixtures::generate_request("math", 2), 1)
            .await
            .unwrap();
        (exam.id, vec![q1.id, q2.id])
    }

    #[tokio::test]
    async fn start_creates_an_ongoing_record() {
        let ctx = Context::new();
        let (exam_id, _) = two_question_exam(&ctx).await;

        let record = ctx.attempts.start(exam_id, 42).await.unwrap();
        assert_eq!(record.status, RecordStatus::Ongoing);
        assert_eq!(record.user_id, 42);
        assert!(record.end_time.is_none());
        assert!(record.total_score.is_none());
    }

    #[tokio::test]
    async fn start_on_a_draft_exam_is_invalid_state() {
        let ctx = Context::new();
        let bank = fixtures::bank(&ctx.questions, "math").await;
        let q = fixtures::question(&ctx.questions, bank.id, "A", 5.0, "").await;

        let exam_id = ctx
            .store
            .insert_exam(
                NewExam {
                    title: "Draft".into(),
                    description: String::new(),
                    subject: "math".into(),
                    total_score: 5.0,
                    duration: 30,
                    start_time: fixtures::at("2024-01-01 00:00:00"),
                    end_time: fixtures::at("2024-01-02 00:00:00"),
                    status: ExamStatus::Draft,
                    created_by: 1,
                },
                &[q.id],
            )
            .await
            .unwrap();

        let err = ctx.attempts.start(exam_id, 1).await.unwrap_err();
        assert!(matches!(err, ExamError::InvalidState(_)));
        assert_eq!(ctx.store.record_count(), 0);
    }

    #[tokio::test]
    async fn start_unknown_exam_is_not_found() {
        let ctx = Context::new();
        let err = ctx.attempts.start(999, 1).await.unwrap_err();
        assert!(matches!(err, ExamError::NotFound(_)));
    }

    #[tokio::test]
    async fn start_outside_window_fails_without_creating_a_record() {
        let ctx = Context::new();
        let (exam_id, _) = two_question_exam(&ctx).await;

        ctx.store.set_now(fixtures::at("2023-12-31 23:59:59"));
        let err = ctx.attempts.start(exam_id, 1).await.unwrap_err();
        assert!(matches!(err, ExamError::Window(ref m) if m.contains("not started")));

        ctx.store.set_now(fixtures::at("2024-01-02 00:00:01"));
        let err = ctx.attempts.start(exam_id, 1).await.unwrap_err();
        assert!(matches!(err, ExamError::Window(ref m) if m.contains("ended")));

        assert_eq!(ctx.store.record_count(), 0);
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let ctx = Context::new();
        let (exam_id, _) = two_question_exam(&ctx).await;

        ctx.store.set_now(fixtures::at("2024-01-02 00:00:00"));
        assert!(ctx.attempts.start(exam_id, 1).await.is_ok());
    }

    #[tokio::test]
    async fn second_start_is_a_duplicate_attempt() {
        let ctx = Context::new();
        let (exam_id, _) = two_question_exam(&ctx).await;

        ctx.attempts.start(exam_id, 1).await.unwrap();
        let err = ctx.attempts.start(exam_id, 1).await.unwrap_err();
        assert!(matches!(err, ExamError::DuplicateAttempt(_)));
        assert_eq!(ctx.store.record_count(), 1);

        // Another user is unaffected.
        assert!(ctx.attempts.start(exam_id, 2).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_starts_create_one_record() {
        let ctx = Context::new();
        let (exam_id, _) = two_question_exam(&ctx).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let attempts = ctx.attempts.clone();
            handles.push(tokio::spawn(async move { attempts.start(exam_id, 5).await }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, ExamError::DuplicateAttempt(_))),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(ctx.store.record_count(), 1);
    }

    #[tokio::test]
    async fn submit_all_correct_scores_fifteen() {
        let ctx = Context::new();
        let (exam_id, ids) = two_question_exam(&ctx).await;
        let record = ctx.attempts.start(exam_id, 1).await.unwrap();

        ctx.store.advance(95);
        let graded = ctx
            .attempts
            .submit(record.id, &[answer(ids[0], "A"), answer(ids[1], "B")])
            .await
            .unwrap();

        assert_eq!(graded.status, RecordStatus::Graded);
        assert_eq!(graded.total_score, Some(15.0));
        assert_eq!(graded.duration, Some(95));
        assert!(graded.end_time.is_some());
        assert_eq!(graded.answers.len(), 2);
        assert!(graded.answers.iter().all(|a| a.is_correct));
    }

    #[tokio::test]
    async fn submit_one_wrong_scores_five() {
        let ctx = Context::new();
        let (exam_id, ids) = two_question_exam(&ctx).await;
        let record = ctx.attempts.start(exam_id, 1).await.unwrap();

        let graded = ctx
            .attempts
            .submit(record.id, &[answer(ids[0], "A"), answer(ids[1], "C")])
            .await
            .unwrap();

        assert_eq!(graded.total_score, Some(5.0));
        let second = graded.answers.iter().find(|a| a.question_id == ids[1]).unwrap();
        assert!(!second.is_correct);
        assert_eq!(second.score, 0.0);
    }

    #[tokio::test]
    async fn empty_submission_grades_to_zero() {
        let ctx = Context::new();
        let (exam_id, _) = two_question_exam(&ctx).await;
        let record = ctx.attempts.start(exam_id, 1).await.unwrap();

        let graded = ctx.attempts.submit(record.id, &[]).await.unwrap();
        assert_eq!(graded.status, RecordStatus::Graded);
        assert_eq!(graded.total_score, Some(0.0));
        assert!(graded.answers.is_empty());
    }

    #[tokio::test]
    async fn resubmitting_a_graded_record_is_invalid_state() {
        let ctx = Context::new();
        let (exam_id, ids) = two_question_exam(&ctx).await;
        let record = ctx.attempts.start(exam_id, 1).await.unwrap();
        let answers = [answer(ids[0], "A"), answer(ids[1], "B")];

        ctx.attempts.submit(record.id, &answers).await.unwrap();
        let err = ctx.attempts.submit(record.id, &answers).await.unwrap_err();

        assert!(matches!(err, ExamError::InvalidState(_)));
        assert_eq!(ctx.store.answer_count(), 2);
    }

    #[tokio::test]
    async fn submit_unknown_record_is_not_found() {
        let ctx = Context::new();
        let err = ctx.attempts.submit(31337, &[]).await.unwrap_err();
        assert!(matches!(err, ExamError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_question_leaves_the_attempt_ongoing() {
        let ctx = Context::new();
        let (exam_id, ids) = two_question_exam(&ctx).await;
        let record = ctx.attempts.start(exam_id, 1).await.unwrap();

        let err = ctx
            .attempts
            .submit(record.id, &[answer(ids[0], "A"), answer(777, "B")])
            .await
            .unwrap_err();
        assert!(matches!(err, ExamError::NotFound(_)));

        let reloaded = ctx.attempts.record(record.id).await.unwrap();
        assert_eq!(reloaded.status, RecordStatus::Ongoing);
        assert!(reloaded.end_time.is_none());
        assert_eq!(ctx.store.answer_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_rolls_back_the_whole_submission() {
        let ctx = Context::new();
        let (exam_id, ids) = two_question_exam(&ctx).await;
        let record = ctx.attempts.start(exam_id, 1).await.unwrap();

        ctx.store.fail_next_finalize();
        let err = ctx
            .attempts
            .submit(record.id, &[answer(ids[0], "A"), answer(ids[1], "B")])
            .await
            .unwrap_err();
        assert!(matches!(err, ExamError::Store(_)));

        let reloaded = ctx.attempts.record(record.id).await.unwrap();
        assert_eq!(reloaded.status, RecordStatus::Ongoing);
        assert!(reloaded.total_score.is_none());
        assert!(reloaded.answers.is_empty());

        // A retry from the caller goes through.
        let graded = ctx
            .attempts
            .submit(record.id, &[answer(ids[0], "A"), answer(ids[1], "B")])
            .await
            .unwrap();
        assert_eq!(graded.total_score, Some(15.0));
    }

    #[tokio::test]
    async fn records_are_listed_newest_first() {
        let ctx = Context::new();
        let (first, _) = two_question_exam(&ctx).await;
        let second = ctx
            .generator
            .generate(fixtures::generate_request("math", 1), 1)
            .await
            .unwrap();

        ctx.attempts.start(first, 9).await.unwrap();
        ctx.store.advance(60);
        ctx.attempts.start(second.id, 9).await.unwrap();

        let (records, total) = ctx
            .attempts
            .list_records(9, Page::clamped(None, None))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(records[0].exam_id, second.id);
    }
}
