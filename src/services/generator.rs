// src/services/generator.rs

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    config::EXAM_TIME_FORMAT,
    error::ExamError,
    models::{
        exam::{Exam, ExamStatus, GenerateExamRequest, NewExam},
        pagination::Page,
    },
    services::question_repository::QuestionRepository,
    store::ExamStore,
    utils::html::clean_html,
};

/// Builds exams from random samples of the question pool.
#[derive(Clone)]
pub struct ExamGenerator {
    questions: QuestionRepository,
    exams: Arc<dyn ExamStore>,
}

/// Parses a window timestamp in `EXAM_TIME_FORMAT`, read as UTC.
pub fn parse_exam_time(value: &str, field: &str) -> Result<DateTime<Utc>, ExamError> {
    NaiveDateTime::parse_from_str(value.trim(), EXAM_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            ExamError::validation(format!(
                "{field} must use the format YYYY-MM-DD HH:MM:SS"
            ))
        })
}

impl ExamGenerator {
    pub fn new(questions: QuestionRepository, exams: Arc<dyn ExamStore>) -> Self {
        Self { questions, exams }
    }

    pub async fn generate(
        &self,
        req: GenerateExamRequest,
        creator_id: i64,
    ) -> Result<Exam, ExamError> {
        let start_time = parse_exam_time(&req.start_time, "start_time")?;
        let end_time = parse_exam_time(&req.end_time, "end_time")?;
        if end_time <= start_time {
            return Err(ExamError::validation("end_time must be after start_time"));
        }
        if req.question_count <= 0 {
            return Err(ExamError::validation("question_count must be positive"));
        }

        let questions = self
            .questions
            .sample_random(&req.subject, &req.difficulty, req.question_count)
            .await?;

        if questions.is_empty() {
            return Err(ExamError::validation(
                "No questions match the requested subject and difficulty",
            ));
        }
        if (questions.len() as i64) < req.question_count {
            if req.strict_count {
                return Err(ExamError::validation(format!(
                    "Only {} of {} requested questions are available",
                    questions.len(),
                    req.question_count
                )));
            }
            tracing::warn!(
                subject = %req.subject,
                difficulty = %req.difficulty,
                requested = req.question_count,
                available = questions.len(),
                "question pool smaller than requested, generating a shorter exam"
            );
        }

        let total_score: f64 = questions.iter().map(|q| q.score).sum();
        let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();

        let exam_id = self
            .exams
            .insert_exam(
                NewExam {
                    title: req.title.trim().to_string(),
                    description: clean_html(&req.description),
                    subject: req.subject.trim().to_string(),
                    total_score,
                    duration: req.duration,
                    start_time,
                    end_time,
                    status: ExamStatus::Published,
                    created_by: creator_id,
                },
                &question_ids,
            )
            .await?;

        let mut exam = self
            .exams
            .find_exam(exam_id)
            .await?
            .ok_or_else(|| ExamError::not_found("Exam not found"))?;
        exam.questions = questions;

        tracing::info!(
            exam_id,
            creator_id,
            question_count = exam.questions.len(),
            total_score,
            "exam generated"
        );
        Ok(exam)
    }

    /// Exam with its questions in sequence order.
    pub async fn get_exam(&self, exam_id: i64) -> Result<Exam, ExamError> {
        let mut exam = self
            .exams
            .find_exam(exam_id)
            .await?
            .ok_or_else(|| ExamError::not_found("Exam not found"))?;
        exam.questions = self.exams.exam_questions(exam_id).await?;
        Ok(exam)
    }

    pub async fn list_exams(&self, page: Page) -> Result<(Vec<Exam>, i64), ExamError> {
        self.exams.list_exams(page).await
    }
}
