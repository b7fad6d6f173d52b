// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::{PublicQuestion, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "exam_status", rename_all = "lowercase")]
pub enum ExamStatus {
    Draft,
    Published,
}

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub subject: String,

    /// Sum of the question scores when the exam was generated. Never recomputed.
    pub total_score: f64,

    /// Informational length in minutes; attempts are bounded by the window only.
    pub duration: i32,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ExamStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Ordered by sequence. Loaded separately from `exam_questions`.
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<Question>,
}

/// Exam row to insert together with its question links.
#[derive(Debug, Clone)]
pub struct NewExam {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub total_score: f64,
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ExamStatus,
    pub created_by: i64,
}

/// DTO for generating an exam from the question pool.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    #[validate(range(min = 1, max = 1440))]
    pub duration: i32,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub start_time: String,
    pub end_time: String,
    #[validate(range(min = 1, max = 500))]
    pub question_count: i64,
    #[serde(default)]
    pub difficulty: String,
    /// Fail instead of building a shorter exam when the pool is too small.
    #[serde(default)]
    pub strict_count: bool,
}

/// Exam as returned to API callers; questions are answer-free unless the caller is staff.
#[derive(Debug, Serialize)]
pub struct ExamView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub total_score: f64,
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ExamStatus,
    pub created_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    pub created_at: DateTime<Utc>,
    pub question_count: usize,
    pub questions: ExamQuestions,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ExamQuestions {
    Full(Vec<Question>),
    Public(Vec<PublicQuestion>),
}

impl ExamView {
    pub fn new(exam: Exam, reveal_answers: bool, creator: Option<String>) -> Self {
        let question_count = exam.questions.len();
        let questions = if reveal_answers {
            ExamQuestions::Full(exam.questions)
        } else {
            ExamQuestions::Public(exam.questions.into_iter().map(PublicQuestion::from).collect())
        };

        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            subject: exam.subject,
            total_score: exam.total_score,
            duration: exam.duration,
            start_time: exam.start_time,
            end_time: exam.end_time,
            status: exam.status,
            created_by: exam.created_by,
            creator,
            created_at: exam.created_at,
            question_count,
            questions,
        }
    }
}
