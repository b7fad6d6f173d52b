// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Question types accepted by the bank.
pub const QUESTION_TYPES: [&str; 3] = ["single", "multiple", "judge"];

/// Represents the 'question_banks' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: i64,
    pub name: String,
    pub description: String,

    /// Free-form classification used to filter banks and to sample questions.
    pub subject: String,

    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub bank_id: i64,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,

    pub content: String,

    /// List of options (e.g., ["A. ...", "B. ..."]), stored as a JSON array.
    pub options: Json<Vec<String>>,

    /// Canonical answer. Grading compares against it byte for byte.
    pub answer: String,

    /// Points awarded for a correct answer. Always positive.
    pub score: f64,

    pub difficulty: String,
    pub analysis: String,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to an exam taker (excludes answer and analysis).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Json<Vec<String>>,
    pub score: f64,
    pub difficulty: String,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            content: q.content,
            options: q.options,
            score: q.score,
            difficulty: q.difficulty,
        }
    }
}

/// Canonical answer and score of a question, used during grading.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AnswerKey {
    pub question_id: i64,
    pub answer: String,
    pub score: f64,
}

/// Optional filters for random sampling. Empty strings mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    pub subject: Option<String>,
    pub difficulty: Option<String>,
}

impl SampleFilter {
    pub fn new(subject: &str, difficulty: &str) -> Self {
        Self {
            subject: non_empty(subject),
            difficulty: non_empty(difficulty),
        }
    }
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// DTO for creating a question bank.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBankRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub bank_id: i64,
    #[validate(custom(function = validate_question_type))]
    #[serde(rename = "type")]
    pub question_type: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub score: f64,
    #[validate(length(max = 20))]
    #[serde(default)]
    pub difficulty: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub analysis: String,
}

/// Bank row to insert, after sanitizing.
#[derive(Debug, Clone)]
pub struct NewBank {
    pub name: String,
    pub description: String,
    pub subject: String,
    pub created_by: i64,
}

/// Question row to insert, after sanitizing.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub bank_id: i64,
    pub question_type: String,
    pub content: String,
    pub options: Vec<String>,
    pub answer: String,
    pub score: f64,
    pub difficulty: String,
    pub analysis: String,
    pub created_by: i64,
}

fn validate_question_type(kind: &str) -> Result<(), validator::ValidationError> {
    if !QUESTION_TYPES.contains(&kind) {
        return Err(validator::ValidationError::new("invalid_question_type"));
    }
    Ok(())
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() > 26 {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
