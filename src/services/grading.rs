// src/services/grading.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    error::ExamError,
    models::{
        exam_record::{AnswerInput, GradedAnswer},
        question::AnswerKey,
    },
    store::ExamStore,
};

/// Scores submitted answers against an exam's canonical answers.
#[derive(Clone)]
pub struct GradingEngine {
    exams: Arc<dyn ExamStore>,
}

impl GradingEngine {
    pub fn new(exams: Arc<dyn ExamStore>) -> Self {
        Self { exams }
    }

    /// Grades `answers` for `exam_id`. Returns the total and one graded row per answer.
    pub async fn grade(
        &self,
        exam_id: i64,
        answers: &[AnswerInput],
    ) -> Result<(f64, Vec<GradedAnswer>), ExamError> {
        let keys = self.exams.exam_answer_keys(exam_id).await?;
        grade_answers(&keys, answers)
    }
}

/// Exact, case-sensitive string match; full score or nothing.
/// Questions without an answer produce no row and score 0.
pub fn grade_answers(
    keys: &[AnswerKey],
    answers: &[AnswerInput],
) -> Result<(f64, Vec<GradedAnswer>), ExamError> {
    let key_map: HashMap<i64, &AnswerKey> = keys.iter().map(|k| (k.question_id, k)).collect();
    let mut seen = HashSet::with_capacity(answers.len());
    let mut total_score = 0.0;
    let mut graded = Vec::with_capacity(answers.len());

    for input in answers {
        let key = key_map.get(&input.question_id).ok_or_else(|| {
            ExamError::not_found(format!(
                "Question {} is not part of this exam",
                input.question_id
            ))
        })?;
        // A repeated question is rejected, not stored twice.
        // UNIQUE (record_id, question_id) on exam_answers relies on this.
        if !seen.insert(input.question_id) {
            return Err(ExamError::validation(format!(
                "Question {} was answered more than once",
                input.question_id
            )));
        }

        let is_correct = input.user_answer == key.answer;
        let score = if is_correct { key.score } else { 0.0 };
        total_score += score;

        graded.push(GradedAnswer {
            question_id: input.question_id,
            user_answer: input.user_answer.clone(),
            score,
            is_correct,
        });
    }

    Ok((total_score, graded))
}
