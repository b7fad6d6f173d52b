// src/services/question_repository.rs

use std::sync::Arc;

use crate::{
    error::ExamError,
    models::{
        pagination::Page,
        question::{
            CreateBankRequest, CreateQuestionRequest, NewBank, NewQuestion, Question,
            QuestionBank, SampleFilter, non_empty,
        },
    },
    store::QuestionStore,
    utils::html::clean_html,
};

/// Question banks, questions, and random sampling for exam generation.
#[derive(Clone)]
pub struct QuestionRepository {
    store: Arc<dyn QuestionStore>,
}

impl QuestionRepository {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self { store }
    }

    pub async fn create_bank(
        &self,
        req: CreateBankRequest,
        owner: i64,
    ) -> Result<QuestionBank, ExamError> {
        let bank = self
            .store
            .insert_bank(NewBank {
                name: req.name.trim().to_string(),
                description: clean_html(&req.description),
                subject: req.subject.trim().to_string(),
                created_by: owner,
            })
            .await?;

        tracing::info!(bank_id = bank.id, subject = %bank.subject, "question bank created");
        Ok(bank)
    }

    pub async fn get_bank(&self, id: i64) -> Result<QuestionBank, ExamError> {
        self.store
            .find_bank(id)
            .await?
            .ok_or_else(|| ExamError::not_found("Question bank not found"))
    }

    pub async fn create_question(
        &self,
        req: CreateQuestionRequest,
        owner: i64,
    ) -> Result<Question, ExamError> {
        if !(req.score.is_finite() && req.score > 0.0) {
            return Err(ExamError::validation("Question score must be positive"));
        }
        if self.store.find_bank(req.bank_id).await?.is_none() {
            return Err(ExamError::not_found("Question bank not found"));
        }

        let question = self
            .store
            .insert_question(NewQuestion {
                bank_id: req.bank_id,
                question_type: req.question_type,
                content: clean_html(&req.content),
                options: req.options,
                answer: req.answer,
                score: req.score,
                difficulty: req.difficulty.trim().to_string(),
                analysis: clean_html(&req.analysis),
                created_by: owner,
            })
            .await?;

        tracing::info!(question_id = question.id, bank_id = question.bank_id, "question created");
        Ok(question)
    }

    pub async fn get_question(&self, id: i64) -> Result<Question, ExamError> {
        self.store
            .find_question(id)
            .await?
            .ok_or_else(|| ExamError::not_found("Question not found"))
    }

    /// Empty `subject` lists every bank.
    pub async fn list_banks(
        &self,
        subject: &str,
        page: Page,
    ) -> Result<(Vec<QuestionBank>, i64), ExamError> {
        let subject = non_empty(subject);
        self.store.list_banks(subject.as_deref(), page).await
    }

    pub async fn list_questions_by_bank(
        &self,
        bank_id: i64,
        page: Page,
    ) -> Result<(Vec<Question>, i64), ExamError> {
        self.store.list_questions_by_bank(bank_id, page).await
    }

    /// Returns up to `count` questions; a smaller pool yields fewer questions, not an error.
    pub async fn sample_random(
        &self,
        subject: &str,
        difficulty: &str,
        count: i64,
    ) -> Result<Vec<Question>, ExamError> {
        if count <= 0 {
            return Ok(Vec::new());
        }
        let filter = SampleFilter::new(subject, difficulty);
        self.store.sample_questions(&filter, count).await
    }
}
