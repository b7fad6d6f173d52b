// src/store/memory.rs

//! In-memory store double used by unit and HTTP tests.
//!
//! Every trait method takes the single lock once, so each call is atomic the
//! same way a committed transaction is. The clock is fixed until moved with
//! `set_now`/`advance`. `fail_next_finalize` and `fail_next_insert_exam`
//! simulate a store failure in the middle of a submission or an exam write.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::seq::SliceRandom;
use sqlx::types::Json;

use crate::{
    error::ExamError,
    models::{
        exam::{Exam, NewExam},
        exam_record::{ExamAnswer, ExamRecord, GradedSubmission, RecordStatus, ScoreSummary},
        pagination::Page,
        question::{AnswerKey, NewBank, NewQuestion, Question, QuestionBank, SampleFilter},
        user::{NewUser, STATUS_ACTIVE, User},
    },
    store::{ExamStore, QuestionStore, RecordStore, StoreResult, UserDirectory},
};

#[derive(Default)]
struct Inner {
    now: Option<DateTime<Utc>>,
    next_id: i64,
    banks: Vec<QuestionBank>,
    questions: Vec<Question>,
    exams: Vec<Exam>,
    exam_questions: HashMap<i64, Vec<i64>>,
    records: Vec<ExamRecord>,
    answers: Vec<ExamAnswer>,
    users: Vec<User>,
    fail_next_finalize: bool,
    fail_next_insert_exam: bool,
}

impl Inner {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
            .unwrap_or_else(|| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn paginate<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        self.inner.lock().unwrap().now = Some(now);
    }

    pub fn advance(&self, seconds: i64) {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.now();
        inner.now = Some(now + Duration::seconds(seconds));
    }

    pub fn fail_next_finalize(&self) {
        self.inner.lock().unwrap().fail_next_finalize = true;
    }

    pub fn fail_next_insert_exam(&self) {
        self.inner.lock().unwrap().fail_next_insert_exam = true;
    }

    pub fn exam_count(&self) -> usize {
        self.inner.lock().unwrap().exams.len()
    }

    pub fn record_count(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn answer_count(&self) -> usize {
        self.inner.lock().unwrap().answers.len()
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn insert_bank(&self, bank: NewBank) -> StoreResult<QuestionBank> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.now();
        let bank = QuestionBank {
            id: inner.id(),
            name: bank.name,
            description: bank.description,
            subject: bank.subject,
            created_by: bank.created_by,
            created_at: now,
            updated_at: now,
        };
        inner.banks.push(bank.clone());
        Ok(bank)
    }

    async fn find_bank(&self, id: i64) -> StoreResult<Option<QuestionBank>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.banks.iter().find(|b| b.id == id).cloned())
    }

    async fn list_banks(
        &self,
        subject: Option<&str>,
        page: Page,
    ) -> StoreResult<(Vec<QuestionBank>, i64)> {
        let inner = self.inner.lock().unwrap();
        let mut banks: Vec<QuestionBank> = inner
            .banks
            .iter()
            .filter(|b| subject.is_none_or(|s| b.subject == s))
            .cloned()
            .collect();
        banks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok((paginate(&banks, page), banks.len() as i64))
    }

    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.banks.iter().any(|b| b.id == question.bank_id) {
            return Err(ExamError::not_found("Question bank not found"));
        }
        let now = inner.now();
        let question = Question {
            id: inner.id(),
            bank_id: question.bank_id,
            question_type: question.question_type,
            content: question.content,
            options: Json(question.options),
            answer: question.answer,
            score: question.score,
            difficulty: question.difficulty,
            analysis: question.analysis,
            created_by: question.created_by,
            created_at: now,
            updated_at: now,
        };
        inner.questions.push(question.clone());
        Ok(question)
    }

    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn list_questions_by_bank(
        &self,
        bank_id: i64,
        page: Page,
    ) -> StoreResult<(Vec<Question>, i64)> {
        let inner = self.inner.lock().unwrap();
        let mut questions: Vec<Question> = inner
            .questions
            .iter()
            .filter(|q| q.bank_id == bank_id)
            .cloned()
            .collect();
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok((paginate(&questions, page), questions.len() as i64))
    }

    async fn sample_questions(
        &self,
        filter: &SampleFilter,
        count: i64,
    ) -> StoreResult<Vec<Question>> {
        let inner = self.inner.lock().unwrap();
        let subject_banks: Option<Vec<i64>> = filter.subject.as_ref().map(|subject| {
            inner
                .banks
                .iter()
                .filter(|b| &b.subject == subject)
                .map(|b| b.id)
                .collect()
        });

        let mut matches: Vec<Question> = inner
            .questions
            .iter()
            .filter(|q| subject_banks.as_ref().is_none_or(|ids| ids.contains(&q.bank_id)))
            .filter(|q| filter.difficulty.as_ref().is_none_or(|d| &q.difficulty == d))
            .cloned()
            .collect();

        matches.shuffle(&mut rand::thread_rng());
        matches.truncate(count.max(0) as usize);
        Ok(matches)
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn now(&self) -> StoreResult<DateTime<Utc>> {
        Ok(self.inner.lock().unwrap().now())
    }

    async fn insert_exam(&self, exam: NewExam, question_ids: &[i64]) -> StoreResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(missing) = question_ids
            .iter()
            .find(|id| !inner.questions.iter().any(|q| q.id == **id))
        {
            // Mirrors the foreign key: nothing is written.
            return Err(ExamError::not_found(format!("Question {missing} not found")));
        }
        if std::mem::take(&mut inner.fail_next_insert_exam) {
            return Err(ExamError::Store(sqlx::Error::PoolTimedOut));
        }

        let now = inner.now();
        let id = inner.id();
        inner.exams.push(Exam {
            id,
            title: exam.title,
            description: exam.description,
            subject: exam.subject,
            total_score: exam.total_score,
            duration: exam.duration,
            start_time: exam.start_time,
            end_time: exam.end_time,
            status: exam.status,
            created_by: exam.created_by,
            created_at: now,
            updated_at: now,
            questions: Vec::new(),
        });
        inner.exam_questions.insert(id, question_ids.to_vec());
        Ok(id)
    }

    async fn find_exam(&self, id: i64) -> StoreResult<Option<Exam>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.exams.iter().find(|e| e.id == id).cloned())
    }

    async fn exam_questions(&self, exam_id: i64) -> StoreResult<Vec<Question>> {
        let inner = self.inner.lock().unwrap();
        let ids = inner.exam_questions.get(&exam_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| inner.questions.iter().find(|q| q.id == *id).cloned())
            .collect())
    }

    async fn exam_answer_keys(&self, exam_id: i64) -> StoreResult<Vec<AnswerKey>> {
        let questions = self.exam_questions(exam_id).await?;
        Ok(questions
            .into_iter()
            .map(|q| AnswerKey {
                question_id: q.id,
                answer: q.answer,
                score: q.score,
            })
            .collect())
    }

    async fn list_exams(&self, page: Page) -> StoreResult<(Vec<Exam>, i64)> {
        let inner = self.inner.lock().unwrap();
        let mut exams = inner.exams.clone();
        exams.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok((paginate(&exams, page), exams.len() as i64))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_record(&self, id: i64) -> StoreResult<Option<ExamRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    async fn find_record_for(
        &self,
        exam_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<ExamRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .find(|r| r.exam_id == exam_id && r.user_id == user_id)
            .cloned())
    }

    async fn insert_record(
        &self,
        exam_id: i64,
        user_id: i64,
        start_time: DateTime<Utc>,
    ) -> StoreResult<ExamRecord> {
        let mut inner = self.inner.lock().unwrap();
        // Same guarantee as UNIQUE (exam_id, user_id).
        if inner
            .records
            .iter()
            .any(|r| r.exam_id == exam_id && r.user_id == user_id)
        {
            return Err(ExamError::DuplicateAttempt(
                "You have already taken this exam".to_string(),
            ));
        }

        let now = inner.now();
        let record = ExamRecord {
            id: inner.id(),
            exam_id,
            user_id,
            start_time,
            end_time: None,
            duration: None,
            total_score: None,
            status: RecordStatus::Ongoing,
            created_at: now,
            updated_at: now,
            answers: Vec::new(),
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn finalize_submission(
        &self,
        record_id: i64,
        submission: &GradedSubmission,
    ) -> StoreResult<ExamRecord> {
        let mut inner = self.inner.lock().unwrap();
        let Some(idx) = inner.records.iter().position(|r| r.id == record_id) else {
            return Err(ExamError::not_found("Exam record not found"));
        };
        if inner.records[idx].status != RecordStatus::Ongoing {
            return Err(ExamError::InvalidState(
                "Exam has already been submitted".to_string(),
            ));
        }
        if std::mem::take(&mut inner.fail_next_finalize) {
            return Err(ExamError::Store(sqlx::Error::PoolTimedOut));
        }

        let now = inner.now();
        let mut rows = Vec::with_capacity(submission.answers.len());
        for answer in &submission.answers {
            rows.push(ExamAnswer {
                id: inner.id(),
                record_id,
                question_id: answer.question_id,
                user_answer: answer.user_answer.clone(),
                score: answer.score,
                is_correct: answer.is_correct,
                created_at: now,
            });
        }
        inner.answers.extend(rows);

        let record = &mut inner.records[idx];
        record.end_time = Some(submission.end_time);
        record.duration = Some(submission.duration);
        record.total_score = Some(submission.total_score);
        record.status = RecordStatus::Graded;
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn record_answers(&self, record_id: i64) -> StoreResult<Vec<ExamAnswer>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .answers
            .iter()
            .filter(|a| a.record_id == record_id)
            .cloned()
            .collect())
    }

    async fn list_records(&self, user_id: i64, page: Page) -> StoreResult<(Vec<ExamRecord>, i64)> {
        let records = self.recent_records(user_id, i64::MAX).await?;
        Ok((paginate(&records, page), records.len() as i64))
    }

    async fn graded_summary(&self, user_id: i64) -> StoreResult<ScoreSummary> {
        let inner = self.inner.lock().unwrap();
        let scores: Vec<f64> = inner
            .records
            .iter()
            .filter(|r| r.user_id == user_id && r.status == RecordStatus::Graded)
            .map(|r| r.total_score.unwrap_or(0.0))
            .collect();

        if scores.is_empty() {
            return Ok(ScoreSummary::default());
        }
        Ok(ScoreSummary {
            count: scores.len() as i64,
            total_score: scores.iter().sum(),
            max_score: scores.iter().copied().fold(f64::MIN, f64::max),
            min_score: scores.iter().copied().fold(f64::MAX, f64::min),
        })
    }

    async fn recent_records(&self, user_id: i64, limit: i64) -> StoreResult<Vec<ExamRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<ExamRecord> = inner
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<Option<User>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.username == user.username) {
            return Ok(None);
        }
        let now = inner.now();
        let user = User {
            id: inner.id(),
            username: user.username,
            password: user.password_hash,
            role: user.role,
            profile: user.profile,
            status: STATUS_ACTIVE,
            created_at: now,
        };
        inner.users.push(user.clone());
        Ok(Some(user))
    }
}
