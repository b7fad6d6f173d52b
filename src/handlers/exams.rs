// src/handlers/exams.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::{ExamView, GenerateExamRequest},
        exam_record::SubmitExamRequest,
        pagination::{Page, PageParams, Paginated},
    },
    services::{AttemptService, ExamGenerator},
    store::UserDirectory,
    utils::jwt::Claims,
};

/// Generates and publishes an exam from a random sample of the pool (staff only).
pub async fn generate_exam(
    State(generator): State<ExamGenerator>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let exam = generator.generate(payload, claims.user_id()?).await?;
    Ok((StatusCode::CREATED, Json(ExamView::new(exam, true, None))))
}

/// Lists exams newest first, without their questions.
pub async fn list_exams(
    State(generator): State<ExamGenerator>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::from(params);
    let (items, total) = generator.list_exams(page).await?;
    Ok(Json(Paginated::new(items, total, page)))
}

/// Exam detail. Answers and analysis are only shown to staff.
pub async fn get_exam(
    State(generator): State<ExamGenerator>,
    State(users): State<Arc<dyn UserDirectory>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = generator.get_exam(id).await?;
    let creator = users.get_user(exam.created_by).await?.map(|u| u.username);
    Ok(Json(ExamView::new(exam, claims.is_staff(), creator)))
}

/// Opens the caller's single attempt at an exam.
pub async fn start_exam(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = attempts.start(exam_id, claims.user_id()?).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Grades the caller's ongoing attempt.
pub async fn submit_exam(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let record = attempts.record(req.record_id).await?;
    if record.user_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "This exam record belongs to another user".to_string(),
        ));
    }

    let graded = attempts.submit(req.record_id, &req.answers).await?;
    Ok(Json(graded))
}
