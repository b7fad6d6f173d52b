// src/handlers/questions.rs

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
        pagination::{Page, PageParams, Paginated},
        question::CreateQuestionRequest,
    },
    services::QuestionRepository,
    utils::jwt::Claims,
};

pub async fn create_question(
    State(questions): State<QuestionRepository>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let question = questions.create_question(payload, claims.user_id()?).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn list_by_bank(
    State(questions): State<QuestionRepository>,
    Path(bank_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::from(params);
    let (items, total) = questions.list_questions_by_bank(bank_id, page).await?;
    Ok(Json(Paginated::new(items, total, page)))
}

pub async fn get_question(
    State(questions): State<QuestionRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.get_question(id).await?))
}
