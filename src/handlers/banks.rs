// src/handlers/banks.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        pagination::{Page, Paginated},
        question::CreateBankRequest,
    },
    services::QuestionRepository,
    utils::jwt::Claims,
};

/// Query parameters for listing banks.
#[derive(Debug, Deserialize)]
pub struct ListBanksParams {
    #[serde(default)]
    pub subject: String,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn create_bank(
    State(questions): State<QuestionRepository>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBankRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let bank = questions.create_bank(payload, claims.user_id()?).await?;
    Ok((StatusCode::CREATED, Json(bank)))
}

/// Lists banks, newest first, optionally filtered by subject.
pub async fn list_banks(
    State(questions): State<QuestionRepository>,
    Query(params): Query<ListBanksParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::clamped(params.page, params.page_size);
    let (items, total) = questions.list_banks(&params.subject, page).await?;
    Ok(Json(Paginated::new(items, total, page)))
}

pub async fn get_bank(
    State(questions): State<QuestionRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.get_bank(id).await?))
}
