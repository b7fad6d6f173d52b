// src/handlers/records.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::pagination::{Page, PageParams, Paginated},
    services::{AttemptService, StatsAggregator},
    utils::jwt::Claims,
};

/// The caller's attempts, newest first.
pub async fn list_records(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::from(params);
    let (items, total) = attempts.list_records(claims.user_id()?, page).await?;
    Ok(Json(Paginated::new(items, total, page)))
}

pub async fn get_stats(
    State(stats): State<StatsAggregator>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(stats.stats(claims.user_id()?).await?))
}

/// One attempt with its graded answers. Visible to its owner and to staff.
pub async fn get_record(
    State(attempts): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = attempts.record(id).await?;
    if record.user_id != claims.user_id()? && !claims.is_staff() {
        return Err(AppError::Forbidden(
            "This exam record belongs to another user".to_string(),
        ));
    }
    Ok(Json(record))
}
