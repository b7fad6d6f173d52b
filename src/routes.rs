// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, banks, exams, questions, records},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Assembles the main application router.
///
/// * `/api/auth` is public; everything else under `/api` needs a bearer token.
/// * Banks, questions and exam generation additionally need a staff role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new().route("/me", get(auth::me));

    let bank_routes = Router::new()
        .route("/", post(banks::create_bank).get(banks::list_banks))
        .route("/{id}", get(banks::get_bank));

    let question_routes = Router::new()
        .route("/", post(questions::create_question))
        .route("/bank/{bank_id}", get(questions::list_by_bank))
        .route("/{id}", get(questions::get_question));

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams))
        .route("/{id}", get(exams::get_exam))
        .route("/{id}/start", post(exams::start_exam))
        .route("/submit", post(exams::submit_exam))
        .merge(
            Router::new()
                .route("/generate", post(exams::generate_exam))
                .layer(middleware::from_fn(staff_middleware)),
        );

    let record_routes = Router::new()
        .route("/", get(records::list_records))
        .route("/stats", get(records::get_stats))
        .route("/{id}", get(records::get_record));

    let staff_routes = Router::new()
        .nest("/banks", bank_routes)
        .nest("/questions", question_routes)
        .layer(middleware::from_fn(staff_middleware));

    // Auth runs before the staff check on every protected route.
    let protected = Router::new()
        .nest("/user", user_routes)
        .nest("/exams", exam_routes)
        .nest("/records", record_routes)
        .merge(staff_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
