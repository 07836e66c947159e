// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{export, question_bank, subject_detail},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (question bank, subject details, export).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let question_bank_routes = Router::new()
        .route("/add-all", post(question_bank::add_question))
        .route("/add-all/file", post(question_bank::add_question_with_file))
        .route("/{id}", delete(question_bank::delete_question))
        .route("/export", post(export::export_questions));

    let subject_detail_routes = Router::new().route(
        "/{subject}",
        put(subject_detail::upsert_subject_tree).get(subject_detail::get_subject_tree),
    );

    Router::new()
        .route("/ping", get(ping))
        .nest("/api/question-bank", question_bank_routes)
        .nest("/api/subject-details", subject_detail_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}
