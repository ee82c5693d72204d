// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{history, learning_path, quiz},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Quiz issuance and grading.
/// * History, learning path and latest result reads.
/// * Global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/quiz", post(quiz::generate_quiz))
        .route("/quiz/grade", post(quiz::grade_quiz))
        .route("/history", get(history::get_history))
        .route("/learning-path/{user_id}", get(learning_path::get_learning_path))
        .route(
            "/placement/result/{user_id}",
            get(learning_path::get_placement_result),
        );

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
