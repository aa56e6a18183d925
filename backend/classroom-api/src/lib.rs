use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        // Student endpoints (require a student JWT)
        .nest("/api/v1/quizzes", student_only(quizzes_routes(), &app_state))
        .nest(
            "/api/v1/students/me",
            student_only(students_routes(), &app_state),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Authenticates first, then requires the student role.
fn student_only(
    routes: Router<Arc<AppState>>,
    app_state: &Arc<AppState>,
) -> Router<Arc<AppState>> {
    routes
        .route_layer(middleware::from_fn(
            middlewares::auth::student_guard_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::auth_middleware,
        ))
}

fn quizzes_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/{id}/take",
        get(handlers::quizzes::get_current_question).post(handlers::quizzes::submit_answer),
    )
}

fn students_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quizzes", get(handlers::students::list_quizzes))
        .route("/taken-quizzes", get(handlers::students::list_taken_quizzes))
        .route(
            "/interests",
            get(handlers::students::get_interests).put(handlers::students::update_interests),
        )
}
