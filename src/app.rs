use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/register", get(handlers::register_page).post(handlers::register))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard).post(handlers::submit_mood))
        .route("/feedback", post(handlers::submit_feedback))
        .route("/admin", get(handlers::admin))
        .route("/api/summary", get(handlers::get_summary))
        .with_state(state)
}
