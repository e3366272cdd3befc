use axum::{
    routing::{get, post},
    Router,
};

use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(handlers::create_user))
        .route("/api/users/{user_id}", get(handlers::get_user))
        .route(
            "/api/expenses",
            get(handlers::list_expenses).post(handlers::add_expense),
        )
        .route("/api/expenses/stats", get(handlers::get_stats))
        .route("/api/alerts/run", post(handlers::run_alerts))
}
