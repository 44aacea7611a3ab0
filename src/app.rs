use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/session", get(handlers::get_session))
        .route("/api/session/sign-in", post(handlers::sign_in))
        .route("/api/session/sign-out", post(handlers::sign_out))
        .route(
            "/api/subjects",
            get(handlers::list_subjects).post(handlers::add_subject),
        )
        .route("/api/subjects/:id/stats", get(handlers::subject_stats))
        .route("/api/subjects/:id/calendar", get(handlers::calendar))
        .route("/api/subjects/:id/attendance/:date", put(handlers::mark))
        .route("/api/subjects/:id/delete", post(handlers::request_delete))
        .route("/api/subjects/:id/reset", post(handlers::request_reset))
        .route("/api/confirmations/:token", post(handlers::confirm))
        .route("/api/preferences/theme", get(handlers::get_theme))
        .route("/api/preferences/theme/toggle", post(handlers::toggle_theme))
        .with_state(state)
}
