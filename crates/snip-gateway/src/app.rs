use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    delete_url_handler, health_handler, redirect_handler, shorten_handler, stats_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/url",
                Router::new()
                    .route("/shorten", post(shorten_handler))
                    .route("/{code}", delete(delete_url_handler)),
            )
            .route("/r/{code}", get(redirect_handler))
            .route("/stats/{code}", get(stats_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
