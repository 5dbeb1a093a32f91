use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all Ticket Desk endpoints.
pub fn build_router(state: AppState, max_body_bytes: u64) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);
    let body_limit = usize::try_from(max_body_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route(
            "/api/tickets",
            get(handler::list_tickets)
                .post(handler::create_ticket)
                .put(handler::update_ticket)
                .delete(handler::delete_ticket),
        )
        .route(
            "/api/comments",
            get(handler::list_comments).post(handler::create_comment),
        )
        .route(
            "/api/attachments",
            get(handler::list_attachments)
                .post(handler::upload_attachment)
                .delete(handler::delete_attachment),
        )
        .route("/api/download", get(handler::download))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
