//! API router.
//!
//! Returns a composable `Router` with all endpoints nested under `/api`.
//! Authentication is handled by the deployment in front of this service;
//! the router itself only carries a permissive CORS layer for the local
//! review UI.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router.
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/articles", post(endpoints::articles::create))
        .route("/articles/:id", get(endpoints::articles::get))
        .route(
            "/articles/:id/extract",
            post(endpoints::extractions::trigger),
        )
        .route(
            "/articles/:id/extractions",
            get(endpoints::extractions::list_for_article),
        )
        .route(
            "/extractions/:id",
            get(endpoints::extractions::get).put(endpoints::extractions::update),
        )
        .route(
            "/extractions/:id/corrections",
            get(endpoints::corrections::list).post(endpoints::corrections::submit),
        )
        .route(
            "/extractions/:id/review-status",
            put(endpoints::review::set),
        )
        .route(
            "/extractions/:id/review-status/cycle",
            post(endpoints::review::cycle),
        )
        .route(
            "/extractions/:id/review-progress",
            get(endpoints::review::progress),
        )
        .route("/extractions/:id/grade", get(endpoints::grade::list))
        .route(
            "/grade-assessments/:id",
            put(endpoints::grade::override_domain),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(CorsLayer::permissive())
}
