//! Axum router construction.

use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::{auth, media_touch};
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Account creation is the only unauthenticated API route.
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/users", post(routes::users::create_user));

    let protected = Router::new()
        .route("/users/{user}", get(routes::users::get_user))
        .route(
            "/users/{user}/stations/{station}",
            get(routes::stations::get_station_manifest),
        )
        .route(
            "/users/@me/stations/{station}",
            put(routes::stations::put_station).delete(routes::stations::delete_station),
        )
        .route(
            "/users/@me/stations/{station}/queue",
            put(routes::stations::enqueue),
        )
        .route(
            "/users/@me/bindings/{binding}",
            put(routes::bindings::put_binding).delete(routes::bindings::delete_binding),
        )
        .route("/users/@me/party", post(routes::party::set_party))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service("/media", ServeDir::new(ctx.media_root()))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            media_touch::track_live_requests,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
