//! Live engine activity tracking on media requests.
//!
//! A client fetching anything under a live engine's folder counts as
//! listening: the engine's activity clock is touched so the idle shutdown
//! keeps its distance while playback continues.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use rb_core::folder;

use crate::context::AppContext;

pub async fn track_live_requests(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(name) = folder::live_folder_in_path(request.uri().path()) {
        if let Some(engine) = ctx.engines.get_by_folder(name).await {
            engine.touch();
        }
    }

    next.run(request).await
}
