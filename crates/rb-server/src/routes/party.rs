//! Party membership route.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use rb_core::Error;
use serde_json::json;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::party::ClientParty;

/// `POST /users/@me/party` -- update the caller's party membership.
///
/// Always leaves the current party first. An empty `match` means "leave
/// only"; otherwise the descriptor is validated and the caller joins (or,
/// as leader, creates) the described party.
pub async fn set_party(
    State(ctx): State<AppContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ClientParty>,
) -> Result<Response, AppError> {
    ctx.parties.remove_user(&user.id);

    if payload.match_id.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    if !payload.is_valid() {
        return Err(Error::Validation("invalid party descriptor".into()).into());
    }

    let party = ctx.parties.create_or_join(&user.id, &payload)?;

    Ok(Json(json!({ "leader": party.leader() })).into_response())
}
