//! Binding routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rb_core::Error;
use rb_db::queries::{bindings, stations};
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct PutBindingRequest {
    pub station_user: String,
    pub station_id: String,
}

/// `PUT /users/@me/bindings/{binding}` -- point a binding slot at one of
/// the caller's own stations. Re-binding a slot replaces it.
pub async fn put_binding(
    State(ctx): State<AppContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(binding_id): Path<String>,
    Json(payload): Json<PutBindingRequest>,
) -> Result<StatusCode, AppError> {
    if payload.station_user != user.id {
        return Err(
            Error::Forbidden("station must belong to the requesting user".into()).into(),
        );
    }

    let conn = rb_db::pool::get_conn(&ctx.db)?;

    stations::get_station(&conn, &payload.station_user, &payload.station_id)?
        .ok_or_else(|| Error::not_found("station", &payload.station_id))?;

    bindings::upsert_binding(
        &conn,
        &user.id,
        &binding_id,
        &payload.station_user,
        &payload.station_id,
    )?;

    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /users/@me/bindings/{binding}`.
pub async fn delete_binding(
    State(ctx): State<AppContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(binding_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let conn = rb_db::pool::get_conn(&ctx.db)?;

    bindings::get_binding(&conn, &user.id, &binding_id)?
        .ok_or_else(|| Error::not_found("binding", &binding_id))?;

    bindings::delete_binding(&conn, &user.id, &binding_id)?;

    Ok(StatusCode::NO_CONTENT)
}
