//! User account routes.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use rb_core::{folder, Error};
use rb_db::models::{Binding, Station};
use rb_db::queries::{bindings, stations};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;

/// `POST /users` -- mint a new account. The only unauthenticated endpoint
/// besides health and media; the returned secret is shown exactly once.
pub async fn create_user(State(ctx): State<AppContext>) -> Result<Json<Value>, AppError> {
    let id = folder::random_hex_id();
    let secret = folder::random_hex_id();

    let conn = rb_db::pool::get_conn(&ctx.db)?;
    let user = rb_db::queries::users::create_user(&conn, &id, &secret)?;

    Ok(Json(json!({ "id": user.id, "secret": user.secret })))
}

fn stations_by_id(stations: Vec<Station>) -> HashMap<String, Station> {
    stations.into_iter().map(|s| (s.id.clone(), s)).collect()
}

fn bindings_by_id(bindings: Vec<Binding>) -> HashMap<String, Binding> {
    bindings.into_iter().map(|b| (b.id.clone(), b)).collect()
}

/// `GET /users/{user}` -- the caller's own stations and bindings, or the
/// bindings of their party leader.
pub async fn get_user(
    State(ctx): State<AppContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let target = if user_id == "@me" { &user.id } else { &user_id };

    if *target == user.id {
        let conn = rb_db::pool::get_conn(&ctx.db)?;
        let stations = stations::list_stations(&conn, &user.id)?;
        let bindings = bindings::list_bindings(&conn, &user.id)?;

        return Ok(Json(json!({
            "stations": stations_by_id(stations),
            "bindings": bindings_by_id(bindings),
        })));
    }

    // A follower may read their party leader's bindings.
    if ctx.parties.leader_of(&user.id).as_deref() == Some(target.as_str()) {
        let conn = rb_db::pool::get_conn(&ctx.db)?;
        let bindings = bindings::list_bindings(&conn, target)?;

        return Ok(Json(json!({
            "bindings": bindings_by_id(bindings),
        })));
    }

    Err(Error::Forbidden("you do not have permission to get this user".into()).into())
}
