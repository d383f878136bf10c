//! Station routes: manifest reads, creation, deletion, and queueing.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use rb_core::Error;
use rb_db::models::{StationKey, StationKind};
use rb_db::queries::{bindings, stations};
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::manifest::{self, API_ROOT_HEADER};
use crate::middleware::auth::CurrentUser;
use crate::source;

#[derive(Debug, Deserialize)]
pub struct PutStationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub source: String,
}

/// `GET /users/{user}/stations/{station}` -- the station's current
/// manifest envelope. Readable by the owner and by party followers of
/// the owner.
pub async fn get_station_manifest(
    State(ctx): State<AppContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((user_id, station_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let target = if user_id == "@me" { user.id.clone() } else { user_id };

    if target != user.id && ctx.parties.leader_of(&user.id).as_deref() != Some(target.as_str()) {
        return Err(
            Error::Forbidden("you do not have permission to get this station".into()).into(),
        );
    }

    let api_root = headers
        .get(API_ROOT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Validation("invalid api root".into()))?
        .to_string();

    let station = {
        let conn = rb_db::pool::get_conn(&ctx.db)?;
        stations::get_station(&conn, &target, &station_id)?
            .ok_or_else(|| Error::not_found("station", &station_id))?
    };

    let bytes = manifest::station_manifest(&ctx, &station, &api_root).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

/// `PUT /users/@me/stations/{station}` -- create a station, or repoint an
/// existing static station at a new source.
pub async fn put_station(
    State(ctx): State<AppContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(station_id): Path<String>,
    Json(payload): Json<PutStationRequest>,
) -> Result<StatusCode, AppError> {
    let kind: StationKind = payload
        .kind
        .parse()
        .map_err(|_| Error::Validation("invalid station type".into()))?;

    let existing = {
        let conn = rb_db::pool::get_conn(&ctx.db)?;
        stations::get_station(&conn, &user.id, &station_id)?
    };

    if let Some(existing) = existing {
        // The one permitted update: retargeting a static station.
        if kind == StationKind::Static && existing.kind == StationKind::Static {
            let folder = source::resolve_single(&ctx, &payload.source).await?;
            let conn = rb_db::pool::get_conn(&ctx.db)?;
            stations::set_station_source(&conn, &user.id, &station_id, &folder)?;
            return Ok(StatusCode::NO_CONTENT);
        }

        return Err(Error::Conflict("station already exists".into()).into());
    }

    let source_folder = match kind {
        StationKind::Static => Some(source::resolve_single(&ctx, &payload.source).await?),
        StationKind::Stream => None,
    };

    let conn = rb_db::pool::get_conn(&ctx.db)?;
    stations::create_station(&conn, &user.id, &station_id, kind, source_folder.as_deref())?;

    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /users/@me/stations/{station}` -- delete a station, its
/// bindings, and (for stream stations) its live engine.
pub async fn delete_station(
    State(ctx): State<AppContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(station_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let station = {
        let conn = rb_db::pool::get_conn(&ctx.db)?;
        let station = stations::get_station(&conn, &user.id, &station_id)?
            .ok_or_else(|| Error::not_found("station", &station_id))?;

        stations::delete_station(&conn, &user.id, &station_id)?;
        bindings::delete_bindings_for_station(&conn, &user.id, &station_id)?;
        station
    };

    if station.kind == StationKind::Stream {
        let key = StationKey::new(user.id, station_id);
        if let Some(engine) = ctx.engines.get(&key).await {
            engine.shutdown();
            ctx.engines.remove(&engine).await;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /users/@me/stations/{station}/queue` -- resolve a source and
/// append its folders to the station's live queue.
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(station_id): Path<String>,
    Json(payload): Json<EnqueueRequest>,
) -> Result<StatusCode, AppError> {
    let station = {
        let conn = rb_db::pool::get_conn(&ctx.db)?;
        stations::get_station(&conn, &user.id, &station_id)?
            .ok_or_else(|| Error::not_found("station", &station_id))?
    };

    if station.kind != StationKind::Stream {
        return Err(Error::Validation("station type must be stream".into()).into());
    }

    let folders = source::resolve(&ctx, &payload.source).await?;

    let engine = ctx
        .engines
        .get_or_create(&StationKey::new(user.id, station_id))
        .await?;
    for folder in folders {
        engine.enqueue(folder);
    }

    Ok(StatusCode::NO_CONTENT)
}
