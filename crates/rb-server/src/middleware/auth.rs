//! HTTP Basic authentication against the users table.
//!
//! Clients are devices, not people: credentials are the opaque
//! `id:secret` pair minted at account creation. Successful auth inserts
//! [`CurrentUser`] into request extensions for handlers to consume.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rb_core::Error;
use rb_db::models::User;
use rb_db::queries::users;

use crate::context::AppContext;
use crate::error::AppError;

/// The authenticated caller, available as a request extension behind the
/// auth middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Parse `Authorization: Basic <base64 id:secret>` into its parts.
fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, payload) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = BASE64.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

/// Axum middleware enforcing basic auth on everything behind it.
pub async fn require_auth(
    State(ctx): State<AppContext>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("invalid authorization header".into()))?;

    let (id, secret) = parse_basic(header)
        .ok_or_else(|| Error::Unauthorized("invalid authorization header".into()))?;

    // The connection goes back to the pool before the handler runs.
    let user = {
        let conn = rb_db::pool::get_conn(&ctx.db)?;
        users::authenticate(&conn, &id, &secret)?
    }
    .ok_or_else(|| Error::Unauthorized("invalid credentials".into()))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
