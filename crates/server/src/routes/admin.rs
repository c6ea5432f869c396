use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use common::types::ApiMessage;
use service::errors::ServiceError;

use crate::errors::JsonApiError;
use crate::state::ServerState;

/// Who the current request is acting as. Inserted into request extensions by
/// the key-checking middleware.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiKeyRecord {
    pub user: String,
    pub api_key: String,
}

// Listings never echo full keys back.
fn mask(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{tail}")
}

pub async fn list_api_keys(State(state): State<ServerState>) -> Json<Vec<ApiKeyRecord>> {
    let mut items = state
        .api_keys
        .list()
        .await
        .into_iter()
        .map(|(user, key)| ApiKeyRecord { user, api_key: mask(&key) })
        .collect::<Vec<_>>();
    items.sort_by(|a, b| a.user.cmp(&b.user));
    Json(items)
}

pub async fn set_api_key(
    State(state): State<ServerState>,
    body: Result<Json<ApiKeyRecord>, JsonRejection>,
) -> Result<Json<ApiMessage>, JsonApiError> {
    let Json(payload) = body?;
    let user = payload.user.clone();
    state.api_keys.set(payload.user, payload.api_key).await?;
    Ok(Json(ApiMessage::ok(format!("API key for '{user}' saved."))))
}

pub async fn delete_api_key(
    State(state): State<ServerState>,
    Path(user): Path<String>,
) -> Result<StatusCode, JsonApiError> {
    match state.api_keys.delete(&user).await? {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(ServiceError::not_found(&format!("API key for '{user}'")).into()),
    }
}

#[derive(Deserialize)]
struct KeyQuery {
    api_key: Option<String>,
}

/// Read the key from `X-API-Key`, falling back to the percent-decoded
/// `api_key` query parameter.
fn extract_api_key(req: &Request) -> Option<String> {
    let key_from_header = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let key = key_from_header.or_else(|| {
        Query::<KeyQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(q)| q.api_key)
    });

    key.filter(|k| !k.trim().is_empty())
}

async fn authorize(state: &ServerState, mut req: Request, next: Next) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    let Some(key) = extract_api_key(&req) else {
        warn!(%path, "missing api key");
        return Err(JsonApiError::unauthorized());
    };
    let Some(user) = state.api_keys.user_for_key(&key).await else {
        warn!(%path, "unknown api key");
        return Err(JsonApiError::unauthorized());
    };
    debug!(%path, %user, "api key accepted");
    req.extensions_mut().insert(AuthContext { user });
    Ok(next.run(req).await)
}

/// Middleware for mutating routes; a no-op when writes are configured open.
pub async fn require_write_key(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    if !state.require_api_key_for_writes {
        return Ok(next.run(req).await);
    }
    authorize(&state, req, next).await
}

/// Middleware for admin routes: always requires a known key.
pub async fn require_admin_key(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    authorize(&state, req, next).await
}
