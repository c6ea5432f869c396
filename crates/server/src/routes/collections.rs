use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    Extension, Json,
};
use serde_json::Value;
use tracing::info;

use common::types::ApiMessage;
use service::storage::CollectionName;

use crate::errors::JsonApiError;
use crate::routes::admin::AuthContext;
use crate::state::ServerState;

async fn read_document(state: &ServerState, name: &CollectionName) -> Result<Json<Value>, JsonApiError> {
    Ok(Json(state.documents.get(name).await?))
}

async fn write_document(
    state: &ServerState,
    name: &CollectionName,
    auth: Option<Extension<AuthContext>>,
    body: Result<Json<Value>, JsonRejection>,
    message: String,
) -> Result<Json<ApiMessage>, JsonApiError> {
    let Json(value) = body?;
    state.documents.put(name, &value).await?;
    let by = auth.map(|Extension(ctx)| ctx.user).unwrap_or_else(|| "anonymous".into());
    info!(collection = %name, %by, "document replaced");
    Ok(Json(ApiMessage::ok(message)))
}

fn fixed(name: &str) -> Result<CollectionName, JsonApiError> {
    Ok(CollectionName::parse(name)?)
}

/// `GET /collections/:name` → stored JSON, or `[]` when never written.
pub async fn get_collection(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, JsonApiError> {
    let name = CollectionName::parse(&name)?;
    read_document(&state, &name).await
}

/// `POST /collections/:name` → replace the whole stored value.
pub async fn put_collection(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    auth: Option<Extension<AuthContext>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiMessage>, JsonApiError> {
    let name = CollectionName::parse(&name)?;
    let message = format!("Collection '{name}' updated.");
    write_document(&state, &name, auth, body, message).await
}

pub async fn legacy_get_military(State(state): State<ServerState>) -> Result<Json<Value>, JsonApiError> {
    read_document(&state, &fixed(CollectionName::MILITARY_RESULTS)?).await
}

pub async fn legacy_save_military(
    State(state): State<ServerState>,
    auth: Option<Extension<AuthContext>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiMessage>, JsonApiError> {
    let name = fixed(CollectionName::MILITARY_RESULTS)?;
    write_document(&state, &name, auth, body, "Military results source updated.".into()).await
}

pub async fn legacy_upload_published(
    State(state): State<ServerState>,
    auth: Option<Extension<AuthContext>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiMessage>, JsonApiError> {
    let name = fixed(CollectionName::PUBLISHED_RESULTS)?;
    write_document(&state, &name, auth, body, "Published results updated.".into()).await
}

/// `GET /data/:name.json` as a static-looking file: 404 when never written.
pub async fn public_document(
    State(state): State<ServerState>,
    Path(file): Path<String>,
) -> Result<([(header::HeaderName, &'static str); 1], Json<Value>), JsonApiError> {
    let not_found = || JsonApiError::new(StatusCode::NOT_FOUND, "Not found");
    let name = file
        .strip_suffix(".json")
        .and_then(|stem| CollectionName::parse(stem).ok())
        .ok_or_else(not_found)?;
    match state.documents.read(&name).await? {
        Some(value) => Ok(([(header::CACHE_CONTROL, "no-store")], Json(value))),
        None => Err(not_found()),
    }
}
