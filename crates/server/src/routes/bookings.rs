use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use service::bookings::BookingStats;
use service::errors::ServiceError;
use service::storage::collection_store::Record;

use crate::errors::JsonApiError;
use crate::state::ServerState;

/// Newest first.
pub async fn list_bookings(State(state): State<ServerState>) -> Result<Json<Vec<Record>>, JsonApiError> {
    Ok(Json(state.bookings.get_all().await?))
}

pub async fn add_booking(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), JsonApiError> {
    let Json(value) = body?;
    let Value::Object(fields) = value else {
        return Err(JsonApiError::new(StatusCode::BAD_REQUEST, "booking must be a JSON object"));
    };
    let saved = state.bookings.add(fields).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn delete_booking(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, JsonApiError> {
    if state.bookings.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServiceError::not_found(&format!("booking '{id}'")).into())
    }
}

pub async fn booking_stats(State(state): State<ServerState>) -> Result<Json<BookingStats>, JsonApiError> {
    Ok(Json(state.bookings.get_stats().await?))
}
