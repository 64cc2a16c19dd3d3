//! Event API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::domain::reconciliation::ReturnedLine;
use crate::infrastructure::AppState;
use crate::services::availability_service;
use crate::services::event_service::{self, DuplicateEventInput, EventFilter, EventInput};
use crate::services::return_service;

#[utoipa::path(
    get,
    path = "/api/events",
    params(
        ("start" = Option<String>, Query, description = "First day of the period (YYYY-MM-DD)"),
        ("end" = Option<String>, Query, description = "Last day of the period (YYYY-MM-DD)"),
        ("deleted" = Option<bool>, Query, description = "List trashed events instead")
    ),
    responses(
        (status = 200, description = "Events ordered by start date")
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> impl IntoResponse {
    match event_service::list_events(state.db(), filter).await {
        Ok(events) => Json(json!({
            "total": events.len(),
            "events": events,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/events",
    responses(
        (status = 201, description = "Event created"),
        (status = 400, description = "Invalid event"),
        (status = 409, description = "Not enough material over the period")
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(input): Json<EventInput>,
) -> impl IntoResponse {
    match event_service::create_event(state.db(), input, state.billing()).await {
        Ok(event) => (StatusCode::CREATED, Json(json!({ "event": event }))).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = i32, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event with lines, people, totals and shortages"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match event_service::get_event(state.db(), id, state.billing()).await {
        Ok(event) => Json(json!({ "event": event })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/events/{id}",
    params(("id" = i32, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event updated"),
        (status = 400, description = "Invalid event"),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Not enough material over the period")
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<EventInput>,
) -> impl IntoResponse {
    match event_service::update_event(state.db(), id, input, state.billing()).await {
        Ok(event) => Json(json!({ "event": event })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/duplicate",
    params(("id" = i32, Path, description = "Event to copy")),
    responses(
        (status = 201, description = "Copy created on the new period"),
        (status = 400, description = "Invalid period"),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Not enough material over the new period")
    )
)]
pub async fn duplicate_event(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<DuplicateEventInput>,
) -> impl IntoResponse {
    match event_service::duplicate_event(state.db(), id, input, state.billing()).await {
        Ok(event) => (StatusCode::CREATED, Json(json!({ "event": event }))).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(("id" = i32, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event trashed, or destroyed when already trashed"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match event_service::delete_event(state.db(), id).await {
        Ok(outcome) => Json(json!({ "id": id, "outcome": outcome })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn restore_event(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match event_service::restore_event(state.db(), id, state.billing()).await {
        Ok(event) => Json(json!({ "event": event })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn purge_events(State(state): State<AppState>) -> impl IntoResponse {
    match event_service::purge_events(state.db()).await {
        Ok(count) => Json(json!({ "purged": count })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/missing-materials",
    params(("id" = i32, Path, description = "Event id")),
    responses(
        (status = 200, description = "Lines other events leave short"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn missing_materials(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match availability_service::event_missing_materials(state.db(), id).await {
        Ok(missing) => Json(json!({ "missing_materials": missing })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/events/{id}/return",
    params(("id" = i32, Path, description = "Event id")),
    responses(
        (status = 200, description = "Return recorded"),
        (status = 400, description = "Invalid return figures, nothing was written"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn record_return(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(lines): Json<Vec<ReturnedLine>>,
) -> impl IntoResponse {
    match return_service::reconcile_return(state.db(), id, lines).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}
