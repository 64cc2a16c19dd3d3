use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::services::directory_service::{self, CreateParkInput};

pub async fn list_parks(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match directory_service::list_parks(&db).await {
        Ok(parks) => Json(json!({
            "total": parks.len(),
            "parks": parks,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_park(
    State(db): State<DatabaseConnection>,
    Json(input): Json<CreateParkInput>,
) -> impl IntoResponse {
    match directory_service::create_park(&db, input).await {
        Ok(park) => (StatusCode::CREATED, Json(json!({ "park": park }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_park(State(db): State<DatabaseConnection>, Path(id): Path<i32>) -> impl IntoResponse {
    match directory_service::get_park(&db, id).await {
        Ok(park) => Json(json!({ "park": park })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_park(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match directory_service::delete_park(&db, id).await {
        Ok(()) => Json(json!({ "message": "Park deleted" })).into_response(),
        Err(e) => e.into_response(),
    }
}
