use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::services::directory_service::{self, CreatePersonInput};

pub async fn list_persons(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match directory_service::list_persons(&db).await {
        Ok(persons) => Json(json!({
            "total": persons.len(),
            "persons": persons,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_person(
    State(db): State<DatabaseConnection>,
    Json(input): Json<CreatePersonInput>,
) -> impl IntoResponse {
    match directory_service::create_person(&db, input).await {
        Ok(person) => (StatusCode::CREATED, Json(json!({ "person": person }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_person(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match directory_service::get_person(&db, id).await {
        Ok(person) => Json(json!({ "person": person })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_person(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match directory_service::delete_person(&db, id).await {
        Ok(()) => Json(json!({ "message": "Person deleted" })).into_response(),
        Err(e) => e.into_response(),
    }
}
