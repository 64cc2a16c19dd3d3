use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::services::directory_service::{self, CreateCategoryInput};

pub async fn list_categories(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match directory_service::list_categories(&db).await {
        Ok(categories) => Json(json!({
            "total": categories.len(),
            "categories": categories,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_category(
    State(db): State<DatabaseConnection>,
    Json(input): Json<CreateCategoryInput>,
) -> impl IntoResponse {
    match directory_service::create_category(&db, input).await {
        Ok(category) => {
            (StatusCode::CREATED, Json(json!({ "category": category }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_category(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match directory_service::get_category(&db, id).await {
        Ok(category) => Json(json!({ "category": category })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_category(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match directory_service::delete_category(&db, id).await {
        Ok(()) => Json(json!({ "message": "Category deleted" })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_sub_category(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(input): Json<CreateCategoryInput>,
) -> impl IntoResponse {
    match directory_service::create_sub_category(&db, id, input).await {
        Ok(sub_category) => (
            StatusCode::CREATED,
            Json(json!({ "sub_category": sub_category })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
