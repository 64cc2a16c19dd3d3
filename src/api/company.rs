use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::services::directory_service::{self, CreateCompanyInput};

pub async fn list_companies(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match directory_service::list_companies(&db).await {
        Ok(companies) => Json(json!({
            "total": companies.len(),
            "companies": companies,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_company(
    State(db): State<DatabaseConnection>,
    Json(input): Json<CreateCompanyInput>,
) -> impl IntoResponse {
    match directory_service::create_company(&db, input).await {
        Ok(company) => (StatusCode::CREATED, Json(json!({ "company": company }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_company(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match directory_service::get_company(&db, id).await {
        Ok(company) => Json(json!({ "company": company })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_company(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match directory_service::delete_company(&db, id).await {
        Ok(()) => Json(json!({ "message": "Company deleted" })).into_response(),
        Err(e) => e.into_response(),
    }
}
