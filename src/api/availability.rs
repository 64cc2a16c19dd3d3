use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::infrastructure::AppState;
use crate::services::availability_service::{self, AvailabilityQuery};

/// How much of each requested material is free over a period
#[utoipa::path(
    post,
    path = "/api/availability",
    responses(
        (status = 200, description = "Availability of every requested material"),
        (status = 400, description = "Invalid period, quantity or unit pick")
    )
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Json(query): Json<AvailabilityQuery>,
) -> impl IntoResponse {
    match availability_service::check_availability(state.db(), query).await {
        Ok(report) => Json(json!({ "materials": report })).into_response(),
        Err(e) => e.into_response(),
    }
}
