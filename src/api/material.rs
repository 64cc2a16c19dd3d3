//! Material API handlers using repository pattern

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::domain::{
    CreateMaterialInput, CreateUnitInput, DomainError, MaterialFilter, UnitState,
    UpdateMaterialInput, UpdateUnitInput,
};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/materials",
    params(
        ("park_id" = Option<i32>, Query, description = "Only materials stored in this park"),
        ("category_id" = Option<i32>, Query, description = "Only materials of this category"),
        ("deleted" = Option<bool>, Query, description = "List trashed materials instead")
    ),
    responses(
        (status = 200, description = "Materials ordered by name")
    )
)]
pub async fn list_materials(
    State(state): State<AppState>,
    Query(filter): Query<MaterialFilter>,
) -> impl IntoResponse {
    match state.material_repo.find_all(filter).await {
        Ok(materials) => Json(json!({
            "total": materials.len(),
            "materials": materials,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/materials",
    responses(
        (status = 201, description = "Material created"),
        (status = 400, description = "Invalid material"),
        (status = 409, description = "Reference already used")
    )
)]
pub async fn create_material(
    State(state): State<AppState>,
    Json(input): Json<CreateMaterialInput>,
) -> impl IntoResponse {
    match state.material_repo.create(input).await {
        Ok(material) => {
            (StatusCode::CREATED, Json(json!({ "material": material }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/materials/{id}",
    params(("id" = i32, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material with its units"),
        (status = 404, description = "Material not found")
    )
)]
pub async fn get_material(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.material_repo.find_by_id(id).await {
        Ok(Some(material)) => Json(json!({ "material": material })).into_response(),
        Ok(None) => DomainError::not_found("material", id).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateMaterialInput>,
) -> impl IntoResponse {
    match state.material_repo.update(id, input).await {
        Ok(material) => Json(json!({ "material": material })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.material_repo.delete(id).await {
        Ok(outcome) => Json(json!({ "id": id, "outcome": outcome })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn restore_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.material_repo.restore(id).await {
        Ok(material) => Json(json!({ "material": material })).into_response(),
        Err(e) => e.into_response(),
    }
}

// Units

pub async fn add_unit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<CreateUnitInput>,
) -> impl IntoResponse {
    match state.material_repo.add_unit(id, input).await {
        Ok(unit) => (StatusCode::CREATED, Json(json!({ "unit": unit }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_unit(
    State(state): State<AppState>,
    Path((id, unit_id)): Path<(i32, i32)>,
    Json(input): Json<UpdateUnitInput>,
) -> impl IntoResponse {
    match state.material_repo.update_unit(id, unit_id, input).await {
        Ok(unit) => Json(json!({ "unit": unit })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn remove_unit(
    State(state): State<AppState>,
    Path((id, unit_id)): Path<(i32, i32)>,
) -> impl IntoResponse {
    match state.material_repo.remove_unit(id, unit_id).await {
        Ok(()) => Json(json!({ "message": "Unit removed" })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/unit-states",
    responses(
        (status = 200, description = "Unit states in display order")
    )
)]
pub async fn list_unit_states() -> impl IntoResponse {
    let states: Vec<_> = UnitState::ALL
        .iter()
        .map(|state| json!({ "id": state, "order": state.order() }))
        .collect();
    Json(json!({ "unit_states": states }))
}
