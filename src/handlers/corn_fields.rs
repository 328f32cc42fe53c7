use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{error, warn};

use crate::AppState;
use crate::auth::Claims;
use crate::models::corn_fields::{
    CornFieldEntry, CornFieldListResponse, CornFieldResponse, MessageResponse,
    RegisterCornFieldRequest, UpdateCornFieldRequest,
};
use crate::models::error::ApiError;
use crate::services::corn_fields;

/// POST /api/corn-fields/register
pub async fn register_corn_field(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<RegisterCornFieldRequest>,
) -> Result<(StatusCode, Json<CornFieldResponse>), ApiError> {
    let (owner, field) = request.validate().map_err(ApiError::BadRequest)?;

    if owner != claims.user_id {
        warn!(caller = %claims.user_id, owner = %owner, "Rejected corn field registration for another user");
        return Err(ApiError::Forbidden(
            "You can only register corn fields for your own account".to_string(),
        ));
    }

    let model = corn_fields::register(&state.db, &owner, field)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to register corn field");
            ApiError::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CornFieldResponse {
            success: true,
            message: Some("Corn field registered successfully".to_string()),
            data: CornFieldEntry::from(model),
        }),
    ))
}

/// GET /api/corn-fields/user/{user_id}
pub async fn list_user_corn_fields(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<Json<CornFieldListResponse>, ApiError> {
    if user_id != claims.user_id {
        return Err(ApiError::Forbidden(
            "You can only view your own corn fields".to_string(),
        ));
    }

    let rows = corn_fields::list_for_user(&state.db, &user_id).await?;
    let data: Vec<CornFieldEntry> = rows.into_iter().map(CornFieldEntry::from).collect();

    Ok(Json(CornFieldListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// GET /api/corn-fields/{id}
pub async fn get_corn_field(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<CornFieldResponse>, ApiError> {
    let model = corn_fields::get_owned(&state.db, id, &claims.user_id).await?;

    Ok(Json(CornFieldResponse {
        success: true,
        message: None,
        data: CornFieldEntry::from(model),
    }))
}

/// PUT /api/corn-fields/{id}
pub async fn update_corn_field(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateCornFieldRequest>,
) -> Result<Json<CornFieldResponse>, ApiError> {
    let changes = request.into_changes().map_err(ApiError::BadRequest)?;
    let model = corn_fields::update(&state.db, id, &claims.user_id, changes).await?;

    Ok(Json(CornFieldResponse {
        success: true,
        message: Some("Corn field updated successfully".to_string()),
        data: CornFieldEntry::from(model),
    }))
}

/// DELETE /api/corn-fields/{id}
pub async fn delete_corn_field(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    corn_fields::delete(&state.db, id, &claims.user_id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Corn field deleted successfully".to_string(),
    }))
}
