use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    response::{ApiJson, ApiResponse, Page, SearchRequest},
    roles::{
        dto::{AddRoleRequest, RoleDto, RoleFilter, UpdateRoleRequest},
        repo,
    },
    state::AppState,
    types::{IdRequest, RoleStatus},
};

// Role mutation is open to any authenticated user; the permission data is
// never enforced here (see DESIGN.md).
pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/addRole", post(add_role))
        .route("/updateRole", post(update_role))
        .route("/searchRole", post(search_role))
        .route("/deleteRole", post(delete_role))
        .route("/role/health", get(health))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "role-service" }))
}

#[instrument(skip(state, payload))]
pub async fn add_role(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(payload): ApiJson<AddRoleRequest>,
) -> Result<ApiResponse<RoleDto>, ApiError> {
    let role_name = payload
        .role_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Role name is required".into()))?;

    let role = repo::create(
        &state.db,
        role_name.trim(),
        payload.allowed_end_points,
        payload.permission,
        payload.status.unwrap_or(RoleStatus::Active),
    )
    .await?;

    info!(role_id = %role.id, "role created");
    Ok(ApiResponse::created("Role created successfully", role.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(payload): ApiJson<UpdateRoleRequest>,
) -> Result<ApiResponse<RoleDto>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Role ID is required".into()))?;

    let mut role = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Role not found".into()))?;

    if let Some(role_name) = payload.role_name {
        if role_name.trim().is_empty() {
            return Err(ApiError::Validation("Role name is required".into()));
        }
        role.role_name = role_name.trim().to_string();
    }
    if let Some(endpoints) = payload.allowed_end_points {
        role.allowed_end_points = endpoints;
    }
    if let Some(permission) = payload.permission {
        role.permission = sqlx::types::Json(permission);
    }
    if let Some(status) = payload.status {
        role.status = status;
    }

    let role = repo::update(&state.db, &role).await?;

    info!(role_id = %role.id, "role updated");
    Ok(ApiResponse {
        success: true,
        status_code: 200,
        message: Some("Role updated successfully".into()),
        data: Some(role.into()),
    })
}

#[instrument(skip(state, body))]
pub async fn search_role(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(body): ApiJson<SearchRequest<RoleFilter>>,
) -> Result<ApiResponse<Page<RoleDto>>, ApiError> {
    let filter = body.search.unwrap_or_default();
    let (roles, total) = repo::search(&state.db, &filter, &body.params).await?;
    let docs = roles.into_iter().map(RoleDto::from).collect();
    Ok(ApiResponse::ok(Page::new(docs, total, &body.params)))
}

#[instrument(skip(state))]
pub async fn delete_role(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(payload): ApiJson<IdRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Role ID is required".into()))?;

    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Role not found".into()));
    }

    info!(role_id = %id, "role deleted");
    Ok(ApiResponse::message("Role deleted successfully"))
}
