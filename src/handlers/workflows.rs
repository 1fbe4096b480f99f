// src/handlers/workflows.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminCap, RequireCapability, ViewerCap},
    },
    models::{
        tenancy::TenantContext,
        workflow::{CreateWorkflowPayload, CreatedWorkflow, NextStages, UpdateWorkflowPayload, Workflow},
    },
};

#[utoipa::path(
    get,
    path = "/api/workflows",
    tag = "Workflows",
    responses(
        (status = 200, description = "Workflows ativos, mais antigos primeiro", body = Vec<Workflow>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_active_workflows(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<ViewerCap>,
) -> Result<impl IntoResponse, ApiError> {
    let workflows = app_state
        .workflow_service
        .get_active(tenant.organization_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(workflows))
}

#[utoipa::path(
    get,
    path = "/api/workflows/{workflow_id}",
    tag = "Workflows",
    responses(
        (status = 200, description = "Workflow com as etapas", body = Workflow),
        (status = 404, description = "Workflow não encontrado nesta organização")
    ),
    params(
        ("workflow_id" = Uuid, Path, description = "ID do Workflow")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<ViewerCap>,
    Path(workflow_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let workflow = app_state
        .workflow_service
        .get(tenant.organization_id, workflow_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(workflow))
}

#[utoipa::path(
    post,
    path = "/api/workflows",
    tag = "Workflows",
    request_body = CreateWorkflowPayload,
    responses(
        (status = 201, description = "Workflow criado", body = CreatedWorkflow),
        (status = 400, description = "Etapas inválidas (VALIDATION_ERROR)")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<AdminCap>,
    Json(payload): Json<CreateWorkflowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let id = app_state
        .workflow_service
        .create(&tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(CreatedWorkflow { id })))
}

#[utoipa::path(
    put,
    path = "/api/workflows/{workflow_id}",
    tag = "Workflows",
    request_body = UpdateWorkflowPayload,
    responses(
        (status = 200, description = "Workflow atualizado", body = Workflow),
        (status = 404, description = "Workflow não encontrado nesta organização")
    ),
    params(
        ("workflow_id" = Uuid, Path, description = "ID do Workflow")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<AdminCap>,
    Path(workflow_id): Path<Uuid>,
    Json(payload): Json<UpdateWorkflowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let workflow = app_state
        .workflow_service
        .update(&tenant, workflow_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(workflow))
}

#[utoipa::path(
    delete,
    path = "/api/workflows/{workflow_id}",
    tag = "Workflows",
    responses(
        (status = 204, description = "Workflow desativado"),
        (status = 409, description = "Ainda há itens em andamento")
    ),
    params(
        ("workflow_id" = Uuid, Path, description = "ID do Workflow")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<AdminCap>,
    Path(workflow_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .workflow_service
        .remove(&tenant, workflow_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/workflows/{workflow_id}/stages/{stage_id}/next",
    tag = "Workflows",
    responses(
        (status = 200, description = "Destinos permitidos a partir da etapa", body = NextStages)
    ),
    params(
        ("workflow_id" = Uuid, Path, description = "ID do Workflow"),
        ("stage_id" = String, Path, description = "ID da Etapa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_next_stages(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<ViewerCap>,
    Path((workflow_id, stage_id)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let stage_ids = app_state
        .workflow_service
        .next_stage_ids(tenant.organization_id, workflow_id, &stage_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(NextStages { stage_ids }))
}
