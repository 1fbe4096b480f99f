// src/handlers/tenancy.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminCap, RequireCapability},
    },
    models::tenancy::{
        AddMemberPayload, CreateOrganizationPayload, EnsureOrganizationPayload, Membership, Organization,
        OrganizationContext, TenantContext,
    },
};

// ---
// Onboarding (autenticado, ainda sem organização)
// ---

#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "Organizations",
    request_body = CreateOrganizationPayload,
    responses(
        (status = 201, description = "Organização criada; o chamador vira dono", body = Organization),
        (status = 409, description = "Slug já em uso ou usuário já associado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_organization(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateOrganizationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validar o payload
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    // 2. Organização + associação do dono, atomicamente
    let organization = app_state
        .tenant_service
        .create_organization(Some(&user.0), &payload.name, &payload.slug)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(organization)))
}

#[utoipa::path(
    post,
    path = "/api/organizations/ensure",
    tag = "Organizations",
    request_body = EnsureOrganizationPayload,
    responses(
        (status = 200, description = "Organização do chamador (existente ou recém-criada)", body = Organization)
    ),
    security(("api_jwt" = []))
)]
pub async fn ensure_organization(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    payload: Option<Json<EnsureOrganizationPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();

    let organization = app_state
        .tenant_service
        .ensure_organization(Some(&user.0), payload.default_name.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(organization))
}

#[utoipa::path(
    get,
    path = "/api/organizations/me",
    tag = "Organizations",
    responses(
        (status = 200, description = "Organização e papel do chamador", body = OrganizationContext),
        (status = 403, description = "Usuário sem organização (NO_ORGANIZATION)")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_my_organization(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let context = app_state
        .tenant_service
        .organization_context(Some(&user.0))
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(context))
}

// ---
// Membros (escopado, admin)
// ---

#[utoipa::path(
    get,
    path = "/api/organizations/members",
    tag = "Organizations",
    responses(
        (status = 200, description = "Membros da organização", body = Vec<Membership>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<AdminCap>,
) -> Result<impl IntoResponse, ApiError> {
    let members = app_state
        .tenant_service
        .list_members(tenant.organization_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/api/organizations/members",
    tag = "Organizations",
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Membro adicionado", body = Membership),
        (status = 409, description = "Usuário já pertence a uma organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<AdminCap>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let membership = app_state
        .tenant_service
        .add_member(tenant.organization_id, &payload.user_id, payload.role)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(membership)))
}
