// src/handlers/items.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
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
        rbac::{AdminCap, FloorCap, RequireCapability, ViewerCap},
    },
    models::{
        item::{
            AdvanceItemPayload, CompleteItemPayload, CreateItemPayload, FlagErrorPayload, GenerateItemsPayload,
            Item, ItemFilter, RelocateItemPayload,
        },
        tenancy::TenantContext,
    },
};

#[utoipa::path(
    post,
    path = "/api/items",
    tag = "Items",
    request_body = CreateItemPayload,
    responses(
        (status = 201, description = "Item criado ativo na etapa de entrada", body = Item),
        (status = 404, description = "Workflow não encontrado nesta organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<AdminCap>,
    Json(payload): Json<CreateItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let item = app_state
        .item_service
        .create_item(&tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    post,
    path = "/api/items/batch",
    tag = "Items",
    request_body = GenerateItemsPayload,
    responses(
        (status = 201, description = "Lote gerado", body = Vec<Item>),
        (status = 400, description = "Quantidade fora de 1..500")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_items(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<AdminCap>,
    Json(payload): Json<GenerateItemsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let items = app_state
        .item_service
        .generate_items(&tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(items)))
}

#[utoipa::path(
    get,
    path = "/api/items",
    tag = "Items",
    params(ItemFilter),
    responses(
        (status = 200, description = "Itens da organização, mais recentes primeiro", body = Vec<Item>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<ViewerCap>,
    Query(filter): Query<ItemFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .item_service
        .list(tenant.organization_id, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/items/{item_id}",
    tag = "Items",
    responses(
        (status = 200, description = "Item com o histórico", body = Item),
        (status = 404, description = "Item não encontrado nesta organização")
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<ViewerCap>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .get(tenant.organization_id, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    get,
    path = "/api/items/scan/{code}",
    tag = "Items",
    responses(
        (status = 200, description = "Item correspondente ao código lido", body = Item),
        (status = 404, description = "Nenhum item com esse código")
    ),
    params(
        ("code" = String, Path, description = "Conteúdo do QR ou ID do item")
    ),
    security(("api_jwt" = []))
)]
pub async fn scan_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<FloorCap>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .scan(tenant.organization_id, &code)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    get,
    path = "/api/items/{item_id}/qr",
    tag = "Items",
    responses(
        (status = 200, description = "Etiqueta QR em SVG", content_type = "image/svg+xml", body = String)
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item_qr(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<ViewerCap>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let svg = app_state
        .item_service
        .qr_svg(tenant.organization_id, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/advance",
    tag = "Items",
    request_body = AdvanceItemPayload,
    responses(
        (status = 200, description = "Item avançado (ou concluído)", body = Item),
        (status = 409, description = "Outra chamada avançou o item antes (STALE_STAGE)"),
        (status = 422, description = "Transição ilegal, ação obrigatória pendente ou status inválido")
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn advance_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<FloorCap>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<AdvanceItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let item = app_state
        .item_service
        .advance(&tenant, item_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/complete",
    tag = "Items",
    request_body = CompleteItemPayload,
    responses(
        (status = 200, description = "Item concluído na etapa final", body = Item),
        (status = 409, description = "O item mudou de etapa antes (STALE_STAGE)"),
        (status = 422, description = "Etapa com destinos, ação obrigatória pendente ou status inválido")
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<FloorCap>,
    Path(item_id): Path<Uuid>,
    payload: Option<Json<CompleteItemPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();

    let item = app_state
        .item_service
        .complete(&tenant, item_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/pause",
    tag = "Items",
    responses(
        (status = 200, description = "Item pausado", body = Item),
        (status = 422, description = "Só itens ativos podem ser pausados")
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn pause_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<FloorCap>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .pause(&tenant, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/resume",
    tag = "Items",
    responses(
        (status = 200, description = "Item retomado", body = Item),
        (status = 422, description = "Só itens pausados podem ser retomados")
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn resume_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<FloorCap>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .resume(&tenant, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/activate",
    tag = "Items",
    responses(
        (status = 200, description = "Item liberado para o chão de fábrica", body = Item),
        (status = 422, description = "Só itens inativos podem ser ativados")
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn activate_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<FloorCap>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .activate(&tenant, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/location",
    tag = "Items",
    request_body = RelocateItemPayload,
    responses(
        (status = 200, description = "Localização atualizada", body = Item)
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn relocate_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<FloorCap>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<RelocateItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .relocate(&tenant, item_id, payload.location.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/error",
    tag = "Items",
    request_body = FlagErrorPayload,
    responses(
        (status = 200, description = "Item marcado com erro", body = Item)
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn flag_item_error(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<FloorCap>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<FlagErrorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let item = app_state
        .item_service
        .flag_error(&tenant, item_id, &payload.reason)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/recover",
    tag = "Items",
    responses(
        (status = 200, description = "Erro resolvido, item volta a ativo", body = Item),
        (status = 422, description = "Item não está em erro")
    ),
    params(
        ("item_id" = Uuid, Path, description = "ID do Item")
    ),
    security(("api_jwt" = []))
)]
pub async fn recover_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireCapability<AdminCap>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .recover(&tenant, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(item))
}
