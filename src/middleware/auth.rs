// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TENANT_ID_HEADER},
    models::{auth::Identity, tenancy::TenantContext},
};

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

fn authenticate(app_state: &AppState, request: &Request) -> Result<Identity, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthorized)?;

    app_state.auth_service.validate_token(bearer.token())
}

// ---
// Guarda 1: só autenticação (rotas de onboarding da organização)
// ---
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&app_state, &request)
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(identity));
    Ok(next.run(request).await)
}

// ---
// Guarda 2: autenticação + organização do chamador
// ---
// O tenant vem da associação, nunca do cliente. Se o cliente mandar
// X-Tenant-ID, ele precisa bater com a associação.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, app_state.i18n_store);

    // 1. Identidade
    let identity = authenticate(&app_state, &request).map_err(to_api)?;

    // 2. Organização
    let membership = app_state
        .tenant_service
        .resolve_organization(Some(&identity))
        .await
        .map_err(to_api)?;

    // 3. Cabeçalho opcional, só como verificação
    if let Some(value) = request.headers().get(TENANT_ID_HEADER) {
        let requested = value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or_else(|| to_api(AppError::InvalidInput("cabeçalho X-Tenant-ID inválido".to_string())))?;

        if requested != membership.organization_id {
            tracing::warn!(
                "{} pediu a organização {} sem pertencer a ela",
                identity.subject,
                requested
            );
            return Err(to_api(AppError::Forbidden("tenant".to_string())));
        }
    }

    request.extensions_mut().insert(TenantContext::from(&membership));
    request.extensions_mut().insert(AuthenticatedUser(identity));
    Ok(next.run(request).await)
}
