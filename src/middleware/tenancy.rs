// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{common::error::AppError, models::tenancy::TenantContext};

// Cabeçalho opcional: quando enviado, precisa ser a organização do usuário
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

// O contexto é resolvido pelo tenant_guard; aqui só o lemos das extensions.
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::NoOrganization)
    }
}
