// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::tenancy::TenantContext,
    services::access_gate::{Caller, Capability},
};

/// 1. O Trait que define o que cada rota exige
pub trait CapabilityDef: Send + Sync + 'static {
    /// Basta uma delas.
    fn capabilities() -> &'static [Capability];
}

/// 2. O Extractor (Guardião)
pub struct RequireCapability<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireCapability<T>
where
    T: CapabilityDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = match Locale::from_request_parts(parts, state).await {
            Ok(locale) => locale,
            Err(never) => match never {},
        };
        let reject = |e: AppError| e.to_api_error(&locale, app_state.i18n_store).into_response();

        // A. Usuário (posto pelo auth_guard / tenant_guard)
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| reject(AppError::Unauthorized))?;

        // B. Papel na organização, quando a rota é escopada
        let role = parts.extensions.get::<TenantContext>().map(|ctx| ctx.role);

        let caller = Caller { identity: Some(&user.0), role };
        let required = T::capabilities();

        // C. Pergunta ao portão
        if required.iter().any(|c| app_state.access_gate.can_access(caller, *c)) {
            return Ok(RequireCapability(PhantomData));
        }

        let denied = required.first().copied().unwrap_or(Capability::Admin);
        tracing::warn!(
            "🚫 {} sem a capacidade '{}' em {}",
            user.0.subject,
            denied,
            parts.uri.path()
        );

        // D. Navegador em rota de admin volta para a página pública
        if denied == Capability::Admin && wants_html(parts) {
            return Err(Redirect::to(&app_state.settings.landing_route).into_response());
        }

        Err(reject(AppError::Forbidden(denied.to_string())))
    }
}

fn wants_html(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

// ---
// DEFINIÇÃO DAS CAPACIDADES (TIPOS)
// ---

pub struct AdminCap;
impl CapabilityDef for AdminCap {
    fn capabilities() -> &'static [Capability] { &[Capability::Admin] }
}

pub struct FloorCap;
impl CapabilityDef for FloorCap {
    fn capabilities() -> &'static [Capability] { &[Capability::FloorOperator] }
}

// Leitura: chão de fábrica ou portal da marca
pub struct ViewerCap;
impl CapabilityDef for ViewerCap {
    fn capabilities() -> &'static [Capability] { &[Capability::FloorOperator, Capability::BrandPortal] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;
    use crate::db::MemoryStore;
    use crate::models::auth::Identity;
    use crate::models::tenancy::MemberRole;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use uuid::Uuid;

    fn state(admin_emails: &str) -> AppState {
        let vars = [
            ("DATABASE_URL", "postgres://localhost/groovy"),
            ("JWT_SECRET", "segredo"),
            ("GROOVY_ENV", "production"),
            ("ADMIN_EMAILS", admin_emails),
            ("LANDING_ROUTE", "/bem-vindo"),
        ];
        let settings = Settings::from_lookup(|key| {
            vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
        })
        .unwrap();
        let store = Arc::new(MemoryStore::new());
        AppState::from_stores(settings, store.clone(), store.clone(), store)
    }

    fn parts(accept: &str, role: Option<MemberRole>) -> Parts {
        let (mut parts, _) = Request::builder()
            .uri("/api/workflows")
            .header(header::ACCEPT, accept)
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(AuthenticatedUser(Identity {
            subject: "user_1".into(),
            email: Some("fulano@fabrica.com".into()),
            email_verified: true,
            profile_role: None,
        }));
        if let Some(role) = role {
            parts.extensions.insert(TenantContext {
                organization_id: Uuid::new_v4(),
                user_id: "user_1".into(),
                role,
            });
        }
        parts
    }

    #[tokio::test]
    async fn test_operator_passes_floor_but_not_admin() {
        let state = state("chefe@fabrica.com");

        let mut p = parts("application/json", Some(MemberRole::Operator));
        assert!(RequireCapability::<FloorCap>::from_request_parts(&mut p, &state).await.is_ok());

        let mut p = parts("application/json", Some(MemberRole::Operator));
        let rejection = RequireCapability::<AdminCap>::from_request_parts(&mut p, &state).await.err().unwrap();
        assert_eq!(rejection.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_browser_is_redirected_from_admin_routes() {
        let state = state("chefe@fabrica.com");
        let mut p = parts("text/html,application/xhtml+xml", Some(MemberRole::Brand));

        let rejection = RequireCapability::<AdminCap>::from_request_parts(&mut p, &state).await.err().unwrap();
        assert_eq!(rejection.status(), StatusCode::SEE_OTHER);
        assert_eq!(rejection.headers()[header::LOCATION], "/bem-vindo");
    }

    #[tokio::test]
    async fn test_brand_can_view() {
        let state = state("chefe@fabrica.com");
        let mut p = parts("application/json", Some(MemberRole::Brand));
        assert!(RequireCapability::<ViewerCap>::from_request_parts(&mut p, &state).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let state = state("");
        let (mut p, _) = Request::builder().uri("/api/items").body(()).unwrap().into_parts();
        let rejection = RequireCapability::<FloorCap>::from_request_parts(&mut p, &state).await.err().unwrap();
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }
}
