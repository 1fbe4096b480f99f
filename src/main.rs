//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod domain;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{settings::Settings, AppState};
use crate::middleware::auth::{auth_guard, tenant_guard};

fn build_router(app_state: AppState) -> Router {
    // Onboarding: autenticado, ainda sem organização
    let organization_routes = Router::new()
        .route("/", post(handlers::tenancy::create_organization))
        .route("/ensure", post(handlers::tenancy::ensure_organization))
        .route("/me", get(handlers::tenancy::get_my_organization))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let member_routes = Router::new()
        .route("/"
               ,get(handlers::tenancy::list_members)
               .post(handlers::tenancy::add_member)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let workflow_routes = Router::new()
        .route("/"
               ,get(handlers::workflows::list_active_workflows)
               .post(handlers::workflows::create_workflow)
        )
        .route("/{workflow_id}"
               ,get(handlers::workflows::get_workflow)
               .put(handlers::workflows::update_workflow)
               .delete(handlers::workflows::remove_workflow)
        )
        .route("/{workflow_id}/stages/{stage_id}/next"
               ,get(handlers::workflows::get_next_stages)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let item_routes = Router::new()
        .route("/"
               ,post(handlers::items::create_item)
               .get(handlers::items::list_items)
        )
        .route("/batch", post(handlers::items::generate_items))
        .route("/scan/{code}", get(handlers::items::scan_item))
        .route("/{item_id}", get(handlers::items::get_item))
        .route("/{item_id}/qr", get(handlers::items::get_item_qr))
        .route("/{item_id}/advance", post(handlers::items::advance_item))
        .route("/{item_id}/complete", post(handlers::items::complete_item))
        .route("/{item_id}/pause", post(handlers::items::pause_item))
        .route("/{item_id}/resume", post(handlers::items::resume_item))
        .route("/{item_id}/activate", post(handlers::items::activate_item))
        .route("/{item_id}/location", post(handlers::items::relocate_item))
        .route("/{item_id}/error", post(handlers::items::flag_item_error))
        .route("/{item_id}/recover", post(handlers::items::recover_item))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(SwaggerUi::new("/api/swagger-ui").url("/api/docs/openapi.json", docs::ApiDoc::openapi()))
        .nest("/api/organizations/members", member_routes)
        .nest("/api/organizations", organization_routes)
        .nest("/api/workflows", workflow_routes)
        .nest("/api/items", item_routes)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem DATABASE_URL a aplicação não deve iniciar
    let settings = Settings::from_env()?;
    let bind_addr = settings.bind_addr.clone();

    let app_state = AppState::new(settings).await?;
    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
