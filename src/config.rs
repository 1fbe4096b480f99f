// src/config.rs

pub mod settings;

use std::{sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;

use crate::{
    common::i18n::I18nStore,
    db::{ItemRepository, ItemStore, OrganizationStore, TenantRepository, WorkflowRepository, WorkflowStore},
    services::{
        access_gate::AccessGate, auth::AuthService, item_service::ItemService,
        tenancy_service::TenantService, workflow_service::WorkflowService,
    },
};
use settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub i18n_store: &'static I18nStore,
    pub auth_service: AuthService,
    pub access_gate: AccessGate,
    pub tenant_service: TenantService,
    pub workflow_service: WorkflowService,
    pub item_service: ItemService,
}

impl AppState {
    /// Conecta ao Postgres, roda as migrações e monta o estado.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!().run(&db_pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        // --- Monta o gráfico de dependências ---
        Ok(Self::from_stores(
            settings,
            Arc::new(TenantRepository::new(db_pool.clone())),
            Arc::new(WorkflowRepository::new(db_pool.clone())),
            Arc::new(ItemRepository::new(db_pool)),
        ))
    }

    /// Monta o estado sobre quaisquer stores (Postgres ou memória).
    pub fn from_stores(
        settings: Settings,
        organizations: Arc<dyn OrganizationStore>,
        workflows: Arc<dyn WorkflowStore>,
        items: Arc<dyn ItemStore>,
    ) -> Self {
        let access_gate = AccessGate::from_settings(&settings);
        if access_gate.is_open() {
            tracing::warn!(
                "⚠️ ADMIN_EMAILS vazio: todo usuário autenticado tem acesso de admin. Não use em produção."
            );
        }

        Self {
            auth_service: AuthService::from_settings(&settings),
            access_gate,
            tenant_service: TenantService::new(organizations),
            workflow_service: WorkflowService::new(workflows.clone(), items.clone()),
            item_service: ItemService::new(workflows, items),
            i18n_store: I18nStore::global(),
            settings: Arc::new(settings),
        }
    }
}
