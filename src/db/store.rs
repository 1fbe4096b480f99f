// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::domain::{StageChange, StatusUpdate};
use crate::models::item::{Item, ItemFilter, ItemStatus};
use crate::models::tenancy::{Membership, Organization};
use crate::models::workflow::Workflow;

// As costuras de persistência. Os serviços só conhecem estes traits;
// o Postgres e a memória (testes) são implementações.

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// A única associação do usuário (no máximo uma organização por usuário).
    async fn find_membership(&self, user_id: &str) -> Result<Option<Membership>, AppError>;

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, AppError>;

    /// Cria a organização e a associação do dono de forma atômica.
    /// Slug repetido vira `DuplicateSlug`; usuário já associado vira `Conflict`.
    async fn create_organization_with_owner(
        &self,
        organization: &Organization,
        owner: &Membership,
    ) -> Result<(), AppError>;

    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError>;

    async fn list_memberships(&self, organization_id: Uuid) -> Result<Vec<Membership>, AppError>;
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), AppError>;

    async fn find_workflow(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Workflow>, AppError>;

    /// Ordenados por `created_at`, mais antigos primeiro.
    async fn list_workflows(&self, organization_id: Uuid, active_only: bool) -> Result<Vec<Workflow>, AppError>;

    /// Grava nome, descrição, etapas e `updated_at`. Retorna false se não existir.
    async fn update_workflow(&self, workflow: &Workflow) -> Result<bool, AppError>;

    async fn set_workflow_active(&self, organization_id: Uuid, id: Uuid, active: bool) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insere todos ou nenhum.
    async fn insert_items(&self, items: &[Item]) -> Result<(), AppError>;

    async fn find_item(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Item>, AppError>;

    async fn find_item_by_code(&self, organization_id: Uuid, code: &str) -> Result<Option<Item>, AppError>;

    async fn list_items(&self, organization_id: Uuid, filter: &ItemFilter) -> Result<Vec<Item>, AppError>;

    /// Itens ainda não concluídos de um workflow.
    async fn count_open_items(&self, organization_id: Uuid, workflow_id: Uuid) -> Result<i64, AppError>;

    /// Compare-and-swap: só grava se o item ainda estiver ativo em
    /// `expected_stage_id`. Retorna o item atualizado, ou `None` se perdeu a corrida.
    async fn apply_stage_change(
        &self,
        organization_id: Uuid,
        id: Uuid,
        expected_stage_id: &str,
        change: &StageChange,
    ) -> Result<Option<Item>, AppError>;

    /// Mesmo esquema, condicionado ao status atual.
    async fn update_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        expected: ItemStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Item>, AppError>;

    /// Itens concluídos não mudam de lugar: retorna `None` para eles.
    async fn update_location(
        &self,
        organization_id: Uuid,
        id: Uuid,
        location: Option<&str>,
    ) -> Result<Option<Item>, AppError>;
}
