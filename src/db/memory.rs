// src/db/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::store::{ItemStore, OrganizationStore, WorkflowStore};
use crate::domain::{StageChange, StatusUpdate};
use crate::models::item::{Item, ItemFilter, ItemStatus};
use crate::models::tenancy::{Membership, Organization};
use crate::models::workflow::Workflow;

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<String, Membership>,
    workflows: HashMap<Uuid, Workflow>,
    items: HashMap<Uuid, Item>,
}

/// Store em memória com as mesmas garantias do Postgres
/// (slug único, uma organização por usuário, CAS no avanço).
///
/// Um único lock cobre todas as tabelas, então cada operação é atômica.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn find_membership(&self, user_id: &str) -> Result<Option<Membership>, AppError> {
        Ok(self.tables.read().await.memberships.get(user_id).cloned())
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        Ok(self.tables.read().await.organizations.get(&id).cloned())
    }

    async fn create_organization_with_owner(
        &self,
        organization: &Organization,
        owner: &Membership,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        if tables.organizations.values().any(|o| o.slug == organization.slug) {
            return Err(AppError::DuplicateSlug(organization.slug.clone()));
        }
        if tables.memberships.contains_key(&owner.user_id) {
            return Err(AppError::Conflict(format!(
                "o usuário '{}' já pertence a uma organização",
                owner.user_id
            )));
        }

        tables.organizations.insert(organization.id, organization.clone());
        tables.memberships.insert(owner.user_id.clone(), owner.clone());
        Ok(())
    }

    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables.memberships.contains_key(&membership.user_id) {
            return Err(AppError::Conflict(format!(
                "o usuário '{}' já pertence a uma organização",
                membership.user_id
            )));
        }
        tables.memberships.insert(membership.user_id.clone(), membership.clone());
        Ok(())
    }

    async fn list_memberships(&self, organization_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let tables = self.tables.read().await;
        let mut members: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.created_at);
        Ok(members)
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), AppError> {
        self.tables.write().await.workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn find_workflow(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Workflow>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .workflows
            .get(&id)
            .filter(|w| w.organization_id == organization_id)
            .cloned())
    }

    async fn list_workflows(&self, organization_id: Uuid, active_only: bool) -> Result<Vec<Workflow>, AppError> {
        let tables = self.tables.read().await;
        let mut workflows: Vec<Workflow> = tables
            .workflows
            .values()
            .filter(|w| w.organization_id == organization_id && (!active_only || w.is_active))
            .cloned()
            .collect();
        workflows.sort_by_key(|w| w.created_at);
        Ok(workflows)
    }

    async fn update_workflow(&self, workflow: &Workflow) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.workflows.get_mut(&workflow.id) {
            Some(existing) if existing.organization_id == workflow.organization_id => {
                existing.name = workflow.name.clone();
                existing.description = workflow.description.clone();
                existing.stages = workflow.stages.clone();
                existing.updated_at = workflow.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_workflow_active(&self, organization_id: Uuid, id: Uuid, active: bool) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.workflows.get_mut(&id) {
            Some(existing) if existing.organization_id == organization_id => {
                existing.is_active = active;
                existing.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert_items(&self, items: &[Item]) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(dup) = items.iter().find(|i| tables.items.contains_key(&i.id)) {
            return Err(AppError::Conflict(format!("item {} já existe", dup.id)));
        }
        for item in items {
            tables.items.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn find_item(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Item>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .get(&id)
            .filter(|i| i.organization_id == organization_id)
            .cloned())
    }

    async fn find_item_by_code(&self, organization_id: Uuid, code: &str) -> Result<Option<Item>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .find(|i| i.organization_id == organization_id && i.qr_code == code)
            .cloned())
    }

    async fn list_items(&self, organization_id: Uuid, filter: &ItemFilter) -> Result<Vec<Item>, AppError> {
        let tables = self.tables.read().await;
        let mut items: Vec<Item> = tables
            .items
            .values()
            .filter(|i| i.organization_id == organization_id && filter.matches(i))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn count_open_items(&self, organization_id: Uuid, workflow_id: Uuid) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| {
                i.organization_id == organization_id && i.workflow_id == workflow_id && i.status.is_open()
            })
            .count() as i64)
    }

    async fn apply_stage_change(
        &self,
        organization_id: Uuid,
        id: Uuid,
        expected_stage_id: &str,
        change: &StageChange,
    ) -> Result<Option<Item>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(item) = tables.items.get_mut(&id) else {
            return Ok(None);
        };
        if item.organization_id != organization_id
            || item.current_stage_id != expected_stage_id
            || item.status != ItemStatus::Active
        {
            return Ok(None);
        }

        item.current_stage_id = change.to_stage_id.clone();
        item.status = change.status;
        item.completed_at = change.completed_at;
        item.history.push(change.record.clone());
        Ok(Some(item.clone()))
    }

    async fn update_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        expected: ItemStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Item>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(item) = tables.items.get_mut(&id) else {
            return Ok(None);
        };
        if item.organization_id != organization_id || item.status != expected {
            return Ok(None);
        }

        item.status = update.status;
        item.error_reason = update.error_reason.clone();
        item.activated_at = update.activated_at;
        Ok(Some(item.clone()))
    }

    async fn update_location(
        &self,
        organization_id: Uuid,
        id: Uuid,
        location: Option<&str>,
    ) -> Result<Option<Item>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(item) = tables.items.get_mut(&id) else {
            return Ok(None);
        };
        if item.organization_id != organization_id || item.status == ItemStatus::Completed {
            return Ok(None);
        }

        item.current_location = location.map(str::to_string);
        Ok(Some(item.clone()))
    }
}
