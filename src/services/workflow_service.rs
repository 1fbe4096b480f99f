// src/services/workflow_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ItemStore, WorkflowStore},
    domain::build_stages,
    models::item::ItemFilter,
    models::tenancy::TenantContext,
    models::workflow::{CreateWorkflowPayload, UpdateWorkflowPayload, Workflow},
};

#[derive(Clone)]
pub struct WorkflowService {
    workflows: Arc<dyn WorkflowStore>,
    items: Arc<dyn ItemStore>,
}

impl WorkflowService {
    pub fn new(workflows: Arc<dyn WorkflowStore>, items: Arc<dyn ItemStore>) -> Self {
        Self { workflows, items }
    }

    pub async fn create(&self, ctx: &TenantContext, payload: CreateWorkflowPayload) -> Result<Uuid, AppError> {
        // 1. Monta e valida o grafo (ordem, ids, transições)
        let stages = build_stages(&payload.stages)?;

        let now = Utc::now();
        let workflow = Workflow {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            name: payload.name.trim().to_string(),
            description: payload.description,
            stages,
            created_by: ctx.user_id.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        // 2. Persiste
        self.workflows.insert_workflow(&workflow).await?;

        tracing::info!(
            "🧵 Workflow '{}' criado com {} etapas (org {})",
            workflow.name,
            workflow.stages.len(),
            ctx.organization_id
        );
        Ok(workflow.id)
    }

    /// Substitui nome, descrição e, se enviadas, a lista inteira de etapas.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        workflow_id: Uuid,
        payload: UpdateWorkflowPayload,
    ) -> Result<Workflow, AppError> {
        let mut workflow = self.get(ctx.organization_id, workflow_id).await?;

        if let Some(name) = payload.name {
            workflow.name = name.trim().to_string();
        }
        if let Some(description) = payload.description {
            workflow.description = Some(description);
        }
        if let Some(stages) = payload.stages {
            let stages = build_stages(&stages)?;

            // Itens abertos precisam continuar numa etapa que exista e que
            // não vire final de repente
            let open = self.items.count_open_items(ctx.organization_id, workflow_id).await?;
            if open > 0 {
                let open_items: Vec<_> = self
                    .items
                    .list_items(ctx.organization_id, &ItemFilter {
                        workflow_id: Some(workflow_id),
                        ..Default::default()
                    })
                    .await?
                    .into_iter()
                    .filter(|i| i.status.is_open())
                    .collect();

                if open_items.iter().any(|i| !stages.iter().any(|s| s.id == i.current_stage_id)) {
                    return Err(AppError::Conflict(
                        "há itens em andamento em etapas que seriam removidas".to_string(),
                    ));
                }

                let stranded = open_items.iter().find(|i| {
                    let was_terminal = workflow.stage(&i.current_stage_id).is_none_or(|s| s.is_terminal());
                    let now_terminal = stages
                        .iter()
                        .find(|s| s.id == i.current_stage_id)
                        .is_some_and(|s| s.is_terminal());
                    now_terminal && !was_terminal
                });
                if let Some(item) = stranded {
                    return Err(AppError::Conflict(format!(
                        "a etapa '{}' ficaria sem destinos com itens em andamento",
                        item.current_stage_id
                    )));
                }
            }
            workflow.stages = stages;
        }
        workflow.updated_at = Utc::now();

        if !self.workflows.update_workflow(&workflow).await? {
            return Err(AppError::NotFound(format!("workflow {}", workflow_id)));
        }

        tracing::info!("🧵 Workflow {} atualizado", workflow_id);
        Ok(workflow)
    }

    pub async fn get(&self, organization_id: Uuid, workflow_id: Uuid) -> Result<Workflow, AppError> {
        self.workflows
            .find_workflow(organization_id, workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workflow {}", workflow_id)))
    }

    pub async fn get_active(&self, organization_id: Uuid) -> Result<Vec<Workflow>, AppError> {
        self.workflows.list_workflows(organization_id, true).await
    }

    /// Desativa o workflow. Recusa enquanto houver itens não concluídos.
    ///
    /// A contagem e a desativação são duas escritas: um item criado entre as
    /// duas ainda passa. `create_item` recusa workflows inativos, o que fecha
    /// a janela para novos itens depois da desativação.
    pub async fn remove(&self, ctx: &TenantContext, workflow_id: Uuid) -> Result<(), AppError> {
        let workflow = self.get(ctx.organization_id, workflow_id).await?;

        let open = self.items.count_open_items(ctx.organization_id, workflow_id).await?;
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "{} item(ns) em andamento ainda usam o workflow '{}'",
                open, workflow.name
            )));
        }

        if !self
            .workflows
            .set_workflow_active(ctx.organization_id, workflow_id, false)
            .await?
        {
            return Err(AppError::NotFound(format!("workflow {}", workflow_id)));
        }

        tracing::info!("🧵 Workflow '{}' desativado", workflow.name);
        Ok(())
    }

    /// Destinos permitidos a partir de uma etapa.
    pub async fn next_stage_ids(
        &self,
        organization_id: Uuid,
        workflow_id: Uuid,
        stage_id: &str,
    ) -> Result<Vec<String>, AppError> {
        let workflow = self.get(organization_id, workflow_id).await?;
        let stage = workflow
            .stage(stage_id)
            .ok_or_else(|| AppError::NotFound(format!("etapa '{}'", stage_id)))?;
        Ok(stage.allowed_next_stage_ids.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::item::Item;
    use std::collections::HashMap;

    fn service(store: &Arc<MemoryStore>) -> WorkflowService {
        WorkflowService::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let ctx = admin_ctx(Uuid::new_v4());

        let id = service.create(&ctx, linear_payload()).await.unwrap();
        let workflow = service.get(ctx.organization_id, id).await.unwrap();

        assert_eq!(workflow.entry_stage().unwrap().id, "Cut");
        assert_eq!(workflow.created_by, "admin");
        assert!(workflow.is_active);
    }

    #[tokio::test]
    async fn test_zero_stages_is_validation_error() {
        let store = Arc::new(MemoryStore::new());
        let mut payload = linear_payload();
        payload.stages.clear();
        let err = service(&store).create(&admin_ctx(Uuid::new_v4()), payload).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_other_organization_sees_not_found() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let ctx = admin_ctx(Uuid::new_v4());
        let id = service.create(&ctx, linear_payload()).await.unwrap();

        let err = service.get(Uuid::new_v4(), id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .update(&admin_ctx(Uuid::new_v4()), id, UpdateWorkflowPayload { name: Some("x".into()), description: None, stages: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_stages() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let ctx = admin_ctx(Uuid::new_v4());
        let id = service.create(&ctx, linear_payload()).await.unwrap();

        let updated = service
            .update(
                &ctx,
                id,
                UpdateWorkflowPayload {
                    name: None,
                    description: Some("Nova versão".into()),
                    stages: Some(vec![stage("Cut"), stage("Pack")]),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.stages.len(), 2);
        assert_eq!(updated.stages[0].allowed_next_stage_ids, vec!["Pack"]);
        assert_eq!(service.get(ctx.organization_id, id).await.unwrap().stages.len(), 2);
    }

    #[tokio::test]
    async fn test_update_cannot_orphan_open_items() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let ctx = admin_ctx(Uuid::new_v4());
        let id = service.create(&ctx, linear_payload()).await.unwrap();

        let item = Item::new(ctx.organization_id, id, "Sew", "SKU-1", HashMap::new(), true);
        store.insert_items(&[item]).await.unwrap();

        let err = service
            .update(&ctx, id, UpdateWorkflowPayload { name: None, description: None, stages: Some(vec![stage("Cut"), stage("Pack")]) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_cannot_make_an_open_item_stage_terminal() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let ctx = admin_ctx(Uuid::new_v4());
        let id = service.create(&ctx, linear_payload()).await.unwrap();

        let item = Item::new(ctx.organization_id, id, "Sew", "SKU-1", HashMap::new(), true);
        store.insert_items(&[item]).await.unwrap();

        // Sem Pack, Sew viraria final com o item parado nela
        let err = service
            .update(&ctx, id, UpdateWorkflowPayload { name: None, description: None, stages: Some(vec![stage("Cut"), stage("Sew")]) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("Sew")));
        assert_eq!(service.get(ctx.organization_id, id).await.unwrap().stages.len(), 3);

        // Inserir uma etapa depois de Sew continua permitido
        let updated = service
            .update(
                &ctx,
                id,
                UpdateWorkflowPayload {
                    name: None,
                    description: None,
                    stages: Some(vec![stage("Cut"), stage("Sew"), stage("Iron"), stage("Pack")]),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stage("Sew").unwrap().allowed_next_stage_ids, vec!["Iron"]);
    }

    #[tokio::test]
    async fn test_get_active_is_ordered_and_skips_removed() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let ctx = admin_ctx(Uuid::new_v4());

        let first = service.create(&ctx, linear_payload()).await.unwrap();
        let second = service.create(&ctx, qc_payload()).await.unwrap();
        let third = service.create(&ctx, linear_payload()).await.unwrap();
        service.remove(&ctx, second).await.unwrap();

        let ids: Vec<Uuid> = service.get_active(ctx.organization_id).await.unwrap().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![first, third]);
    }

    #[tokio::test]
    async fn test_remove_with_open_items_is_conflict() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let ctx = admin_ctx(Uuid::new_v4());
        let id = service.create(&ctx, linear_payload()).await.unwrap();

        let item = Item::new(ctx.organization_id, id, "Cut", "SKU-1", HashMap::new(), true);
        store.insert_items(&[item]).await.unwrap();

        let err = service.remove(&ctx, id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(service.get(ctx.organization_id, id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_next_stage_ids_follows_allowed_list() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let ctx = admin_ctx(Uuid::new_v4());
        let id = service.create(&ctx, linear_payload()).await.unwrap();

        assert_eq!(service.next_stage_ids(ctx.organization_id, id, "Cut").await.unwrap(), vec!["Sew"]);
        assert!(service.next_stage_ids(ctx.organization_id, id, "Pack").await.unwrap().is_empty());
        assert!(matches!(
            service.next_stage_ids(ctx.organization_id, id, "Ghost").await,
            Err(AppError::NotFound(_))
        ));
    }
}
