// src/services/item_service.rs

use std::sync::Arc;

use chrono::Utc;
use qrcode::{render::svg, QrCode};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ItemStore, WorkflowStore},
    domain::{plan_advance, plan_complete, plan_status_change, StageChange, StatusChange},
    models::{
        item::{
            AdvanceItemPayload, CompleteItemPayload, CreateItemPayload, GenerateItemsPayload, Item, ItemFilter, ItemStatus,
            MAX_BATCH_QUANTITY,
        },
        tenancy::TenantContext,
        workflow::Workflow,
    },
};

#[derive(Clone)]
pub struct ItemService {
    workflows: Arc<dyn WorkflowStore>,
    items: Arc<dyn ItemStore>,
}

impl ItemService {
    pub fn new(workflows: Arc<dyn WorkflowStore>, items: Arc<dyn ItemStore>) -> Self {
        Self { workflows, items }
    }

    // Só workflows ativos recebem itens novos
    async fn active_workflow(&self, organization_id: Uuid, workflow_id: Uuid) -> Result<Workflow, AppError> {
        self.workflows
            .find_workflow(organization_id, workflow_id)
            .await?
            .filter(|w| w.is_active)
            .ok_or_else(|| AppError::NotFound(format!("workflow {}", workflow_id)))
    }

    /// Cria um item ativo na etapa de entrada do workflow.
    pub async fn create_item(&self, ctx: &TenantContext, payload: CreateItemPayload) -> Result<Item, AppError> {
        let workflow = self.active_workflow(ctx.organization_id, payload.workflow_id).await?;
        let entry = entry_stage_id(&workflow)?;

        let mut item = Item::new(ctx.organization_id, workflow.id, &entry, "", payload.metadata, true);
        item.sku = match payload.sku.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(sku) => sku.to_string(),
            None => format!("ITEM-{}", &item.id.simple().to_string()[..8].to_uppercase()),
        };

        self.items.insert_items(std::slice::from_ref(&item)).await?;

        tracing::info!("📦 Item {} ({}) criado em '{}'", item.id, item.sku, entry);
        Ok(item)
    }

    /// Gera um lote com SKUs `<prefixo>-0001`, `<prefixo>-0002`...
    pub async fn generate_items(
        &self,
        ctx: &TenantContext,
        payload: GenerateItemsPayload,
    ) -> Result<Vec<Item>, AppError> {
        if payload.quantity == 0 || payload.quantity > MAX_BATCH_QUANTITY {
            return Err(AppError::validation(
                "quantity",
                format!("A quantidade deve estar entre 1 e {}.", MAX_BATCH_QUANTITY),
            ));
        }
        let prefix = payload.sku_prefix.trim();
        if prefix.is_empty() {
            return Err(AppError::validation("skuPrefix", "O prefixo do SKU é obrigatório."));
        }

        let workflow = self.active_workflow(ctx.organization_id, payload.workflow_id).await?;
        let entry = entry_stage_id(&workflow)?;

        let items: Vec<Item> = (1..=payload.quantity)
            .map(|n| {
                Item::new(
                    ctx.organization_id,
                    workflow.id,
                    &entry,
                    &format!("{}-{:04}", prefix, n),
                    payload.metadata.clone(),
                    payload.activate,
                )
            })
            .collect();

        self.items.insert_items(&items).await?;

        tracing::info!(
            "📦 Lote de {} itens '{}' gerado para o workflow '{}'",
            items.len(),
            prefix,
            workflow.name
        );
        Ok(items)
    }

    pub async fn get(&self, organization_id: Uuid, item_id: Uuid) -> Result<Item, AppError> {
        self.items
            .find_item(organization_id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("item {}", item_id)))
    }

    pub async fn list(&self, organization_id: Uuid, filter: &ItemFilter) -> Result<Vec<Item>, AppError> {
        self.items.list_items(organization_id, filter).await
    }

    /// Resolve um código lido no chão de fábrica: id do item ou conteúdo do QR.
    pub async fn scan(&self, organization_id: Uuid, code: &str) -> Result<Item, AppError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::InvalidInput("código vazio".to_string()));
        }

        if let Some(item) = self.items.find_item_by_code(organization_id, code).await? {
            return Ok(item);
        }
        if let Ok(id) = Uuid::parse_str(code) {
            if let Some(item) = self.items.find_item(organization_id, id).await? {
                return Ok(item);
            }
        }
        Err(AppError::NotFound(format!("item com código '{}'", code)))
    }

    /// Avança o item. A gravação é condicionada à etapa lida: se outra
    /// chamada avançou antes, esta falha com `StaleStage`.
    pub async fn advance(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        payload: AdvanceItemPayload,
    ) -> Result<Item, AppError> {
        // 1. Carrega item e workflow
        let item = self.get(ctx.organization_id, item_id).await?;
        if let Some(expected) = payload.expected_stage_id.as_deref() {
            if expected != item.current_stage_id {
                return Err(AppError::StaleStage {
                    item_id,
                    expected_stage_id: expected.to_string(),
                });
            }
        }
        let workflow = self
            .workflows
            .find_workflow(ctx.organization_id, item.workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workflow {}", item.workflow_id)))?;

        // 2. Regras da máquina de estados
        let change = plan_advance(
            &item,
            &workflow,
            payload.to_stage_id.trim(),
            payload.completed_actions,
            &ctx.user_id,
            Utc::now(),
        )?;

        // 3. Compare-and-swap na etapa lida
        self.commit_stage_change(ctx, &item, change).await
    }

    /// Conclui um item ativo parado numa etapa final.
    pub async fn complete(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        payload: CompleteItemPayload,
    ) -> Result<Item, AppError> {
        let item = self.get(ctx.organization_id, item_id).await?;
        let workflow = self
            .workflows
            .find_workflow(ctx.organization_id, item.workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workflow {}", item.workflow_id)))?;

        let change = plan_complete(&item, &workflow, payload.completed_actions, &ctx.user_id, Utc::now())?;
        self.commit_stage_change(ctx, &item, change).await
    }

    async fn commit_stage_change(
        &self,
        ctx: &TenantContext,
        item: &Item,
        change: StageChange,
    ) -> Result<Item, AppError> {
        let updated = self
            .items
            .apply_stage_change(ctx.organization_id, item.id, &item.current_stage_id, &change)
            .await?;

        match updated {
            Some(updated) => {
                if updated.status == ItemStatus::Completed {
                    tracing::info!("✅ Item {} concluído em '{}'", item.id, updated.current_stage_id);
                } else {
                    tracing::info!(
                        "➡️ Item {} avançou de '{}' para '{}'",
                        item.id,
                        change.record.from_stage_id,
                        updated.current_stage_id
                    );
                }
                Ok(updated)
            }
            None => {
                tracing::warn!(
                    "Escrita concorrente no item {}: etapa '{}' já não é a atual",
                    item.id,
                    item.current_stage_id
                );
                Err(AppError::StaleStage {
                    item_id: item.id,
                    expected_stage_id: item.current_stage_id.clone(),
                })
            }
        }
    }

    pub async fn pause(&self, ctx: &TenantContext, item_id: Uuid) -> Result<Item, AppError> {
        self.change_status(ctx, item_id, StatusChange::Pause, None).await
    }

    pub async fn resume(&self, ctx: &TenantContext, item_id: Uuid) -> Result<Item, AppError> {
        self.change_status(ctx, item_id, StatusChange::Resume, None).await
    }

    pub async fn activate(&self, ctx: &TenantContext, item_id: Uuid) -> Result<Item, AppError> {
        self.change_status(ctx, item_id, StatusChange::Activate, None).await
    }

    pub async fn flag_error(&self, ctx: &TenantContext, item_id: Uuid, reason: &str) -> Result<Item, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason", "Descreva o problema."));
        }
        self.change_status(ctx, item_id, StatusChange::FlagError, Some(reason)).await
    }

    pub async fn recover(&self, ctx: &TenantContext, item_id: Uuid) -> Result<Item, AppError> {
        self.change_status(ctx, item_id, StatusChange::Recover, None).await
    }

    async fn change_status(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        change: StatusChange,
        reason: Option<&str>,
    ) -> Result<Item, AppError> {
        let item = self.get(ctx.organization_id, item_id).await?;
        let update = plan_status_change(&item, change, reason, Utc::now())?;

        match self
            .items
            .update_status(ctx.organization_id, item_id, item.status, &update)
            .await?
        {
            Some(updated) => {
                tracing::info!(
                    "Item {}: {} → {} ({})",
                    item_id,
                    item.status,
                    updated.status,
                    change.as_str()
                );
                Ok(updated)
            }
            // O status mudou entre a leitura e a escrita: relê para reportar o atual
            None => {
                let current = self.get(ctx.organization_id, item_id).await?;
                Err(AppError::InvalidState {
                    operation: change.as_str().to_string(),
                    status: current.status.to_string(),
                })
            }
        }
    }

    /// Define ou limpa a localização física. Itens concluídos não mudam.
    pub async fn relocate(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        location: Option<&str>,
    ) -> Result<Item, AppError> {
        let location = location.map(str::trim).filter(|l| !l.is_empty());

        match self
            .items
            .update_location(ctx.organization_id, item_id, location)
            .await?
        {
            Some(item) => Ok(item),
            None => {
                let item = self.get(ctx.organization_id, item_id).await?;
                Err(AppError::InvalidState {
                    operation: "relocate".to_string(),
                    status: item.status.to_string(),
                })
            }
        }
    }

    /// Etiqueta QR do item em SVG.
    pub async fn qr_svg(&self, organization_id: Uuid, item_id: Uuid) -> Result<String, AppError> {
        let item = self.get(organization_id, item_id).await?;
        let code = QrCode::new(item.qr_code.as_bytes())
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Falha ao gerar QR: {}", e)))?;

        Ok(code
            .render::<svg::Color>()
            .min_dimensions(200, 200)
            .quiet_zone(true)
            .build())
    }
}

fn entry_stage_id(workflow: &Workflow) -> Result<String, AppError> {
    workflow
        .entry_stage()
        .map(|s| s.id.clone())
        .ok_or_else(|| AppError::NotFound(format!("etapa de entrada do workflow {}", workflow.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::item::CompletedAction;
    use crate::models::workflow::{ActionType, CreateWorkflowPayload};
    use crate::services::workflow_service::{test_support::*, WorkflowService};
    use crate::domain::StatusUpdate;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::Barrier;

    /// Segura cada leitura de item até que as duas chamadas tenham lido.
    struct LockstepReads {
        inner: Arc<MemoryStore>,
        barrier: Barrier,
    }

    #[async_trait]
    impl ItemStore for LockstepReads {
        async fn insert_items(&self, items: &[Item]) -> Result<(), AppError> {
            self.inner.insert_items(items).await
        }

        async fn find_item(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Item>, AppError> {
            let item = self.inner.find_item(organization_id, id).await?;
            self.barrier.wait().await;
            Ok(item)
        }

        async fn find_item_by_code(&self, organization_id: Uuid, code: &str) -> Result<Option<Item>, AppError> {
            self.inner.find_item_by_code(organization_id, code).await
        }

        async fn list_items(&self, organization_id: Uuid, filter: &ItemFilter) -> Result<Vec<Item>, AppError> {
            self.inner.list_items(organization_id, filter).await
        }

        async fn count_open_items(&self, organization_id: Uuid, workflow_id: Uuid) -> Result<i64, AppError> {
            self.inner.count_open_items(organization_id, workflow_id).await
        }

        async fn apply_stage_change(
            &self,
            organization_id: Uuid,
            id: Uuid,
            expected_stage_id: &str,
            change: &StageChange,
        ) -> Result<Option<Item>, AppError> {
            self.inner.apply_stage_change(organization_id, id, expected_stage_id, change).await
        }

        async fn update_status(
            &self,
            organization_id: Uuid,
            id: Uuid,
            expected: ItemStatus,
            update: &StatusUpdate,
        ) -> Result<Option<Item>, AppError> {
            self.inner.update_status(organization_id, id, expected, update).await
        }

        async fn update_location(
            &self,
            organization_id: Uuid,
            id: Uuid,
            location: Option<&str>,
        ) -> Result<Option<Item>, AppError> {
            self.inner.update_location(organization_id, id, location).await
        }
    }

    struct Fixture {
        workflows: WorkflowService,
        items: ItemService,
        ctx: TenantContext,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            workflows: WorkflowService::new(store.clone(), store.clone()),
            items: ItemService::new(store.clone(), store),
            ctx: admin_ctx(Uuid::new_v4()),
        }
    }

    fn create_payload(workflow_id: Uuid) -> CreateItemPayload {
        CreateItemPayload { workflow_id, sku: Some("TSHIRT-1".into()), metadata: HashMap::new() }
    }

    fn advance_to(stage: &str) -> AdvanceItemPayload {
        AdvanceItemPayload { to_stage_id: stage.into(), completed_actions: vec![], expected_stage_id: None }
    }

    #[tokio::test]
    async fn test_created_item_reads_back_active_at_entry() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();

        let created = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();
        let read = f.items.get(f.ctx.organization_id, created.id).await.unwrap();

        assert_eq!(read.status, ItemStatus::Active);
        assert_eq!(read.current_stage_id, "Cut");
        assert!(read.history.is_empty());
        assert_eq!(read.qr_code, read.id.to_string());
        assert!(read.activated_at.is_some());
    }

    #[tokio::test]
    async fn test_generated_sku_when_absent() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let mut payload = create_payload(wf);
        payload.sku = None;

        let item = f.items.create_item(&f.ctx, payload).await.unwrap();
        assert!(item.sku.starts_with("ITEM-"));
        assert_eq!(item.sku.len(), "ITEM-".len() + 8);
    }

    #[tokio::test]
    async fn test_create_in_foreign_or_missing_workflow_is_not_found() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();

        let stranger = admin_ctx(Uuid::new_v4());
        let err = f.items.create_item(&stranger, create_payload(wf)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = f.items.create_item(&f.ctx, create_payload(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cut_sew_pack_scenario() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let item = f.items.advance(&f.ctx, item.id, advance_to("Sew")).await.unwrap();
        assert_eq!(item.current_stage_id, "Sew");
        assert_eq!(item.status, ItemStatus::Active);
        assert_eq!(item.history.len(), 1);

        let item = f.items.advance(&f.ctx, item.id, advance_to("Pack")).await.unwrap();
        assert_eq!(item.current_stage_id, "Pack");
        assert_eq!(item.status, ItemStatus::Completed);
        assert!(item.completed_at.is_some());
        assert_eq!(item.history.len(), 2);
        assert_eq!(item.history[1].from_stage_id, "Sew");
        assert_eq!(item.history[1].user_id, "admin");

        // Concluído não avança mais
        let err = f.items.advance(&f.ctx, item.id, advance_to("Cut")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_qc_inspection_scenario() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, qc_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let err = f.items.advance(&f.ctx, item.id, advance_to("Pack")).await.unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredAction(_)));

        // Falha não altera nada
        let unchanged = f.items.get(f.ctx.organization_id, item.id).await.unwrap();
        assert_eq!(unchanged.current_stage_id, "QC");
        assert!(unchanged.history.is_empty());

        let payload = AdvanceItemPayload {
            to_stage_id: "Pack".into(),
            completed_actions: vec![CompletedAction {
                action_id: "inspection".into(),
                action_type: ActionType::Inspection,
                data: json!({ "passed": true }),
            }],
            expected_stage_id: None,
        };
        let done = f.items.advance(&f.ctx, item.id, payload).await.unwrap();
        assert_eq!(done.status, ItemStatus::Completed);
        assert_eq!(done.history[0].completed_actions[0].action_id, "inspection");
    }

    #[tokio::test]
    async fn test_concurrent_advance_loser_gets_stale_stage() {
        let store = Arc::new(MemoryStore::new());
        let ctx = admin_ctx(Uuid::new_v4());
        let wf = WorkflowService::new(store.clone(), store.clone())
            .create(&ctx, linear_payload())
            .await
            .unwrap();
        let item = ItemService::new(store.clone(), store.clone())
            .create_item(&ctx, create_payload(wf))
            .await
            .unwrap();

        // As duas chamadas leem Cut antes de qualquer uma gravar
        let racing = ItemService::new(
            store.clone(),
            Arc::new(LockstepReads { inner: store.clone(), barrier: Barrier::new(2) }),
        );
        let (a, b) = tokio::join!(
            racing.advance(&ctx, item.id, advance_to("Sew")),
            racing.advance(&ctx, item.id, advance_to("Sew"))
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(AppError::StaleStage { expected_stage_id, .. }) if expected_stage_id == "Cut"))
                .count(),
            1
        );

        let stored = store.find_item(ctx.organization_id, item.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stage_id, "Sew");
        assert_eq!(stored.history.len(), 1);
    }

    #[tokio::test]
    async fn test_single_stage_item_completes_explicitly() {
        let f = fixture();
        let wf = f
            .workflows
            .create(
                &f.ctx,
                CreateWorkflowPayload { name: "Avulso".into(), description: None, stages: vec![stage("Only")] },
            )
            .await
            .unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();
        assert_eq!(item.status, ItemStatus::Active);
        assert!(matches!(f.workflows.remove(&f.ctx, wf).await, Err(AppError::Conflict(_))));

        let done = f.items.complete(&f.ctx, item.id, CompleteItemPayload::default()).await.unwrap();
        assert_eq!(done.status, ItemStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.history.len(), 1);
        assert_eq!(done.history[0].from_stage_id, "Only");
        assert_eq!(done.history[0].to_stage_id, "Only");

        let err = f.items.complete(&f.ctx, item.id, CompleteItemPayload::default()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));

        // Sem itens abertos o workflow pode sair
        f.workflows.remove(&f.ctx, wf).await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_before_final_stage_is_illegal() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let err = f.items.complete(&f.ctx, item.id, CompleteItemPayload::default()).await.unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { .. }));

        let unchanged = f.items.get(f.ctx.organization_id, item.id).await.unwrap();
        assert_eq!(unchanged.status, ItemStatus::Active);
        assert!(unchanged.history.is_empty());
    }

    #[tokio::test]
    async fn test_expected_stage_mismatch_is_stale() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let mut payload = advance_to("Sew");
        payload.expected_stage_id = Some("Sew".into());
        let err = f.items.advance(&f.ctx, item.id, payload).await.unwrap_err();
        assert!(matches!(err, AppError::StaleStage { .. }));
    }

    #[tokio::test]
    async fn test_generate_batch() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();

        let items = f
            .items
            .generate_items(
                &f.ctx,
                GenerateItemsPayload {
                    workflow_id: wf,
                    sku_prefix: "TSHIRT".into(),
                    quantity: 3,
                    metadata: HashMap::from([("size".to_string(), json!("M"))]),
                    activate: false,
                },
            )
            .await
            .unwrap();

        let skus: Vec<&str> = items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["TSHIRT-0001", "TSHIRT-0002", "TSHIRT-0003"]);
        assert!(items.iter().all(|i| i.status == ItemStatus::Inactive && i.activated_at.is_none()));
        assert_eq!(items[0].metadata["size"], json!("M"));

        // Inativo precisa ser ativado antes de avançar
        let err = f.items.advance(&f.ctx, items[0].id, advance_to("Sew")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));

        let active = f.items.activate(&f.ctx, items[0].id).await.unwrap();
        assert_eq!(active.status, ItemStatus::Active);
        assert!(active.activated_at.is_some());
    }

    #[tokio::test]
    async fn test_batch_quantity_bounds() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();

        for quantity in [0, MAX_BATCH_QUANTITY + 1] {
            let err = f
                .items
                .generate_items(
                    &f.ctx,
                    GenerateItemsPayload {
                        workflow_id: wf,
                        sku_prefix: "X".into(),
                        quantity,
                        metadata: HashMap::new(),
                        activate: true,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        assert!(f.items.list(f.ctx.organization_id, &ItemFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pause_resume_and_invalid_state() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let paused = f.items.pause(&f.ctx, item.id).await.unwrap();
        assert_eq!(paused.status, ItemStatus::Paused);

        let err = f.items.pause(&f.ctx, item.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));

        let err = f.items.advance(&f.ctx, item.id, advance_to("Sew")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));

        let resumed = f.items.resume(&f.ctx, item.id).await.unwrap();
        assert_eq!(resumed.status, ItemStatus::Active);
    }

    #[tokio::test]
    async fn test_error_stays_distinct_until_recovered() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let flagged = f.items.flag_error(&f.ctx, item.id, "agulha quebrada").await.unwrap();
        assert_eq!(flagged.status, ItemStatus::Error);
        assert_eq!(flagged.error_reason.as_deref(), Some("agulha quebrada"));

        let listed = f
            .items
            .list(f.ctx.organization_id, &ItemFilter { status: Some(ItemStatus::Paused), ..Default::default() })
            .await
            .unwrap();
        assert!(listed.is_empty());

        assert!(f.items.resume(&f.ctx, item.id).await.is_err());

        let recovered = f.items.recover(&f.ctx, item.id).await.unwrap();
        assert_eq!(recovered.status, ItemStatus::Active);
        assert!(recovered.error_reason.is_none());
    }

    #[tokio::test]
    async fn test_scan_lookup() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let found = f.items.scan(f.ctx.organization_id, &format!("  {}\n", item.qr_code)).await.unwrap();
        assert_eq!(found.id, item.id);

        assert!(matches!(f.items.scan(f.ctx.organization_id, "   ").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(f.items.scan(f.ctx.organization_id, "desconhecido").await, Err(AppError::NotFound(_))));
        assert!(matches!(f.items.scan(Uuid::new_v4(), &item.qr_code).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_relocate() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let moved = f.items.relocate(&f.ctx, item.id, Some(" Linha 3 ")).await.unwrap();
        assert_eq!(moved.current_location.as_deref(), Some("Linha 3"));

        let cleared = f.items.relocate(&f.ctx, item.id, None).await.unwrap();
        assert!(cleared.current_location.is_none());

        f.items.advance(&f.ctx, item.id, advance_to("Sew")).await.unwrap();
        f.items.advance(&f.ctx, item.id, advance_to("Pack")).await.unwrap();
        let err = f.items.relocate(&f.ctx, item.id, Some("Expedição")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let a = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();
        f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();
        f.items.advance(&f.ctx, a.id, advance_to("Sew")).await.unwrap();

        let at_sew = f
            .items
            .list(f.ctx.organization_id, &ItemFilter { stage_id: Some("Sew".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(at_sew.len(), 1);
        assert_eq!(at_sew[0].id, a.id);

        let all = f
            .items
            .list(f.ctx.organization_id, &ItemFilter { workflow_id: Some(wf), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_qr_svg() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        let item = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap();

        let svg = f.items.qr_svg(f.ctx.organization_id, item.id).await.unwrap();
        assert!(svg.contains("<svg"));
    }

    #[tokio::test]
    async fn test_removed_workflow_takes_no_new_items() {
        let f = fixture();
        let wf = f.workflows.create(&f.ctx, linear_payload()).await.unwrap();
        f.workflows.remove(&f.ctx, wf).await.unwrap();

        let err = f.items.create_item(&f.ctx, create_payload(wf)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
