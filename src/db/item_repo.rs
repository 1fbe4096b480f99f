// src/db/item_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::common::db_utils::{begin_scoped, unique_violation};
use crate::common::error::AppError;
use crate::db::store::ItemStore;
use crate::domain::{StageChange, StatusUpdate};
use crate::models::item::{Item, ItemFilter, ItemStatus, TransitionRecord};

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    organization_id: Uuid,
    sku: String,
    qr_code: String,
    workflow_id: Uuid,
    current_stage_id: String,
    status: String,
    metadata: Json<HashMap<String, Value>>,
    current_location: Option<String>,
    error_reason: Option<String>,
    history: Json<Vec<TransitionRecord>>,
    created_at: DateTime<Utc>,
    activated_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            organization_id: row.organization_id,
            sku: row.sku,
            qr_code: row.qr_code,
            workflow_id: row.workflow_id,
            current_stage_id: row.current_stage_id,
            status: row
                .status
                .parse::<ItemStatus>()
                .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?,
            metadata: row.metadata.0,
            current_location: row.current_location,
            error_reason: row.error_reason,
            created_at: row.created_at,
            activated_at: row.activated_at,
            completed_at: row.completed_at,
            history: row.history.0,
        })
    }
}

const ITEM_COLUMNS: &str = "id, organization_id, sku, qr_code, workflow_id, current_stage_id, status, \
     metadata, current_location, error_reason, history, created_at, activated_at, completed_at";

#[derive(Clone)]
pub struct ItemRepository {
    pool: PgPool,
}

impl ItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_item(row: Option<ItemRow>) -> Result<Option<Item>, AppError> {
    row.map(Item::try_from).transpose()
}

#[async_trait]
impl ItemStore for ItemRepository {
    async fn insert_items(&self, items: &[Item]) -> Result<(), AppError> {
        let Some(first) = items.first() else {
            return Ok(());
        };

        // Lote inteiro na mesma transação: ou entram todos ou nenhum
        let mut tx = begin_scoped(&self.pool, first.organization_id).await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO items
                    (id, organization_id, sku, qr_code, workflow_id, current_stage_id, status,
                     metadata, current_location, error_reason, history, created_at, activated_at, completed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(item.id)
            .bind(item.organization_id)
            .bind(&item.sku)
            .bind(&item.qr_code)
            .bind(item.workflow_id)
            .bind(&item.current_stage_id)
            .bind(item.status.as_str())
            .bind(Json(&item.metadata))
            .bind(&item.current_location)
            .bind(&item.error_reason)
            .bind(Json(&item.history))
            .bind(item.created_at)
            .bind(item.activated_at)
            .bind(item.completed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => AppError::Conflict(format!("código '{}' já em uso", item.qr_code)),
                None => e.into(),
            })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_item(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Item>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE organization_id = $1 AND id = $2",
            ITEM_COLUMNS
        ))
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        to_item(row)
    }

    async fn find_item_by_code(&self, organization_id: Uuid, code: &str) -> Result<Option<Item>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE organization_id = $1 AND qr_code = $2",
            ITEM_COLUMNS
        ))
        .bind(organization_id)
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        to_item(row)
    }

    async fn list_items(&self, organization_id: Uuid, filter: &ItemFilter) -> Result<Vec<Item>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {} FROM items
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR workflow_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::text IS NULL OR current_stage_id = $4)
            ORDER BY created_at DESC
            "#,
            ITEM_COLUMNS
        ))
        .bind(organization_id)
        .bind(filter.workflow_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.stage_id.as_deref())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        rows.into_iter().map(Item::try_from).collect()
    }

    async fn count_open_items(&self, organization_id: Uuid, workflow_id: Uuid) -> Result<i64, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM items WHERE organization_id = $1 AND workflow_id = $2 AND status <> 'completed'",
        )
        .bind(organization_id)
        .bind(workflow_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(count)
    }

    async fn apply_stage_change(
        &self,
        organization_id: Uuid,
        id: Uuid,
        expected_stage_id: &str,
        change: &StageChange,
    ) -> Result<Option<Item>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        // O WHERE na etapa esperada é o compare-and-swap: quem chega depois
        // não encontra a linha e recebe None
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items
            SET current_stage_id = $4,
                status = $5,
                completed_at = $6,
                history = history || $7::jsonb
            WHERE organization_id = $1 AND id = $2
              AND current_stage_id = $3 AND status = 'active'
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(organization_id)
        .bind(id)
        .bind(expected_stage_id)
        .bind(&change.to_stage_id)
        .bind(change.status.as_str())
        .bind(change.completed_at)
        .bind(Json(std::slice::from_ref(&change.record)))
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        to_item(row)
    }

    async fn update_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        expected: ItemStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Item>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items
            SET status = $4, error_reason = $5, activated_at = $6
            WHERE organization_id = $1 AND id = $2 AND status = $3
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(organization_id)
        .bind(id)
        .bind(expected.as_str())
        .bind(update.status.as_str())
        .bind(&update.error_reason)
        .bind(update.activated_at)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        to_item(row)
    }

    async fn update_location(
        &self,
        organization_id: Uuid,
        id: Uuid,
        location: Option<&str>,
    ) -> Result<Option<Item>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items SET current_location = $3
            WHERE organization_id = $1 AND id = $2 AND status <> 'completed'
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(organization_id)
        .bind(id)
        .bind(location)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        to_item(row)
    }
}
