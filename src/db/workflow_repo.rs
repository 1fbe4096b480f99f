// src/db/workflow_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::common::db_utils::begin_scoped;
use crate::common::error::AppError;
use crate::db::store::WorkflowStore;
use crate::models::workflow::{Stage, Workflow};

// As etapas ficam embutidas como JSONB: são lidas e gravadas sempre juntas
#[derive(Debug, FromRow)]
struct WorkflowRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    description: Option<String>,
    stages: Json<Vec<Stage>>,
    created_by: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WorkflowRow> for Workflow {
    fn from(row: WorkflowRow) -> Self {
        Workflow {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            description: row.description,
            stages: row.stages.0,
            created_by: row.created_by,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const WORKFLOW_COLUMNS: &str =
    "id, organization_id, name, description, stages, created_by, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct WorkflowRepository {
    pool: PgPool,
}

impl WorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for WorkflowRepository {
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), AppError> {
        let mut tx = begin_scoped(&self.pool, workflow.organization_id).await?;

        sqlx::query(
            r#"
            INSERT INTO workflows
                (id, organization_id, name, description, stages, created_by, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(workflow.id)
        .bind(workflow.organization_id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(Json(&workflow.stages))
        .bind(&workflow.created_by)
        .bind(workflow.is_active)
        .bind(workflow.created_at)
        .bind(workflow.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_workflow(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Workflow>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let row = sqlx::query_as::<_, WorkflowRow>(&format!(
            "SELECT {} FROM workflows WHERE organization_id = $1 AND id = $2",
            WORKFLOW_COLUMNS
        ))
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.map(Workflow::from))
    }

    async fn list_workflows(&self, organization_id: Uuid, active_only: bool) -> Result<Vec<Workflow>, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let rows = sqlx::query_as::<_, WorkflowRow>(&format!(
            r#"
            SELECT {} FROM workflows
            WHERE organization_id = $1 AND (is_active OR NOT $2)
            ORDER BY created_at ASC
            "#,
            WORKFLOW_COLUMNS
        ))
        .bind(organization_id)
        .bind(active_only)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rows.into_iter().map(Workflow::from).collect())
    }

    async fn update_workflow(&self, workflow: &Workflow) -> Result<bool, AppError> {
        let mut tx = begin_scoped(&self.pool, workflow.organization_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE workflows
            SET name = $3, description = $4, stages = $5, updated_at = $6
            WHERE organization_id = $1 AND id = $2
            "#,
        )
        .bind(workflow.organization_id)
        .bind(workflow.id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(Json(&workflow.stages))
        .bind(workflow.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_workflow_active(&self, organization_id: Uuid, id: Uuid, active: bool) -> Result<bool, AppError> {
        let mut tx = begin_scoped(&self.pool, organization_id).await?;

        let result = sqlx::query(
            "UPDATE workflows SET is_active = $3, updated_at = now() WHERE organization_id = $1 AND id = $2",
        )
        .bind(organization_id)
        .bind(id)
        .bind(active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
