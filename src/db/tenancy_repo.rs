// src/db/tenancy_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::common::db_utils::unique_violation;
use crate::common::error::AppError;
use crate::db::store::OrganizationStore;
use crate::models::tenancy::{MemberRole, Membership, Organization};

#[derive(Debug, FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    user_id: String,
    organization_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = AppError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            user_id: row.user_id,
            organization_id: row.organization_id,
            role: row
                .role
                .parse::<MemberRole>()
                .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?,
            created_at: row.created_at,
        })
    }
}

// Organizações e associações. Estas tabelas não têm RLS: são elas que
// resolvem o tenant antes de qualquer consulta escopada.
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn membership_conflict(user_id: &str) -> AppError {
    AppError::Conflict(format!("o usuário '{}' já pertence a uma organização", user_id))
}

#[async_trait]
impl OrganizationStore for TenantRepository {
    async fn find_membership(&self, user_id: &str) -> Result<Option<Membership>, AppError> {
        sqlx::query_as::<_, MembershipRow>(
            "SELECT user_id, organization_id, role, created_at FROM memberships WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Membership::try_from)
        .transpose()
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, slug, created_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Organization::from))
    }

    async fn create_organization_with_owner(
        &self,
        organization: &Organization,
        owner: &Membership,
    ) -> Result<(), AppError> {
        // 1. Organização e dono na mesma transação
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO organizations (id, name, slug, created_at) VALUES ($1, $2, $3, $4)")
            .bind(organization.id)
            .bind(&organization.name)
            .bind(&organization.slug)
            .bind(organization.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => AppError::DuplicateSlug(organization.slug.clone()),
                None => e.into(),
            })?;

        // 2. Chave primária em user_id garante uma organização por usuário
        sqlx::query(
            "INSERT INTO memberships (user_id, organization_id, role, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&owner.user_id)
        .bind(owner.organization_id)
        .bind(owner.role.as_str())
        .bind(owner.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => membership_conflict(&owner.user_id),
            None => e.into(),
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO memberships (user_id, organization_id, role, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&membership.user_id)
        .bind(membership.organization_id)
        .bind(membership.role.as_str())
        .bind(membership.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => membership_conflict(&membership.user_id),
            None => e.into(),
        })?;
        Ok(())
    }

    async fn list_memberships(&self, organization_id: Uuid) -> Result<Vec<Membership>, AppError> {
        sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT user_id, organization_id, role, created_at
            FROM memberships
            WHERE organization_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Membership::try_from)
        .collect()
    }
}
