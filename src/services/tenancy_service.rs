// src/services/tenancy_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrganizationStore,
    models::{
        auth::Identity,
        tenancy::{MemberRole, Membership, Organization, OrganizationContext},
    },
};

const DEFAULT_ORGANIZATION_NAME: &str = "Minha organização";
const SLUG_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct TenantService {
    store: Arc<dyn OrganizationStore>,
}

impl TenantService {
    pub fn new(store: Arc<dyn OrganizationStore>) -> Self {
        Self { store }
    }

    /// Resolve a organização do chamador. Sem associação, o cliente deve
    /// chamar `ensure_organization` ou `create_organization`.
    pub async fn resolve_organization(&self, identity: Option<&Identity>) -> Result<Membership, AppError> {
        let identity = identity.ok_or(AppError::Unauthorized)?;
        self.store
            .find_membership(&identity.subject)
            .await?
            .ok_or(AppError::NoOrganization)
    }

    pub async fn organization_context(&self, identity: Option<&Identity>) -> Result<OrganizationContext, AppError> {
        let membership = self.resolve_organization(identity).await?;
        let organization = self
            .store
            .find_organization(membership.organization_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("organização {}", membership.organization_id)))?;
        Ok(OrganizationContext { organization, membership })
    }

    /// Idempotente: devolve a organização existente ou cria uma com slug `org-<timestamp>`.
    pub async fn ensure_organization(
        &self,
        identity: Option<&Identity>,
        default_name: Option<&str>,
    ) -> Result<Organization, AppError> {
        let identity = identity.ok_or(AppError::Unauthorized)?;

        // 1. Já tem organização? Devolve a mesma
        if let Some(existing) = self.existing_organization(&identity.subject).await? {
            return Ok(existing);
        }

        let name = default_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_ORGANIZATION_NAME);

        // 2. Cria. Colisão de slug tenta de novo com sufixo aleatório
        for attempt in 0..SLUG_ATTEMPTS {
            let slug = generated_slug(attempt);
            let organization = Organization::new(name, &slug);
            let owner = Membership::new(&identity.subject, organization.id, MemberRole::Owner);

            match self.store.create_organization_with_owner(&organization, &owner).await {
                Ok(()) => {
                    tracing::info!("🏭 Organização '{}' criada para {}", organization.slug, identity.subject);
                    return Ok(organization);
                }
                Err(AppError::DuplicateSlug(taken)) => {
                    tracing::warn!("Slug '{}' já existe, tentando outro", taken);
                }
                Err(AppError::Conflict(_)) => {
                    // Outra chamada concorrente criou a associação primeiro
                    return self
                        .existing_organization(&identity.subject)
                        .await?
                        .ok_or(AppError::NoOrganization);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict("não foi possível gerar um slug único".to_string()))
    }

    /// Cria uma organização com slug escolhido. Organização e dono entram juntos.
    pub async fn create_organization(
        &self,
        identity: Option<&Identity>,
        name: &str,
        slug: &str,
    ) -> Result<Organization, AppError> {
        let identity = identity.ok_or(AppError::Unauthorized)?;

        let slug = slug.trim().to_lowercase();
        if !is_valid_slug(&slug) {
            return Err(AppError::validation(
                "slug",
                "Use apenas letras minúsculas, números e hífens.",
            ));
        }
        if name.trim().is_empty() {
            return Err(AppError::validation("name", "O nome da organização é obrigatório."));
        }

        if self.store.find_membership(&identity.subject).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "o usuário '{}' já pertence a uma organização",
                identity.subject
            )));
        }

        let organization = Organization::new(name, &slug);
        let owner = Membership::new(&identity.subject, organization.id, MemberRole::Owner);
        self.store.create_organization_with_owner(&organization, &owner).await?;

        tracing::info!("🏭 Organização '{}' criada por {}", organization.slug, identity.subject);
        Ok(organization)
    }

    pub async fn add_member(
        &self,
        organization_id: Uuid,
        user_id: &str,
        role: MemberRole,
    ) -> Result<Membership, AppError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::validation("userId", "O identificador do usuário é obrigatório."));
        }
        // Só existe um dono: quem criou a organização
        if role == MemberRole::Owner {
            return Err(AppError::InvalidInput("o papel 'owner' não pode ser atribuído".to_string()));
        }

        let membership = Membership::new(user_id, organization_id, role);
        self.store.add_membership(&membership).await?;

        tracing::info!("👥 {} adicionado à organização {} como {}", user_id, organization_id, role);
        Ok(membership)
    }

    pub async fn list_members(&self, organization_id: Uuid) -> Result<Vec<Membership>, AppError> {
        self.store.list_memberships(organization_id).await
    }

    async fn existing_organization(&self, user_id: &str) -> Result<Option<Organization>, AppError> {
        match self.store.find_membership(user_id).await? {
            Some(membership) => self.store.find_organization(membership.organization_id).await,
            None => Ok(None),
        }
    }
}

fn generated_slug(attempt: usize) -> String {
    let base = format!("org-{}", Utc::now().timestamp_millis());
    if attempt == 0 {
        base
    } else {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", base, &suffix[..6])
    }
}

/// Minúsculas, dígitos e hífens; sem hífen nas pontas.
pub fn is_valid_slug(slug: &str) -> bool {
    (3..=64).contains(&slug.len())
        && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
}
