// src/models/tenancy.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Organization (O "Tenant")
// ---
// A fronteira de isolamento de workflows, itens e usuários
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    #[schema(example = "Fábrica Aurora")]
    pub name: String,
    #[schema(example = "fabrica-aurora")]
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: &str, slug: &str) -> Self {
        Organization {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            slug: slug.trim().to_lowercase(),
            created_at: Utc::now(),
        }
    }
}

// ---
// 2. MemberRole
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Operator,
    Brand,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Operator => "operator",
            MemberRole::Brand => "brand",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "operator" => Ok(MemberRole::Operator),
            "brand" => Ok(MemberRole::Brand),
            _ => Err(format!("Papel desconhecido: {}", s)),
        }
    }
}

// ---
// 3. Membership (A "Ponte" Usuário-Organização)
// ---
// No desenho atual um usuário pertence a no máximo uma organização
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: String,
    pub organization_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: &str, organization_id: Uuid, role: MemberRole) -> Self {
        Membership {
            user_id: user_id.to_string(),
            organization_id,
            role,
            created_at: Utc::now(),
        }
    }
}

// Resposta do GET /api/organizations/me
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationContext {
    pub organization: Organization,
    pub membership: Membership,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationPayload {
    #[validate(length(min = 1, max = 120, message = "O nome da organização é obrigatório."))]
    #[schema(example = "Fábrica Aurora")]
    pub name: String,

    #[validate(length(min = 3, max = 64, message = "O slug deve ter entre 3 e 64 caracteres."))]
    #[schema(example = "fabrica-aurora")]
    pub slug: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnsureOrganizationPayload {
    #[schema(example = "Minha Fábrica")]
    pub default_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberPayload {
    #[validate(length(min = 1, message = "O identificador do usuário é obrigatório."))]
    #[schema(example = "user_2xyz")]
    pub user_id: String,
    pub role: MemberRole,
}

// ---
// 4. TenantContext
// ---
// O que o tenant_guard resolve e injeta nas extensões da requisição
#[derive(Debug, Clone, PartialEq)]
pub struct TenantContext {
    pub organization_id: Uuid,
    pub user_id: String,
    pub role: MemberRole,
}

impl From<&Membership> for TenantContext {
    fn from(membership: &Membership) -> Self {
        TenantContext {
            organization_id: membership.organization_id,
            user_id: membership.user_id.clone(),
            role: membership.role,
        }
    }
}
