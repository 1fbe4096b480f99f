// src/models/item.rs

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::workflow::ActionType;

pub const MAX_BATCH_QUANTITY: u32 = 500;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Inactive,
    Active,
    Completed,
    Paused,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Inactive => "inactive",
            ItemStatus::Active => "active",
            ItemStatus::Completed => "completed",
            ItemStatus::Paused => "paused",
            ItemStatus::Error => "error",
        }
    }

    /// Itens "abertos" seguram o workflow (não pode ser removido).
    pub fn is_open(&self) -> bool {
        !matches!(self, ItemStatus::Completed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(ItemStatus::Inactive),
            "active" => Ok(ItemStatus::Active),
            "completed" => Ok(ItemStatus::Completed),
            "paused" => Ok(ItemStatus::Paused),
            "error" => Ok(ItemStatus::Error),
            _ => Err(format!("Status desconhecido: {}", s)),
        }
    }
}

// --- Histórico ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletedAction {
    #[schema(example = "inspection")]
    pub action_id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}

/// Um movimento de etapa. Só é anexado ao histórico, nunca editado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub from_stage_id: String,
    pub to_stage_id: String,
    pub at: DateTime<Utc>,
    pub user_id: String,
    pub completed_actions: Vec<CompletedAction>,
}

// --- Item ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "TSHIRT-0001")]
    pub sku: String,
    pub qr_code: String,
    pub workflow_id: Uuid,
    #[schema(example = "cut")]
    pub current_stage_id: String,
    pub status: ItemStatus,
    #[schema(value_type = Object)]
    pub metadata: HashMap<String, Value>,
    pub current_location: Option<String>,
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub history: Vec<TransitionRecord>,
}

impl Item {
    /// Novo item na etapa de entrada. O QR aponta para o próprio id.
    pub fn new(
        organization_id: Uuid,
        workflow_id: Uuid,
        entry_stage_id: &str,
        sku: &str,
        metadata: HashMap<String, Value>,
        activate: bool,
    ) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Item {
            id,
            organization_id,
            sku: sku.to_string(),
            qr_code: id.to_string(),
            workflow_id,
            current_stage_id: entry_stage_id.to_string(),
            status: if activate { ItemStatus::Active } else { ItemStatus::Inactive },
            metadata,
            current_location: None,
            error_reason: None,
            created_at: now,
            activated_at: activate.then_some(now),
            completed_at: None,
            history: Vec::new(),
        }
    }
}

// Filtros da listagem
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemFilter {
    pub workflow_id: Option<Uuid>,
    pub status: Option<ItemStatus>,
    pub stage_id: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        self.workflow_id.is_none_or(|w| item.workflow_id == w)
            && self.status.is_none_or(|s| item.status == s)
            && self.stage_id.as_deref().is_none_or(|s| item.current_stage_id == s)
    }
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemPayload {
    pub workflow_id: Uuid,
    // Ausente = gerado a partir do id do item
    #[validate(length(min = 1, max = 64, message = "O SKU deve ter entre 1 e 64 caracteres."))]
    #[schema(example = "TSHIRT-0001")]
    pub sku: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateItemsPayload {
    pub workflow_id: Uuid,
    #[validate(length(min = 1, max = 48, message = "O prefixo do SKU é obrigatório."))]
    #[schema(example = "TSHIRT")]
    pub sku_prefix: String,
    #[validate(range(min = 1, max = 500, message = "A quantidade deve estar entre 1 e 500."))]
    #[schema(example = 24)]
    pub quantity: u32,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: HashMap<String, Value>,
    #[serde(default = "default_true")]
    pub activate: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceItemPayload {
    #[validate(length(min = 1, message = "A etapa de destino é obrigatória."))]
    #[schema(example = "sew")]
    pub to_stage_id: String,
    #[serde(default)]
    pub completed_actions: Vec<CompletedAction>,
    // Quando informado, o avanço só vale se o item ainda estiver nessa etapa
    pub expected_stage_id: Option<String>,
}

// Conclusão explícita de um item numa etapa final
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteItemPayload {
    #[serde(default)]
    pub completed_actions: Vec<CompletedAction>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelocateItemPayload {
    #[schema(example = "Linha 3")]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlagErrorPayload {
    #[validate(length(min = 1, max = 500, message = "Descreva o problema."))]
    #[schema(example = "Tecido rasgado")]
    pub reason: String,
}
