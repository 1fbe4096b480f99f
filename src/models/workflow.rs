// src/models/workflow.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Enums ---

/// Os tipos de ação que uma etapa pode exigir no chão de fábrica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Scan,
    Photo,
    Note,
    Approval,
    Measurement,
    Inspection,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Scan => "scan",
            ActionType::Photo => "photo",
            ActionType::Note => "note",
            ActionType::Approval => "approval",
            ActionType::Measurement => "measurement",
            ActionType::Inspection => "inspection",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan" => Ok(ActionType::Scan),
            "photo" => Ok(ActionType::Photo),
            "note" => Ok(ActionType::Note),
            "approval" => Ok(ActionType::Approval),
            "measurement" => Ok(ActionType::Measurement),
            "inspection" => Ok(ActionType::Inspection),
            _ => Err(format!("Tipo de ação desconhecido: {}", s)),
        }
    }
}

// --- Estrutura embutida no Workflow ---

// Configuração específica de cada tipo de ação
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 2)]
    pub photo_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist_items: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "mm")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[schema(example = "inspection")]
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[schema(example = "Inspeção visual")]
    pub label: String,
    pub required: bool,
    #[serde(default)]
    pub config: ActionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[schema(example = "cut")]
    pub id: String,
    #[schema(example = "Corte")]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub allowed_next_stage_ids: Vec<String>,
    #[schema(example = "#3B82F6")]
    pub color: String,
    #[schema(example = 0)]
    pub order: u32,
}

impl Stage {
    /// Etapa sem saídas: o item que chega aqui está concluído.
    pub fn is_terminal(&self) -> bool {
        self.allowed_next_stage_ids.is_empty()
    }

    pub fn required_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.required)
    }

    pub fn action(&self, action_id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == action_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "Camiseta básica")]
    pub name: String,
    pub description: Option<String>,
    pub stages: Vec<Stage>,
    pub created_by: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    pub fn stage(&self, stage_id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    /// A etapa de entrada (order 0).
    pub fn entry_stage(&self) -> Option<&Stage> {
        self.stages.iter().find(|s| s.order == 0)
    }
}

// --- Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    // Gerado a partir do tipo quando ausente
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[validate(length(min = 1, message = "O rótulo da ação é obrigatório."))]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub config: ActionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageInput {
    pub id: Option<String>,
    #[validate(length(min = 1, max = 80, message = "O nome da etapa é obrigatório."))]
    #[schema(example = "Costura")]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub actions: Vec<ActionInput>,
    // Ausente = segue para a próxima etapa da lista
    pub allowed_next_stage_ids: Option<Vec<String>>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowPayload {
    #[validate(length(min = 1, max = 120, message = "O nome do workflow é obrigatório."))]
    #[schema(example = "Camiseta básica")]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "O workflow precisa de ao menos uma etapa."), nested)]
    pub stages: Vec<StageInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowPayload {
    #[validate(length(min = 1, max = 120, message = "O nome do workflow é obrigatório."))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(nested)]
    pub stages: Option<Vec<StageInput>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWorkflow {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextStages {
    pub stage_ids: Vec<String>,
}
