//! Montagem e validação do grafo de etapas de um workflow.
//!
//! A fonte canônica das transições é `allowed_next_stage_ids` de cada etapa.
//! A ordem numérica só serve para posicionar as etapas e para preencher o
//! destino padrão (a etapa seguinte) quando o cliente não informa a lista.

use std::collections::HashSet;

use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::workflow::{Action, ActionInput, Stage, StageInput};

pub const DEFAULT_STAGE_COLORS: &[&str] = &[
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899",
];

/// Etapa cuja ordem é exatamente `current_order + 1`, ou vazio se não existir.
///
/// Só olha a ordem numérica; usado como destino padrão na montagem.
pub fn next_stage_ids(stages: &[Stage], current_order: u32) -> Vec<String> {
    stages
        .iter()
        .filter(|s| Some(s.order) == current_order.checked_add(1))
        .map(|s| s.id.clone())
        .take(1)
        .collect()
}

/// Converte a lista recebida em etapas ordenadas (0, 1, 2...) e valida o grafo.
pub fn build_stages(inputs: &[StageInput]) -> Result<Vec<Stage>, AppError> {
    if inputs.is_empty() {
        return Err(AppError::validation(
            "stages",
            "O workflow precisa de ao menos uma etapa.",
        ));
    }

    // 1. Ids e ordem primeiro, para que o destino padrão possa referenciá-los
    let mut stages: Vec<Stage> = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| Stage {
            id: input
                .id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            actions: build_actions(&input.actions),
            allowed_next_stage_ids: Vec::new(),
            color: input
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_STAGE_COLORS[index % DEFAULT_STAGE_COLORS.len()].to_string()),
            order: index as u32,
        })
        .collect();

    // 2. Transições: explícitas ou a etapa seguinte
    for (index, input) in inputs.iter().enumerate() {
        let allowed = match &input.allowed_next_stage_ids {
            Some(ids) => ids.iter().map(|id| id.trim().to_string()).collect(),
            None => next_stage_ids(&stages, index as u32),
        };
        stages[index].allowed_next_stage_ids = allowed;
    }

    validate_stages(&stages)?;
    Ok(stages)
}

fn build_actions(inputs: &[ActionInput]) -> Vec<Action> {
    let mut taken: HashSet<String> = inputs
        .iter()
        .filter_map(|a| a.id.as_deref().map(str::trim))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let id = match input.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
                Some(id) => id.to_string(),
                None => {
                    // "inspection", ou "inspection-2" se já houver outro
                    let base = input.action_type.as_str();
                    let mut id = base.to_string();
                    let mut suffix = index;
                    while taken.contains(&id) {
                        id = format!("{}-{}", base, suffix);
                        suffix += 1;
                    }
                    taken.insert(id.clone());
                    id
                }
            };
            Action {
                id,
                action_type: input.action_type,
                label: input.label.trim().to_string(),
                required: input.required,
                config: input.config.clone(),
            }
        })
        .collect()
}

/// Invariantes de um workflow persistido.
pub fn validate_stages(stages: &[Stage]) -> Result<(), AppError> {
    if stages.is_empty() {
        return Err(AppError::validation(
            "stages",
            "O workflow precisa de ao menos uma etapa.",
        ));
    }

    // Ordem contígua começando em 0
    let mut orders: Vec<u32> = stages.iter().map(|s| s.order).collect();
    orders.sort_unstable();
    if orders.iter().enumerate().any(|(i, order)| *order != i as u32) {
        return Err(AppError::validation(
            "stages",
            "A ordem das etapas deve ser única e contígua a partir de 0.",
        ));
    }

    let mut ids = HashSet::new();
    for stage in stages {
        if stage.id.is_empty() || stage.name.is_empty() {
            return Err(AppError::validation(
                "stages",
                "Toda etapa precisa de id e nome.",
            ));
        }
        if !ids.insert(stage.id.as_str()) {
            return Err(AppError::validation(
                "stages",
                format!("Id de etapa repetido: '{}'.", stage.id),
            ));
        }
    }

    for stage in stages {
        for next in &stage.allowed_next_stage_ids {
            if next == &stage.id {
                return Err(AppError::validation(
                    "stages",
                    format!("A etapa '{}' não pode apontar para si mesma.", stage.id),
                ));
            }
            if !ids.contains(next.as_str()) {
                return Err(AppError::validation(
                    "stages",
                    format!("A etapa '{}' aponta para '{}', que não existe.", stage.id, next),
                ));
            }
        }

        let mut action_ids = HashSet::new();
        for action in &stage.actions {
            if !action_ids.insert(action.id.as_str()) {
                return Err(AppError::validation(
                    "stages",
                    format!("Ação '{}' repetida na etapa '{}'.", action.id, stage.id),
                ));
            }
            if let (Some(min), Some(max)) = (action.config.min, action.config.max) {
                if min > max {
                    return Err(AppError::validation(
                        "stages",
                        format!("Ação '{}': mínimo maior que o máximo.", action.id),
                    ));
                }
            }
        }
    }

    Ok(())
}
