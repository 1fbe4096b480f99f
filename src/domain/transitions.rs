//! Máquina de estados do item
//!
//! Funções puras: decidem a mudança e devolvem o que deve ser gravado.
//! A gravação em si (compare-and-swap na etapa esperada) fica com a store.

use chrono::{DateTime, Utc};

use crate::common::error::AppError;
use crate::models::item::{CompletedAction, Item, ItemStatus, TransitionRecord};
use crate::models::workflow::{Action, ActionType, Stage, Workflow};

/// O resultado de um avanço válido.
#[derive(Debug, Clone, PartialEq)]
pub struct StageChange {
    pub to_stage_id: String,
    pub status: ItemStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub record: TransitionRecord,
}

/// Mudanças de status fora do avanço de etapa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Pause,
    Resume,
    Activate,
    FlagError,
    Recover,
}

impl StatusChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusChange::Pause => "pause",
            StatusChange::Resume => "resume",
            StatusChange::Activate => "activate",
            StatusChange::FlagError => "flag_error",
            StatusChange::Recover => "recover",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: ItemStatus,
    pub error_reason: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
}

/// Valida e planeja o avanço de `item` para `to_stage_id`.
///
/// Ordem das verificações: status ativo, etapa atual existente, transição
/// permitida, ações obrigatórias presentes, dados das ações coerentes.
pub fn plan_advance(
    item: &Item,
    workflow: &Workflow,
    to_stage_id: &str,
    completed_actions: Vec<CompletedAction>,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<StageChange, AppError> {
    if item.status != ItemStatus::Active {
        return Err(AppError::InvalidState {
            operation: "advance".to_string(),
            status: item.status.to_string(),
        });
    }

    let current = current_stage(item, workflow)?;

    let destination = workflow
        .stage(to_stage_id)
        .filter(|_| current.allowed_next_stage_ids.iter().any(|id| id == to_stage_id))
        .ok_or_else(|| AppError::IllegalTransition {
            from: current.id.clone(),
            to: to_stage_id.to_string(),
        })?;

    check_stage_actions(current, &completed_actions)?;

    let (status, completed_at) = if destination.is_terminal() {
        (ItemStatus::Completed, Some(now))
    } else {
        (ItemStatus::Active, None)
    };

    Ok(StageChange {
        to_stage_id: destination.id.clone(),
        status,
        completed_at,
        record: TransitionRecord {
            from_stage_id: current.id.clone(),
            to_stage_id: destination.id.clone(),
            at: now,
            user_id: user_id.to_string(),
            completed_actions,
        },
    })
}

/// Conclui um item parado numa etapa final (sem destinos).
///
/// Vale só para itens ativos. O histórico ganha um registro com origem e
/// destino iguais, carregando as ações da etapa final.
pub fn plan_complete(
    item: &Item,
    workflow: &Workflow,
    completed_actions: Vec<CompletedAction>,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<StageChange, AppError> {
    if item.status != ItemStatus::Active {
        return Err(AppError::InvalidState {
            operation: "complete".to_string(),
            status: item.status.to_string(),
        });
    }

    let current = current_stage(item, workflow)?;
    if !current.is_terminal() {
        return Err(AppError::IllegalTransition {
            from: current.id.clone(),
            to: ItemStatus::Completed.to_string(),
        });
    }

    check_stage_actions(current, &completed_actions)?;

    Ok(StageChange {
        to_stage_id: current.id.clone(),
        status: ItemStatus::Completed,
        completed_at: Some(now),
        record: TransitionRecord {
            from_stage_id: current.id.clone(),
            to_stage_id: current.id.clone(),
            at: now,
            user_id: user_id.to_string(),
            completed_actions,
        },
    })
}

fn current_stage<'a>(item: &Item, workflow: &'a Workflow) -> Result<&'a Stage, AppError> {
    workflow.stage(&item.current_stage_id).ok_or_else(|| {
        AppError::NotFound(format!("etapa '{}' do workflow {}", item.current_stage_id, workflow.id))
    })
}

// Obrigatórias presentes e cada ação enviada pertence à etapa
fn check_stage_actions(stage: &Stage, completed_actions: &[CompletedAction]) -> Result<(), AppError> {
    let missing: Vec<String> = stage
        .required_actions()
        .filter(|required| !completed_actions.iter().any(|c| c.action_id == required.id))
        .map(|required| required.id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::MissingRequiredAction(missing));
    }

    for completed in completed_actions {
        let action = stage.action(&completed.action_id).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "a ação '{}' não pertence à etapa '{}'",
                completed.action_id, stage.id
            ))
        })?;
        check_completed_action(action, completed)?;
    }

    Ok(())
}

/// Confere os dados capturados contra a configuração da ação.
pub fn check_completed_action(action: &Action, completed: &CompletedAction) -> Result<(), AppError> {
    if completed.action_type != action.action_type {
        return Err(AppError::InvalidInput(format!(
            "a ação '{}' é do tipo '{}', não '{}'",
            action.id, action.action_type, completed.action_type
        )));
    }

    match action.action_type {
        ActionType::Photo => {
            let expected = action.config.photo_count.unwrap_or(0) as usize;
            let given = completed
                .data
                .get("photos")
                .and_then(|p| p.as_array())
                .map(|p| p.len())
                .unwrap_or(0);
            if given < expected {
                return Err(AppError::InvalidInput(format!(
                    "a ação '{}' exige {} foto(s), recebidas {}",
                    action.id, expected, given
                )));
            }
        }
        ActionType::Measurement if action.config.min.is_some() || action.config.max.is_some() => {
            let value = completed
                .data
                .get("value")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("a ação '{}' exige um valor numérico", action.id))
                })?;
            let below = action.config.min.is_some_and(|min| value < min);
            let above = action.config.max.is_some_and(|max| value > max);
            if below || above {
                return Err(AppError::InvalidInput(format!(
                    "medida {} fora da faixa da ação '{}'",
                    value, action.id
                )));
            }
        }
        _ => {}
    }

    Ok(())
}

/// Tabela das mudanças de status permitidas.
///
/// `error` não volta sozinho: só `Recover` tira o item desse estado.
pub fn plan_status_change(
    item: &Item,
    change: StatusChange,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<StatusUpdate, AppError> {
    let next = match (item.status, change) {
        (ItemStatus::Active, StatusChange::Pause) => ItemStatus::Paused,
        (ItemStatus::Paused, StatusChange::Resume) => ItemStatus::Active,
        (ItemStatus::Inactive, StatusChange::Activate) => ItemStatus::Active,
        (ItemStatus::Active | ItemStatus::Paused, StatusChange::FlagError) => ItemStatus::Error,
        (ItemStatus::Error, StatusChange::Recover) => ItemStatus::Active,
        (status, change) => {
            return Err(AppError::InvalidState {
                operation: change.as_str().to_string(),
                status: status.to_string(),
            });
        }
    };

    Ok(StatusUpdate {
        status: next,
        error_reason: match change {
            StatusChange::FlagError => reason.map(str::to_string),
            _ => None,
        },
        activated_at: match change {
            StatusChange::Activate => Some(now),
            _ => item.activated_at,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workflow::ActionConfig;
    use serde_json::json;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn stage(id: &str, order: u32, next: &[&str], actions: Vec<Action>) -> Stage {
        Stage {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            actions,
            allowed_next_stage_ids: next.iter().map(|s| s.to_string()).collect(),
            color: "#000000".to_string(),
            order,
        }
    }

    fn action(id: &str, action_type: ActionType, required: bool, config: ActionConfig) -> Action {
        Action {
            id: id.to_string(),
            action_type,
            label: id.to_string(),
            required,
            config,
        }
    }

    fn workflow(stages: Vec<Stage>) -> Workflow {
        Workflow {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Camiseta".into(),
            description: None,
            stages,
            created_by: "admin".into(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item_at(wf: &Workflow, stage_id: &str) -> Item {
        Item::new(wf.organization_id, wf.id, stage_id, "SKU-1", HashMap::new(), true)
    }

    fn linear() -> Workflow {
        workflow(vec![
            stage("Cut", 0, &["Sew"], vec![]),
            stage("Sew", 1, &["Pack"], vec![]),
            stage("Pack", 2, &[], vec![]),
        ])
    }

    fn done(id: &str, action_type: ActionType, data: serde_json::Value) -> CompletedAction {
        CompletedAction { action_id: id.into(), action_type, data }
    }

    #[test]
    fn test_advance_to_next_stage() {
        let wf = linear();
        let item = item_at(&wf, "Cut");
        let change = plan_advance(&item, &wf, "Sew", vec![], "op-1", Utc::now()).unwrap();
        assert_eq!(change.to_stage_id, "Sew");
        assert_eq!(change.status, ItemStatus::Active);
        assert!(change.completed_at.is_none());
        assert_eq!(change.record.from_stage_id, "Cut");
        assert_eq!(change.record.user_id, "op-1");
    }

    #[test]
    fn test_advance_into_terminal_stage_completes() {
        let wf = linear();
        let item = item_at(&wf, "Sew");
        let now = Utc::now();
        let change = plan_advance(&item, &wf, "Pack", vec![], "op-1", now).unwrap();
        assert_eq!(change.status, ItemStatus::Completed);
        assert_eq!(change.completed_at, Some(now));
    }

    #[test]
    fn test_skipping_a_stage_is_illegal() {
        let wf = linear();
        let item = item_at(&wf, "Cut");
        let err = plan_advance(&item, &wf, "Pack", vec![], "op-1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { .. }));
    }

    #[test]
    fn test_unknown_destination_is_illegal() {
        let wf = linear();
        let item = item_at(&wf, "Cut");
        let err = plan_advance(&item, &wf, "Ghost", vec![], "op-1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { .. }));
    }

    #[test]
    fn test_missing_stage_in_workflow_is_not_found() {
        let wf = linear();
        let item = item_at(&wf, "Removed");
        let err = plan_advance(&item, &wf, "Sew", vec![], "op-1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_required_inspection_blocks_until_completed() {
        let wf = workflow(vec![
            stage(
                "QC",
                0,
                &["Pack"],
                vec![action("inspection", ActionType::Inspection, true, ActionConfig::default())],
            ),
            stage("Pack", 1, &[], vec![]),
        ]);
        let item = item_at(&wf, "QC");

        let err = plan_advance(&item, &wf, "Pack", vec![], "op-1", Utc::now()).unwrap_err();
        match err {
            AppError::MissingRequiredAction(ids) => assert_eq!(ids, vec!["inspection"]),
            other => panic!("erro inesperado: {:?}", other),
        }

        let actions = vec![done("inspection", ActionType::Inspection, json!({ "passed": true }))];
        let change = plan_advance(&item, &wf, "Pack", actions, "op-1", Utc::now()).unwrap();
        assert_eq!(change.record.completed_actions.len(), 1);
    }

    #[test]
    fn test_optional_actions_do_not_replace_required_ones() {
        let wf = workflow(vec![
            stage(
                "QC",
                0,
                &["Pack"],
                vec![
                    action("inspection", ActionType::Inspection, true, ActionConfig::default()),
                    action("note", ActionType::Note, false, ActionConfig::default()),
                ],
            ),
            stage("Pack", 1, &[], vec![]),
        ]);
        let item = item_at(&wf, "QC");
        let actions = vec![done("note", ActionType::Note, json!({ "text": "ok" }))];
        let err = plan_advance(&item, &wf, "Pack", actions, "op-1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredAction(_)));
    }

    #[test]
    fn test_paused_item_cannot_advance() {
        let wf = linear();
        let mut item = item_at(&wf, "Cut");
        item.status = ItemStatus::Paused;
        let err = plan_advance(&item, &wf, "Sew", vec![], "op-1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[test]
    fn test_photo_count_is_enforced() {
        let config = ActionConfig { photo_count: Some(2), ..Default::default() };
        let photo = action("photo", ActionType::Photo, true, config);

        let one = done("photo", ActionType::Photo, json!({ "photos": ["a.jpg"] }));
        assert!(check_completed_action(&photo, &one).is_err());

        let two = done("photo", ActionType::Photo, json!({ "photos": ["a.jpg", "b.jpg"] }));
        assert!(check_completed_action(&photo, &two).is_ok());
    }

    #[test]
    fn test_measurement_range_is_enforced() {
        let config = ActionConfig { min: Some(10.0), max: Some(12.5), unit: Some("mm".into()), ..Default::default() };
        let measure = action("width", ActionType::Measurement, true, config);

        assert!(check_completed_action(&measure, &done("width", ActionType::Measurement, json!({ "value": 11 }))).is_ok());
        assert!(check_completed_action(&measure, &done("width", ActionType::Measurement, json!({ "value": 13 }))).is_err());
        assert!(check_completed_action(&measure, &done("width", ActionType::Measurement, json!({}))).is_err());
    }

    #[test]
    fn test_action_type_mismatch_is_rejected() {
        let note = action("note", ActionType::Note, false, ActionConfig::default());
        let wrong = done("note", ActionType::Scan, json!({}));
        assert!(matches!(check_completed_action(&note, &wrong), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_pause_and_resume_toggle() {
        let wf = linear();
        let mut item = item_at(&wf, "Cut");

        let paused = plan_status_change(&item, StatusChange::Pause, None, Utc::now()).unwrap();
        assert_eq!(paused.status, ItemStatus::Paused);

        item.status = ItemStatus::Paused;
        let resumed = plan_status_change(&item, StatusChange::Resume, None, Utc::now()).unwrap();
        assert_eq!(resumed.status, ItemStatus::Active);
    }

    #[test]
    fn test_pause_from_wrong_status_is_invalid() {
        let wf = linear();
        let mut item = item_at(&wf, "Cut");
        for status in [ItemStatus::Completed, ItemStatus::Error, ItemStatus::Inactive, ItemStatus::Paused] {
            item.status = status;
            let err = plan_status_change(&item, StatusChange::Pause, None, Utc::now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidState { .. }));
        }
    }

    #[test]
    fn test_error_is_not_resumable() {
        let wf = linear();
        let mut item = item_at(&wf, "Cut");
        item.status = ItemStatus::Error;
        assert!(plan_status_change(&item, StatusChange::Resume, None, Utc::now()).is_err());

        let recovered = plan_status_change(&item, StatusChange::Recover, None, Utc::now()).unwrap();
        assert_eq!(recovered.status, ItemStatus::Active);
        assert!(recovered.error_reason.is_none());
    }

    #[test]
    fn test_flag_error_keeps_reason() {
        let wf = linear();
        let item = item_at(&wf, "Cut");
        let update = plan_status_change(&item, StatusChange::FlagError, Some("tecido rasgado"), Utc::now()).unwrap();
        assert_eq!(update.status, ItemStatus::Error);
        assert_eq!(update.error_reason.as_deref(), Some("tecido rasgado"));
    }

    #[test]
    fn test_activate_stamps_activation() {
        let wf = linear();
        let mut item = item_at(&wf, "Cut");
        item.status = ItemStatus::Inactive;
        item.activated_at = None;
        let now = Utc::now();
        let update = plan_status_change(&item, StatusChange::Activate, None, now).unwrap();
        assert_eq!(update.status, ItemStatus::Active);
        assert_eq!(update.activated_at, Some(now));
    }

    #[test]
    fn test_complete_on_terminal_stage() {
        let wf = workflow(vec![stage(
            "Only",
            0,
            &[],
            vec![action("inspection", ActionType::Inspection, true, ActionConfig::default())],
        )]);
        let item = item_at(&wf, "Only");

        let err = plan_complete(&item, &wf, vec![], "op-1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredAction(ids) if ids == vec!["inspection"]));

        let now = Utc::now();
        let change = plan_complete(
            &item,
            &wf,
            vec![done("inspection", ActionType::Inspection, json!({ "passed": true }))],
            "op-1",
            now,
        )
        .unwrap();
        assert_eq!(change.to_stage_id, "Only");
        assert_eq!(change.status, ItemStatus::Completed);
        assert_eq!(change.completed_at, Some(now));
        assert_eq!(change.record.from_stage_id, change.record.to_stage_id);
    }

    #[test]
    fn test_complete_needs_terminal_stage_and_active_item() {
        let wf = linear();
        let item = item_at(&wf, "Sew");
        let err = plan_complete(&item, &wf, vec![], "op-1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { ref from, .. } if from == "Sew"));

        let mut paused = item_at(&wf, "Pack");
        paused.status = ItemStatus::Paused;
        let err = plan_complete(&paused, &wf, vec![], "op-1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }
}
