// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Organizations ---
        handlers::tenancy::create_organization,
        handlers::tenancy::ensure_organization,
        handlers::tenancy::get_my_organization,
        handlers::tenancy::list_members,
        handlers::tenancy::add_member,

        // --- Workflows ---
        handlers::workflows::list_active_workflows,
        handlers::workflows::get_workflow,
        handlers::workflows::create_workflow,
        handlers::workflows::update_workflow,
        handlers::workflows::remove_workflow,
        handlers::workflows::get_next_stages,

        // --- Items ---
        handlers::items::create_item,
        handlers::items::generate_items,
        handlers::items::list_items,
        handlers::items::get_item,
        handlers::items::scan_item,
        handlers::items::get_item_qr,
        handlers::items::advance_item,
        handlers::items::complete_item,
        handlers::items::pause_item,
        handlers::items::resume_item,
        handlers::items::activate_item,
        handlers::items::relocate_item,
        handlers::items::flag_item_error,
        handlers::items::recover_item,
    ),
    components(
        schemas(
            // --- Tenancy ---
            models::auth::Identity,
            models::tenancy::Organization,
            models::tenancy::MemberRole,
            models::tenancy::Membership,
            models::tenancy::OrganizationContext,
            models::tenancy::CreateOrganizationPayload,
            models::tenancy::EnsureOrganizationPayload,
            models::tenancy::AddMemberPayload,

            // --- Workflows ---
            models::workflow::ActionType,
            models::workflow::ActionConfig,
            models::workflow::Action,
            models::workflow::Stage,
            models::workflow::Workflow,
            models::workflow::ActionInput,
            models::workflow::StageInput,
            models::workflow::CreateWorkflowPayload,
            models::workflow::UpdateWorkflowPayload,
            models::workflow::CreatedWorkflow,
            models::workflow::NextStages,

            // --- Items ---
            models::item::ItemStatus,
            models::item::CompletedAction,
            models::item::TransitionRecord,
            models::item::Item,
            models::item::CreateItemPayload,
            models::item::GenerateItemsPayload,
            models::item::AdvanceItemPayload,
            models::item::CompleteItemPayload,
            models::item::RelocateItemPayload,
            models::item::FlagErrorPayload,
        )
    ),
    tags(
        (name = "Organizations", description = "Organizações (tenants) e membros"),
        (name = "Workflows", description = "Definição das etapas de produção"),
        (name = "Items", description = "Itens rastreáveis e a máquina de estados")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
