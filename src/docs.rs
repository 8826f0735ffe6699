// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Organizations (funil de ativação) ---
        handlers::organizations::get_remaining_steps,
        handlers::organizations::sign_contract,
        handlers::organizations::pay_pro_rata,
        handlers::organizations::validate_registration,
        handlers::organizations::deactivate,
        handlers::organizations::list_titles,
        handlers::organizations::mark_overdue_titles,

        // --- Modules ---
        handlers::modules::list_modules,
        handlers::modules::contract_module,
        handlers::modules::cancel_module,
        handlers::modules::list_pending_setups,
        handlers::modules::begin_setup,
        handlers::modules::complete_setup,

        // --- Credits ---
        handlers::credits::list_packages,
        handlers::credits::get_balance,
        handlers::credits::purchase_credits,
        handlers::credits::consume_credits,
        handlers::credits::get_purchase_history,

        // --- Payment ---
        handlers::payment::get_payment_config,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            handlers::auth::RegisterPayload,
            handlers::auth::LoginPayload,
            handlers::auth::LoginResponse,

            // --- Organizations ---
            models::organization::OrganizationStatus,
            models::organization::PendingReason,
            models::organization::Organization,
            models::organization::RemainingSteps,
            handlers::organizations::PayProRataPayload,

            // --- Finance ---
            models::finance::TitleKind,
            models::finance::TitleStatus,
            models::finance::FinancialTitle,

            // --- Catálogo ---
            models::catalog::Plan,
            models::catalog::Module,
            models::catalog::CreditPackage,

            // --- Modules ---
            models::provisioning::ContractStatus,
            models::provisioning::SetupStatus,
            models::provisioning::ModuleContract,
            models::provisioning::ModuleSetup,
            models::provisioning::ModuleOverview,
            handlers::modules::ContractModulePayload,
            handlers::modules::CancelModulePayload,
            handlers::modules::CompleteSetupPayload,

            // --- Credits ---
            models::credit::CreditBalance,
            models::credit::CreditPurchase,
            handlers::credits::PurchaseCreditsPayload,
            handlers::credits::ConsumeCreditsPayload,

            // --- Events / Payment ---
            models::events::DomainEvent,
            handlers::payment::InstrumentPayload,
            services::payment::ConfigCheck,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Organizations", description = "Funil de Ativação e Títulos"),
        (name = "Modules", description = "Contratação e Ciclo de Vida dos Módulos"),
        (name = "Setups", description = "Fila de Setups da Equipe"),
        (name = "Credits", description = "Loja e Saldo de Créditos"),
        (name = "Payment", description = "Diagnóstico do Gateway de Pagamento")
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
