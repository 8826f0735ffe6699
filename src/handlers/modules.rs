// src/handlers/modules.rs
//
// Contratação e ciclo de vida dos módulos. O checkout valida a
// pré-condição e o preço (quote) ANTES de cobrar; o serviço aplica o
// desfecho depois. A fila de setups é exclusiva da equipe.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::payment::InstrumentPayload,
    middleware::auth::{own_organization, AuthenticatedUser, StaffUser},
    models::{events::Transition, provisioning::SetupContact},
    services::payment::Currency,
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractModulePayload {
    #[validate(length(min = 1, message = "O nome do contato de setup é obrigatório."))]
    #[schema(example = "Maria Souza")]
    pub contact_name: String,

    #[validate(length(min = 1, message = "O telefone do contato de setup é obrigatório."))]
    #[schema(example = "+55 11 91234-5678")]
    pub contact_phone: String,

    pub instrument: InstrumentPayload,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelModulePayload {
    #[validate(length(min = 1, message = "O motivo do cancelamento é obrigatório."))]
    #[schema(example = "Equipe comercial não usa mais o módulo.")]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSetupPayload {
    pub notes: Option<String>,
}

// ---
// Handlers
// ---

// GET /api/modules
#[utoipa::path(
    get,
    path = "/api/modules",
    tag = "Modules",
    responses(
        (status = 200, description = "Catálogo de módulos com o badge por organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_modules(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let organization_id = own_organization(&user)?;

    let overview = app_state
        .provisioning_service
        .module_overview(organization_id)
        .await?;

    Ok((StatusCode::OK, Json(overview)))
}

// POST /api/modules/{id}/contract
#[utoipa::path(
    post,
    path = "/api/modules/{id}/contract",
    tag = "Modules",
    params(("id" = Uuid, Path, description = "ID do módulo")),
    request_body = ContractModulePayload,
    responses(
        (status = 200, description = "Módulo contratado; setup na fila da equipe"),
        (status = 402, description = "Taxa de setup recusada; nada foi criado"),
        (status = 409, description = "Módulo já contratado ou indisponível")
    ),
    security(("api_jwt" = []))
)]
pub async fn contract_module(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(module_id): Path<Uuid>,
    Json(payload): Json<ContractModulePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let organization_id = own_organization(&user)?;

    // Retry depois de uma contratação que já entrou: devolve o contrato
    // existente sem acionar o gateway de novo.
    if let Some(existing) = app_state
        .provisioning_service
        .live_contract(organization_id, module_id)
        .await?
    {
        return Ok((StatusCode::OK, Json(Transition::noop(existing))));
    }

    let module = app_state
        .provisioning_service
        .contract_quote(organization_id, module_id)
        .await?;

    let instrument = payload.instrument.into_instrument()?;
    let outcome = app_state
        .payment_gateway
        .charge(module.price, Currency::Brl, &instrument)
        .await?;

    let transition = app_state
        .provisioning_service
        .contract_module(
            organization_id,
            module_id,
            outcome,
            SetupContact {
                name: payload.contact_name,
                phone: payload.contact_phone,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(transition)))
}

// POST /api/modules/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/modules/{id}/cancel",
    tag = "Modules",
    params(("id" = Uuid, Path, description = "ID do módulo")),
    request_body = CancelModulePayload,
    responses(
        (status = 200, description = "Contrato cancelado; linha mantida para auditoria"),
        (status = 409, description = "Módulo não está contratado")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_module(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(module_id): Path<Uuid>,
    Json(payload): Json<CancelModulePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let organization_id = own_organization(&user)?;

    let transition = app_state
        .provisioning_service
        .cancel(organization_id, module_id, &payload.reason)
        .await?;

    Ok((StatusCode::OK, Json(transition)))
}

// GET /api/setups
#[utoipa::path(
    get,
    path = "/api/setups",
    tag = "Setups",
    responses(
        (status = 200, description = "Itens de setup aguardando ou em andamento"),
        (status = 403, description = "Exclusivo da equipe")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_pending_setups(
    State(app_state): State<AppState>,
    StaffUser(_staff): StaffUser,
) -> Result<impl IntoResponse, AppError> {
    let setups = app_state.provisioning_service.pending_setups().await?;

    Ok((StatusCode::OK, Json(setups)))
}

// POST /api/setups/{id}/begin
#[utoipa::path(
    post,
    path = "/api/setups/{id}/begin",
    tag = "Setups",
    params(("id" = Uuid, Path, description = "ID do item de setup")),
    responses(
        (status = 200, description = "Setup em andamento; módulo em setup"),
        (status = 403, description = "Exclusivo da equipe"),
        (status = 404, description = "Item de setup não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn begin_setup(
    State(app_state): State<AppState>,
    StaffUser(_staff): StaffUser,
    Path(setup_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transition = app_state.provisioning_service.begin_setup(setup_id).await?;

    Ok((StatusCode::OK, Json(transition)))
}

// POST /api/setups/{id}/complete
#[utoipa::path(
    post,
    path = "/api/setups/{id}/complete",
    tag = "Setups",
    params(("id" = Uuid, Path, description = "ID do item de setup")),
    request_body = CompleteSetupPayload,
    responses(
        (status = 200, description = "Setup concluído; módulo configurado"),
        (status = 403, description = "Exclusivo da equipe"),
        (status = 409, description = "Contrato foi cancelado no meio do setup")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_setup(
    State(app_state): State<AppState>,
    StaffUser(_staff): StaffUser,
    Path(setup_id): Path<Uuid>,
    Json(payload): Json<CompleteSetupPayload>,
) -> Result<impl IntoResponse, AppError> {
    let transition = app_state
        .provisioning_service
        .complete_setup(setup_id, payload.notes)
        .await?;

    Ok((StatusCode::OK, Json(transition)))
}
