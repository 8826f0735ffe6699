// src/handlers/organizations.rs
//
// Funil de ativação: a UI chama as etapas na ordem, mas o handler não
// confia nisso; as pré-condições vivem no serviço. No pagamento, o
// handler consulta o estado ANTES de acionar o gateway para um retry
// depois de sucesso não gerar segunda cobrança.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::payment::InstrumentPayload,
    middleware::auth::{ensure_organization_access, AuthenticatedUser, StaffUser},
    models::{
        events::Transition,
        organization::{OrganizationStatus, PendingReason},
    },
    services::payment::Currency,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayProRataPayload {
    pub instrument: InstrumentPayload,
}

// GET /api/organizations/{id}/steps
#[utoipa::path(
    get,
    path = "/api/organizations/{id}/steps",
    tag = "Organizations",
    params(("id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 200, description = "Etapas já concluídas do funil"),
        (status = 404, description = "Organização não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_remaining_steps(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(organization_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    ensure_organization_access(&user, organization_id)?;

    let steps = app_state
        .lifecycle_service
        .remaining_steps(organization_id)
        .await?;

    Ok((StatusCode::OK, Json(steps)))
}

// POST /api/organizations/{id}/sign-contract
#[utoipa::path(
    post,
    path = "/api/organizations/{id}/sign-contract",
    tag = "Organizations",
    params(("id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 200, description = "Contrato assinado; título pro-rata emitido"),
        (status = 409, description = "Organização fora da etapa de assinatura")
    ),
    security(("api_jwt" = []))
)]
pub async fn sign_contract(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(organization_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    ensure_organization_access(&user, organization_id)?;

    let transition = app_state
        .lifecycle_service
        .sign_contract(organization_id)
        .await?;

    Ok((StatusCode::OK, Json(transition)))
}

// POST /api/organizations/{id}/pay-pro-rata
#[utoipa::path(
    post,
    path = "/api/organizations/{id}/pay-pro-rata",
    tag = "Organizations",
    params(("id" = Uuid, Path, description = "ID da organização")),
    request_body = PayProRataPayload,
    responses(
        (status = 200, description = "Pro-rata quitado; funil avança para validação"),
        (status = 402, description = "Cartão recusado; etapa continua retentável"),
        (status = 409, description = "Organização fora da etapa de pagamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn pay_pro_rata(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(organization_id): Path<Uuid>,
    Json(payload): Json<PayProRataPayload>,
) -> Result<impl IntoResponse, AppError> {
    ensure_organization_access(&user, organization_id)?;

    // Retry depois de um pagamento que já entrou: devolve o estado atual
    // sem acionar o gateway de novo.
    let organization = app_state
        .lifecycle_service
        .organization(organization_id)
        .await?;
    if organization.status == OrganizationStatus::Active
        || organization.pending_reason == Some(PendingReason::UserValidation)
    {
        return Ok((StatusCode::OK, Json(Transition::noop(organization))));
    }

    let title = app_state
        .lifecycle_service
        .pending_pro_rata_title(organization_id)
        .await?;

    let instrument = payload.instrument.into_instrument()?;
    let outcome = app_state
        .payment_gateway
        .charge(title.value, Currency::Brl, &instrument)
        .await?;

    let transition = app_state
        .lifecycle_service
        .pay_pro_rata(organization_id, outcome)
        .await?;

    Ok((StatusCode::OK, Json(transition)))
}

// POST /api/organizations/{id}/validate
#[utoipa::path(
    post,
    path = "/api/organizations/{id}/validate",
    tag = "Organizations",
    params(("id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 200, description = "Cadastro validado; organização ativa"),
        (status = 403, description = "Exclusivo da equipe"),
        (status = 409, description = "Organização fora da etapa de validação")
    ),
    security(("api_jwt" = []))
)]
pub async fn validate_registration(
    State(app_state): State<AppState>,
    StaffUser(_staff): StaffUser,
    Path(organization_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transition = app_state
        .lifecycle_service
        .complete_user_validation(organization_id)
        .await?;

    Ok((StatusCode::OK, Json(transition)))
}

// POST /api/organizations/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/organizations/{id}/deactivate",
    tag = "Organizations",
    params(("id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 200, description = "Organização desativada"),
        (status = 403, description = "Exclusivo da equipe")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate(
    State(app_state): State<AppState>,
    StaffUser(_staff): StaffUser,
    Path(organization_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transition = app_state.lifecycle_service.deactivate(organization_id).await?;

    Ok((StatusCode::OK, Json(transition)))
}

// GET /api/organizations/{id}/titles
#[utoipa::path(
    get,
    path = "/api/organizations/{id}/titles",
    tag = "Organizations",
    params(("id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 200, description = "Títulos financeiros da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_titles(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(organization_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    ensure_organization_access(&user, organization_id)?;

    let titles = app_state.lifecycle_service.titles(organization_id).await?;

    Ok((StatusCode::OK, Json(titles)))
}

// POST /api/titles/mark-overdue
#[utoipa::path(
    post,
    path = "/api/titles/mark-overdue",
    tag = "Organizations",
    responses(
        (status = 200, description = "Títulos vencidos marcados como atrasados"),
        (status = 403, description = "Exclusivo da equipe")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_overdue_titles(
    State(app_state): State<AppState>,
    StaffUser(_staff): StaffUser,
) -> Result<impl IntoResponse, AppError> {
    let marked = app_state.lifecycle_service.mark_overdue_titles().await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "marked": marked }))))
}
