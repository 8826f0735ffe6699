// src/handlers/credits.rs
//
// Loja e razão de créditos. As rotas operam sempre sobre a organização
// do próprio usuário; o consumo chega como callback da execução de um
// módulo.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::payment::InstrumentPayload,
    middleware::auth::{own_organization, AuthenticatedUser},
    services::payment::Currency,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCreditsPayload {
    pub package_id: Uuid,
    pub instrument: InstrumentPayload,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeCreditsPayload {
    #[schema(example = 3)]
    pub amount: i64,
}

// GET /api/credits/packages
#[utoipa::path(
    get,
    path = "/api/credits/packages",
    tag = "Credits",
    responses(
        (status = 200, description = "Pacotes de créditos à venda")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_packages(
    State(app_state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let packages = app_state.credit_service.list_packages().await?;

    Ok((StatusCode::OK, Json(packages)))
}

// GET /api/credits/balance
#[utoipa::path(
    get,
    path = "/api/credits/balance",
    tag = "Credits",
    responses(
        (status = 200, description = "Saldo atual (zero se nunca houve compra)")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_balance(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let organization_id = own_organization(&user)?;

    let balance = app_state.credit_service.balance(organization_id).await?;

    Ok((StatusCode::OK, Json(balance)))
}

// POST /api/credits/purchase
#[utoipa::path(
    post,
    path = "/api/credits/purchase",
    tag = "Credits",
    request_body = PurchaseCreditsPayload,
    responses(
        (status = 200, description = "Créditos aplicados ao saldo"),
        (status = 402, description = "Cobrança recusada; saldo intocado"),
        (status = 404, description = "Pacote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn purchase_credits(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<PurchaseCreditsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let organization_id = own_organization(&user)?;

    let package = app_state
        .credit_service
        .package_quote(payload.package_id)
        .await?;

    let instrument = payload.instrument.into_instrument()?;
    let outcome = app_state
        .payment_gateway
        .charge(package.price, Currency::Brl, &instrument)
        .await?;

    let transition = app_state
        .credit_service
        .purchase_package(organization_id, package.id, outcome)
        .await?;

    Ok((StatusCode::OK, Json(transition)))
}

// POST /api/credits/consume
#[utoipa::path(
    post,
    path = "/api/credits/consume",
    tag = "Credits",
    request_body = ConsumeCreditsPayload,
    responses(
        (status = 200, description = "Créditos debitados"),
        (status = 422, description = "Saldo insuficiente; nada debitado")
    ),
    security(("api_jwt" = []))
)]
pub async fn consume_credits(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ConsumeCreditsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let organization_id = own_organization(&user)?;

    let transition = app_state
        .credit_service
        .consume(organization_id, payload.amount)
        .await?;

    Ok((StatusCode::OK, Json(transition)))
}

// GET /api/credits/history
#[utoipa::path(
    get,
    path = "/api/credits/history",
    tag = "Credits",
    responses(
        (status = 200, description = "Compras de créditos, mais recentes primeiro")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_purchase_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let organization_id = own_organization(&user)?;

    let history = app_state
        .credit_service
        .purchase_history(organization_id)
        .await?;

    Ok((StatusCode::OK, Json(history)))
}
