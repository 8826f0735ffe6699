// src/handlers/payment.rs
//
// Payload compartilhado de instrumento de pagamento + diagnóstico de
// configuração do gateway, consultado pela UI antes do checkout.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError, config::AppState, services::payment::PaymentInstrument,
};

/// Como o cliente quer pagar: cartão salvo ou cartão novo tokenizado.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InstrumentPayload {
    SavedCard {
        payment_method_id: String,
        customer_id: Option<String>,
    },
    NewCard {
        token: String,
    },
}

impl InstrumentPayload {
    pub fn into_instrument(self) -> Result<PaymentInstrument, AppError> {
        match self {
            InstrumentPayload::SavedCard {
                payment_method_id,
                customer_id,
            } => {
                if payment_method_id.trim().is_empty() {
                    return Err(AppError::InvalidInput(
                        "identificador do cartão salvo é obrigatório".to_string(),
                    ));
                }
                Ok(PaymentInstrument::SavedCard {
                    payment_method_id,
                    customer_id,
                })
            }
            InstrumentPayload::NewCard { token } => {
                if token.trim().is_empty() {
                    return Err(AppError::InvalidInput(
                        "token do cartão é obrigatório".to_string(),
                    ));
                }
                Ok(PaymentInstrument::NewCardToken { token })
            }
        }
    }
}

// GET /api/payment/config
#[utoipa::path(
    get,
    path = "/api/payment/config",
    tag = "Payment",
    responses(
        (status = 200, description = "Diagnóstico de configuração do gateway")
    )
)]
pub async fn get_payment_config(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let check = app_state.payment_gateway.validate_config();
    Ok((StatusCode::OK, Json(check)))
}
