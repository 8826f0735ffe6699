// src/services/payment.rs
//
// Fronteira com o provedor de cartão. Os serviços de domínio nunca veem
// tipos do Stripe: recebem um `PaymentOutcome` já liquidado e aplicam o
// resultado como escrita local. Nenhuma transação de banco fica aberta
// enquanto a cobrança externa está em andamento.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::env;
use stripe::{
    Client, CreatePaymentIntent, CreatePaymentMethod, CreatePaymentMethodCardUnion,
    PaymentIntent, PaymentIntentStatus, PaymentMethod, PaymentMethodTypeFilter, TokenParams,
};
use utoipa::ToSchema;

use crate::common::error::AppError;

/// Moedas aceitas no checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Brl,
    Usd,
}

impl Currency {
    fn to_stripe(self) -> stripe::Currency {
        match self {
            Currency::Brl => stripe::Currency::BRL,
            Currency::Usd => stripe::Currency::USD,
        }
    }
}

/// Instrumento de pagamento escolhido pelo cliente: cartão já salvo
/// (sem redigitar dados) ou um cartão novo tokenizado pelo front.
#[derive(Debug, Clone)]
pub enum PaymentInstrument {
    SavedCard {
        payment_method_id: String,
        customer_id: Option<String>,
    },
    NewCardToken {
        token: String,
    },
}

/// Resultado liquidado de uma tentativa de cobrança. Recusa do emissor é
/// um valor (`Failed`), não um `Err`: erro de transporte/configuração é
/// que vira `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded { reference: String },
    Failed { reason: String },
}

/// Diagnóstico de configuração, consultável antes de qualquer cobrança
/// para a UI exibir o problema antes do cliente tentar pagar.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCheck {
    pub valid: bool,
    pub message: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Cobra `amount` no instrumento dado e retorna o desfecho liquidado.
    /// Chamar no máximo uma vez por tentativa lógica de cobrança; quem
    /// garante isso são as máquinas de estado chamadoras.
    async fn charge(
        &self,
        amount: Decimal,
        currency: Currency,
        instrument: &PaymentInstrument,
    ) -> Result<PaymentOutcome, AppError>;

    /// Verificação de configuração sem tocar a rede.
    fn validate_config(&self) -> ConfigCheck;
}

// ---
// Implementação Stripe (PaymentIntents confirmados de forma síncrona)
// ---

#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        let client = Client::new(secret_key.clone());
        Self { client, secret_key }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret_key = env::var("STRIPE_SECRET_KEY")
            .map_err(|_| AppError::ConfigurationError("STRIPE_SECRET_KEY ausente".into()))?;
        Ok(Self::new(secret_key))
    }

    /// Valor em reais → centavos, como o provedor espera.
    fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
        (amount * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| AppError::InvalidInput("valor de cobrança inválido".to_string()))
    }

    /// Token de cartão novo → PaymentMethod utilizável no intent.
    async fn payment_method_from_token(&self, token: &str) -> Result<String, AppError> {
        let mut params = CreatePaymentMethod::new();
        params.type_ = Some(PaymentMethodTypeFilter::Card);
        params.card = Some(CreatePaymentMethodCardUnion::TokenParams(TokenParams {
            token: token.to_string(),
        }));

        let method = PaymentMethod::create(&self.client, params)
            .await
            .map_err(map_stripe_error)?;

        Ok(method.id.to_string())
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn charge(
        &self,
        amount: Decimal,
        currency: Currency,
        instrument: &PaymentInstrument,
    ) -> Result<PaymentOutcome, AppError> {
        let check = self.validate_config();
        if !check.valid {
            return Err(AppError::ConfigurationError(
                check.message.unwrap_or_else(|| "chave secreta inválida".to_string()),
            ));
        }

        let minor_units = Self::to_minor_units(amount)?;

        let (payment_method_id, customer_id) = match instrument {
            PaymentInstrument::SavedCard {
                payment_method_id,
                customer_id,
            } => (payment_method_id.clone(), customer_id.clone()),
            PaymentInstrument::NewCardToken { token } => {
                (self.payment_method_from_token(token).await?, None)
            }
        };

        let mut params = CreatePaymentIntent::new(minor_units, currency.to_stripe());
        params.payment_method = Some(
            payment_method_id
                .parse()
                .map_err(|_| AppError::InvalidInput("payment_method inválido".to_string()))?,
        );
        if let Some(customer) = customer_id {
            params.customer = Some(
                customer
                    .parse()
                    .map_err(|_| AppError::InvalidInput("customer inválido".to_string()))?,
            );
        }
        params.payment_method_types = Some(vec!["card".to_string()]);
        params.confirm = Some(true);

        let intent = match PaymentIntent::create(&self.client, params).await {
            Ok(intent) => intent,
            // Recusa do emissor chega como erro de cartão: vira desfecho,
            // não erro, para o chamador poder repetir a etapa.
            Err(stripe::StripeError::Stripe(request_error))
                if request_error.error_type == stripe::ErrorType::Card =>
            {
                let reason = request_error
                    .message
                    .unwrap_or_else(|| "cartão recusado".to_string());
                tracing::warn!("Cobrança recusada pelo emissor: {}", reason);
                return Ok(PaymentOutcome::Failed { reason });
            }
            Err(other) => return Err(map_stripe_error(other)),
        };

        match intent.status {
            PaymentIntentStatus::Succeeded => Ok(PaymentOutcome::Succeeded {
                reference: intent.id.to_string(),
            }),
            status => {
                let reason = intent
                    .last_payment_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| format!("pagamento não concluído ({status:?})"));
                tracing::warn!("Cobrança não concluída: {}", reason);
                Ok(PaymentOutcome::Failed { reason })
            }
        }
    }

    fn validate_config(&self) -> ConfigCheck {
        if self.secret_key.trim().is_empty() {
            return ConfigCheck {
                valid: false,
                message: Some("Chave secreta do gateway não configurada.".to_string()),
            };
        }
        if !self.secret_key.starts_with("sk_") && !self.secret_key.starts_with("rk_") {
            return ConfigCheck {
                valid: false,
                message: Some("Chave secreta do gateway em formato inválido.".to_string()),
            };
        }
        ConfigCheck {
            valid: true,
            message: None,
        }
    }
}

fn map_stripe_error(err: stripe::StripeError) -> AppError {
    AppError::InternalServerError(anyhow::Error::new(err).context("chamada ao gateway falhou"))
}
