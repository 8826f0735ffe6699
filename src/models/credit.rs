// src/models/credit.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Saldo de créditos de análise da organização. Créditos não expiram:
/// só aumentam por compra de pacote e só diminuem por execução de módulo.
/// `available` nunca fica negativo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalance {
    pub organization_id: Uuid,

    #[schema(example = 170)]
    pub available: i64,

    #[schema(ignore)]
    pub version: i32,
}

impl CreditBalance {
    /// Saldo zerado para organizações que nunca compraram créditos.
    pub fn empty(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            available: 0,
            version: 0,
        }
    }
}

/// Registro de auditoria de uma compra de pacote concluída.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditPurchase {
    pub id: Uuid,

    pub organization_id: Uuid,
    pub package_id: Uuid,

    #[schema(example = 150)]
    pub credits: i32,

    #[schema(example = "199.00")]
    pub amount_paid: Decimal,

    pub created_at: Option<DateTime<Utc>>,
}
