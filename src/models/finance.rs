// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "title_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum TitleKind {
    ProRata,     // Primeira cobrança proporcional ao restante do mês
    Mensalidade, // Cobrança recorrente mensal
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "title_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum TitleStatus {
    Pending, // Aberto
    Paid,    // Quitado (transição Pending → Paid acontece exatamente uma vez)
    Overdue, // Vencido sem pagamento
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTitle {
    pub id: Uuid,

    pub organization_id: Uuid,

    pub kind: TitleKind,
    pub status: TitleStatus,

    #[schema(example = "249.90")]
    pub value: Decimal,

    #[schema(value_type = String, format = Date, example = "2026-09-05")]
    pub due_date: NaiveDate,

    pub payment_date: Option<DateTime<Utc>>,

    pub created_at: Option<DateTime<Utc>>,
}

/// Título ainda não persistido. A criação sempre acontece dentro da mesma
/// transação que avança o estado da organização.
#[derive(Debug, Clone)]
pub struct NewFinancialTitle {
    pub organization_id: Uuid,
    pub kind: TitleKind,
    pub value: Decimal,
    pub due_date: NaiveDate,
}
