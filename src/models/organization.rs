// src/models/organization.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "organization_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    Pending,  // Em funil de ativação
    Active,   // Cliente pagante
    Inactive, // Desativada (nunca é apagada do banco)
}

/// Motivo pelo qual a organização ainda está pendente. A ordem é fixa:
/// `ContractSignature → ProRataPayment → UserValidation → (nenhum)`.
/// Nenhuma transição anda para trás nem pula etapa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pending_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum PendingReason {
    ContractSignature,
    ProRataPayment,
    UserValidation,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "Vendas & Cia Ltda")]
    pub name: String,

    #[schema(example = "12.345.678/0001-90")]
    pub document: Option<String>,

    pub plan_id: Uuid,

    pub status: OrganizationStatus,

    // Invariante: status = Active ⇒ pending_reason = None.
    pub pending_reason: Option<PendingReason>,

    pub contract_signed_at: Option<DateTime<Utc>>,

    // Versão para lock otimista: toda escrita exige a versão lida.
    #[schema(ignore)]
    pub version: i32,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Campos de uma organização recém-registrada. Toda organização nasce em
/// `Pending(ContractSignature)`.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub document: Option<String>,
    pub plan_id: Uuid,
}

/// Visão derivada "o que falta para ativar", consumida pela UI sem
/// reimplementar as regras do funil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemainingSteps {
    #[schema(example = true)]
    pub contract_signed: bool,
    #[schema(example = false)]
    pub payment_completed: bool,
    #[schema(example = false)]
    pub registration_completed: bool,
}
