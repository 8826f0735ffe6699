// src/models/provisioning.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::catalog::Module;

// --- Enums (Mapeando o Postgres) ---

/// Estado do contrato de um módulo para uma organização.
/// `NotContracted → Contracted → Setup → Configured`, com cancelamento
/// levando de volta a `NotContracted` (a linha cancelada fica no banco
/// para auditoria; recontratar cria uma linha nova).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "contract_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    NotContracted,
    Contracted,
    Setup,
    Configured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "setup_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum SetupStatus {
    Pending,
    InProgress,
    Completed,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleContract {
    pub id: Uuid,

    pub organization_id: Uuid,
    pub module_id: Uuid,

    pub status: ContractStatus,

    pub contracted_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Sempre preenchido quando `cancelled_at` está preenchido
    /// (o cancelamento exige motivo).
    pub cancel_reason: Option<String>,

    #[schema(ignore)]
    pub version: i32,
}

/// Item de trabalho para a equipe configurar um módulo recém-contratado.
/// Completá-lo é a única transição que leva o contrato a `Configured`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSetup {
    pub id: Uuid,

    pub contract_id: Uuid,

    #[schema(example = "Maria Souza")]
    pub contact_name: String,

    #[schema(example = "+55 11 98765-4321")]
    pub contact_phone: String,

    pub status: SetupStatus,

    pub notes: Option<String>,

    #[schema(ignore)]
    pub version: i32,

    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Contato informado na contratação: quem a equipe procura para o setup.
#[derive(Debug, Clone)]
pub struct SetupContact {
    pub name: String,
    pub phone: String,
}

/// Entrada da grade de módulos do console: módulo do catálogo + estado
/// derivado para esta organização.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOverview {
    pub module: Module,

    pub status: ContractStatus,

    /// Rótulo pt-BR exibido no console, derivado puramente do status.
    #[schema(example = "necessita configuração")]
    pub badge: String,
}
