// src/models/events.rs
//
// Eventos de domínio retornados pelas transições. A camada de apresentação
// decide como notificar (toast, e-mail, log); o núcleo só descreve o que
// aconteceu.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ContractSigned { organization_id: Uuid },
    ProRataTitleCreated { title_id: Uuid, value: Decimal },
    ProRataPaid { title_id: Uuid },
    OrganizationActivated { organization_id: Uuid },
    OrganizationDeactivated { organization_id: Uuid },
    ModuleContracted { organization_id: Uuid, module_id: Uuid },
    SetupStarted { setup_id: Uuid },
    ModuleConfigured { organization_id: Uuid, module_id: Uuid },
    ModuleCancelled { organization_id: Uuid, module_id: Uuid },
    CreditsPurchased { organization_id: Uuid, credits: i32 },
    CreditsConsumed { organization_id: Uuid, amount: i64 },
}

/// Resultado de uma transição: o novo estado + os eventos emitidos.
/// Uma repetição idempotente retorna o estado atual com `events` vazio.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transition<T> {
    pub state: T,
    pub events: Vec<DomainEvent>,
}

impl<T> Transition<T> {
    pub fn advanced(state: T, events: Vec<DomainEvent>) -> Self {
        Self { state, events }
    }

    /// A operação já tinha acontecido; devolve o estado atual sem eventos.
    pub fn noop(state: T) -> Self {
        Self { state, events: Vec::new() }
    }
}
