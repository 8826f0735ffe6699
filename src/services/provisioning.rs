// src/services/provisioning.rs
//
// Máquina de estados do contrato de módulo:
// `NotContracted → Contracted → Setup → Configured`, com cancelamento de
// qualquer contrato vivo de volta para `NotContracted`. A taxa de setup
// é liquidada no gateway ANTES de qualquer escrita; recusa não cria linha.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogStore, ModuleStore},
    models::{
        catalog::Module,
        events::{DomainEvent, Transition},
        provisioning::{
            ContractStatus, ModuleContract, ModuleOverview, ModuleSetup, SetupContact,
            SetupStatus,
        },
    },
    services::payment::PaymentOutcome,
};

/// Rótulo exibido no console para cada status de contrato. Função pura:
/// não existe campo armazenado para o badge.
pub fn status_badge(status: ContractStatus) -> &'static str {
    match status {
        ContractStatus::NotContracted => "não contratada",
        ContractStatus::Contracted => "necessita configuração",
        ContractStatus::Setup => "em setup",
        ContractStatus::Configured => "configurada",
    }
}

#[derive(Clone)]
pub struct ModuleProvisioningService {
    modules: Arc<dyn ModuleStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl ModuleProvisioningService {
    pub fn new(modules: Arc<dyn ModuleStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { modules, catalog }
    }

    /// Contrato vivo da organização para o módulo, se houver. O checkout
    /// consulta antes de cobrar: retry depois de uma resposta lenta
    /// devolve o contrato existente em vez de cobrar de novo.
    pub async fn live_contract(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
    ) -> Result<Option<ModuleContract>, AppError> {
        self.modules
            .find_live_contract(organization_id, module_id)
            .await
    }

    /// Módulo + preço para o checkout, validando a pré-condição
    /// `not_contracted` ANTES da cobrança (evita cobrar duas vezes num
    /// retry depois de resposta lenta).
    pub async fn contract_quote(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
    ) -> Result<Module, AppError> {
        let module = self
            .catalog
            .find_module(module_id)
            .await?
            .ok_or(AppError::ModuleNotFound)?;

        if !module.active {
            return Err(AppError::InvalidState(
                "módulo indisponível para contratação".to_string(),
            ));
        }

        if self
            .modules
            .find_live_contract(organization_id, module_id)
            .await?
            .is_some()
        {
            return Err(AppError::InvalidState("módulo já contratado".to_string()));
        }

        Ok(module)
    }

    /// Aplica o desfecho da cobrança da taxa de setup. Sucesso cria o
    /// contrato e o item de setup numa transação; recusa não cria nada.
    pub async fn contract_module(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
        outcome: PaymentOutcome,
        contact: SetupContact,
    ) -> Result<Transition<ModuleContract>, AppError> {
        if contact.name.trim().is_empty() || contact.phone.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "contato de setup (nome e telefone) é obrigatório".to_string(),
            ));
        }

        self.catalog
            .find_module(module_id)
            .await?
            .ok_or(AppError::ModuleNotFound)?;

        // Duas tentativas correndo em paralelo: a segunda encontra o
        // contrato vivo e devolve o estado atual sem duplicar nada.
        if let Some(existing) = self
            .modules
            .find_live_contract(organization_id, module_id)
            .await?
        {
            return Ok(Transition::noop(existing));
        }

        match outcome {
            PaymentOutcome::Failed { reason } => {
                tracing::warn!(
                    organization_id = %organization_id,
                    module_id = %module_id,
                    "Taxa de setup recusada: {}", reason
                );
                Err(AppError::PaymentFailed(reason))
            }
            PaymentOutcome::Succeeded { .. } => {
                let (contract, setup) = self
                    .modules
                    .create_contract_with_setup(organization_id, module_id, Utc::now(), contact)
                    .await?;

                tracing::info!(
                    organization_id = %organization_id,
                    module_id = %module_id,
                    setup_id = %setup.id,
                    "Módulo contratado; setup aguardando a equipe"
                );

                Ok(Transition::advanced(
                    contract,
                    vec![DomainEvent::ModuleContracted {
                        organization_id,
                        module_id,
                    }],
                ))
            }
        }
    }

    /// Staff: começa a trabalhar num item de setup.
    pub async fn begin_setup(&self, setup_id: Uuid) -> Result<Transition<ModuleSetup>, AppError> {
        let setup = self
            .modules
            .find_setup(setup_id)
            .await?
            .ok_or(AppError::SetupNotFound)?;

        match setup.status {
            SetupStatus::Pending => {}
            // Já iniciado ou concluído: repetição devolve o estado atual.
            SetupStatus::InProgress | SetupStatus::Completed => {
                return Ok(Transition::noop(setup));
            }
        }

        let contract = self
            .modules
            .find_contract(setup.contract_id)
            .await?
            .ok_or(AppError::SetupNotFound)?;

        // Pré-condição, não conflito: nenhum retry faz um contrato
        // cancelado voltar a ser configurável.
        if contract.status == ContractStatus::NotContracted {
            return Err(AppError::InvalidState(
                "contrato foi cancelado; setup não pode ser iniciado".to_string(),
            ));
        }

        let (updated_setup, _) = self
            .modules
            .begin_setup(setup.id, setup.version, contract.id, contract.version)
            .await?;

        Ok(Transition::advanced(
            updated_setup,
            vec![DomainEvent::SetupStarted { setup_id }],
        ))
    }

    /// Staff: conclui o setup e configura o módulo. Idempotente: repetir
    /// sobre um contrato já `Configured` é sucesso sem novo evento.
    pub async fn complete_setup(
        &self,
        setup_id: Uuid,
        notes: Option<String>,
    ) -> Result<Transition<ModuleSetup>, AppError> {
        let setup = self
            .modules
            .find_setup(setup_id)
            .await?
            .ok_or(AppError::SetupNotFound)?;

        let contract = self
            .modules
            .find_contract(setup.contract_id)
            .await?
            .ok_or(AppError::SetupNotFound)?;

        if contract.status == ContractStatus::Configured {
            return Ok(Transition::noop(setup));
        }

        if contract.status == ContractStatus::NotContracted {
            return Err(AppError::InvalidState(
                "contrato foi cancelado; setup não pode ser concluído".to_string(),
            ));
        }

        let (updated_setup, updated_contract) = self
            .modules
            .complete_setup(
                setup.id,
                setup.version,
                contract.id,
                contract.version,
                Utc::now(),
                notes,
            )
            .await?;

        tracing::info!(
            organization_id = %updated_contract.organization_id,
            module_id = %updated_contract.module_id,
            "Setup concluído; módulo configurado"
        );

        Ok(Transition::advanced(
            updated_setup,
            vec![DomainEvent::ModuleConfigured {
                organization_id: updated_contract.organization_id,
                module_id: updated_contract.module_id,
            }],
        ))
    }

    /// Cancela um contrato vivo. O motivo é obrigatório (auditoria); a
    /// linha cancelada permanece no banco.
    pub async fn cancel(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
        reason: &str,
    ) -> Result<Transition<ModuleContract>, AppError> {
        // Validado antes de qualquer leitura/escrita.
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput(
                "o motivo do cancelamento é obrigatório".to_string(),
            ));
        }

        let contract = self
            .modules
            .find_live_contract(organization_id, module_id)
            .await?
            .ok_or_else(|| AppError::InvalidState("módulo não está contratado".to_string()))?;

        let cancelled = self
            .modules
            .cancel_contract(contract.id, contract.version, Utc::now(), reason.to_string())
            .await?;

        tracing::info!(
            organization_id = %organization_id,
            module_id = %module_id,
            "Módulo cancelado: {}", reason
        );

        Ok(Transition::advanced(
            cancelled,
            vec![DomainEvent::ModuleCancelled {
                organization_id,
                module_id,
            }],
        ))
    }

    /// Grade de módulos do console: catálogo ativo + status derivado.
    pub async fn module_overview(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<ModuleOverview>, AppError> {
        let modules = self.catalog.list_active_modules().await?;
        let contracts = self.modules.list_live_contracts(organization_id).await?;

        let overview = modules
            .into_iter()
            .map(|module| {
                let status = contracts
                    .iter()
                    .find(|c| c.module_id == module.id)
                    .map(|c| c.status)
                    .unwrap_or(ContractStatus::NotContracted);
                ModuleOverview {
                    badge: status_badge(status).to_string(),
                    status,
                    module,
                }
            })
            .collect();

        Ok(overview)
    }

    /// Fila de setups abertos para a equipe.
    pub async fn pending_setups(&self) -> Result<Vec<ModuleSetup>, AppError> {
        self.modules.list_open_setups().await
    }
}
