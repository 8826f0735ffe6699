// src/services/credits.rs
//
// Ledger de créditos de análise. Créditos não expiram e não existe
// qualquer lógica de decaimento: o saldo só sobe por compra concluída e
// só desce por consumo de execução, nunca abaixo de zero.

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogStore, CreditStore},
    models::{
        catalog::CreditPackage,
        credit::{CreditBalance, CreditPurchase},
        events::{DomainEvent, Transition},
    },
    services::payment::PaymentOutcome,
};

#[derive(Clone)]
pub struct CreditLedgerService {
    credits: Arc<dyn CreditStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CreditLedgerService {
    pub fn new(credits: Arc<dyn CreditStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { credits, catalog }
    }

    /// Catálogo de pacotes exibido na loja de créditos.
    pub async fn list_packages(&self) -> Result<Vec<CreditPackage>, AppError> {
        self.catalog.list_packages().await
    }

    /// Pacote + preço para o checkout cobrar antes de creditar.
    pub async fn package_quote(&self, package_id: Uuid) -> Result<CreditPackage, AppError> {
        self.catalog
            .find_package(package_id)
            .await?
            .ok_or(AppError::PackageNotFound)
    }

    /// Aplica o desfecho da compra de pacote. Sucesso credita o saldo e
    /// grava a compra na mesma transação; recusa não toca o saldo.
    pub async fn purchase_package(
        &self,
        organization_id: Uuid,
        package_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<Transition<CreditBalance>, AppError> {
        let package = self.package_quote(package_id).await?;

        match outcome {
            PaymentOutcome::Failed { reason } => {
                tracing::warn!(
                    organization_id = %organization_id,
                    package_id = %package_id,
                    "Compra de créditos recusada: {}", reason
                );
                Err(AppError::PaymentFailed(reason))
            }
            PaymentOutcome::Succeeded { .. } => {
                let (balance, _purchase) = self
                    .credits
                    .apply_purchase(organization_id, package.id, package.credits, package.price)
                    .await?;

                tracing::info!(
                    organization_id = %organization_id,
                    credits = package.credits,
                    available = balance.available,
                    "Pacote de créditos aplicado"
                );

                Ok(Transition::advanced(
                    balance,
                    vec![DomainEvent::CreditsPurchased {
                        organization_id,
                        credits: package.credits,
                    }],
                ))
            }
        }
    }

    /// Débito reportado pela execução de um módulo.
    pub async fn consume(
        &self,
        organization_id: Uuid,
        amount: i64,
    ) -> Result<Transition<CreditBalance>, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidInput(
                "quantidade de créditos deve ser positiva".to_string(),
            ));
        }

        let balance = self.credits.consume(organization_id, amount).await?;

        Ok(Transition::advanced(
            balance,
            vec![DomainEvent::CreditsConsumed {
                organization_id,
                amount,
            }],
        ))
    }

    /// Saldo atual; organização sem compra alguma tem saldo zero.
    pub async fn balance(&self, organization_id: Uuid) -> Result<CreditBalance, AppError> {
        Ok(self
            .credits
            .balance(organization_id)
            .await?
            .unwrap_or_else(|| CreditBalance::empty(organization_id)))
    }

    pub async fn purchase_history(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<CreditPurchase>, AppError> {
        self.credits.purchase_history(organization_id).await
    }
}
