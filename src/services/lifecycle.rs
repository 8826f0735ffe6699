// src/services/lifecycle.rs
//
// Máquina de estados do funil de ativação da organização:
// `Pending(ContractSignature) → Pending(ProRataPayment) →
//  Pending(UserValidation) → Active`, sem pular etapa e sem voltar.
// Repetir uma etapa já concluída devolve o estado atual como sucesso
// (o cliente pode retentar depois de um timeout sem saber que a primeira
// tentativa chegou).

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogStore, FinanceStore, OrganizationStore},
    models::{
        events::{DomainEvent, Transition},
        finance::{FinancialTitle, NewFinancialTitle, TitleKind, TitleStatus},
        organization::{Organization, OrganizationStatus, PendingReason, RemainingSteps},
    },
};

/// Dias de janela para pagar o título pro-rata.
const PRO_RATA_DUE_DAYS: i64 = 5;

#[derive(Clone)]
pub struct OrganizationLifecycleService {
    organizations: Arc<dyn OrganizationStore>,
    finance: Arc<dyn FinanceStore>,
    catalog: Arc<dyn CatalogStore>,
}

/// Valor pro-rata: dias restantes do mês (contando hoje) × diária do plano.
/// Assinar no dia 1 cobra o mês cheio; assinar no último dia cobra um dia.
pub fn pro_rata_value(monthly_price: Decimal, reference: NaiveDate) -> Decimal {
    let total_days = days_in_month(reference);
    let remaining_days = total_days - reference.day() + 1;
    (monthly_price * Decimal::from(remaining_days) / Decimal::from(total_days)).round_dp(2)
}

fn days_in_month(date: NaiveDate) -> u32 {
    match date.month() {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            // Fevereiro: 29 em ano bissexto.
            if NaiveDate::from_ymd_opt(date.year(), 2, 29).is_some() {
                29
            } else {
                28
            }
        }
    }
}

/// Checklist "o que falta", derivado do estado sem regra nova na UI.
pub fn remaining_steps(organization: &Organization) -> RemainingSteps {
    match (organization.status, organization.pending_reason) {
        (OrganizationStatus::Active, _) => RemainingSteps {
            contract_signed: true,
            payment_completed: true,
            registration_completed: true,
        },
        (_, Some(PendingReason::ContractSignature)) => RemainingSteps {
            contract_signed: false,
            payment_completed: false,
            registration_completed: false,
        },
        (_, Some(PendingReason::ProRataPayment)) => RemainingSteps {
            contract_signed: true,
            payment_completed: false,
            registration_completed: false,
        },
        (_, Some(PendingReason::UserValidation)) => RemainingSteps {
            contract_signed: true,
            payment_completed: true,
            registration_completed: false,
        },
        // Inactive sem motivo pendente: o funil não se aplica mais.
        (_, None) => RemainingSteps {
            contract_signed: organization.contract_signed_at.is_some(),
            payment_completed: organization.contract_signed_at.is_some(),
            registration_completed: false,
        },
    }
}

impl OrganizationLifecycleService {
    pub fn new(
        organizations: Arc<dyn OrganizationStore>,
        finance: Arc<dyn FinanceStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            organizations,
            finance,
            catalog,
        }
    }

    async fn load(&self, organization_id: Uuid) -> Result<Organization, AppError> {
        self.organizations
            .find(organization_id)
            .await?
            .ok_or(AppError::OrganizationNotFound)
    }

    /// Estado atual da organização, para o checkout decidir se ainda há
    /// algo a cobrar antes de acionar o gateway.
    pub async fn organization(&self, organization_id: Uuid) -> Result<Organization, AppError> {
        self.load(organization_id).await
    }

    /// Assinatura do contrato. Cria exatamente um título pro-rata; chamar
    /// de novo com o contrato já assinado é sucesso sem efeito.
    pub async fn sign_contract(
        &self,
        organization_id: Uuid,
    ) -> Result<Transition<Organization>, AppError> {
        let organization = self.load(organization_id).await?;

        match (organization.status, organization.pending_reason) {
            (OrganizationStatus::Pending, Some(PendingReason::ContractSignature)) => {}
            // Já passou desta etapa: repetição é no-op de sucesso.
            (OrganizationStatus::Pending, Some(_)) | (OrganizationStatus::Active, _) => {
                return Ok(Transition::noop(organization));
            }
            _ => {
                return Err(AppError::InvalidState(
                    "organização não está aguardando assinatura de contrato".to_string(),
                ));
            }
        }

        let plan = self
            .catalog
            .find_plan(organization.plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)?;

        let now = Utc::now();
        let today = now.date_naive();
        let value = pro_rata_value(plan.price, today);
        let title = NewFinancialTitle {
            organization_id: organization.id,
            kind: TitleKind::ProRata,
            value,
            due_date: today + chrono::Duration::days(PRO_RATA_DUE_DAYS),
        };

        let (updated, created_title) = self
            .organizations
            .sign_contract(organization.id, organization.version, now, title)
            .await?;

        tracing::info!(
            organization_id = %updated.id,
            value = %created_title.value,
            "Contrato assinado; título pro-rata criado"
        );

        Ok(Transition::advanced(
            updated,
            vec![
                DomainEvent::ContractSigned {
                    organization_id,
                },
                DomainEvent::ProRataTitleCreated {
                    title_id: created_title.id,
                    value: created_title.value,
                },
            ],
        ))
    }

    /// Título pro-rata pendente, para o checkout saber quanto cobrar.
    pub async fn pending_pro_rata_title(
        &self,
        organization_id: Uuid,
    ) -> Result<FinancialTitle, AppError> {
        let organization = self.load(organization_id).await?;

        if organization.pending_reason != Some(PendingReason::ProRataPayment) {
            return Err(AppError::InvalidState(
                "organização não está aguardando pagamento pro-rata".to_string(),
            ));
        }

        let title = self
            .finance
            .find_pro_rata_title(organization_id)
            .await?
            .ok_or(AppError::TitleNotFound)?;

        if title.status != TitleStatus::Pending {
            return Err(AppError::InvalidState(
                "título pro-rata já liquidado".to_string(),
            ));
        }

        Ok(title)
    }

    /// Aplica o desfecho (já liquidado) da cobrança pro-rata. Em caso de
    /// recusa nada muda e a etapa continua retentável.
    pub async fn pay_pro_rata(
        &self,
        organization_id: Uuid,
        outcome: crate::services::payment::PaymentOutcome,
    ) -> Result<Transition<Organization>, AppError> {
        let organization = self.load(organization_id).await?;

        match (organization.status, organization.pending_reason) {
            (OrganizationStatus::Pending, Some(PendingReason::ProRataPayment)) => {}
            (OrganizationStatus::Pending, Some(PendingReason::UserValidation))
            | (OrganizationStatus::Active, _) => {
                return Ok(Transition::noop(organization));
            }
            _ => {
                return Err(AppError::InvalidState(
                    "organização não está aguardando pagamento pro-rata".to_string(),
                ));
            }
        }

        match outcome {
            crate::services::payment::PaymentOutcome::Failed { reason } => {
                tracing::warn!(
                    organization_id = %organization_id,
                    "Pagamento pro-rata recusado: {}", reason
                );
                Err(AppError::PaymentFailed(reason))
            }
            crate::services::payment::PaymentOutcome::Succeeded { .. } => {
                let title = self
                    .finance
                    .find_pro_rata_title(organization_id)
                    .await?
                    .ok_or(AppError::TitleNotFound)?;

                let updated = self
                    .organizations
                    .confirm_pro_rata(organization.id, organization.version, title.id, Utc::now())
                    .await?;

                tracing::info!(organization_id = %updated.id, "Pro-rata quitado");

                Ok(Transition::advanced(
                    updated,
                    vec![
                        DomainEvent::ProRataPaid { title_id: title.id },
                    ],
                ))
            }
        }
    }

    /// Confirmação (staff/sistema) de que o cadastro e o admin são válidos.
    /// Única transição do funil sem acoplamento com pagamento.
    pub async fn complete_user_validation(
        &self,
        organization_id: Uuid,
    ) -> Result<Transition<Organization>, AppError> {
        let organization = self.load(organization_id).await?;

        match (organization.status, organization.pending_reason) {
            (OrganizationStatus::Pending, Some(PendingReason::UserValidation)) => {}
            (OrganizationStatus::Active, _) => {
                return Ok(Transition::noop(organization));
            }
            _ => {
                return Err(AppError::InvalidState(
                    "organização não está aguardando validação de cadastro".to_string(),
                ));
            }
        }

        let updated = self
            .organizations
            .set_active(organization.id, organization.version)
            .await?;

        tracing::info!(organization_id = %updated.id, "Organização ativada");

        Ok(Transition::advanced(
            updated,
            vec![DomainEvent::OrganizationActivated { organization_id }],
        ))
    }

    /// Desativação administrativa; alcançável de qualquer estado.
    pub async fn deactivate(
        &self,
        organization_id: Uuid,
    ) -> Result<Transition<Organization>, AppError> {
        let organization = self.load(organization_id).await?;

        if organization.status == OrganizationStatus::Inactive {
            return Ok(Transition::noop(organization));
        }

        let updated = self
            .organizations
            .set_inactive(organization.id, organization.version)
            .await?;

        Ok(Transition::advanced(
            updated,
            vec![DomainEvent::OrganizationDeactivated { organization_id }],
        ))
    }

    pub async fn remaining_steps(
        &self,
        organization_id: Uuid,
    ) -> Result<RemainingSteps, AppError> {
        let organization = self.load(organization_id).await?;
        Ok(remaining_steps(&organization))
    }

    /// Títulos financeiros da organização, mais recentes primeiro.
    pub async fn titles(&self, organization_id: Uuid) -> Result<Vec<FinancialTitle>, AppError> {
        self.load(organization_id).await?;
        self.finance.list_titles(organization_id).await
    }

    /// Varredura administrativa: títulos pendentes com vencimento passado
    /// viram `Overdue`. Retorna quantos foram marcados.
    pub async fn mark_overdue_titles(&self) -> Result<u64, AppError> {
        let today = Utc::now().date_naive();
        let marked = self.finance.mark_overdue_titles(today).await?;
        if marked > 0 {
            tracing::info!(marked, "Títulos vencidos marcados como atrasados");
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payment::{Currency, PaymentGateway, PaymentInstrument, PaymentOutcome};
    use crate::services::test_support::{dec, fixtures, FakePaymentGateway, InMemoryStores};

    fn service(stores: &InMemoryStores) -> OrganizationLifecycleService {
        OrganizationLifecycleService::new(
            stores.organizations.clone(),
            stores.finance.clone(),
            stores.catalog.clone(),
        )
    }

    // =========================================================================
    // Valor pro-rata: dias restantes (contando hoje) × diária do plano
    // =========================================================================
    #[test]
    fn pro_rata_full_month_on_first_day() {
        let price = dec("300.00");
        let reference = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        assert_eq!(pro_rata_value(price, reference), dec("300.00"));
    }

    #[test]
    fn pro_rata_single_day_on_last_day() {
        let price = dec("310.00");
        let reference = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert_eq!(pro_rata_value(price, reference), dec("10.00"));
    }

    #[test]
    fn pro_rata_handles_leap_february() {
        let price = dec("290.00");
        let reference = NaiveDate::from_ymd_opt(2028, 2, 1).unwrap();
        // 2028 é bissexto: 29 dias restantes de 29.
        assert_eq!(pro_rata_value(price, reference), dec("290.00"));
    }

    // =========================================================================
    // signContract: avança o funil e cria exatamente um título pro-rata
    // =========================================================================
    #[tokio::test]
    async fn sign_contract_advances_and_creates_one_title() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);

        let transition = service(&stores).sign_contract(org.id).await.unwrap();

        assert_eq!(
            transition.state.pending_reason,
            Some(PendingReason::ProRataPayment)
        );
        assert!(transition.state.contract_signed_at.is_some());
        let titles = stores.finance.pro_rata_titles(org.id);
        assert_eq!(titles.len(), 1, "deve existir exatamente um título pro-rata");
        assert_eq!(titles[0].status, TitleStatus::Pending);
    }

    #[tokio::test]
    async fn sign_contract_twice_is_noop_without_duplicate_title() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);

        svc.sign_contract(org.id).await.unwrap();
        let second = svc.sign_contract(org.id).await.unwrap();

        assert!(second.events.is_empty(), "repetição não emite eventos");
        assert_eq!(
            second.state.pending_reason,
            Some(PendingReason::ProRataPayment),
            "repetição não regride o estado"
        );
        assert_eq!(stores.finance.pro_rata_titles(org.id).len(), 1);
    }

    #[tokio::test]
    async fn sign_contract_on_inactive_organization_is_rejected() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::inactive_organization(&stores, plan.id);

        let err = service(&stores).sign_contract(org.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    // =========================================================================
    // payProRata: sucesso quita e avança; recusa não muda nada
    // =========================================================================
    #[tokio::test]
    async fn pay_pro_rata_success_marks_title_and_advances() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);
        svc.sign_contract(org.id).await.unwrap();

        let transition = svc
            .pay_pro_rata(
                org.id,
                PaymentOutcome::Succeeded {
                    reference: "pi_123".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            transition.state.pending_reason,
            Some(PendingReason::UserValidation)
        );
        let titles = stores.finance.pro_rata_titles(org.id);
        assert_eq!(titles[0].status, TitleStatus::Paid);
        assert!(titles[0].payment_date.is_some());
    }

    #[tokio::test]
    async fn pay_pro_rata_failure_leaves_state_untouched() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);
        svc.sign_contract(org.id).await.unwrap();

        let err = svc
            .pay_pro_rata(
                org.id,
                PaymentOutcome::Failed {
                    reason: "cartão recusado".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PaymentFailed(_)));
        let current = stores.organizations.get(org.id);
        assert_eq!(
            current.pending_reason,
            Some(PendingReason::ProRataPayment),
            "etapa continua retentável"
        );
        assert_eq!(
            stores.finance.pro_rata_titles(org.id)[0].status,
            TitleStatus::Pending
        );
    }

    #[tokio::test]
    async fn pay_pro_rata_before_signature_is_rejected() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);

        let err = service(&stores)
            .pay_pro_rata(
                org.id,
                PaymentOutcome::Succeeded {
                    reference: "pi_123".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
    }

    // =========================================================================
    // Cenário completo do funil + checklist derivado
    // =========================================================================
    #[tokio::test]
    async fn full_activation_funnel() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);

        assert_eq!(
            svc.remaining_steps(org.id).await.unwrap(),
            RemainingSteps {
                contract_signed: false,
                payment_completed: false,
                registration_completed: false
            }
        );

        svc.sign_contract(org.id).await.unwrap();
        assert_eq!(
            svc.remaining_steps(org.id).await.unwrap(),
            RemainingSteps {
                contract_signed: true,
                payment_completed: false,
                registration_completed: false
            }
        );

        svc.pay_pro_rata(
            org.id,
            PaymentOutcome::Succeeded {
                reference: "pi_123".to_string(),
            },
        )
        .await
        .unwrap();

        let transition = svc.complete_user_validation(org.id).await.unwrap();
        assert_eq!(transition.state.status, OrganizationStatus::Active);
        assert_eq!(transition.state.pending_reason, None);
        assert_eq!(
            svc.remaining_steps(org.id).await.unwrap(),
            RemainingSteps {
                contract_signed: true,
                payment_completed: true,
                registration_completed: true
            }
        );
    }

    #[tokio::test]
    async fn complete_user_validation_twice_is_noop() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);

        svc.sign_contract(org.id).await.unwrap();
        svc.pay_pro_rata(
            org.id,
            PaymentOutcome::Succeeded {
                reference: "pi_123".to_string(),
            },
        )
        .await
        .unwrap();
        svc.complete_user_validation(org.id).await.unwrap();

        let second = svc.complete_user_validation(org.id).await.unwrap();
        assert!(second.events.is_empty());
        assert_eq!(second.state.status, OrganizationStatus::Active);
    }

    // =========================================================================
    // Lock otimista: versão defasada vira ConcurrentModification
    // =========================================================================
    #[tokio::test]
    async fn stale_version_surfaces_concurrent_modification() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);

        // Outro ator mexeu na linha depois da nossa leitura.
        stores.organizations.bump_version(org.id);

        let err = stores
            .organizations
            .sign_contract(
                org.id,
                org.version,
                Utc::now(),
                NewFinancialTitle {
                    organization_id: org.id,
                    kind: TitleKind::ProRata,
                    value: dec("100.00"),
                    due_date: Utc::now().date_naive(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ConcurrentModification));
        assert!(
            stores.finance.pro_rata_titles(org.id).is_empty(),
            "transação não pode commitar parcialmente"
        );
    }

    #[tokio::test]
    async fn deactivate_lands_inactive_from_any_state() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);

        let transition = svc.deactivate(org.id).await.unwrap();
        assert_eq!(transition.state.status, OrganizationStatus::Inactive);
        assert_eq!(transition.state.pending_reason, None);

        let again = svc.deactivate(org.id).await.unwrap();
        assert!(again.events.is_empty());
    }

    // =========================================================================
    // Varredura de vencidos: só títulos pendentes com vencimento passado
    // =========================================================================
    #[tokio::test]
    async fn mark_overdue_flips_only_expired_pending_titles() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);

        let today = Utc::now().date_naive();
        let expired = FinancialTitle {
            id: Uuid::new_v4(),
            organization_id: org.id,
            kind: TitleKind::Mensalidade,
            status: TitleStatus::Pending,
            value: dec("300.00"),
            due_date: today - chrono::Duration::days(3),
            payment_date: None,
            created_at: None,
        };
        let still_open = FinancialTitle {
            due_date: today + chrono::Duration::days(3),
            id: Uuid::new_v4(),
            ..expired.clone()
        };
        stores.finance.seed_title(expired);
        stores.finance.seed_title(still_open.clone());

        let marked = svc.mark_overdue_titles().await.unwrap();
        assert_eq!(marked, 1);

        let titles = svc.titles(org.id).await.unwrap();
        let open = titles.iter().find(|t| t.id == still_open.id).unwrap();
        assert_eq!(open.status, TitleStatus::Pending);
        assert!(titles
            .iter()
            .any(|t| t.status == TitleStatus::Overdue), "título vencido deve virar OVERDUE");
    }

    // =========================================================================
    // Checkout completo com o gateway: retry depois de sucesso não cobra
    // de novo
    // =========================================================================
    #[tokio::test]
    async fn checkout_retry_after_success_charges_exactly_once() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);
        let gateway = FakePaymentGateway::scripted(vec![PaymentOutcome::Succeeded {
            reference: "pi_123".to_string(),
        }]);
        let instrument = PaymentInstrument::SavedCard {
            payment_method_id: "pm_123".to_string(),
            customer_id: None,
        };

        svc.sign_contract(org.id).await.unwrap();

        // Primeira tentativa: consulta o título, cobra, aplica o desfecho.
        let title = svc.pending_pro_rata_title(org.id).await.unwrap();
        let outcome = gateway
            .charge(title.value, Currency::Brl, &instrument)
            .await
            .unwrap();
        svc.pay_pro_rata(org.id, outcome).await.unwrap();

        // Retry (a primeira resposta se perdeu): o checkout relê o estado,
        // vê a etapa concluída e devolve no-op sem voltar ao gateway.
        let current = svc.organization(org.id).await.unwrap();
        assert_ne!(current.pending_reason, Some(PendingReason::ProRataPayment));
        let retry = svc
            .pay_pro_rata(
                org.id,
                PaymentOutcome::Succeeded {
                    reference: "pi_retry".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(retry.events.is_empty());

        assert_eq!(gateway.charges.lock().unwrap().len(), 1, "uma cobrança só");
    }

    // =========================================================================
    // Conflito de versão na quitação não deixa o título meio pago
    // =========================================================================
    #[tokio::test]
    async fn pro_rata_version_conflict_leaves_title_pending() {
        let stores = InMemoryStores::new();
        let plan = fixtures::plan(&stores, dec("300.00"));
        let org = fixtures::organization(&stores, plan.id, PendingReason::ContractSignature);
        let svc = service(&stores);

        svc.sign_contract(org.id).await.unwrap();
        let title = svc.pending_pro_rata_title(org.id).await.unwrap();
        let current = stores.organizations.get(org.id);

        let err = stores
            .organizations
            .confirm_pro_rata(org.id, current.version + 1, title.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConcurrentModification));

        let titles = stores.finance.pro_rata_titles(org.id);
        assert_eq!(
            titles[0].status,
            TitleStatus::Pending,
            "conflito não pode quitar o título"
        );
    }
}
