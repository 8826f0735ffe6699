// src/services/test_support.rs
//
// Fakes em memória dos stores, com a mesma semântica de lock otimista e
// atomicidade dos repositórios Postgres. Um único banco em memória é
// compartilhado entre os fakes para as operações compostas (assinar
// contrato + título, completar setup + contrato) enxergarem os mesmos
// dados.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogStore, CreditStore, FinanceStore, ModuleStore, OrganizationStore, UserStore},
    models::{
        auth::{NewUser, User},
        catalog::{CreditPackage, Module, Plan},
        credit::{CreditBalance, CreditPurchase},
        finance::{FinancialTitle, NewFinancialTitle, TitleStatus},
        organization::{NewOrganization, Organization, OrganizationStatus, PendingReason},
        provisioning::{
            ContractStatus, ModuleContract, ModuleSetup, SetupContact, SetupStatus,
        },
    },
};

/// Decimal a partir de literal, para os testes.
pub fn dec(value: &str) -> Decimal {
    Decimal::from_str_exact(value).unwrap()
}

#[derive(Default)]
struct MemDb {
    organizations: HashMap<Uuid, Organization>,
    titles: Vec<FinancialTitle>,
    plans: HashMap<Uuid, Plan>,
    modules: HashMap<Uuid, Module>,
    packages: HashMap<Uuid, CreditPackage>,
    contracts: Vec<ModuleContract>,
    setups: Vec<ModuleSetup>,
    balances: HashMap<Uuid, CreditBalance>,
    purchases: Vec<CreditPurchase>,
    users: HashMap<Uuid, User>,
}

type SharedDb = Arc<Mutex<MemDb>>;

pub struct InMemoryStores {
    pub organizations: Arc<InMemoryOrganizationStore>,
    pub finance: Arc<InMemoryFinanceStore>,
    pub catalog: Arc<InMemoryCatalogStore>,
    pub modules: Arc<InMemoryModuleStore>,
    pub credits: Arc<InMemoryCreditStore>,
    pub users: Arc<InMemoryUserStore>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        let db: SharedDb = Arc::new(Mutex::new(MemDb::default()));
        Self {
            organizations: Arc::new(InMemoryOrganizationStore { db: db.clone() }),
            finance: Arc::new(InMemoryFinanceStore { db: db.clone() }),
            catalog: Arc::new(InMemoryCatalogStore { db: db.clone() }),
            modules: Arc::new(InMemoryModuleStore { db: db.clone() }),
            credits: Arc::new(InMemoryCreditStore { db: db.clone() }),
            users: Arc::new(InMemoryUserStore { db }),
        }
    }
}

// ---
// Fixtures
// ---

pub mod fixtures {
    use super::*;

    pub fn plan(stores: &InMemoryStores, price: Decimal) -> Plan {
        let plan = Plan {
            id: Uuid::new_v4(),
            name: "Profissional".to_string(),
            price,
            active: true,
        };
        stores
            .catalog
            .db
            .lock()
            .unwrap()
            .plans
            .insert(plan.id, plan.clone());
        plan
    }

    pub fn organization(
        stores: &InMemoryStores,
        plan_id: Uuid,
        pending_reason: PendingReason,
    ) -> Organization {
        let org = Organization {
            id: Uuid::new_v4(),
            name: "Vendas & Cia Ltda".to_string(),
            document: None,
            plan_id,
            status: OrganizationStatus::Pending,
            pending_reason: Some(pending_reason),
            contract_signed_at: None,
            version: 0,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        stores
            .organizations
            .db
            .lock()
            .unwrap()
            .organizations
            .insert(org.id, org.clone());
        org
    }

    pub fn inactive_organization(stores: &InMemoryStores, plan_id: Uuid) -> Organization {
        let mut org = organization(stores, plan_id, PendingReason::ContractSignature);
        org.status = OrganizationStatus::Inactive;
        org.pending_reason = None;
        stores
            .organizations
            .db
            .lock()
            .unwrap()
            .organizations
            .insert(org.id, org.clone());
        org
    }

    pub fn module(stores: &InMemoryStores, price: Decimal) -> Module {
        let module = Module {
            id: Uuid::new_v4(),
            name: "Análise de Ligações".to_string(),
            description: None,
            price,
            credits_per_execution: Some(3),
            active: true,
        };
        stores
            .catalog
            .db
            .lock()
            .unwrap()
            .modules
            .insert(module.id, module.clone());
        module
    }

    pub fn package(stores: &InMemoryStores, credits: i32, price: Decimal) -> CreditPackage {
        let package = CreditPackage {
            id: Uuid::new_v4(),
            name: format!("Pacote {credits}"),
            credits,
            price,
        };
        stores
            .catalog
            .db
            .lock()
            .unwrap()
            .packages
            .insert(package.id, package.clone());
        package
    }
}

// ---
// OrganizationStore
// ---

pub struct InMemoryOrganizationStore {
    db: SharedDb,
}

impl InMemoryOrganizationStore {
    pub fn get(&self, organization_id: Uuid) -> Organization {
        self.db.lock().unwrap().organizations[&organization_id].clone()
    }

    /// Simula outro ator escrevendo na linha depois da nossa leitura.
    pub fn bump_version(&self, organization_id: Uuid) {
        let mut db = self.db.lock().unwrap();
        if let Some(org) = db.organizations.get_mut(&organization_id) {
            org.version += 1;
        }
    }
}

#[async_trait]
impl OrganizationStore for InMemoryOrganizationStore {
    async fn find(&self, organization_id: Uuid) -> Result<Option<Organization>, AppError> {
        Ok(self.db.lock().unwrap().organizations.get(&organization_id).cloned())
    }

    async fn create_with_admin(
        &self,
        organization: NewOrganization,
        admin: NewUser,
    ) -> Result<(Organization, User), AppError> {
        let mut db = self.db.lock().unwrap();
        let org = Organization {
            id: Uuid::new_v4(),
            name: organization.name,
            document: organization.document,
            plan_id: organization.plan_id,
            status: OrganizationStatus::Pending,
            pending_reason: Some(PendingReason::ContractSignature),
            contract_signed_at: None,
            version: 0,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        let user = User {
            id: Uuid::new_v4(),
            organization_id: Some(org.id),
            name: admin.name,
            email: admin.email,
            password_hash: admin.password_hash,
            role: admin.role,
            created_at: Some(Utc::now()),
        };
        db.organizations.insert(org.id, org.clone());
        db.users.insert(user.id, user.clone());
        Ok((org, user))
    }

    async fn sign_contract(
        &self,
        organization_id: Uuid,
        expected_version: i32,
        signed_at: DateTime<Utc>,
        title: NewFinancialTitle,
    ) -> Result<(Organization, FinancialTitle), AppError> {
        let mut db = self.db.lock().unwrap();
        let org = db
            .organizations
            .get_mut(&organization_id)
            .ok_or(AppError::ConcurrentModification)?;
        if org.version != expected_version
            || org.pending_reason != Some(PendingReason::ContractSignature)
        {
            return Err(AppError::ConcurrentModification);
        }
        org.pending_reason = Some(PendingReason::ProRataPayment);
        org.contract_signed_at = Some(signed_at);
        org.version += 1;
        let updated = org.clone();

        let created = FinancialTitle {
            id: Uuid::new_v4(),
            organization_id: title.organization_id,
            kind: title.kind,
            status: TitleStatus::Pending,
            value: title.value,
            due_date: title.due_date,
            payment_date: None,
            created_at: Some(Utc::now()),
        };
        db.titles.push(created.clone());
        Ok((updated, created))
    }

    async fn confirm_pro_rata(
        &self,
        organization_id: Uuid,
        expected_version: i32,
        title_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Organization, AppError> {
        let mut db = self.db.lock().unwrap();

        // Guards conferidos antes de qualquer mutação: como no Postgres,
        // um conflito não deixa o título meio quitado.
        let org_ok = db
            .organizations
            .get(&organization_id)
            .is_some_and(|org| {
                org.version == expected_version
                    && org.pending_reason == Some(PendingReason::ProRataPayment)
            });
        if !org_ok {
            return Err(AppError::ConcurrentModification);
        }

        let title = db
            .titles
            .iter_mut()
            .find(|t| t.id == title_id && t.status == TitleStatus::Pending)
            .ok_or(AppError::ConcurrentModification)?;
        title.status = TitleStatus::Paid;
        title.payment_date = Some(paid_at);

        let org = db
            .organizations
            .get_mut(&organization_id)
            .ok_or(AppError::ConcurrentModification)?;
        org.pending_reason = Some(PendingReason::UserValidation);
        org.version += 1;
        Ok(org.clone())
    }

    async fn set_active(
        &self,
        organization_id: Uuid,
        expected_version: i32,
    ) -> Result<Organization, AppError> {
        let mut db = self.db.lock().unwrap();
        let org = db
            .organizations
            .get_mut(&organization_id)
            .ok_or(AppError::ConcurrentModification)?;
        if org.version != expected_version
            || org.pending_reason != Some(PendingReason::UserValidation)
        {
            return Err(AppError::ConcurrentModification);
        }
        org.status = OrganizationStatus::Active;
        org.pending_reason = None;
        org.version += 1;
        Ok(org.clone())
    }

    async fn set_inactive(
        &self,
        organization_id: Uuid,
        expected_version: i32,
    ) -> Result<Organization, AppError> {
        let mut db = self.db.lock().unwrap();
        let org = db
            .organizations
            .get_mut(&organization_id)
            .ok_or(AppError::ConcurrentModification)?;
        if org.version != expected_version {
            return Err(AppError::ConcurrentModification);
        }
        org.status = OrganizationStatus::Inactive;
        org.pending_reason = None;
        org.version += 1;
        Ok(org.clone())
    }
}

// ---
// FinanceStore
// ---

pub struct InMemoryFinanceStore {
    db: SharedDb,
}

impl InMemoryFinanceStore {
    pub fn seed_title(&self, title: FinancialTitle) {
        self.db.lock().unwrap().titles.push(title);
    }

    pub fn pro_rata_titles(&self, organization_id: Uuid) -> Vec<FinancialTitle> {
        self.db
            .lock()
            .unwrap()
            .titles
            .iter()
            .filter(|t| {
                t.organization_id == organization_id
                    && t.kind == crate::models::finance::TitleKind::ProRata
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FinanceStore for InMemoryFinanceStore {
    async fn find_pro_rata_title(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<FinancialTitle>, AppError> {
        Ok(self.pro_rata_titles(organization_id).into_iter().next())
    }

    async fn list_titles(&self, organization_id: Uuid) -> Result<Vec<FinancialTitle>, AppError> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .titles
            .iter()
            .filter(|t| t.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn mark_overdue_titles(&self, today: chrono::NaiveDate) -> Result<u64, AppError> {
        let mut db = self.db.lock().unwrap();
        let mut marked = 0;
        for title in db.titles.iter_mut() {
            if title.status == TitleStatus::Pending && title.due_date < today {
                title.status = TitleStatus::Overdue;
                marked += 1;
            }
        }
        Ok(marked)
    }
}

// ---
// CatalogStore
// ---

pub struct InMemoryCatalogStore {
    db: SharedDb,
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        Ok(self.db.lock().unwrap().plans.get(&plan_id).cloned())
    }

    async fn find_module(&self, module_id: Uuid) -> Result<Option<Module>, AppError> {
        Ok(self.db.lock().unwrap().modules.get(&module_id).cloned())
    }

    async fn list_active_modules(&self) -> Result<Vec<Module>, AppError> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .modules
            .values()
            .filter(|m| m.active)
            .cloned()
            .collect())
    }

    async fn find_package(&self, package_id: Uuid) -> Result<Option<CreditPackage>, AppError> {
        Ok(self.db.lock().unwrap().packages.get(&package_id).cloned())
    }

    async fn list_packages(&self) -> Result<Vec<CreditPackage>, AppError> {
        Ok(self.db.lock().unwrap().packages.values().cloned().collect())
    }
}

// ---
// ModuleStore
// ---

pub struct InMemoryModuleStore {
    db: SharedDb,
}

impl InMemoryModuleStore {
    pub fn setups_for_contract(&self, contract_id: Uuid) -> Vec<ModuleSetup> {
        self.db
            .lock()
            .unwrap()
            .setups
            .iter()
            .filter(|s| s.contract_id == contract_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ModuleStore for InMemoryModuleStore {
    async fn find_live_contract(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
    ) -> Result<Option<ModuleContract>, AppError> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .contracts
            .iter()
            .find(|c| {
                c.organization_id == organization_id
                    && c.module_id == module_id
                    && c.status != ContractStatus::NotContracted
            })
            .cloned())
    }

    async fn find_contract(&self, contract_id: Uuid) -> Result<Option<ModuleContract>, AppError> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .contracts
            .iter()
            .find(|c| c.id == contract_id)
            .cloned())
    }

    async fn list_live_contracts(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<ModuleContract>, AppError> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .contracts
            .iter()
            .filter(|c| {
                c.organization_id == organization_id
                    && c.status != ContractStatus::NotContracted
            })
            .cloned()
            .collect())
    }

    async fn create_contract_with_setup(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
        contracted_at: DateTime<Utc>,
        contact: SetupContact,
    ) -> Result<(ModuleContract, ModuleSetup), AppError> {
        let mut db = self.db.lock().unwrap();
        let contract = ModuleContract {
            id: Uuid::new_v4(),
            organization_id,
            module_id,
            status: ContractStatus::Contracted,
            contracted_at,
            cancelled_at: None,
            cancel_reason: None,
            version: 0,
        };
        let setup = ModuleSetup {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            contact_name: contact.name,
            contact_phone: contact.phone,
            status: SetupStatus::Pending,
            notes: None,
            version: 0,
            created_at: Some(Utc::now()),
            completed_at: None,
        };
        db.contracts.push(contract.clone());
        db.setups.push(setup.clone());
        Ok((contract, setup))
    }

    async fn find_setup(&self, setup_id: Uuid) -> Result<Option<ModuleSetup>, AppError> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .setups
            .iter()
            .find(|s| s.id == setup_id)
            .cloned())
    }

    async fn list_open_setups(&self) -> Result<Vec<ModuleSetup>, AppError> {
        let db = self.db.lock().unwrap();
        let live: Vec<Uuid> = db
            .contracts
            .iter()
            .filter(|c| c.status != ContractStatus::NotContracted)
            .map(|c| c.id)
            .collect();
        Ok(db
            .setups
            .iter()
            .filter(|s| s.status != SetupStatus::Completed && live.contains(&s.contract_id))
            .cloned()
            .collect())
    }

    async fn begin_setup(
        &self,
        setup_id: Uuid,
        setup_version: i32,
        contract_id: Uuid,
        contract_version: i32,
    ) -> Result<(ModuleSetup, ModuleContract), AppError> {
        let mut db = self.db.lock().unwrap();

        let setup = db
            .setups
            .iter_mut()
            .find(|s| {
                s.id == setup_id && s.version == setup_version && s.status == SetupStatus::Pending
            })
            .ok_or(AppError::ConcurrentModification)?;
        setup.status = SetupStatus::InProgress;
        setup.version += 1;
        let updated_setup = setup.clone();

        let contract = db
            .contracts
            .iter_mut()
            .find(|c| {
                c.id == contract_id
                    && c.version == contract_version
                    && c.status == ContractStatus::Contracted
            })
            .ok_or(AppError::ConcurrentModification)?;
        contract.status = ContractStatus::Setup;
        contract.version += 1;
        Ok((updated_setup, contract.clone()))
    }

    async fn complete_setup(
        &self,
        setup_id: Uuid,
        setup_version: i32,
        contract_id: Uuid,
        contract_version: i32,
        completed_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<(ModuleSetup, ModuleContract), AppError> {
        let mut db = self.db.lock().unwrap();

        let setup = db
            .setups
            .iter_mut()
            .find(|s| {
                s.id == setup_id
                    && s.version == setup_version
                    && s.status != SetupStatus::Completed
            })
            .ok_or(AppError::ConcurrentModification)?;
        setup.status = SetupStatus::Completed;
        setup.completed_at = Some(completed_at);
        if notes.is_some() {
            setup.notes = notes;
        }
        setup.version += 1;
        let updated_setup = setup.clone();

        let contract = db
            .contracts
            .iter_mut()
            .find(|c| {
                c.id == contract_id
                    && c.version == contract_version
                    && (c.status == ContractStatus::Contracted
                        || c.status == ContractStatus::Setup)
            })
            .ok_or(AppError::ConcurrentModification)?;
        contract.status = ContractStatus::Configured;
        contract.version += 1;
        Ok((updated_setup, contract.clone()))
    }

    async fn cancel_contract(
        &self,
        contract_id: Uuid,
        expected_version: i32,
        cancelled_at: DateTime<Utc>,
        reason: String,
    ) -> Result<ModuleContract, AppError> {
        let mut db = self.db.lock().unwrap();
        let contract = db
            .contracts
            .iter_mut()
            .find(|c| {
                c.id == contract_id
                    && c.version == expected_version
                    && c.status != ContractStatus::NotContracted
            })
            .ok_or(AppError::ConcurrentModification)?;
        contract.status = ContractStatus::NotContracted;
        contract.cancelled_at = Some(cancelled_at);
        contract.cancel_reason = Some(reason);
        contract.version += 1;
        Ok(contract.clone())
    }
}

// ---
// CreditStore
// ---

pub struct InMemoryCreditStore {
    db: SharedDb,
}

impl InMemoryCreditStore {
    pub fn seed_balance(&self, organization_id: Uuid, available: i64) {
        self.db.lock().unwrap().balances.insert(
            organization_id,
            CreditBalance {
                organization_id,
                available,
                version: 0,
            },
        );
    }
}

#[async_trait]
impl CreditStore for InMemoryCreditStore {
    async fn balance(&self, organization_id: Uuid) -> Result<Option<CreditBalance>, AppError> {
        Ok(self.db.lock().unwrap().balances.get(&organization_id).cloned())
    }

    async fn apply_purchase(
        &self,
        organization_id: Uuid,
        package_id: Uuid,
        credits: i32,
        amount_paid: Decimal,
    ) -> Result<(CreditBalance, CreditPurchase), AppError> {
        let mut db = self.db.lock().unwrap();
        let balance = db
            .balances
            .entry(organization_id)
            .or_insert_with(|| CreditBalance::empty(organization_id));
        balance.available += i64::from(credits);
        balance.version += 1;
        let updated = balance.clone();

        let purchase = CreditPurchase {
            id: Uuid::new_v4(),
            organization_id,
            package_id,
            credits,
            amount_paid,
            created_at: Some(Utc::now()),
        };
        db.purchases.push(purchase.clone());
        Ok((updated, purchase))
    }

    async fn consume(
        &self,
        organization_id: Uuid,
        amount: i64,
    ) -> Result<CreditBalance, AppError> {
        let mut db = self.db.lock().unwrap();
        let balance = db
            .balances
            .get_mut(&organization_id)
            .filter(|b| b.available >= amount)
            .ok_or(AppError::InsufficientCredits)?;
        balance.available -= amount;
        balance.version += 1;
        Ok(balance.clone())
    }

    async fn purchase_history(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<CreditPurchase>, AppError> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .purchases
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

// ---
// UserStore
// ---

pub struct InMemoryUserStore {
    db: SharedDb,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.db.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

// ---
// Gateway de pagamento roteirizável
// ---

/// Gateway fake: devolve os desfechos roteirizados na ordem e registra
/// cada cobrança recebida.
pub struct FakePaymentGateway {
    outcomes: Mutex<Vec<crate::services::payment::PaymentOutcome>>,
    pub charges: Mutex<Vec<Decimal>>,
}

impl FakePaymentGateway {
    pub fn scripted(outcomes: Vec<crate::services::payment::PaymentOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            charges: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl crate::services::payment::PaymentGateway for FakePaymentGateway {
    async fn charge(
        &self,
        amount: Decimal,
        _currency: crate::services::payment::Currency,
        _instrument: &crate::services::payment::PaymentInstrument,
    ) -> Result<crate::services::payment::PaymentOutcome, AppError> {
        self.charges.lock().unwrap().push(amount);
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            return Err(AppError::ConfigurationError(
                "nenhum desfecho roteirizado".to_string(),
            ));
        }
        Ok(outcomes.remove(0))
    }

    fn validate_config(&self) -> crate::services::payment::ConfigCheck {
        crate::services::payment::ConfigCheck {
            valid: true,
            message: None,
        }
    }
}
