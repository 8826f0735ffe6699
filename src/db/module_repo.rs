// src/db/module_repo.rs
//
// Store do contrato de módulo e do item de setup. Contratar (contrato +
// item de setup), iniciar setup (item + contrato) e completar setup
// (item + contrato) tocam duas linhas cada; cada operação é uma única
// transação com lock otimista nas duas pontas.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::provisioning::{ModuleContract, ModuleSetup, SetupContact},
};

const CONTRACT_COLUMNS: &str = r#"
    id, organization_id, module_id, status,
    contracted_at, cancelled_at, cancel_reason, version
"#;

const SETUP_COLUMNS: &str = r#"
    id, contract_id, contact_name, contact_phone, status,
    notes, version, created_at, completed_at
"#;

#[async_trait]
pub trait ModuleStore: Send + Sync {
    /// Contrato vivo (não cancelado) da organização para este módulo.
    /// Ausência = `not_contracted`; linhas canceladas ficam para auditoria.
    async fn find_live_contract(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
    ) -> Result<Option<ModuleContract>, AppError>;

    async fn find_contract(&self, contract_id: Uuid) -> Result<Option<ModuleContract>, AppError>;

    async fn list_live_contracts(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<ModuleContract>, AppError>;

    /// Contratação: cria o contrato em `Contracted` e o item de setup em
    /// `Pending` na mesma transação.
    async fn create_contract_with_setup(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
        contracted_at: DateTime<Utc>,
        contact: SetupContact,
    ) -> Result<(ModuleContract, ModuleSetup), AppError>;

    async fn find_setup(&self, setup_id: Uuid) -> Result<Option<ModuleSetup>, AppError>;

    /// Fila da equipe: itens de setup ainda não concluídos de contratos
    /// vivos. Cancelar o contrato tira o setup da fila.
    async fn list_open_setups(&self) -> Result<Vec<ModuleSetup>, AppError>;

    /// Início do setup: item → `InProgress`, contrato → `Setup`. Atômico.
    async fn begin_setup(
        &self,
        setup_id: Uuid,
        setup_version: i32,
        contract_id: Uuid,
        contract_version: i32,
    ) -> Result<(ModuleSetup, ModuleContract), AppError>;

    /// Conclusão do setup: item → `Completed`, contrato → `Configured`.
    /// Atômico; única transição que configura o módulo.
    async fn complete_setup(
        &self,
        setup_id: Uuid,
        setup_version: i32,
        contract_id: Uuid,
        contract_version: i32,
        completed_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<(ModuleSetup, ModuleContract), AppError>;

    /// Cancelamento: contrato → `NotContracted`, com carimbo e motivo.
    async fn cancel_contract(
        &self,
        contract_id: Uuid,
        expected_version: i32,
        cancelled_at: DateTime<Utc>,
        reason: String,
    ) -> Result<ModuleContract, AppError>;
}

#[derive(Clone)]
pub struct PgModuleRepository {
    pool: PgPool,
}

impl PgModuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModuleStore for PgModuleRepository {
    async fn find_live_contract(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
    ) -> Result<Option<ModuleContract>, AppError> {
        let sql = format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM module_contracts
            WHERE organization_id = $1 AND module_id = $2 AND status != 'NOT_CONTRACTED'
            "#
        );
        let contract = sqlx::query_as::<_, ModuleContract>(&sql)
            .bind(organization_id)
            .bind(module_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(contract)
    }

    async fn find_contract(&self, contract_id: Uuid) -> Result<Option<ModuleContract>, AppError> {
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM module_contracts WHERE id = $1");
        let contract = sqlx::query_as::<_, ModuleContract>(&sql)
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(contract)
    }

    async fn list_live_contracts(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<ModuleContract>, AppError> {
        let sql = format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM module_contracts
            WHERE organization_id = $1 AND status != 'NOT_CONTRACTED'
            "#
        );
        let contracts = sqlx::query_as::<_, ModuleContract>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(contracts)
    }

    async fn create_contract_with_setup(
        &self,
        organization_id: Uuid,
        module_id: Uuid,
        contracted_at: DateTime<Utc>,
        contact: SetupContact,
    ) -> Result<(ModuleContract, ModuleSetup), AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO module_contracts (organization_id, module_id, status, contracted_at)
            VALUES ($1, $2, 'CONTRACTED', $3)
            RETURNING {CONTRACT_COLUMNS}
            "#
        );
        let contract = sqlx::query_as::<_, ModuleContract>(&sql)
            .bind(organization_id)
            .bind(module_id)
            .bind(contracted_at)
            .fetch_one(&mut *tx)
            .await?;

        let sql = format!(
            r#"
            INSERT INTO module_setups (contract_id, contact_name, contact_phone, status)
            VALUES ($1, $2, $3, 'PENDING')
            RETURNING {SETUP_COLUMNS}
            "#
        );
        let setup = sqlx::query_as::<_, ModuleSetup>(&sql)
            .bind(contract.id)
            .bind(&contact.name)
            .bind(&contact.phone)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((contract, setup))
    }

    async fn find_setup(&self, setup_id: Uuid) -> Result<Option<ModuleSetup>, AppError> {
        let sql = format!("SELECT {SETUP_COLUMNS} FROM module_setups WHERE id = $1");
        let setup = sqlx::query_as::<_, ModuleSetup>(&sql)
            .bind(setup_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(setup)
    }

    async fn list_open_setups(&self) -> Result<Vec<ModuleSetup>, AppError> {
        // Contrato cancelado tira o setup da fila; a linha fica para
        // auditoria, mas a equipe não tem mais o que configurar.
        let sql = format!(
            r#"
            SELECT {SETUP_COLUMNS}
            FROM module_setups
            WHERE status != 'COMPLETED'
              AND contract_id IN (
                  SELECT id FROM module_contracts WHERE status != 'NOT_CONTRACTED'
              )
            ORDER BY created_at ASC
            "#
        );
        let setups = sqlx::query_as::<_, ModuleSetup>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(setups)
    }

    async fn begin_setup(
        &self,
        setup_id: Uuid,
        setup_version: i32,
        contract_id: Uuid,
        contract_version: i32,
    ) -> Result<(ModuleSetup, ModuleContract), AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE module_setups
            SET status = 'IN_PROGRESS', version = version + 1
            WHERE id = $1 AND version = $2 AND status = 'PENDING'
            RETURNING {SETUP_COLUMNS}
            "#
        );
        let setup = sqlx::query_as::<_, ModuleSetup>(&sql)
            .bind(setup_id)
            .bind(setup_version)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        let sql = format!(
            r#"
            UPDATE module_contracts
            SET status = 'SETUP', version = version + 1
            WHERE id = $1 AND version = $2 AND status = 'CONTRACTED'
            RETURNING {CONTRACT_COLUMNS}
            "#
        );
        let contract = sqlx::query_as::<_, ModuleContract>(&sql)
            .bind(contract_id)
            .bind(contract_version)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        tx.commit().await?;
        Ok((setup, contract))
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
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE module_setups
            SET status = 'COMPLETED',
                completed_at = $3,
                notes = COALESCE($4, notes),
                version = version + 1
            WHERE id = $1 AND version = $2 AND status != 'COMPLETED'
            RETURNING {SETUP_COLUMNS}
            "#
        );
        let setup = sqlx::query_as::<_, ModuleSetup>(&sql)
            .bind(setup_id)
            .bind(setup_version)
            .bind(completed_at)
            .bind(&notes)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        let sql = format!(
            r#"
            UPDATE module_contracts
            SET status = 'CONFIGURED', version = version + 1
            WHERE id = $1 AND version = $2 AND status IN ('CONTRACTED', 'SETUP')
            RETURNING {CONTRACT_COLUMNS}
            "#
        );
        let contract = sqlx::query_as::<_, ModuleContract>(&sql)
            .bind(contract_id)
            .bind(contract_version)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        tx.commit().await?;
        Ok((setup, contract))
    }

    async fn cancel_contract(
        &self,
        contract_id: Uuid,
        expected_version: i32,
        cancelled_at: DateTime<Utc>,
        reason: String,
    ) -> Result<ModuleContract, AppError> {
        let sql = format!(
            r#"
            UPDATE module_contracts
            SET status = 'NOT_CONTRACTED',
                cancelled_at = $3,
                cancel_reason = $4,
                version = version + 1
            WHERE id = $1 AND version = $2 AND status != 'NOT_CONTRACTED'
            RETURNING {CONTRACT_COLUMNS}
            "#
        );
        let contract = sqlx::query_as::<_, ModuleContract>(&sql)
            .bind(contract_id)
            .bind(expected_version)
            .bind(cancelled_at)
            .bind(&reason)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        Ok(contract)
    }
}
