// src/db/organization_repo.rs
//
// Store da organização e do seu funil de ativação. As transições que tocam
// mais de uma linha (avançar o funil + criar/quitar o título pro-rata)
// são um único método, executado numa única transação: ou commita tudo,
// ou nada muda.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{NewUser, User},
        finance::{FinancialTitle, NewFinancialTitle},
        organization::{NewOrganization, Organization},
    },
};

const ORGANIZATION_COLUMNS: &str = r#"
    id, name, document, plan_id,
    status, pending_reason, contract_signed_at,
    version, created_at, updated_at
"#;

const TITLE_COLUMNS: &str = r#"
    id, organization_id, kind, status, value, due_date, payment_date, created_at
"#;

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn find(&self, organization_id: Uuid) -> Result<Option<Organization>, AppError>;

    /// Registro: cria a organização (em `Pending(ContractSignature)`) e o
    /// seu usuário administrador na mesma transação.
    async fn create_with_admin(
        &self,
        organization: NewOrganization,
        admin: NewUser,
    ) -> Result<(Organization, User), AppError>;

    /// Assinatura do contrato: avança o funil para `ProRataPayment`,
    /// grava `contract_signed_at` e cria o título pro-rata. Atômico.
    async fn sign_contract(
        &self,
        organization_id: Uuid,
        expected_version: i32,
        signed_at: DateTime<Utc>,
        title: NewFinancialTitle,
    ) -> Result<(Organization, FinancialTitle), AppError>;

    /// Pagamento pro-rata confirmado: quita o título (apenas se ainda
    /// pendente) e avança o funil para `UserValidation`. Atômico.
    async fn confirm_pro_rata(
        &self,
        organization_id: Uuid,
        expected_version: i32,
        title_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Organization, AppError>;

    /// Validação de cadastro concluída: `Active`, sem motivo pendente.
    async fn set_active(
        &self,
        organization_id: Uuid,
        expected_version: i32,
    ) -> Result<Organization, AppError>;

    /// Desativação administrativa. A organização nunca é apagada.
    async fn set_inactive(
        &self,
        organization_id: Uuid,
        expected_version: i32,
    ) -> Result<Organization, AppError>;
}

#[derive(Clone)]
pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationStore for PgOrganizationRepository {
    async fn find(&self, organization_id: Uuid) -> Result<Option<Organization>, AppError> {
        let sql = format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = $1");
        let organization = sqlx::query_as::<_, Organization>(&sql)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(organization)
    }

    async fn create_with_admin(
        &self,
        organization: NewOrganization,
        admin: NewUser,
    ) -> Result<(Organization, User), AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO organizations (name, document, plan_id, status, pending_reason)
            VALUES ($1, $2, $3, 'PENDING', 'CONTRACT_SIGNATURE')
            RETURNING {ORGANIZATION_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Organization>(&sql)
            .bind(&organization.name)
            .bind(&organization.document)
            .bind(organization.plan_id)
            .fetch_one(&mut *tx)
            .await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (organization_id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organization_id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(created.id)
        .bind(&admin.name)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(admin.role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, user))
    }

    async fn sign_contract(
        &self,
        organization_id: Uuid,
        expected_version: i32,
        signed_at: DateTime<Utc>,
        title: NewFinancialTitle,
    ) -> Result<(Organization, FinancialTitle), AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE organizations
            SET pending_reason = 'PRO_RATA_PAYMENT',
                contract_signed_at = $3,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2 AND pending_reason = 'CONTRACT_SIGNATURE'
            RETURNING {ORGANIZATION_COLUMNS}
            "#
        );
        // Zero linhas afetadas = alguém mexeu no registro entre a leitura
        // e esta escrita. O chamador relê e tenta de novo.
        let updated = sqlx::query_as::<_, Organization>(&sql)
            .bind(organization_id)
            .bind(expected_version)
            .bind(signed_at)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        let sql = format!(
            r#"
            INSERT INTO financial_titles (organization_id, kind, status, value, due_date)
            VALUES ($1, $2, 'PENDING', $3, $4)
            RETURNING {TITLE_COLUMNS}
            "#
        );
        let created_title = sqlx::query_as::<_, FinancialTitle>(&sql)
            .bind(title.organization_id)
            .bind(title.kind)
            .bind(title.value)
            .bind(title.due_date)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((updated, created_title))
    }

    async fn confirm_pro_rata(
        &self,
        organization_id: Uuid,
        expected_version: i32,
        title_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Organization, AppError> {
        let mut tx = self.pool.begin().await?;

        // O guard `status = 'PENDING'` garante que Pending → Paid acontece
        // exatamente uma vez, mesmo sob corrida.
        let paid = sqlx::query(
            r#"
            UPDATE financial_titles
            SET status = 'PAID', payment_date = $2
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(title_id)
        .bind(paid_at)
        .execute(&mut *tx)
        .await?;

        if paid.rows_affected() == 0 {
            return Err(AppError::ConcurrentModification);
        }

        let sql = format!(
            r#"
            UPDATE organizations
            SET pending_reason = 'USER_VALIDATION',
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2 AND pending_reason = 'PRO_RATA_PAYMENT'
            RETURNING {ORGANIZATION_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Organization>(&sql)
            .bind(organization_id)
            .bind(expected_version)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn set_active(
        &self,
        organization_id: Uuid,
        expected_version: i32,
    ) -> Result<Organization, AppError> {
        let sql = format!(
            r#"
            UPDATE organizations
            SET status = 'ACTIVE',
                pending_reason = NULL,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2 AND pending_reason = 'USER_VALIDATION'
            RETURNING {ORGANIZATION_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Organization>(&sql)
            .bind(organization_id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        Ok(updated)
    }

    async fn set_inactive(
        &self,
        organization_id: Uuid,
        expected_version: i32,
    ) -> Result<Organization, AppError> {
        let sql = format!(
            r#"
            UPDATE organizations
            SET status = 'INACTIVE',
                pending_reason = NULL,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING {ORGANIZATION_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Organization>(&sql)
            .bind(organization_id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        Ok(updated)
    }
}
