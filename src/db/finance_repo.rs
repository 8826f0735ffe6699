// src/db/finance_repo.rs
//
// Consultas sobre títulos financeiros. A criação do pro-rata e a quitação
// vivem no OrganizationStore porque fazem parte da transação do funil;
// aqui ficam as leituras e a varredura de vencidos.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::finance::FinancialTitle};

#[async_trait]
pub trait FinanceStore: Send + Sync {
    /// Título pro-rata da organização (cada organização tem no máximo um).
    async fn find_pro_rata_title(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<FinancialTitle>, AppError>;

    async fn list_titles(&self, organization_id: Uuid) -> Result<Vec<FinancialTitle>, AppError>;

    /// Marca como `Overdue` todo título pendente com vencimento anterior a
    /// `today`. Retorna quantos foram marcados. Não há worker em segundo
    /// plano; a varredura é disparada pela camada administrativa.
    async fn mark_overdue_titles(&self, today: NaiveDate) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct PgFinanceRepository {
    pool: PgPool,
}

impl PgFinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FinanceStore for PgFinanceRepository {
    async fn find_pro_rata_title(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<FinancialTitle>, AppError> {
        let title = sqlx::query_as::<_, FinancialTitle>(
            r#"
            SELECT id, organization_id, kind, status, value, due_date, payment_date, created_at
            FROM financial_titles
            WHERE organization_id = $1 AND kind = 'PRO_RATA'
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(title)
    }

    async fn list_titles(&self, organization_id: Uuid) -> Result<Vec<FinancialTitle>, AppError> {
        let titles = sqlx::query_as::<_, FinancialTitle>(
            r#"
            SELECT id, organization_id, kind, status, value, due_date, payment_date, created_at
            FROM financial_titles
            WHERE organization_id = $1
            ORDER BY due_date ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(titles)
    }

    async fn mark_overdue_titles(&self, today: NaiveDate) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE financial_titles
            SET status = 'OVERDUE'
            WHERE status = 'PENDING' AND due_date < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
