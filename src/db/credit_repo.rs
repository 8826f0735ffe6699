// src/db/credit_repo.rs
//
// Store do saldo de créditos. O débito é um UPDATE guardado
// (`available >= quantidade`), então o saldo nunca fica negativo mesmo
// com dois consumos correndo em paralelo.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::credit::{CreditBalance, CreditPurchase},
};

#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn balance(&self, organization_id: Uuid) -> Result<Option<CreditBalance>, AppError>;

    /// Compra concluída: soma os créditos ao saldo (criando a linha se for
    /// a primeira compra) e grava o registro de auditoria. Atômico.
    async fn apply_purchase(
        &self,
        organization_id: Uuid,
        package_id: Uuid,
        credits: i32,
        amount_paid: Decimal,
    ) -> Result<(CreditBalance, CreditPurchase), AppError>;

    /// Débito por execução de módulo. `InsufficientCredits` se a quantidade
    /// for maior que o disponível; nesse caso nada muda.
    async fn consume(
        &self,
        organization_id: Uuid,
        amount: i64,
    ) -> Result<CreditBalance, AppError>;

    async fn purchase_history(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<CreditPurchase>, AppError>;
}

#[derive(Clone)]
pub struct PgCreditRepository {
    pool: PgPool,
}

impl PgCreditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditStore for PgCreditRepository {
    async fn balance(&self, organization_id: Uuid) -> Result<Option<CreditBalance>, AppError> {
        let balance = sqlx::query_as::<_, CreditBalance>(
            "SELECT organization_id, available, version FROM credit_balances WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn apply_purchase(
        &self,
        organization_id: Uuid,
        package_id: Uuid,
        credits: i32,
        amount_paid: Decimal,
    ) -> Result<(CreditBalance, CreditPurchase), AppError> {
        let mut tx = self.pool.begin().await?;

        let balance = sqlx::query_as::<_, CreditBalance>(
            r#"
            INSERT INTO credit_balances (organization_id, available)
            VALUES ($1, $2)
            ON CONFLICT (organization_id)
            DO UPDATE SET available = credit_balances.available + $2,
                          version = credit_balances.version + 1
            RETURNING organization_id, available, version
            "#,
        )
        .bind(organization_id)
        .bind(i64::from(credits))
        .fetch_one(&mut *tx)
        .await?;

        let purchase = sqlx::query_as::<_, CreditPurchase>(
            r#"
            INSERT INTO credit_purchases (organization_id, package_id, credits, amount_paid)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, package_id, credits, amount_paid, created_at
            "#,
        )
        .bind(organization_id)
        .bind(package_id)
        .bind(credits)
        .bind(amount_paid)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((balance, purchase))
    }

    async fn consume(
        &self,
        organization_id: Uuid,
        amount: i64,
    ) -> Result<CreditBalance, AppError> {
        // Sem linha de saldo = saldo zero: qualquer débito é insuficiente.
        let balance = sqlx::query_as::<_, CreditBalance>(
            r#"
            UPDATE credit_balances
            SET available = available - $2,
                version = version + 1
            WHERE organization_id = $1 AND available >= $2
            RETURNING organization_id, available, version
            "#,
        )
        .bind(organization_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::InsufficientCredits)?;

        Ok(balance)
    }

    async fn purchase_history(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<CreditPurchase>, AppError> {
        let purchases = sqlx::query_as::<_, CreditPurchase>(
            r#"
            SELECT id, organization_id, package_id, credits, amount_paid, created_at
            FROM credit_purchases
            WHERE organization_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }
}
