// src/db/catalog_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{CreditPackage, Module, Plan},
};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError>;
    async fn find_module(&self, module_id: Uuid) -> Result<Option<Module>, AppError>;
    async fn list_active_modules(&self) -> Result<Vec<Module>, AppError>;
    async fn find_package(&self, package_id: Uuid) -> Result<Option<CreditPackage>, AppError>;
    async fn list_packages(&self) -> Result<Vec<CreditPackage>, AppError>;
}

#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogRepository {
    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        let plan = sqlx::query_as::<_, Plan>(
            "SELECT id, name, price, active FROM plans WHERE id = $1",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn find_module(&self, module_id: Uuid) -> Result<Option<Module>, AppError> {
        let module = sqlx::query_as::<_, Module>(
            r#"
            SELECT id, name, description, price, credits_per_execution, active
            FROM modules
            WHERE id = $1
            "#,
        )
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(module)
    }

    async fn list_active_modules(&self) -> Result<Vec<Module>, AppError> {
        let modules = sqlx::query_as::<_, Module>(
            r#"
            SELECT id, name, description, price, credits_per_execution, active
            FROM modules
            WHERE active = TRUE
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(modules)
    }

    async fn find_package(&self, package_id: Uuid) -> Result<Option<CreditPackage>, AppError> {
        let package = sqlx::query_as::<_, CreditPackage>(
            "SELECT id, name, credits, price FROM credit_packages WHERE id = $1",
        )
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(package)
    }

    async fn list_packages(&self) -> Result<Vec<CreditPackage>, AppError> {
        let packages = sqlx::query_as::<_, CreditPackage>(
            "SELECT id, name, credits, price FROM credit_packages ORDER BY credits ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(packages)
    }
}
