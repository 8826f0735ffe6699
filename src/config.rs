// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    db::{
        PgCatalogRepository, PgCreditRepository, PgFinanceRepository, PgModuleRepository,
        PgOrganizationRepository, PgUserRepository,
    },
    services::{
        AuthService, CreditLedgerService, ModuleProvisioningService,
        OrganizationLifecycleService, PaymentGateway, StripeGateway,
    },
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub lifecycle_service: OrganizationLifecycleService,
    pub provisioning_service: ModuleProvisioningService,
    pub credit_service: CreditLedgerService,
    pub payment_gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    // Carrega as configurações e monta o gráfico de dependências.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        // A chave pode estar ausente em dev: `validate_config()` reporta o
        // problema para a UI antes de qualquer tentativa de cobrança.
        let stripe_secret = env::var("STRIPE_SECRET_KEY").unwrap_or_default();

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let organizations = Arc::new(PgOrganizationRepository::new(db_pool.clone()));
        let finance = Arc::new(PgFinanceRepository::new(db_pool.clone()));
        let catalog = Arc::new(PgCatalogRepository::new(db_pool.clone()));
        let modules = Arc::new(PgModuleRepository::new(db_pool.clone()));
        let credits = Arc::new(PgCreditRepository::new(db_pool.clone()));
        let users = Arc::new(PgUserRepository::new(db_pool.clone()));

        let payment_gateway: Arc<dyn PaymentGateway> =
            Arc::new(StripeGateway::new(stripe_secret));

        let auth_service = AuthService::new(
            users,
            organizations.clone(),
            catalog.clone(),
            jwt_secret,
        );
        let lifecycle_service = OrganizationLifecycleService::new(
            organizations,
            finance,
            catalog.clone(),
        );
        let provisioning_service = ModuleProvisioningService::new(modules, catalog.clone());
        let credit_service = CreditLedgerService::new(credits, catalog);

        Ok(Self {
            db_pool,
            auth_service,
            lifecycle_service,
            provisioning_service,
            credit_service,
            payment_gateway,
        })
    }
}
