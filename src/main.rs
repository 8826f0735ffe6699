//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Gateway mal configurado não impede o boot, mas fica visível no log
    // (e no GET /api/payment/config) antes do primeiro checkout falhar.
    let gateway_check = app_state.payment_gateway.validate_config();
    if !gateway_check.valid {
        tracing::warn!(
            "⚠️  Gateway de pagamento: {}",
            gateway_check
                .message
                .unwrap_or_else(|| "configuração inválida".to_string())
        );
    }

    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Funil de ativação: acesso por organização checado no handler,
    // etapas de staff checadas pelo extrator.
    let organization_routes = Router::new()
        .route("/{id}/steps", get(handlers::organizations::get_remaining_steps))
        .route("/{id}/sign-contract", post(handlers::organizations::sign_contract))
        .route("/{id}/pay-pro-rata", post(handlers::organizations::pay_pro_rata))
        .route("/{id}/validate", post(handlers::organizations::validate_registration))
        .route("/{id}/deactivate", post(handlers::organizations::deactivate))
        .route("/{id}/titles", get(handlers::organizations::list_titles))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let title_routes = Router::new()
        .route("/mark-overdue", post(handlers::organizations::mark_overdue_titles))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let module_routes = Router::new()
        .route("/", get(handlers::modules::list_modules))
        .route("/{id}/contract", post(handlers::modules::contract_module))
        .route("/{id}/cancel", post(handlers::modules::cancel_module))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let setup_routes = Router::new()
        .route("/", get(handlers::modules::list_pending_setups))
        .route("/{id}/begin", post(handlers::modules::begin_setup))
        .route("/{id}/complete", post(handlers::modules::complete_setup))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let credit_routes = Router::new()
        .route("/packages", get(handlers::credits::list_packages))
        .route("/balance", get(handlers::credits::get_balance))
        .route("/purchase", post(handlers::credits::purchase_credits))
        .route("/consume", post(handlers::credits::consume_credits))
        .route("/history", get(handlers::credits::get_purchase_history))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/payment/config", get(handlers::payment::get_payment_config))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/organizations", organization_routes)
        .nest("/api/titles", title_routes)
        .nest("/api/modules", module_routes)
        .nest("/api/setups", setup_routes)
        .nest("/api/credits", credit_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
