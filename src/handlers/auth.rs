// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    services::auth::RegistrationData,
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 1, message = "O nome da organização é obrigatório."))]
    #[schema(example = "Vendas & Cia Ltda")]
    pub organization_name: String,

    #[schema(example = "12.345.678/0001-90")]
    pub document: Option<String>,

    pub plan_id: Uuid,

    #[validate(length(min = 1, message = "O nome do administrador é obrigatório."))]
    #[schema(example = "Maria Souza")]
    pub admin_name: String,

    #[validate(email(message = "E-mail inválido."))]
    #[schema(example = "maria@vendasecia.com.br")]
    pub admin_email: String,

    #[validate(length(min = 8, message = "A senha precisa de ao menos 8 caracteres."))]
    pub admin_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(email(message = "E-mail inválido."))]
    pub email: String,

    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
}

// ---
// Handlers
// ---

// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Organização registrada; funil em contract_signature"),
        (status = 409, description = "E-mail já em uso")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (organization, admin) = app_state
        .auth_service
        .register(RegistrationData {
            organization_name: payload.organization_name,
            document: payload.document,
            plan_id: payload.plan_id,
            admin_name: payload.admin_name,
            admin_email: payload.admin_email,
            admin_password: payload.admin_password,
        })
        .await?;

    let body = serde_json::json!({
        "organization": organization,
        "admin": admin,
    });
    Ok((StatusCode::CREATED, Json(body)))
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Token emitido", body = LoginResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token = app_state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok((StatusCode::OK, Json(LoginResponse { token })))
}

// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Usuário autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(user: AuthenticatedUser) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::OK, Json(user.0)))
}
