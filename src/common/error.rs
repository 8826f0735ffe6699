use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// As variantes de domínio (estado inválido, pagamento recusado, créditos
// insuficientes, conflito de concorrência) nunca deixam a entidade em
// estado parcial: ou a transição commita inteira, ou nada muda.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validação de regra de negócio (ex.: motivo de cancelamento vazio).
    // Rejeitada antes de qualquer mutação.
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    // Pré-condição da máquina de estados violada (ex.: pagar pro-rata
    // sem contrato assinado). Não é retentável automaticamente.
    #[error("Transição de estado inválida: {0}")]
    InvalidState(String),

    // Gateway recusou a cobrança. Retentável: o estado fica intacto.
    #[error("Pagamento recusado: {0}")]
    PaymentFailed(String),

    #[error("Saldo de créditos insuficiente")]
    InsufficientCredits,

    // A linha foi alterada por outro ator entre a leitura e a escrita.
    // O chamador deve reler o estado e tentar de novo.
    #[error("Registro modificado por outra operação")]
    ConcurrentModification,

    // Gateway de pagamento mal configurado. Bloqueia o checkout inteiro.
    #[error("Configuração do gateway de pagamento inválida: {0}")]
    ConfigurationError(String),

    #[error("Organização não encontrada")]
    OrganizationNotFound,

    #[error("Plano não encontrado")]
    PlanNotFound,

    #[error("Módulo não encontrado")]
    ModuleNotFound,

    #[error("Pacote de créditos não encontrado")]
    PackageNotFound,

    #[error("Setup não encontrado")]
    SetupNotFound,

    #[error("Título financeiro não encontrado")]
    TitleNotFound,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação de payload.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidInput(msg) => {
                let body = Json(json!({ "error": msg }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidState(msg) => {
                let body = Json(json!({ "error": msg }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::PaymentFailed(reason) => {
                let body = Json(json!({
                    "error": "Pagamento recusado.",
                    "reason": reason,
                    "retryable": true,
                }));
                return (StatusCode::PAYMENT_REQUIRED, body).into_response();
            }
            AppError::ConcurrentModification => {
                // Corpo distinto: o cliente deve recarregar o estado antes
                // de repetir a operação.
                let body = Json(json!({
                    "error": "O registro foi modificado por outra operação.",
                    "refetch": true,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::ConfigurationError(msg) => {
                tracing::error!("Gateway de pagamento mal configurado: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Pagamentos indisponíveis no momento.")
            }
            AppError::InsufficientCredits => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Saldo de créditos insuficiente.")
            }
            AppError::OrganizationNotFound => (StatusCode::NOT_FOUND, "Organização não encontrada."),
            AppError::PlanNotFound => (StatusCode::NOT_FOUND, "Plano não encontrado."),
            AppError::ModuleNotFound => (StatusCode::NOT_FOUND, "Módulo não encontrado."),
            AppError::PackageNotFound => (StatusCode::NOT_FOUND, "Pacote de créditos não encontrado."),
            AppError::SetupNotFound => (StatusCode::NOT_FOUND, "Setup não encontrado."),
            AppError::TitleNotFound => (StatusCode::NOT_FOUND, "Título financeiro não encontrado."),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "Este e-mail já está em uso."),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos."),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Token de autenticação inválido ou ausente."),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Você não tem permissão para esta operação."),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
