// src/models/catalog.rs
//
// Catálogo (planos, módulos e pacotes de créditos). Do ponto de vista dos
// serviços de provisionamento e billing o catálogo é somente-leitura; a
// edição acontece por um caminho administrativo fora deste núcleo.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,

    #[schema(example = "Profissional")]
    pub name: String,

    /// Mensalidade cheia. A cobrança pro-rata é derivada deste valor.
    #[schema(example = "299.90")]
    pub price: Decimal,

    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: Uuid,

    #[schema(example = "Análise de Ligações")]
    pub name: String,

    #[schema(example = "Transcreve e pontua ligações de vendas com IA.")]
    pub description: Option<String>,

    /// Taxa única de setup, cobrada na contratação.
    #[schema(example = "499.00")]
    pub price: Decimal,

    /// Custo em créditos por execução, quando o módulo consome créditos.
    #[schema(example = 3)]
    pub credits_per_execution: Option<i32>,

    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditPackage {
    pub id: Uuid,

    #[schema(example = "Pacote 150")]
    pub name: String,

    #[schema(example = 150)]
    pub credits: i32,

    #[schema(example = "199.00")]
    pub price: Decimal,
}
