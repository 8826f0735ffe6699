// src/services/auth.rs

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{CatalogStore, OrganizationStore, UserStore},
    models::{
        auth::{Claims, NewUser, User, UserRole},
        organization::{NewOrganization, Organization},
    },
};

/// Dados do formulário de registro: a organização e o seu administrador
/// nascem juntos, com o funil em `Pending(ContractSignature)`.
#[derive(Debug, Clone)]
pub struct RegistrationData {
    pub organization_name: String,
    pub document: Option<String>,
    pub plan_id: uuid::Uuid,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    organizations: Arc<dyn OrganizationStore>,
    catalog: Arc<dyn CatalogStore>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        organizations: Arc<dyn OrganizationStore>,
        catalog: Arc<dyn CatalogStore>,
        jwt_secret: String,
    ) -> Self {
        Self {
            users,
            organizations,
            catalog,
            jwt_secret,
        }
    }

    pub async fn register(
        &self,
        data: RegistrationData,
    ) -> Result<(Organization, User), AppError> {
        if self.users.find_by_email(&data.admin_email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        self.catalog
            .find_plan(data.plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)?;

        let password_hash = bcrypt::hash(&data.admin_password, bcrypt::DEFAULT_COST)?;

        let (organization, admin) = self
            .organizations
            .create_with_admin(
                NewOrganization {
                    name: data.organization_name,
                    document: data.document,
                    plan_id: data.plan_id,
                },
                NewUser {
                    name: data.admin_name,
                    email: data.admin_email,
                    password_hash,
                    role: UserRole::OrgAdmin,
                },
            )
            .await?;

        tracing::info!(
            organization_id = %organization.id,
            "Organização registrada; funil iniciado em contract_signature"
        );

        Ok((organization, admin))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !bcrypt::verify(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let expiration = Utc::now() + Duration::hours(24);
        let claims = Claims {
            sub: user.id,
            org_id: user.organization_id,
            role: user.role,
            exp: expiration.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.users
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }
}
