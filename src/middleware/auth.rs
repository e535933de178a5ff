//! Capability resolution.
//!
//! Every request is resolved once into a [`Caller`] from the bearer token and
//! the *current* user row, so approval or deletion takes effect on the next
//! request even while an old token is still unexpired. Handlers then use the
//! `require_*` guards instead of inspecting account flags themselves.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::EntityTrait;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::{Users, users},
    error::{AppError, AppResult},
    state::{AppState, AuthSettings},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Admin(Principal),
    ApprovedUser(Principal),
    PendingUser(Principal),
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ApprovedUser,
    PendingUser,
    Anonymous,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ApprovedUser => "approved_user",
            Role::PendingUser => "pending_user",
            Role::Anonymous => "anonymous",
        }
    }
}

impl Caller {
    pub fn resolve(user: Option<&users::Model>) -> Self {
        let Some(user) = user else {
            return Caller::Anonymous;
        };
        let principal = Principal {
            user_id: user.id,
            username: user.username.clone(),
        };
        if user.is_admin {
            Caller::Admin(principal)
        } else if user.is_approved && user.is_active {
            Caller::ApprovedUser(principal)
        } else {
            Caller::PendingUser(principal)
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Caller::Admin(_) => Role::Admin,
            Caller::ApprovedUser(_) => Role::ApprovedUser,
            Caller::PendingUser(_) => Role::PendingUser,
            Caller::Anonymous => Role::Anonymous,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Caller::Admin(p) | Caller::ApprovedUser(p) | Caller::PendingUser(p) => Some(p),
            Caller::Anonymous => None,
        }
    }

    pub fn require_authenticated(&self) -> AppResult<&Principal> {
        self.principal()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }

    pub fn require_admin(&self) -> AppResult<&Principal> {
        match self {
            Caller::Admin(p) => Ok(p),
            Caller::Anonymous => Err(AppError::Unauthorized("Authentication required".into())),
            _ => Err(AppError::Forbidden("Administrator access required".into())),
        }
    }

    /// Cart and order actions belong to approved regular users only.
    pub fn require_approved_user(&self) -> AppResult<&Principal> {
        match self {
            Caller::ApprovedUser(p) => Ok(p),
            Caller::Anonymous => Err(AppError::Unauthorized("Authentication required".into())),
            Caller::PendingUser(_) => Err(pending_approval()),
            Caller::Admin(_) => Err(AppError::Forbidden(
                "Administrators do not have a cart".into(),
            )),
        }
    }

    /// Browsing the catalog and viewing one's profile: admins or approved users.
    pub fn require_member(&self) -> AppResult<&Principal> {
        match self {
            Caller::Admin(p) | Caller::ApprovedUser(p) => Ok(p),
            Caller::PendingUser(_) => Err(pending_approval()),
            Caller::Anonymous => Err(AppError::Unauthorized("Authentication required".into())),
        }
    }
}

pub fn pending_approval() -> AppError {
    AppError::Forbidden("Account is awaiting administrator approval".into())
}

pub fn issue_token(settings: &AuthSettings, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(settings.token_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(settings: &AuthSettings, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(Caller::Anonymous);
        };

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let claims = decode_token(&state.auth, token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        let user = Users::find_by_id(user_id).one(&state.orm).await?;
        let caller = Caller::resolve(user.as_ref());
        tracing::debug!(user_id = %user_id, role = caller.role().as_str(), "caller resolved");
        Ok(caller)
    }
}
