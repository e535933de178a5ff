use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    audit,
    domain::{RegistrationInput, validate_registration},
    dto::auth::{LoginRequest, LoginResponse, LogoutResponse, RegisterRequest},
    entity::{Users, users},
    error::{AppError, AppResult},
    middleware::auth::{Caller, Role, issue_token, pending_approval},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        username,
        email,
        password,
        confirm_password,
    } = payload;

    let username_taken: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = $1")
            .bind(username.as_str())
            .fetch_optional(&state.pool)
            .await?;
    let email_taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;

    validate_registration(
        &RegistrationInput {
            username: &username,
            email: &email,
            password: &password,
            confirm_password: &confirm_password,
        },
        username_taken.is_some(),
        email_taken.is_some(),
    )?;

    let password_hash = hash_password(&password)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, is_admin, is_approved, is_active)
        VALUES ($1, $2, $3, $4, FALSE, FALSE, FALSE)
        RETURNING id, username, email, is_admin, is_approved, is_active, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username.as_str())
    .bind(email.as_str())
    .bind(password_hash)
    .fetch_one(&state.pool)
    .await
    .map_err(registration_conflict)?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered, awaiting approval");
    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Registration submitted; your account is awaiting administrator approval",
        user,
        Some(Meta::empty()),
    ))
}

// Unique violations at insert time map to the same field errors as the pre-check.
fn registration_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return if db_err.constraint() == Some("users_email_key") {
                AppError::field("email", "Email is already in use")
            } else {
                AppError::field("username", "Username is already taken")
            };
        }
    }
    AppError::from(err)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let user = Users::find()
        .filter(users::Column::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(invalid_credentials()),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid_credentials());
    }

    let role = Caller::resolve(Some(&user)).role();
    let redirect_to = match role {
        Role::Admin => "/api/admin/dashboard",
        Role::ApprovedUser => "/api/products",
        Role::PendingUser | Role::Anonymous => {
            tracing::info!(user_id = %user.id, "login refused, account not approved");
            return Err(pending_approval());
        }
    };

    let token = issue_token(&state.auth, user.id, role)?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("Welcome {}", user.username),
        LoginResponse {
            token: format!("Bearer {}", token),
            role,
            redirect_to: redirect_to.to_string(),
        },
        Some(Meta::empty()),
    ))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid username or password".into())
}

/// Tokens are stateless; the client discards its token and the event is recorded.
pub async fn logout_user(
    state: &AppState,
    caller: &Caller,
) -> AppResult<ApiResponse<LogoutResponse>> {
    let principal = caller.require_authenticated()?;

    audit::record(
        &state.pool,
        Some(principal.user_id),
        "user_logout",
        "users",
        serde_json::json!({ "user_id": principal.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged out",
        LogoutResponse { logged_out: true },
        Some(Meta::empty()),
    ))
}

pub async fn current_user(state: &AppState, caller: &Caller) -> AppResult<ApiResponse<User>> {
    let principal = caller.require_member()?;
    let user = Users::find_by_id(principal.user_id)
        .one(&state.orm)
        .await?
        .map(User::from)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Profile", user, Some(Meta::empty())))
}
