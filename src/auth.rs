use crate::api::internal_error;
use crate::models::{User, UserResponse};
use crate::state::SharedState;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ── Request/response types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

// ── JWT ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub exp: usize, // expiry timestamp
    pub iat: usize, // issued at
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hash: {0}")]
    Hash(String),
    #[error("token lifetime of {0} minutes is out of range")]
    Lifetime(u64),
}

pub fn create_token(user: &User, secret: &str, lifetime_minutes: u64) -> Result<String, AuthError> {
    let now = Utc::now();
    let expiry = i64::try_from(lifetime_minutes)
        .ok()
        .and_then(Duration::try_minutes)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(AuthError::Lifetime(lifetime_minutes))?;

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        exp: expiry.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

// ── Passwords ──────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ── Handlers ───────────────────────────────────────────────────

pub async fn sign_up(
    State(state): State<SharedState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = normalize_email(&payload.email);
    let name = payload.name.trim();
    if email.is_empty() || name.is_empty() || payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email, name and password are required".to_string(),
        ));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name: name.to_string(),
        password_hash: hash_password(&payload.password).map_err(internal_error)?,
        created_at: Utc::now(),
    };

    let inserted = state.store.insert_user(&user).map_err(internal_error)?;
    if !inserted {
        return Err((StatusCode::BAD_REQUEST, "Email already registered".to_string()));
    }

    let token = create_token(
        &user,
        &state.settings.jwt_secret,
        state.settings.jwt_expiration_in_minutes,
    )
    .map_err(internal_error)?;

    tracing::info!(user_id = %user.id, "user signed up");
    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

pub async fn sign_in(
    State(state): State<SharedState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string());

    let user = state
        .store
        .get_user_by_email(&normalize_email(&payload.email))
        .map_err(internal_error)?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = create_token(
        &user,
        &state.settings.jwt_secret,
        state.settings.jwt_expiration_in_minutes,
    )
    .map_err(internal_error)?;

    tracing::info!(user_id = %user.id, "user signed in");
    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/// Tokens are stateless; the client just forgets its copy.
pub async fn logout() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// Resolve the bearer token to a [`User`] and attach it to the request.
pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or((StatusCode::UNAUTHORIZED, "Missing or invalid token".to_string()))?;

    let claims = verify_token(token, &state.settings.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
    })?;

    let user = state
        .store
        .get_user(&claims.sub)
        .map_err(internal_error)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
