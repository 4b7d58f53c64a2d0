use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use barberflow_db::models::{NewUser, ProfileUpdate, UserRow};
use barberflow_db::StoreError;
use barberflow_types::api::{
    AuthResponse, Claims, ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    ResetPasswordRequest, UpdatePasswordRequest, UpdateProfileRequest,
};
use barberflow_types::models::UserRole;
pub use barberflow_types::models::normalize_email;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, with_db};

pub const MIN_PASSWORD_LEN: usize = 6;
const TOKEN_TTL_DAYS: i64 = 30;
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::bad_request("Name and email are required"));
    }
    check_password(&req.password)?;

    let password_hash = hash_password(&req.password)?;
    let role = req.role.unwrap_or(UserRole::Barber);
    let barber_shop = req.barber_shop;

    let user = with_db(&state, move |db| {
        if db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::bad_request("User already exists"));
        }
        db.create_user(&NewUser {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            role,
            barber_shop: barber_shop.as_deref(),
        })
        .map_err(|e| match e {
            StoreError::Duplicate => ApiError::bad_request("User already exists"),
            other => other.into(),
        })
    })
    .await?;

    let token = create_token(&state.jwt_secret, user.id, &user.email)?;
    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.to_public(),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let lookup = email.clone();
    let user = with_db(&state, move |db| Ok(db.get_user_by_email(&lookup)?)).await?;

    let Some(user) = user.filter(|u| verify_password(&u.password, &req.password)) else {
        warn!(%email, "Failed login attempt");
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    };

    let token = create_token(&state.jwt_secret, user.id, &user.email)?;
    Ok(Json(AuthResponse {
        user: user.to_public(),
        token,
    }))
}

pub async fn me(Extension(user): Extension<UserRow>) -> impl IntoResponse {
    Json(user.to_public())
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let user = with_db(&state, move |db| Ok(db.get_user_by_email(&email)?))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let raw_token = generate_reset_token();
    let digest = hash_reset_token(&raw_token);
    let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    let user_id = user.id;
    with_db(&state, move |db| Ok(db.set_reset_token(user_id, &digest, expires)?)).await?;

    // No mailer: the link goes to the server log.
    let reset_url = format!(
        "{}/reset-password/{}",
        state.client_url.trim_end_matches('/'),
        raw_token
    );
    info!(%user_id, %reset_url, "Password reset requested");

    Ok(Json(MessageResponse::new(
        "Password reset link sent to email (check console)",
    )))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_password(&req.password)?;
    let digest = hash_reset_token(&token);
    let password_hash = hash_password(&req.password)?;

    let user_id = with_db(&state, move |db| {
        Ok(db.consume_reset_token(&digest, Utc::now(), &password_hash)?)
    })
    .await?
    .ok_or_else(|| ApiError::bad_request("Token is invalid or has expired"))?;

    info!(%user_id, "Password reset completed");
    Ok(Json(MessageResponse::new("Password reset successful")))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Blank fields are treated as absent.
    let update = ProfileUpdate {
        name: req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        email: req.email.map(|e| normalize_email(&e)).filter(|e| !e.is_empty()),
        barber_shop: req.barber_shop.filter(|s| !s.trim().is_empty()),
    };
    let user_id = user.id;

    let updated = with_db(&state, move |db| {
        if let Some(email) = &update.email {
            if let Some(other) = db.get_user_by_email(email)? {
                if other.id != user_id {
                    return Err(ApiError::bad_request("Email already in use"));
                }
            }
        }
        db.update_profile(user_id, &update).map_err(|e| match e {
            StoreError::Duplicate => ApiError::bad_request("Email already in use"),
            other => other.into(),
        })
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(updated.to_public()))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiJson(req): ApiJson<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !verify_password(&user.password, &req.current_password) {
        return Err(ApiError::bad_request("Invalid current password"));
    }
    check_password(&req.new_password)?;

    let password_hash = hash_password(&req.new_password)?;
    let user_id = user.id;
    let updated = with_db(&state, move |db| Ok(db.set_password(user_id, &password_hash)?)).await?;
    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// 32 random bytes, hex encoded. Only the SHA-256 digest is stored.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_subject() {
        let id = Uuid::new_v4();
        let token = create_token("test-secret", id, "a@b.com").unwrap();
        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "a@b.com");
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, "hunter22"));
        assert!(!verify_password(&hash, "hunter23"));
        assert!(!verify_password("not-a-phc-string", "hunter22"));
    }

    #[test]
    fn reset_tokens_are_random_hex() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(hash_reset_token(&a).len(), 64);
        assert_ne!(hash_reset_token(&a), a);
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Bob@Example.COM "), "bob@example.com");
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(check_password("12345").is_err());
        assert!(check_password("123456").is_ok());
    }
}
