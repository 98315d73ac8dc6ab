use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;

use super::error::{ApiError, ApiJson};
use super::validation::validate_signup_request;
use crate::auth::{hash_password, verify_password, TokenError, TokenType};
use crate::db::{
    AuthResponse, LoginRequest, RefreshRequest, RefreshResponse, SignupRequest, User,
    UserResponse,
};
use crate::AppState;

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(e) => {
                tracing::error!("Failed to sign token: {}", e);
                ApiError::internal("Failed to issue token")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

/// Create an account and sign the new user in
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validate_signup_request(&req)?;

    if User::find_by_username(&state.db, req.username.trim())
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("A user with that username already exists"));
    }
    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::conflict("A user with that email already exists"));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to create user")
    })?;

    let user = User::insert(&state.db, &req, &password_hash).await?;
    let tokens = state.tokens.issue_pair(user.id, &user.username)?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(user),
            tokens,
        }),
    ))
}

/// Exchange a username (or email) and password for a token pair
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = req.username.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let email = req.email.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let user = match (username, email) {
        (Some(username), _) => User::find_by_username(&state.db, username).await?,
        (None, Some(email)) => User::find_by_email(&state.db, email).await?,
        (None, None) => {
            return Err(ApiError::validation_field(
                "username",
                "username or email is required",
            ))
        }
    };

    // Same answer for unknown users and wrong passwords
    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            tracing::debug!("Rejected login attempt");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    let tokens = state.tokens.issue_pair(user.id, &user.username)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        tokens,
    }))
}

/// Issue a fresh access token from a refresh token
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    if req.refresh.trim().is_empty() {
        return Err(ApiError::validation_field("refresh", "refresh is required"));
    }

    let claims = state.tokens.verify(req.refresh.trim(), TokenType::Refresh)?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    // Tokens outlive deleted accounts otherwise
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    let access = state.tokens.issue_access(user.id, &user.username)?;
    Ok(Json(RefreshResponse { access }))
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Require a valid access token when `auth.require_auth` is set.
/// The verified claims are available to handlers as an extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.auth.require_auth {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))?;
    let claims = state.tokens.verify(token, TokenType::Access)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
