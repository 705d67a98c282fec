//! HTTP Handlers
//!
//! Thin glue between the HTTP surface and the confidentiality core: every
//! handler validates input, calls into `vault`, and stores or returns the
//! core's serialized outputs. No cryptography happens here.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};

use kernel::error::app_error::{AppError, AppResult};
use vault::{Claims, Credential, check_password_policy, verify_password};

use crate::dto::{
    BlockRequest, InboxMessage, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    SendMessageRequest, UserSummary,
};
use crate::state::AppState;
use crate::store::{MessageRecord, UserRecord};

/// Extract and validate the bearer token, returning its claims.
fn require_claims(state: &AppState, headers: &HeaderMap) -> AppResult<Claims> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

    let token = value.strip_prefix("Bearer ").unwrap_or(value);
    Ok(state.tokens.parse(token)?)
}

/// Minimal structural email check: one `@`, non-empty local part, dotted
/// domain.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && tld.len() >= 2 && tld.chars().all(char::is_alphabetic),
        None => false,
    }
}

// ============================================================================
// Auth
// ============================================================================

/// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    if !is_valid_email(&req.email) {
        tracing::warn!(email = %req.email, "Failed registration attempt - invalid email format");
        return Err(AppError::bad_request("Invalid email format"));
    }

    if let Err(violation) = check_password_policy(&req.password) {
        tracing::warn!(email = %req.email, "Failed registration attempt - password policy");
        return Err(AppError::bad_request(violation.to_string()));
    }

    let record = UserRecord {
        email: req.email.clone(),
        credential: Credential::from_password(&req.password).encode(),
        role: "user".to_string(),
        blocked: false,
    };
    if !state.users.insert(record) {
        tracing::warn!(email = %req.email, "Failed registration attempt - email already in use");
        return Err(AppError::conflict("Email already in use"));
    }

    tracing::info!(email = %req.email, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    // Identical response for unknown email and wrong password - the
    // difference must not be observable.
    let Some(user) = state.users.get(&req.email) else {
        tracing::warn!(email = %req.email, "Failed login attempt - unknown user");
        return Err(AppError::unauthorized("Invalid email or password"));
    };

    if user.blocked {
        tracing::warn!(email = %req.email, "Blocked login attempt");
        return Err(AppError::forbidden("Your account is blocked"));
    }

    if !verify_password(&req.password, &user.credential) {
        tracing::warn!(email = %req.email, "Failed login attempt - wrong password");
        return Err(AppError::unauthorized("Invalid email or password"));
    }

    let token = state.tokens.issue(&user.email, &user.role, user.blocked);
    tracing::info!(email = %user.email, "Successful login");
    Ok(Json(LoginResponse { token }))
}

/// GET /api/logout
///
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// client discards its copy.
pub async fn logout() -> Json<MessageResponse> {
    tracing::info!("User logged out");
    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}

// ============================================================================
// Users and messages
// ============================================================================

/// GET /api/user/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<UserSummary>>> {
    let claims = require_claims(&state, &headers)?;
    tracing::info!(email = %claims.subject, "User list requested");

    let users = state
        .users
        .list()
        .into_iter()
        .filter(|u| u.email != claims.subject)
        .map(|u| UserSummary {
            email: u.email,
            role: u.role,
        })
        .collect();
    Ok(Json(users))
}

/// POST /api/user/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let claims = require_claims(&state, &headers)?;

    if req.message.trim().is_empty() {
        return Err(AppError::bad_request("Message cannot be empty"));
    }
    if state.users.get(&req.receiver).is_none() {
        tracing::warn!(receiver = %req.receiver, "Failed to send message - receiver does not exist");
        return Err(AppError::bad_request("Receiver does not exist"));
    }

    let encrypted = vault::encrypt(&req.message, &state.message_key)?;
    state.messages.push(MessageRecord {
        sender: claims.subject.clone(),
        receiver: req.receiver,
        body: encrypted.encode(),
        date: chrono::Utc::now(),
    });

    tracing::info!(sender = %claims.subject, "Message sent");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Message sent successfully".to_string(),
        }),
    ))
}

/// GET /api/user/messages
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<InboxMessage>>> {
    let claims = require_claims(&state, &headers)?;
    tracing::info!(email = %claims.subject, "Message list requested");

    let mut inbox = Vec::new();
    for record in state.messages.for_receiver(&claims.subject) {
        let encrypted = vault::EncryptedMessage::parse(&record.body)?;
        let plaintext = vault::decrypt(&encrypted, &state.message_key)?;
        inbox.push(InboxMessage {
            sender: record.sender,
            message: plaintext,
            date: record.date,
        });
    }
    Ok(Json(inbox))
}

// ============================================================================
// Admin
// ============================================================================

/// POST /api/admin/block
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<BlockRequest>,
) -> AppResult<Json<MessageResponse>> {
    let claims = require_claims(&state, &headers)?;
    if claims.role != "admin" {
        tracing::warn!(email = %claims.subject, "Non-admin attempted to block a user");
        return Err(AppError::forbidden("Access denied"));
    }

    if !state.users.set_blocked(&req.email, req.blocked) {
        return Err(AppError::not_found("User not found"));
    }

    tracing::info!(
        admin = %claims.subject,
        email = %req.email,
        blocked = req.blocked,
        "User block status changed"
    );
    Ok(Json(MessageResponse {
        message: if req.blocked {
            "User blocked".to_string()
        } else {
            "User unblocked".to_string()
        },
    }))
}
