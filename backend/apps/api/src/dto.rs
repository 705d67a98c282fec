//! Request / Response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct InboxMessage {
    pub sender: String,
    pub message: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub email: String,
    pub blocked: bool,
}
