mod client_core;
mod requests;
pub mod types;

use reqwest::StatusCode;

pub use client_core::*;

/// Completion requests use these fixed knobs so chart tool selection stays reproducible.
pub const COMPLETION_TEMPERATURE: f32 = 0.0;
pub const COMPLETION_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmErrorKind {
    RateLimited,
    Auth,
    Server,
    Network,
    Timeout,
    Client,
    Deserialize,
    Unknown,
}

pub fn classify_error(status: Option<StatusCode>, err: &anyhow::Error) -> LlmErrorKind {
    if let Some(st) = status {
        if st == StatusCode::TOO_MANY_REQUESTS {
            return LlmErrorKind::RateLimited;
        }
        if st == StatusCode::UNAUTHORIZED || st == StatusCode::FORBIDDEN {
            return LlmErrorKind::Auth;
        }
        if st.is_server_error() {
            return LlmErrorKind::Server;
        }
        if st.is_client_error() {
            return LlmErrorKind::Client;
        }
    }
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        if e.is_timeout() {
            return LlmErrorKind::Timeout;
        }
        if e.is_connect() || e.is_body() || e.is_request() {
            return LlmErrorKind::Network;
        }
    }
    if err.downcast_ref::<serde_json::Error>().is_some() {
        return LlmErrorKind::Deserialize;
    }
    LlmErrorKind::Unknown
}
