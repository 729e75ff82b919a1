use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::AuthError;

/// `{ "error": "..." }`, the failure body of the auth endpoints.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Reads the server's error message from a failed response, if it sent one.
pub async fn error_message(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

/// Maps a non-2xx status to an error kind, using `fallback` when the server gave no message.
pub fn classify_status(status: StatusCode, message: Option<String>, fallback: &str) -> AuthError {
    let message = message.unwrap_or_else(|| fallback.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuthError::Unauthorized(message),
        _ => AuthError::ServerError(message),
    }
}

/// Converts a failed response into an `AuthError`, consuming the body.
pub async fn response_error(response: Response, fallback: &str) -> AuthError {
    let status = response.status();
    let message = error_message(response).await;
    debug!("Request failed with status {}: {:?}", status, message);
    classify_status(status, message, fallback)
}

/// A request that never produced a response. The detail goes to the log,
/// the user sees `fallback`.
pub fn transport_error(err: reqwest::Error, fallback: &str) -> AuthError {
    debug!("Request could not complete: {}", err);
    AuthError::Network(fallback.to_string())
}
