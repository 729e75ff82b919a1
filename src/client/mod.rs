//! Shared HTTP client for requests made on behalf of the signed-in user.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::auth::SessionManager;
use crate::config::ApiConfig;
use crate::error::AuthError;
use crate::models::AccessToken;
use crate::utils::http_helpers::transport_error;

const REQUEST_FAILED: &str = "Request failed";

/// Attaches the session's access token to outgoing requests.
///
/// A token close to expiry is refreshed before it is used, and a `401` on a
/// request that carried a token is answered with one refresh and one retry.
#[derive(Clone)]
pub struct AuthorizedClient {
    http: Client,
    session: SessionManager,
    config: ApiConfig,
}

impl AuthorizedClient {
    pub fn new(session: SessionManager, config: &ApiConfig) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()
            .map_err(|e| AuthError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(AuthorizedClient {
            http,
            session,
            config: config.clone(),
        })
    }

    /// Absolute URL for a path on the configured API.
    pub fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    pub async fn get(&self, path: &str) -> Result<Response, AuthError> {
        let url = self.url(path);
        self.send(|http| http.get(&url)).await
    }

    /// Sends the request built by `make`. It may be called twice when the
    /// first attempt is rejected with `401`.
    ///
    /// Only transport failures are errors; any HTTP status, including a second
    /// `401`, is handed back for the caller to interpret.
    pub async fn send<F>(&self, make: F) -> Result<Response, AuthError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.usable_token().await;
        let response = self.dispatch(&make, token.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || token.is_none() {
            return Ok(response);
        }

        debug!("Request rejected with 401, refreshing once");
        match self.session.silent_refresh().await {
            Ok(fresh) => self.dispatch(&make, Some(&fresh)).await,
            Err(err) => {
                debug!("Refresh after 401 failed: {}", err);
                Ok(response)
            }
        }
    }

    async fn usable_token(&self) -> Option<AccessToken> {
        let token = self.session.access_token()?;
        if !token.expires_within(Utc::now(), self.session.refresh_skew()) {
            return Some(token);
        }

        debug!("Access token is about to expire, refreshing first");
        match self.session.silent_refresh().await {
            Ok(fresh) => Some(fresh),
            // Whatever the refresh left behind (possibly nothing) is used as is.
            Err(_) => self.session.access_token(),
        }
    }

    async fn dispatch<F>(&self, make: &F, token: Option<&AccessToken>) -> Result<Response, AuthError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut request = make(&self.http);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, token.bearer());
        }
        request
            .send()
            .await
            .map_err(|e| transport_error(e, REQUEST_FAILED))
    }
}
