use std::sync::Arc;

use tracing::info;

use super::http_api::HttpAuthApi;
use crate::config::ApiConfig;
use crate::error::AuthError;
use crate::models::{AccessToken, Credentials};

/// The external authentication service as seen by the session manager.
///
/// The durable refresh credential never crosses this boundary: implementations
/// carry it as an opaque side channel (a cookie jar for HTTP) and only hand back
/// short-lived access tokens.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// A descriptive name for logs.
    fn get_name(&self) -> &str;

    /// Exchange credentials for an access token; also establishes the refresh credential.
    async fn login(&self, credentials: &Credentials) -> Result<AccessToken, AuthError>;

    /// Create an account. Does not authenticate.
    async fn signup(&self, credentials: &Credentials) -> Result<(), AuthError>;

    /// Obtain a fresh access token using the refresh credential.
    async fn refresh(&self) -> Result<AccessToken, AuthError>;

    /// Drop the locally held refresh credential right away, so nothing issued
    /// after a logout can silently re-authenticate.
    fn forget_credential(&self) {}

    /// Ask the server to invalidate the refresh credential. Callers ignore the outcome.
    async fn logout(&self) -> Result<(), AuthError>;
}

/// Create the HTTP-backed API from config.
pub fn create_auth_api(config: &ApiConfig) -> Result<Arc<dyn AuthApi>, AuthError> {
    info!("Creating auth API client for '{}'", config.base_url);
    Ok(Arc::new(HttpAuthApi::new(config)?))
}
