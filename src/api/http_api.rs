use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, COOKIE};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::{debug, info};

use super::base::AuthApi;
use crate::config::ApiConfig;
use crate::error::AuthError;
use crate::models::{AccessToken, Credentials};
use crate::utils::http_helpers::{response_error, transport_error};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const REFRESH_FAILED: &str = "Refresh failed";
const LOGOUT_FAILED: &str = "Logout failed";

/// `{ "access_token": "..." }`, returned by login and refresh.
#[derive(Deserialize)]
struct TokenBody {
    access_token: Option<String>,
}

/// Talks to the auth endpoints over HTTP.
///
/// The client keeps an in-memory cookie jar, so the httpOnly refresh cookie set
/// by a successful login travels with every later refresh without this crate
/// ever reading it.
pub struct HttpAuthApi {
    config: ApiConfig,
    client: Client,
    jar: Arc<Jar>,
    refresh_url: Url,
    /// Cookie header captured by `forget_credential`, sent with the logout notification.
    retired: Mutex<Option<HeaderValue>>,
}

impl HttpAuthApi {
    pub fn new(config: &ApiConfig) -> Result<Self, AuthError> {
        let refresh_url = Url::parse(&config.url(&config.refresh_path)).map_err(|e| {
            AuthError::Network(format!("Invalid base_url '{}': {}", config.base_url, e))
        })?;
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()
            .map_err(|e| AuthError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpAuthApi {
            config: config.clone(),
            client,
            jar,
            refresh_url,
            retired: Mutex::new(None),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        debug!("POST {}", url);
        self.client.post(url)
    }

    /// Sends the request; non-2xx responses become errors.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Response, AuthError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, fallback))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(response_error(response, fallback).await)
        }
    }

    async fn read_token(response: Response, fallback: &str) -> Result<AccessToken, AuthError> {
        let body = response.json::<TokenBody>().await.map_err(|e| {
            debug!("Unreadable token body: {}", e);
            AuthError::ServerError(fallback.to_string())
        })?;
        body.access_token
            .filter(|t| !t.is_empty())
            .map(AccessToken::new)
            .ok_or_else(|| AuthError::ServerError(fallback.to_string()))
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    fn get_name(&self) -> &str {
        &self.config.base_url
    }

    async fn login(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        let request = self.post(&self.config.login_path).json(credentials);
        let response = self.send(request, LOGIN_FAILED).await?;
        Self::read_token(response, LOGIN_FAILED).await
    }

    async fn signup(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let request = self.post(&self.config.signup_path).json(credentials);
        self.send(request, REGISTRATION_FAILED).await?;
        info!("Account created for '{}'", credentials.email);
        Ok(())
    }

    async fn refresh(&self) -> Result<AccessToken, AuthError> {
        let response = self
            .send(self.post(&self.config.refresh_path), REFRESH_FAILED)
            .await?;
        Self::read_token(response, REFRESH_FAILED).await
    }

    fn forget_credential(&self) {
        let held = self.jar.cookies(&self.refresh_url);
        *self.retired.lock().unwrap_or_else(PoisonError::into_inner) = held;
        // An already-expired cookie evicts the stored one.
        self.jar.add_cookie_str(
            &format!(
                "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/",
                self.config.refresh_cookie
            ),
            &self.refresh_url,
        );
        debug!("Dropped local refresh credential");
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let retired = self
            .retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(path) = &self.config.logout_path else {
            return Ok(());
        };

        let mut request = self.post(path);
        if let Some(cookie) = retired {
            request = request.header(COOKIE, cookie);
        }
        self.send(request, LOGOUT_FAILED).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn api_for(server: &Server) -> HttpAuthApi {
        HttpAuthApi::new(&ApiConfig::with_base_url(server.url())).expect("client builds")
    }

    #[tokio::test]
    async fn login_posts_credentials_and_reads_the_token() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/login")
            .match_body(Matcher::Json(
                serde_json::json!({ "email": "a@b.com", "password": "secret123" }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "tok-1"}"#)
            .create_async()
            .await;

        let token = api_for(&server)
            .login(&Credentials::new("a@b.com", "secret123"))
            .await
            .expect("login should succeed");

        m.assert_async().await;
        assert_eq!(token.as_str(), "tok-1");
    }

    #[tokio::test]
    async fn login_surfaces_the_server_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/login")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "invalid credentials"}"#)
            .create_async()
            .await;

        let err = api_for(&server)
            .login(&Credentials::new("a@b.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Unauthorized("invalid credentials".into()));
    }

    #[tokio::test]
    async fn login_without_a_token_in_the_body_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/login")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let err = api_for(&server)
            .login(&Credentials::new("a@b.com", "secret123"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::ServerError("Login failed".into()));
    }

    #[tokio::test]
    async fn signup_conflict_falls_back_without_a_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/signup")
            .with_status(409)
            .create_async()
            .await;

        let err = api_for(&server)
            .signup(&Credentials::new("a@b.com", "secret123"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::ServerError("Registration failed".into()));
    }

    #[tokio::test]
    async fn refresh_sends_the_cookie_set_by_login() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/login")
            .with_status(200)
            .with_header("set-cookie", "refresh_token=r-1; Path=/; HttpOnly")
            .with_body(r#"{"access_token": "tok-1"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/refresh")
            .match_header("cookie", Matcher::Regex("refresh_token=r-1".into()))
            .with_status(200)
            .with_body(r#"{"access_token": "tok-2"}"#)
            .create_async()
            .await;

        let api = api_for(&server);
        api.login(&Credentials::new("a@b.com", "secret123"))
            .await
            .expect("login should succeed");
        let token = api.refresh().await.expect("refresh should succeed");

        refresh.assert_async().await;
        assert_eq!(token.as_str(), "tok-2");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let config = ApiConfig {
            timeout_in_ms: 500,
            ..ApiConfig::with_base_url("http://127.0.0.1:9")
        };
        let err = HttpAuthApi::new(&config).unwrap().refresh().await.unwrap_err();
        assert_eq!(err, AuthError::Network("Refresh failed".into()));
    }

    #[tokio::test]
    async fn forgotten_credential_is_not_sent_again_but_reaches_logout() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/login")
            .with_status(200)
            .with_header("set-cookie", "refresh_token=r-1; Path=/; HttpOnly")
            .with_body(r#"{"access_token": "tok-1"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/refresh")
            .match_header("cookie", Matcher::Missing)
            .with_status(401)
            .create_async()
            .await;
        let logout = server
            .mock("POST", "/api/logout")
            .match_header("cookie", Matcher::Regex("refresh_token=r-1".into()))
            .with_status(204)
            .create_async()
            .await;

        let config = ApiConfig {
            logout_path: Some("/api/logout".into()),
            ..ApiConfig::with_base_url(server.url())
        };
        let api = HttpAuthApi::new(&config).unwrap();
        api.login(&Credentials::new("a@b.com", "secret123"))
            .await
            .expect("login should succeed");

        api.forget_credential();
        let err = api.refresh().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unauthorized);
        api.logout().await.expect("logout notification should succeed");

        refresh.assert_async().await;
        logout.assert_async().await;
    }

    #[tokio::test]
    async fn logout_without_an_endpoint_is_a_no_op() {
        let api = HttpAuthApi::new(&ApiConfig::with_base_url("http://127.0.0.1:9")).unwrap();
        assert_eq!(api.logout().await, Ok(()));
    }
}
