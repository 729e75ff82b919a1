use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the external authentication service lives and how to reach it.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_signup_path")]
    pub signup_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Optional endpoint told about logouts. Fire-and-forget.
    #[serde(default)]
    pub logout_path: Option<String>,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    /// Name of the httpOnly cookie carrying the refresh credential.
    #[serde(default = "default_refresh_cookie")]
    pub refresh_cookie: String,
}

impl ApiConfig {
    /// A config with the standard endpoint paths under `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        ApiConfig {
            base_url: base_url.into(),
            login_path: default_login_path(),
            signup_path: default_signup_path(),
            refresh_path: default_refresh_path(),
            logout_path: None,
            timeout_in_ms: default_timeout_in_ms(),
            refresh_cookie: default_refresh_cookie(),
        }
    }

    /// Joins `path` onto the base URL without doubling the slash.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_login_path() -> String {
    "/api/login".to_string()
}

fn default_signup_path() -> String {
    "/api/signup".to_string()
}

fn default_refresh_path() -> String {
    "/api/refresh".to_string()
}

fn default_timeout_in_ms() -> u64 {
    5000
}

fn default_refresh_cookie() -> String {
    "refresh_token".to_string()
}
