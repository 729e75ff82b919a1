use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::api::ApiConfig;
use super::logging::LoggingConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local rules applied by the session manager.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct SessionConfig {
    /// Minimum password length accepted by `register`.
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
    /// Tokens expiring within this window are refreshed before use.
    #[serde(default = "default_refresh_skew_in_secs")]
    pub refresh_skew_in_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            password_min_length: default_password_min_length(),
            refresh_skew_in_secs: default_refresh_skew_in_secs(),
        }
    }
}

/// Navigation surfaces known to the route guard.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct RoutesConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Where to land after a successful login.
    #[serde(default = "default_home_path")]
    pub home_path: String,
    /// Reachable without a session. The login path is always public.
    #[serde(default)]
    pub public_paths: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        RoutesConfig {
            login_path: default_login_path(),
            home_path: default_home_path(),
            public_paths: Vec::new(),
        }
    }
}

fn default_password_min_length() -> usize {
    8
}

fn default_refresh_skew_in_secs() -> i64 {
    30
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_home_path() -> String {
    "/inventory".to_string()
}

/// Extract a config from any figment, resolving the version tag.
pub fn extract_config(figment: Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Load config from "config.yaml" in the current directory, with
/// `SESSIONGATE_*` environment overrides (`__` separates nested keys).
pub fn load_config() -> ConfigV1 {
    let figment = Figment::new()
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed("SESSIONGATE_").split("__"));
    match extract_config(figment) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
