#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use figment::{
    providers::{Format, Yaml},
    Figment,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use sessiongate::api::AuthApi;
use sessiongate::auth::SessionManager;
use sessiongate::config::{extract_config, ConfigV1, SessionConfig};
use sessiongate::error::AuthError;
use sessiongate::models::{AccessToken, Credentials};
use sessiongate::store::SessionStore;
use tokio::sync::oneshot;

pub fn config_for(base_url: &str, logout_path: Option<&str>) -> Arc<ConfigV1> {
    let logout = logout_path
        .map(|p| format!("  logout_path: \"{}\"\n", p))
        .unwrap_or_default();
    let yaml = format!(
        r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "json"
api:
  base_url: "{}"
  timeout_in_ms: 3000
{}session:
  password_min_length: 8
routes:
  login_path: "/login"
  home_path: "/inventory"
  public_paths: ["/about"]
"#,
        base_url, logout
    );
    let config = extract_config(Figment::new().merge(Yaml::string(&yaml)))
        .expect("test config should parse");
    Arc::new(config)
}

pub fn signed_token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .expect("encoding test token")
}

/// Polls `cond` until it holds, panicking after two seconds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// One scripted answer. A held step blocks until the test releases it.
pub struct Step<T> {
    result: Result<T, AuthError>,
    gate: Option<oneshot::Receiver<()>>,
}

impl<T> Step<T> {
    pub fn now(result: Result<T, AuthError>) -> Self {
        Step { result, gate: None }
    }

    pub fn held(result: Result<T, AuthError>) -> (Self, oneshot::Sender<()>) {
        let (release, gate) = oneshot::channel();
        (
            Step {
                result,
                gate: Some(gate),
            },
            release,
        )
    }

    async fn play(self) -> Result<T, AuthError> {
        if let Some(gate) = self.gate {
            let _ = gate.await;
        }
        self.result
    }
}

/// In-process `AuthApi` answering from per-operation queues.
#[derive(Default)]
pub struct ScriptedApi {
    logins: Mutex<VecDeque<Step<AccessToken>>>,
    signups: Mutex<VecDeque<Step<()>>>,
    refreshes: Mutex<VecDeque<Step<AccessToken>>>,
    logout_result: Mutex<Option<AuthError>>,
    pub login_calls: AtomicUsize,
    pub signup_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub forgotten: AtomicUsize,
}

impl ScriptedApi {
    pub fn push_login(&self, step: Step<AccessToken>) {
        self.logins.lock().unwrap().push_back(step);
    }

    pub fn push_signup(&self, step: Step<()>) {
        self.signups.lock().unwrap().push_back(step);
    }

    pub fn push_refresh(&self, step: Step<AccessToken>) {
        self.refreshes.lock().unwrap().push_back(step);
    }

    pub fn fail_logout(&self, err: AuthError) {
        *self.logout_result.lock().unwrap() = Some(err);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn next<T>(queue: &Mutex<VecDeque<Step<T>>>) -> Step<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::now(Err(AuthError::Network("unscripted call".into()))))
    }
}

#[async_trait::async_trait]
impl AuthApi for ScriptedApi {
    fn get_name(&self) -> &str {
        "scripted"
    }

    async fn login(&self, _: &Credentials) -> Result<AccessToken, AuthError> {
        let step = Self::next(&self.logins);
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        step.play().await
    }

    async fn signup(&self, _: &Credentials) -> Result<(), AuthError> {
        let step = Self::next(&self.signups);
        self.signup_calls.fetch_add(1, Ordering::SeqCst);
        step.play().await
    }

    async fn refresh(&self) -> Result<AccessToken, AuthError> {
        let step = Self::next(&self.refreshes);
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        step.play().await
    }

    fn forget_credential(&self) {
        self.forgotten.fetch_add(1, Ordering::SeqCst);
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        match self.logout_result.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn scripted_manager() -> (SessionManager, Arc<ScriptedApi>) {
    let api = Arc::new(ScriptedApi::default());
    let manager = SessionManager::new(
        api.clone(),
        Arc::new(SessionStore::new()),
        SessionConfig::default(),
    );
    (manager, api)
}
