// Auth bridge: relays sign-in/up/out to the identity provider and mirrors the session locally

use crate::store::AppStore;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 6;

const MISSING_FIELDS: &str = "Please fill in all fields";
const INVALID_EMAIL: &str = "Please enter a valid email address";
const PASSWORD_MISMATCH: &str = "Passwords do not match";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";
const EMAIL_NOT_CONFIRMED: &str =
    "Your email address has not been confirmed. Please check your inbox for a verification link.";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Provider(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMetadata {
    pub name: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub user_metadata: UserMetadata,
}

// Name shown on the profile screen
pub fn display_name(user: Option<&AuthUser>) -> String {
    user.and_then(|u| {
        u.user_metadata
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| u.user_metadata.full_name.as_deref().filter(|n| !n.is_empty()))
    })
    .unwrap_or("User")
    .to_string()
}

/// Session as issued by the identity provider. The local copy may be stale;
/// the provider stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    // Provider created the account but wants the email confirmed first
    ConfirmationRequired(AuthUser),
}

/// Raw failure from the identity provider.
///
/// Providers report errors in different places; `user_message` picks the
/// native message first, then a `message` inside the JSON body, then the
/// generic message field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderFailure {
    pub native_message: Option<String>,
    pub body: Option<String>,
    pub message: Option<String>,
}

impl ProviderFailure {
    pub fn native(message: impl Into<String>) -> Self {
        Self {
            native_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn user_message(&self, fallback: &str) -> String {
        let non_empty = |s: &String| !s.trim().is_empty();

        self.native_message
            .clone()
            .filter(non_empty)
            .or_else(|| self.body.as_deref().and_then(message_from_body))
            .or_else(|| self.message.clone().filter(non_empty))
            .unwrap_or_else(|| fallback.to_string())
    }
}

fn message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

// Rewrites the provider's terse "Email not confirmed" into guidance
pub fn friendly_message(message: String) -> String {
    if message.contains("Email not confirmed") || message.contains("email_not_confirmed") {
        EMAIL_NOT_CONFIRMED.to_string()
    } else {
        message
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub fn validate_sign_in(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::Validation(MISSING_FIELDS.to_string()));
    }
    Ok(())
}

pub fn validate_sign_up(form: &SignUpForm) -> Result<(), AuthError> {
    if form.name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        return Err(AuthError::Validation(MISSING_FIELDS.to_string()));
    }
    if !EMAIL_PATTERN.is_match(form.email.trim()) {
        return Err(AuthError::Validation(INVALID_EMAIL.to_string()));
    }
    if form.password != form.confirm_password {
        return Err(AuthError::Validation(PASSWORD_MISMATCH.to_string()));
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(PASSWORD_TOO_SHORT.to_string()));
    }
    Ok(())
}

// External identity service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ProviderFailure>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &UserMetadata,
    ) -> Result<SignUpOutcome, ProviderFailure>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderFailure>;
}

pub struct AuthBridge<P: IdentityProvider> {
    provider: P,
}

impl<P: IdentityProvider> AuthBridge<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn sign_in(
        &self,
        store: &AppStore,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        if let Err(e) = validate_sign_in(email, password) {
            store.auth_error(e.to_string());
            return Err(e);
        }

        store.login_start();
        match self.provider.sign_in(email.trim(), password).await {
            Ok(session) => {
                tracing::info!("Signed in user {}", session.user.id);
                store.set_session(session.clone());
                Ok(session)
            }
            Err(failure) => Err(self.fail(store, &failure, "Login failed")),
        }
    }

    pub async fn sign_up(&self, store: &AppStore, form: &SignUpForm) -> Result<SignUpOutcome, AuthError> {
        if let Err(e) = validate_sign_up(form) {
            store.auth_error(e.to_string());
            return Err(e);
        }

        let name = form.name.trim().to_string();
        let profile = UserMetadata {
            name: Some(name.clone()),
            full_name: Some(name),
        };

        store.login_start();
        match self
            .provider
            .sign_up(form.email.trim(), &form.password, &profile)
            .await
        {
            Ok(SignUpOutcome::SignedIn(session)) => {
                store.set_session(session.clone());
                Ok(SignUpOutcome::SignedIn(session))
            }
            Ok(SignUpOutcome::ConfirmationRequired(user)) => {
                tracing::info!("Account {} awaits email confirmation", user.id);
                store.auth_settled();
                Ok(SignUpOutcome::ConfirmationRequired(user))
            }
            Err(failure) => Err(self.fail(store, &failure, "Signup failed")),
        }
    }

    /// Ends the provider session and always clears the local copy.
    pub async fn sign_out(&self, store: &AppStore) {
        if let Some(session) = store.auth().session {
            if let Err(failure) = self.provider.sign_out(&session.access_token).await {
                tracing::warn!("Provider sign-out failed: {}", failure.user_message("unknown error"));
            }
        }
        store.logout();
    }

    fn fail(&self, store: &AppStore, failure: &ProviderFailure, fallback: &str) -> AuthError {
        let message = friendly_message(failure.user_message(fallback));
        tracing::error!("Authentication failed: {}", message);
        store.login_failure(message.clone());
        AuthError::Provider(message)
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout_ms: u64,
}

impl SupabaseConfig {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("SUPABASE_URL").or_else(|| lookup("EXPO_PUBLIC_SUPABASE_URL"))?;
        let anon_key =
            lookup("SUPABASE_ANON_KEY").or_else(|| lookup("EXPO_PUBLIC_SUPABASE_ANON_KEY"))?;
        Some(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            timeout_ms: 30_000,
        })
    }
}

// Supabase GoTrue REST adapter
pub struct SupabaseProvider {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseProvider {
    pub fn new(config: SupabaseConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    async fn post(&self, path: &str, bearer: &str, body: Option<Value>) -> Result<String, ProviderFailure> {
        let mut request = self
            .client
            .post(format!("{}{}", self.config.url, path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderFailure::native(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderFailure::native(e.to_string()))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(ProviderFailure {
                message: Some(format!("Request failed with status code {}", status.as_u16())),
                ..ProviderFailure::from_body(text)
            })
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ProviderFailure> {
        let body = json!({"email": email, "password": password});
        let text = self
            .post("/auth/v1/token?grant_type=password", &self.config.anon_key, Some(body))
            .await?;
        serde_json::from_str(&text).map_err(|e| ProviderFailure::native(format!("Invalid session: {}", e)))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &UserMetadata,
    ) -> Result<SignUpOutcome, ProviderFailure> {
        let body = json!({"email": email, "password": password, "data": profile});
        let text = self.post("/auth/v1/signup", &self.config.anon_key, Some(body)).await?;
        decode_sign_up(&text)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderFailure> {
        self.post("/auth/v1/logout", access_token, None).await.map(|_| ())
    }
}

// GoTrue answers sign-up with a session, or with the bare user when confirmation is pending
fn decode_sign_up(text: &str) -> Result<SignUpOutcome, ProviderFailure> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProviderFailure::native(format!("Invalid sign-up response: {}", e)))?;

    if value.get("access_token").is_some() {
        let session: AuthSession = serde_json::from_value(value)
            .map_err(|e| ProviderFailure::native(format!("Invalid session: {}", e)))?;
        return Ok(SignUpOutcome::SignedIn(session));
    }

    let user_value = value.get("user").cloned().unwrap_or(value);
    let user: AuthUser = serde_json::from_value(user_value)
        .map_err(|e| ProviderFailure::native(format!("Invalid user: {}", e)))?;
    Ok(SignUpOutcome::ConfirmationRequired(user))
}
