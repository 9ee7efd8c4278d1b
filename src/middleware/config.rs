use url::Url;

use super::error::AuthError;
use crate::provider::{ProviderClient, ProviderConfig};
use crate::session::{CookieSessions, MemorySessions, SessionBackend, StoreKind};
use crate::token::{SigningKey, SESSION_LIFETIME};

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) session_cookie_name: String,
    pub(crate) csrf_cookie_name: String,
    pub(crate) session_ttl: time::Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) store_kind: StoreKind,
}

impl AuthSettings {
    pub(crate) fn defaults() -> Self {
        Self {
            session_cookie_name: "__bankid_session".into(),
            csrf_cookie_name: "__bankid_csrf".into(),
            session_ttl: SESSION_LIFETIME,
            secure_cookies: true,
            auth_path: "/api/auth".into(),
            store_kind: StoreKind::SignedCookie,
        }
    }
}

/// BankID authentication configuration.
///
/// Required fields (`provider`, `signing_key`) are constructor parameters,
/// so there are no runtime "missing field" errors.
///
/// Use [`from_env()`](BankIdAuthConfig::from_env) for convention-based setup,
/// or [`new()`](BankIdAuthConfig::new) with `with_*` methods for full control.
pub struct BankIdAuthConfig {
    pub(super) provider: ProviderClient,
    pub(super) signing_key: SigningKey,
    pub(super) settings: AuthSettings,
}

impl BankIdAuthConfig {
    /// Create config with the required provider client and signing key.
    ///
    /// All optional fields use sensible defaults. Override with `with_*`
    /// methods.
    #[must_use]
    pub fn new(provider: ProviderClient, signing_key: SigningKey) -> Self {
        Self {
            provider,
            signing_key,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `BANKID_SESSION_SECRET`: session signing secret, at least 32 bytes
    ///
    /// # Optional env vars
    /// - `BANKID_API_BASE_URL`: Relying Party API base (trailing slash),
    ///   e.g. the test environment
    /// - `BANKID_REQUEST_TIMEOUT_SECS`: provider call timeout (default 10)
    /// - `BANKID_SESSION_STORE`: `"cookie"` (default) or `"memory"`
    /// - `DEV_AUTH`: set to `"1"` or `"true"` to disable secure cookies for
    ///   local plain-HTTP development
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required vars are missing, the secret
    /// is too short, or values fail to parse. A weak secret is fatal: the
    /// endpoints must never serve with one.
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var("BANKID_SESSION_SECRET")
            .map_err(|_| AuthError::Config("BANKID_SESSION_SECRET is required".into()))?;
        let signing_key = SigningKey::from_bytes(secret.as_bytes()).map_err(|_| {
            AuthError::Config(
                "BANKID_SESSION_SECRET is set but too short (must be at least 32 bytes). \
                 Generate a longer random secret."
                    .into(),
            )
        })?;

        let mut provider_config = ProviderConfig::new();

        if let Ok(url_str) = std::env::var("BANKID_API_BASE_URL") {
            let base: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("BANKID_API_BASE_URL: {e}")))?;
            provider_config = provider_config
                .with_base_url(&base)
                .map_err(|e| AuthError::Config(format!("BANKID_API_BASE_URL: {e}")))?;
        }
        if let Ok(secs) = std::env::var("BANKID_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| AuthError::Config(format!("BANKID_REQUEST_TIMEOUT_SECS: {e}")))?;
            provider_config =
                provider_config.with_request_timeout(std::time::Duration::from_secs(secs));
        }

        let store_kind = match std::env::var("BANKID_SESSION_STORE").as_deref() {
            Err(_) | Ok("cookie") => StoreKind::SignedCookie,
            Ok("memory") => StoreKind::Memory,
            Ok(other) => {
                return Err(AuthError::Config(format!(
                    "BANKID_SESSION_STORE: expected \"cookie\" or \"memory\", got \"{other}\""
                )));
            }
        };

        let dev_auth = matches!(std::env::var("DEV_AUTH").as_deref(), Ok("1") | Ok("true"));

        Ok(Self::new(ProviderClient::new(provider_config), signing_key)
            .with_store(store_kind)
            .with_secure_cookies(!dev_auth))
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_csrf_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.csrf_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: time::Duration) -> Self {
        self.settings.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    /// Select the session storage strategy. Exactly one store is active per
    /// deployment.
    #[must_use]
    pub fn with_store(mut self, kind: StoreKind) -> Self {
        self.settings.store_kind = kind;
        self
    }

    /// Build the configured session backend.
    pub(super) fn build_backend(&self) -> SessionBackend {
        match self.settings.store_kind {
            StoreKind::SignedCookie => SessionBackend::SignedCookie(CookieSessions::new(
                self.signing_key.clone(),
                self.settings.session_ttl,
            )),
            StoreKind::Memory => SessionBackend::Memory(MemorySessions::new(
                std::time::Duration::from_secs(self.settings.session_ttl.whole_seconds() as u64),
            )),
        }
    }
}
