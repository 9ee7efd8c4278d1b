use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::personnummer::Personnummer;
use crate::types::OrderRef;

/// Hint codes the Relying Party API attaches to collect responses.
pub mod hints {
    /// The order was never completed and timed out on the provider side.
    pub const EXPIRED_TRANSACTION: &str = "expiredTransaction";
    /// The user has not yet opened their app; keep polling.
    pub const OUTSTANDING_TRANSACTION: &str = "outstandingTransaction";
    /// The user declined in their app.
    pub const USER_CANCEL: &str = "userCancel";
}

/// BankID Relying Party API configuration.
///
/// Defaults target the production API; override per endpoint or with
/// [`with_base_url`](ProviderConfig::with_base_url) for the test environment.
///
/// ```rust,ignore
/// use bankid_sessions::provider::ProviderConfig;
///
/// let config = ProviderConfig::new()
///     .with_base_url(&"https://appapi2.test.bankid.com/rp/v6.0/".parse()?)?;
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProviderConfig {
    pub(crate) auth_url: Url,
    pub(crate) collect_url: Url,
    pub(crate) cancel_url: Url,
    pub(crate) request_timeout: Duration,
}

impl ProviderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            auth_url: "https://appapi2.bankid.com/rp/v6.0/auth"
                .parse()
                .expect("valid default URL"),
            collect_url: "https://appapi2.bankid.com/rp/v6.0/collect"
                .parse()
                .expect("valid default URL"),
            cancel_url: "https://appapi2.bankid.com/rp/v6.0/cancel"
                .parse()
                .expect("valid default URL"),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Derive all three endpoints from a base URL (trailing slash required
    /// for the last path segment to be kept).
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if the base cannot carry relative paths.
    pub fn with_base_url(mut self, base: &Url) -> Result<Self, url::ParseError> {
        self.auth_url = base.join("auth")?;
        self.collect_url = base.join("collect")?;
        self.cancel_url = base.join("cancel")?;
        Ok(self)
    }

    /// Override the order-initiation endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the status-collection endpoint.
    #[must_use]
    pub fn with_collect_url(mut self, url: Url) -> Self {
        self.collect_url = url;
        self
    }

    /// Override the cancellation endpoint.
    #[must_use]
    pub fn with_cancel_url(mut self, url: Url) -> Self {
        self.cancel_url = url;
        self
    }

    /// Per-request timeout (default 10 s). Provider calls fail closed rather
    /// than hang.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Order-initiation endpoint URL.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Status-collection endpoint URL.
    #[must_use]
    pub fn collect_url(&self) -> &Url {
        &self.collect_url
    }

    /// Cancellation endpoint URL.
    #[must_use]
    pub fn cancel_url(&self) -> &Url {
        &self.cancel_url
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    personal_number: &'a str,
    end_user_ip: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderRequest<'a> {
    order_ref: &'a str,
}

/// A freshly initiated order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct InitiatedOrder {
    pub order_ref: OrderRef,
    #[serde(default)]
    pub auto_start_token: Option<String>,
    #[serde(default)]
    pub qr_start_token: Option<String>,
}

/// Provider-reported state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectStatus {
    Pending,
    Complete,
    Failed,
}

/// One collect response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CollectOutcome {
    pub order_ref: OrderRef,
    pub status: CollectStatus,
    #[serde(default)]
    pub hint_code: Option<String>,
    #[serde(default)]
    pub completion_data: Option<CompletionData>,
}

/// Attached to a completed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CompletionData {
    pub user: CompletedUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocsp_response: Option<String>,
}

/// The verified identity behind a completed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CompletedUser {
    pub personal_number: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

/// HTTP client for the BankID Relying Party API.
pub struct ProviderClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl ProviderClient {
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for mTLS configuration, connection pool
    /// reuse, or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Initiate an authentication order for `personal_number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or timeout, or
    /// [`Error::Provider`] if the endpoint rejects the order.
    pub async fn initiate(
        &self,
        personal_number: &Personnummer,
        end_user_ip: &str,
    ) -> Result<InitiatedOrder, Error> {
        let body = AuthRequest {
            personal_number: personal_number.as_str(),
            end_user_ip,
        };

        let response = self
            .http
            .post(self.config.auth_url.clone())
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response, "auth").await?;
        response.json::<InitiatedOrder>().await.map_err(Into::into)
    }

    /// Poll the current state of an order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or timeout, or
    /// [`Error::Provider`] if the endpoint reports a protocol error.
    pub async fn collect(&self, order_ref: &OrderRef) -> Result<CollectOutcome, Error> {
        let body = OrderRequest {
            order_ref: order_ref.as_str(),
        };

        let response = self
            .http
            .post(self.config.collect_url.clone())
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response, "collect").await?;
        response.json::<CollectOutcome>().await.map_err(Into::into)
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or timeout, or
    /// [`Error::Provider`] if the endpoint rejects the cancellation.
    pub async fn cancel(&self, order_ref: &OrderRef) -> Result<(), Error> {
        let body = OrderRequest {
            order_ref: order_ref.as_str(),
        };

        let response = self
            .http
            .post(self.config.cancel_url.clone())
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;

        Self::ensure_success(response, "cancel").await?;
        Ok(())
    }

    /// Checks HTTP response status; returns the response on success or an
    /// error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(Error::Provider {
            operation,
            status: Some(status),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_target_production() {
        let config = ProviderConfig::new();
        assert_eq!(
            config.auth_url().as_str(),
            "https://appapi2.bankid.com/rp/v6.0/auth"
        );
        assert_eq!(
            config.collect_url().as_str(),
            "https://appapi2.bankid.com/rp/v6.0/collect"
        );
        assert_eq!(
            config.cancel_url().as_str(),
            "https://appapi2.bankid.com/rp/v6.0/cancel"
        );
    }

    #[test]
    fn base_url_derives_all_endpoints() {
        let base: Url = "https://appapi2.test.bankid.com/rp/v6.0/".parse().unwrap();
        let config = ProviderConfig::new().with_base_url(&base).unwrap();
        assert_eq!(
            config.collect_url().as_str(),
            "https://appapi2.test.bankid.com/rp/v6.0/collect"
        );
    }

    #[test]
    fn endpoint_overrides() {
        let config = ProviderConfig::new()
            .with_auth_url("https://proxy.internal/auth".parse().unwrap())
            .with_request_timeout(Duration::from_secs(3));
        assert_eq!(config.auth_url().as_str(), "https://proxy.internal/auth");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn collect_pending_deserializes() {
        let outcome: CollectOutcome = serde_json::from_str(
            r#"{"orderRef":"ORD-1","status":"pending","hintCode":"outstandingTransaction"}"#,
        )
        .unwrap();
        assert_eq!(outcome.status, CollectStatus::Pending);
        assert_eq!(
            outcome.hint_code.as_deref(),
            Some(hints::OUTSTANDING_TRANSACTION)
        );
        assert!(outcome.completion_data.is_none());
    }

    #[test]
    fn collect_complete_deserializes_completion_data() {
        let outcome: CollectOutcome = serde_json::from_str(
            r#"{
                "orderRef": "ORD-1",
                "status": "complete",
                "completionData": {
                    "user": {
                        "personalNumber": "198001011234",
                        "name": "Anna Andersson",
                        "givenName": "Anna",
                        "surname": "Andersson"
                    },
                    "signature": "c2ln"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(outcome.status, CollectStatus::Complete);
        let completion = outcome.completion_data.unwrap();
        assert_eq!(completion.user.personal_number, "198001011234");
        assert_eq!(completion.user.name, "Anna Andersson");
    }

    #[test]
    fn auth_request_serializes_camel_case() {
        let body = AuthRequest {
            personal_number: "198001011234",
            end_user_ip: "203.0.113.7",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"personalNumber":"198001011234","endUserIp":"203.0.113.7"}"#
        );
    }
}
