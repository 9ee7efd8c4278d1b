use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Error;
use crate::personnummer::Personnummer;
use crate::provider::{
    hints, CollectOutcome, CollectStatus, CompletionData, InitiatedOrder, ProviderClient,
};
use crate::session::SessionBackend;
use crate::tracker::OngoingTracker;
use crate::types::OrderRef;

/// External identity-verification provider, as the flow sees it.
///
/// [`ProviderClient`] implements this against the real Relying Party API;
/// test doubles implement it to script outcomes.
///
/// # Example
///
/// ```rust,ignore
/// impl IdentityProvider for RecordingStub {
///     async fn initiate(&self, pnr: &Personnummer, ip: &str) -> Result<InitiatedOrder, Error> {
///         Ok(self.next_order())
///     }
///     // ...
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Begin an authentication order for `personal_number`.
    fn initiate(
        &self,
        personal_number: &Personnummer,
        end_user_ip: &str,
    ) -> impl Future<Output = Result<InitiatedOrder, Error>> + Send;

    /// Current state of the order.
    fn collect(
        &self,
        order_ref: &OrderRef,
    ) -> impl Future<Output = Result<CollectOutcome, Error>> + Send;

    /// Abort the order on the provider side.
    fn cancel(&self, order_ref: &OrderRef) -> impl Future<Output = Result<(), Error>> + Send;
}

impl IdentityProvider for ProviderClient {
    fn initiate(
        &self,
        personal_number: &Personnummer,
        end_user_ip: &str,
    ) -> impl Future<Output = Result<InitiatedOrder, Error>> + Send {
        ProviderClient::initiate(self, personal_number, end_user_ip)
    }

    fn collect(
        &self,
        order_ref: &OrderRef,
    ) -> impl Future<Output = Result<CollectOutcome, Error>> + Send {
        ProviderClient::collect(self, order_ref)
    }

    fn cancel(&self, order_ref: &OrderRef) -> impl Future<Output = Result<(), Error>> + Send {
        ProviderClient::cancel(self, order_ref)
    }
}

impl<P: IdentityProvider> IdentityProvider for Arc<P> {
    fn initiate(
        &self,
        personal_number: &Personnummer,
        end_user_ip: &str,
    ) -> impl Future<Output = Result<InitiatedOrder, Error>> + Send {
        (**self).initiate(personal_number, end_user_ip)
    }

    fn collect(
        &self,
        order_ref: &OrderRef,
    ) -> impl Future<Output = Result<CollectOutcome, Error>> + Send {
        (**self).collect(order_ref)
    }

    fn cancel(&self, order_ref: &OrderRef) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).cancel(order_ref)
    }
}

/// Why a `start` was refused.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// A fresh initiation already exists for this identity. Self-clears
    /// within the staleness window.
    #[error("an authentication for this identity is already in progress")]
    AlreadyInProgress,
    /// The provider call failed; no session was persisted.
    #[error(transparent)]
    Provider(Error),
}

/// Result of a successful `start`.
#[derive(Debug)]
#[non_exhaustive]
pub struct StartedAuthentication {
    pub order: InitiatedOrder,
    /// Value for the session cookie (a signed token or a session id,
    /// depending on the configured store).
    pub session_token: String,
}

/// Observable state of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AuthStatus {
    /// No session, a lapsed session, or a finished attempt.
    Idle,
    #[serde(rename_all = "camelCase")]
    Pending {
        #[serde(skip_serializing_if = "Option::is_none")]
        hint_code: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        completion_data: Option<CompletionData>,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        hint_code: Option<String>,
    },
    /// The order timed out on the provider side before completion.
    Expired,
}

impl AuthStatus {
    /// Terminal states end the attempt; the session is cleared when one is
    /// reported.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Failed { .. } | Self::Expired)
    }
}

/// Coordinates one authentication attempt across the dedup tracker, the
/// session store, and the external provider.
///
/// `start` strictly precedes `status` polls, which precede `cancel`, but the
/// flow tolerates any call arriving without a prior `start`.
pub struct AuthFlow<P> {
    provider: P,
    sessions: Arc<SessionBackend>,
    tracker: Arc<OngoingTracker>,
}

impl<P: IdentityProvider> AuthFlow<P> {
    #[must_use]
    pub fn new(provider: P, sessions: Arc<SessionBackend>, tracker: Arc<OngoingTracker>) -> Self {
        Self {
            provider,
            sessions,
            tracker,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionBackend> {
        &self.sessions
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<OngoingTracker> {
        &self.tracker
    }

    /// Begin authentication for `personal_number`.
    ///
    /// # Errors
    ///
    /// [`StartError::AlreadyInProgress`] if a fresh initiation exists for the
    /// same identity; [`StartError::Provider`] if the provider call fails, in
    /// which case the ongoing mark is cleared and no session is persisted.
    pub async fn start(
        &self,
        personal_number: Personnummer,
        end_user_ip: &str,
    ) -> Result<StartedAuthentication, StartError> {
        if !self.tracker.try_begin(&personal_number) {
            tracing::info!(identity = %personal_number, "duplicate initiation refused");
            return Err(StartError::AlreadyInProgress);
        }

        let order = match self.provider.initiate(&personal_number, end_user_ip).await {
            Ok(order) => order,
            Err(err) => {
                self.tracker.clear_ongoing(&personal_number);
                tracing::error!(error = %err, identity = %personal_number, "provider initiation failed");
                return Err(StartError::Provider(err));
            }
        };

        let session_token = self
            .sessions
            .start(personal_number.clone(), order.order_ref.clone());
        tracing::info!(order_ref = %order.order_ref, identity = %personal_number, "authentication initiated");

        Ok(StartedAuthentication {
            order,
            session_token,
        })
    }

    /// Poll the attempt behind `session_token`.
    ///
    /// Reports `Idle` when there is no usable session. Terminal outcomes
    /// clear the session and the dedup record, so the next poll reports
    /// `Idle` again.
    ///
    /// # Errors
    ///
    /// Returns the provider error unchanged; the session is kept so the
    /// caller can poll again.
    pub async fn status(&self, session_token: Option<&str>) -> Result<AuthStatus, Error> {
        let Some(token) = session_token else {
            return Ok(AuthStatus::Idle);
        };
        let Some(claims) = self.sessions.read(token) else {
            return Ok(AuthStatus::Idle);
        };

        let outcome = self.provider.collect(&claims.order_ref).await?;
        let status = match outcome.status {
            CollectStatus::Pending => AuthStatus::Pending {
                hint_code: outcome.hint_code,
            },
            CollectStatus::Complete => AuthStatus::Complete {
                completion_data: outcome.completion_data,
            },
            CollectStatus::Failed
                if outcome.hint_code.as_deref() == Some(hints::EXPIRED_TRANSACTION) =>
            {
                AuthStatus::Expired
            }
            CollectStatus::Failed => AuthStatus::Failed {
                hint_code: outcome.hint_code,
            },
        };

        if status.is_terminal() {
            self.sessions.destroy(token);
            self.tracker.clear_ongoing(&claims.personal_number);
            tracing::info!(order_ref = %claims.order_ref, "authentication reached terminal state");
        }

        Ok(status)
    }

    /// Cancel the attempt behind `session_token`.
    ///
    /// Always succeeds from the caller's perspective; cancelling with no
    /// session is a no-op. Local state clears first, then the provider is
    /// told best-effort; its failure is logged, never surfaced.
    pub async fn cancel(&self, session_token: Option<&str>) {
        let Some(token) = session_token else { return };
        let Some(claims) = self.sessions.read(token) else {
            return;
        };

        self.sessions.destroy(token);
        self.tracker.clear_ongoing(&claims.personal_number);
        tracing::info!(order_ref = %claims.order_ref, "authentication cancelled");

        if let Err(err) = self.provider.cancel(&claims.order_ref).await {
            tracing::warn!(error = %err, order_ref = %claims.order_ref, "provider cancel failed after local cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::session::MemorySessions;

    struct ScriptedProvider {
        fail_initiate: AtomicBool,
        outcome: Mutex<CollectOutcome>,
        cancelled: Mutex<Vec<OrderRef>>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                fail_initiate: AtomicBool::new(false),
                outcome: Mutex::new(pending_outcome()),
                cancelled: Mutex::new(Vec::new()),
            }
        }

        fn script(&self, outcome: CollectOutcome) {
            *self.outcome.lock().unwrap() = outcome;
        }
    }

    impl IdentityProvider for ScriptedProvider {
        async fn initiate(
            &self,
            _personal_number: &Personnummer,
            _end_user_ip: &str,
        ) -> Result<InitiatedOrder, Error> {
            if self.fail_initiate.load(Ordering::SeqCst) {
                return Err(Error::Provider {
                    operation: "auth",
                    status: Some(503),
                    detail: "unavailable".into(),
                });
            }
            Ok(InitiatedOrder {
                order_ref: OrderRef::from("ORD-1".to_string()),
                auto_start_token: Some("ast".into()),
                qr_start_token: None,
            })
        }

        async fn collect(&self, _order_ref: &OrderRef) -> Result<CollectOutcome, Error> {
            Ok(self.outcome.lock().unwrap().clone())
        }

        async fn cancel(&self, order_ref: &OrderRef) -> Result<(), Error> {
            self.cancelled.lock().unwrap().push(order_ref.clone());
            Ok(())
        }
    }

    fn pending_outcome() -> CollectOutcome {
        CollectOutcome {
            order_ref: OrderRef::from("ORD-1".to_string()),
            status: CollectStatus::Pending,
            hint_code: Some(hints::OUTSTANDING_TRANSACTION.to_string()),
            completion_data: None,
        }
    }

    fn complete_outcome() -> CollectOutcome {
        CollectOutcome {
            order_ref: OrderRef::from("ORD-1".to_string()),
            status: CollectStatus::Complete,
            hint_code: None,
            completion_data: Some(CompletionData {
                user: crate::provider::CompletedUser {
                    personal_number: "198001011234".to_string(),
                    name: "Anna Andersson".to_string(),
                    given_name: None,
                    surname: None,
                },
                signature: None,
                ocsp_response: None,
            }),
        }
    }

    fn failed_outcome(hint: &str) -> CollectOutcome {
        CollectOutcome {
            order_ref: OrderRef::from("ORD-1".to_string()),
            status: CollectStatus::Failed,
            hint_code: Some(hint.to_string()),
            completion_data: None,
        }
    }

    fn pnr() -> Personnummer {
        "198001011234".parse().unwrap()
    }

    fn flow_with(provider: Arc<ScriptedProvider>) -> AuthFlow<Arc<ScriptedProvider>> {
        AuthFlow::new(
            provider,
            Arc::new(SessionBackend::Memory(MemorySessions::new(
                Duration::from_secs(600),
            ))),
            Arc::new(OngoingTracker::new()),
        )
    }

    #[tokio::test]
    async fn duplicate_start_is_refused() {
        let flow = flow_with(Arc::new(ScriptedProvider::new()));

        assert!(flow.start(pnr(), "203.0.113.7").await.is_ok());
        assert!(matches!(
            flow.start(pnr(), "203.0.113.7").await,
            Err(StartError::AlreadyInProgress)
        ));
    }

    #[tokio::test]
    async fn provider_failure_clears_the_guard() {
        let provider = Arc::new(ScriptedProvider::new());
        let flow = flow_with(provider.clone());

        provider.fail_initiate.store(true, Ordering::SeqCst);
        assert!(matches!(
            flow.start(pnr(), "203.0.113.7").await,
            Err(StartError::Provider(_))
        ));

        // No session persisted, no lingering ongoing mark.
        assert_eq!(flow.status(None).await.unwrap(), AuthStatus::Idle);
        provider.fail_initiate.store(false, Ordering::SeqCst);
        assert!(flow.start(pnr(), "203.0.113.7").await.is_ok());
    }

    #[tokio::test]
    async fn completed_attempt_reports_once_then_idle() {
        let provider = Arc::new(ScriptedProvider::new());
        let flow = flow_with(provider.clone());

        let started = flow.start(pnr(), "203.0.113.7").await.unwrap();
        assert_eq!(started.order.order_ref.as_str(), "ORD-1");
        let token = started.session_token;

        assert_eq!(
            flow.status(Some(&token)).await.unwrap(),
            AuthStatus::Pending {
                hint_code: Some(hints::OUTSTANDING_TRANSACTION.to_string())
            }
        );

        provider.script(complete_outcome());
        let status = flow.status(Some(&token)).await.unwrap();
        assert!(matches!(status, AuthStatus::Complete { .. }));

        // Session cleared after the terminal state; the identity may start over.
        assert_eq!(flow.status(Some(&token)).await.unwrap(), AuthStatus::Idle);
        assert!(flow.start(pnr(), "203.0.113.7").await.is_ok());
    }

    #[tokio::test]
    async fn expired_transaction_maps_to_expired() {
        let provider = Arc::new(ScriptedProvider::new());
        let flow = flow_with(provider.clone());

        let token = flow.start(pnr(), "203.0.113.7").await.unwrap().session_token;
        provider.script(failed_outcome(hints::EXPIRED_TRANSACTION));

        assert_eq!(flow.status(Some(&token)).await.unwrap(), AuthStatus::Expired);
        assert_eq!(flow.status(Some(&token)).await.unwrap(), AuthStatus::Idle);
    }

    #[tokio::test]
    async fn failed_attempt_clears_session() {
        let provider = Arc::new(ScriptedProvider::new());
        let flow = flow_with(provider.clone());

        let token = flow.start(pnr(), "203.0.113.7").await.unwrap().session_token;
        provider.script(failed_outcome(hints::USER_CANCEL));

        assert_eq!(
            flow.status(Some(&token)).await.unwrap(),
            AuthStatus::Failed {
                hint_code: Some(hints::USER_CANCEL.to_string())
            }
        );
        assert!(flow.start(pnr(), "203.0.113.7").await.is_ok());
    }

    #[tokio::test]
    async fn cancel_clears_state_and_tells_provider() {
        let provider = Arc::new(ScriptedProvider::new());
        let flow = flow_with(provider.clone());

        let token = flow.start(pnr(), "203.0.113.7").await.unwrap().session_token;
        flow.cancel(Some(&token)).await;

        assert_eq!(flow.status(Some(&token)).await.unwrap(), AuthStatus::Idle);
        assert!(flow.start(pnr(), "203.0.113.7").await.is_ok());
        assert_eq!(
            provider.cancelled.lock().unwrap().as_slice(),
            &[OrderRef::from("ORD-1".to_string())]
        );
    }

    #[tokio::test]
    async fn cancel_without_session_is_a_noop() {
        let provider = Arc::new(ScriptedProvider::new());
        let flow = flow_with(provider.clone());

        flow.cancel(None).await;
        flow.cancel(Some("junk-token")).await;

        assert!(provider.cancelled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_without_session_is_idle() {
        let flow = flow_with(Arc::new(ScriptedProvider::new()));

        assert_eq!(flow.status(None).await.unwrap(), AuthStatus::Idle);
        assert_eq!(flow.status(Some("junk")).await.unwrap(), AuthStatus::Idle);
    }

    #[test]
    fn status_serializes_camel_case() {
        let status = AuthStatus::Pending {
            hint_code: Some("outstandingTransaction".into()),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"status":"pending","hintCode":"outstandingTransaction"}"#
        );

        assert_eq!(
            serde_json::to_string(&AuthStatus::Idle).unwrap(),
            r#"{"status":"idle"}"#
        );
    }
}
