//! Credential lifecycle management.
//!
//! This module provides:
//! - [`CredentialState`] - The four-state machine: Idle, Pending, Active, Errored
//! - [`CredentialStatus`] - A state paired with its operator-facing message
//! - [`AuthAttempt`] - Outcome of driving the external authorization flow
//! - [`LifecycleController`] - Orchestrates token acquisition and persistence
//!
//! There is no `Revoked` state: no backend validity check is performed
//! against the platform, so a present, non-empty stored token reads as
//! `Active`. Expiry detection belongs to the downstream ingestion job.
//!
//! All failures are converted into state values at this boundary. The
//! controller never panics, never retries on its own, and always lands in a
//! well-defined terminal state, so it is safe to re-invoke after any
//! outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthorizationFlow, AuthorizationResult, ClientConfig};
use crate::model::{CredentialRecord, ProviderId, TokenType};
use crate::store::{CredentialStore, StoreError};

/// Default deadline applied to store calls and the authorization flow.
const DEFAULT_DEADLINE_SECS: u64 = 10;

/// The lifecycle state of the managed credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    /// No record found in the store.
    Idle,

    /// A save is in flight.
    Pending,

    /// A non-empty record is present.
    Active,

    /// The store or the external flow failed.
    Errored,
}

impl std::fmt::Display for CredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Errored => "errored",
        };
        write!(f, "{}", s)
    }
}

/// A lifecycle state paired with the message shown to the operator.
///
/// Every failure path carries a human-readable message; no failure drops
/// to a blank screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    pub state: CredentialState,
    pub message: String,
}

impl CredentialStatus {
    /// No token configured yet.
    pub fn idle() -> Self {
        Self {
            state: CredentialState::Idle,
            message: "No token configured".to_string(),
        }
    }

    /// A save is in flight.
    pub fn pending() -> Self {
        Self {
            state: CredentialState::Pending,
            message: "Saving token...".to_string(),
        }
    }

    /// A usable token is present.
    pub fn active(message: impl Into<String>) -> Self {
        Self {
            state: CredentialState::Active,
            message: message.into(),
        }
    }

    /// Something failed; the message preserves the underlying error.
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            state: CredentialState::Errored,
            message: message.into(),
        }
    }
}

/// Outcome of driving the external authorization flow.
///
/// Cancellation is deliberately not folded into [`CredentialStatus`]: an
/// operator closing the popup is informational, not an error banner.
#[derive(Debug)]
pub enum AuthAttempt {
    /// The flow ran to a terminal credential state.
    Completed(CredentialStatus),

    /// The operator declined or closed the flow; stored state is untouched.
    Cancelled { message: String },
}

/// Orchestrates obtaining, validating, and persisting the platform
/// credential, and reports the current status as a small state machine.
///
/// The controller owns no credential data itself; every status check
/// re-reads the durable store so freshness wins over staleness. The shared
/// status exists only so a polling shell can observe `Pending` while a
/// save is in flight.
///
/// # Example
///
/// ```rust,ignore
/// use adboard_core::lifecycle::LifecycleController;
/// use adboard_core::store::SqliteStore;
///
/// let store = SqliteStore::connect("sqlite://adboard.db").await?;
/// let controller = LifecycleController::new(std::sync::Arc::new(store));
/// let status = controller.check_status().await;
/// println!("{}: {}", status.state, status.message);
/// ```
pub struct LifecycleController {
    store: Arc<dyn CredentialStore>,
    provider: ProviderId,
    token_type: TokenType,
    deadline: Duration,
    current: Mutex<CredentialStatus>,
}

impl LifecycleController {
    /// Create a controller for the default `(facebook, long_lived)` key.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self::for_key(store, ProviderId::new("facebook"), TokenType::LongLived)
    }

    /// Create a controller for a specific `(provider, token_type)` key.
    pub fn for_key(
        store: Arc<dyn CredentialStore>,
        provider: ProviderId,
        token_type: TokenType,
    ) -> Self {
        Self {
            store,
            provider,
            token_type,
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            current: Mutex::new(CredentialStatus::idle()),
        }
    }

    /// Override the deadline applied to store calls and the external flow.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// The `(provider, token_type)` key this controller manages.
    pub fn key(&self) -> (&ProviderId, &TokenType) {
        (&self.provider, &self.token_type)
    }

    /// The last status this controller observed or produced.
    ///
    /// A polling shell sees `Pending` here while a save is in flight.
    pub fn current(&self) -> CredentialStatus {
        self.current.lock().clone()
    }

    fn set_current(&self, status: CredentialStatus) -> CredentialStatus {
        *self.current.lock() = status.clone();
        status
    }

    async fn with_deadline_store<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
            }),
        }
    }

    /// Read the current credential state from the durable store.
    ///
    /// Absence maps to `Idle`, presence to `Active`, a store failure to
    /// `Errored` with the backend message preserved verbatim.
    pub async fn check_status(&self) -> CredentialStatus {
        let result = self
            .with_deadline_store(
                "get_current",
                self.store.get_current(&self.provider, &self.token_type),
            )
            .await;

        let status = match result {
            Ok(Some(record)) if record.is_valid() => {
                CredentialStatus::active("Active token found")
            }
            Ok(_) => CredentialStatus::idle(),
            Err(e) => {
                tracing::error!(provider = %self.provider, error = %e, "status check failed");
                CredentialStatus::errored(e.to_string())
            }
        };

        self.set_current(status)
    }

    /// Persist an operator- or flow-supplied token.
    ///
    /// This is both the manual entry path and the completion path of the
    /// external flow. An empty token is rejected before any store call and
    /// leaves the shared status and any stored record untouched, so a
    /// subsequent [`check_status`] still reports the prior credential.
    ///
    /// [`check_status`]: LifecycleController::check_status
    pub async fn save_token(&self, token: &str) -> CredentialStatus {
        if token.is_empty() {
            tracing::warn!(provider = %self.provider, "rejected empty token");
            return CredentialStatus::errored("access token must not be empty");
        }

        self.set_current(CredentialStatus::pending());

        let record = CredentialRecord::new(
            self.provider.clone(),
            self.token_type.clone(),
            token,
        );

        let status = match self
            .with_deadline_store("upsert", self.store.upsert(&record))
            .await
        {
            Ok(()) => {
                tracing::info!(provider = %self.provider, "token saved");
                CredentialStatus::active("Token saved successfully!")
            }
            Err(e) => {
                tracing::error!(provider = %self.provider, error = %e, "token save failed");
                CredentialStatus::errored(e.to_string())
            }
        };

        self.set_current(status)
    }

    /// Drive the external authorization flow to a terminal outcome.
    ///
    /// A missing application identifier fails pre-flight, before the
    /// collaborator is ever called. The flow runs under the controller's
    /// deadline; a granted token goes through [`save_token`], and a
    /// cancellation restores the prior status untouched.
    ///
    /// [`save_token`]: LifecycleController::save_token
    pub async fn authorize(
        &self,
        flow: &dyn AuthorizationFlow,
        config: &ClientConfig,
    ) -> AuthAttempt {
        if config.is_missing_app_id() {
            tracing::warn!("authorization attempted without an application id");
            return AuthAttempt::Completed(CredentialStatus::errored(
                "application id is required to launch the login flow",
            ));
        }

        let previous = self.current();
        self.set_current(CredentialStatus::pending());

        let outcome = tokio::time::timeout(self.deadline, flow.authorize(config)).await;

        match outcome {
            Ok(Ok(AuthorizationResult::Granted(token))) => {
                AuthAttempt::Completed(self.save_token(token.expose()).await)
            }
            Ok(Ok(AuthorizationResult::Cancelled)) => {
                tracing::info!(provider = %self.provider, "authorization cancelled by operator");
                self.set_current(previous);
                AuthAttempt::Cancelled {
                    message: "Login cancelled".to_string(),
                }
            }
            Ok(Err(e)) => {
                tracing::error!(provider = %self.provider, error = %e, "authorization failed");
                AuthAttempt::Completed(self.set_current(CredentialStatus::errored(e.to_string())))
            }
            Err(_) => {
                tracing::error!(provider = %self.provider, "authorization timed out");
                AuthAttempt::Completed(
                    self.set_current(CredentialStatus::errored("authorization flow timed out")),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use crate::store::{MemoryStore, Secret};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store stub whose every call fails with a fixed backend message.
    struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        async fn get_current(
            &self,
            _provider: &ProviderId,
            _token_type: &TokenType,
        ) -> Result<Option<CredentialRecord>, StoreError> {
            Err(StoreError::Backend {
                message: "connection refused".to_string(),
            })
        }

        async fn upsert(&self, _record: &CredentialRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend {
                message: "connection refused".to_string(),
            })
        }
    }

    /// Store stub that never completes, for deadline tests.
    struct HangingStore;

    #[async_trait]
    impl CredentialStore for HangingStore {
        async fn get_current(
            &self,
            _provider: &ProviderId,
            _token_type: &TokenType,
        ) -> Result<Option<CredentialRecord>, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        async fn upsert(&self, _record: &CredentialRecord) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    /// Flow stub returning a fixed outcome, tracking whether it was called.
    struct StubFlow {
        outcome: fn() -> Result<AuthorizationResult, AuthError>,
        called: AtomicBool,
    }

    impl StubFlow {
        fn new(outcome: fn() -> Result<AuthorizationResult, AuthError>) -> Self {
            Self {
                outcome,
                called: AtomicBool::new(false),
            }
        }

        fn was_called(&self) -> bool {
            self.called.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthorizationFlow for StubFlow {
        async fn authorize(
            &self,
            _config: &ClientConfig,
        ) -> Result<AuthorizationResult, AuthError> {
            self.called.store(true, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn controller_with(store: Arc<dyn CredentialStore>) -> LifecycleController {
        LifecycleController::new(store)
    }

    #[tokio::test]
    async fn test_check_status_idle_when_empty() {
        let controller = controller_with(Arc::new(MemoryStore::new()));

        let status = controller.check_status().await;

        assert_eq!(status.state, CredentialState::Idle);
        assert_eq!(status.message, "No token configured");
    }

    #[tokio::test]
    async fn test_save_then_check_is_active() {
        let controller = controller_with(Arc::new(MemoryStore::new()));

        let saved = controller.save_token("tok123").await;
        assert_eq!(saved.state, CredentialState::Active);

        let status = controller.check_status().await;
        assert_eq!(status.state, CredentialState::Active);
        assert_eq!(status.message, "Active token found");
    }

    #[tokio::test]
    async fn test_empty_token_rejected_without_store_call() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_with(store.clone());

        controller.save_token("original").await;
        let rejection = controller.save_token("").await;

        assert_eq!(rejection.state, CredentialState::Errored);

        // The prior record is intact and status re-reads as Active.
        let (provider, token_type) = controller.key();
        let record = store
            .get_current(provider, token_type)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.access_token.expose(), "original");
        assert_eq!(
            controller.check_status().await.state,
            CredentialState::Active
        );
    }

    #[tokio::test]
    async fn test_store_failure_preserves_message() {
        let controller = controller_with(Arc::new(FailingStore));

        let status = controller.check_status().await;
        assert_eq!(status.state, CredentialState::Errored);
        assert!(status.message.contains("connection refused"));

        let saved = controller.save_token("tok123").await;
        assert_eq!(saved.state, CredentialState::Errored);
        assert!(saved.message.contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_deadline_becomes_errored() {
        let controller = controller_with(Arc::new(HangingStore));

        let status = controller.check_status().await;

        assert_eq!(status.state, CredentialState::Errored);
        assert!(status.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_authorize_granted_persists_token() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_with(store.clone());
        let flow = StubFlow::new(|| {
            Ok(AuthorizationResult::Granted(Secret::new("flow-token")))
        });

        let attempt = controller
            .authorize(&flow, &ClientConfig::new("1234567890"))
            .await;

        match attempt {
            AuthAttempt::Completed(status) => {
                assert_eq!(status.state, CredentialState::Active);
            }
            AuthAttempt::Cancelled { .. } => panic!("expected completion"),
        }

        let (provider, token_type) = controller.key();
        let record = store
            .get_current(provider, token_type)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.access_token.expose(), "flow-token");
    }

    #[tokio::test]
    async fn test_authorize_cancelled_is_informational() {
        let controller = controller_with(Arc::new(MemoryStore::new()));
        controller.save_token("existing").await;
        let flow = StubFlow::new(|| Ok(AuthorizationResult::Cancelled));

        let attempt = controller
            .authorize(&flow, &ClientConfig::new("1234567890"))
            .await;

        match attempt {
            AuthAttempt::Cancelled { message } => {
                assert_eq!(message, "Login cancelled");
            }
            AuthAttempt::Completed(_) => panic!("expected cancellation"),
        }

        // The prior status is restored, not overwritten with an error.
        assert_eq!(controller.current().state, CredentialState::Active);
    }

    #[tokio::test]
    async fn test_authorize_missing_app_id_never_calls_flow() {
        let controller = controller_with(Arc::new(MemoryStore::new()));
        let flow = StubFlow::new(|| Ok(AuthorizationResult::Cancelled));

        let attempt = controller.authorize(&flow, &ClientConfig::new("")).await;

        match attempt {
            AuthAttempt::Completed(status) => {
                assert_eq!(status.state, CredentialState::Errored);
                assert!(status.message.contains("application id"));
            }
            AuthAttempt::Cancelled { .. } => panic!("expected pre-flight rejection"),
        }
        assert!(!flow.was_called());
    }

    #[tokio::test]
    async fn test_authorize_flow_error_becomes_errored() {
        let controller = controller_with(Arc::new(MemoryStore::new()));
        let flow = StubFlow::new(|| {
            Err(AuthError::Platform {
                message: "Invalid OAuth access token.".to_string(),
            })
        });

        let attempt = controller
            .authorize(&flow, &ClientConfig::new("1234567890"))
            .await;

        match attempt {
            AuthAttempt::Completed(status) => {
                assert_eq!(status.state, CredentialState::Errored);
                assert!(status.message.contains("Invalid OAuth access token."));
            }
            AuthAttempt::Cancelled { .. } => panic!("expected an errored completion"),
        }
    }

    #[tokio::test]
    async fn test_pending_is_observable_during_save() {
        let controller = Arc::new(LifecycleController::new(Arc::new(HangingStore)));

        let save = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.save_token("tok").await })
        };

        // Give the save a moment to enter the store call.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.current().state, CredentialState::Pending);

        save.abort();
    }
}
