//! JSON-RPC API handlers for the daemon.

use adboard_core::{
    AuthAttempt, ClientConfig, CredentialStore, LifecycleController, LoadState, PerformanceView,
    ProviderId, ReportStore, SqliteStore, TokenExchangeFlow, TokenType, DEFAULT_LIMIT,
};
use anyhow::Result;
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DaemonConfig;

/// Credential status as shown to the operator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusResponse {
    pub state: String,
    pub message: String,
}

/// Outcome of the connect (popup completion) path.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConnectResponse {
    pub state: String,
    pub message: String,
    /// True when the operator cancelled the login flow; informational,
    /// not an error.
    pub cancelled: bool,
}

/// Tri-state snapshot of the performance view.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ViewResponse {
    pub loading: bool,
    pub error: Option<String>,
    pub records: Vec<adboard_core::EnrichedRecord>,
}

impl From<adboard_core::CredentialStatus> for StatusResponse {
    fn from(status: adboard_core::CredentialStatus) -> Self {
        Self {
            state: status.state.to_string(),
            message: status.message,
        }
    }
}

impl From<LoadState> for ViewResponse {
    fn from(state: LoadState) -> Self {
        match state {
            LoadState::Loading => Self {
                loading: true,
                error: None,
                records: Vec::new(),
            },
            LoadState::Loaded(records) => Self {
                loading: false,
                error: None,
                records,
            },
            LoadState::Failed(message) => Self {
                loading: false,
                error: Some(message),
                records: Vec::new(),
            },
        }
    }
}

/// State shared across RPC handlers.
pub struct ApiState {
    /// Credential lifecycle controller.
    pub controller: Arc<LifecycleController>,
    /// Fact/mapping side of the durable store.
    pub report_store: Arc<dyn ReportStore>,
    /// Tri-state holder for the dashboard's performance view.
    pub view: Arc<PerformanceView>,
    /// Application secret for the long-lived exchange, if configured.
    pub app_secret: Option<String>,
}

impl ApiState {
    /// Create the production state from daemon configuration.
    pub async fn new(config: &DaemonConfig) -> Result<Self> {
        let store = Arc::new(SqliteStore::connect(&config.database_url()).await?);

        let controller = LifecycleController::for_key(
            store.clone(),
            ProviderId::new(&config.provider),
            TokenType::LongLived,
        )
        .with_deadline(Duration::from_secs(config.request_timeout_secs));

        Ok(Self {
            controller: Arc::new(controller),
            report_store: store,
            view: Arc::new(PerformanceView::new()),
            app_secret: config.app_secret.clone(),
        })
    }

    /// Create API state over explicit stores (useful for tests).
    pub fn with_stores(
        credential_store: Arc<dyn CredentialStore>,
        report_store: Arc<dyn ReportStore>,
        app_secret: Option<String>,
    ) -> Self {
        Self {
            controller: Arc::new(LifecycleController::new(credential_store)),
            report_store,
            view: Arc::new(PerformanceView::new()),
            app_secret,
        }
    }
}

/// JSON-RPC API trait definition.
#[rpc(server)]
pub trait AdboardApi {
    /// Read the current credential status from the durable store.
    #[method(name = "credential_status")]
    async fn credential_status(&self) -> RpcResult<StatusResponse>;

    /// Persist an operator-supplied token (manual entry path).
    #[method(name = "save_token")]
    async fn save_token(&self, token: String) -> RpcResult<StatusResponse>;

    /// Complete the popup login flow.
    ///
    /// With an application secret configured, the short-lived popup token
    /// is exchanged for a long-lived one before persisting; otherwise the
    /// token is saved as-is.
    #[method(name = "connect")]
    async fn connect(
        &self,
        app_id: String,
        short_lived_token: String,
    ) -> RpcResult<ConnectResponse>;

    /// Run a fresh performance view load and return the resulting state.
    #[method(name = "refresh_performance")]
    async fn refresh_performance(&self, limit: Option<u32>) -> RpcResult<ViewResponse>;

    /// Snapshot the current performance view without fetching.
    #[method(name = "performance_view")]
    async fn performance_view(&self) -> RpcResult<ViewResponse>;
}

/// Implementation of the adboard API.
pub struct AdboardApiImpl {
    state: ApiState,
}

impl AdboardApiImpl {
    /// Create a new API implementation with the given state.
    pub fn new(state: ApiState) -> Self {
        Self { state }
    }
}

#[async_trait::async_trait]
impl AdboardApiServer for AdboardApiImpl {
    async fn credential_status(&self) -> RpcResult<StatusResponse> {
        debug!("RPC: credential_status");
        Ok(self.state.controller.check_status().await.into())
    }

    async fn save_token(&self, token: String) -> RpcResult<StatusResponse> {
        info!("RPC: save_token");
        Ok(self.state.controller.save_token(&token).await.into())
    }

    async fn connect(
        &self,
        app_id: String,
        short_lived_token: String,
    ) -> RpcResult<ConnectResponse> {
        info!(app_id = %app_id, "RPC: connect");

        let attempt = match &self.state.app_secret {
            Some(secret) => {
                let flow = TokenExchangeFlow::new(secret.clone(), short_lived_token);
                let config = ClientConfig::new(app_id);
                self.state.controller.authorize(&flow, &config).await
            }
            None => {
                // No exchange configured: the popup token is stored as-is,
                // same as the manual entry path.
                AuthAttempt::Completed(
                    self.state.controller.save_token(&short_lived_token).await,
                )
            }
        };

        Ok(match attempt {
            AuthAttempt::Completed(status) => ConnectResponse {
                state: status.state.to_string(),
                message: status.message,
                cancelled: false,
            },
            AuthAttempt::Cancelled { message } => {
                let current = self.state.controller.current();
                ConnectResponse {
                    state: current.state.to_string(),
                    message,
                    cancelled: true,
                }
            }
        })
    }

    async fn refresh_performance(&self, limit: Option<u32>) -> RpcResult<ViewResponse> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        debug!(limit, "RPC: refresh_performance");

        let state = self
            .state
            .view
            .refresh(self.state.report_store.as_ref(), limit)
            .await;

        Ok(state.into())
    }

    async fn performance_view(&self) -> RpcResult<ViewResponse> {
        debug!("RPC: performance_view");
        Ok(self.state.view.state().into())
    }
}
