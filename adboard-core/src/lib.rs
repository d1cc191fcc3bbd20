//! # adboard Core
//!
//! Core library for the adboard dashboard backend.
//!
//! This crate provides:
//! - Domain types for the platform credential and performance fact rows
//! - Traits for the durable store, with SQLite and in-memory backends
//! - The credential lifecycle controller (Idle/Pending/Active/Errored)
//! - The product-name resolver and the performance read model
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use adboard_core::{LifecycleController, SqliteStore};
//!
//! async fn status() -> Result<(), adboard_core::AdboardError> {
//!     let store = Arc::new(SqliteStore::connect("sqlite://adboard.db").await?);
//!     let controller = LifecycleController::new(store);
//!     let status = controller.check_status().await;
//!     println!("{}: {}", status.state, status.message);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod lifecycle;
pub mod mapping;
pub mod model;
pub mod read_model;
pub mod store;

// Re-export commonly used types at crate root
pub use model::{
    CredentialRecord,
    EnrichedRecord,
    PerformanceRecord,
    ProductCode,
    ProviderId,
    RecordError,
    TokenType,
};

pub use store::{
    CredentialStore,
    MemoryStore,
    ReportStore,
    Secret,
    SqliteStore,
    StoreError,
};

pub use lifecycle::{
    AuthAttempt,
    CredentialState,
    CredentialStatus,
    LifecycleController,
};

pub use auth::{
    AuthError,
    AuthorizationFlow,
    AuthorizationResult,
    ClientConfig,
};

#[cfg(feature = "exchange")]
pub use auth::TokenExchangeFlow;

pub use mapping::ProductNames;

pub use read_model::{
    load_recent,
    LoadState,
    LoadTicket,
    PerformanceView,
    DEFAULT_LIMIT,
};

pub use error::AdboardError;
