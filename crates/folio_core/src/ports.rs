//! crates/folio_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the reader's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the HTTP backend and of the local storage engine.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{AccessReference, ContentItem, Identity, ItemDraft, ItemPatch};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, storage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// What the identity service hands back after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    pub user: Identity,
    pub token: String,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant>;

    async fn register(&self, email: &str, password: &str, name: &str) -> PortResult<AuthGrant>;

    /// Exchanges a third-party provider token for a session.
    async fn federated_exchange(&self, provider_token: &str) -> PortResult<AuthGrant>;

    /// Fetches the server-side copy of the signed-in identity.
    async fn fetch_profile(&self) -> PortResult<Identity>;
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn list(&self) -> PortResult<Vec<ContentItem>>;

    /// Single-item read offered by the backend. The core reads from its loaded
    /// list instead, so nothing in this crate calls it.
    async fn get(&self, id: &str) -> PortResult<ContentItem>;

    async fn create(&self, draft: &ItemDraft) -> PortResult<ContentItem>;

    async fn update(&self, id: &str, patch: &ItemPatch) -> PortResult<ContentItem>;

    async fn delete(&self, id: &str) -> PortResult<()>;

    /// Resolves the reference used to open gated content.
    async fn resolve_access_reference(&self, id: &str) -> PortResult<AccessReference>;
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn record_progress(&self, item_id: &str, page: u32) -> PortResult<()>;
}

/// Keyed string storage that survives process restarts.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;
}
