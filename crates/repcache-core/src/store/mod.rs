//! Client data store: the portal's single source of truth.
//!
//! `ClientStore` owns the locally persisted snapshot of the signed-in
//! client's data, decides on each access whether the cache is fresh enough
//! to serve or must be revalidated against the backend, and degrades to
//! serving last-known-good data when the network is away.
//!
//! No operation returns an error across the store boundary; outcomes are
//! encoded in the observable `SyncState` for the view layer to render.

use thiserror::Error;

pub mod client_store;
pub(crate) mod debounce;

pub use client_store::ClientStore;
pub use debounce::VersionProbe;

/// Coarse readiness of the portal content, driven by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentState {
    /// Fresh store, nothing decided yet (always the state after restart).
    #[default]
    Initializing,
    /// A full fetch is in flight.
    Loading,
    /// Content is renderable (fresh or last-known-good).
    Ready,
    /// A terminal error for this attempt; `SyncState::error` has the message.
    Error,
}

/// Observable synchronization state, cloned out to callers.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub is_loading: bool,
    pub offline_mode: bool,
    pub is_initialized: bool,
    pub content_state: ContentState,
    pub error: Option<String>,
}

/// Failure taxonomy for store operations. Rendered into
/// `SyncState::error` rather than propagated.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No membership found on this device - please sign in again")]
    MissingIdentity,

    #[error("Your membership is no longer active - please contact your coach")]
    InactiveMembership,

    #[error("Unable to reach the server: {0}")]
    NetworkUnavailable(String),

    #[error("Server returned an unexpected response: {0}")]
    MalformedResponse(String),
}

/// The runtime's connectivity report, injected so the store can fail soft
/// before issuing a doomed request.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Default probe for runtimes without a connectivity signal: always try
/// the network and let the request fail on its own.
pub struct AssumeOnline;

impl ConnectivityProbe for AssumeOnline {
    fn is_online(&self) -> bool {
        true
    }
}
