//! repcache-core - offline-first data layer for the repcache coaching portal.
//!
//! The portal front ends (web dashboard, mobile shell) are thin views over
//! this crate. It owns:
//!
//! - `ClientStore`: the single source of truth for the signed-in client's
//!   data - snapshot persistence, version-check revalidation with a
//!   debounce window, offline degradation, and media prefetch
//! - `ApiClient`: HTTP client for the membership backend
//! - `SessionStore`: the persisted membership identity
//! - the domain models the views render
//!
//! The store never raises errors across its boundary; every outcome is
//! encoded in the observable `SyncState`.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod session;
pub mod store;

pub use api::{ApiClient, ApiError, MembershipApi};
pub use cache::{ClientSnapshot, MediaCache, MediaKind, SnapshotStore, StoredSnapshot};
pub use config::Config;
pub use models::{
    ClientProfile, Exercise, Meal, MealItem, Membership, MembershipBundle, Plan, Workout,
};
pub use session::SessionStore;
pub use store::{
    AssumeOnline, ClientStore, ConnectivityProbe, ContentState, StoreError, SyncState,
    VersionProbe,
};
