//! REST API client module for the membership backend.
//!
//! This module provides the `ApiClient` for fetching membership bundles,
//! probing the lightweight version endpoint, and downloading plan media,
//! plus the `MembershipApi` trait the client store consumes so that tests
//! and alternative transports can substitute their own implementation.

use async_trait::async_trait;

use crate::models::MembershipBundle;

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

/// The remote surface the client store depends on.
///
/// `ApiClient` is the production implementation; tests inject mocks.
#[async_trait]
pub trait MembershipApi: Send + Sync {
    /// Fetch the full membership bundle for a client.
    async fn fetch_membership(&self, membership_id: &str) -> Result<MembershipBundle, ApiError>;

    /// Fetch only the opaque version token for a membership.
    async fn fetch_membership_version(&self, membership_id: &str) -> Result<String, ApiError>;

    /// Download a media asset (exercise image or video).
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}
