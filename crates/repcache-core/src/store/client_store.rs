//! The client data store.
//!
//! One `ClientStore` is constructed per signed-in application session and
//! injected into whatever front end renders it. It owns the persisted
//! snapshot, the media cache, and the session identity, and exposes the
//! imperative refresh operations the views call.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, MembershipApi};
use crate::cache::{ClientSnapshot, MediaCache, MediaKind, SnapshotStore};
use crate::config::Config;
use crate::session::SessionStore;

use super::debounce::{DebouncedProbe, VersionProbe};
use super::{AssumeOnline, ConnectivityProbe, ContentState, StoreError, SyncState};

// ============================================================================
// Constants
// ============================================================================

/// Quiescence window for the version probe.
/// Visibility events and periodic timers fire in bursts; one second
/// collapses a burst into a single round trip.
const VERSION_CHECK_DEBOUNCE_MS: u64 = 1000;

/// Maximum concurrent media downloads during prefetch.
/// Limits parallel requests to avoid overwhelming the server.
const MAX_CONCURRENT_MEDIA_LOADS: usize = 8;

#[derive(Default)]
struct StoreState {
    snapshot: Option<ClientSnapshot>,
    sync: SyncState,
}

/// Single source of truth for the signed-in client's portal data.
pub struct ClientStore {
    api: Arc<dyn MembershipApi>,
    connectivity: Arc<dyn ConnectivityProbe>,
    session: SessionStore,
    snapshots: SnapshotStore,
    media: MediaCache,
    state: Mutex<StoreState>,
    version_probe: DebouncedProbe,
    /// Bumped by `clear()`; in-flight results from an older generation
    /// are discarded instead of being applied to the fresh session.
    generation: AtomicU64,
}

impl ClientStore {
    /// Create a store with explicit collaborators (tests inject mocks here)
    pub fn new(
        api: Arc<dyn MembershipApi>,
        connectivity: Arc<dyn ConnectivityProbe>,
        cache_dir: PathBuf,
    ) -> Result<Self> {
        let session = SessionStore::new(cache_dir.clone());
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to load session; starting signed out");
        }

        let snapshots = SnapshotStore::new(cache_dir.clone())?;
        let restored = match snapshots.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted snapshot; starting empty");
                None
            }
        };

        let media = MediaCache::new(cache_dir.join("media"))?;

        let mut state = StoreState::default();
        if let Some(stored) = restored {
            debug!(
                version = %stored.snapshot.version,
                offline = stored.offline_mode,
                "Restored persisted snapshot"
            );
            state.snapshot = Some(stored.snapshot);
            // Readiness flags are never trusted across restarts; only the
            // offline marker survives. Content starts at Initializing.
            state.sync.offline_mode = stored.offline_mode;
        }

        Ok(Self {
            api,
            connectivity,
            session,
            snapshots,
            media,
            state: Mutex::new(state),
            version_probe: DebouncedProbe::new(Duration::from_millis(VERSION_CHECK_DEBOUNCE_MS)),
            generation: AtomicU64::new(0),
        })
    }

    /// Create a store wired to the real backend per the given config
    pub fn open(config: &Config) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        let cache_dir = config.cache_dir()?;
        Self::new(Arc::new(api), Arc::new(AssumeOnline), cache_dir)
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Current synchronization state
    pub fn state(&self) -> SyncState {
        self.lock_state().sync.clone()
    }

    /// Current snapshot, if any
    pub fn snapshot(&self) -> Option<ClientSnapshot> {
        self.lock_state().snapshot.clone()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn media(&self) -> &MediaCache {
        &self.media
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Refresh the snapshot from the backend.
    ///
    /// With `force = false` the store first decides whether the cached
    /// snapshot can be served as-is (already offline, or version unchanged);
    /// `force = true` always performs the full fetch. Outcomes land in the
    /// observable state; nothing is returned.
    pub async fn fetch(&self, force: bool) {
        let generation = self.generation.load(Ordering::SeqCst);

        // A fetch already in flight wins; later callers are not queued.
        if self.lock_state().sync.is_loading {
            return;
        }

        let Some(membership_id) = self.session.membership_id() else {
            self.record_error(StoreError::MissingIdentity);
            return;
        };

        if !self.connectivity.is_online() {
            let mut st = self.lock_state();
            if st.snapshot.is_some() {
                debug!("No connectivity; serving cached data offline");
                st.sync.offline_mode = true;
                st.sync.is_initialized = true;
                st.sync.content_state = ContentState::Ready;
                drop(st);
                self.persist_offline_flag();
            } else {
                drop(st);
                self.record_error(StoreError::NetworkUnavailable(
                    "no network connectivity".to_string(),
                ));
            }
            return;
        }

        {
            let st = self.lock_state();
            // Already serving stale data; don't pile up doomed requests.
            if !force && st.snapshot.is_some() && st.sync.offline_mode {
                return;
            }
        }

        if !force {
            let current_version = self
                .lock_state()
                .snapshot
                .as_ref()
                .map(|s| s.version.clone());
            if let Some(current) = current_version {
                match self.probe_version(&membership_id, &current).await {
                    VersionProbe::Current => {
                        if self.generation_current(generation) {
                            let mut st = self.lock_state();
                            st.sync.is_initialized = true;
                            st.sync.content_state = ContentState::Ready;
                        }
                        return;
                    }
                    VersionProbe::Unreachable => {
                        if self.generation_current(generation) {
                            let mut st = self.lock_state();
                            st.sync.offline_mode = true;
                            st.sync.is_initialized = true;
                            st.sync.content_state = ContentState::Ready;
                            drop(st);
                            self.persist_offline_flag();
                        }
                        return;
                    }
                    VersionProbe::Stale => {}
                }
            }
        }

        {
            let mut st = self.lock_state();
            if st.sync.is_loading {
                return;
            }
            st.sync.is_loading = true;
            st.sync.content_state = ContentState::Loading;
            st.sync.error = None;
        }

        let result = self.api.fetch_membership(&membership_id).await;

        if !self.generation_current(generation) {
            // The store was cleared while the request was in flight; the
            // response belongs to a signed-out session.
            debug!("Discarding fetch result from a cleared session");
            self.lock_state().sync.is_loading = false;
            return;
        }

        match result {
            Ok(bundle) if !bundle.membership.is_active() => {
                info!(membership = %bundle.membership.name, "Membership inactive; clearing local data");
                self.discard_client_data();
                if let Err(e) = self.session.clear() {
                    warn!(error = %e, "Failed to clear session identity");
                }
                let mut st = self.lock_state();
                st.sync.is_loading = false;
                st.sync.offline_mode = false;
                st.sync.is_initialized = true;
                st.sync.error = Some(StoreError::InactiveMembership.to_string());
                st.sync.content_state = ContentState::Error;
            }
            Ok(bundle) => {
                let snapshot = ClientSnapshot::from_bundle(bundle);
                let image_urls = snapshot.image_urls();
                debug!(version = %snapshot.version, plans = snapshot.plans.len(), "Snapshot replaced");
                if let Err(e) = self.snapshots.save(&snapshot, false) {
                    warn!(error = %e, "Failed to persist snapshot");
                }
                {
                    let mut st = self.lock_state();
                    st.snapshot = Some(snapshot);
                    st.sync.is_loading = false;
                    st.sync.offline_mode = false;
                    st.sync.is_initialized = true;
                }
                // Best-effort media warm-up; ends with content Ready either way
                self.preload_images(&image_urls).await;
            }
            Err(e) => {
                let had_snapshot = self.lock_state().snapshot.is_some();
                if had_snapshot {
                    debug!(error = %e, "Fetch failed; serving cached data offline");
                    let mut st = self.lock_state();
                    st.sync.is_loading = false;
                    st.sync.offline_mode = true;
                    st.sync.is_initialized = true;
                    st.sync.content_state = ContentState::Ready;
                    drop(st);
                    self.persist_offline_flag();
                } else {
                    error!(error = %e, "First fetch failed; clearing local data");
                    let store_error = Self::classify(&e);
                    self.discard_client_data();
                    if let Err(err) = self.session.clear() {
                        warn!(error = %err, "Failed to clear session identity");
                    }
                    let mut st = self.lock_state();
                    st.sync.is_loading = false;
                    st.sync.error = Some(store_error.to_string());
                    st.sync.content_state = ContentState::Error;
                }
            }
        }
    }

    /// User-initiated retry from the offline banner.
    ///
    /// This is the only externally triggered exit from offline mode besides
    /// a naturally successful background fetch: probe the version endpoint,
    /// do a forced full fetch when stale, and stay offline on any failure.
    pub async fn initialize_offline_data(&self) {
        let Some(membership_id) = self.session.membership_id() else {
            self.record_error(StoreError::MissingIdentity);
            return;
        };

        let current_version = self
            .lock_state()
            .snapshot
            .as_ref()
            .map(|s| s.version.clone());
        let Some(current) = current_version else {
            // Nothing cached to reconcile; behave like a normal forced fetch
            self.fetch(true).await;
            return;
        };

        let generation = self.generation.load(Ordering::SeqCst);
        match self.probe_version(&membership_id, &current).await {
            VersionProbe::Current => {
                if self.generation_current(generation) {
                    debug!("Cached data is current; leaving offline mode");
                    let mut st = self.lock_state();
                    st.sync.offline_mode = false;
                    st.sync.is_initialized = true;
                    st.sync.content_state = ContentState::Ready;
                    drop(st);
                    self.persist_offline_flag();
                }
            }
            VersionProbe::Stale => self.fetch(true).await,
            VersionProbe::Unreachable => {
                debug!("Offline retry failed; staying in offline mode");
            }
        }
    }

    // =========================================================================
    // Media prefetch
    // =========================================================================

    /// Warm the image cache for the given URLs.
    ///
    /// Already-cached URLs are skipped; the rest are downloaded concurrently.
    /// Individual failures are logged and skipped - the content state
    /// transitions to Ready regardless, and failed URLs are retried by the
    /// next prefetch that includes them.
    pub async fn preload_images(&self, urls: &[String]) {
        self.preload_media(urls, MediaKind::Image).await;
    }

    /// Warm the video cache for the given URLs (same semantics as images)
    pub async fn preload_videos(&self, urls: &[String]) {
        self.preload_media(urls, MediaKind::Video).await;
    }

    async fn preload_media(&self, urls: &[String], kind: MediaKind) {
        let pending = self.media.uncached(urls, kind);
        if !pending.is_empty() {
            debug!(total = urls.len(), pending = pending.len(), "Preloading media");

            let fetched: Vec<(String, Vec<u8>)> = stream::iter(pending)
                .map(|url| {
                    let api = Arc::clone(&self.api);
                    async move {
                        match api.fetch_media(&url).await {
                            Ok(bytes) => Some((url, bytes)),
                            Err(e) => {
                                warn!(url = %url, error = %e, "Media preload failed");
                                None
                            }
                        }
                    }
                })
                .buffer_unordered(MAX_CONCURRENT_MEDIA_LOADS)
                .filter_map(|result| async move { result })
                .collect()
                .await;

            for (url, bytes) in fetched {
                if let Err(e) = self.media.store(&url, kind, &bytes) {
                    warn!(url = %url, error = %e, "Failed to cache media");
                }
            }
        }

        // Partial failure is non-fatal: the views render with whatever loaded
        self.lock_state().sync.content_state = ContentState::Ready;
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Reset all client, plan, and media state to empty. Used on logout.
    /// The session identity is cleared separately via `session().clear()`.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.discard_client_data();
        *self.lock_state() = StoreState::default();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn probe_version(&self, membership_id: &str, current: &str) -> VersionProbe {
        let api = Arc::clone(&self.api);
        let id = membership_id.to_string();
        let current = current.to_string();
        self.version_probe
            .run(async move {
                match api.fetch_membership_version(&id).await {
                    Ok(remote) if remote == current => VersionProbe::Current,
                    Ok(remote) => {
                        debug!(local = %current, remote = %remote, "Membership version changed");
                        VersionProbe::Stale
                    }
                    Err(e) => {
                        debug!(error = %e, "Version check failed");
                        VersionProbe::Unreachable
                    }
                }
            })
            .await
    }

    fn discard_client_data(&self) {
        if let Err(e) = self.snapshots.clear() {
            warn!(error = %e, "Failed to remove persisted snapshot");
        }
        self.media.clear();
        self.lock_state().snapshot = None;
    }

    fn persist_offline_flag(&self) {
        let (snapshot, offline) = {
            let st = self.lock_state();
            (st.snapshot.clone(), st.sync.offline_mode)
        };
        if let Some(snapshot) = snapshot {
            if let Err(e) = self.snapshots.save(&snapshot, offline) {
                warn!(error = %e, "Failed to persist snapshot");
            }
        }
    }

    fn record_error(&self, error: StoreError) {
        let mut st = self.lock_state();
        st.sync.error = Some(error.to_string());
        st.sync.content_state = ContentState::Error;
    }

    fn classify(error: &ApiError) -> StoreError {
        if error.is_malformed() {
            StoreError::MalformedResponse(error.to_string())
        } else {
            StoreError::NetworkUnavailable(error.to_string())
        }
    }

    fn generation_current(&self, observed: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == observed
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// Tests
// ============================================================================
