use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ClientProfile, Membership, MembershipBundle, Plan};

/// Snapshot file name in cache directory
const SNAPSHOT_FILE: &str = "client.json";

/// The full locally-held copy of server-authoritative client data.
///
/// Replaced wholesale on every successful fetch; never partially mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub client: ClientProfile,
    pub membership: Membership,
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub references: serde_json::Value,
    /// Opaque server-issued change marker.
    pub version: String,
    pub last_fetched_at: DateTime<Utc>,
}

impl ClientSnapshot {
    /// Build a snapshot from a freshly fetched bundle, stamping the fetch time.
    pub fn from_bundle(bundle: MembershipBundle) -> Self {
        Self {
            client: bundle.client,
            membership: bundle.membership,
            plans: bundle.plans,
            references: bundle.references,
            version: bundle.version,
            last_fetched_at: Utc::now(),
        }
    }

    /// All image URLs the views will render: the client avatar plus every
    /// exercise demonstration image, deduplicated in first-seen order.
    pub fn image_urls(&self) -> Vec<String> {
        let avatar = self.client.image.iter();
        let exercise_images = self
            .plans
            .iter()
            .flat_map(|p| &p.workouts)
            .flat_map(|w| &w.exercises)
            .filter_map(|e| e.image.as_ref());
        dedup_urls(avatar.chain(exercise_images))
    }

    /// Every exercise demonstration video URL, deduplicated in first-seen order.
    pub fn video_urls(&self) -> Vec<String> {
        let videos = self
            .plans
            .iter()
            .flat_map(|p| &p.workouts)
            .flat_map(|w| &w.exercises)
            .filter_map(|e| e.video.as_ref());
        dedup_urls(videos)
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.last_fetched_at).num_minutes()
    }
}

fn dedup_urls<'a>(urls: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.filter(|u| !u.is_empty() && seen.insert(u.as_str()))
        .cloned()
        .collect()
}

/// What actually lands on disk: the snapshot plus the offline flag, so a
/// portal closed while offline reopens in the same mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub snapshot: ClientSnapshot,
    #[serde(default)]
    pub offline_mode: bool,
}

pub struct SnapshotStore {
    cache_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn load(&self) -> Result<Option<StoredSnapshot>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .context("Failed to read snapshot file")?;
        let stored: StoredSnapshot = serde_json::from_str(&contents)
            .context("Failed to parse snapshot file")?;

        Ok(Some(stored))
    }

    pub fn save(&self, snapshot: &ClientSnapshot, offline_mode: bool) -> Result<()> {
        let stored = StoredSnapshot {
            snapshot: snapshot.clone(),
            offline_mode,
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(self.snapshot_path(), contents)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.snapshot_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn snapshot_path(&self) -> PathBuf {
        self.cache_dir.join(SNAPSHOT_FILE)
    }
}

// ============================================================================
// Tests
// ============================================================================
