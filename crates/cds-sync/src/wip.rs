//! Advisory mutual exclusion over destinations via WIP marker objects
//!
//! The store has no native locking. To keep two concurrent runs (possibly on
//! different machines) from producing the same destination, a run claims a
//! destination by writing a sibling marker object at `<key>.wip` and releases
//! it by deleting that object. Staleness is judged from the marker object's
//! store-assigned `LastModified`, never from any field inside the body,
//! which exists purely for diagnostics.
//!
//! The lock is advisory, not linearizable: between the existence check and
//! the marker write, two callers can both observe "no marker" and both
//! proceed. That window is accepted for this system's batch/offline usage;
//! closing it (conditional PUT) is an explicit non-goal.

use crate::error::Result;
use cds_common::ObjectRef;
use cds_store::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::UdpSocket;
use tracing::{debug, info, instrument, warn};

/// Suffix of the marker object protecting a destination key.
pub const WIP_SUFFIX: &str = ".wip";

/// Diagnostic body of a WIP marker.
///
/// Records who is producing the destination, from where, and for which file
/// pairs, so an operator inspecting a held lock can find the owning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WipMarker {
    pub hostname: String,
    pub ip_address: String,
    pub username: String,
    /// ISO-8601 start time of the owning run. Informational only; staleness
    /// uses the marker object's LastModified.
    pub start_time: String,
    pub pid: u32,
    /// `(local_path, remote_uri)` pairs the owning run is processing.
    pub files: Vec<(String, String)>,
}

impl WipMarker {
    /// Build a marker describing the current process.
    pub fn for_current_process(files: Vec<(String, String)>) -> Self {
        Self {
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            ip_address: outbound_ip_address(),
            username: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
            start_time: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            pid: std::process::id(),
            files,
        }
    }

    /// One-line owner description for log messages.
    pub fn owner_summary(&self) -> String {
        format!(
            "user: {} on host: {} ({})",
            self.username, self.hostname, self.ip_address
        )
    }
}

/// Local address the host would use for outbound traffic.
///
/// Connecting a UDP socket does not send anything; it only resolves routing.
fn outbound_ip_address() -> String {
    let resolve = || -> std::io::Result<String> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip().to_string())
    };
    resolve().unwrap_or_else(|_| "127.0.0.1".to_string())
}

/// Result of an acquisition attempt.
#[derive(Debug)]
pub enum AcquireOutcome {
    Acquired,
    HeldByOther {
        age_hours: f64,
        /// Best-effort read of the marker body; `None` when unreadable.
        owner: Option<WipMarker>,
    },
}

/// Observed state of a destination's marker.
#[derive(Debug)]
pub enum WipStatus {
    Absent,
    Live {
        age_hours: f64,
        owner: Option<WipMarker>,
    },
    /// A marker older than the configured maximum was found and reclaimed.
    StaleRemoved { age_hours: f64 },
}

/// Age of a marker in hours, given its store-assigned LastModified.
pub fn marker_age_hours(last_modified: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - last_modified).num_milliseconds() as f64 / 3_600_000.0
}

/// Whether a marker of the given age is past the staleness threshold.
pub fn is_stale(age_hours: f64, max_age_hours: f64) -> bool {
    age_hours > max_age_hours
}

pub struct WipLock {
    store: Storage,
}

impl WipLock {
    pub fn new(store: Storage) -> Self {
        Self { store }
    }

    /// The marker object protecting `target`.
    pub fn marker_ref(target: &ObjectRef) -> ObjectRef {
        target.with_suffix(WIP_SUFFIX)
    }

    /// Inspect (and possibly reclaim) the marker for `target`.
    ///
    /// A marker older than `max_age_hours` is deleted and reported as
    /// [`WipStatus::StaleRemoved`]. Store errors on the existence check are
    /// logged and treated as "no marker visible": the lock fails open toward
    /// liveness, since the client cannot reliably tell transient from
    /// permanent store failures.
    #[instrument(skip(self))]
    pub async fn status(&self, target: &ObjectRef, max_age_hours: f64) -> Result<WipStatus> {
        let marker = Self::marker_ref(target);

        let info = match self.store.head(&marker).await {
            Ok(None) => return Ok(WipStatus::Absent),
            Ok(Some(info)) => info,
            Err(err) => {
                warn!(error = %err, "Could not check WIP marker {}; treating as absent", marker);
                return Ok(WipStatus::Absent);
            }
        };

        // A marker without LastModified cannot be aged; treat it as fresh.
        let age_hours = info
            .last_modified
            .map(|lm| marker_age_hours(lm, Utc::now()))
            .unwrap_or(0.0);

        if is_stale(age_hours, max_age_hours) {
            info!(
                age_hours,
                "Stale WIP marker found, removing: {}", marker
            );
            if let Err(err) = self.store.delete(&marker).await {
                warn!(error = %err, "Failed to remove stale WIP marker {}", marker);
            }
            return Ok(WipStatus::StaleRemoved { age_hours });
        }

        let owner = self.read_marker_body(&marker).await;
        if let Some(ref owner) = owner {
            info!(
                age_hours,
                "WIP marker in progress ({}): {}",
                owner.owner_summary(),
                marker
            );
        } else {
            info!(
                age_hours,
                "WIP marker in progress: {}", marker
            );
        }
        Ok(WipStatus::Live { age_hours, owner })
    }

    /// Try to claim exclusive intent over `target`.
    ///
    /// A live marker belonging to another run yields
    /// [`AcquireOutcome::HeldByOther`]; an absent or stale marker is replaced
    /// by `marker` and the call returns [`AcquireOutcome::Acquired`].
    /// Concurrent reclaimers racing between the check and the write is an
    /// accepted risk (see module docs).
    #[instrument(skip(self, marker))]
    pub async fn try_acquire(
        &self,
        target: &ObjectRef,
        max_age_hours: f64,
        marker: &WipMarker,
    ) -> Result<AcquireOutcome> {
        match self.status(target, max_age_hours).await? {
            WipStatus::Live { age_hours, owner } => {
                Ok(AcquireOutcome::HeldByOther { age_hours, owner })
            }
            WipStatus::Absent | WipStatus::StaleRemoved { .. } => {
                self.create_marker(target, marker).await?;
                Ok(AcquireOutcome::Acquired)
            }
        }
    }

    /// Write a marker claiming `target`, unconditionally.
    #[instrument(skip(self, marker))]
    pub async fn create_marker(&self, target: &ObjectRef, marker: &WipMarker) -> Result<()> {
        let marker_ref = Self::marker_ref(target);
        let body = serde_json::to_vec_pretty(marker).map_err(cds_common::CdsError::from)?;

        self.store
            .put_bytes(&marker_ref, body, Some("application/json"))
            .await?;

        info!(
            "Created WIP marker: {} ({})",
            marker_ref,
            marker.owner_summary()
        );
        Ok(())
    }

    /// Release the marker for `target`.
    ///
    /// Idempotent: a missing marker is success, and deletion failures are
    /// advisory (logged, not propagated); a leftover marker will age out.
    #[instrument(skip(self))]
    pub async fn release(&self, target: &ObjectRef) {
        let marker = Self::marker_ref(target);
        match self.store.delete(&marker).await {
            Ok(()) => info!("Removed WIP marker: {}", marker),
            Err(err) => warn!(error = %err, "Failed to remove WIP marker {}", marker),
        }
    }

    /// Best-effort read of a marker body for diagnostics.
    async fn read_marker_body(&self, marker: &ObjectRef) -> Option<WipMarker> {
        match self.store.get_bytes(marker).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    debug!(error = %err, "Could not parse WIP marker body {}", marker);
                    None
                }
            },
            Err(err) => {
                debug!(error = %err, "Could not read WIP marker body {}", marker);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_marker_ref_appends_wip_suffix() {
        let target = ObjectRef::parse("s3://b/data/file.jsonl.bz2").unwrap();
        assert_eq!(
            WipLock::marker_ref(&target).to_string(),
            "s3://b/data/file.jsonl.bz2.wip"
        );
    }

    #[test]
    fn test_marker_body_roundtrip() {
        let marker = WipMarker {
            hostname: "worker-3".to_string(),
            ip_address: "10.0.0.7".to_string(),
            username: "pipeline".to_string(),
            start_time: "2024-06-01T12:00:00Z".to_string(),
            pid: 4242,
            files: vec![(
                "out/actionfem-1933.jsonl.bz2".to_string(),
                "s3://corpus/actionfem/actionfem-1933.jsonl.bz2".to_string(),
            )],
        };

        let json = serde_json::to_string(&marker).unwrap();
        // Pairs serialize as two-element arrays, the wire format consumers expect.
        assert!(json.contains("[\"out/actionfem-1933.jsonl.bz2\""));

        let back: WipMarker = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hostname, "worker-3");
        assert_eq!(back.pid, 4242);
        assert_eq!(back.files.len(), 1);
    }

    #[test]
    fn test_for_current_process_fills_identity() {
        let marker = WipMarker::for_current_process(vec![]);
        assert!(!marker.hostname.is_empty());
        assert!(!marker.ip_address.is_empty());
        assert_eq!(marker.pid, std::process::id());
        assert!(marker.start_time.ends_with('Z'));
    }

    #[test]
    fn test_age_and_staleness() {
        let now = Utc::now();
        let age = marker_age_hours(now - Duration::hours(30), now);
        assert!((age - 30.0).abs() < 0.01);

        assert!(is_stale(30.0, 24.0));
        assert!(!is_stale(0.02, 24.0)); // a minute-old marker is live
        assert!(!is_stale(24.0, 24.0)); // threshold is exclusive
    }
}
