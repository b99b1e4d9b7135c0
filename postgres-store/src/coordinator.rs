//! Snapshot coordinator: the non-transactional "save snapshot, then
//! advance cutoff" sequence.

use eventlog_core::error::Error as CoreError;
use eventlog_core::snapshot::Snapshot;
use eventlog_core::version::Version;

use crate::cutoff::CutoffAdvancer;
use crate::snapshot::SnapshotStore;

/// Couples a [`SnapshotStore`] and a [`CutoffAdvancer`] into the single
/// operation callers actually want.
#[derive(Debug, Clone)]
pub struct SnapshotCoordinator {
    snapshots: SnapshotStore,
    cutoff: CutoffAdvancer,
}

impl SnapshotCoordinator {
    #[must_use]
    pub fn new(snapshots: SnapshotStore, cutoff: CutoffAdvancer) -> Self {
        SnapshotCoordinator { snapshots, cutoff }
    }

    /// Saves `data` as the snapshot for `stream_id` at `version`, then
    /// advances `(domain, stream_id)`'s archive cutoff to `version`.
    ///
    /// The two steps are not jointly transactional: if the cutoff advance
    /// fails after the snapshot save succeeds, the stream simply has a
    /// snapshot the archiver isn't yet permitted to act on, safe and
    /// retryable by calling this again.
    ///
    /// Callers must never pass a `version` greater than the stream's
    /// current `LastVersion`.
    pub async fn save_snapshot_and_advance_cutoff(
        &self,
        domain: &str,
        stream_id: &str,
        version: Version,
        data: Vec<u8>,
    ) -> Result<bool, CoreError> {
        let snapshot = Snapshot {
            stream_id: stream_id.to_owned(),
            stream_version: version,
            data,
            created_utc: chrono::Utc::now(),
        };

        self.snapshots.save(&snapshot).await?;
        self.cutoff.try_advance(domain, stream_id, version).await
    }
}
