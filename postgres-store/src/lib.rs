//! A PostgreSQL-backed tiered event store: hot rows in ordinary tables,
//! cold prefixes archived to NDJSON files, merged into one read view.
//!
//! [`EventStore`](store::EventStore) is the append/read path;
//! [`SnapshotStore`](snapshot::SnapshotStore) and
//! [`CutoffAdvancer`](cutoff::CutoffAdvancer) gate what the
//! [`ArchiveCoordinator`](archive::coordinator::ArchiveCoordinator) is
//! allowed to move into [`ColdArchiveStore`](archive::cold::ColdArchiveStore)
//! files, tracked by the [`SegmentCatalog`](archive::catalog::SegmentCatalog).
//! [`CombinedFeed`](feed::CombinedFeed) merges both tiers for readers who
//! don't care which tier an event currently lives in.

#![deny(unsafe_code, unused_qualifications, trivial_casts)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(missing_docs)]

pub mod archive;
pub mod coordinator;
pub mod cutoff;
pub mod error;
pub mod feed;
pub mod pool;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use coordinator::SnapshotCoordinator;
pub use cutoff::CutoffAdvancer;
pub use error::PgError;
pub use feed::CombinedFeed;
pub use pool::ConnectionProvider;
pub use snapshot::SnapshotStore;
pub use store::EventStore;
