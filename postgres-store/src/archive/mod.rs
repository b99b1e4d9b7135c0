//! The cold tier: NDJSON segment files and the catalog that tracks them,
//! plus the coordinator that produces them.

pub mod catalog;
pub mod cold;
pub mod coordinator;

pub use catalog::SegmentCatalog;
pub use cold::ColdArchiveStore;
pub use coordinator::ArchiveCoordinator;
