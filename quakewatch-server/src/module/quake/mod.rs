///! Earthquake bulletin module
///!
///! Periodically fetches the PHIVOLCS-style earthquake bulletin page,
///! extracts its event table, caches the latest snapshot in memory, and
///! pushes newly appeared events to stream subscribers.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod monitor;
pub mod parser;
pub mod registry;
pub mod types;
pub mod updater;

pub use cache::SnapshotCache;
pub use error::QuakeError;
pub use fetcher::{FetchSnapshot, QuakeFetcher};
pub use monitor::QuakeMonitor;
pub use registry::SubscriberRegistry;
pub use types::{Quake, QuakeSnapshot};
pub use updater::QuakeUpdater;
