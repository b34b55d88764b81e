//! # Desktop Bridge Implementations
//!
//! Desktop-ready adapters for the `bridge-traits` contracts:
//!
//! - [`DiskStorageInspector`] - free space + directory resolution over the
//!   local file system
//! - [`DiskFileJanitor`] - fail-soft deletion and folder purges via
//!   `tokio::fs`
//! - [`DesktopNetworkMonitor`] - TCP-probe reachability with a polling
//!   change stream
//!
//! Mobile hosts ship their own adapters; these implementations double as the
//! reference behavior for tests and desktop builds.

pub mod janitor;
pub mod network;
pub mod storage;

pub use janitor::DiskFileJanitor;
pub use network::DesktopNetworkMonitor;
pub use storage::DiskStorageInspector;
