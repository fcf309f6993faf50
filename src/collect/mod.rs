//! Collectors
//!
//! A collector turns some view of a WordPress site into a [`SiteSnapshot`]:
//! the REST API of a live site ([`RemoteCollector`]), a theme directory or
//! install on disk ([`LocalCollector`]), or a snapshot saved earlier.

pub mod local;
pub mod remote;

pub use local::LocalCollector;
pub use remote::{RemoteCollector, RemoteCollectorBuilder};

use crate::error::Result;
use crate::site::SiteSnapshot;
use std::path::Path;

/// Load a snapshot written by an earlier `snapshot` run
pub fn from_file(path: &Path) -> Result<SiteSnapshot> {
    tracing::debug!("loading snapshot from {}", path.display());
    SiteSnapshot::load(path)
}
