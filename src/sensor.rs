//! ValueSource trait definition and the D-Bus / file implementations.

use async_trait::async_trait;

pub mod types;
pub mod dbus;
pub mod hwmon;
pub mod router;

#[cfg(test)]
pub mod fake;

pub use dbus::busctl_source::BusctlSource;
pub use hwmon::FileSource;
pub use router::SourceRouter;

use types::{QueryError, SourceDescriptor};

#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Read the current value of one source. Point-in-time, no caching of the value itself.
    async fn query(&self, source: &SourceDescriptor) -> Result<f64, QueryError>;
}
