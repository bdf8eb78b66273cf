//! Dispatches each source to the implementation matching its kind.

use std::sync::Arc;

use async_trait::async_trait;

use crate::sensor::types::{QueryError, SourceDescriptor, SourceKind};
use crate::sensor::{BusctlSource, FileSource, ValueSource};

pub struct SourceRouter {
    dbus: Arc<dyn ValueSource>,
    file: Arc<dyn ValueSource>,
}

impl SourceRouter {
    pub fn new(dbus: Arc<dyn ValueSource>, file: Arc<dyn ValueSource>) -> Self {
        Self { dbus, file }
    }
}

impl Default for SourceRouter {
    fn default() -> Self {
        Self::new(Arc::new(BusctlSource::new()), Arc::new(FileSource::new()))
    }
}

#[async_trait]
impl ValueSource for SourceRouter {
    async fn query(&self, source: &SourceDescriptor) -> Result<f64, QueryError> {
        match source.kind {
            SourceKind::Dbus => self.dbus.query(source).await,
            SourceKind::File => self.file.query(source).await,
        }
    }
}
