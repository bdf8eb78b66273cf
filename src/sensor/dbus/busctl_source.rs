//! D-Bus sensor source: implements ValueSource by reading `Sensor.Value` through busctl.
//! Owning services missing from the configuration are resolved through the object mapper and cached.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::sensor::types::{QueryError, SourceDescriptor};
use crate::sensor::ValueSource;
use crate::system::executor::{BusctlRunner, SystemBusctl};
use crate::system::parser;

pub struct BusctlSource {
    runner: Arc<dyn BusctlRunner>,
    /// object path -> service, filled from GetObject replies
    resolved_services: Mutex<HashMap<String, String>>,
}

impl BusctlSource {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemBusctl))
    }

    pub fn with_runner(runner: Arc<dyn BusctlRunner>) -> Self {
        Self {
            runner,
            resolved_services: Mutex::new(HashMap::new()),
        }
    }

    /// Service to address for this source: configured, cached, or looked up now.
    async fn service_for(&self, source: &SourceDescriptor) -> Result<String, QueryError> {
        if let Some(service) = &source.service {
            return Ok(service.clone());
        }

        if let Some(cached) = self.resolved_services.lock().await.get(&source.id) {
            return Ok(cached.clone());
        }

        let reply = self
            .runner
            .get_object(&source.id)
            .await
            .map_err(|e| QueryError::Unreachable(format!("object mapper: {:#}", e)))?;
        let service = parser::parse_get_object(&reply)?;

        debug!("Resolved {} -> {}", source.id, service);
        self.resolved_services
            .lock()
            .await
            .insert(source.id.clone(), service.clone());
        Ok(service)
    }

    /// Forget a resolved service so the next tick asks the mapper again
    /// (the owning daemon may have restarted under another name).
    async fn forget_service(&self, source: &SourceDescriptor) {
        if source.service.is_none() {
            self.resolved_services.lock().await.remove(&source.id);
        }
    }
}

impl Default for BusctlSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueSource for BusctlSource {
    async fn query(&self, source: &SourceDescriptor) -> Result<f64, QueryError> {
        let service = self.service_for(source).await?;

        let reply = match self.runner.get_value(&service, &source.id).await {
            Ok(reply) => reply,
            Err(e) => {
                self.forget_service(source).await;
                return Err(QueryError::Unreachable(format!("{:#}", e)));
            }
        };

        let value = parser::parse_property_value(&reply)?;
        trace!("{} = {}", source.id, value);
        Ok(value)
    }
}
