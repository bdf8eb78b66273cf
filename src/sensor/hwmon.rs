//! File-backed sensor source: hwmon `*_input` style files holding one number.

use async_trait::async_trait;

use crate::sensor::types::{QueryError, SourceDescriptor};
use crate::sensor::ValueSource;

#[derive(Debug, Default)]
pub struct FileSource;

impl FileSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ValueSource for FileSource {
    async fn query(&self, source: &SourceDescriptor) -> Result<f64, QueryError> {
        let content = tokio::fs::read_to_string(&source.id)
            .await
            .map_err(|e| QueryError::Unreachable(format!("{}: {}", source.id, e)))?;

        let raw = content.trim();
        // hwmon values are integers in milli/micro units; accept decimals for other producers
        let value: f64 = raw
            .parse()
            .map_err(|_| QueryError::MalformedReply(format!("'{}' is not numeric", raw)))?;

        Ok(value * source.scale)
    }
}
