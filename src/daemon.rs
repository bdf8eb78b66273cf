//! Service lifecycle and status reporting.

pub mod service;
pub mod status;
