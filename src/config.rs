//! Service configuration: types, validation and persistence.

pub mod persistence;
pub mod types;
pub mod validation;
