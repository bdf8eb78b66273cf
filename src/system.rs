//! Platform tooling: busctl execution and reply parsing.

pub mod executor;
pub mod parser;

#[cfg(test)]
pub mod fake;
