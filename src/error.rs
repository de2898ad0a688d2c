//! Error types for the speechstretch crate.

use std::fmt;

/// Errors that can occur while configuring or driving a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeedError {
    /// A configuration value is outside its admissible range.
    InvalidConfiguration(String),
    /// An internal buffer could not grow to the requested size.
    AllocationFailed {
        buffer: &'static str,
        requested: usize,
        capacity: usize,
    },
    /// An operation was invoked in a stream state that forbids it.
    InvalidState(&'static str),
}

impl fmt::Display for SpeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedError::InvalidConfiguration(msg) => {
                write!(f, "invalid configuration: {}", msg)
            }
            SpeedError::AllocationFailed {
                buffer,
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "allocation failed: {} cannot grow to {} samples (limit {})",
                    buffer, requested, capacity
                )
            }
            SpeedError::InvalidState(msg) => write!(f, "invalid state: {}", msg),
        }
    }
}

impl std::error::Error for SpeedError {}
