//! Engine error definitions.

use thiserror::Error;

use crate::device::DeviceError;
use crate::pointer::PointerError;

/// Errors fatal to engine startup or task management.
///
/// Transient stick-write failures are deliberately absent: they are logged
/// and swallowed so no background loop ever dies over a single report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The virtual device could not be created or opened.
    #[error("failed to attach virtual device: {0}")]
    Attachment(#[source] DeviceError),

    /// The initial pointer position could not be sampled.
    #[error("failed to sample initial pointer position: {0}")]
    Sample(#[source] PointerError),

    /// A background task could not be managed.
    #[error("engine task error: {0}")]
    Task(String),
}
