//! Error types for portalvis

use thiserror::Error;

/// Main error type for the crate
///
/// Visibility decisions (a portal clipped away, a room out of view) are never
/// errors; this type only covers malformed input and configuration I/O.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid room: {0}")]
    InvalidRoom(String),

    #[error("Invalid portal: {0}")]
    InvalidPortal(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),
}
