//! Selective patching of bot configuration documents
//!
//! A bot file is a JSON document holding a list of typed services. This crate
//! locates one service by a type-specific discriminator, applies a
//! presence-aware patch to it and writes the document back with sensitive
//! fields sealed by a caller-supplied secret.
//!
//! # Architecture
//!
//! ```text
//!   resolver ──► store.load ──► args (flags + overlay)
//!                                   │
//!                                   ▼
//!   store.save ◄── patcher ◄── locator
//!       │
//!       ▼
//!   UpdateOutcome (patched entry)
//! ```
//!
//! Every stage before `store.save` works on an in-memory copy, so a failing
//! run never touches the document on disk.

pub mod args;
pub mod locator;
pub mod model;
pub mod patcher;
pub mod pipeline;
pub mod resolver;
pub mod secrets;
pub mod store;

pub use args::{ArgumentSet, OverlaySource};
pub use locator::locate_service;
pub use model::{Document, Service, ServiceType};
pub use patcher::{FieldPolicy, FieldRule, ServiceField, VariantDescriptor};
pub use pipeline::{UpdateOutcome, UpdateRequest, run_update};
pub use resolver::resolve_document_path;
pub use secrets::SecretKey;
pub use store::{DocumentStore, FileStore};

use std::path::PathBuf;

/// Error types for bot file operations
#[derive(Debug, thiserror::Error)]
pub enum BotFileError {
    #[error("no .bot file found in {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("{count} .bot files found in {}, use --bot to pick one", dir.display())]
    AmbiguousConfig { dir: PathBuf, count: usize },

    #[error("{0}")]
    BadSecret(String),

    #[error("{0}")]
    MissingArgument(String),

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{label} {discriminator} was not found")]
    ServiceNotFound {
        label: &'static str,
        discriminator: String,
    },

    #[error("failed to save {}", path.display())]
    PersistError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BotFileError {
    pub fn bad_secret(msg: impl Into<String>) -> Self {
        Self::BadSecret(msg.into())
    }

    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingArgument(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistError {
            path: path.into(),
            source,
        }
    }
}

/// Result type for bot file operations
pub type Result<T> = std::result::Result<T, BotFileError>;
