//! Error types.
//!
//! Two families live here. [`Error`] surfaces infrastructure failures:
//! binding to a port, reading configuration. [`DispatchError`] is what a hook
//! or handler returns when a request cannot be served; the dispatcher turns it
//! into a rendered 500 response.

use std::backtrace::Backtrace;
use std::fmt;

use crate::event::EventType;

/// A boxed, thread-safe error from application code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by handlers, hooks and the invocation collaborators.
pub type HandlerResult = Result<(), DispatchError>;

/// The error type returned by skiff's fallible infrastructure operations.
///
/// Application-level outcomes (404, 500, …) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error(transparent)]
    Event(#[from] EventError),
}

/// Why a dispatch failed.
///
/// Only [`DispatchError::Domain`] is rendered with detail. Every other variant
/// is an unclassified failure and collapses into a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("no instance bound for `{0}`")]
    Unbound(&'static str),

    #[error("target is not a `{0}`")]
    TargetMismatch(&'static str),

    #[error("render: {0}")]
    Render(#[from] serde_json::Error),

    #[error("handler panicked: {0}")]
    Panic(String),

    #[error(transparent)]
    Handler(BoxError),
}

impl DispatchError {
    /// Wraps any application error as an unclassified failure.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}

/// An application-raised failure with a human-readable message.
///
/// Rendered as a 500 whose body shows the type name, the message and the
/// backtrace captured at construction when the response is HTML.
pub struct DomainError {
    type_name: &'static str,
    message: String,
    backtrace: Backtrace,
}

impl DomainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            type_name: std::any::type_name::<Self>(),
            message: message.into(),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Captures `err` keeping its concrete type name for the diagnostic page.
    pub fn of<E: std::error::Error>(err: E) -> Self {
        Self {
            type_name: std::any::type_name::<E>(),
            message: err.to_string(),
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Debug for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainError")
            .field("type_name", &self.type_name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DomainError {}

/// A lifecycle listener failed. Remaining listeners for that fire were skipped.
#[derive(Debug, thiserror::Error)]
#[error("listener for {event:?} failed: {source}")]
pub struct EventError {
    pub event: EventType,
    #[source]
    pub source: BoxError,
}
