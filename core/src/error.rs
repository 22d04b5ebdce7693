//! file: core/src/error.rs
//! description: error levels, the shared error trait and configuration errors.
//!
//! Only recoverable failures are modeled here. Broken generator invariants
//! (mismatched scope pairing, missing runtime primitives) are assertion
//! failures and never reach this module.

use std::fmt;

use crate::location::{Location, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level_str = match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        };
        write!(f, "{}", level_str)
    }
}

pub trait IronstoneErrorExt {
    fn level(&self) -> Level;
    fn message(&self) -> String;
    fn issuer(&self) -> String;
    fn span(&self) -> Option<Span>;
    fn location(&self) -> Option<Location>;
}

impl fmt::Debug for dyn IronstoneErrorExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc_str = match self.location() {
            Some(loc) => loc.to_string(),
            None => "unknown".to_string(),
        };
        let span_str = match self.span() {
            Some(span) => span.to_string(),
            None => "span:none".to_string(),
        };

        write!(
            f,
            "IRONSTONE | {} | {} | {} | {} | {}",
            self.level(),
            loc_str,
            self.issuer(),
            span_str,
            self.message()
        )
    }
}

impl fmt::Display for dyn IronstoneErrorExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// What went wrong while reading generator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The file could not be read.
    Io,
    /// The text is not valid JSON for the target type.
    Parse,
    /// The value parsed but violates a constraint checked by `validate`.
    Invalid,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    level: Level,
    message: String,
    issuer: String,
    location: Option<Location>,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, message: String, issuer: String) -> Self {
        ConfigError { kind, level: Level::Error, message, issuer, location: None }
    }

    pub fn with(
        kind: ConfigErrorKind,
        level: Level,
        message: String,
        issuer: String,
        location: Option<Location>,
    ) -> Self {
        ConfigError { kind, level, message, issuer, location }
    }

    pub fn invalid(message: impl Into<String>, issuer: &str) -> Self {
        Self::new(ConfigErrorKind::Invalid, message.into(), issuer.to_string())
    }

    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json reports line 0 for errors not tied to a position (I/O inside the reader).
        let location = if err.line() > 0 {
            Some(Location::new(err.line(), err.column()))
        } else {
            None
        };
        ConfigError::with(
            ConfigErrorKind::Parse,
            Level::Error,
            format!("parse config: {}", err),
            "config".to_string(),
            location,
        )
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{} (at {})", self.message, loc)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl IronstoneErrorExt for ConfigError {
    fn level(&self) -> Level {
        self.level
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn issuer(&self) -> String {
        self.issuer.clone()
    }

    fn span(&self) -> Option<Span> {
        self.location.map(|loc| Span::new(loc, loc))
    }

    fn location(&self) -> Option<Location> {
        self.location
    }
}

impl From<ConfigError> for Box<dyn IronstoneErrorExt> {
    fn from(err: ConfigError) -> Self {
        Box::new(err)
    }
}
