//! Error types for the modular application engine.

use std::fmt;

/// Stable error-kind identifiers, matching the vocabulary callers are
/// expected to match on (see the external-interfaces error list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ModuleNotFound,
    DuplicateModule,
    CircularDependency,
    RequiredServiceNotFound,
    ServiceAlreadyRegistered,
    ServiceNotFound,
    TargetTypeMismatch,
    ServiceIncompatible,
    TenantNotFound,
    TenantConfigNotFound,
    TenantConfigEmpty,
    ConfigMissing,
    ConfigFeederError,
    ConfigSetupError,
    ConfigValidationError,
    ApplicationNotReady,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ModuleNotFound => "module not found",
            ErrorKind::DuplicateModule => "duplicate module",
            ErrorKind::CircularDependency => "circular dependency",
            ErrorKind::RequiredServiceNotFound => "required service not found",
            ErrorKind::ServiceAlreadyRegistered => "service already registered",
            ErrorKind::ServiceNotFound => "service not found",
            ErrorKind::TargetTypeMismatch => "target type mismatch",
            ErrorKind::ServiceIncompatible => "service incompatible",
            ErrorKind::TenantNotFound => "tenant not found",
            ErrorKind::TenantConfigNotFound => "tenant config not found",
            ErrorKind::TenantConfigEmpty => "tenant config empty",
            ErrorKind::ConfigMissing => "config missing",
            ErrorKind::ConfigFeederError => "config feeder error",
            ErrorKind::ConfigSetupError => "config setup error",
            ErrorKind::ConfigValidationError => "config validation error",
            ErrorKind::ApplicationNotReady => "application not ready",
        };
        f.write_str(s)
    }
}

/// The engine's single error type. Carries a stable `kind` plus a free-form
/// message and, where relevant, a boxed source error.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type AppResult<T> = Result<T, AppError>;
