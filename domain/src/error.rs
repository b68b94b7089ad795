//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the domain layer are modeled as a tree: `domain::error::Error`
/// holds an `error_kind` enum describing the category plus the original
/// lower-layer error as `source`. The intent is to translate errors between
/// layers while maintaining layer boundaries: `web` depends on `domain`,
/// `domain` depends on `entity_api`, and `web` never sees `entity_api`
/// types directly. The kinds are ultimately what `web` maps to HTTP status
/// codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Other(String),
}

/// Entity errors bubbling up from `entity_api`, reduced to the subset of
/// kinds the domain layer cares about.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    Unauthenticated,
    Other(String),
}

impl Error {
    pub fn invalid() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::Invalid,
            )),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the
// `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::InvalidQueryTerm => EntityErrorKind::Invalid,
            EntityApiErrorKind::RecordUnauthenticated => EntityErrorKind::Unauthenticated,
            _ => EntityErrorKind::Other("EntityErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "JSON serialization related error".to_string(),
            )),
        }
    }
}
