//! Error types for window management.

use thiserror::Error;

use crate::apps::AppKind;

/// A view template failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template has no header region")]
    MissingHeader,
    #[error("template must start with its header region, found {found}")]
    HeaderNotFirst { found: &'static str },
    #[error("template header has no close affordance")]
    MissingCloseAffordance,
    #[error("template declares more than one header region")]
    DuplicateHeader,
    #[error("template size {width}x{height} cannot hold the window chrome")]
    TooSmall { width: u16, height: u16 },
    #[error("header buttons need {needed} columns but the template is {width} wide")]
    HeaderOverflow { needed: u16, width: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WmError {
    /// No application is registered for the requested kind.
    #[error("unknown window kind `{0}`")]
    UnknownKind(AppKind),
    #[error("invalid template for `{kind}`: {source}")]
    Template {
        kind: AppKind,
        #[source]
        source: TemplateError,
    },
}

pub type WmResult<T> = Result<T, WmError>;
