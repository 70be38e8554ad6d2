use miette::Diagnostic;
use thiserror::Error;

use crate::authz::errors::AuthzError;

#[derive(Debug, Error, Diagnostic)]
pub enum GuardError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(restguard::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Authz(#[from] AuthzError),

    #[error("Bad request: {0}")]
    #[diagnostic(code(restguard::bad_request))]
    BadRequest(String),

    #[error("{0}")]
    #[diagnostic(code(restguard::other))]
    Other(String),
}
