use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Failed to load rule file `{path}`")]
    #[diagnostic(
        code(restguard::authz::rule_load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    RuleLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid handler descriptor: {0}")]
    #[diagnostic(
        code(restguard::authz::invalid_descriptor),
        help("Each rule file must contain `handler` nodes with `method` children, e.g. handler \"/events\" {{ method \"list\" verb=\"GET\" {{ roles {{ - \"USER\" }} }} }}")
    )]
    InvalidDescriptor(String),

    #[error("Invalid path pattern `{pattern}`: {reason}")]
    #[diagnostic(
        code(restguard::authz::invalid_pattern),
        help("Variable segments look like {{id}} or {{id: [0-9]+}}; a constraint must be a valid regex matching one segment")
    )]
    InvalidPattern { pattern: String, reason: String },

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(restguard::authz::kdl_parse),
        help("Check your KDL file syntax, see https://kdl.dev for the specification")
    )]
    KdlParse(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(restguard::authz::io))]
    Io(#[from] std::io::Error),
}
