//! Path/verb/role authorization for REST resource handlers.
//!
//! Handler descriptors (from KDL rule files or built in code) are extracted
//! into a [`types::RuleTable`], compiled once into an [`engine::AccessEngine`]
//! and queried per request.

pub mod catalog;
pub mod engine;
pub mod errors;
pub mod extractor;
pub mod loader;
pub mod pattern;
pub mod policy;
pub mod types;
pub mod web;

pub use catalog::{RoleCatalog, RoleDef};
pub use engine::AccessEngine;
pub use errors::AuthzError;
pub use extractor::{extract, RuleExtractor, UngrantedPolicy};
pub use types::{
    AccessRule, Caller, Decision, HttpVerb, MethodDescriptor, ResourceHandlerDescriptor,
    RuleKind, RuleTable,
};
