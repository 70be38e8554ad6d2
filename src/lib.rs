//! restguard - declarative access control for REST resource handlers
//!
//! This library provides rule extraction and the access engine. It exposes
//! all modules for testing purposes.

pub mod authz;
pub mod errors;
pub mod settings;
pub mod web;
