use std::path::Path;

use crate::authz::catalog::RoleCatalog;
use crate::authz::engine::AccessEngine;
use crate::authz::errors::AuthzError;
use crate::authz::extractor::{RuleExtractor, UngrantedPolicy};
use crate::authz::policy::parse_kdl_document;
use crate::authz::types::*;
use crate::settings::Settings;

/// Load all `.kdl` rule files from the given directory, in path order.
pub fn load_descriptors(dir: &Path) -> Result<Vec<ResourceHandlerDescriptor>, AuthzError> {
    if !dir.is_dir() {
        return Err(AuthzError::InvalidDescriptor(format!(
            "rules directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "kdl")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    let mut descriptors = Vec::new();
    for entry in entries {
        let path = entry.path();
        let contents =
            std::fs::read_to_string(&path).map_err(|source| AuthzError::RuleLoadError {
                path: path.display().to_string(),
                source,
            })?;
        let parsed = parse_kdl_document(&contents)?;
        tracing::debug!(file = %path.display(), handlers = parsed.len(), "parsed rule file");
        descriptors.extend(parsed);
    }

    Ok(descriptors)
}

/// Load the rule directory and extract it into a `RuleTable`.
pub fn load_rules(dir: &Path, ungranted: UngrantedPolicy) -> Result<RuleTable, AuthzError> {
    let descriptors = load_descriptors(dir)?;
    let table = RuleExtractor::new()
        .with_ungranted(ungranted)
        .extract(&descriptors);

    tracing::info!(
        handlers = descriptors.len(),
        rules = table.len(),
        uncovered = table.uncovered().len(),
        "Loaded access rules"
    );

    Ok(table)
}

/// Build a ready-to-use engine from settings: rules, role catalog and
/// always-grant roles.
pub fn load_engine(settings: &Settings) -> Result<AccessEngine, AuthzError> {
    let table = load_rules(&settings.rules.dir, settings.rules.ungranted)?;
    let catalog = RoleCatalog::from_defs(&settings.roles);
    let engine = AccessEngine::build_with_catalog(table, catalog);
    engine.set_always_grant_roles(settings.access.always_grant_roles.iter().cloned());
    Ok(engine)
}
