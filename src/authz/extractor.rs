use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::authz::pattern::join_path;
use crate::authz::types::*;

/// What to do with a method that declares a path and verb but no grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UngrantedPolicy {
    /// Leave the endpoint out of the rule table. A covering pattern rule, if
    /// any, still applies; otherwise the request is denied by absence.
    #[default]
    Skip,
    /// Compile the endpoint as a rule with no grants: denied for everyone
    /// except always-grant roles, and it shadows broader patterns.
    #[serde(rename = "deny")]
    DenyAll,
}

/// Turns handler descriptors into a normalized `RuleTable`.
#[derive(Debug, Clone, Default)]
pub struct RuleExtractor {
    ungranted: UngrantedPolicy,
}

impl RuleExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ungranted(mut self, policy: UngrantedPolicy) -> Self {
        self.ungranted = policy;
        self
    }

    /// Build the rule table. Never fails: methods without a verb are helpers,
    /// methods without grants are recorded as uncovered.
    pub fn extract(&self, descriptors: &[ResourceHandlerDescriptor]) -> RuleTable {
        let mut table = RuleTable::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for handler in descriptors {
            tracing::debug!(handler = %handler.name, base = %handler.base_path, "adding rules for handler");

            for method in &handler.methods {
                let Some(verb) = method.verb else {
                    continue;
                };
                let full_path = join_path(&handler.base_path, &method.path);

                if !method.has_grants() {
                    tracing::warn!(
                        handler = %handler.name,
                        method = %method.name,
                        %verb,
                        path = %full_path,
                        policy = ?self.ungranted,
                        "endpoint declares no roles or permissions"
                    );
                    table.uncovered.push(UncoveredEndpoint {
                        handler: handler.name.clone(),
                        method: method.name.clone(),
                        verb,
                        path: full_path.clone(),
                    });
                    if self.ungranted == UngrantedPolicy::Skip {
                        continue;
                    }
                }

                let slot = *index.entry(full_path.clone()).or_insert_with(|| {
                    table.rules.push(AccessRule::new(full_path.clone()));
                    table.rules.len() - 1
                });
                let rule = &mut table.rules[slot];
                rule.declare(verb);
                rule.grant_roles(verb, method.roles.iter().cloned());
                rule.grant_permissions(verb, method.permissions.iter().cloned());
            }
        }

        for rule in &table.rules {
            tracing::debug!(path = rule.path(), verbs = ?rule.verbs(), "compiled rule");
        }

        table
    }
}

/// Extract with the default (skip) policy.
pub fn extract(descriptors: &[ResourceHandlerDescriptor]) -> RuleTable {
    RuleExtractor::new().extract(descriptors)
}
