use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::authz::catalog::RoleCatalog;
use crate::authz::pattern::{is_pattern, join_path, path_only, strip_base, PathPattern};
use crate::authz::types::*;

/// Compiled access rules plus the always-grant role set.
///
/// Exact rules are looked up by path. Pattern rules are scanned in the order
/// they were extracted and the first one whose structure matches the path
/// decides, even when it denies. Overlapping patterns such as
/// `/events/{id}` and `/events/{name}` are not detected; the earlier one wins.
///
/// The rule table never changes after `build`. The always-grant set is an
/// immutable snapshot swapped as a whole, so concurrent `authorize` calls see
/// either the old or the new set.
#[derive(Debug)]
pub struct AccessEngine {
    exact: HashMap<String, AccessRule>,
    patterns: Vec<(PathPattern, AccessRule)>,
    catalog: RoleCatalog,
    always_grant: ArcSwap<HashSet<String>>,
}

impl AccessEngine {
    pub fn build(table: RuleTable) -> Self {
        Self::build_with_catalog(table, RoleCatalog::new())
    }

    pub fn build_with_catalog(table: RuleTable, catalog: RoleCatalog) -> Self {
        let mut exact = HashMap::new();
        let mut patterns = Vec::new();

        for rule in table.rules {
            if !is_pattern(rule.path()) {
                tracing::debug!(path = rule.path(), "exact rule");
                exact.insert(rule.path().to_string(), rule);
                continue;
            }
            match PathPattern::compile(rule.path()) {
                Ok(pattern) => {
                    tracing::debug!(path = rule.path(), "pattern rule");
                    patterns.push((pattern, rule));
                }
                Err(e) => {
                    tracing::warn!(path = rule.path(), error = %e, "dropping rule with invalid pattern");
                }
            }
        }

        tracing::info!(
            exact = exact.len(),
            patterns = patterns.len(),
            roles = catalog.len(),
            "Built access engine"
        );

        Self {
            exact,
            patterns,
            catalog,
            always_grant: ArcSwap::from_pointee(HashSet::new()),
        }
    }

    /// Replace the always-grant roles. The previous set is discarded.
    pub fn set_always_grant_roles<I, S>(&self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: HashSet<String> = roles.into_iter().map(Into::into).collect();
        tracing::debug!(roles = ?roles, "setting always-grant roles");
        self.always_grant.store(Arc::new(roles));
    }

    pub fn always_grant_roles(&self) -> Arc<HashSet<String>> {
        self.always_grant.load_full()
    }

    /// Grant or deny `verb` on `request_path` for `caller`.
    ///
    /// `base_path` is the mount path of the handler group that received the
    /// request. A request outside of it is denied.
    pub fn authorize(
        &self,
        verb: HttpVerb,
        request_path: &str,
        base_path: &str,
        caller: &Caller,
    ) -> bool {
        self.decide(verb, request_path, base_path, caller).is_granted()
    }

    /// Like `authorize`, but reports which step decided.
    ///
    /// Rule paths are full handler paths (handler base path plus method
    /// path). After the prefix check the resource path is re-anchored under
    /// `base_path`, so the lookup key is the normalized request path and
    /// `base_path` only scopes which requests this call may grant. When
    /// `base_path` is an application mount such as `/app/api` rather than a
    /// handler path, the rule files must carry that prefix in their handler
    /// base paths (`handler "/app/api/events"`).
    pub fn decide(
        &self,
        verb: HttpVerb,
        request_path: &str,
        base_path: &str,
        caller: &Caller,
    ) -> Decision {
        let always = self.always_grant.load();
        if caller.roles.iter().any(|r| always.contains(r)) {
            tracing::debug!("access granted to always-grant role");
            return Decision::AlwaysGrant;
        }

        let request_path = path_only(request_path);
        let Some(resource) = strip_base(request_path, base_path) else {
            tracing::warn!(
                path = request_path,
                base = base_path,
                "access denied: path does not start with expected base path"
            );
            return Decision::BasePathMismatch;
        };

        // Rule paths are full handler paths; re-anchor the resource under its mount.
        let key = join_path(base_path, resource);
        tracing::debug!(%verb, path = %key, "checking resource path");

        if let Some(rule) = self.exact.get(&key) {
            let granted = self.permits(rule, verb, caller);
            tracing::debug!(granted, rule = rule.path(), "exact rule decided");
            return Decision::ExactRule {
                path: rule.path().to_string(),
                granted,
            };
        }

        if let Some((pattern, rule)) = self.patterns.iter().find(|(p, _)| p.matches(&key)) {
            let granted = self.permits(rule, verb, caller);
            tracing::debug!(granted, rule = pattern.as_str(), "pattern rule decided");
            return Decision::PatternRule {
                pattern: rule.path().to_string(),
                granted,
            };
        }

        tracing::debug!(path = %key, "no rule matched");
        Decision::NoMatchingRule
    }

    /// Role match OR permission match for `verb`. The reserved names in
    /// `grant` match by caller state instead of by role.
    fn permits(&self, rule: &AccessRule, verb: HttpVerb, caller: &Caller) -> bool {
        let by_role = rule.roles_for(verb).is_some_and(|roles| {
            roles.iter().any(|r| match r.as_str() {
                grant::ENDPOINT_CHECK => true,
                grant::AUTHENTICATED => caller.is_authenticated(),
                _ => caller.roles.contains(r),
            })
        });
        if by_role {
            return true;
        }
        rule.permissions_for(verb)
            .is_some_and(|perms| perms.iter().any(|p| self.catalog.caller_has(caller, p)))
    }

    /// Compiled rules: exact rules sorted by path, then patterns in scan order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleKind, &AccessRule)> {
        let mut exact: Vec<&AccessRule> = self.exact.values().collect();
        exact.sort_by(|a, b| a.path().cmp(b.path()));
        exact
            .into_iter()
            .map(|r| (RuleKind::Exact, r))
            .chain(self.patterns.iter().map(|(_, r)| (RuleKind::Pattern, r)))
    }

    pub fn rule_count(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }
}
