use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// HTTP verbs a handler method can be annotated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 4] = [HttpVerb::Get, HttpVerb::Post, HttpVerb::Put, HttpVerb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpVerb {
    type Err = UnsupportedVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpVerb::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnsupportedVerb(s.to_string()))
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a verb other than GET/POST/PUT/DELETE is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP verb `{0}`")]
pub struct UnsupportedVerb(pub String);

/// Grant names with built-in meaning. They may appear in a method's role
/// list and are never held by a caller.
pub mod grant {
    /// Grants any authenticated caller, one that carries at least one role
    /// or permission.
    pub const AUTHENTICATED: &str = "VIRT_ROLE_USER";
    /// Grants every caller, anonymous included. The handler performs its own
    /// check.
    pub const ENDPOINT_CHECK: &str = "VIRT_ENDPOINT_CHECK";
}

// ---------- Rule source ----------

/// A single handler method and its declared access metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    /// Path relative to the handler's base path; empty means the base path itself.
    pub path: String,
    /// `None` for helper methods that are not bound to an HTTP verb.
    pub verb: Option<HttpVerb>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl MethodDescriptor {
    /// True when the method declares at least one role or permission grant.
    pub fn has_grants(&self) -> bool {
        !self.roles.is_empty() || !self.permissions.is_empty()
    }
}

/// A resource handler: a base path plus the methods it serves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceHandlerDescriptor {
    pub name: String,
    pub base_path: String,
    pub methods: Vec<MethodDescriptor>,
}

// ---------- Compiled rules ----------

/// Access metadata for one full resource path.
///
/// The path is fixed at construction. Grants are accumulated per verb and
/// merging is a union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRule {
    path: String,
    roles: BTreeMap<HttpVerb, BTreeSet<String>>,
    permissions: BTreeMap<HttpVerb, BTreeSet<String>>,
}

impl AccessRule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            roles: BTreeMap::new(),
            permissions: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Register `verb` on this path without granting anything.
    pub fn declare(&mut self, verb: HttpVerb) {
        self.roles.entry(verb).or_default();
        self.permissions.entry(verb).or_default();
    }

    pub fn grant_roles<I, S>(&mut self, verb: HttpVerb, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .entry(verb)
            .or_default()
            .extend(roles.into_iter().map(Into::into));
    }

    pub fn grant_permissions<I, S>(&mut self, verb: HttpVerb, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .entry(verb)
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
    }

    /// Fold another rule for the same path into this one.
    pub fn merge(&mut self, other: AccessRule) {
        for (verb, roles) in other.roles {
            self.roles.entry(verb).or_default().extend(roles);
        }
        for (verb, perms) in other.permissions {
            self.permissions.entry(verb).or_default().extend(perms);
        }
    }

    pub fn roles_for(&self, verb: HttpVerb) -> Option<&BTreeSet<String>> {
        self.roles.get(&verb)
    }

    pub fn permissions_for(&self, verb: HttpVerb) -> Option<&BTreeSet<String>> {
        self.permissions.get(&verb)
    }

    /// Verbs for which this rule carries an entry, granted or not.
    pub fn verbs(&self) -> BTreeSet<HttpVerb> {
        self.roles
            .keys()
            .chain(self.permissions.keys())
            .copied()
            .collect()
    }
}

/// Kind of a compiled rule, decided by the presence of variable segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Exact,
    Pattern,
}

/// An endpoint declared with a verb but without any grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncoveredEndpoint {
    pub handler: String,
    pub method: String,
    pub verb: HttpVerb,
    pub path: String,
}

/// Output of rule extraction: one rule per full path, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    pub(crate) rules: Vec<AccessRule>,
    pub(crate) uncovered: Vec<UncoveredEndpoint>,
}

impl RuleTable {
    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn get(&self, path: &str) -> Option<&AccessRule> {
        self.rules.iter().find(|r| r.path() == path)
    }

    /// Endpoints that were declared without grants (see `UngrantedPolicy`).
    pub fn uncovered(&self) -> &[UncoveredEndpoint] {
        &self.uncovered
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------- Request-time facts ----------

/// The already-authenticated caller of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub roles: HashSet<String>,
    pub permissions: HashSet<String>,
}

impl Caller {
    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: HashSet::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.roles.is_empty() || !self.permissions.is_empty()
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }
}

/// Why a request was granted or denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// The caller holds an always-grant role.
    AlwaysGrant,
    /// An exact-path rule decided.
    ExactRule { path: String, granted: bool },
    /// The first structurally matching pattern rule decided.
    PatternRule { pattern: String, granted: bool },
    /// No rule covers the path.
    NoMatchingRule,
    /// The request path is outside the given base path.
    BasePathMismatch,
    /// The request used a verb no rule can be declared for.
    UnsupportedVerb,
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        match self {
            Decision::AlwaysGrant => true,
            Decision::ExactRule { granted, .. } | Decision::PatternRule { granted, .. } => *granted,
            Decision::NoMatchingRule | Decision::BasePathMismatch | Decision::UnsupportedVerb => {
                false
            }
        }
    }
}

// ---------- API request/response types ----------

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    /// e.g. "GET"
    pub method: String,
    /// e.g. "/events/42"
    pub path: String,
    /// Mount path of the handler group, e.g. "/events"
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub allowed: bool,
    pub decision: Decision,
}

#[derive(Debug, Serialize)]
pub struct RuleView {
    pub kind: RuleKind,
    #[serde(flatten)]
    pub rule: AccessRule,
}

#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub always_grant_roles: Vec<String>,
    pub rules: Vec<RuleView>,
}
