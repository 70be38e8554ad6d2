use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::authz::types::Caller;

/// A role and the permissions it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDef {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Static role -> permissions mapping. A caller's effective permissions are
/// its explicit permissions plus those of every role it holds.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: HashMap<String, BTreeSet<String>>,
}

impl RoleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_defs(defs: &[RoleDef]) -> Self {
        let mut catalog = Self::new();
        for def in defs {
            catalog.add(&def.name, def.permissions.iter().cloned());
        }
        catalog
    }

    pub fn add<I, S>(&mut self, role: &str, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .entry(role.to_string())
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
    }

    pub fn permissions_of(&self, role: &str) -> Option<&BTreeSet<String>> {
        self.roles.get(role)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// True when `caller` holds `permission` directly or through a role.
    pub fn caller_has(&self, caller: &Caller, permission: &str) -> bool {
        caller.permissions.contains(permission)
            || caller.roles.iter().any(|role| {
                self.roles
                    .get(role)
                    .is_some_and(|perms| perms.contains(permission))
            })
    }
}
