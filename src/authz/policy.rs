use crate::authz::errors::AuthzError;
use crate::authz::types::*;
use kdl::KdlDocument;

/// Parse a KDL document string into handler descriptors.
pub fn parse_kdl_document(source: &str) -> Result<Vec<ResourceHandlerDescriptor>, AuthzError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| AuthzError::KdlParse(e.to_string()))?;

    let mut handlers = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "handler" => {
                let base_path = first_string_arg(node).unwrap_or_default();
                let name = node
                    .get("name")
                    .and_then(|v| v.as_string())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| base_path.clone());

                let mut methods = Vec::new();
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "method" => methods.push(parse_method(child, &name)?),
                            other => {
                                return Err(AuthzError::InvalidDescriptor(format!(
                                    "unexpected child `{other}` in handler `{name}` (expected `method`)"
                                )));
                            }
                        }
                    }
                }

                handlers.push(ResourceHandlerDescriptor {
                    name,
                    base_path,
                    methods,
                });
            }
            other => {
                // Ignore comments and unknown top-level nodes with a warning
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(handlers)
}

fn parse_method(node: &kdl::KdlNode, handler: &str) -> Result<MethodDescriptor, AuthzError> {
    let name = first_string_arg(node).ok_or_else(|| {
        AuthzError::InvalidDescriptor(format!(
            "method node in handler `{handler}` requires a name argument (e.g. method \"findAll\" verb=\"GET\")"
        ))
    })?;

    let verb = match node.get("verb").and_then(|v| v.as_string()) {
        Some(v) => Some(v.parse::<HttpVerb>().map_err(|e| {
            AuthzError::InvalidDescriptor(format!(
                "{e} on method `{name}` in handler `{handler}` (expected GET, POST, PUT or DELETE)"
            ))
        })?),
        None => None,
    };

    let path = node
        .get("path")
        .and_then(|v| v.as_string())
        .unwrap_or_default()
        .to_string();

    let mut roles = Vec::new();
    let mut permissions = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "roles" => {
                    roles = dash_list(child);
                }
                "permissions" => {
                    permissions = dash_list(child);
                }
                other => {
                    return Err(AuthzError::InvalidDescriptor(format!(
                        "unexpected child `{other}` in method `{name}` (expected `roles` or `permissions`)"
                    )));
                }
            }
        }
    }

    Ok(MethodDescriptor {
        name,
        path,
        verb,
        roles,
        permissions,
    })
}

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &kdl::KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Extract dash-list children: nodes named "-" whose first argument is a string.
/// Example KDL:
/// ```kdl
/// roles {
///     - "USER"
///     - "MODERATOR"
/// }
/// ```
fn dash_list(node: &kdl::KdlNode) -> Vec<String> {
    let Some(children) = node.children() else {
        return Vec::new();
    };
    children
        .nodes()
        .iter()
        .filter(|n| n.name().value() == "-")
        .filter_map(first_string_arg)
        .collect()
}
