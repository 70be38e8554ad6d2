//! Resource path normalization and variable-segment patterns.
//!
//! Paths are compared segment by segment. A pattern such as
//! `/events/{id}/locations` has three segments and only matches concrete
//! paths with exactly three segments whose literal segments are equal.

use regex::Regex;

use crate::authz::errors::AuthzError;

/// Canonical form of a path: leading `/`, single separators, no trailing `/`.
/// The root is `/`.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in segments(path) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Non-empty segments of a path. A `/` inside `{...}` belongs to the
/// variable, so `{name: [^/]+}` stays one segment.
fn segments(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                if i > start {
                    out.push(&path[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < path.len() {
        out.push(&path[start..]);
    }
    out
}

/// Join a base path and a relative path with exactly one separator.
pub fn join_path(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        normalize_path(base)
    } else {
        normalize_path(&format!("{base}/{relative}"))
    }
}

/// Drop the query string and fragment of a request path.
pub fn path_only(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or_default()
}

/// A path containing a `{...}` marker is a pattern.
pub fn is_pattern(path: &str) -> bool {
    path.contains('{')
}

/// Strip `base` from `path` on a segment boundary.
///
/// `/eventsX` is not below `/events`; `/events`, `/events/` and `/events/5` are.
pub fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(base)?;
    if base.is_empty() || base.ends_with('/') || rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    /// `{name}`: any single non-empty segment.
    Any,
    /// `{name: regex}` or a segment mixing literal text and variables.
    Matching(Regex),
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == segment,
            Segment::Any => !segment.is_empty(),
            Segment::Matching(re) => re.is_match(segment),
        }
    }
}

/// A compiled pattern path.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn compile(path: &str) -> Result<Self, AuthzError> {
        let source = normalize_path(path);
        let segments = segments(&source)
            .into_iter()
            .map(|s| compile_segment(s, &source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { source, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a normalized concrete path.
    pub fn matches(&self, path: &str) -> bool {
        let mut concrete = path.split('/').filter(|s| !s.is_empty());
        for segment in &self.segments {
            match concrete.next() {
                Some(s) if segment.matches(s) => {}
                _ => return false,
            }
        }
        concrete.next().is_none()
    }
}

enum Piece<'a> {
    Text(&'a str),
    Var { constraint: Option<&'a str> },
}

fn compile_segment(raw: &str, source: &str) -> Result<Segment, AuthzError> {
    if !raw.contains('{') {
        return Ok(Segment::Literal(raw.to_string()));
    }

    let pieces = split_variables(raw).ok_or_else(|| AuthzError::InvalidPattern {
        pattern: source.to_string(),
        reason: format!("unbalanced braces in segment `{raw}`"),
    })?;

    if let [Piece::Var { constraint }] = pieces.as_slice() {
        return match constraint {
            None => Ok(Segment::Any),
            Some(re) => anchored(re, source).map(Segment::Matching),
        };
    }

    let mut expr = String::new();
    for piece in &pieces {
        match piece {
            Piece::Text(text) => expr.push_str(&regex::escape(text)),
            Piece::Var { constraint: None } => expr.push_str("[^/]+?"),
            Piece::Var {
                constraint: Some(re),
            } => {
                expr.push_str("(?:");
                expr.push_str(re);
                expr.push(')');
            }
        }
    }
    anchored(&expr, source).map(Segment::Matching)
}

fn anchored(expr: &str, source: &str) -> Result<Regex, AuthzError> {
    Regex::new(&format!("^(?:{expr})$")).map_err(|e| AuthzError::InvalidPattern {
        pattern: source.to_string(),
        reason: e.to_string(),
    })
}

/// Split a segment into literal text and `{name}` / `{name: regex}` pieces.
/// Braces inside a constraint (e.g. `{code: [a-z]{3}}`) are balanced.
fn split_variables(raw: &str) -> Option<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find('{') {
        if open > 0 {
            pieces.push(Piece::Text(&rest[..open]));
        }
        let mut depth = 0usize;
        let mut close = None;
        for (i, c) in rest[open..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(open + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close?;
        let inner = &rest[open + 1..close];
        let constraint = inner
            .split_once(':')
            .map(|(_, re)| re.trim())
            .filter(|re| !re.is_empty());
        pieces.push(Piece::Var { constraint });
        rest = &rest[close + 1..];
    }
    if rest.contains('}') {
        return None;
    }
    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    Some(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_path("/events/"), "/events");
        assert_eq!(normalize_path("events//42"), "/events/42");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_path_only() {
        assert_eq!(path_only("/users?page=2#top"), "/users");
        assert_eq!(path_only("/users#top"), "/users");
        assert_eq!(path_only("/users"), "/users");
    }

    #[test]
    fn test_join() {
        assert_eq!(join_path("/events", ""), "/events");
        assert_eq!(join_path("/events", "/"), "/events");
        assert_eq!(join_path("/events", "{id}"), "/events/{id}");
        assert_eq!(join_path("/events", "/{id}"), "/events/{id}");
        assert_eq!(join_path("", "users"), "/users");
        assert_eq!(join_path("", ""), "/");
    }

    #[test]
    fn test_strip_base_on_segment_boundary() {
        assert_eq!(strip_base("/events", "/events"), Some(""));
        assert_eq!(strip_base("/events/5", "/events"), Some("/5"));
        assert_eq!(strip_base("/events/5", "/events/"), Some("5"));
        assert_eq!(strip_base("/events/5", ""), Some("/events/5"));
        assert_eq!(strip_base("/eventsX", "/events"), None);
        assert_eq!(strip_base("/users", "/events"), None);
    }

    #[test]
    fn test_slash_inside_variable_stays_in_segment() {
        assert_eq!(normalize_path("docs//{name: [^/]+}/"), "/docs/{name: [^/]+}");
        assert_eq!(segments("/docs/{name: [^/]+}/raw"), vec!["docs", "{name: [^/]+}", "raw"]);

        let p = PathPattern::compile("/docs/{name: [^/]+}").unwrap();
        assert!(p.matches("/docs/readme"));
        assert!(!p.matches("/docs/a/b"));
    }

    #[test]
    fn test_pattern_is_segment_exact() {
        let p = PathPattern::compile("/events/{id}/locations").unwrap();
        assert!(p.matches("/events/42/locations"));
        assert!(!p.matches("/events/42/locations/99"));
        assert!(!p.matches("/events/locations"));
        assert!(!p.matches("/users/42/locations"));
    }

    #[test]
    fn test_pattern_root_variable() {
        let p = PathPattern::compile("/{id}").unwrap();
        assert!(p.matches("/5"));
        assert!(!p.matches("/"));
    }

    #[test]
    fn test_pattern_with_constraint() {
        let p = PathPattern::compile("/events/{id: [0-9]+}").unwrap();
        assert!(p.matches("/events/42"));
        assert!(!p.matches("/events/abc"));

        let p = PathPattern::compile("/codes/{code: [a-z]{3}}").unwrap();
        assert!(p.matches("/codes/abc"));
        assert!(!p.matches("/codes/abcd"));
    }

    #[test]
    fn test_pattern_mixed_segment() {
        let p = PathPattern::compile("/docs/v{major}.json").unwrap();
        assert!(p.matches("/docs/v2.json"));
        assert!(!p.matches("/docs/v2.xml"));
        assert!(!p.matches("/docs/v.json"));
    }

    #[test]
    fn test_pattern_invalid() {
        assert!(matches!(
            PathPattern::compile("/events/{id"),
            Err(AuthzError::InvalidPattern { .. })
        ));
        assert!(matches!(
            PathPattern::compile("/events/{id: [0-9+}"),
            Err(AuthzError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_is_pattern() {
        assert!(is_pattern("/events/{id}"));
        assert!(!is_pattern("/events"));
    }
}
