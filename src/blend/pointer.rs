//! Dot-delimited JSON pointers
//!
//! A pointer is a dot-separated address into a JSON object tree. A literal
//! dot inside a segment is escaped as `\.`. Assignment walks an owned tree
//! and returns the failing segment instead of mutating through aliased
//! references.

use serde_json::{Map, Value};

/// Split a pointer into unescaped segments.
///
/// `extra.branch-alias.dev-3\.4` yields
/// `["extra", "branch-alias", "dev-3.4"]`.
pub fn split(pointer: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = pointer.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    segments.push(current);
    segments
}

/// Resolve a pointer against a document, if every segment exists
pub fn resolve<'a>(document: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = document;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Assign a value at a pointer, creating missing intermediate objects when
/// `force` is set.
///
/// On failure the offending segment is returned and the document is left
/// with whatever intermediate objects were already created; callers discard
/// the document in that case.
pub fn assign(
    node: &mut Value,
    segments: &[String],
    value: &Value,
    force: bool,
) -> Result<(), String> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };

    let Some(map) = node.as_object_mut() else {
        return Err(segment.clone());
    };

    if rest.is_empty() {
        map.insert(segment.clone(), value.clone());
        return Ok(());
    }

    if !map.contains_key(segment) {
        if !force {
            return Err(segment.clone());
        }
        map.insert(segment.clone(), Value::Object(Map::new()));
    }

    match map.get_mut(segment) {
        Some(child) => assign(child, rest, value, force),
        None => Err(segment.clone()),
    }
}
