//! Dotted/indexed path lookups (`a.b[2].c`) against nested JSON values.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Resolve `path` against `root`.
///
/// An empty path yields the root itself. Numeric dotted segments (`items.0`)
/// index into arrays the same way bracket segments do. Returns `None` when any
/// segment is missing or the path is malformed.
pub fn extract<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path)?;
    let mut current = root;
    for segment in &segments {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Resolve `path` against a flat context map.
///
/// The first segment must name a key of the map.
pub fn extract_from_map<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path)?;
    let (first, rest) = segments.split_first()?;
    let Segment::Key(key) = first else {
        return None;
    };

    let mut current = context.get(key)?;
    for segment in rest {
        current = step(current, segment)?;
    }
    Some(current)
}

fn step<'a>(current: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (current, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        (Value::Array(items), Segment::Key(key)) => {
            let index = key.parse::<usize>().ok()?;
            items.get(index)
        }
        _ => None,
    }
}

fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let path = path.trim();
    let mut segments = Vec::new();
    if path.is_empty() {
        return Some(segments);
    }

    for part in path.split('.') {
        let (key, mut brackets) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };

        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        } else if brackets.is_empty() {
            // `a..b`
            return None;
        }

        while !brackets.is_empty() {
            let rest = brackets.strip_prefix('[')?;
            let close = rest.find(']')?;
            let inner = rest[..close].trim();
            let inner = inner.trim_matches(|c| c == '"' || c == '\'');
            match inner.parse::<usize>() {
                Ok(index) => segments.push(Segment::Index(index)),
                Err(_) if !inner.is_empty() => segments.push(Segment::Key(inner.to_string())),
                Err(_) => return None,
            }
            brackets = &rest[close + 1..];
        }
    }

    Some(segments)
}
