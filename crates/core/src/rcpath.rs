//! Locations inside a specification document, for diagnostics.
//!
//! A path is a list of segments: mapping field names, `#<index>` for
//! sequence elements, and one of two markers saying whether the path ends
//! at a mapping key ([`KEY`]) or at a value ([`VAL`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker: the path refers to a mapping key.
pub const KEY: &str = "$key";
/// Marker: the path refers to a mapping value.
pub const VAL: &str = "$val";

/// Segment used for the element at `i` of a sequence.
pub fn index(i: usize) -> String {
    format!("#{}", i)
}

/// An immutable location within the source document.
///
/// Extending a path always produces a new value; the receiver is left
/// untouched so sibling validations can share a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePath(Vec<String>);

impl ResourcePath {
    pub fn root() -> Self {
        ResourcePath(Vec::new())
    }

    /// A new path with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        ResourcePath(segments)
    }

    /// A new path with the `#i` index segment appended.
    pub fn at(&self, i: usize) -> Self {
        self.join(index(i))
    }

    /// A new path pointing at the value of field `name`.
    pub fn value_of(&self, name: &str) -> Self {
        self.join(name).join(VAL)
    }

    /// A new path pointing at the key `name` itself.
    pub fn key_of(&self, name: &str) -> Self {
        self.join(name).join(KEY)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(">"))
    }
}

impl<S: Into<String>> FromIterator<S> for ResourcePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ResourcePath(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_leaves_prefix_untouched() {
        let base = ResourcePath::root().join("cases").at(2);
        let a = base.value_of("where");
        let b = base.key_of("extra");
        assert_eq!(base.segments(), &["cases", "#2"]);
        assert_eq!(a.to_string(), "cases>#2>where>$val");
        assert_eq!(b.to_string(), "cases>#2>extra>$key");
    }

    #[test]
    fn root_renders_empty() {
        assert!(ResourcePath::root().is_empty());
        assert_eq!(ResourcePath::root().to_string(), "");
    }

    #[test]
    fn serializes_as_segment_list() {
        let path: ResourcePath = ["params", "#0", VAL].into_iter().collect();
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["params", "#0", "$val"]));
    }
}
