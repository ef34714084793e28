//! Hierarchical names for the DIFS namespace.
//!
//! A [`Name`] is an ordered sequence of opaque byte components. Equality and
//! the prefix relation are component-wise. One distinguished component kind,
//! the segment component, encodes a non-negative integer and addresses a
//! single segment of a stored file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// URI marker for segment components, e.g. `seg=42`.
const SEGMENT_MARKER: &str = "seg=";

/// One component of a [`Name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Component {
    /// Opaque bytes. Rendered as lossy UTF-8 in URI form.
    Generic(Vec<u8>),
    /// Segment index component.
    Segment(u64),
}

impl Component {
    /// Returns the segment index if this is a segment component.
    pub fn as_segment(&self) -> Option<u64> {
        match self {
            Component::Segment(n) => Some(*n),
            Component::Generic(_) => None,
        }
    }

    fn parse(text: &str) -> Result<Self> {
        if let Some(rest) = text.strip_prefix(SEGMENT_MARKER) {
            let n = rest.parse::<u64>().map_err(|e| CoreError::InvalidName {
                uri: text.to_string(),
                reason: format!("bad segment component: {e}"),
            })?;
            Ok(Component::Segment(n))
        } else {
            Ok(Component::Generic(text.as_bytes().to_vec()))
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Generic(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Component::Segment(n) => write!(f, "{SEGMENT_MARKER}{n}"),
        }
    }
}

/// A hierarchical name. Value type: cheap to clone, compared component-wise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// The empty name (the root prefix).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URI of the form `/a/b/seg=3`. `/` parses to the empty name.
    pub fn parse(uri: &str) -> Result<Self> {
        let trimmed = uri.trim();
        let Some(body) = trimmed.strip_prefix('/') else {
            return Err(CoreError::InvalidName {
                uri: uri.to_string(),
                reason: "missing leading '/'".to_string(),
            });
        };
        let mut name = Name::new();
        if body.is_empty() {
            return Ok(name);
        }
        for part in body.split('/') {
            if part.is_empty() {
                return Err(CoreError::InvalidName {
                    uri: uri.to_string(),
                    reason: "empty component".to_string(),
                });
            }
            name.components.push(Component::parse(part)?);
        }
        Ok(name)
    }

    /// Appends a component, returning the extended name.
    pub fn append(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Appends a generic component from a string.
    pub fn append_str(self, text: &str) -> Self {
        self.append(Component::Generic(text.as_bytes().to_vec()))
    }

    /// Appends a generic component from raw bytes.
    pub fn append_bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.append(Component::Generic(bytes.into()))
    }

    /// Appends a segment component.
    pub fn append_segment(self, index: u64) -> Self {
        self.append(Component::Segment(index))
    }

    /// Appends every component of `other`, returning the joined name.
    pub fn join(mut self, other: &Name) -> Self {
        self.components.extend(other.components.iter().cloned());
        self
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True when the name has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// All components in order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// A sub-name spanning `[from, to)`. Out-of-range bounds are clamped.
    pub fn slice(&self, from: usize, to: usize) -> Name {
        let to = to.min(self.components.len());
        let from = from.min(to);
        Name {
            components: self.components[from..to].to_vec(),
        }
    }

    /// Component-wise prefix relation. Every name is a prefix of itself.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.components
            .iter()
            .zip(other.components.iter())
            .all(|(a, b)| a == b)
    }

    /// Segment index carried by the component at `index`.
    pub fn segment_at(&self, index: usize) -> Result<u64> {
        self.get(index)
            .and_then(Component::as_segment)
            .ok_or(CoreError::NotASegment { index })
    }

    /// URI rendering, `/a/b/seg=3`. The empty name renders as `/`.
    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        let mut uri = String::new();
        for component in &self.components {
            uri.push('/');
            uri.push_str(&component.to_string());
        }
        uri
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl std::str::FromStr for Name {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Name::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_round_trip() {
        let name = Name::parse("/repo/files/hello.txt").unwrap();
        assert_eq!(name.len(), 3);
        assert_eq!(name.to_uri(), "/repo/files/hello.txt");
    }

    #[test]
    fn test_parse_root() {
        let name = Name::parse("/").unwrap();
        assert!(name.is_empty());
        assert_eq!(name.to_uri(), "/");
    }

    #[test]
    fn test_parse_rejects_missing_slash() {
        assert!(Name::parse("repo/files").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_component() {
        assert!(Name::parse("/repo//files").is_err());
    }

    #[test]
    fn test_segment_component_round_trip() {
        let name = Name::parse("/data").unwrap().append_segment(42);
        assert_eq!(name.to_uri(), "/data/seg=42");
        let parsed = Name::parse("/data/seg=42").unwrap();
        assert_eq!(parsed, name);
        assert_eq!(parsed.segment_at(1).unwrap(), 42);
    }

    #[test]
    fn test_segment_at_rejects_generic() {
        let name = Name::parse("/data/plain").unwrap();
        assert!(name.segment_at(1).is_err());
        assert!(name.segment_at(9).is_err());
    }

    #[test]
    fn test_prefix_relation() {
        let prefix = Name::parse("/repo/files").unwrap();
        let name = Name::parse("/repo/files/hello.txt").unwrap();
        assert!(prefix.is_prefix_of(&name));
        assert!(prefix.is_prefix_of(&prefix));
        assert!(!name.is_prefix_of(&prefix));

        let other = Name::parse("/repo/other").unwrap();
        assert!(!other.is_prefix_of(&name));
    }

    #[test]
    fn test_join_and_slice() {
        let base = Name::parse("/node0/data").unwrap();
        let file = Name::parse("/files/a.bin").unwrap();
        let joined = base.clone().join(&file).append_segment(7);
        assert_eq!(joined.to_uri(), "/node0/data/files/a.bin/seg=7");
        assert_eq!(joined.slice(2, 4), file);
        assert_eq!(joined.slice(2, 99).len(), 3);
    }

    #[test]
    fn test_empty_name_is_universal_prefix() {
        let root = Name::new();
        let name = Name::parse("/anything").unwrap();
        assert!(root.is_prefix_of(&name));
    }
}
