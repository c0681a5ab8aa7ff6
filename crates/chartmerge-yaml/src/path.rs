//! Structural paths: the location of a node as a list of keys and indices.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One step from a container to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Keys and indices from the document root to a node.
///
/// Displayed as `a.b[2].c`. Paths are used as identifiers for reporting and
/// for addressing nodes from the command line; keys containing `.` or `[`
/// are displayed verbatim and will not parse back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StructuralPath(Vec<PathSegment>);

impl StructuralPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// A new path with `key` appended.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    /// A new path with `index` appended.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` equals `other` or lies beneath it.
    pub fn starts_with(&self, other: &StructuralPath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for StructuralPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for StructuralPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        for part in s.split('.').filter(|p| !p.is_empty()) {
            let (key, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }
            while let Some(open) = rest.strip_prefix('[') {
                let close = open
                    .find(']')
                    .ok_or_else(|| format!("unclosed '[' in path '{s}'"))?;
                let index = open[..close]
                    .parse::<usize>()
                    .map_err(|_| format!("invalid index '{}' in path '{s}'", &open[..close]))?;
                segments.push(PathSegment::Index(index));
                rest = &open[close + 1..];
            }
            if !rest.is_empty() {
                return Err(format!("unexpected '{rest}' in path '{s}'"));
            }
        }
        Ok(Self(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let path = StructuralPath::root().key("a").key("b").index(2).key("c");
        assert_eq!(path.to_string(), "a.b[2].c");
        assert_eq!(StructuralPath::root().index(0).key("x").to_string(), "[0].x");
        assert_eq!(StructuralPath::root().to_string(), "");
    }

    #[test]
    fn test_parse() {
        let path: StructuralPath = "a.b[2][0].c".parse().unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("a".into()),
                PathSegment::Key("b".into()),
                PathSegment::Index(2),
                PathSegment::Index(0),
                PathSegment::Key("c".into()),
            ]
        );
        assert!("a[x]".parse::<StructuralPath>().is_err());
        assert!("a[1".parse::<StructuralPath>().is_err());
    }

    #[test]
    fn test_starts_with() {
        let parent = StructuralPath::root().key("image");
        let child = parent.key("tag");
        assert!(child.starts_with(&parent));
        assert!(!parent.starts_with(&child));
    }
}
