// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Hierarchical, ordered object identities.

use crate::error::PathError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const SEPARATOR: char = '/';

/// A hierarchical path identifying an object inside a render index.
///
/// Paths are absolute (`/world/geo/mesh_0`), the absolute root (`/`), or the
/// empty path which identifies nothing. Paths order by their string form,
/// which places every descendant of a path after it, so subtree queries are
/// range scans over ordered maps.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimPath(Arc<str>);

impl PrimPath {
    /// Parses and validates a path.
    pub fn new(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Ok(Self::empty());
        }
        if !path.starts_with(SEPARATOR) {
            return Err(PathError::NotAbsolute(path.to_string()));
        }
        if path.len() == 1 {
            return Ok(Self::absolute_root());
        }
        for component in path[1..].split(SEPARATOR) {
            if component.is_empty() {
                return Err(PathError::EmptyComponent(path.to_string()));
            }
            if let Some(character) = component.chars().find(|c| !is_valid_char(*c)) {
                return Err(PathError::InvalidCharacter {
                    path: path.to_string(),
                    character,
                });
            }
        }
        Ok(Self(Arc::from(path)))
    }

    /// The empty path.
    pub fn empty() -> Self {
        Self(Arc::from(""))
    }

    /// The absolute root path, `/`.
    pub fn absolute_root() -> Self {
        Self(Arc::from("/"))
    }

    /// Returns `true` for the empty path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` for the absolute root path.
    pub fn is_absolute_root(&self) -> bool {
        &*self.0 == "/"
    }

    /// The string form of the path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last component, or an empty string for the root and empty paths.
    pub fn name(&self) -> &str {
        if self.is_empty() || self.is_absolute_root() {
            return "";
        }
        self.0.rsplit(SEPARATOR).next().unwrap_or("")
    }

    /// The parent path. The root's parent (and the empty path's) is empty.
    pub fn parent(&self) -> PrimPath {
        if self.is_empty() || self.is_absolute_root() {
            return Self::empty();
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) => Self::absolute_root(),
            Some(idx) => Self(Arc::from(&self.0[..idx])),
            None => Self::empty(),
        }
    }

    /// Appends a child component.
    pub fn append_child(&self, name: &str) -> Result<PrimPath, PathError> {
        if self.is_empty() {
            return Err(PathError::NotAbsolute(name.to_string()));
        }
        if self.is_absolute_root() {
            Self::new(&format!("/{name}"))
        } else {
            Self::new(&format!("{}/{name}", self.0))
        }
    }

    /// Returns `true` if `prefix` is this path or one of its ancestors.
    ///
    /// The comparison is per component: `/ab` does not have prefix `/a`.
    /// Nothing has the empty path as prefix.
    pub fn has_prefix(&self, prefix: &PrimPath) -> bool {
        if prefix.is_empty() || self.is_empty() {
            return false;
        }
        if prefix.is_absolute_root() {
            return true;
        }
        match self.0.strip_prefix(&*prefix.0) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
            None => false,
        }
    }
}

fn is_valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')
}

/// Collects the keys of `map` that lie in the subtree rooted at `root`.
///
/// An empty or absolute-root `root` selects every key.
pub fn subtree_keys<V>(map: &BTreeMap<PrimPath, V>, root: &PrimPath) -> Vec<PrimPath> {
    if root.is_empty() || root.is_absolute_root() {
        return map.keys().cloned().collect();
    }
    map.range(root.clone()..)
        .take_while(|(path, _)| path.as_str().starts_with(root.as_str()))
        .filter(|(path, _)| path.has_prefix(root))
        .map(|(path, _)| path.clone())
        .collect()
}

impl Default for PrimPath {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimPath({:?})", &*self.0)
    }
}

impl FromStr for PrimPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for PrimPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PrimPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PrimPath::new(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_parse_and_reject() {
        assert!(p("").is_empty());
        assert!(p("/").is_absolute_root());
        assert_eq!(p("/a/b").as_str(), "/a/b");
        assert!(matches!(PrimPath::new("a/b"), Err(PathError::NotAbsolute(_))));
        assert!(matches!(PrimPath::new("/a//b"), Err(PathError::EmptyComponent(_))));
        assert!(matches!(PrimPath::new("/a/"), Err(PathError::EmptyComponent(_))));
        assert!(matches!(
            PrimPath::new("/a b"),
            Err(PathError::InvalidCharacter { character: ' ', .. })
        ));
    }

    #[test]
    fn test_name_parent_and_child() {
        let path = p("/world/geo");
        assert_eq!(path.name(), "geo");
        assert_eq!(path.parent(), p("/world"));
        assert_eq!(p("/world").parent(), PrimPath::absolute_root());
        assert!(PrimPath::absolute_root().parent().is_empty());
        assert_eq!(path.append_child("mesh").unwrap(), p("/world/geo/mesh"));
        assert_eq!(PrimPath::absolute_root().append_child("a").unwrap(), p("/a"));
    }

    #[test]
    fn test_prefix_is_per_component() {
        assert!(p("/a/b").has_prefix(&p("/a")));
        assert!(p("/a").has_prefix(&p("/a")));
        assert!(!p("/ab").has_prefix(&p("/a")));
        assert!(p("/ab").has_prefix(&PrimPath::absolute_root()));
        assert!(!p("/a").has_prefix(&PrimPath::empty()));
    }

    #[test]
    fn test_subtree_keys_skips_siblings_sharing_a_string_prefix() {
        let mut map = BTreeMap::new();
        for path in ["/a", "/a-x", "/a/b", "/a/b/c", "/ab", "/b"] {
            map.insert(p(path), ());
        }
        assert_eq!(
            subtree_keys(&map, &p("/a")),
            vec![p("/a"), p("/a/b"), p("/a/b/c")]
        );
        assert_eq!(subtree_keys(&map, &PrimPath::empty()).len(), 6);
        assert!(subtree_keys(&map, &p("/c")).is_empty());
    }
}
