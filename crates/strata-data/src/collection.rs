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

//! Named selections of rprims.

use strata_core::token::render_tags;
use strata_core::{PrimPath, Token};

/// A named set of rprims drawn with one repr.
///
/// Membership is path based: an rprim belongs to the collection when it lies
/// under one of the root paths and under none of the excluded paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RprimCollection {
    name: Token,
    repr: Token,
    root_paths: Vec<PrimPath>,
    exclude_paths: Vec<PrimPath>,
}

impl RprimCollection {
    /// A collection rooted at the absolute root.
    pub fn new(name: Token, repr: Token) -> Self {
        Self {
            name,
            repr,
            root_paths: vec![PrimPath::absolute_root()],
            exclude_paths: Vec::new(),
        }
    }

    /// A collection of the `geometry` name drawn with the `hull` repr.
    pub fn geometry() -> Self {
        Self::new(render_tags::GEOMETRY, render_tags::HULL)
    }

    /// Replaces the root paths.
    pub fn with_root_paths(mut self, roots: Vec<PrimPath>) -> Self {
        self.root_paths = roots;
        self
    }

    /// Replaces the excluded paths.
    pub fn with_exclude_paths(mut self, excludes: Vec<PrimPath>) -> Self {
        self.exclude_paths = excludes;
        self
    }

    /// The collection's name, which also keys its change version.
    pub fn name(&self) -> &Token {
        &self.name
    }

    /// Repr the members are drawn with.
    pub fn repr(&self) -> &Token {
        &self.repr
    }

    /// Subtrees included.
    pub fn root_paths(&self) -> &[PrimPath] {
        &self.root_paths
    }

    /// Subtrees excluded.
    pub fn exclude_paths(&self) -> &[PrimPath] {
        &self.exclude_paths
    }

    /// Returns `true` if `id` falls inside the collection.
    pub fn contains(&self, id: &PrimPath) -> bool {
        self.root_paths.iter().any(|root| id.has_prefix(root))
            && !self.exclude_paths.iter().any(|ex| id.has_prefix(ex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_default_collection_contains_everything() {
        let c = RprimCollection::geometry();
        assert!(c.contains(&path("/a/b")));
    }

    #[test]
    fn test_roots_and_excludes() {
        let c = RprimCollection::geometry()
            .with_root_paths(vec![path("/world")])
            .with_exclude_paths(vec![path("/world/hidden")]);
        assert!(c.contains(&path("/world/mesh")));
        assert!(!c.contains(&path("/world/hidden/mesh")));
        assert!(!c.contains(&path("/worldly")));
        assert!(!c.contains(&path("/other")));
    }
}
