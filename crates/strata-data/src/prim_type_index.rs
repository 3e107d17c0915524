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

//! Per-type registries of state and buffer primitives.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use strata_core::path::subtree_keys;
use strata_core::{PrimPath, SceneDelegate, Token};

/// A registered primitive and the delegate it was inserted through.
pub struct PrimEntry<P: ?Sized> {
    /// The backend primitive.
    pub prim: Box<P>,
    /// Weak association with the owning scene delegate.
    pub scene_delegate: Weak<dyn SceneDelegate>,
}

impl<P: ?Sized> PrimEntry<P> {
    /// The owning scene delegate, if it is still alive.
    pub fn scene_delegate(&self) -> Option<Arc<dyn SceneDelegate>> {
        self.scene_delegate.upgrade()
    }
}

struct TypeEntry<P: ?Sized> {
    prims: BTreeMap<PrimPath, PrimEntry<P>>,
    fallback: Option<Box<P>>,
}

impl<P: ?Sized> Default for TypeEntry<P> {
    fn default() -> Self {
        Self {
            prims: BTreeMap::new(),
            fallback: None,
        }
    }
}

/// Maps `(type, id)` to primitives, with one fallback instance per type.
///
/// The registry only stores primitives. Creating them and destroying the
/// ones it hands back is the caller's job.
pub struct PrimTypeIndex<P: ?Sized> {
    types: BTreeMap<Token, TypeEntry<P>>,
}

impl<P: ?Sized> Default for PrimTypeIndex<P> {
    fn default() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }
}

impl<P: ?Sized> PrimTypeIndex<P> {
    /// Creates a registry for the given types.
    pub fn new(types: &[Token]) -> Self {
        Self {
            types: types
                .iter()
                .map(|t| (t.clone(), TypeEntry::default()))
                .collect(),
        }
    }

    /// Returns `true` if `type_id` was registered.
    pub fn is_supported(&self, type_id: &Token) -> bool {
        self.types.contains_key(type_id)
    }

    /// Registered types in order.
    pub fn types(&self) -> impl Iterator<Item = &Token> {
        self.types.keys()
    }

    /// Installs the fallback for `type_id`, returning the previous one.
    pub fn set_fallback(&mut self, type_id: &Token, prim: Box<P>) -> Option<Box<P>> {
        self.types
            .entry(type_id.clone())
            .or_default()
            .fallback
            .replace(prim)
    }

    /// The fallback instance of `type_id`.
    pub fn fallback(&self, type_id: &Token) -> Option<&P> {
        self.types.get(type_id)?.fallback.as_deref()
    }

    /// Mutable access to the fallback instance of `type_id`.
    pub fn fallback_mut(&mut self, type_id: &Token) -> Option<&mut P> {
        self.types.get_mut(type_id)?.fallback.as_deref_mut()
    }

    /// Stores `prim` under `(type_id, id)`.
    ///
    /// Returns the primitive it replaced, if any. Unregistered types are
    /// rejected by handing `prim` back as `Err`.
    pub fn insert(
        &mut self,
        type_id: &Token,
        id: &PrimPath,
        scene_delegate: Weak<dyn SceneDelegate>,
        prim: Box<P>,
    ) -> Result<Option<Box<P>>, Box<P>> {
        let Some(entry) = self.types.get_mut(type_id) else {
            return Err(prim);
        };
        Ok(entry
            .prims
            .insert(
                id.clone(),
                PrimEntry {
                    prim,
                    scene_delegate,
                },
            )
            .map(|old| old.prim))
    }

    /// Removes `(type_id, id)`, returning the primitive if it existed.
    pub fn remove(&mut self, type_id: &Token, id: &PrimPath) -> Option<Box<P>> {
        self.types
            .get_mut(type_id)?
            .prims
            .remove(id)
            .map(|entry| entry.prim)
    }

    /// Looks up `(type_id, id)`.
    pub fn get(&self, type_id: &Token, id: &PrimPath) -> Option<&P> {
        self.types
            .get(type_id)?
            .prims
            .get(id)
            .map(|entry| entry.prim.as_ref())
    }

    /// Looks up the full entry for `(type_id, id)`.
    pub fn entry(&self, type_id: &Token, id: &PrimPath) -> Option<&PrimEntry<P>> {
        self.types.get(type_id)?.prims.get(id)
    }

    /// Returns `true` if `(type_id, id)` is registered.
    pub fn contains(&self, type_id: &Token, id: &PrimPath) -> bool {
        self.entry(type_id, id).is_some()
    }

    /// Ids of `type_id` at or below `root`, in path order. An empty root
    /// selects every id of the type.
    pub fn subtree_ids(&self, type_id: &Token, root: &PrimPath) -> Vec<PrimPath> {
        self.types
            .get(type_id)
            .map(|entry| subtree_keys(&entry.prims, root))
            .unwrap_or_default()
    }

    /// Removes every primitive at or below `root`, across all types.
    pub fn remove_subtree(&mut self, root: &PrimPath) -> Vec<(Token, PrimPath, Box<P>)> {
        let mut removed = Vec::new();
        for (type_id, entry) in self.types.iter_mut() {
            for id in subtree_keys(&entry.prims, root) {
                if let Some(prim) = entry.prims.remove(&id) {
                    removed.push((type_id.clone(), id, prim.prim));
                }
            }
        }
        removed
    }

    /// Mutable iteration over every registered primitive.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&Token, &PrimPath, &mut PrimEntry<P>)> {
        self.types.iter_mut().flat_map(|(type_id, entry)| {
            entry
                .prims
                .iter_mut()
                .map(move |(id, prim)| (type_id, id, prim))
        })
    }

    /// Number of registered primitives across all types.
    pub fn len(&self) -> usize {
        self.types.values().map(|entry| entry.prims.len()).sum()
    }

    /// Returns `true` if no primitive is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every registered primitive, keeping fallbacks.
    pub fn drain(&mut self) -> Vec<(PrimPath, Box<P>)> {
        self.types
            .values_mut()
            .flat_map(|entry| std::mem::take(&mut entry.prims))
            .map(|(id, entry)| (id, entry.prim))
            .collect()
    }

    /// Removes every fallback instance.
    pub fn take_fallbacks(&mut self) -> Vec<Box<P>> {
        self.types
            .values_mut()
            .filter_map(|entry| entry.fallback.take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;

    trait Named: Debug {
        fn name(&self) -> &str;
    }

    #[derive(Debug)]
    struct Thing(&'static str);

    impl Named for Thing {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn path(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    fn no_delegate() -> Weak<dyn SceneDelegate> {
        Weak::<strata_infra::MemorySceneDelegate>::new()
    }

    fn index() -> PrimTypeIndex<dyn Named> {
        PrimTypeIndex::new(&[Token::new("camera"), Token::new("light")])
    }

    #[test]
    fn test_insert_lookup_remove() {
        let mut idx = index();
        let camera = Token::new("camera");
        let id = path("/cam");
        assert!(idx
            .insert(&camera, &id, no_delegate(), Box::new(Thing("a")))
            .unwrap()
            .is_none());
        assert_eq!(idx.get(&camera, &id).map(|p| p.name()), Some("a"));
        assert!(idx.get(&Token::new("light"), &id).is_none());

        assert!(idx.remove(&camera, &id).is_some());
        assert!(idx.remove(&camera, &id).is_none());
        assert!(idx.is_empty());
    }

    #[test]
    fn test_duplicate_insert_returns_replaced() {
        let mut idx = index();
        let camera = Token::new("camera");
        let id = path("/cam");
        idx.insert(&camera, &id, no_delegate(), Box::new(Thing("old")))
            .unwrap();
        let replaced = idx
            .insert(&camera, &id, no_delegate(), Box::new(Thing("new")))
            .unwrap();
        assert_eq!(replaced.map(|p| p.name().to_owned()), Some("old".to_owned()));
        assert_eq!(idx.get(&camera, &id).map(|p| p.name()), Some("new"));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut idx = index();
        let rejected = idx.insert(
            &Token::new("volume"),
            &path("/v"),
            no_delegate(),
            Box::new(Thing("v")),
        );
        assert!(rejected.is_err());
    }

    #[test]
    fn test_subtree_and_fallback() {
        let mut idx = index();
        let light = Token::new("light");
        for p in ["/a/l1", "/a/l2", "/ab/l3", "/b/l4"] {
            idx.insert(&light, &path(p), no_delegate(), Box::new(Thing("l")))
                .unwrap();
        }
        assert_eq!(
            idx.subtree_ids(&light, &path("/a")),
            vec![path("/a/l1"), path("/a/l2")]
        );
        assert_eq!(idx.subtree_ids(&light, &PrimPath::empty()).len(), 4);

        assert!(idx.fallback(&light).is_none());
        idx.set_fallback(&light, Box::new(Thing("fallback")));
        assert_eq!(idx.fallback(&light).map(|p| p.name()), Some("fallback"));
        assert_eq!(idx.take_fallbacks().len(), 1);
    }
}
