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

//! The context shared by tasks during one engine invocation.

use crate::token::Token;
use crate::value::Value;
use std::any::Any;
use std::collections::HashMap;

/// A mapping from token keys to type-erased values.
///
/// Keys are conventions between tasks; the context enforces nothing and the
/// last writer wins.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    entries: HashMap<Token, Value>,
}

impl TaskContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `key`.
    pub fn set(&mut self, key: Token, value: Value) {
        self.entries.insert(key, value);
    }

    /// Wraps and stores `value` under `key`.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: Token, value: T) {
        self.set(key, Value::new(value));
    }

    /// The value stored under `key`.
    pub fn get(&self, key: &Token) -> Option<&Value> {
        self.entries.get(key)
    }

    /// The value stored under `key` if it is a `T`.
    pub fn get_as<T: Any>(&self, key: &Token) -> Option<&T> {
        self.entries.get(key).and_then(Value::get::<T>)
    }

    /// Removes `key`, returning its value if present.
    pub fn remove(&mut self, key: &Token) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &Token) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the context holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&Token, &Value)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut ctx = TaskContext::new();
        ctx.insert(Token::new("exposure"), 1.5f32);
        assert_eq!(ctx.get_as::<f32>(&Token::new("exposure")), Some(&1.5));
    }

    #[test]
    fn test_overwrite_does_not_duplicate() {
        let mut ctx = TaskContext::new();
        let key = Token::new("frame");
        ctx.insert(key.clone(), 1u32);
        ctx.insert(key.clone(), 2u32);
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get_as::<u32>(&key), Some(&2));
    }

    #[test]
    fn test_overwrite_may_change_type() {
        let mut ctx = TaskContext::new();
        let key = Token::new("k");
        ctx.insert(key.clone(), 1u32);
        ctx.insert(key.clone(), String::from("one"));
        assert!(ctx.get_as::<u32>(&key).is_none());
        assert_eq!(ctx.get_as::<String>(&key).map(String::as_str), Some("one"));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut ctx = TaskContext::new();
        assert!(ctx.remove(&Token::new("absent")).is_none());
        assert!(ctx.is_empty());
    }
}
