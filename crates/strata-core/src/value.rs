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

//! A cloneable, type-erased value container.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A type-erased value shared between scene delegates, primitives and tasks.
///
/// Cloning is cheap: the payload sits behind an `Arc`. Readers recover the
/// concrete type with [`get`](Value::get).
///
/// ```rust
/// use strata_core::Value;
///
/// let v = Value::new(42u32);
/// assert_eq!(v.get::<u32>(), Some(&42));
/// assert!(v.get::<f32>().is_none());
/// ```
#[derive(Clone)]
pub struct Value {
    data: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            data: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the payload if it is a `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Returns `true` if the payload is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        (*self.data).type_id() == TypeId::of::<T>()
    }

    /// Name of the stored type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Clones the payload out if it is a `T`.
    pub fn cloned<T: Any + Clone>(&self) -> Option<T> {
        self.get::<T>().cloned()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let value = Value::new(vec![1.0f32, 2.0]);
        assert!(value.is::<Vec<f32>>());
        assert_eq!(value.get::<Vec<f32>>().map(Vec::len), Some(2));
        assert_eq!(value.cloned::<Vec<f32>>(), Some(vec![1.0, 2.0]));
        assert!(value.get::<Vec<f64>>().is_none());
    }

    #[test]
    fn test_clone_shares_payload() {
        let a = Value::new(String::from("shared"));
        let b = a.clone();
        assert!(std::ptr::eq(
            a.get::<String>().unwrap(),
            b.get::<String>().unwrap()
        ));
    }
}
