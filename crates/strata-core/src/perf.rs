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

//! Named performance counters.

use crate::token::Token;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Thread-safe registry of monotonically increasing counters.
///
/// Counter names are tokens; the well-known ones live in
/// [`perf_counters`](crate::token::perf_counters). Unknown counters read as
/// zero.
#[derive(Debug, Default)]
pub struct PerfLog {
    counters: RwLock<HashMap<Token, u64>>,
}

impl PerfLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to `counter`.
    pub fn increment(&self, counter: &Token) {
        self.add(counter, 1);
    }

    /// Adds `amount` to `counter`.
    pub fn add(&self, counter: &Token, amount: u64) {
        if amount == 0 {
            return;
        }
        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        *counters.entry(counter.clone()).or_insert(0) += amount;
    }

    /// Current value of `counter`.
    pub fn get(&self, counter: &Token) -> u64 {
        self.counters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(counter)
            .copied()
            .unwrap_or(0)
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.counters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Ordered copy of all counters, suitable for serialization.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.as_str().to_owned(), *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::perf_counters;
    use std::sync::Arc;

    #[test]
    fn test_counters_accumulate() {
        let log = PerfLog::new();
        log.increment(&perf_counters::RPRIMS_SYNCED);
        log.add(&perf_counters::RPRIMS_SYNCED, 4);
        assert_eq!(log.get(&perf_counters::RPRIMS_SYNCED), 5);
        assert_eq!(log.get(&perf_counters::TASK_FAILURES), 0);
    }

    #[test]
    fn test_snapshot_serializes_in_order() {
        let log = PerfLog::new();
        log.increment(&Token::new("b"));
        log.increment(&Token::new("a"));
        let json = serde_json::to_string(&log.snapshot()).unwrap();
        assert_eq!(json, r#"{"a":1,"b":1}"#);
    }

    #[test]
    fn test_concurrent_increments() {
        let log = Arc::new(PerfLog::new());
        let counter = Token::new("hits");
        std::thread::scope(|s| {
            for _ in 0..4 {
                let log = &log;
                let counter = &counter;
                s.spawn(move || {
                    for _ in 0..100 {
                        log.increment(counter);
                    }
                });
            }
        });
        assert_eq!(log.get(&counter), 400);
        log.reset();
        assert_eq!(log.get(&counter), 0);
    }
}
