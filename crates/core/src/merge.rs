// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive metadata merge.
//!
//! Stage metadata accumulates under one task document; each writer appends
//! a nested fragment. Objects merge recursively, every other value kind
//! (scalars and arrays) is overwritten by the most recent writer.

use serde_json::{Map, Value};

/// Merge `incoming` into `base`.
///
/// Nested objects merge key-by-key; scalar and array leaves take the
/// incoming value. Applying the same fragment twice is a no-op on the
/// second call.
pub fn deep_merge(base: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(addition)) => {
                deep_merge(existing, addition);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
