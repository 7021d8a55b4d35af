// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bidirectional enum name <-> value mapping.

use std::collections::HashMap;

/// Entries of an `Enum8`/`Enum16` declaration, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumValues {
    entries: Vec<(String, i16)>,
    by_name: HashMap<String, usize>,
    by_value: HashMap<i16, usize>,
}

impl EnumValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns `false` (and leaves the map unchanged) when the
    /// name or the value is already taken.
    pub fn insert(&mut self, name: impl Into<String>, value: i16) -> bool {
        let name = name.into();
        if self.by_name.contains_key(&name) || self.by_value.contains_key(&value) {
            return false;
        }
        let idx = self.entries.len();
        self.by_name.insert(name.clone(), idx);
        self.by_value.insert(value, idx);
        self.entries.push((name, value));
        true
    }

    pub fn value_of(&self, name: &str) -> Option<i16> {
        self.by_name.get(name).map(|&i| self.entries[i].1)
    }

    pub fn name_of(&self, value: i16) -> Option<&str> {
        self.by_value.get(&value).map(|&i| self.entries[i].0.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every value fits in a signed byte.
    pub fn fits_i8(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, v)| i8::try_from(*v).is_ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i16)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }
}
