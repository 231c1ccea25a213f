// Copyright 2024 OctoFHIR Team
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

//! Variable bindings supplied by the caller

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::core::{ContextEntries, FeelValue};

/// Ordered variable bindings for one evaluation.
///
/// For unary tests the key `?` holds the value under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Context {
    entries: ContextEntries,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeelValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeelValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FeelValue> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> &ContextEntries {
        &self.entries
    }

    /// Value bound to `?`
    pub fn input(&self) -> Option<&FeelValue> {
        self.entries.get("?")
    }

    /// Build from a JSON object; any other JSON yields `None`
    pub fn from_json(json: &JsonValue) -> Option<Self> {
        match FeelValue::from_json(json) {
            FeelValue::Context(entries) => Some(Self { entries }),
            _ => None,
        }
    }

    /// Keys containing whitespace, which the parser must know to read them as one name
    pub fn multi_word_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|key| key.split_whitespace().nth(1).is_some())
    }
}

impl From<ContextEntries> for Context {
    fn from(entries: ContextEntries) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<FeelValue>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
