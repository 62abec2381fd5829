// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Per-server plugin settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the setting that holds the registration agency account name.
pub const USERNAME: &str = "username";

/// Name of the setting that holds the registration agency account password.
pub const PASSWORD: &str = "password";

/// Name of the setting that directs deposits to the agency's test endpoint.
pub const TEST_MODE: &str = "testMode";

/// Key/value settings of one plugin within one server.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PluginSettings(BTreeMap<String, String>);

impl PluginSettings {
    /// Returns the value of setting `name`, treating empty values as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(value) if !value.trim().is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// Sets setting `name` to `value`.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.0.insert(name.into(), value.into());
    }

    /// Iterates over all settings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if both the agency account name and password are configured.
    pub fn has_credentials(&self) -> bool {
        self.get(USERNAME).is_some() && self.get(PASSWORD).is_some()
    }

    /// Returns true if the flag setting `name` is enabled.
    pub fn get_bool(&self, name: &str) -> bool {
        matches!(self.get(name), Some("1") | Some("true") | Some("on"))
    }

    /// Returns true if deposits should go to the agency's test endpoint.
    pub fn is_test_mode(&self) -> bool {
        self.get_bool(TEST_MODE)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PluginSettings {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
