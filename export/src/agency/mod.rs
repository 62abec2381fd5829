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

//! Registration agencies that accept metadata deposits.

use crate::filter::ExportDeployment;
use crate::messages::REGISTER_MDS_ERROR;
use crate::model::{ExportObjects, ObjectType, PluginSettings};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

mod crossref;
pub use crossref::{CrossrefAgency, CrossrefOptions};
mod datacite;
pub use datacite::{DataciteAgency, DataciteOptions};
#[cfg(test)]
pub(crate) mod testutils;

/// A structured problem reported by an agency for a deposit.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DepositError {
    /// Message key that describes the problem.
    pub key: String,

    /// Parameter to substitute into the message, if any.
    pub param: Option<String>,
}

impl DepositError {
    /// Creates a new deposit error.
    pub fn new<K: Into<String>>(key: K, param: Option<String>) -> Self {
        Self { key: key.into(), param }
    }

    /// Creates the generic error reported for failures that are only worth logging.
    pub(crate) fn opaque() -> Self {
        Self::new(REGISTER_MDS_ERROR, Some(" - ".to_owned()))
    }

    /// Creates the generic error that wraps an unexpected HTTP response from an agency.
    pub(crate) fn http(status: u16, body: &str) -> Self {
        Self::new(REGISTER_MDS_ERROR, Some(format!("{} - {}", status, body.trim())))
    }
}

/// Result of depositing a batch of objects with an agency.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DepositOutcome {
    /// The agency accepted all objects.
    Registered,

    /// The agency rejected the deposit and explained why, in order.
    Errors(Vec<DepositError>),

    /// The agency took objects one at a time and only accepted some of them.
    Partial {
        /// Type and identifier of the accepted objects, in order.
        registered: Vec<(ObjectType, i64)>,

        /// Problems found with the rest of the objects, in order.
        errors: Vec<DepositError>,
    },

    /// The deposit failed for reasons that are only worth logging.
    Failed(String),
}

/// Description of one of the settings an agency understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct SettingsField {
    /// Name of the setting.
    pub name: &'static str,

    /// Whether the agency cannot operate without this setting.
    pub required: bool,
}

/// Operations of a registration agency.
///
/// Every agency is exposed as a plugin that owns its settings and a status setting on every
/// object it deposits.
#[async_trait]
pub trait RegistrationAgency {
    /// Returns the name of the plugin, used in URLs and on the command line.
    fn plugin_name(&self) -> &'static str;

    /// Returns the namespace of the object settings owned by this agency.
    fn settings_prefix(&self) -> &'static str;

    /// Returns the human-readable name of the agency.
    fn display_name(&self) -> &'static str;

    /// Returns the group of the filter that converts preprints for this agency.
    fn submission_filter(&self) -> &'static str;

    /// Returns the group of the filter that converts galleys for this agency, if it deposits them.
    fn representation_filter(&self) -> Option<&'static str>;

    /// Returns the settings this agency understands.
    fn settings_fields(&self) -> &'static [SettingsField];

    /// Checks that `settings` are acceptable for this agency.
    fn validate_settings(&self, settings: &PluginSettings) -> Result<(), String> {
        for field in self.settings_fields() {
            if field.required && settings.get(field.name).is_none() {
                return Err(format!("Missing required setting {}", field.name));
            }
        }
        Ok(())
    }

    /// Returns true if all the settings marked as required are present and not empty.
    fn has_required_settings(&self, settings: &PluginSettings) -> bool {
        self.settings_fields().iter().all(|f| !f.required || settings.get(f.name).is_some())
    }

    /// Returns the name of the object setting that holds the deposit status.
    fn status_setting(&self) -> String {
        format!("{}::status", self.settings_prefix())
    }

    /// Deposits `objects`, already exported into `xml_file`, as configured by `deployment`.
    async fn deposit(
        &self,
        objects: &ExportObjects,
        deployment: &ExportDeployment,
        xml_file: &Path,
    ) -> DepositOutcome;
}

/// Collection of the agencies known to the service, looked up by plugin name.
#[derive(Clone, Default)]
pub struct AgencyRegistry {
    /// Registered agencies in registration order.
    agencies: Vec<Arc<dyn RegistrationAgency + Send + Sync>>,
}

impl AgencyRegistry {
    /// Adds `agency` to the registry.
    pub fn register(&mut self, agency: Arc<dyn RegistrationAgency + Send + Sync>) {
        self.agencies.push(agency);
    }

    /// Returns the agency whose plugin name is `name`, if any.
    pub fn find(&self, name: &str) -> Option<Arc<dyn RegistrationAgency + Send + Sync>> {
        self.agencies.iter().find(|a| a.plugin_name() == name).cloned()
    }

    /// Returns the plugin names of all registered agencies.
    pub fn names(&self) -> Vec<&'static str> {
        self.agencies.iter().map(|a| a.plugin_name()).collect()
    }
}
