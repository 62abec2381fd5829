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

//! Per-server plugin settings and the plugin index page.

use crate::agency::{RegistrationAgency, SettingsField};
use crate::db;
use crate::driver::Driver;
use crate::messages::{SETTINGS_ERROR, translate};
use crate::model::{DepositStatus, ExportAction, PluginSettings};
use log::info;
use pubexport_core::driver::{DriverError, DriverResult};
use serde::Serialize;

/// Problems that prevent a plugin from working within a server.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum ConfigurationError {
    /// Some of the settings the plugin requires are missing or empty.
    Settings,
}

impl ConfigurationError {
    /// Returns the key of the message that describes this problem.
    pub(crate) fn message_key(self) -> &'static str {
        match self {
            ConfigurationError::Settings => SETTINGS_ERROR,
        }
    }
}

/// An action offered by a plugin together with its display name.
#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct ActionEntry {
    /// The action.
    pub(crate) action: ExportAction,

    /// Display name of the action.
    pub(crate) name: String,
}

/// A deposit status together with its display name.
#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct StatusEntry {
    /// The status.
    pub(crate) status: DepositStatus,

    /// Display name of the status.
    pub(crate) name: String,
}

/// Everything needed to render the page of a plugin within a server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PluginIndex {
    /// Name of the plugin.
    pub(crate) plugin: &'static str,

    /// Human-readable name of the plugin.
    pub(crate) display_name: &'static str,

    /// Actions that can be requested on the selected objects, in display order.
    pub(crate) actions: Vec<ActionEntry>,

    /// Statuses by which submissions can be filtered.
    pub(crate) statuses: Vec<StatusEntry>,

    /// Problems that prevent the plugin from working.
    pub(crate) configuration_errors: Vec<ConfigurationError>,

    /// Display messages for `configuration_errors`, in the same order.
    pub(crate) configuration_messages: Vec<String>,

    /// Settings understood by the plugin.
    pub(crate) settings_fields: &'static [SettingsField],
}

/// Computes the actions that a plugin configured with `settings` can offer.
///
/// Deposits are only possible when the agency account is configured.
pub(crate) fn available_actions(settings: &PluginSettings) -> Vec<ExportAction> {
    let mut actions = Vec::with_capacity(3);
    if settings.has_credentials() {
        actions.push(ExportAction::Deposit);
    }
    actions.push(ExportAction::Export);
    actions.push(ExportAction::MarkRegistered);
    actions
}

/// Computes the problems that prevent `agency` from working with `settings`.
pub(crate) fn configuration_errors(
    agency: &(dyn RegistrationAgency + Send + Sync),
    settings: &PluginSettings,
) -> Vec<ConfigurationError> {
    let mut errors = vec![];
    if !agency.has_required_settings(settings) {
        errors.push(ConfigurationError::Settings);
    }
    errors
}

impl Driver {
    /// Gets the settings of `plugin` within `server_path`.
    pub(crate) async fn get_settings(
        self,
        server_path: &str,
        plugin: &str,
    ) -> DriverResult<PluginSettings> {
        let agency = self.agency(plugin)?;
        let mut ex = self.db.ex().await?;
        let server = self.server(&mut ex, server_path).await?;
        Ok(db::get_plugin_settings(&mut ex, *server.id(), agency.plugin_name()).await?)
    }

    /// Merges `updates` into the settings of `plugin` within `server_path` and returns the
    /// resulting settings.
    ///
    /// The update is rejected as a whole if it names settings the plugin does not understand or
    /// if the merged settings are not acceptable to the plugin.
    pub(crate) async fn update_settings(
        self,
        server_path: &str,
        plugin: &str,
        updates: PluginSettings,
    ) -> DriverResult<PluginSettings> {
        let agency = self.agency(plugin)?;
        for (name, _) in updates.iter() {
            if !agency.settings_fields().iter().any(|f| f.name == name) {
                return Err(DriverError::InvalidInput(format!(
                    "Unknown setting {} for plugin {}",
                    name, plugin
                )));
            }
        }

        let mut tx = self.db.begin().await?;
        let server = self.server(tx.ex(), server_path).await?;

        let mut settings = db::get_plugin_settings(tx.ex(), *server.id(), plugin).await?;
        for (name, value) in updates.iter() {
            settings.set(name, value);
        }
        agency.validate_settings(&settings).map_err(DriverError::InvalidInput)?;

        for (name, value) in updates.iter() {
            db::set_plugin_setting(tx.ex(), *server.id(), plugin, name, value).await?;
        }
        tx.commit().await?;

        info!("Updated settings of plugin {} in server {}", plugin, server_path);
        Ok(settings)
    }

    /// Gets the description of the page of `plugin` within `server_path`.
    pub(crate) async fn get_plugin_index(
        self,
        server_path: &str,
        plugin: &str,
    ) -> DriverResult<PluginIndex> {
        let agency = self.agency(plugin)?;
        let mut ex = self.db.ex().await?;
        let server = self.server(&mut ex, server_path).await?;
        let settings = db::get_plugin_settings(&mut ex, *server.id(), plugin).await?;

        let actions = available_actions(&settings)
            .into_iter()
            .map(|action| ActionEntry { action, name: translate(action.message_key(), None) })
            .collect();
        let statuses = DepositStatus::ALL
            .into_iter()
            .map(|status| StatusEntry { status, name: translate(status.message_key(), None) })
            .collect();

        let configuration_errors = configuration_errors(agency.as_ref(), &settings);
        let configuration_messages =
            configuration_errors.iter().map(|e| translate(e.message_key(), None)).collect();

        Ok(PluginIndex {
            plugin: agency.plugin_name(),
            display_name: agency.display_name(),
            actions,
            statuses,
            configuration_errors,
            configuration_messages,
            settings_fields: agency.settings_fields(),
        })
    }
}
