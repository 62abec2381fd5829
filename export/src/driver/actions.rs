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

//! Dispatch of the export, deposit and mark-registered actions requested on a plugin.

use crate::agency::RegistrationAgency;
use crate::driver::Driver;
use crate::driver::export::{ExportedXml, export_file_name};
use crate::driver::select::select_objects;
use crate::filter::ExportDeployment;
use crate::messages::{NO_OBJECTS_SELECTED, translate};
use crate::model::{ExportObjects, ObjectType, Server, UserId};
use log::info;
use pubexport_core::driver::{DriverError, DriverResult};
use serde::Deserialize;
use url::Url;

/// Contents of a request to act on a selection of objects.
///
/// The three action flags are mutually exclusive in spirit.  When more than one is set, the
/// first one in the order `export`, `deposit`, `markRegistered` wins.
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ActionRequest {
    /// Requests a download of the exported document.
    pub(crate) export: bool,

    /// Requests a deposit with the plugin's agency.
    pub(crate) deposit: bool,

    /// Requests marking the objects as registered without contacting the agency.
    pub(crate) mark_registered: bool,

    /// Identifiers of the selected submissions.
    pub(crate) selected_submissions: Vec<i64>,

    /// Identifiers of the selected galleys, only considered without selected submissions.
    pub(crate) selected_representations: Vec<i64>,

    /// Section of the plugin page to return to after the action.
    pub(crate) tab: Option<String>,

    /// Whether to validate the exported document.
    pub(crate) validation: bool,
}

/// Result of a successfully dispatched action.
#[derive(Debug, PartialEq)]
pub(crate) enum ActionOutcome {
    /// The exported document, to be returned as an attachment.
    Download {
        /// Name under which to offer the document.
        file_name: String,

        /// Contents of the document.
        xml: Vec<u8>,
    },

    /// The exported document is not well-formed.
    Invalid(ExportedXml),

    /// The action completed and the user should go back to the plugin page.
    Redirect(Url),
}

impl Driver {
    /// Returns the frontend URL of the page of `plugin` within `server`, positioned at `tab`.
    fn plugin_page(&self, server: &Server, plugin: &str, tab: Option<&str>) -> Url {
        let mut url =
            self.base_urls.make_frontend_url(&format!("{}/plugins/{}", server.path(), plugin));
        url.set_fragment(tab);
        url
    }

    /// Resolves the objects selected by `req` within `server`.
    async fn select_requested(
        &self,
        server: &Server,
        req: &ActionRequest,
    ) -> DriverResult<ExportObjects> {
        let (object_type, ids) = if !req.selected_submissions.is_empty() {
            (ObjectType::Submission, &req.selected_submissions)
        } else if !req.selected_representations.is_empty() {
            (ObjectType::Galley, &req.selected_representations)
        } else {
            return Err(DriverError::InvalidInput(translate(NO_OBJECTS_SELECTED, None)));
        };

        let mut ex = self.db.ex().await?;
        let objects = select_objects(&mut ex, *server.id(), object_type, ids).await?;
        if objects.is_empty() {
            return Err(DriverError::InvalidInput(translate(NO_OBJECTS_SELECTED, None)));
        }
        Ok(objects)
    }

    /// Exports `objects` for `agency` and computes the name of the resulting document.
    pub(super) async fn export_for_action(
        &self,
        server: &Server,
        agency: &(dyn RegistrationAgency + Send + Sync),
        objects: &ExportObjects,
        validation: bool,
    ) -> DriverResult<(ExportDeployment, String, ExportedXml)> {
        let deployment = {
            let mut ex = self.db.ex().await?;
            self.deployment(&mut ex, server.clone(), agency, !validation).await?
        };
        let exported = self.export_objects(agency, objects, &deployment)?;
        let file_name = export_file_name(
            agency.plugin_name(),
            *deployment.export_time(),
            objects,
            *server.id(),
        )?;
        Ok((deployment, file_name, exported))
    }

    /// Executes the action described by `req` on the objects of `server_path` on behalf of
    /// `user`, as configured for `plugin`.
    ///
    /// `user` is only necessary for deposits, which report their outcome as notifications.
    pub(crate) async fn execute_action(
        self,
        server_path: &str,
        plugin: &str,
        user: Option<UserId>,
        req: ActionRequest,
    ) -> DriverResult<ActionOutcome> {
        let server = {
            let mut ex = self.db.ex().await?;
            self.server(&mut ex, server_path).await?
        };
        let agency = self.agency(plugin)?;
        let objects = self.select_requested(&server, &req).await?;

        if req.export {
            let (_deployment, file_name, exported) =
                self.export_for_action(&server, agency.as_ref(), &objects, req.validation).await?;
            if !exported.is_valid() {
                return Ok(ActionOutcome::Invalid(exported));
            }

            let file = self.write_temp_xml(&file_name, &exported.xml).await?;
            let xml = tokio::fs::read(file.path()).await.map_err(|e| {
                DriverError::BackendError(format!("Cannot read {}: {}", file.path().display(), e))
            })?;
            info!("Exported {} {} as {}", objects.len(), objects.file_part(), file_name);
            Ok(ActionOutcome::Download { file_name, xml })
        } else if req.deposit {
            let user = match user {
                Some(user) => user,
                None => {
                    return Err(DriverError::Unauthorized(
                        "Deposits require an identified user".to_owned(),
                    ));
                }
            };

            let (deployment, file_name, exported) =
                self.export_for_action(&server, agency.as_ref(), &objects, req.validation).await?;
            if !exported.is_valid() {
                return Ok(ActionOutcome::Invalid(exported));
            }

            let outcome = self
                .deposit_xml(agency.as_ref(), &objects, &deployment, &file_name, &exported.xml)
                .await?;
            self.notify_outcome(user, &outcome).await?;
            Ok(ActionOutcome::Redirect(self.plugin_page(&server, plugin, req.tab.as_deref())))
        } else if req.mark_registered {
            let url = self.plugin_page(&server, plugin, req.tab.as_deref());
            self.mark_registered(agency.as_ref(), &objects).await?;
            Ok(ActionOutcome::Redirect(url))
        } else {
            Err(DriverError::NotFound("No action requested".to_owned()))
        }
    }
}
