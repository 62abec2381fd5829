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

//! Execution of the export and register commands given on the command line.

use crate::agency::DepositOutcome;
use crate::driver::Driver;
use crate::driver::export::ExportedXml;
use crate::driver::select::select_objects;
use crate::messages::{OUTPUT_NOT_WRITABLE, UNKNOWN_OBJECTS, UNKNOWN_SERVER, translate};
use crate::model::ObjectType;
use log::{info, warn};
use pubexport_core::driver::{DriverError, DriverResult};
use std::path::{Path, PathBuf};

/// What to do with the selected objects.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CommandAction {
    /// Write the exported document to a file.
    Export(PathBuf),

    /// Deposit the exported document with the plugin's agency.
    Register,
}

/// A command as given on the command line, before any validation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CommandRequest {
    /// The action to run.
    pub(crate) action: CommandAction,

    /// Path of the server that owns the objects.
    pub(crate) server_path: String,

    /// Kind of the objects, either `preprints` or `galleys`.
    pub(crate) object_type: String,

    /// Raw identifiers of the objects.
    pub(crate) ids: Vec<String>,
}

/// Result of running a command, to be rendered by the caller.
#[derive(Debug, PartialEq)]
pub(crate) enum CommandOutcome {
    /// The command cannot run as given and only the usage text applies.
    Usage,

    /// A precondition failed with the given message.
    Error(String),

    /// The exported document is not well-formed and nothing else happened.
    Invalid(ExportedXml),

    /// The exported document was written to the given file.
    Exported(PathBuf),

    /// The exported document was handed to the agency with the given outcome.
    Deposited(DepositOutcome),
}

/// Returns the object type named `name` on the command line.
fn parse_object_type(name: &str) -> Option<ObjectType> {
    match name {
        "preprints" => Some(ObjectType::Submission),
        "galleys" => Some(ObjectType::Galley),
        _ => None,
    }
}

/// Returns true if `path` names a file that can be created or overwritten.
async fn is_writable(path: &Path) -> bool {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    match tokio::task::spawn_blocking(move || tempfile::tempfile_in(dir)).await {
        Ok(Ok(_)) => (),
        Ok(Err(_)) | Err(_) => return false,
    }

    match tokio::fs::metadata(path).await {
        Ok(_) => tokio::fs::OpenOptions::new().write(true).open(path).await.is_ok(),
        Err(_) => true,
    }
}

impl Driver {
    /// Runs the command `req` for `plugin`, resolving relative output paths against `cwd`.
    ///
    /// Problems with the command itself are reported as outcomes.  Errors are reserved for
    /// failures of the service.
    pub(crate) async fn execute_command(
        self,
        plugin: &str,
        req: CommandRequest,
        cwd: &Path,
    ) -> DriverResult<CommandOutcome> {
        let agency = self.agency(plugin)?;

        let server = {
            let mut ex = self.db.ex().await?;
            match self.server(&mut ex, &req.server_path).await {
                Ok(server) => server,
                Err(DriverError::NotFound(_)) if req.server_path.is_empty() => {
                    return Ok(CommandOutcome::Usage);
                }
                Err(DriverError::NotFound(_)) => {
                    let message = translate(UNKNOWN_SERVER, Some(&req.server_path));
                    return Ok(CommandOutcome::Error(message));
                }
                Err(e) => return Err(e),
            }
        };

        let output = match &req.action {
            CommandAction::Export(output) => {
                let output = cwd.join(output);
                if !is_writable(&output).await {
                    let message = translate(OUTPUT_NOT_WRITABLE, Some(&output.to_string_lossy()));
                    return Ok(CommandOutcome::Error(message));
                }
                Some(output)
            }
            CommandAction::Register => None,
        };

        let object_type = match parse_object_type(&req.object_type) {
            Some(object_type) => object_type,
            None => return Ok(CommandOutcome::Usage),
        };

        let ids = req.ids.iter().filter_map(|id| id.parse::<i64>().ok()).collect::<Vec<i64>>();
        let objects = {
            let mut ex = self.db.ex().await?;
            select_objects(&mut ex, *server.id(), object_type, &ids).await?
        };
        if objects.is_empty() {
            return Ok(CommandOutcome::Error(translate(UNKNOWN_OBJECTS, None)));
        }

        if Driver::filter_group(agency.as_ref(), &objects).is_err() {
            warn!("Plugin {} cannot export {}", plugin, objects.file_part());
            return Ok(CommandOutcome::Usage);
        }

        let (deployment, file_name, exported) =
            self.export_for_action(&server, agency.as_ref(), &objects, true).await?;
        if !exported.is_valid() {
            return Ok(CommandOutcome::Invalid(exported));
        }

        match output {
            Some(output) => {
                tokio::fs::write(&output, &exported.xml).await.map_err(|e| {
                    DriverError::BackendError(format!("Cannot write {}: {}", output.display(), e))
                })?;
                info!("Exported {} {} to {}", objects.len(), objects.file_part(), output.display());
                Ok(CommandOutcome::Exported(output))
            }
            None => {
                let outcome = self
                    .deposit_xml(agency.as_ref(), &objects, &deployment, &file_name, &exported.xml)
                    .await?;
                Ok(CommandOutcome::Deposited(outcome))
            }
        }
    }
}
