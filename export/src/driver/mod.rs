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

//! Business logic for the export and deposit service.

use crate::agency::{AgencyRegistry, RegistrationAgency};
use crate::db;
use crate::filter::{ExportDeployment, FilterRegistry};
use crate::model::{ExportObjects, Server};
use pubexport_core::clocks::Clock;
use pubexport_core::db::{Db, DbError, Executor};
use pubexport_core::driver::{DriverError, DriverResult};
use pubexport_core::env::get_optional_var;
use pubexport_core::rest::BaseUrls;
use std::path::PathBuf;
use std::sync::Arc;

mod actions;
pub(crate) use actions::{ActionOutcome, ActionRequest};
mod command;
pub(crate) use command::{CommandAction, CommandOutcome, CommandRequest};
mod deposit;
mod export;
pub(crate) use export::{ExportedXml, export_file_name};
mod notifier;
pub use notifier::{DbNotifier, Notifier};
mod preprint;
pub(crate) use preprint::{GalleyDownload, Landing, LandingPage};
mod publication;
pub use publication::{PreprintObserver, PublicationObserver};
mod select;
mod settings;
pub(crate) use settings::{ConfigurationError, PluginIndex};
mod status;
pub(crate) use status::SubmissionStatus;
#[cfg(test)]
pub(crate) mod testutils;

/// Configuration options for the driver.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ExportOptions {
    /// Directory in which to create the temporary files that hold exported documents.
    pub export_path: PathBuf,

    /// Directory that holds the stored submission files.
    pub files_path: PathBuf,
}

impl ExportOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_EXPORT_PATH`, which defaults to the system's
    /// temporary directory, and `<prefix>_FILES_PATH`, which defaults to `files`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            export_path: get_optional_var::<PathBuf>(prefix, "EXPORT_PATH")?
                .unwrap_or_else(std::env::temp_dir),
            files_path: get_optional_var::<PathBuf>(prefix, "FILES_PATH")?
                .unwrap_or_else(|| PathBuf::from("files")),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Filters that convert objects into XML documents.
    filters: Arc<FilterRegistry>,

    /// Registration agencies exposed as plugins.
    agencies: Arc<AgencyRegistry>,

    /// Sink for the messages addressed to users.
    notifier: Arc<dyn Notifier + Send + Sync>,

    /// Observer of the publication lifecycle.
    observer: Arc<dyn PublicationObserver + Send + Sync>,

    /// Base URLs of the running service.
    base_urls: Arc<BaseUrls>,

    /// Options for the driver.
    opts: Arc<ExportOptions>,
}

impl Driver {
    /// Creates a new driver backed by the given dependencies.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        filters: FilterRegistry,
        agencies: AgencyRegistry,
        notifier: Arc<dyn Notifier + Send + Sync>,
        observer: Arc<dyn PublicationObserver + Send + Sync>,
        base_urls: Arc<BaseUrls>,
        opts: ExportOptions,
    ) -> Self {
        Self {
            db,
            clock,
            filters: Arc::from(filters),
            agencies: Arc::from(agencies),
            notifier,
            observer,
            base_urls,
            opts: Arc::from(opts),
        }
    }

    /// Returns the agency registered as plugin `name`.
    pub(crate) fn agency(
        &self,
        name: &str,
    ) -> DriverResult<Arc<dyn RegistrationAgency + Send + Sync>> {
        match self.agencies.find(name) {
            Some(agency) => Ok(agency),
            None => Err(DriverError::NotFound(format!("Unknown plugin {}", name))),
        }
    }

    /// Returns the server whose path is `path`.
    pub(crate) async fn server(&self, ex: &mut Executor, path: &str) -> DriverResult<Server> {
        match db::get_server_by_path(ex, path).await {
            Ok(server) => Ok(server),
            Err(DbError::NotFound) => {
                Err(DriverError::NotFound(format!("Unknown server {}", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Builds the deployment with which to run filters for `agency` within `server`.
    pub(crate) async fn deployment(
        &self,
        ex: &mut Executor,
        server: Server,
        agency: &(dyn RegistrationAgency + Send + Sync),
        no_validation: bool,
    ) -> DriverResult<ExportDeployment> {
        let settings = db::get_plugin_settings(ex, *server.id(), agency.plugin_name()).await?;
        Ok(ExportDeployment::new(
            server,
            agency.plugin_name(),
            settings,
            self.base_urls.clone(),
            self.clock.now_utc(),
            no_validation,
        ))
    }

    /// Returns the filter group that `agency` uses to convert `objects`.
    ///
    /// An agency that cannot deposit galleys has no filter for them, which is a problem with the
    /// configuration of the service and not with the request.
    pub(crate) fn filter_group(
        agency: &(dyn RegistrationAgency + Send + Sync),
        objects: &ExportObjects,
    ) -> DriverResult<&'static str> {
        match objects {
            ExportObjects::Preprints(_) => Ok(agency.submission_filter()),
            ExportObjects::Galleys(_) => agency.representation_filter().ok_or_else(|| {
                DriverError::Misconfigured(format!(
                    "Plugin {} has no filter for galleys",
                    agency.plugin_name()
                ))
            }),
        }
    }
}
