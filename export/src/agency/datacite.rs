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

//! Registration agency backed by the DataCite metadata store (MDS) API.
//!
//! DataCite accepts one resource per request, so batches are split and every object goes through
//! two calls: one to upload its metadata and another to mint its DOI pointing to its public URL.

use crate::agency::{DepositError, DepositOutcome, RegistrationAgency, SettingsField};
use crate::filter::{
    DataciteFilter, ExportDeployment, ExportFilter, GALLEY_DATACITE, PREPRINT_DATACITE,
};
use crate::messages::EXPORT_NO_DOI;
use crate::model::settings::{PASSWORD, TEST_MODE, USERNAME};
use crate::model::{ExportObjects, PluginSettings};
use async_trait::async_trait;
use derivative::Derivative;
use log::{info, warn};
use pubexport_core::env::get_optional_var;
use reqwest::{Client, StatusCode};
use std::path::Path;
use url::Url;

/// Default production MDS endpoint.
const DEFAULT_API_URL: &str = "https://mds.datacite.org/";

/// Default test MDS endpoint.
const DEFAULT_TEST_API_URL: &str = "https://mds.test.datacite.org/";

/// Settings understood by the DataCite agency.
const FIELDS: &[SettingsField] = &[
    SettingsField { name: USERNAME, required: true },
    SettingsField { name: PASSWORD, required: true },
    SettingsField { name: TEST_MODE, required: false },
];

/// Options to configure a `DataciteAgency`.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct DataciteOptions {
    /// Base URL of the production MDS API.
    pub api_url: Url,

    /// Base URL of the MDS API used while the plugin is in test mode.
    pub test_api_url: Url,
}

impl Default for DataciteOptions {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("Default URL must be valid"),
            test_api_url: Url::parse(DEFAULT_TEST_API_URL).expect("Default URL must be valid"),
        }
    }
}

impl DataciteOptions {
    /// Creates a set of options from environment variables whose name is prefixed with the given
    /// `prefix`.
    ///
    /// This will use variables such as `<prefix>_API_URL` and `<prefix>_TEST_API_URL`, all of
    /// which are optional.
    ///
    /// The URLs are treated as directories so that API paths are appended to them.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            api_url: as_directory(
                get_optional_var::<Url>(prefix, "API_URL")?.unwrap_or(defaults.api_url),
            ),
            test_api_url: as_directory(
                get_optional_var::<Url>(prefix, "TEST_API_URL")?.unwrap_or(defaults.test_api_url),
            ),
        })
    }
}

/// Makes sure that the path of `url` ends in a slash so that joining paths to it appends to it.
fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// A single object ready to be sent to DataCite.
struct Resource {
    /// DOI of the object.
    doi: String,

    /// Public URL the DOI should resolve to.
    url: Url,

    /// Metadata document of the object.
    xml: String,
}

/// Agency that registers DOIs with DataCite.
#[derive(Clone)]
pub struct DataciteAgency {
    /// Configuration of the agency.
    opts: DataciteOptions,

    /// Asynchronous HTTP client with which to issue the deposits.
    client: Client,
}

impl DataciteAgency {
    /// Creates a new DataCite agency using `opts` for configuration.
    pub fn new(opts: DataciteOptions) -> Self {
        Self { opts, client: Client::default() }
    }

    /// Computes the resource to deposit for the single-object batch `object`.
    ///
    /// Returns the error to report if the object cannot be deposited.
    fn prepare(
        &self,
        object: &ExportObjects,
        deployment: &ExportDeployment,
    ) -> Result<Resource, DepositError> {
        let (doi, label, url, filter) = match object {
            ExportObjects::Preprints(preprints) if preprints.len() == 1 => {
                let p = &preprints[0];
                (
                    p.publication().doi().clone(),
                    p.publication().title().clone(),
                    deployment.landing_url(p.submission()),
                    DataciteFilter::for_preprints(),
                )
            }
            ExportObjects::Galleys(galleys) if galleys.len() == 1 => {
                let g = &galleys[0];
                (
                    g.galley().doi().clone(),
                    g.galley().label().clone(),
                    deployment.galley_url(g.submission(), g.galley()),
                    DataciteFilter::for_galleys(),
                )
            }
            _ => {
                return Err(DepositError::http(0, "Cannot deposit more than one object at once"));
            }
        };

        let doi = match doi {
            Some(doi) if !doi.is_empty() => doi,
            _ => return Err(DepositError::new(EXPORT_NO_DOI, Some(label))),
        };
        let xml = filter
            .export(object, deployment)
            .map_err(|e| DepositError::http(0, &e.to_string()))?;
        Ok(Resource { doi, url, xml })
    }

    /// Sends `resource` to DataCite with the credentials in `settings`.
    ///
    /// Returns `None` if DataCite accepted the resource or the error it reported otherwise.
    async fn send(
        &self,
        settings: &PluginSettings,
        resource: Resource,
    ) -> Result<Option<DepositError>, reqwest::Error> {
        let base =
            if settings.is_test_mode() { &self.opts.test_api_url } else { &self.opts.api_url };
        let username = settings.get(USERNAME).unwrap_or_default();
        let password = settings.get(PASSWORD);

        let metadata_url = match base.join("metadata") {
            Ok(url) => url,
            Err(e) => return Ok(Some(DepositError::http(0, &e.to_string()))),
        };
        let response = self
            .client
            .post(metadata_url)
            .basic_auth(username, password)
            .header(reqwest::header::CONTENT_TYPE, "application/xml;charset=UTF-8")
            .body(resource.xml)
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await?;
            warn!("DataCite rejected metadata for {} with status {}", resource.doi, status);
            return Ok(Some(DepositError::http(status.as_u16(), &body)));
        }

        let doi_url = match base.join(&format!("doi/{}", resource.doi)) {
            Ok(url) => url,
            Err(e) => return Ok(Some(DepositError::http(0, &e.to_string()))),
        };
        let response = self
            .client
            .put(doi_url)
            .basic_auth(username, password)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(format!("doi={}\nurl={}", resource.doi, resource.url))
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await?;
            warn!("DataCite rejected DOI {} with status {}", resource.doi, status);
            return Ok(Some(DepositError::http(status.as_u16(), &body)));
        }

        info!("DataCite registered DOI {}", resource.doi);
        Ok(None)
    }
}

#[async_trait]
impl RegistrationAgency for DataciteAgency {
    fn plugin_name(&self) -> &'static str {
        "datacite"
    }

    fn settings_prefix(&self) -> &'static str {
        "datacite"
    }

    fn display_name(&self) -> &'static str {
        "DataCite Export/Registration"
    }

    fn submission_filter(&self) -> &'static str {
        PREPRINT_DATACITE
    }

    fn representation_filter(&self) -> Option<&'static str> {
        Some(GALLEY_DATACITE)
    }

    fn settings_fields(&self) -> &'static [SettingsField] {
        FIELDS
    }

    async fn deposit(
        &self,
        objects: &ExportObjects,
        deployment: &ExportDeployment,
        _xml_file: &Path,
    ) -> DepositOutcome {
        let mut registered = vec![];
        let mut errors = vec![];
        for object in objects.singles() {
            let resource = match self.prepare(&object, deployment) {
                Ok(resource) => resource,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            match self.send(deployment.settings(), resource).await {
                Ok(None) => registered.extend(object.refs()),
                Ok(Some(e)) => errors.push(e),
                Err(e) if registered.is_empty() => {
                    return DepositOutcome::Failed(format!("DataCite request failed: {}", e));
                }
                Err(e) => {
                    warn!("DataCite request failed after {} deposits: {}", registered.len(), e);
                    errors.push(DepositError::opaque());
                    break;
                }
            }
        }

        match (registered.is_empty(), errors.is_empty()) {
            (_, true) => DepositOutcome::Registered,
            (true, false) => DepositOutcome::Errors(errors),
            (false, false) => DepositOutcome::Partial { registered, errors },
        }
    }
}
