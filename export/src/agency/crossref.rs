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

//! Registration agency backed by the Crossref deposit API.

use crate::agency::{DepositError, DepositOutcome, RegistrationAgency, SettingsField};
use crate::filter::{DEPOSITOR_EMAIL, DEPOSITOR_NAME, ExportDeployment, PREPRINT_CROSSREF};
use crate::model::settings::{PASSWORD, TEST_MODE, USERNAME};
use crate::model::{EmailAddress, ExportObjects, PluginSettings};
use async_trait::async_trait;
use derivative::Derivative;
use log::{info, warn};
use pubexport_core::env::get_optional_var;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use url::Url;

/// Default production deposit endpoint.
const DEFAULT_DEPOSIT_URL: &str = "https://doi.crossref.org/servlet/deposit";

/// Default test deposit endpoint.
const DEFAULT_TEST_DEPOSIT_URL: &str = "https://test.crossref.org/servlet/deposit";

/// Settings understood by the Crossref agency.
const FIELDS: &[SettingsField] = &[
    SettingsField { name: DEPOSITOR_NAME, required: true },
    SettingsField { name: DEPOSITOR_EMAIL, required: true },
    SettingsField { name: USERNAME, required: false },
    SettingsField { name: PASSWORD, required: false },
    SettingsField { name: TEST_MODE, required: false },
];

/// Options to configure a `CrossrefAgency`.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct CrossrefOptions {
    /// Endpoint that receives production deposits.
    pub deposit_url: Url,

    /// Endpoint that receives deposits while the plugin is in test mode.
    pub test_deposit_url: Url,
}

impl Default for CrossrefOptions {
    fn default() -> Self {
        Self {
            deposit_url: Url::parse(DEFAULT_DEPOSIT_URL).expect("Default URL must be valid"),
            test_deposit_url: Url::parse(DEFAULT_TEST_DEPOSIT_URL)
                .expect("Default URL must be valid"),
        }
    }
}

impl CrossrefOptions {
    /// Creates a set of options from environment variables whose name is prefixed with the given
    /// `prefix`.
    ///
    /// This will use variables such as `<prefix>_DEPOSIT_URL` and `<prefix>_TEST_DEPOSIT_URL`,
    /// all of which are optional.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            deposit_url: get_optional_var::<Url>(prefix, "DEPOSIT_URL")?
                .unwrap_or(defaults.deposit_url),
            test_deposit_url: get_optional_var::<Url>(prefix, "TEST_DEPOSIT_URL")?
                .unwrap_or(defaults.test_deposit_url),
        })
    }
}

/// Agency that deposits posted-content batches with Crossref.
#[derive(Clone)]
pub struct CrossrefAgency {
    /// Configuration of the agency.
    opts: CrossrefOptions,

    /// Asynchronous HTTP client with which to issue the deposits.
    client: Client,
}

impl CrossrefAgency {
    /// Creates a new Crossref agency using `opts` for configuration.
    pub fn new(opts: CrossrefOptions) -> Self {
        Self { opts, client: Client::default() }
    }

    /// Uploads `xml` under the file name `fname` with the credentials in `settings`.
    async fn upload(
        &self,
        settings: &PluginSettings,
        fname: String,
        xml: Vec<u8>,
    ) -> Result<DepositOutcome, reqwest::Error> {
        let url = if settings.is_test_mode() {
            self.opts.test_deposit_url.clone()
        } else {
            self.opts.deposit_url.clone()
        };

        let part = Part::bytes(xml).file_name(fname).mime_str("text/xml")?;
        let form = Form::new()
            .text("operation", "doMDUpload")
            .text("login_id", settings.get(USERNAME).unwrap_or_default().to_owned())
            .text("login_passwd", settings.get(PASSWORD).unwrap_or_default().to_owned())
            .part("fname", part);

        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status == StatusCode::OK {
            info!("Crossref accepted deposit: {}", body.trim());
            Ok(DepositOutcome::Registered)
        } else {
            warn!("Crossref rejected deposit with status {}", status);
            Ok(DepositOutcome::Errors(vec![DepositError::http(status.as_u16(), &body)]))
        }
    }
}

#[async_trait]
impl RegistrationAgency for CrossrefAgency {
    fn plugin_name(&self) -> &'static str {
        "crossref"
    }

    fn settings_prefix(&self) -> &'static str {
        "crossref"
    }

    fn display_name(&self) -> &'static str {
        "Crossref XML Preprint Export"
    }

    fn submission_filter(&self) -> &'static str {
        PREPRINT_CROSSREF
    }

    fn representation_filter(&self) -> Option<&'static str> {
        None
    }

    fn settings_fields(&self) -> &'static [SettingsField] {
        FIELDS
    }

    fn validate_settings(&self, settings: &PluginSettings) -> Result<(), String> {
        for field in FIELDS {
            if field.required && settings.get(field.name).is_none() {
                return Err(format!("Missing required setting {}", field.name));
            }
        }
        if let Some(email) = settings.get(DEPOSITOR_EMAIL) {
            EmailAddress::new(email)
                .map_err(|e| format!("Invalid setting {}: {}", DEPOSITOR_EMAIL, e))?;
        }
        Ok(())
    }

    async fn deposit(
        &self,
        _objects: &ExportObjects,
        deployment: &ExportDeployment,
        xml_file: &Path,
    ) -> DepositOutcome {
        let xml = match tokio::fs::read(xml_file).await {
            Ok(xml) => xml,
            Err(e) => {
                return DepositOutcome::Failed(format!(
                    "Cannot read {}: {}",
                    xml_file.display(),
                    e
                ));
            }
        };
        let fname = match xml_file.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => "deposit.xml".to_owned(),
        };

        match self.upload(deployment.settings(), fname, xml).await {
            Ok(outcome) => outcome,
            Err(e) => DepositOutcome::Failed(format!("Crossref request failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agency::testutils::spawn_server;
    use crate::filter::testutils::test_deployment;
    use crate::messages::REGISTER_MDS_ERROR;
    use axum::Router;
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::post;
    use futures::lock::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_crossref_options_from_env_defaults() {
        let overrides =
            [("CROSSREF_DEPOSIT_URL", None::<&str>), ("CROSSREF_TEST_DEPOSIT_URL", None)];
        temp_env::with_vars(overrides, || {
            assert_eq!(CrossrefOptions::default(), CrossrefOptions::from_env("CROSSREF").unwrap());
        });
    }

    #[test]
    fn test_crossref_options_from_env_all_present() {
        let overrides = [
            ("CROSSREF_DEPOSIT_URL", Some("http://localhost:1234/deposit")),
            ("CROSSREF_TEST_DEPOSIT_URL", Some("http://localhost:1234/test")),
        ];
        temp_env::with_vars(overrides, || {
            assert_eq!(
                CrossrefOptions {
                    deposit_url: Url::parse("http://localhost:1234/deposit").unwrap(),
                    test_deposit_url: Url::parse("http://localhost:1234/test").unwrap(),
                },
                CrossrefOptions::from_env("CROSSREF").unwrap()
            );
        });
    }

    #[test]
    fn test_crossref_options_from_env_bad_url() {
        temp_env::with_var("CROSSREF_DEPOSIT_URL", Some("not a url"), || {
            let err = CrossrefOptions::from_env("CROSSREF").unwrap_err();
            assert!(err.contains("CROSSREF_DEPOSIT_URL"));
        });
    }

    #[test]
    fn test_validate_settings() {
        let agency = CrossrefAgency::new(CrossrefOptions::default());

        let mut settings = PluginSettings::default();
        settings.set(DEPOSITOR_NAME, "Editor");
        assert_eq!(
            Err("Missing required setting depositorEmail".to_owned()),
            agency.validate_settings(&settings)
        );
        assert!(!agency.has_required_settings(&settings));

        settings.set(DEPOSITOR_EMAIL, "not-an-email");
        assert!(agency.validate_settings(&settings).unwrap_err().contains("depositorEmail"));

        settings.set(DEPOSITOR_EMAIL, "editor@example.com");
        assert_eq!(Ok(()), agency.validate_settings(&settings));
        assert!(agency.has_required_settings(&settings));
    }

    /// Starts a fake Crossref endpoint that answers with `status` and records request bodies.
    async fn fake_crossref(status: HttpStatus) -> (Url, Arc<Mutex<Vec<String>>>) {
        let bodies = Arc::from(Mutex::from(vec![]));
        let app = {
            let bodies = bodies.clone();
            Router::new().route(
                "/deposit",
                post(move |body: String| {
                    let bodies = bodies.clone();
                    async move {
                        bodies.lock().await.push(body);
                        (status, "Server says hi")
                    }
                }),
            )
        };
        let base = spawn_server(app).await;
        (base.join("deposit").unwrap(), bodies)
    }

    /// Writes `xml` to a temporary file and returns its handle.
    fn write_xml(xml: &str) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        std::fs::write(file.path(), xml).unwrap();
        file
    }

    fn deployment() -> ExportDeployment {
        let settings = [(USERNAME, "the-user"), (PASSWORD, "the-pass"), (TEST_MODE, "1")];
        test_deployment(settings.into_iter().collect())
    }

    #[tokio::test]
    async fn test_deposit_ok() {
        let (url, bodies) = fake_crossref(HttpStatus::OK).await;
        let agency = CrossrefAgency::new(CrossrefOptions {
            deposit_url: Url::parse("http://invalid.test/").unwrap(),
            test_deposit_url: url,
        });
        let file = write_xml("<doi_batch/>");

        let outcome =
            agency.deposit(&ExportObjects::Preprints(vec![]), &deployment(), file.path()).await;
        assert_eq!(DepositOutcome::Registered, outcome);

        let bodies = bodies.lock().await;
        assert_eq!(1, bodies.len());
        assert!(bodies[0].contains("doMDUpload"));
        assert!(bodies[0].contains("the-user"));
        assert!(bodies[0].contains("the-pass"));
        assert!(bodies[0].contains("<doi_batch/>"));
    }

    #[tokio::test]
    async fn test_deposit_http_error() {
        let (url, _bodies) = fake_crossref(HttpStatus::FORBIDDEN).await;
        let agency = CrossrefAgency::new(CrossrefOptions {
            deposit_url: Url::parse("http://invalid.test/").unwrap(),
            test_deposit_url: url,
        });
        let file = write_xml("<doi_batch/>");

        let outcome =
            agency.deposit(&ExportObjects::Preprints(vec![]), &deployment(), file.path()).await;
        assert_eq!(
            DepositOutcome::Errors(vec![DepositError::new(
                REGISTER_MDS_ERROR,
                Some("403 - Server says hi".to_owned())
            )]),
            outcome
        );
    }

    #[tokio::test]
    async fn test_deposit_missing_file() {
        let agency = CrossrefAgency::new(CrossrefOptions::default());
        let dir = tempfile::tempdir().unwrap();
        match agency
            .deposit(&ExportObjects::Preprints(vec![]), &deployment(), &dir.path().join("none.xml"))
            .await
        {
            DepositOutcome::Failed(msg) => assert!(msg.contains("none.xml")),
            outcome => panic!("Unexpected outcome {:?}", outcome),
        }
    }
}
