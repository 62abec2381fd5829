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

//! Test utilities for registration agencies.

use crate::agency::{DepositOutcome, RegistrationAgency, SettingsField};
use crate::filter::{ExportDeployment, GALLEY_NATIVE, PREPRINT_NATIVE};
use crate::model::{ExportObjects, ObjectType};
use async_trait::async_trait;
use futures::lock::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings understood by the mock agency.
const FIELDS: &[SettingsField] = &[
    SettingsField { name: "username", required: true },
    SettingsField { name: "password", required: true },
];

/// A deposit captured by `MockAgency`.
#[derive(Clone, Debug)]
pub(crate) struct RecordedDeposit {
    /// Type and identifier of the deposited objects.
    pub(crate) refs: Vec<(ObjectType, i64)>,

    /// Path to the file that held the XML during the deposit.
    pub(crate) path: PathBuf,

    /// Contents of the XML file at deposit time.
    pub(crate) xml: String,
}

/// Agency that records deposits and answers with a preconfigured outcome.
#[derive(Clone)]
pub(crate) struct MockAgency {
    /// Name of the plugin, which doubles as the settings prefix.
    name: &'static str,

    /// Group of the filter for preprints.
    submission_filter: &'static str,

    /// Group of the filter for galleys, if the agency deposits them.
    representation_filter: Option<&'static str>,

    /// Outcome to return from all deposits.
    outcome: Arc<Mutex<DepositOutcome>>,

    /// Storage for captured deposits.
    pub(crate) deposits: Arc<Mutex<Vec<RecordedDeposit>>>,
}

impl MockAgency {
    /// Creates a new mock agency that exports through the native filters and whose deposits
    /// succeed.
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            submission_filter: PREPRINT_NATIVE,
            representation_filter: Some(GALLEY_NATIVE),
            outcome: Arc::from(Mutex::from(DepositOutcome::Registered)),
            deposits: Arc::default(),
        }
    }

    /// Makes the agency convert preprints with the filter registered under `group`.
    pub(crate) fn with_submission_filter(mut self, group: &'static str) -> Self {
        self.submission_filter = group;
        self
    }

    /// Makes the agency claim that it cannot deposit galleys.
    pub(crate) fn without_representation_filter(mut self) -> Self {
        self.representation_filter = None;
        self
    }

    /// Makes future deposits return `outcome`.
    pub(crate) async fn set_outcome(&self, outcome: DepositOutcome) {
        *self.outcome.lock().await = outcome;
    }

    /// Returns all captured deposits.
    pub(crate) async fn take_deposits(&self) -> Vec<RecordedDeposit> {
        let mut deposits = self.deposits.lock().await;
        std::mem::take(&mut *deposits)
    }
}

#[async_trait]
impl RegistrationAgency for MockAgency {
    fn plugin_name(&self) -> &'static str {
        self.name
    }

    fn settings_prefix(&self) -> &'static str {
        self.name
    }

    fn display_name(&self) -> &'static str {
        "Mock agency"
    }

    fn submission_filter(&self) -> &'static str {
        self.submission_filter
    }

    fn representation_filter(&self) -> Option<&'static str> {
        self.representation_filter
    }

    fn settings_fields(&self) -> &'static [SettingsField] {
        FIELDS
    }

    async fn deposit(
        &self,
        objects: &ExportObjects,
        _deployment: &ExportDeployment,
        xml_file: &Path,
    ) -> DepositOutcome {
        let xml = tokio::fs::read_to_string(xml_file).await.unwrap();
        let mut deposits = self.deposits.lock().await;
        deposits.push(RecordedDeposit { refs: objects.refs(), path: xml_file.to_owned(), xml });
        self.outcome.lock().await.clone()
    }
}

/// Starts a background HTTP server that serves `app` on an ephemeral local port and returns its
/// base URL.
pub(crate) async fn spawn_server(app: axum::Router) -> url::Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    url::Url::parse(&format!("http://{}/", addr)).unwrap()
}
