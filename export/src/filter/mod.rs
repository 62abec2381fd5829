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

//! Transformation of exportable objects into XML documents.
//!
//! Filters are registered under a group name of the form `<input>=><output>`, such as
//! `preprint=>crossref-xml`, and every export looks up exactly one filter by its group.  Filters
//! are pure: they receive the fully-resolved objects plus an `ExportDeployment` that describes the
//! server and plugin they export for, and they never touch the database.

use crate::model::{ExportObjects, Galley, PluginSettings, Server, Submission};
use derive_getters::Getters;
use pubexport_core::driver::{DriverError, DriverResult};
use pubexport_core::rest::BaseUrls;
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

mod crossref;
pub(crate) use crossref::{CrossrefFilter, DEPOSITOR_EMAIL, DEPOSITOR_NAME};
mod datacite;
pub(crate) use datacite::DataciteFilter;
mod native;
pub(crate) use native::{NativeGalleyFilter, NativePreprintFilter};
mod validate;
pub use validate::{Severity, XmlDiagnostic, validate_xml};
mod writer;
pub(crate) use writer::XmlBuilder;

/// Group of the filter that converts preprints to the native XML format.
pub const PREPRINT_NATIVE: &str = "preprint=>native-xml";

/// Group of the filter that converts galleys to the native XML format.
pub const GALLEY_NATIVE: &str = "preprint-galley=>native-xml";

/// Group of the filter that converts preprints to Crossref posted-content deposits.
pub const PREPRINT_CROSSREF: &str = "preprint=>crossref-xml";

/// Group of the filter that converts preprints to DataCite resources.
pub const PREPRINT_DATACITE: &str = "preprint=>datacite-xml";

/// Group of the filter that converts galleys to DataCite resources.
pub const GALLEY_DATACITE: &str = "preprint-galley=>datacite-xml";

/// Errors raised while running a filter.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// The objects lack data that the output format requires.
    #[error("{0}")]
    MissingData(String),

    /// The filter was handed objects of a kind it does not know how to convert.
    #[error("Filter {0} cannot export {1}")]
    UnsupportedObjects(&'static str, &'static str),

    /// The XML writer failed.
    #[error("Cannot write XML: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for FilterError {
    fn from(e: quick_xml::Error) -> Self {
        FilterError::Xml(e.to_string())
    }
}

impl From<FilterError> for DriverError {
    fn from(e: FilterError) -> Self {
        match e {
            FilterError::MissingData(_) => DriverError::InvalidInput(e.to_string()),
            FilterError::UnsupportedObjects(_, _) => DriverError::Misconfigured(e.to_string()),
            FilterError::Xml(_) => DriverError::BackendError(e.to_string()),
        }
    }
}

/// Result type for this module.
pub type FilterResult<T> = Result<T, FilterError>;

/// Per-invocation configuration handed to a filter to parameterize its output.
#[derive(Clone, Getters)]
pub struct ExportDeployment {
    /// Server whose objects are being exported.
    server: Server,

    /// Name of the plugin on whose behalf the export happens.
    plugin: String,

    /// Settings of the plugin within the server.
    settings: PluginSettings,

    /// Base URLs used to compute public links to the exported objects.
    base_urls: Arc<BaseUrls>,

    /// Time at which the export started.
    export_time: OffsetDateTime,

    /// Whether the produced document skips well-formedness validation.
    no_validation: bool,
}

impl ExportDeployment {
    /// Creates a new deployment.
    pub fn new<P: Into<String>>(
        server: Server,
        plugin: P,
        settings: PluginSettings,
        base_urls: Arc<BaseUrls>,
        export_time: OffsetDateTime,
        no_validation: bool,
    ) -> Self {
        Self { server, plugin: plugin.into(), settings, base_urls, export_time, no_validation }
    }

    /// Returns the public landing page URL of `submission`.
    pub fn landing_url(&self, submission: &Submission) -> Url {
        self.base_urls.make_frontend_url(&format!(
            "{}/preprint/view/{}",
            self.server.path(),
            submission.best_id()
        ))
    }

    /// Returns the public URL of `galley`, which belongs to `submission`.
    pub fn galley_url(&self, submission: &Submission, galley: &Galley) -> Url {
        self.base_urls.make_frontend_url(&format!(
            "{}/preprint/view/{}/{}",
            self.server.path(),
            submission.best_id(),
            galley.best_id()
        ))
    }
}

/// A transformation from exportable objects into an XML document.
pub trait ExportFilter {
    /// Returns the group this filter is registered under.
    fn group(&self) -> &'static str;

    /// Converts `objects` into an XML document as configured by `deployment`.
    fn export(&self, objects: &ExportObjects, deployment: &ExportDeployment)
    -> FilterResult<String>;
}

/// Collection of the filters known to the service, looked up by group.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    /// Registered filters in registration order.
    filters: Vec<Arc<dyn ExportFilter + Send + Sync>>,
}

impl FilterRegistry {
    /// Creates a registry with all the filters shipped with the service.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::from(NativePreprintFilter::default()));
        registry.register(Arc::from(NativeGalleyFilter::default()));
        registry.register(Arc::from(CrossrefFilter::default()));
        registry.register(Arc::from(DataciteFilter::for_preprints()));
        registry.register(Arc::from(DataciteFilter::for_galleys()));
        registry
    }

    /// Adds `filter` to the registry.
    pub fn register(&mut self, filter: Arc<dyn ExportFilter + Send + Sync>) {
        self.filters.push(filter);
    }

    /// Returns the single filter registered under `group`.
    ///
    /// Having zero or more than one filter for a group is a configuration problem of the service,
    /// never a problem with the request.
    pub fn find_one(&self, group: &str) -> DriverResult<Arc<dyn ExportFilter + Send + Sync>> {
        let mut matches = self.filters.iter().filter(|f| f.group() == group);
        match (matches.next(), matches.next()) {
            (Some(filter), None) => Ok(filter.clone()),
            (None, _) => Err(DriverError::Misconfigured(format!("No filter for group {}", group))),
            (Some(_), Some(_)) => {
                Err(DriverError::Misconfigured(format!("Multiple filters for group {}", group)))
            }
        }
    }
}
