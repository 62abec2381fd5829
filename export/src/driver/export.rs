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

//! Export of objects into validated XML documents and temporary files.

use crate::agency::RegistrationAgency;
use crate::driver::Driver;
use crate::filter::{ExportDeployment, FilterRegistry, XmlDiagnostic, validate_xml};
use crate::model::{ExportObjects, ServerId};
use log::{debug, warn};
use pubexport_core::driver::{DriverError, DriverResult};
use std::path::Path;
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use time::macros::format_description;

/// An exported document together with its well-formedness problems.
#[derive(Debug, PartialEq)]
pub(crate) struct ExportedXml {
    /// Raw text of the document, returned even if it is not well-formed.
    pub(crate) xml: String,

    /// Problems found in the document.  Always empty when validation was suppressed.
    pub(crate) diagnostics: Vec<XmlDiagnostic>,
}

impl ExportedXml {
    /// Returns true if the document has no known problems.
    pub(crate) fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Runs the single filter registered under `group` on `objects` and validates its output unless
/// `deployment` suppresses validation.
pub(crate) fn export_xml(
    filters: &FilterRegistry,
    group: &str,
    objects: &ExportObjects,
    deployment: &ExportDeployment,
) -> DriverResult<ExportedXml> {
    let filter = filters.find_one(group)?;
    let xml = filter.export(objects, deployment)?;

    let diagnostics = if *deployment.no_validation() { vec![] } else { validate_xml(&xml) };
    if !diagnostics.is_empty() {
        warn!("Filter {} produced {} XML problems", group, diagnostics.len());
    }
    Ok(ExportedXml { xml, diagnostics })
}

/// Computes the download name of the document that contains `objects` exported by `plugin` at
/// `time` from the server `server_id`.
pub(crate) fn export_file_name(
    plugin: &str,
    time: OffsetDateTime,
    objects: &ExportObjects,
    server_id: ServerId,
) -> DriverResult<String> {
    let timestamp = time
        .format(format_description!("[year][month][day]-[hour][minute][second]"))
        .map_err(|e| DriverError::BackendError(format!("Cannot format export time: {}", e)))?;
    Ok(format!("{}-{}-{}-{}.xml", plugin, timestamp, objects.file_part(), server_id))
}

/// A temporary file that holds an exported document and that is deleted when dropped.
pub(crate) struct TempXmlFile(NamedTempFile);

impl TempXmlFile {
    /// Writes `xml` to a new file in `dir` whose name starts with the stem of `file_name`.
    ///
    /// The file name gets a random component so that concurrent exports of the same objects
    /// within the same second do not collide.
    pub(crate) async fn create(dir: &Path, file_name: &str, xml: &str) -> DriverResult<Self> {
        let stem = file_name.strip_suffix(".xml").unwrap_or(file_name);
        let file = tempfile::Builder::new()
            .prefix(&format!("{}-", stem))
            .suffix(".xml")
            .tempfile_in(dir)
            .map_err(|e| {
                DriverError::BackendError(format!(
                    "Cannot create export file in {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        tokio::fs::write(file.path(), xml).await.map_err(|e| {
            DriverError::BackendError(format!("Cannot write {}: {}", file.path().display(), e))
        })?;
        debug!("Wrote export file {}", file.path().display());
        Ok(Self(file))
    }

    /// Returns the path to the file.
    pub(crate) fn path(&self) -> &Path {
        self.0.path()
    }
}

impl Drop for TempXmlFile {
    fn drop(&mut self) {
        debug!("Removing export file {}", self.0.path().display());
    }
}

impl Driver {
    /// Exports `objects` with the filter that `agency` uses for them.
    pub(crate) fn export_objects(
        &self,
        agency: &(dyn RegistrationAgency + Send + Sync),
        objects: &ExportObjects,
        deployment: &ExportDeployment,
    ) -> DriverResult<ExportedXml> {
        let group = Driver::filter_group(agency, objects)?;
        export_xml(&self.filters, group, objects, deployment)
    }

    /// Writes `xml` to a temporary file in the export directory.
    pub(crate) async fn write_temp_xml(
        &self,
        file_name: &str,
        xml: &str,
    ) -> DriverResult<TempXmlFile> {
        TempXmlFile::create(&self.opts.export_path, file_name, xml).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::testutils::test_deployment;
    use crate::filter::{ExportFilter, FilterResult, Severity};
    use crate::model::*;
    use std::sync::Arc;
    use time::macros::datetime;

    /// Filter that returns a fixed document.
    struct FixedFilter {
        /// Group of the filter.
        group: &'static str,

        /// Document to return.
        xml: &'static str,
    }

    impl ExportFilter for FixedFilter {
        fn group(&self) -> &'static str {
            self.group
        }

        fn export(&self, _: &ExportObjects, _: &ExportDeployment) -> FilterResult<String> {
            Ok(self.xml.to_owned())
        }
    }

    fn registry(filters: &[(&'static str, &'static str)]) -> FilterRegistry {
        let mut registry = FilterRegistry::default();
        for &(group, xml) in filters {
            registry.register(Arc::from(FixedFilter { group, xml }));
        }
        registry
    }

    fn no_validation_deployment() -> ExportDeployment {
        let deployment = test_deployment(PluginSettings::default());
        ExportDeployment::new(
            deployment.server().clone(),
            deployment.plugin().clone(),
            PluginSettings::default(),
            deployment.base_urls().clone(),
            *deployment.export_time(),
            true,
        )
    }

    #[test]
    fn test_export_xml_valid() {
        let filters = registry(&[("a=>b", "<root><child/></root>")]);
        let objects = ExportObjects::Preprints(vec![]);
        let exported =
            export_xml(&filters, "a=>b", &objects, &test_deployment(PluginSettings::default()))
                .unwrap();
        assert_eq!("<root><child/></root>", exported.xml);
        assert!(exported.is_valid());
    }

    #[test]
    fn test_export_xml_invalid_keeps_xml() {
        let filters = registry(&[("a=>b", "<root><child></root>")]);
        let objects = ExportObjects::Preprints(vec![]);
        let exported =
            export_xml(&filters, "a=>b", &objects, &test_deployment(PluginSettings::default()))
                .unwrap();
        assert_eq!("<root><child></root>", exported.xml);
        assert!(!exported.is_valid());
        for diagnostic in exported.diagnostics {
            assert!(matches!(diagnostic.severity, Severity::Error | Severity::Fatal));
        }
    }

    #[test]
    fn test_export_xml_no_validation() {
        let filters = registry(&[("a=>b", "<root><child></root>")]);
        let objects = ExportObjects::Preprints(vec![]);
        let exported = export_xml(&filters, "a=>b", &objects, &no_validation_deployment()).unwrap();
        assert!(exported.is_valid());
    }

    #[test]
    fn test_export_xml_filter_lookup_errors() {
        let objects = ExportObjects::Preprints(vec![]);
        let deployment = test_deployment(PluginSettings::default());

        let filters = registry(&[]);
        match export_xml(&filters, "a=>b", &objects, &deployment) {
            Err(DriverError::Misconfigured(msg)) => assert!(msg.contains("No filter")),
            r => panic!("Unexpected result {:?}", r),
        }

        let filters = registry(&[("a=>b", "<a/>"), ("a=>b", "<b/>")]);
        match export_xml(&filters, "a=>b", &objects, &deployment) {
            Err(DriverError::Misconfigured(msg)) => assert!(msg.contains("Multiple filters")),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[test]
    fn test_export_file_name() {
        let time = datetime!(2023-07-05 08:09:10 UTC);
        assert_eq!(
            "crossref-20230705-080910-preprints-3.xml",
            export_file_name("crossref", time, &ExportObjects::Preprints(vec![]), ServerId::new(3))
                .unwrap()
        );
        assert_eq!(
            "datacite-20230705-080910-galleys-12.xml",
            export_file_name("datacite", time, &ExportObjects::Galleys(vec![]), ServerId::new(12))
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_temp_xml_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let name = "crossref-20230705-080910-preprints-3.xml";

        let file1 = TempXmlFile::create(dir.path(), name, "<a/>").await.unwrap();
        let file2 = TempXmlFile::create(dir.path(), name, "<b/>").await.unwrap();
        assert_ne!(file1.path(), file2.path());
        let file_name = file1.path().file_name().unwrap().to_str().unwrap().to_owned();
        assert!(file_name.starts_with("crossref-20230705-080910-preprints-3-"));
        assert!(file_name.ends_with(".xml"));
        assert_eq!("<a/>", std::fs::read_to_string(file1.path()).unwrap());

        let path1 = file1.path().to_owned();
        drop(file1);
        assert!(!path1.exists());
        assert_eq!(1, std::fs::read_dir(dir.path()).unwrap().count());
        drop(file2);
        assert_eq!(0, std::fs::read_dir(dir.path()).unwrap().count());
    }

    #[tokio::test]
    async fn test_temp_xml_file_bad_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        match TempXmlFile::create(&missing, "x.xml", "<a/>").await {
            Err(DriverError::BackendError(msg)) => assert!(msg.contains("Cannot create")),
            Err(e) => panic!("Unexpected error {:?}", e),
            Ok(_) => panic!("Creating a file in a missing directory should fail"),
        }
    }
}
