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

//! Filters that produce the service's native XML format.

use crate::filter::{
    ExportDeployment, ExportFilter, FilterError, FilterResult, GALLEY_NATIVE, PREPRINT_NATIVE,
    XmlBuilder,
};
use crate::model::{ExportObjects, Galley, Preprint, Publication};

/// Namespace of the native format.
const NAMESPACE: &str = "http://pkp.sfu.ca";

/// Emits the internal identifier element used by all native objects.
fn write_internal_id(xml: &mut XmlBuilder, id: i64) -> FilterResult<()> {
    xml.text("id", &[("type", "internal"), ("advice", "ignore")], &id.to_string())
}

/// Emits the `preprint_galley` element that describes `galley`.
fn write_galley(xml: &mut XmlBuilder, galley: &Galley) -> FilterResult<()> {
    let approved = if *galley.is_approved() { "true" } else { "false" };
    let mut attrs = vec![("approved", approved)];
    if let Some(locale) = galley.locale().as_deref() {
        attrs.push(("locale", locale));
    }
    xml.start("preprint_galley", &attrs)?;
    write_internal_id(xml, galley.id().as_i64())?;
    if let Some(doi) = galley.doi().as_deref() {
        xml.text("id", &[("type", "doi"), ("advice", "update")], doi)?;
    }
    xml.text("name", &[], galley.label())?;
    xml.optional_text("urlPath", galley.url_path().as_deref())?;
    if galley.is_remote() {
        if let Some(url) = galley.url_remote().as_deref() {
            xml.empty("remote", &[("src", url)])?;
        }
    } else if let Some(file_id) = galley.submission_file_id() {
        xml.empty("submission_file_ref", &[("id", &file_id.to_string())])?;
    }
    xml.end("preprint_galley")
}

/// Emits the `publication` element that describes `publication` and its `galleys`.
fn write_publication(
    xml: &mut XmlBuilder,
    publication: &Publication,
    galleys: &[Galley],
) -> FilterResult<()> {
    let version = publication.version().to_string();
    let status = publication.status().as_i16().to_string();
    let date = publication.date_published().map(|d| d.to_string());
    let mut attrs = vec![("version", version.as_str()), ("status", status.as_str())];
    if let Some(date) = date.as_deref() {
        attrs.push(("date_published", date));
    }
    xml.start("publication", &attrs)?;
    write_internal_id(xml, publication.id().as_i64())?;
    if let Some(doi) = publication.doi().as_deref() {
        xml.text("id", &[("type", "doi"), ("advice", "update")], doi)?;
    }
    xml.text("title", &[], publication.title())?;
    xml.optional_text("abstract", publication.abstract_text().as_deref())?;
    xml.optional_text("licenseUrl", publication.license_url().as_deref())?;
    if !publication.authors().is_empty() {
        xml.start("authors", &[])?;
        for (seq, author) in publication.authors().iter().enumerate() {
            xml.start("author", &[("seq", &seq.to_string())])?;
            xml.text("givenname", &[], &author.given_name)?;
            xml.optional_text("familyname", author.family_name.as_deref())?;
            xml.end("author")?;
        }
        xml.end("authors")?;
    }
    for galley in galleys {
        write_galley(xml, galley)?;
    }
    xml.end("publication")
}

/// Emits the `preprint` element that describes `preprint`.
fn write_preprint(xml: &mut XmlBuilder, preprint: &Preprint) -> FilterResult<()> {
    let submission = preprint.submission();
    let status = submission.status().as_i16().to_string();
    let current = preprint.publication().id().to_string();
    xml.start("preprint", &[("status", &status), ("current_publication_id", &current)])?;
    write_internal_id(xml, submission.id().as_i64())?;
    write_publication(xml, preprint.publication(), preprint.galleys())?;
    xml.end("preprint")
}

/// Converts preprints to the native format.
#[derive(Default)]
pub(crate) struct NativePreprintFilter {}

impl ExportFilter for NativePreprintFilter {
    fn group(&self) -> &'static str {
        PREPRINT_NATIVE
    }

    fn export(
        &self,
        objects: &ExportObjects,
        _deployment: &ExportDeployment,
    ) -> FilterResult<String> {
        let preprints = match objects {
            ExportObjects::Preprints(preprints) => preprints,
            ExportObjects::Galleys(_) => {
                return Err(FilterError::UnsupportedObjects(PREPRINT_NATIVE, "galleys"));
            }
        };

        let mut xml = XmlBuilder::new()?;
        xml.start("preprints", &[("xmlns", NAMESPACE)])?;
        for preprint in preprints {
            write_preprint(&mut xml, preprint)?;
        }
        xml.end("preprints")?;
        xml.finish()
    }
}

/// Converts galleys to the native format.
#[derive(Default)]
pub(crate) struct NativeGalleyFilter {}

impl ExportFilter for NativeGalleyFilter {
    fn group(&self) -> &'static str {
        GALLEY_NATIVE
    }

    fn export(
        &self,
        objects: &ExportObjects,
        _deployment: &ExportDeployment,
    ) -> FilterResult<String> {
        let galleys = match objects {
            ExportObjects::Galleys(galleys) => galleys,
            ExportObjects::Preprints(_) => {
                return Err(FilterError::UnsupportedObjects(GALLEY_NATIVE, "preprints"));
            }
        };

        let mut xml = XmlBuilder::new()?;
        xml.start("preprint_galleys", &[("xmlns", NAMESPACE)])?;
        for galley in galleys {
            write_galley(&mut xml, galley.galley())?;
        }
        xml.end("preprint_galleys")?;
        xml.finish()
    }
}
