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

//! Filters that produce DataCite kernel-4 resources.
//!
//! A document describes a single resource.  Batches of more than one object are wrapped in a
//! `resources` element so that they can still be downloaded as one file, but deposits always go
//! through single-object documents.

use crate::filter::{
    ExportDeployment, ExportFilter, FilterError, FilterResult, GALLEY_DATACITE,
    PREPRINT_DATACITE, XmlBuilder,
};
use crate::model::{ExportGalley, ExportObjects, Preprint, Publication};
use time::Date;

/// Namespace of the kernel-4 schema.
const NAMESPACE: &str = "http://datacite.org/schema/kernel-4";

/// Location of the kernel-4 schema.
const SCHEMA_LOCATION: &str =
    "http://datacite.org/schema/kernel-4 http://schema.datacite.org/meta/kernel-4/metadata.xsd";

/// Namespace of the XML schema instance attributes.
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Opens the `resource` element.
fn start_resource(xml: &mut XmlBuilder) -> FilterResult<()> {
    xml.start(
        "resource",
        &[
            ("xmlns", NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xsi:schemaLocation", SCHEMA_LOCATION),
        ],
    )
}

/// Emits the elements shared by every resource type, up to and including the publication year.
fn write_common(
    xml: &mut XmlBuilder,
    doi: Option<&str>,
    publication: &Publication,
    titles: &[(&str, Option<&str>)],
    deployment: &ExportDeployment,
) -> FilterResult<Date> {
    if let Some(doi) = doi {
        xml.text("identifier", &[("identifierType", "DOI")], doi)?;
    }

    xml.start("creators", &[])?;
    if publication.authors().is_empty() {
        xml.start("creator", &[])?;
        xml.text("creatorName", &[("nameType", "Organizational")], deployment.server().name())?;
        xml.end("creator")?;
    }
    for author in publication.authors() {
        xml.start("creator", &[])?;
        let name = match author.family_name.as_deref() {
            Some(family) => format!("{}, {}", family, author.given_name),
            None => author.given_name.clone(),
        };
        xml.text("creatorName", &[("nameType", "Personal")], &name)?;
        xml.text("givenName", &[], &author.given_name)?;
        xml.optional_text("familyName", author.family_name.as_deref())?;
        xml.end("creator")?;
    }
    xml.end("creators")?;

    xml.start("titles", &[])?;
    for &(title, title_type) in titles {
        match title_type {
            Some(title_type) => xml.text("title", &[("titleType", title_type)], title)?,
            None => xml.text("title", &[], title)?,
        }
    }
    xml.end("titles")?;

    xml.text("publisher", &[], deployment.server().name())?;

    let issued = publication.date_published().unwrap_or_else(|| deployment.export_time().date());
    xml.text("publicationYear", &[], &issued.year().to_string())?;
    Ok(issued)
}

/// Emits the elements shared by every resource type after the resource type.
fn write_trailer(
    xml: &mut XmlBuilder,
    publication: &Publication,
    issued: Date,
) -> FilterResult<()> {
    xml.start("dates", &[])?;
    xml.text("date", &[("dateType", "Issued")], &issued.to_string())?;
    xml.end("dates")?;

    xml.text("version", &[], &publication.version().to_string())?;

    if let Some(license_url) = publication.license_url().as_deref() {
        xml.start("rightsList", &[])?;
        xml.empty("rights", &[("rightsURI", license_url)])?;
        xml.end("rightsList")?;
    }
    Ok(())
}

/// Emits the `resource` element that describes `preprint`.
fn write_preprint(
    xml: &mut XmlBuilder,
    preprint: &Preprint,
    deployment: &ExportDeployment,
) -> FilterResult<()> {
    let publication = preprint.publication();

    start_resource(xml)?;
    let issued = write_common(
        xml,
        publication.doi().as_deref(),
        publication,
        &[(publication.title().as_str(), None)],
        deployment,
    )?;
    xml.text("resourceType", &[("resourceTypeGeneral", "Preprint")], "Preprint")?;
    write_trailer(xml, publication, issued)?;

    if !preprint.galleys().is_empty() {
        xml.start("formats", &[])?;
        for galley in preprint.galleys() {
            xml.text("format", &[], galley.label())?;
        }
        xml.end("formats")?;
    }

    if let Some(text) = publication.abstract_text().as_deref() {
        xml.start("descriptions", &[])?;
        xml.text("description", &[("descriptionType", "Abstract")], text)?;
        xml.end("descriptions")?;
    }

    if let Some(vor_doi) = publication.published_vor_doi() {
        xml.start("relatedIdentifiers", &[])?;
        xml.text(
            "relatedIdentifier",
            &[("relatedIdentifierType", "DOI"), ("relationType", "IsPreviousVersionOf")],
            vor_doi,
        )?;
        xml.end("relatedIdentifiers")?;
    }

    xml.end("resource")
}

/// Emits the `resource` element that describes `galley`.
fn write_galley(
    xml: &mut XmlBuilder,
    galley: &ExportGalley,
    deployment: &ExportDeployment,
) -> FilterResult<()> {
    let publication = galley.publication();

    start_resource(xml)?;
    let issued = write_common(
        xml,
        galley.galley().doi().as_deref(),
        publication,
        &[(publication.title().as_str(), None), (galley.galley().label().as_str(), Some("Other"))],
        deployment,
    )?;
    xml.text("resourceType", &[("resourceTypeGeneral", "Text")], galley.galley().label())?;
    write_trailer(xml, publication, issued)?;

    if let Some(doi) = publication.doi().as_deref() {
        xml.start("relatedIdentifiers", &[])?;
        xml.text(
            "relatedIdentifier",
            &[("relatedIdentifierType", "DOI"), ("relationType", "IsPartOf")],
            doi,
        )?;
        xml.end("relatedIdentifiers")?;
    }

    xml.end("resource")
}

/// Kinds of objects a `DataciteFilter` accepts.
#[derive(Clone, Copy)]
enum Accepts {
    /// The filter converts preprints.
    Preprints,

    /// The filter converts galleys.
    Galleys,
}

/// Converts preprints or galleys to DataCite resources.
pub(crate) struct DataciteFilter {
    /// Kind of objects this instance accepts.
    accepts: Accepts,
}

impl DataciteFilter {
    /// Creates the filter for preprints.
    pub(crate) fn for_preprints() -> Self {
        Self { accepts: Accepts::Preprints }
    }

    /// Creates the filter for galleys.
    pub(crate) fn for_galleys() -> Self {
        Self { accepts: Accepts::Galleys }
    }
}

impl ExportFilter for DataciteFilter {
    fn group(&self) -> &'static str {
        match self.accepts {
            Accepts::Preprints => PREPRINT_DATACITE,
            Accepts::Galleys => GALLEY_DATACITE,
        }
    }

    fn export(
        &self,
        objects: &ExportObjects,
        deployment: &ExportDeployment,
    ) -> FilterResult<String> {
        let mut xml = XmlBuilder::new()?;
        let wrap = objects.len() != 1;
        if wrap {
            xml.start("resources", &[])?;
        }
        match (self.accepts, objects) {
            (Accepts::Preprints, ExportObjects::Preprints(preprints)) => {
                for preprint in preprints {
                    write_preprint(&mut xml, preprint, deployment)?;
                }
            }
            (Accepts::Galleys, ExportObjects::Galleys(galleys)) => {
                for galley in galleys {
                    write_galley(&mut xml, galley, deployment)?;
                }
            }
            (_, objects) => {
                return Err(FilterError::UnsupportedObjects(self.group(), objects.file_part()));
            }
        }
        if wrap {
            xml.end("resources")?;
        }
        xml.finish()
    }
}
