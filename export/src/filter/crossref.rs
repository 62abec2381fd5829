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

//! Filter that produces Crossref posted-content deposits.

use crate::filter::{
    ExportDeployment, ExportFilter, FilterError, FilterResult, PREPRINT_CROSSREF, XmlBuilder,
};
use crate::model::{ExportObjects, Preprint};

/// Name of the setting that holds the name of the depositor.
pub(crate) const DEPOSITOR_NAME: &str = "depositorName";

/// Name of the setting that holds the contact email of the depositor.
pub(crate) const DEPOSITOR_EMAIL: &str = "depositorEmail";

/// Version of the deposit schema this filter produces.
const SCHEMA_VERSION: &str = "4.4.2";

/// Namespace of the deposit schema this filter produces.
const NAMESPACE: &str = "http://www.crossref.org/schema/4.4.2";

/// Namespace of the relations schema.
const RELATIONS_NAMESPACE: &str = "http://www.crossref.org/relations.xsd";

/// Emits the `head` element of the deposit batch.
fn write_head(xml: &mut XmlBuilder, deployment: &ExportDeployment) -> FilterResult<()> {
    let timestamp = deployment.export_time().unix_timestamp().to_string();
    let settings = deployment.settings();

    xml.start("head", &[])?;
    xml.text("doi_batch_id", &[], &format!("{}_{}", deployment.plugin(), timestamp))?;
    xml.text("timestamp", &[], &timestamp)?;
    xml.start("depositor", &[])?;
    xml.text(
        "depositor_name",
        &[],
        settings.get(DEPOSITOR_NAME).unwrap_or(deployment.server().name()),
    )?;
    let email = match settings.get(DEPOSITOR_EMAIL) {
        Some(email) => Some(email),
        None => deployment.server().contact_email().as_ref().map(|e| e.as_str()),
    };
    xml.optional_text("email_address", email)?;
    xml.end("depositor")?;
    xml.text("registrant", &[], deployment.server().name())?;
    xml.end("head")
}

/// Emits the `posted_content` element that describes `preprint`.
fn write_posted_content(
    xml: &mut XmlBuilder,
    preprint: &Preprint,
    deployment: &ExportDeployment,
) -> FilterResult<()> {
    let publication = preprint.publication();
    let doi = match publication.doi() {
        Some(doi) => doi,
        None => {
            return Err(FilterError::MissingData(format!(
                "Preprint {} has no DOI",
                preprint.submission().id()
            )));
        }
    };

    xml.start("posted_content", &[("type", "preprint")])?;

    if !publication.authors().is_empty() {
        xml.start("contributors", &[])?;
        for (i, author) in publication.authors().iter().enumerate() {
            let sequence = if i == 0 { "first" } else { "additional" };
            xml.start(
                "person_name",
                &[("contributor_role", "author"), ("sequence", sequence)],
            )?;
            xml.text("given_name", &[], &author.given_name)?;
            xml.text(
                "surname",
                &[],
                author.family_name.as_deref().unwrap_or(&author.given_name),
            )?;
            xml.end("person_name")?;
        }
        xml.end("contributors")?;
    }

    xml.start("titles", &[])?;
    xml.text("title", &[], publication.title())?;
    xml.end("titles")?;

    let posted = publication.date_published().unwrap_or_else(|| deployment.export_time().date());
    xml.start("posted_date", &[])?;
    xml.text("month", &[], &format!("{:02}", u8::from(posted.month())))?;
    xml.text("day", &[], &format!("{:02}", posted.day()))?;
    xml.text("year", &[], &posted.year().to_string())?;
    xml.end("posted_date")?;

    if let Some(text) = publication.abstract_text().as_deref() {
        xml.start("jats:abstract", &[("xmlns:jats", "http://www.ncbi.nlm.nih.gov/JATS1")])?;
        xml.text("jats:p", &[], text)?;
        xml.end("jats:abstract")?;
    }

    if let Some(vor_doi) = publication.published_vor_doi() {
        xml.start("rel:program", &[("xmlns:rel", RELATIONS_NAMESPACE)])?;
        xml.start("rel:related_item", &[])?;
        xml.text(
            "rel:intra_work_relation",
            &[("relationship-type", "isPreprintOf"), ("identifier-type", "doi")],
            vor_doi,
        )?;
        xml.end("rel:related_item")?;
        xml.end("rel:program")?;
    }

    xml.start("doi_data", &[])?;
    xml.text("doi", &[], doi)?;
    xml.text("resource", &[], deployment.landing_url(preprint.submission()).as_str())?;
    xml.end("doi_data")?;

    xml.end("posted_content")
}

/// Converts preprints to a Crossref deposit batch.
#[derive(Default)]
pub(crate) struct CrossrefFilter {}

impl ExportFilter for CrossrefFilter {
    fn group(&self) -> &'static str {
        PREPRINT_CROSSREF
    }

    fn export(
        &self,
        objects: &ExportObjects,
        deployment: &ExportDeployment,
    ) -> FilterResult<String> {
        let preprints = match objects {
            ExportObjects::Preprints(preprints) => preprints,
            ExportObjects::Galleys(_) => {
                return Err(FilterError::UnsupportedObjects(PREPRINT_CROSSREF, "galleys"));
            }
        };

        let mut xml = XmlBuilder::new()?;
        xml.start("doi_batch", &[("xmlns", NAMESPACE), ("version", SCHEMA_VERSION)])?;
        write_head(&mut xml, deployment)?;
        xml.start("body", &[])?;
        for preprint in preprints {
            write_posted_content(&mut xml, preprint, deployment)?;
        }
        xml.end("body")?;
        xml.end("doi_batch")?;
        xml.finish()
    }
}
