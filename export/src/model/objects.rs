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

//! Servers, submissions and the objects hanging from them.

use crate::model::{
    EmailAddress, FileStage, GalleyId, PublicationId, PublicationStatus, RelationStatus,
    ServerId, SubmissionFileId, SubmissionId,
};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use time::Date;

/// Computes the "best id" of an object: its URL path when set, its numeric id otherwise.
fn best_id(url_path: Option<&String>, id: i64) -> String {
    match url_path {
        Some(path) if !path.is_empty() => path.clone(),
        _ => id.to_string(),
    }
}

/// A preprint server, which is the context that owns submissions, settings and files.
#[derive(Clone, Debug, Getters, PartialEq, Serialize)]
pub struct Server {
    /// Identifier of the server.
    id: ServerId,

    /// Path of the server in URLs, which is also how the command line refers to it.
    path: String,

    /// Display name of the server.
    name: String,

    /// Address of the primary contact of the server.
    contact_email: Option<EmailAddress>,
}

impl Server {
    /// Creates a new server.
    pub fn new<P: Into<String>, N: Into<String>>(id: ServerId, path: P, name: N) -> Self {
        Self { id, path: path.into(), name: name.into(), contact_email: None }
    }

    /// Sets the contact email of the server.
    pub fn with_contact_email(mut self, email: EmailAddress) -> Self {
        self.contact_email = Some(email);
        self
    }
}

/// A submission, which is the exportable "preprint" once published.
#[derive(Clone, Debug, Getters, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct Submission {
    /// Identifier of the submission.
    id: SubmissionId,

    /// Server that owns the submission.
    server_id: ServerId,

    /// Publication status of the submission, which mirrors that of its current publication.
    status: PublicationStatus,

    /// Custom URL path of the submission, if any.
    url_path: Option<String>,

    /// The publication that holds the current metadata of the submission.
    current_publication_id: Option<PublicationId>,
}

impl Submission {
    /// Creates a new submission without a current publication.
    pub fn new(id: SubmissionId, server_id: ServerId, status: PublicationStatus) -> Self {
        Self { id, server_id, status, url_path: None, current_publication_id: None }
    }

    /// Sets the custom URL path of the submission.
    pub fn with_url_path<S: Into<String>>(mut self, url_path: S) -> Self {
        self.url_path = Some(url_path.into());
        self
    }

    /// Sets the publication status of the submission.
    pub fn with_status(mut self, status: PublicationStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the current publication of the submission.
    pub fn with_current_publication(mut self, id: Option<PublicationId>) -> Self {
        self.current_publication_id = id;
        self
    }

    /// Returns the identifier to use in public URLs.
    pub fn best_id(&self) -> String {
        best_id(self.url_path.as_ref(), self.id.as_i64())
    }
}

/// An author of a publication.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Author {
    /// Given name of the author.
    pub given_name: String,

    /// Family name of the author, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

impl Author {
    /// Returns the name of the author in display order.
    pub fn full_name(&self) -> String {
        match self.family_name.as_ref() {
            Some(family) => format!("{} {}", self.given_name, family),
            None => self.given_name.clone(),
        }
    }
}

/// Metadata of a publication before it is persisted.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NewPublication {
    /// Title of the publication.
    pub title: String,

    /// Abstract of the publication.
    #[serde(default)]
    pub abstract_text: Option<String>,

    /// URL of the license the publication is distributed under.
    #[serde(default)]
    pub license_url: Option<String>,

    /// Date on which the publication becomes public.
    #[serde(default)]
    pub date_published: Option<Date>,

    /// Ordered list of authors.
    #[serde(default)]
    pub authors: Vec<Author>,
}

impl NewPublication {
    /// Creates new publication metadata with just a title.
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            abstract_text: None,
            license_url: None,
            date_published: None,
            authors: vec![],
        }
    }
}

/// Relation of a publication to its version of record, as requested by a user.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NewRelation {
    /// Relation to the version of record.
    pub relation_status: RelationStatus,

    /// DOI of the version of record.  Required when the relation is `Published`.
    #[serde(default)]
    pub vor_doi: Option<String>,
}

/// A relation that users can choose from, along with its description.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct RelationOption {
    /// The relation.
    pub value: RelationStatus,

    /// Human-readable description of the relation.
    pub label: String,
}

/// A version of the metadata of a submission.
#[derive(Clone, Debug, Getters, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct Publication {
    /// Identifier of the publication.
    id: PublicationId,

    /// Submission this publication belongs to.
    submission_id: SubmissionId,

    /// 1-based version number of the publication within its submission.
    version: i32,

    /// Publication status of this version.
    status: PublicationStatus,

    /// Title of the publication.
    title: String,

    /// Abstract of the publication.
    abstract_text: Option<String>,

    /// DOI assigned to the publication.
    doi: Option<String>,

    /// URL of the license the publication is distributed under.
    license_url: Option<String>,

    /// Date on which the publication becomes public.
    date_published: Option<Date>,

    /// Ordered list of authors.
    authors: Vec<Author>,

    /// Relation of this version to a version of record published elsewhere.
    relation_status: RelationStatus,

    /// DOI of the version of record.
    vor_doi: Option<String>,
}

impl Publication {
    /// Creates a publication from its persisted metadata.
    pub fn new(
        id: PublicationId,
        submission_id: SubmissionId,
        version: i32,
        status: PublicationStatus,
        metadata: NewPublication,
    ) -> Self {
        Self {
            id,
            submission_id,
            version,
            status,
            title: metadata.title,
            abstract_text: metadata.abstract_text,
            doi: None,
            license_url: metadata.license_url,
            date_published: metadata.date_published,
            authors: metadata.authors,
            relation_status: RelationStatus::None,
            vor_doi: None,
        }
    }

    /// Sets the publication status of this version.
    pub fn with_status(mut self, status: PublicationStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets or clears the DOI of this version.
    pub fn with_doi(mut self, doi: Option<String>) -> Self {
        self.doi = doi;
        self
    }

    /// Sets or clears the publication date of this version.
    pub fn with_date_published(mut self, date: Option<Date>) -> Self {
        self.date_published = date;
        self
    }

    /// Sets the relation of this version to its version of record.
    pub fn with_relation(
        mut self,
        relation_status: RelationStatus,
        vor_doi: Option<String>,
    ) -> Self {
        self.relation_status = relation_status;
        self.vor_doi = vor_doi;
        self
    }

    /// Returns the DOI of the version of record if this version declares it as published.
    pub fn published_vor_doi(&self) -> Option<&str> {
        match (self.relation_status, self.vor_doi.as_deref()) {
            (RelationStatus::Published, Some(doi)) if !doi.is_empty() => Some(doi),
            _ => None,
        }
    }

    /// Extracts the metadata of this publication so that it can be copied into a new version.
    pub fn to_metadata(&self) -> NewPublication {
        NewPublication {
            title: self.title.clone(),
            abstract_text: self.abstract_text.clone(),
            license_url: self.license_url.clone(),
            date_published: None,
            authors: self.authors.clone(),
        }
    }
}

/// Metadata of a galley before it is persisted.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NewGalley {
    /// Display label of the galley, such as "PDF".
    pub label: String,

    /// Locale of the galley contents.
    #[serde(default)]
    pub locale: Option<String>,

    /// Custom URL path of the galley.
    #[serde(default)]
    pub url_path: Option<String>,

    /// Remote URL for galleys hosted elsewhere.
    #[serde(default)]
    pub url_remote: Option<String>,

    /// File backing the galley.
    #[serde(default)]
    pub submission_file_id: Option<SubmissionFileId>,

    /// Whether the galley was approved for publication.
    #[serde(default)]
    pub is_approved: bool,

    /// DOI assigned to the galley.
    #[serde(default)]
    pub doi: Option<String>,
}

impl NewGalley {
    /// Creates new galley metadata with just a label.
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            locale: None,
            url_path: None,
            url_remote: None,
            submission_file_id: None,
            is_approved: false,
            doi: None,
        }
    }
}

/// A representation of a publication, such as its PDF.
#[derive(Clone, Debug, Getters, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct Galley {
    /// Identifier of the galley.
    id: GalleyId,

    /// Publication this galley belongs to.
    publication_id: PublicationId,

    /// Display label of the galley.
    label: String,

    /// Locale of the galley contents.
    locale: Option<String>,

    /// Custom URL path of the galley.
    url_path: Option<String>,

    /// Remote URL for galleys hosted elsewhere.
    url_remote: Option<String>,

    /// File backing the galley.
    submission_file_id: Option<SubmissionFileId>,

    /// Whether the galley was approved for publication.
    is_approved: bool,

    /// DOI assigned to the galley.
    doi: Option<String>,
}

impl Galley {
    /// Creates a galley from its persisted metadata.
    pub fn new(id: GalleyId, publication_id: PublicationId, metadata: NewGalley) -> Self {
        Self {
            id,
            publication_id,
            label: metadata.label,
            locale: metadata.locale,
            url_path: metadata.url_path,
            url_remote: metadata.url_remote,
            submission_file_id: metadata.submission_file_id,
            is_approved: metadata.is_approved,
            doi: metadata.doi,
        }
    }

    /// Extracts the metadata of this galley so that it can be attached to another publication.
    pub fn to_metadata(&self) -> NewGalley {
        NewGalley {
            label: self.label.clone(),
            locale: self.locale.clone(),
            url_path: self.url_path.clone(),
            url_remote: self.url_remote.clone(),
            submission_file_id: self.submission_file_id,
            is_approved: self.is_approved,
            doi: None,
        }
    }

    /// Returns the identifier to use in public URLs.
    pub fn best_id(&self) -> String {
        best_id(self.url_path.as_ref(), self.id.as_i64())
    }

    /// Returns true if the galley points to an external location instead of a stored file.
    pub fn is_remote(&self) -> bool {
        self.url_remote.as_ref().is_some_and(|url| !url.is_empty())
    }
}

/// Object a stored file is associated with.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "id")]
pub enum FileAssoc {
    /// The file backs a galley.
    Galley(GalleyId),

    /// The file is a dependency of another file.
    SubmissionFile(SubmissionFileId),
}

/// Metadata of a stored file before it is persisted.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NewSubmissionFile {
    /// Workflow stage of the file.
    pub file_stage: FileStage,

    /// Object the file is attached to.
    #[serde(default)]
    pub assoc: Option<FileAssoc>,

    /// Storage path of the file, relative to the files directory.
    pub path: String,

    /// Display name of the file, used as the download name.
    pub name: String,

    /// MIME type of the file.
    pub mime_type: String,
}

/// A stored file.
#[derive(Clone, Debug, Getters, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct SubmissionFile {
    /// Identifier of the file.
    id: SubmissionFileId,

    /// Submission that owns the file.
    submission_id: SubmissionId,

    /// Workflow stage of the file.
    file_stage: FileStage,

    /// Object the file is attached to.
    assoc: Option<FileAssoc>,

    /// Storage path of the file, relative to the files directory.
    path: String,

    /// Display name of the file.
    name: String,

    /// MIME type of the file.
    mime_type: String,
}

impl SubmissionFile {
    /// Creates a file from its persisted metadata.
    pub fn new(
        id: SubmissionFileId,
        submission_id: SubmissionId,
        metadata: NewSubmissionFile,
    ) -> Self {
        Self {
            id,
            submission_id,
            file_stage: metadata.file_stage,
            assoc: metadata.assoc,
            path: metadata.path,
            name: metadata.name,
            mime_type: metadata.mime_type,
        }
    }
}
