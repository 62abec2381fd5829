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

//! Enumerations with a fixed persisted or wire representation.

use pubexport_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Publication status of a submission or of one of its publications.
///
/// The numeric values are the ones persisted in the database.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    /// Still going through the workflow.
    Queued,

    /// Publicly available.
    Published,

    /// Rejected.
    Declined,

    /// Will become public once its publication date arrives.
    Scheduled,
}

impl PublicationStatus {
    /// Parses a persisted status code.
    pub fn from_i16(code: i16) -> ModelResult<Self> {
        match code {
            1 => Ok(PublicationStatus::Queued),
            3 => Ok(PublicationStatus::Published),
            4 => Ok(PublicationStatus::Declined),
            5 => Ok(PublicationStatus::Scheduled),
            _ => Err(ModelError(format!("Unknown publication status code {}", code))),
        }
    }

    /// Returns the persisted status code.
    pub fn as_i16(self) -> i16 {
        match self {
            PublicationStatus::Queued => 1,
            PublicationStatus::Published => 3,
            PublicationStatus::Declined => 4,
            PublicationStatus::Scheduled => 5,
        }
    }
}

/// Relation between a preprint publication and its version of record.
///
/// The numeric values are the ones persisted in the database.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationStatus {
    /// No version of record is known.
    #[default]
    None,

    /// The preprint was submitted to a journal.
    Submitted,

    /// The preprint was published in a journal under the version of record DOI.
    Published,
}

impl RelationStatus {
    /// Every relation in the order offered to users.
    pub const ALL: [RelationStatus; 3] =
        [RelationStatus::None, RelationStatus::Submitted, RelationStatus::Published];

    /// Parses a persisted relation code.
    pub fn from_i16(code: i16) -> ModelResult<Self> {
        match code {
            1 => Ok(RelationStatus::None),
            2 => Ok(RelationStatus::Submitted),
            3 => Ok(RelationStatus::Published),
            _ => Err(ModelError(format!("Unknown relation status code {}", code))),
        }
    }

    /// Returns the persisted relation code.
    pub fn as_i16(self) -> i16 {
        match self {
            RelationStatus::None => 1,
            RelationStatus::Submitted => 2,
            RelationStatus::Published => 3,
        }
    }

    /// Returns the message key of the description of the relation.
    pub fn message_key(self) -> &'static str {
        match self {
            RelationStatus::None => "publication.relation.none",
            RelationStatus::Submitted => "publication.relation.submitted",
            RelationStatus::Published => "publication.relation.published",
        }
    }
}

/// Deposit status of an exportable object with respect to one registration agency.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum DepositStatus {
    /// Wildcard that matches any status when filtering.  Never persisted.
    #[serde(rename = "")]
    Any,

    /// The object was never deposited.  Also the status of objects without a stored value.
    #[default]
    #[serde(rename = "notDeposited")]
    NotDeposited,

    /// The object was registered out of band and a user recorded that fact manually.
    #[serde(rename = "markedRegistered")]
    MarkedRegistered,

    /// The object was successfully deposited with the agency.
    #[serde(rename = "registered")]
    Registered,
}

impl DepositStatus {
    /// Every status in display order.
    pub const ALL: [DepositStatus; 4] = [
        DepositStatus::Any,
        DepositStatus::NotDeposited,
        DepositStatus::MarkedRegistered,
        DepositStatus::Registered,
    ];

    /// Parses a status from its persisted representation.
    pub fn parse(s: &str) -> ModelResult<Self> {
        match s {
            "" => Ok(DepositStatus::Any),
            "notDeposited" => Ok(DepositStatus::NotDeposited),
            "markedRegistered" => Ok(DepositStatus::MarkedRegistered),
            "registered" => Ok(DepositStatus::Registered),
            _ => Err(ModelError(format!("Unknown deposit status '{}'", s))),
        }
    }

    /// Returns the persisted representation of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            DepositStatus::Any => "",
            DepositStatus::NotDeposited => "notDeposited",
            DepositStatus::MarkedRegistered => "markedRegistered",
            DepositStatus::Registered => "registered",
        }
    }

    /// Returns the message key of the name of the status.
    pub fn message_key(self) -> &'static str {
        match self {
            DepositStatus::Any => "plugins.importexport.common.status.any",
            DepositStatus::NotDeposited => "plugins.importexport.common.status.notDeposited",
            DepositStatus::MarkedRegistered => {
                "plugins.importexport.common.status.markedRegistered"
            }
            DepositStatus::Registered => "plugins.importexport.common.status.registered",
        }
    }

    /// Returns true if an object in status `other` is selected by this status used as a filter.
    pub fn matches(self, other: DepositStatus) -> bool {
        self == DepositStatus::Any || self == other
    }
}

/// User intents handled by the export action router.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ExportAction {
    /// Deposit the exported XML with the registration agency.
    #[serde(rename = "deposit")]
    Deposit,

    /// Export the XML as a download.
    #[serde(rename = "export")]
    Export,

    /// Record that the objects were registered out of band.
    #[serde(rename = "markRegistered")]
    MarkRegistered,
}

impl ExportAction {
    /// Returns the message key of the name of the action.
    pub fn message_key(self) -> &'static str {
        match self {
            ExportAction::Deposit => "plugins.importexport.common.action.register",
            ExportAction::Export => "plugins.importexport.common.action.export",
            ExportAction::MarkRegistered => "plugins.importexport.common.action.markRegistered",
        }
    }
}

/// Kinds of objects that carry settings, such as the deposit status.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// A submission.
    Submission,

    /// A galley.
    Galley,
}

impl ObjectType {
    /// Returns the persisted representation of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Submission => "submission",
            ObjectType::Galley => "galley",
        }
    }
}

/// Stage of the workflow a stored file belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStage {
    /// A file uploaded with the submission.
    Submission,

    /// A file that backs a galley.
    Proof,

    /// A file that a galley file depends on, such as an image embedded in an HTML galley.
    Dependent,
}

impl FileStage {
    /// Parses a persisted stage code.
    pub fn from_i16(code: i16) -> ModelResult<Self> {
        match code {
            2 => Ok(FileStage::Submission),
            10 => Ok(FileStage::Proof),
            17 => Ok(FileStage::Dependent),
            _ => Err(ModelError(format!("Unknown file stage code {}", code))),
        }
    }

    /// Returns the persisted stage code.
    pub fn as_i16(self) -> i16 {
        match self {
            FileStage::Submission => 2,
            FileStage::Proof => 10,
            FileStage::Dependent => 17,
        }
    }
}

/// Severity of a user notification.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// The operation succeeded.
    Success,

    /// The operation failed.
    Error,
}

impl NotificationLevel {
    /// Parses a persisted level.
    pub fn parse(s: &str) -> ModelResult<Self> {
        match s {
            "success" => Ok(NotificationLevel::Success),
            "error" => Ok(NotificationLevel::Error),
            _ => Err(ModelError(format!("Unknown notification level '{}'", s))),
        }
    }

    /// Returns the persisted representation of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Error => "error",
        }
    }
}
