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

//! High-level data types.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

mod email;
pub use email::EmailAddress;
mod export;
pub use export::{ExportGalley, ExportObjects, Preprint};
mod ids;
pub use ids::{GalleyId, PublicationId, ServerId, SubmissionFileId, SubmissionId, UserId};
mod objects;
pub use objects::{
    Author, FileAssoc, Galley, NewGalley, NewPublication, NewRelation, NewSubmissionFile,
    Publication, RelationOption, Server, Submission, SubmissionFile,
};
pub mod settings;
pub use settings::PluginSettings;
mod status;
pub use status::{
    DepositStatus, ExportAction, FileStage, NotificationLevel, ObjectType, PublicationStatus,
    RelationStatus,
};

/// A message addressed to a user, such as the outcome of a deposit.
#[derive(Clone, Debug, Deserialize, Getters, PartialEq, Serialize)]
pub struct Notification {
    /// Identifier of the notification.
    id: i64,

    /// Recipient of the notification.
    user_id: UserId,

    /// Severity of the notification.
    level: NotificationLevel,

    /// Rendered text of the notification.
    contents: String,

    /// Time at which the notification was created.
    #[serde(with = "time::serde::rfc3339")]
    created: OffsetDateTime,
}

impl Notification {
    /// Creates a notification from its persisted fields.
    pub fn new(
        id: i64,
        user_id: UserId,
        level: NotificationLevel,
        contents: String,
        created: OffsetDateTime,
    ) -> Self {
        Self { id, user_id, level, contents, created }
    }
}
