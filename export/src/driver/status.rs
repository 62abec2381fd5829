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

//! Tracking of the deposit status of exported objects.

use crate::agency::RegistrationAgency;
use crate::db;
use crate::driver::Driver;
use crate::messages::translate;
use crate::model::{DepositStatus, ExportObjects, ObjectType, Submission};
use log::info;
use pubexport_core::driver::DriverResult;
use serde::Serialize;

/// A published submission together with its deposit status for one plugin.
#[derive(Debug, PartialEq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionStatus {
    /// The submission.
    pub(crate) submission: Submission,

    /// Deposit status of the submission.
    pub(crate) status: DepositStatus,

    /// Display name of the deposit status.
    pub(crate) status_name: String,
}

impl Driver {
    /// Persists `status` as the deposit status of every object in `objects` for `agency`.
    pub(crate) async fn set_deposit_status(
        &self,
        agency: &(dyn RegistrationAgency + Send + Sync),
        objects: &ExportObjects,
        status: DepositStatus,
    ) -> DriverResult<()> {
        self.set_status_of(agency, &objects.refs(), status).await
    }

    /// Persists `status` as the deposit status of the objects identified by `refs` for `agency`.
    ///
    /// Every object is written on its own, without a transaction spanning the batch, so a failure
    /// leaves the objects that precede it updated.
    pub(crate) async fn set_status_of(
        &self,
        agency: &(dyn RegistrationAgency + Send + Sync),
        refs: &[(ObjectType, i64)],
        status: DepositStatus,
    ) -> DriverResult<()> {
        let setting = agency.status_setting();
        for (object_type, id) in refs {
            let mut ex = self.db.ex().await?;
            db::set_object_setting(&mut ex, *object_type, *id, &setting, status.as_str()).await?;
        }
        info!("Set {} of {} objects to {}", setting, refs.len(), status.as_str());
        Ok(())
    }

    /// Records that `objects` were registered with `agency` out of band.
    pub(crate) async fn mark_registered(
        self,
        agency: &(dyn RegistrationAgency + Send + Sync),
        objects: &ExportObjects,
    ) -> DriverResult<()> {
        self.set_deposit_status(agency, objects, DepositStatus::MarkedRegistered).await
    }

    /// Lists the published submissions of `server_path` whose deposit status with `plugin`
    /// matches `status`.
    pub(crate) async fn list_submissions(
        self,
        server_path: &str,
        plugin: &str,
        status: DepositStatus,
    ) -> DriverResult<Vec<SubmissionStatus>> {
        let agency = self.agency(plugin)?;
        let mut ex = self.db.ex().await?;
        let server = self.server(&mut ex, server_path).await?;
        let submissions =
            db::get_exportable_submissions(&mut ex, *server.id(), &agency.status_setting(), status)
                .await?;
        Ok(submissions
            .into_iter()
            .map(|(submission, status)| SubmissionStatus {
                submission,
                status,
                status_name: translate(status.message_key(), None),
            })
            .collect())
    }

    /// Returns the published submissions of `server_path` that were never deposited with
    /// `plugin`.
    pub(crate) async fn get_unregistered_preprints(
        self,
        server_path: &str,
        plugin: &str,
    ) -> DriverResult<Vec<Submission>> {
        let statuses =
            self.list_submissions(server_path, plugin, DepositStatus::NotDeposited).await?;
        Ok(statuses.into_iter().map(|s| s.submission).collect())
    }
}
