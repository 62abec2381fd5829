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

//! Deposit of exported documents with registration agencies.

use crate::agency::{DepositError, DepositOutcome, RegistrationAgency};
use crate::driver::Driver;
use crate::filter::ExportDeployment;
use crate::messages::{REGISTER_SUCCESS, translate};
use crate::model::{DepositStatus, ExportObjects, NotificationLevel, UserId};
use log::{info, warn};
use pubexport_core::driver::DriverResult;

/// Renders the user-visible messages that describe `outcome`, in order.
pub(crate) fn outcome_messages(outcome: &DepositOutcome) -> Vec<(NotificationLevel, String)> {
    let error_messages = |errors: &[DepositError]| -> Vec<(NotificationLevel, String)> {
        errors
            .iter()
            .map(|e| (NotificationLevel::Error, translate(&e.key, e.param.as_deref())))
            .collect()
    };
    match outcome {
        DepositOutcome::Registered => {
            vec![(NotificationLevel::Success, translate(REGISTER_SUCCESS, None))]
        }
        DepositOutcome::Errors(errors) => error_messages(errors),
        DepositOutcome::Partial { errors, .. } => error_messages(errors),
        DepositOutcome::Failed(_) => error_messages(&[DepositError::opaque()]),
    }
}

impl Driver {
    /// Deposits `objects`, already exported as `xml`, with `agency`.
    ///
    /// The document is handed to the agency through a temporary file that only exists for the
    /// duration of this call.  Objects become `Registered` when the agency accepts them, even if
    /// it rejects others in the same batch.
    pub(crate) async fn deposit_xml(
        &self,
        agency: &(dyn RegistrationAgency + Send + Sync),
        objects: &ExportObjects,
        deployment: &ExportDeployment,
        file_name: &str,
        xml: &str,
    ) -> DriverResult<DepositOutcome> {
        let outcome = {
            let file = self.write_temp_xml(file_name, xml).await?;
            agency.deposit(objects, deployment, file.path()).await
        };

        match &outcome {
            DepositOutcome::Registered => {
                info!("{} accepted {} objects", agency.plugin_name(), objects.len());
                self.set_deposit_status(agency, objects, DepositStatus::Registered).await?;
            }
            DepositOutcome::Errors(errors) => {
                info!("{} rejected deposit with {} errors", agency.plugin_name(), errors.len());
            }
            DepositOutcome::Partial { registered, errors } => {
                info!(
                    "{} accepted {} objects and rejected {}",
                    agency.plugin_name(),
                    registered.len(),
                    errors.len()
                );
                self.set_status_of(agency, registered, DepositStatus::Registered).await?;
            }
            DepositOutcome::Failed(msg) => {
                warn!("Deposit with {} failed: {}", agency.plugin_name(), msg);
            }
        }
        Ok(outcome)
    }

    /// Delivers one notification to `user` per message that describes `outcome`.
    pub(crate) async fn notify_outcome(
        &self,
        user: UserId,
        outcome: &DepositOutcome,
    ) -> DriverResult<()> {
        for (level, contents) in outcome_messages(outcome) {
            self.notifier.notify(user, level, contents).await?;
        }
        Ok(())
    }
}
