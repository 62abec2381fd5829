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

//! API to list the published submissions of a server along with their deposit status.

use crate::driver::Driver;
use crate::model::DepositStatus;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use pubexport_core::rest::{EmptyBody, RestError};
use serde::{Deserialize, Serialize};

/// Query parameters for this API.
#[derive(Default, Deserialize, Serialize)]
pub(crate) struct SubmissionsQuery {
    /// Deposit status to filter by.  Absent or empty means any status.
    #[serde(default)]
    pub(crate) status: Option<String>,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((server, plugin)): Path<(String, String)>,
    Query(query): Query<SubmissionsQuery>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let status = match query.status {
        Some(status) => DepositStatus::parse(&status)?,
        None => DepositStatus::Any,
    };
    let submissions = driver.list_submissions(&server, &plugin, status).await?;
    Ok(Json(submissions))
}
