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

//! API to get the landing page of a published preprint.

use crate::driver::{Driver, Landing};
use crate::model::PublicationId;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use pubexport_core::rest::{EmptyBody, RestError};
use serde::{Deserialize, Serialize};

/// Query parameters for this API.
#[derive(Default, Deserialize, Serialize)]
pub(crate) struct LandingQuery {
    /// Older version of the preprint to show instead of the current one.
    #[serde(default)]
    pub(crate) version: Option<PublicationId>,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((server, preprint)): Path<(String, String)>,
    Query(query): Query<LandingQuery>,
    _: EmptyBody,
) -> Result<Response, RestError> {
    match driver.get_landing(&server, &preprint, query.version).await? {
        Landing::Redirect(url) => Ok(Redirect::to(url.as_str()).into_response()),
        Landing::Page(page) => Ok(Json(page).into_response()),
    }
}
