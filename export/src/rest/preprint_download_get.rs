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

//! API to download the file of a galley of a published preprint.

use crate::driver::{Driver, GalleyDownload};
use crate::model::{PublicationId, SubmissionFileId};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use pubexport_core::rest::{EmptyBody, RestError};
use serde::{Deserialize, Serialize};

/// Query parameters for this API.
#[derive(Default, Deserialize, Serialize)]
pub(crate) struct DownloadQuery {
    /// Publication that holds the galley, if not the current one.
    #[serde(default)]
    pub(crate) version: Option<PublicationId>,

    /// Dependent file of the galley to return instead of the galley file.
    #[serde(default)]
    pub(crate) file: Option<SubmissionFileId>,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((server, preprint, galley)): Path<(String, String, String)>,
    Query(query): Query<DownloadQuery>,
    _: EmptyBody,
) -> Result<Response, RestError> {
    match driver.get_download(&server, &preprint, &galley, query.version, query.file).await? {
        GalleyDownload::Redirect(url) => Ok(Redirect::to(&url).into_response()),
        GalleyDownload::File { name, mime_type, contents } => Ok((
            [
                (header::CONTENT_TYPE, mime_type),
                (header::CONTENT_DISPOSITION, format!("inline; filename=\"{}\"", name)),
            ],
            contents,
        )
            .into_response()),
    }
}
