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

//! API to export, deposit or mark as registered a selection of objects.

use crate::driver::{ActionOutcome, ActionRequest, Driver};
use crate::filter::XmlDiagnostic;
use crate::messages::{INVALID_XML, translate};
use crate::rest::get_user;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pubexport_core::rest::RestError;
use serde::Serialize;

/// Response returned when the exported document is not well-formed.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub(crate) struct InvalidXmlResponse {
    /// Human-readable summary of the problem.
    pub(crate) message: String,

    /// Problems found in the document.
    #[cfg_attr(test, serde(skip_deserializing))]
    pub(crate) diagnostics: Vec<XmlDiagnostic>,

    /// The document as produced by the filter.
    pub(crate) xml: String,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((server, plugin)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<ActionRequest>,
) -> Result<Response, RestError> {
    let user = get_user(&headers)?;

    let response = match driver.execute_action(&server, &plugin, user, request).await? {
        ActionOutcome::Download { file_name, xml } => (
            [
                (header::CONTENT_TYPE, "application/xml".to_owned()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
            ],
            xml,
        )
            .into_response(),

        ActionOutcome::Invalid(exported) => {
            let response = InvalidXmlResponse {
                message: translate(INVALID_XML, None),
                diagnostics: exported.diagnostics,
                xml: exported.xml,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(response)).into_response()
        }

        ActionOutcome::Redirect(url) => {
            (StatusCode::SEE_OTHER, [(header::LOCATION, url.to_string())]).into_response()
        }
    };
    Ok(response)
}
