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

//! API to upload the file of a galley.

use crate::driver::Driver;
use crate::model::GalleyId;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;
use pubexport_core::rest::{RestError, get_unique_header};
use serde::{Deserialize, Serialize};

/// MIME type to assume when the upload does not specify one.
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Query parameters for this API.
#[derive(Deserialize, Serialize)]
pub(crate) struct FileQuery {
    /// Display name of the uploaded file.
    pub(crate) name: String,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((server, galley)): Path<(String, GalleyId)>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, RestError> {
    let mime_type = match get_unique_header(&headers, &header::CONTENT_TYPE)? {
        Some(value) => value.to_str().map_err(|e| {
            RestError::InvalidRequest(format!("Invalid {} header: {}", header::CONTENT_TYPE, e))
        })?,
        None => DEFAULT_MIME_TYPE,
    };

    let file = driver.store_galley_file(&server, galley, &query.name, mime_type, &body).await?;
    Ok(Json(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::*;
    use crate::rest::testutils::*;
    use axum::http;
    use pubexport_core::rest::testutils::*;

    fn route(server: &str, galley: i64) -> (http::Method, String) {
        (http::Method::PUT, format!("/api/v1/servers/{}/galleys/{}/file", server, galley))
    }

    /// Builds the query to upload a file called `name`.
    fn query(name: &str) -> FileQuery {
        FileQuery { name: name.to_owned() }
    }

    #[tokio::test]
    async fn test_ok() {
        let mut context = TestContext::setup().await;
        let p = context.put_preprint(PublicationStatus::Published, None).await;
        let galley_id = *p.galleys()[0].id();

        let response = OneShotBuilder::new(context.app(), route("test", galley_id.as_i64()))
            .with_query(query("paper.pdf"))
            .send_bytes("application/pdf", &b"%PDF-1.4"[..])
            .await
            .expect_json::<SubmissionFile>()
            .await;
        assert_eq!("paper.pdf", response.name());
        assert_eq!("application/pdf", response.mime_type());
        assert_eq!(&Some(FileAssoc::Galley(galley_id)), response.assoc());
        assert_eq!(
            b"%PDF-1.4".to_vec(),
            std::fs::read(context.files_dir().join(response.path())).unwrap()
        );

        let galley = db::get_galley(&mut context.ex().await, galley_id).await.unwrap();
        assert_eq!(Some(*response.id()), *galley.submission_file_id());
    }

    #[tokio::test]
    async fn test_default_mime_type() {
        let mut context = TestContext::setup().await;
        let p = context.put_preprint(PublicationStatus::Published, None).await;

        let galley_id = p.galleys()[0].id().as_i64();

        let response = OneShotBuilder::new(context.app(), route("test", galley_id))
            .with_query(query("data.bin"))
            .send_empty()
            .await
            .expect_json::<SubmissionFile>()
            .await;
        assert_eq!(DEFAULT_MIME_TYPE, response.mime_type());
    }

    #[tokio::test]
    async fn test_invalid_name() {
        let mut context = TestContext::setup().await;
        let p = context.put_preprint(PublicationStatus::Published, None).await;

        OneShotBuilder::new(context.app(), route("test", p.galleys()[0].id().as_i64()))
            .with_query(query("../escape.pdf"))
            .send_bytes("application/pdf", &b"x"[..])
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("Invalid file name")
            .await;
    }

    #[tokio::test]
    async fn test_unknown_galley() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route("test", 999))
            .with_query(query("paper.pdf"))
            .send_bytes("application/pdf", &b"x"[..])
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Galley 999 not found")
            .await;
    }
}
