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

//! API to add a publication to a submission.

use crate::driver::Driver;
use crate::model::{NewPublication, SubmissionId};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use pubexport_core::rest::RestError;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((server, submission)): Path<(String, SubmissionId)>,
    Json(metadata): Json<NewPublication>,
) -> Result<impl IntoResponse, RestError> {
    let publication = driver.add_publication(&server, submission, metadata).await?;
    Ok((StatusCode::CREATED, Json(publication)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::*;
    use crate::rest::testutils::*;
    use axum::http;
    use pubexport_core::rest::testutils::*;
    use pubexport_core::test_payload_must_be_json;

    fn route(server: &str, submission: i64) -> (http::Method, String) {
        let uri = format!("/api/v1/servers/{}/submissions/{}/publications", server, submission);
        (http::Method::POST, uri)
    }

    #[tokio::test]
    async fn test_first_publication() {
        let mut context = TestContext::setup().await;
        context.set_plugin_setting("doi", "doiPrefix", "10.9999").await;
        context.set_plugin_setting("doi", "enablePublicationDoiAutoAssign", "1").await;
        let server_id = *context.server().id();
        let submission = db::put_submission(
            &mut context.ex().await,
            server_id,
            PublicationStatus::Queued,
            None,
        )
        .await
        .unwrap();

        let response = OneShotBuilder::new(context.app(), route("test", submission.id().as_i64()))
            .send_json(NewPublication::new("A title"))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<Publication>()
            .await;
        assert_eq!("A title", response.title());
        assert_eq!(1, *response.version());
        assert_eq!(PublicationStatus::Queued, *response.status());
        assert_eq!(Some(format!("10.9999/test.{}", submission.id())), *response.doi());

        let submission =
            db::get_submission(&mut context.ex().await, *submission.id()).await.unwrap();
        assert_eq!(Some(*response.id()), *submission.current_publication_id());
    }

    #[tokio::test]
    async fn test_unknown_submission() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route("test", 404))
            .send_json(NewPublication::new("A title"))
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Submission 404 not found")
            .await;
    }

    #[tokio::test]
    async fn test_bad_submission_id() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(
            context.app(),
            (http::Method::POST, "/api/v1/servers/test/submissions/abc/publications"),
        )
        .send_json(NewPublication::new("A title"))
        .await
        .take_response()
        .await;
        assert_eq!(http::StatusCode::BAD_REQUEST, response.status());
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route("test", 1));
}
