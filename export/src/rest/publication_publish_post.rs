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

//! API to publish a publication.

use crate::driver::Driver;
use crate::model::PublicationId;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use pubexport_core::rest::{EmptyBody, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((server, publication)): Path<(String, PublicationId)>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let publication = driver.publish(&server, publication).await?;
    Ok(Json(publication))
}

#[cfg(test)]
mod tests {
    use crate::db;
    use crate::model::*;
    use crate::rest::testutils::*;
    use axum::http;
    use pubexport_core::rest::testutils::*;
    use pubexport_core::test_payload_must_be_empty;
    use time::macros::date;

    fn route(server: &str, publication: i64) -> (http::Method, String) {
        let uri = format!("/api/v1/servers/{}/publications/{}/publish", server, publication);
        (http::Method::POST, uri)
    }

    #[tokio::test]
    async fn test_publish_new_version() {
        let mut context = TestContext::setup().await;
        let p = context.put_preprint(PublicationStatus::Published, None).await;
        let new = context.driver().create_version("test", *p.submission().id()).await.unwrap();

        let response = OneShotBuilder::new(context.app(), route("test", new.id().as_i64()))
            .send_empty()
            .await
            .expect_json::<Publication>()
            .await;
        assert_eq!(PublicationStatus::Published, *response.status());
        assert_eq!(Some(date!(2023 - 07 - 15)), *response.date_published());

        let submission =
            db::get_submission(&mut context.ex().await, *p.submission().id()).await.unwrap();
        assert_eq!(Some(*new.id()), *submission.current_publication_id());
    }

    #[tokio::test]
    async fn test_publish_defaults_to_today() {
        let mut context = TestContext::setup().await;
        let server_id = *context.server().id();
        let submission = db::put_submission(
            &mut context.ex().await,
            server_id,
            PublicationStatus::Queued,
            None,
        )
        .await
        .unwrap();
        let publication = context
            .driver()
            .add_publication("test", *submission.id(), NewPublication::new("T"))
            .await
            .unwrap();

        let response = OneShotBuilder::new(context.app(), route("test", publication.id().as_i64()))
            .send_empty()
            .await
            .expect_json::<Publication>()
            .await;
        assert_eq!(PublicationStatus::Published, *response.status());
        assert_eq!(Some(date!(2023 - 07 - 15)), *response.date_published());
    }

    #[tokio::test]
    async fn test_unknown_publication() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route("test", 123))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Publication 123 not found")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route("test", 1));
}
