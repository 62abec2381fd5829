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

//! REST interface for the export and deposit service.

use crate::driver::Driver;
use crate::model::UserId;
use axum::Router;
use axum::http::HeaderMap;
use pubexport_core::rest::{RestError, RestResult, get_unique_header};

mod galley_file_put;
mod notifications_get;
mod plugin_export_post;
mod plugin_get;
mod plugin_settings_get;
mod plugin_settings_put;
mod plugin_submissions_get;
mod plugin_unregistered_get;
mod preprint_download_get;
mod preprint_get;
mod publication_delete;
mod publication_publish_post;
mod publication_relation_put;
mod relations_get;
mod submission_publications_post;
mod submission_versions_post;
#[cfg(test)]
mod testutils;

/// Name of the header in which the authenticating front end passes the identity of the user.
pub(crate) const USER_ID_HEADER: &str = "x-user-id";

/// Extracts the identity of the requesting user from the `headers`, if any.
pub(crate) fn get_user(headers: &HeaderMap) -> RestResult<Option<UserId>> {
    match get_unique_header(headers, USER_ID_HEADER)? {
        Some(value) => {
            let value = value.to_str().map_err(|e| {
                RestError::InvalidRequest(format!(
                    "Bad encoding in {} header: {}",
                    USER_ID_HEADER, e
                ))
            })?;
            Ok(Some(value.parse::<UserId>()?))
        }
        None => Ok(None),
    }
}

/// Extracts the identity of the requesting user from the `headers` and fails if there is none.
pub(crate) fn require_user(headers: &HeaderMap) -> RestResult<UserId> {
    match get_user(headers)? {
        Some(user) => Ok(user),
        None => Err(RestError::Unauthorized(format!("Missing {} header", USER_ID_HEADER))),
    }
}

/// Creates the router for the application.
pub fn app(driver: Driver) -> Router {
    use axum::routing::{delete, get, post, put};

    let plugin_router = Router::new()
        .route("/", get(plugin_get::handler))
        .route("/export", post(plugin_export_post::handler))
        .route("/settings", get(plugin_settings_get::handler).put(plugin_settings_put::handler))
        .route("/submissions", get(plugin_submissions_get::handler))
        .route("/unregistered", get(plugin_unregistered_get::handler));

    let server_router = Router::new()
        .nest("/plugins/:plugin", plugin_router)
        .route(
            "/submissions/:submission/publications",
            post(submission_publications_post::handler),
        )
        .route("/submissions/:submission/versions", post(submission_versions_post::handler))
        .route("/publications/:publication", delete(publication_delete::handler))
        .route("/publications/:publication/publish", post(publication_publish_post::handler))
        .route("/publications/:publication/relation", put(publication_relation_put::handler))
        .route("/galleys/:galley/file", put(galley_file_put::handler))
        .route("/preprints/:preprint", get(preprint_get::handler))
        .route("/preprints/:preprint/download/:galley", get(preprint_download_get::handler));

    Router::new()
        .route("/api/v1/notifications", get(notifications_get::handler))
        .route("/api/v1/relations", get(relations_get::handler))
        .nest("/api/v1/servers/:server", server_router)
        .with_state(driver)
}
