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

//! API to get the settings of a plugin.

use crate::driver::Driver;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use pubexport_core::rest::{EmptyBody, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((server, plugin)): Path<(String, String)>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let settings = driver.get_settings(&server, &plugin).await?;
    Ok(Json(settings))
}

#[cfg(test)]
mod tests {
    use crate::model::PluginSettings;
    use crate::rest::testutils::*;
    use axum::http;
    use pubexport_core::rest::testutils::*;
    use pubexport_core::test_payload_must_be_empty;

    fn route(server: &str, plugin: &str) -> (http::Method, String) {
        (http::Method::GET, format!("/api/v1/servers/{}/plugins/{}/settings", server, plugin))
    }

    #[tokio::test]
    async fn test_empty() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), route("test", "mock"))
            .send_empty()
            .await
            .expect_json::<PluginSettings>()
            .await;
        assert_eq!(PluginSettings::default(), response);
    }

    #[tokio::test]
    async fn test_raw_values() {
        let mut context = TestContext::setup().await;
        context.set_mock_credentials().await;
        context.set_plugin_setting("mock", "testMode", "on").await;

        let response = OneShotBuilder::new(context.app(), route("test", "mock"))
            .send_empty()
            .await
            .expect_json::<PluginSettings>()
            .await;
        let exp: PluginSettings = [("password", "pass"), ("testMode", "on"), ("username", "user")]
            .into_iter()
            .collect();
        assert_eq!(exp, response);
    }

    #[tokio::test]
    async fn test_settings_are_per_plugin() {
        let mut context = TestContext::setup().await;
        context.set_plugin_setting("doi", "doiPrefix", "10.9999").await;

        let response = OneShotBuilder::new(context.app(), route("test", "mock"))
            .send_empty()
            .await
            .expect_json::<PluginSettings>()
            .await;
        assert_eq!(PluginSettings::default(), response);
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route("other", "mock"))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Unknown server other")
            .await;

        OneShotBuilder::new(context.app(), route("test", "other"))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Unknown plugin other")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route("test", "mock"));
}
