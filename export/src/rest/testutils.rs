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

//! Test utilities for the REST API.

use crate::agency::testutils::MockAgency;
use crate::driver::testutils::TestContext as DriverTestContext;
use crate::rest::app;
use axum::Router;
use std::ops::{Deref, DerefMut};

/// State of a running REST test.
///
/// This wraps the driver's test context so that tests can prepare and inspect the backing state
/// directly while issuing requests against the app.
pub(crate) struct TestContext {
    /// Context of the driver that backs the app.
    inner: DriverTestContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app on top of a driver test context with the default mock agency.
    pub(crate) async fn setup() -> Self {
        Self::setup_with_agency(MockAgency::new("mock")).await
    }

    /// Same as `setup` but using a custom `agency` as the `mock` plugin.
    pub(crate) async fn setup_with_agency(agency: MockAgency) -> Self {
        let inner = DriverTestContext::setup_with_agency(agency).await;
        let app = app(inner.driver());
        Self { inner, app }
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and transforms it into the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }
}

impl Deref for TestContext {
    type Target = DriverTestContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for TestContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
