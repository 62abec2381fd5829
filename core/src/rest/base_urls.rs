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

//! The `BaseUrls` type.

use crate::env::{get_optional_var, get_required_var};
use url::Url;

/// Common error message for URLs built via hardcoded values.
const URL_MUST_BE_VALID: &str = "URLs built in-process must be valid";

/// Checks if `base` has the right format to be a base URL and returns an error if it is not.
fn ensure_valid_base(base: &Url) -> Result<(), String> {
    if base.cannot_be_a_base() || !base.path().ends_with('/') {
        return Err(format!("URL '{}' cannot be a base: missing trailing slash", base));
    }
    Ok(())
}

/// Contains the backend and frontend base URLs of the service and allows building absolute URLs
/// within either.
///
/// The backend is where the REST API lives and is used to compute redirection targets.  The
/// frontend is where readers reach the public pages of a server, such as preprint landing pages,
/// and is what gets registered with DOI agencies.  When the frontend is unset, the backend serves
/// both roles.
#[cfg_attr(test, derive(Debug, Eq, PartialEq))]
pub struct BaseUrls {
    /// The base URL to the backend service (ourselves).
    backend: Url,

    /// The base URL to the public frontend.  `None` if the frontend is served by us.
    frontend: Option<Url>,
}

impl BaseUrls {
    /// Creates a set of base URLs from already-parsed URLs.
    pub fn new(backend: Url, frontend: Option<Url>) -> Result<Self, String> {
        ensure_valid_base(&backend)?;
        if let Some(frontend) = frontend.as_ref() {
            ensure_valid_base(frontend)?;
        }
        Ok(Self { backend, frontend })
    }

    /// Creates a set of base URLs from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_BACKEND_BASE_URL`, `<prefix>_FRONTEND_BASE_URL`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let backend = get_required_var::<Url>(prefix, "BACKEND_BASE_URL")?;
        let frontend = get_optional_var::<Url>(prefix, "FRONTEND_BASE_URL")?;
        Self::new(backend, frontend)
    }

    /// Creates a set of base URLs from fixed strings, which must represent valid URLs.
    #[cfg(any(test, feature = "testutils"))]
    pub fn from_strs(backend: &'static str, frontend: Option<&'static str>) -> Self {
        let backend = Url::parse(backend).unwrap();
        let frontend = frontend.map(|s| Url::parse(s).unwrap());
        Self::new(backend, frontend).unwrap()
    }

    /// Generates a URL to the backend given a `path`, which must be relative.  The `path` can be
    /// empty to obtain a reference to the root.
    pub fn make_backend_url(&self, path: &str) -> Url {
        assert!(!path.starts_with('/'));
        self.backend.join(path).expect(URL_MUST_BE_VALID)
    }

    /// Generates a URL to the frontend given a `path`, which must be relative.  The `path` can be
    /// empty to obtain a reference to the root.
    pub fn make_frontend_url(&self, path: &str) -> Url {
        assert!(!path.starts_with('/'));
        self.frontend.as_ref().unwrap_or(&self.backend).join(path).expect(URL_MUST_BE_VALID)
    }
}
