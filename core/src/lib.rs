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

//! Shared building blocks for the preprint export service.
//!
//! The service is organized in the following layers, and every crate that builds on top of this
//! one should define the same modules:
//!
//! 1.  `model`: High-level data types that represent concepts in the domain of the application,
//!     such as servers, submissions and galleys.  There should be no logic in here other than
//!     input validation.
//!
//! 1.  `db`: The persistence layer.  Operations are free functions that take an `Executor`, which
//!     may be backed by a pool connection or by an open transaction.
//!
//! 1.  `driver`: The business logic layer.  A `Driver` type encapsulates all of the in-memory
//!     state required by the app and coordinates access to the database and to external services.
//!
//! 1.  `rest`: The HTTP layer.  Every API is backed by a `Driver` and lives in its own file.
//!
//! 1.  `main`: The launcher.  Gathers configuration data from environment variables and calls
//!     into the library to start the server or to run a command-line operation.
//!
//! There are result and error types in every layer, such as `DbResult` and `DbError`.  Errors
//! float to the top of the app using the `?` operator, being translated to HTTP status codes or
//! to printed messages once they reach the outer layer.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod clocks;
pub mod db;
pub mod driver;
pub mod env;
pub mod model;
pub mod rest;
pub mod template;
