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

//! Numeric identifiers of the persisted entities.

use derive_more::Display;
use pubexport_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Defines a newtype over a database-assigned `i64` identifier.
macro_rules! define_id [
    ( $(#[$doc:meta])* $name:ident ) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
            Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier for storage purposes.
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> ModelResult<Self> {
                match s.trim().parse::<i64>() {
                    Ok(id) => Ok(Self(id)),
                    Err(e) => Err(ModelError(format!("Invalid identifier '{}': {}", s, e))),
                }
            }
        }
    }
];

define_id!(
    /// Identifier of a server (the context that owns submissions, files and settings).
    ServerId
);

define_id!(
    /// Identifier of a submission.
    SubmissionId
);

define_id!(
    /// Identifier of a single version of the metadata of a submission.
    PublicationId
);

define_id!(
    /// Identifier of a galley, which is one representation (PDF, HTML...) of a publication.
    GalleyId
);

define_id!(
    /// Identifier of a stored file.
    SubmissionFileId
);

define_id!(
    /// Identifier of a user as asserted by the authenticating front end.
    UserId
);
