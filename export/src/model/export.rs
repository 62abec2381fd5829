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

//! Exportable objects as resolved by the object selector.

use crate::model::{Galley, ObjectType, Publication, Submission};
use derive_getters::Getters;

/// A published submission together with its current publication and galleys.
#[derive(Clone, Debug, Getters, PartialEq)]
pub struct Preprint {
    /// The submission.
    submission: Submission,

    /// The current publication of the submission.
    publication: Publication,

    /// The galleys of the current publication.
    galleys: Vec<Galley>,
}

impl Preprint {
    /// Creates a new preprint.
    pub fn new(submission: Submission, publication: Publication, galleys: Vec<Galley>) -> Self {
        Self { submission, publication, galleys }
    }
}

/// A galley together with the submission and publication it belongs to.
#[derive(Clone, Debug, Getters, PartialEq)]
pub struct ExportGalley {
    /// The galley.
    galley: Galley,

    /// The submission that owns the galley.
    submission: Submission,

    /// The publication that owns the galley.
    publication: Publication,
}

impl ExportGalley {
    /// Creates a new exportable galley.
    pub fn new(galley: Galley, submission: Submission, publication: Publication) -> Self {
        Self { galley, submission, publication }
    }
}

/// A homogeneous batch of exportable objects.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportObjects {
    /// A batch of preprints.
    Preprints(Vec<Preprint>),

    /// A batch of galleys.
    Galleys(Vec<ExportGalley>),
}

impl ExportObjects {
    /// Returns the number of objects in the batch.
    pub fn len(&self) -> usize {
        match self {
            ExportObjects::Preprints(preprints) => preprints.len(),
            ExportObjects::Galleys(galleys) => galleys.len(),
        }
    }

    /// Returns true if the batch has no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the name of the objects in the batch as used in export file names and on the
    /// command line.
    pub fn file_part(&self) -> &'static str {
        match self {
            ExportObjects::Preprints(_) => "preprints",
            ExportObjects::Galleys(_) => "galleys",
        }
    }

    /// Returns the type and identifier of every object in the batch, in order.
    pub fn refs(&self) -> Vec<(ObjectType, i64)> {
        match self {
            ExportObjects::Preprints(preprints) => preprints
                .iter()
                .map(|p| (ObjectType::Submission, p.submission().id().as_i64()))
                .collect(),
            ExportObjects::Galleys(galleys) => galleys
                .iter()
                .map(|g| (ObjectType::Galley, g.galley().id().as_i64()))
                .collect(),
        }
    }

    /// Splits the batch into single-object batches, in order.
    pub fn singles(&self) -> Vec<ExportObjects> {
        match self {
            ExportObjects::Preprints(preprints) => {
                preprints.iter().map(|p| ExportObjects::Preprints(vec![p.clone()])).collect()
            }
            ExportObjects::Galleys(galleys) => {
                galleys.iter().map(|g| ExportObjects::Galleys(vec![g.clone()])).collect()
            }
        }
    }
}
