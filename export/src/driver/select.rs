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

//! Resolution of object identifiers into exportable objects.

use crate::db;
use crate::model::{
    ExportGalley, ExportObjects, GalleyId, ObjectType, Preprint, PublicationStatus, ServerId,
    SubmissionId,
};
use log::debug;
use pubexport_core::db::{DbError, DbResult, Executor};
use pubexport_core::driver::DriverResult;

/// Converts a lookup result into an option, treating missing entities as absent.
fn found<T>(result: DbResult<T>) -> DbResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DbError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolves the preprint with submission `id` if it exists in `server_id` and is published.
async fn select_preprint(
    ex: &mut Executor,
    server_id: ServerId,
    id: SubmissionId,
) -> DbResult<Option<Preprint>> {
    let submission = match found(db::get_submission(ex, id).await)? {
        Some(submission) => submission,
        None => return Ok(None),
    };
    if *submission.server_id() != server_id || *submission.status() != PublicationStatus::Published
    {
        return Ok(None);
    }

    let publication = match submission.current_publication_id() {
        Some(publication_id) => match found(db::get_publication(ex, *publication_id).await)? {
            Some(publication) => publication,
            None => return Ok(None),
        },
        None => return Ok(None),
    };
    let galleys = db::get_galleys(ex, *publication.id()).await?;

    Ok(Some(Preprint::new(submission, publication, galleys)))
}

/// Resolves the galley `id` with the objects it belongs to, if they all exist.
async fn select_galley(ex: &mut Executor, id: GalleyId) -> DbResult<Option<ExportGalley>> {
    let galley = match found(db::get_galley(ex, id).await)? {
        Some(galley) => galley,
        None => return Ok(None),
    };
    let publication = match found(db::get_publication(ex, *galley.publication_id()).await)? {
        Some(publication) => publication,
        None => return Ok(None),
    };
    let submission = match found(db::get_submission(ex, *publication.submission_id()).await)? {
        Some(submission) => submission,
        None => return Ok(None),
    };
    Ok(Some(ExportGalley::new(galley, submission, publication)))
}

/// Resolves the submission `ids` into the preprints that exist in `server_id` and are published.
///
/// Identifiers that do not match are dropped silently and the order of the input is preserved.
pub(crate) async fn select_preprints(
    ex: &mut Executor,
    server_id: ServerId,
    ids: &[SubmissionId],
) -> DriverResult<Vec<Preprint>> {
    let mut preprints = Vec::with_capacity(ids.len());
    for id in ids {
        match select_preprint(ex, server_id, *id).await? {
            Some(preprint) => preprints.push(preprint),
            None => debug!("Dropping submission {} from selection", id),
        }
    }
    Ok(preprints)
}

/// Resolves the galley `ids` into the galleys that exist.
///
/// Galleys are selected by existence only.  Identifiers that do not match are dropped silently
/// and the order of the input is preserved.
pub(crate) async fn select_galleys(
    ex: &mut Executor,
    ids: &[GalleyId],
) -> DriverResult<Vec<ExportGalley>> {
    let mut galleys = Vec::with_capacity(ids.len());
    for id in ids {
        match select_galley(ex, *id).await? {
            Some(galley) => galleys.push(galley),
            None => debug!("Dropping galley {} from selection", id),
        }
    }
    Ok(galleys)
}

/// Resolves the raw `ids` of objects of `object_type` into a batch of exportable objects.
pub(crate) async fn select_objects(
    ex: &mut Executor,
    server_id: ServerId,
    object_type: ObjectType,
    ids: &[i64],
) -> DriverResult<ExportObjects> {
    match object_type {
        ObjectType::Submission => {
            let ids = ids.iter().copied().map(SubmissionId::new).collect::<Vec<_>>();
            Ok(ExportObjects::Preprints(select_preprints(ex, server_id, &ids).await?))
        }
        ObjectType::Galley => {
            let ids = ids.iter().copied().map(GalleyId::new).collect::<Vec<_>>();
            Ok(ExportObjects::Galleys(select_galleys(ex, &ids).await?))
        }
    }
}
