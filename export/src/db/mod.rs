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

//! Database abstraction for servers, submissions, their exportable objects and their settings.

use crate::model::{
    Author, DepositStatus, EmailAddress, FileAssoc, FileStage, Galley, GalleyId, NewGalley,
    NewPublication, NewSubmissionFile, Notification, NotificationLevel, ObjectType,
    PluginSettings, Publication, PublicationId, PublicationStatus, RelationStatus, Server,
    ServerId, Submission, SubmissionFile, SubmissionFileId, SubmissionId, UserId,
};
use futures::TryStreamExt;
#[cfg(feature = "postgres")]
use pubexport_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use pubexport_core::db::sqlite::{self, build_timestamp, unpack_timestamp};
use pubexport_core::db::{DbError, DbResult, Executor, ensure_one_update, ensure_one_upsert};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use time::{Date, OffsetDateTime};


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Implements the conversion from the row types of every enabled backend into `$type`.
///
/// The `$body` is instantiated once per backend with `$row` bound to the row and `$map_err` bound
/// to the backend's error mapping function.  Columns must decode to the same Rust types in all
/// backends for this to work.
macro_rules! impl_try_from_row [
    ( $type:ty, |$row:ident, $map_err:ident| $body:block ) => {
        #[cfg(feature = "postgres")]
        impl TryFrom<PgRow> for $type {
            type Error = DbError;

            fn try_from($row: PgRow) -> DbResult<Self> {
                let $map_err = postgres::map_sqlx_error;
                $body
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        impl TryFrom<SqliteRow> for $type {
            type Error = DbError;

            fn try_from($row: SqliteRow) -> DbResult<Self> {
                let $map_err = sqlite::map_sqlx_error;
                $body
            }
        }
    }
];

/// Parses the JSON representation of a list of authors as stored in the database.
fn parse_authors(raw: &str) -> DbResult<Vec<Author>> {
    serde_json::from_str(raw)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid authors list: {}", e)))
}

/// Formats a list of authors for storage in the database.
fn format_authors(authors: &[Author]) -> DbResult<String> {
    serde_json::to_string(authors)
        .map_err(|e| DbError::BackendError(format!("Cannot serialize authors: {}", e)))
}

/// Reconstructs the association of a file from its persisted columns.
fn build_file_assoc(
    assoc_type: Option<String>,
    assoc_id: Option<i64>,
) -> DbResult<Option<FileAssoc>> {
    match (assoc_type.as_deref(), assoc_id) {
        (None, None) => Ok(None),
        (Some("galley"), Some(id)) => Ok(Some(FileAssoc::Galley(GalleyId::new(id)))),
        (Some("submissionFile"), Some(id)) => {
            Ok(Some(FileAssoc::SubmissionFile(SubmissionFileId::new(id))))
        }
        (assoc_type, assoc_id) => Err(DbError::DataIntegrityError(format!(
            "Invalid file association {:?}/{:?}",
            assoc_type, assoc_id
        ))),
    }
}

/// Splits the association of a file into its persisted columns.
fn unpack_file_assoc(assoc: Option<FileAssoc>) -> (Option<&'static str>, Option<i64>) {
    match assoc {
        None => (None, None),
        Some(FileAssoc::Galley(id)) => (Some("galley"), Some(id.as_i64())),
        Some(FileAssoc::SubmissionFile(id)) => (Some("submissionFile"), Some(id.as_i64())),
    }
}

impl_try_from_row!(Server, |row, map_err| {
    let id: i64 = row.try_get("id").map_err(map_err)?;
    let path: String = row.try_get("path").map_err(map_err)?;
    let name: String = row.try_get("name").map_err(map_err)?;
    let contact_email: Option<String> = row.try_get("contact_email").map_err(map_err)?;

    let mut server = Server::new(ServerId::new(id), path, name);
    if let Some(email) = contact_email {
        server = server.with_contact_email(EmailAddress::new(email)?);
    }
    Ok(server)
});

impl_try_from_row!(Submission, |row, map_err| {
    let id: i64 = row.try_get("id").map_err(map_err)?;
    let server_id: i64 = row.try_get("server_id").map_err(map_err)?;
    let status: i16 = row.try_get("status").map_err(map_err)?;
    let url_path: Option<String> = row.try_get("url_path").map_err(map_err)?;
    let current_publication_id: Option<i64> =
        row.try_get("current_publication_id").map_err(map_err)?;

    let mut submission = Submission::new(
        SubmissionId::new(id),
        ServerId::new(server_id),
        PublicationStatus::from_i16(status)?,
    )
    .with_current_publication(current_publication_id.map(PublicationId::new));
    if let Some(url_path) = url_path {
        submission = submission.with_url_path(url_path);
    }
    Ok(submission)
});

impl_try_from_row!(Publication, |row, map_err| {
    let id: i64 = row.try_get("id").map_err(map_err)?;
    let submission_id: i64 = row.try_get("submission_id").map_err(map_err)?;
    let version: i32 = row.try_get("version").map_err(map_err)?;
    let status: i16 = row.try_get("status").map_err(map_err)?;
    let title: String = row.try_get("title").map_err(map_err)?;
    let abstract_text: Option<String> = row.try_get("abstract_text").map_err(map_err)?;
    let doi: Option<String> = row.try_get("doi").map_err(map_err)?;
    let license_url: Option<String> = row.try_get("license_url").map_err(map_err)?;
    let date_published: Option<Date> = row.try_get("date_published").map_err(map_err)?;
    let authors: String = row.try_get("authors").map_err(map_err)?;
    let relation_status: i16 = row.try_get("relation_status").map_err(map_err)?;
    let vor_doi: Option<String> = row.try_get("vor_doi").map_err(map_err)?;

    let metadata = NewPublication {
        title,
        abstract_text,
        license_url,
        date_published,
        authors: parse_authors(&authors)?,
    };
    Ok(Publication::new(
        PublicationId::new(id),
        SubmissionId::new(submission_id),
        version,
        PublicationStatus::from_i16(status)?,
        metadata,
    )
    .with_doi(doi)
    .with_relation(RelationStatus::from_i16(relation_status)?, vor_doi))
});

impl_try_from_row!(Galley, |row, map_err| {
    let id: i64 = row.try_get("id").map_err(map_err)?;
    let publication_id: i64 = row.try_get("publication_id").map_err(map_err)?;
    let label: String = row.try_get("label").map_err(map_err)?;
    let locale: Option<String> = row.try_get("locale").map_err(map_err)?;
    let url_path: Option<String> = row.try_get("url_path").map_err(map_err)?;
    let url_remote: Option<String> = row.try_get("url_remote").map_err(map_err)?;
    let submission_file_id: Option<i64> = row.try_get("submission_file_id").map_err(map_err)?;
    let is_approved: bool = row.try_get("is_approved").map_err(map_err)?;
    let doi: Option<String> = row.try_get("doi").map_err(map_err)?;

    let metadata = NewGalley {
        label,
        locale,
        url_path,
        url_remote,
        submission_file_id: submission_file_id.map(SubmissionFileId::new),
        is_approved,
        doi,
    };
    Ok(Galley::new(GalleyId::new(id), PublicationId::new(publication_id), metadata))
});

impl_try_from_row!(SubmissionFile, |row, map_err| {
    let id: i64 = row.try_get("id").map_err(map_err)?;
    let submission_id: i64 = row.try_get("submission_id").map_err(map_err)?;
    let file_stage: i16 = row.try_get("file_stage").map_err(map_err)?;
    let assoc_type: Option<String> = row.try_get("assoc_type").map_err(map_err)?;
    let assoc_id: Option<i64> = row.try_get("assoc_id").map_err(map_err)?;
    let path: String = row.try_get("path").map_err(map_err)?;
    let name: String = row.try_get("name").map_err(map_err)?;
    let mime_type: String = row.try_get("mime_type").map_err(map_err)?;

    let metadata = NewSubmissionFile {
        file_stage: FileStage::from_i16(file_stage)?,
        assoc: build_file_assoc(assoc_type, assoc_id)?,
        path,
        name,
        mime_type,
    };
    Ok(SubmissionFile::new(SubmissionFileId::new(id), SubmissionId::new(submission_id), metadata))
});

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Notification {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let user_id: i64 = row.try_get("user_id").map_err(postgres::map_sqlx_error)?;
        let level: String = row.try_get("level").map_err(postgres::map_sqlx_error)?;
        let contents: String = row.try_get("contents").map_err(postgres::map_sqlx_error)?;
        let created: OffsetDateTime = row.try_get("created").map_err(postgres::map_sqlx_error)?;

        Ok(Notification::new(
            id,
            UserId::new(user_id),
            NotificationLevel::parse(&level)?,
            contents,
            created,
        ))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Notification {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let user_id: i64 = row.try_get("user_id").map_err(sqlite::map_sqlx_error)?;
        let level: String = row.try_get("level").map_err(sqlite::map_sqlx_error)?;
        let contents: String = row.try_get("contents").map_err(sqlite::map_sqlx_error)?;
        let created_secs: i64 = row.try_get("created_secs").map_err(sqlite::map_sqlx_error)?;
        let created_nsecs: i64 = row.try_get("created_nsecs").map_err(sqlite::map_sqlx_error)?;

        Ok(Notification::new(
            id,
            UserId::new(user_id),
            NotificationLevel::parse(&level)?,
            contents,
            build_timestamp(created_secs, created_nsecs)?,
        ))
    }
}

/// Creates a new server.
#[cfg(test)]
pub(crate) async fn put_server(
    ex: &mut Executor,
    path: &str,
    name: &str,
    contact_email: Option<&EmailAddress>,
) -> DbResult<Server> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO servers (path, name, contact_email) VALUES ($1, $2, $3) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(path)
                .bind(name)
                .bind(contact_email.map(EmailAddress::as_str))
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                "INSERT INTO servers (path, name, contact_email) VALUES (?, ?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(path)
                .bind(name)
                .bind(contact_email.map(EmailAddress::as_str))
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    let mut server = Server::new(ServerId::new(id), path, name);
    if let Some(email) = contact_email {
        server = server.with_contact_email(email.clone());
    }
    Ok(server)
}

/// Gets the server whose URL path is `path`.
pub(crate) async fn get_server_by_path(ex: &mut Executor, path: &str) -> DbResult<Server> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM servers WHERE path = $1";
            let row = sqlx::query(query_str)
                .bind(path)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Server::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM servers WHERE path = ?";
            let row = sqlx::query(query_str)
                .bind(path)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Server::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Creates a new submission in `server_id` without any publications.
#[cfg(test)]
pub(crate) async fn put_submission(
    ex: &mut Executor,
    server_id: ServerId,
    status: PublicationStatus,
    url_path: Option<&str>,
) -> DbResult<Submission> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO submissions (server_id, status, url_path)
                VALUES ($1, $2, $3)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(server_id.as_i64())
                .bind(status.as_i16())
                .bind(url_path)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO submissions (server_id, status, url_path)
                VALUES (?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(server_id.as_i64())
                .bind(status.as_i16())
                .bind(url_path)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    let mut submission = Submission::new(SubmissionId::new(id), server_id, status);
    if let Some(url_path) = url_path {
        submission = submission.with_url_path(url_path);
    }
    Ok(submission)
}

/// Gets the submission identified by `id`.
pub(crate) async fn get_submission(ex: &mut Executor, id: SubmissionId) -> DbResult<Submission> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM submissions WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Submission::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM submissions WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Submission::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the submission of `server_id` that has the custom URL path `url_path`.
pub(crate) async fn get_submission_by_url_path(
    ex: &mut Executor,
    server_id: ServerId,
    url_path: &str,
) -> DbResult<Submission> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM submissions WHERE server_id = $1 AND url_path = $2";
            let row = sqlx::query(query_str)
                .bind(server_id.as_i64())
                .bind(url_path)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Submission::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM submissions WHERE server_id = ? AND url_path = ?";
            let row = sqlx::query(query_str)
                .bind(server_id.as_i64())
                .bind(url_path)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Submission::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Persists the status and the current publication of an existing `submission`.
pub(crate) async fn update_submission(ex: &mut Executor, submission: &Submission) -> DbResult<()> {
    let current_publication_id = submission.current_publication_id().map(PublicationId::as_i64);

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "UPDATE submissions SET status = $1, current_publication_id = $2 WHERE id = $3";
            let done = sqlx::query(query_str)
                .bind(submission.status().as_i16())
                .bind(current_publication_id)
                .bind(submission.id().as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                "UPDATE submissions SET status = ?, current_publication_id = ? WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(submission.status().as_i16())
                .bind(current_publication_id)
                .bind(submission.id().as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_update(rows_affected)
}

/// Gets all published submissions of `server_id` together with their deposit status as stored
/// in the `status_setting` object setting, keeping only those that match `status`.
///
/// Submissions without a stored deposit status are reported as `NotDeposited`.
pub(crate) async fn get_exportable_submissions(
    ex: &mut Executor,
    server_id: ServerId,
    status_setting: &str,
    status: DepositStatus,
) -> DbResult<Vec<(Submission, DepositStatus)>> {
    let mut submissions = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT s.*, os.setting_value AS deposit_status
                FROM submissions s
                LEFT JOIN object_settings os
                    ON os.object_type = $1 AND os.object_id = s.id AND os.setting_name = $2
                WHERE s.server_id = $3 AND s.status = $4
                ORDER BY s.id";
            let mut rows = sqlx::query(query_str)
                .bind(ObjectType::Submission.as_str())
                .bind(status_setting)
                .bind(server_id.as_i64())
                .bind(PublicationStatus::Published.as_i16())
                .fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                let raw_status: Option<String> =
                    row.try_get("deposit_status").map_err(postgres::map_sqlx_error)?;
                let deposit_status = match raw_status {
                    Some(raw) => DepositStatus::parse(&raw)?,
                    None => DepositStatus::NotDeposited,
                };
                submissions.push((Submission::try_from(row)?, deposit_status));
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT s.*, os.setting_value AS deposit_status
                FROM submissions s
                LEFT JOIN object_settings os
                    ON os.object_type = ? AND os.object_id = s.id AND os.setting_name = ?
                WHERE s.server_id = ? AND s.status = ?
                ORDER BY s.id";
            let mut rows = sqlx::query(query_str)
                .bind(ObjectType::Submission.as_str())
                .bind(status_setting)
                .bind(server_id.as_i64())
                .bind(PublicationStatus::Published.as_i16())
                .fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                let raw_status: Option<String> =
                    row.try_get("deposit_status").map_err(sqlite::map_sqlx_error)?;
                let deposit_status = match raw_status {
                    Some(raw) => DepositStatus::parse(&raw)?,
                    None => DepositStatus::NotDeposited,
                };
                submissions.push((Submission::try_from(row)?, deposit_status));
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }

    submissions.retain(|(_, deposit_status)| status.matches(*deposit_status));
    Ok(submissions)
}

/// Creates a new publication for `submission_id`.
pub(crate) async fn put_publication(
    ex: &mut Executor,
    submission_id: SubmissionId,
    version: i32,
    status: PublicationStatus,
    metadata: NewPublication,
) -> DbResult<Publication> {
    let authors = format_authors(&metadata.authors)?;

    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO publications
                    (submission_id, version, status, title, abstract_text, license_url,
                    date_published, authors)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(submission_id.as_i64())
                .bind(version)
                .bind(status.as_i16())
                .bind(&metadata.title)
                .bind(metadata.abstract_text.as_deref())
                .bind(metadata.license_url.as_deref())
                .bind(metadata.date_published)
                .bind(&authors)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO publications
                    (submission_id, version, status, title, abstract_text, license_url,
                    date_published, authors)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(submission_id.as_i64())
                .bind(version)
                .bind(status.as_i16())
                .bind(&metadata.title)
                .bind(metadata.abstract_text.as_deref())
                .bind(metadata.license_url.as_deref())
                .bind(metadata.date_published)
                .bind(&authors)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(Publication::new(PublicationId::new(id), submission_id, version, status, metadata))
}

/// Gets the publication identified by `id`.
pub(crate) async fn get_publication(ex: &mut Executor, id: PublicationId) -> DbResult<Publication> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM publications WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Publication::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM publications WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Publication::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets all publications of `submission_id` sorted by version.
pub(crate) async fn get_publications(
    ex: &mut Executor,
    submission_id: SubmissionId,
) -> DbResult<Vec<Publication>> {
    let mut publications = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM publications WHERE submission_id = $1 ORDER BY version";
            let mut rows = sqlx::query(query_str).bind(submission_id.as_i64()).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                publications.push(Publication::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM publications WHERE submission_id = ? ORDER BY version";
            let mut rows = sqlx::query(query_str).bind(submission_id.as_i64()).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                publications.push(Publication::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(publications)
}

/// Persists the status, DOI, publication date and version of record relation of an existing
/// `publication`.
pub(crate) async fn update_publication(
    ex: &mut Executor,
    publication: &Publication,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE publications
                SET status = $1, doi = $2, date_published = $3, relation_status = $4, vor_doi = $5
                WHERE id = $6";
            let done = sqlx::query(query_str)
                .bind(publication.status().as_i16())
                .bind(publication.doi().as_deref())
                .bind(*publication.date_published())
                .bind(publication.relation_status().as_i16())
                .bind(publication.vor_doi().as_deref())
                .bind(publication.id().as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE publications
                SET status = ?, doi = ?, date_published = ?, relation_status = ?, vor_doi = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(publication.status().as_i16())
                .bind(publication.doi().as_deref())
                .bind(*publication.date_published())
                .bind(publication.relation_status().as_i16())
                .bind(publication.vor_doi().as_deref())
                .bind(publication.id().as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_update(rows_affected)
}

/// Deletes the publication identified by `id`, which must not have galleys anymore.
pub(crate) async fn delete_publication(ex: &mut Executor, id: PublicationId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM publications WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM publications WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_update(rows_affected)
}

/// Creates a new galley for `publication_id`.
pub(crate) async fn put_galley(
    ex: &mut Executor,
    publication_id: PublicationId,
    metadata: NewGalley,
) -> DbResult<Galley> {
    let submission_file_id = metadata.submission_file_id.map(SubmissionFileId::as_i64);

    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO galleys
                    (publication_id, label, locale, url_path, url_remote, submission_file_id,
                    is_approved, doi)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(publication_id.as_i64())
                .bind(&metadata.label)
                .bind(metadata.locale.as_deref())
                .bind(metadata.url_path.as_deref())
                .bind(metadata.url_remote.as_deref())
                .bind(submission_file_id)
                .bind(metadata.is_approved)
                .bind(metadata.doi.as_deref())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO galleys
                    (publication_id, label, locale, url_path, url_remote, submission_file_id,
                    is_approved, doi)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(publication_id.as_i64())
                .bind(&metadata.label)
                .bind(metadata.locale.as_deref())
                .bind(metadata.url_path.as_deref())
                .bind(metadata.url_remote.as_deref())
                .bind(submission_file_id)
                .bind(metadata.is_approved)
                .bind(metadata.doi.as_deref())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(Galley::new(GalleyId::new(id), publication_id, metadata))
}

/// Gets the galley identified by `id`.
pub(crate) async fn get_galley(ex: &mut Executor, id: GalleyId) -> DbResult<Galley> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM galleys WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Galley::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM galleys WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Galley::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets all galleys of `publication_id` in creation order.
pub(crate) async fn get_galleys(
    ex: &mut Executor,
    publication_id: PublicationId,
) -> DbResult<Vec<Galley>> {
    let mut galleys = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM galleys WHERE publication_id = $1 ORDER BY id";
            let mut rows = sqlx::query(query_str).bind(publication_id.as_i64()).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                galleys.push(Galley::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM galleys WHERE publication_id = ? ORDER BY id";
            let mut rows = sqlx::query(query_str).bind(publication_id.as_i64()).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                galleys.push(Galley::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(galleys)
}

/// Deletes the galley identified by `id`.
pub(crate) async fn delete_galley(ex: &mut Executor, id: GalleyId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM galleys WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM galleys WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_update(rows_affected)
}

/// Points the galley identified by `id` to the stored file `file_id`.
pub(crate) async fn set_galley_file(
    ex: &mut Executor,
    id: GalleyId,
    file_id: SubmissionFileId,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "UPDATE galleys SET submission_file_id = $1 WHERE id = $2";
            let done = sqlx::query(query_str)
                .bind(file_id.as_i64())
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "UPDATE galleys SET submission_file_id = ? WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(file_id.as_i64())
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_update(rows_affected)
}

/// Records a new stored file owned by `submission_id`.
pub(crate) async fn put_submission_file(
    ex: &mut Executor,
    submission_id: SubmissionId,
    metadata: NewSubmissionFile,
) -> DbResult<SubmissionFile> {
    let (assoc_type, assoc_id) = unpack_file_assoc(metadata.assoc);

    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO submission_files
                    (submission_id, file_stage, assoc_type, assoc_id, path, name, mime_type)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(submission_id.as_i64())
                .bind(metadata.file_stage.as_i16())
                .bind(assoc_type)
                .bind(assoc_id)
                .bind(&metadata.path)
                .bind(&metadata.name)
                .bind(&metadata.mime_type)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO submission_files
                    (submission_id, file_stage, assoc_type, assoc_id, path, name, mime_type)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(submission_id.as_i64())
                .bind(metadata.file_stage.as_i16())
                .bind(assoc_type)
                .bind(assoc_id)
                .bind(&metadata.path)
                .bind(&metadata.name)
                .bind(&metadata.mime_type)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(SubmissionFile::new(SubmissionFileId::new(id), submission_id, metadata))
}

/// Gets the stored file identified by `id`.
pub(crate) async fn get_submission_file(
    ex: &mut Executor,
    id: SubmissionFileId,
) -> DbResult<SubmissionFile> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM submission_files WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            SubmissionFile::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM submission_files WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            SubmissionFile::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the files in the dependent stage that are associated to the file `parent_id`.
pub(crate) async fn get_dependent_files(
    ex: &mut Executor,
    parent_id: SubmissionFileId,
) -> DbResult<Vec<SubmissionFile>> {
    let (assoc_type, assoc_id) =
        unpack_file_assoc(Some(FileAssoc::SubmissionFile(parent_id)));

    let mut files = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT * FROM submission_files
                WHERE file_stage = $1 AND assoc_type = $2 AND assoc_id = $3
                ORDER BY id";
            let mut rows = sqlx::query(query_str)
                .bind(FileStage::Dependent.as_i16())
                .bind(assoc_type)
                .bind(assoc_id)
                .fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                files.push(SubmissionFile::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT * FROM submission_files
                WHERE file_stage = ? AND assoc_type = ? AND assoc_id = ?
                ORDER BY id";
            let mut rows = sqlx::query(query_str)
                .bind(FileStage::Dependent.as_i16())
                .bind(assoc_type)
                .bind(assoc_id)
                .fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                files.push(SubmissionFile::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(files)
}

/// Gets the value of the `name` setting of an object, if any.
pub(crate) async fn get_object_setting(
    ex: &mut Executor,
    object_type: ObjectType,
    object_id: i64,
    name: &str,
) -> DbResult<Option<String>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT setting_value FROM object_settings
                WHERE object_type = $1 AND object_id = $2 AND setting_name = $3";
            let row = sqlx::query(query_str)
                .bind(object_type.as_str())
                .bind(object_id)
                .bind(name)
                .fetch_optional(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            match row {
                Some(row) => Ok(Some(
                    row.try_get("setting_value").map_err(postgres::map_sqlx_error)?,
                )),
                None => Ok(None),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT setting_value FROM object_settings
                WHERE object_type = ? AND object_id = ? AND setting_name = ?";
            let row = sqlx::query(query_str)
                .bind(object_type.as_str())
                .bind(object_id)
                .bind(name)
                .fetch_optional(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            match row {
                Some(row) => {
                    Ok(Some(row.try_get("setting_value").map_err(sqlite::map_sqlx_error)?))
                }
                None => Ok(None),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Sets the `name` setting of an object to `value`, replacing any previous value.
pub(crate) async fn set_object_setting(
    ex: &mut Executor,
    object_type: ObjectType,
    object_id: i64,
    name: &str,
    value: &str,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO object_settings (object_type, object_id, setting_name, setting_value)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (object_type, object_id, setting_name)
                DO UPDATE SET setting_value = EXCLUDED.setting_value";
            let done = sqlx::query(query_str)
                .bind(object_type.as_str())
                .bind(object_id)
                .bind(name)
                .bind(value)
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO object_settings (object_type, object_id, setting_name, setting_value)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (object_type, object_id, setting_name)
                DO UPDATE SET setting_value = excluded.setting_value";
            let done = sqlx::query(query_str)
                .bind(object_type.as_str())
                .bind(object_id)
                .bind(name)
                .bind(value)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_upsert(rows_affected)
}

/// Gets all settings of `plugin_name` within `server_id`.
pub(crate) async fn get_plugin_settings(
    ex: &mut Executor,
    server_id: ServerId,
    plugin_name: &str,
) -> DbResult<PluginSettings> {
    let mut settings = PluginSettings::default();
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT setting_name, setting_value FROM plugin_settings
                WHERE server_id = $1 AND plugin_name = $2";
            let mut rows =
                sqlx::query(query_str).bind(server_id.as_i64()).bind(plugin_name).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                let name: String = row.try_get("setting_name").map_err(postgres::map_sqlx_error)?;
                let value: String =
                    row.try_get("setting_value").map_err(postgres::map_sqlx_error)?;
                settings.set(name, value);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT setting_name, setting_value FROM plugin_settings
                WHERE server_id = ? AND plugin_name = ?";
            let mut rows =
                sqlx::query(query_str).bind(server_id.as_i64()).bind(plugin_name).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                let name: String = row.try_get("setting_name").map_err(sqlite::map_sqlx_error)?;
                let value: String = row.try_get("setting_value").map_err(sqlite::map_sqlx_error)?;
                settings.set(name, value);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(settings)
}

/// Sets the `name` setting of `plugin_name` within `server_id` to `value`.
pub(crate) async fn set_plugin_setting(
    ex: &mut Executor,
    server_id: ServerId,
    plugin_name: &str,
    name: &str,
    value: &str,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO plugin_settings (server_id, plugin_name, setting_name, setting_value)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (server_id, plugin_name, setting_name)
                DO UPDATE SET setting_value = EXCLUDED.setting_value";
            let done = sqlx::query(query_str)
                .bind(server_id.as_i64())
                .bind(plugin_name)
                .bind(name)
                .bind(value)
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO plugin_settings (server_id, plugin_name, setting_name, setting_value)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (server_id, plugin_name, setting_name)
                DO UPDATE SET setting_value = excluded.setting_value";
            let done = sqlx::query(query_str)
                .bind(server_id.as_i64())
                .bind(plugin_name)
                .bind(name)
                .bind(value)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_upsert(rows_affected)
}

/// Records a new notification for `user_id`.
pub(crate) async fn put_notification(
    ex: &mut Executor,
    user_id: UserId,
    level: NotificationLevel,
    contents: &str,
    created: OffsetDateTime,
) -> DbResult<Notification> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO notifications (user_id, level, contents, created)
                VALUES ($1, $2, $3, $4)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(user_id.as_i64())
                .bind(level.as_str())
                .bind(contents)
                .bind(created)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (created_secs, created_nsecs) = unpack_timestamp(created);

            let query_str = "
                INSERT INTO notifications (user_id, level, contents, created_secs, created_nsecs)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(user_id.as_i64())
                .bind(level.as_str())
                .bind(contents)
                .bind(created_secs)
                .bind(created_nsecs)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(Notification::new(id, user_id, level, contents.to_owned(), created))
}

/// Gets all notifications of `user_id` in creation order.
pub(crate) async fn get_notifications(
    ex: &mut Executor,
    user_id: UserId,
) -> DbResult<Vec<Notification>> {
    let mut notifications = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM notifications WHERE user_id = $1 ORDER BY id";
            let mut rows = sqlx::query(query_str).bind(user_id.as_i64()).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                notifications.push(Notification::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM notifications WHERE user_id = ? ORDER BY id";
            let mut rows = sqlx::query(query_str).bind(user_id.as_i64()).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                notifications.push(Notification::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(notifications)
}
