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

//! Publication lifecycle and the observers that react to it.

use crate::db;
use crate::driver::Driver;
use crate::messages::translate;
use crate::model::{
    FileAssoc, FileStage, GalleyId, NewPublication, NewRelation, NewSubmissionFile, Publication,
    PublicationId, PublicationStatus, RelationOption, RelationStatus, Server, Submission,
    SubmissionFile, SubmissionId,
};
use async_trait::async_trait;
use log::{info, warn};
use pubexport_core::db::{DbError, DbResult, Executor};
use pubexport_core::driver::{DriverError, DriverResult};
use time::Date;

/// Name of the plugin that holds the DOI settings of a server.
pub(crate) const DOI_PLUGIN: &str = "doi";

/// Setting with the DOI prefix of the server, such as `10.1234`.
pub(crate) const DOI_PREFIX: &str = "doiPrefix";

/// Setting that enables assigning DOIs to publications when they are added.
pub(crate) const DOI_AUTO_ASSIGN: &str = "enablePublicationDoiAutoAssign";

/// Setting with the pattern from which DOI suffixes are generated.
pub(crate) const DOI_SUFFIX_PATTERN: &str = "doiPublicationSuffixPattern";

/// Suffix pattern to use when the server does not configure one.
const DEFAULT_SUFFIX_PATTERN: &str = "%p.%a";

/// Hooks invoked by the publication lifecycle operations.
///
/// All hooks run within the transaction of the operation that triggers them.  Hooks that receive
/// a publication by value return the publication to persist, possibly modified.
#[async_trait]
pub trait PublicationObserver {
    /// Called after `publication` is added to a submission of `server`.
    async fn on_add(
        &self,
        ex: &mut Executor,
        server: &Server,
        publication: Publication,
    ) -> DriverResult<Publication>;

    /// Called after `new` is created as the next version of `old` within `server`.
    async fn on_version(
        &self,
        ex: &mut Executor,
        server: &Server,
        new: Publication,
        old: &Publication,
    ) -> DriverResult<Publication>;

    /// Called before `new`, which replaces `old`, is persisted as published on `today`.
    async fn on_publish(
        &self,
        ex: &mut Executor,
        new: Publication,
        old: &Publication,
        today: Date,
    ) -> DriverResult<Publication>;

    /// Called before `publication` is deleted.
    async fn on_delete(&self, ex: &mut Executor, publication: &Publication) -> DriverResult<()>;
}

/// Expands a DOI suffix `pattern` for `publication` within `server`.
///
/// `%p` is replaced by the server path, `%a` by the submission identifier and `%b` by the
/// publication identifier.  `%%` yields a literal `%` and unknown codes are kept as is.
fn expand_suffix(pattern: &str, server: &Server, publication: &Publication) -> String {
    let mut suffix = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            suffix.push(ch);
            continue;
        }
        match chars.next() {
            Some('p') => suffix.push_str(server.path()),
            Some('a') => suffix.push_str(&publication.submission_id().to_string()),
            Some('b') => suffix.push_str(&publication.id().to_string()),
            Some('%') => suffix.push('%'),
            Some(other) => {
                suffix.push('%');
                suffix.push(other);
            }
            None => suffix.push('%'),
        }
    }
    suffix
}

/// Observer that implements the preprint-specific reactions to the publication lifecycle.
#[derive(Clone, Debug, Default)]
pub struct PreprintObserver {}

#[async_trait]
impl PublicationObserver for PreprintObserver {
    async fn on_add(
        &self,
        ex: &mut Executor,
        server: &Server,
        publication: Publication,
    ) -> DriverResult<Publication> {
        let settings = db::get_plugin_settings(ex, *server.id(), DOI_PLUGIN).await?;
        if !settings.get_bool(DOI_AUTO_ASSIGN) {
            return Ok(publication);
        }
        let prefix = match settings.get(DOI_PREFIX) {
            Some(prefix) => prefix,
            None => {
                warn!("DOI auto-assignment enabled in server {} without a prefix", server.path());
                return Ok(publication);
            }
        };

        let pattern = settings.get(DOI_SUFFIX_PATTERN).unwrap_or(DEFAULT_SUFFIX_PATTERN);
        let doi = format!("{}/{}", prefix, expand_suffix(pattern, server, &publication));
        Ok(publication.with_doi(Some(doi)))
    }

    async fn on_version(
        &self,
        ex: &mut Executor,
        server: &Server,
        new: Publication,
        old: &Publication,
    ) -> DriverResult<Publication> {
        for galley in db::get_galleys(ex, *old.id()).await? {
            db::put_galley(ex, *new.id(), galley.to_metadata()).await?;
        }

        let settings = db::get_plugin_settings(ex, *server.id(), DOI_PLUGIN).await?;
        match (settings.get(DOI_PREFIX), settings.get(DOI_SUFFIX_PATTERN)) {
            (Some(prefix), Some(pattern)) if pattern.contains("%b") => {
                let doi = format!("{}/{}", prefix, expand_suffix(pattern, server, &new));
                Ok(new.with_doi(Some(doi)))
            }
            _ => Ok(new),
        }
    }

    async fn on_publish(
        &self,
        _ex: &mut Executor,
        new: Publication,
        old: &Publication,
        today: Date,
    ) -> DriverResult<Publication> {
        match old.date_published() {
            Some(date) if *date > today => Ok(new.with_status(PublicationStatus::Scheduled)),
            _ => Ok(new),
        }
    }

    async fn on_delete(&self, ex: &mut Executor, publication: &Publication) -> DriverResult<()> {
        for galley in db::get_galleys(ex, *publication.id()).await? {
            db::delete_galley(ex, *galley.id()).await?;
        }
        Ok(())
    }
}

/// Converts a `NotFound` database error into a driver error that describes what was missing.
fn found<T>(result: DbResult<T>, what: &str) -> DriverResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(DbError::NotFound) => Err(DriverError::NotFound(format!("{} not found", what))),
        Err(e) => Err(e.into()),
    }
}

/// Gets the submission `id` as long as it belongs to `server`.
async fn get_server_submission(
    ex: &mut Executor,
    server: &Server,
    id: SubmissionId,
) -> DriverResult<Submission> {
    let submission = found(db::get_submission(ex, id).await, &format!("Submission {}", id))?;
    if submission.server_id() != server.id() {
        return Err(DriverError::NotFound(format!("Submission {} not found", id)));
    }
    Ok(submission)
}

/// Gets the publication `id` and its submission as long as they belong to `server`.
async fn get_server_publication(
    ex: &mut Executor,
    server: &Server,
    id: PublicationId,
) -> DriverResult<(Submission, Publication)> {
    let publication = found(db::get_publication(ex, id).await, &format!("Publication {}", id))?;
    let submission = get_server_submission(ex, server, *publication.submission_id())
        .await
        .map_err(|_| DriverError::NotFound(format!("Publication {} not found", id)))?;
    Ok((submission, publication))
}

/// Computes the version number that follows the existing publications of `submission`.
async fn next_version(ex: &mut Executor, submission: SubmissionId) -> DbResult<i32> {
    let publications = db::get_publications(ex, submission).await?;
    Ok(publications.last().map(|p| p.version() + 1).unwrap_or(1))
}

/// Returns true if `name` can be used as a file name within a directory.
fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

impl Driver {
    /// Adds a new publication with `metadata` to `submission_id` within `server_path`.
    ///
    /// The first publication of a submission becomes its current publication.
    pub(crate) async fn add_publication(
        self,
        server_path: &str,
        submission_id: SubmissionId,
        metadata: NewPublication,
    ) -> DriverResult<Publication> {
        let mut tx = self.db.begin().await?;
        let server = self.server(tx.ex(), server_path).await?;
        let submission = get_server_submission(tx.ex(), &server, submission_id).await?;

        let version = next_version(tx.ex(), submission_id).await?;
        let publication = db::put_publication(
            tx.ex(),
            submission_id,
            version,
            PublicationStatus::Queued,
            metadata,
        )
        .await?;
        let publication = self.observer.on_add(tx.ex(), &server, publication).await?;
        db::update_publication(tx.ex(), &publication).await?;

        if submission.current_publication_id().is_none() {
            let submission = submission.with_current_publication(Some(*publication.id()));
            db::update_submission(tx.ex(), &submission).await?;
        }

        tx.commit().await?;
        info!("Added publication {} to submission {}", publication.id(), submission_id);
        Ok(publication)
    }

    /// Creates a new version of the current publication of `submission_id` within `server_path`.
    pub(crate) async fn create_version(
        self,
        server_path: &str,
        submission_id: SubmissionId,
    ) -> DriverResult<Publication> {
        let mut tx = self.db.begin().await?;
        let server = self.server(tx.ex(), server_path).await?;
        let submission = get_server_submission(tx.ex(), &server, submission_id).await?;
        let old = match submission.current_publication_id() {
            Some(id) => db::get_publication(tx.ex(), *id).await?,
            None => {
                return Err(DriverError::InvalidInput(format!(
                    "Submission {} has no publication to version",
                    submission_id
                )));
            }
        };

        let version = next_version(tx.ex(), submission_id).await?;
        let new = db::put_publication(
            tx.ex(),
            submission_id,
            version,
            PublicationStatus::Queued,
            old.to_metadata(),
        )
        .await?
        .with_doi(old.doi().clone())
        .with_relation(*old.relation_status(), old.vor_doi().clone());
        let new = self.observer.on_version(tx.ex(), &server, new, &old).await?;
        db::update_publication(tx.ex(), &new).await?;

        tx.commit().await?;
        info!("Created version {} of submission {}", version, submission_id);
        Ok(new)
    }

    /// Publishes `publication_id` within `server_path`.
    ///
    /// The publication date defaults to today.  The submission takes the resulting status and
    /// points at the publication.
    pub(crate) async fn publish(
        self,
        server_path: &str,
        publication_id: PublicationId,
    ) -> DriverResult<Publication> {
        let today = self.clock.now_utc().date();

        let mut tx = self.db.begin().await?;
        let server = self.server(tx.ex(), server_path).await?;
        let (submission, old) = get_server_publication(tx.ex(), &server, publication_id).await?;

        let date = old.date_published().unwrap_or(today);
        let new = old
            .clone()
            .with_status(PublicationStatus::Published)
            .with_date_published(Some(date));
        let new = self.observer.on_publish(tx.ex(), new, &old, today).await?;
        db::update_publication(tx.ex(), &new).await?;

        let submission =
            submission.with_status(*new.status()).with_current_publication(Some(publication_id));
        db::update_submission(tx.ex(), &submission).await?;

        tx.commit().await?;
        info!("Publication {} is now {:?}", publication_id, new.status());
        Ok(new)
    }

    /// Returns the relations to a version of record that a publication can declare.
    pub(crate) fn relation_options(&self) -> Vec<RelationOption> {
        RelationStatus::ALL
            .iter()
            .map(|relation| RelationOption {
                value: *relation,
                label: translate(relation.message_key(), None),
            })
            .collect()
    }

    /// Records the relation of `publication_id` within `server_path` to its version of record.
    ///
    /// A `Published` relation needs the DOI of the version of record.  Blank DOIs are dropped.
    pub(crate) async fn relate(
        self,
        server_path: &str,
        publication_id: PublicationId,
        relation: NewRelation,
    ) -> DriverResult<Publication> {
        let vor_doi = relation
            .vor_doi
            .map(|doi| doi.trim().to_owned())
            .filter(|doi| !doi.is_empty());
        if relation.relation_status == RelationStatus::Published && vor_doi.is_none() {
            return Err(DriverError::InvalidInput(
                "A published relation requires the DOI of the version of record".to_owned(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let server = self.server(tx.ex(), server_path).await?;
        let (_submission, publication) =
            get_server_publication(tx.ex(), &server, publication_id).await?;

        let publication = publication.with_relation(relation.relation_status, vor_doi);
        db::update_publication(tx.ex(), &publication).await?;

        tx.commit().await?;
        info!(
            "Publication {} now has relation {:?} to its version of record",
            publication_id,
            publication.relation_status()
        );
        Ok(publication)
    }

    /// Deletes `publication_id` within `server_path`.
    ///
    /// If the publication was the current one of its submission, the newest remaining publication
    /// becomes current.
    pub(crate) async fn delete_publication(
        self,
        server_path: &str,
        publication_id: PublicationId,
    ) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        let server = self.server(tx.ex(), server_path).await?;
        let (submission, publication) =
            get_server_publication(tx.ex(), &server, publication_id).await?;

        self.observer.on_delete(tx.ex(), &publication).await?;
        db::delete_publication(tx.ex(), publication_id).await?;

        if *submission.current_publication_id() == Some(publication_id) {
            let remaining = db::get_publications(tx.ex(), *submission.id()).await?;
            let current = remaining.last().map(|p| *p.id());
            let submission = submission.with_current_publication(current);
            db::update_submission(tx.ex(), &submission).await?;
        }

        tx.commit().await?;
        info!("Deleted publication {}", publication_id);
        Ok(())
    }

    /// Stores `contents` as the file of `galley_id` within `server_path`.
    ///
    /// The new file is associated to the galley, which starts pointing at it within the same
    /// transaction.
    pub(crate) async fn store_galley_file(
        self,
        server_path: &str,
        galley_id: GalleyId,
        name: &str,
        mime_type: &str,
        contents: &[u8],
    ) -> DriverResult<SubmissionFile> {
        if !is_valid_file_name(name) {
            return Err(DriverError::InvalidInput(format!("Invalid file name '{}'", name)));
        }

        let mut tx = self.db.begin().await?;
        let server = self.server(tx.ex(), server_path).await?;
        let galley =
            found(db::get_galley(tx.ex(), galley_id).await, &format!("Galley {}", galley_id))?;
        let (submission, _publication) =
            get_server_publication(tx.ex(), &server, *galley.publication_id())
                .await
                .map_err(|_| DriverError::NotFound(format!("Galley {} not found", galley_id)))?;

        let path = format!("{}/galley-{}-{}", submission.id(), galley_id, name);
        let full_path = self.opts.files_path.join(&path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DriverError::BackendError(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::write(&full_path, contents).await.map_err(|e| {
            DriverError::BackendError(format!("Cannot write {}: {}", full_path.display(), e))
        })?;

        let metadata = NewSubmissionFile {
            file_stage: FileStage::Proof,
            assoc: Some(FileAssoc::Galley(galley_id)),
            path,
            name: name.to_owned(),
            mime_type: mime_type.to_owned(),
        };
        let file = db::put_submission_file(tx.ex(), *submission.id(), metadata).await?;
        db::set_galley_file(tx.ex(), galley_id, *file.id()).await?;

        tx.commit().await?;
        info!("Stored file {} for galley {}", file.id(), galley_id);
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use crate::model::*;
    use time::macros::date;

    /// Configures the DOI settings of the test server.
    async fn set_doi_settings(context: &mut TestContext, auto_assign: bool, pattern: Option<&str>) {
        context.set_plugin_setting(DOI_PLUGIN, DOI_PREFIX, "10.9999").await;
        context
            .set_plugin_setting(DOI_PLUGIN, DOI_AUTO_ASSIGN, if auto_assign { "1" } else { "0" })
            .await;
        if let Some(pattern) = pattern {
            context.set_plugin_setting(DOI_PLUGIN, DOI_SUFFIX_PATTERN, pattern).await;
        }
    }

    /// Creates a submission without publications in the test server.
    async fn put_empty_submission(context: &mut TestContext) -> Submission {
        let server_id = *context.server().id();
        db::put_submission(&mut context.ex().await, server_id, PublicationStatus::Queued, None)
            .await
            .unwrap()
    }

    /// Reloads the submission `id` from the database.
    async fn reload(context: &mut TestContext, id: SubmissionId) -> Submission {
        db::get_submission(&mut context.ex().await, id).await.unwrap()
    }

    #[test]
    fn test_expand_suffix() {
        let server = Server::new(ServerId::new(1), "srv", "Server");
        let publication = Publication::new(
            PublicationId::new(20),
            SubmissionId::new(7),
            1,
            PublicationStatus::Queued,
            NewPublication::new("T"),
        );
        assert_eq!("srv.7", expand_suffix("%p.%a", &server, &publication));
        assert_eq!("srv.7.v20", expand_suffix("%p.%a.v%b", &server, &publication));
        assert_eq!("100%-x%z%", expand_suffix("100%%-x%z%", &server, &publication));
        assert_eq!("plain", expand_suffix("plain", &server, &publication));
    }

    #[test]
    fn test_is_valid_file_name() {
        assert!(is_valid_file_name("paper.pdf"));
        assert!(!is_valid_file_name(""));
        assert!(!is_valid_file_name(".."));
        assert!(!is_valid_file_name("a/b.pdf"));
        assert!(!is_valid_file_name("a\\b.pdf"));
    }

    #[tokio::test]
    async fn test_add_publication_first_becomes_current() {
        let mut context = TestContext::setup().await;
        let submission = put_empty_submission(&mut context).await;

        let publication = context
            .driver()
            .add_publication("test", *submission.id(), NewPublication::new("First"))
            .await
            .unwrap();
        assert_eq!(1, *publication.version());
        assert_eq!(PublicationStatus::Queued, *publication.status());
        assert_eq!(&None, publication.doi());

        let submission = reload(&mut context, *submission.id()).await;
        assert_eq!(Some(*publication.id()), *submission.current_publication_id());

        let second = context
            .driver()
            .add_publication("test", *submission.id(), NewPublication::new("Second"))
            .await
            .unwrap();
        assert_eq!(2, *second.version());
        let submission = reload(&mut context, *submission.id()).await;
        assert_eq!(Some(*publication.id()), *submission.current_publication_id());
    }

    #[tokio::test]
    async fn test_add_publication_assigns_doi() {
        let mut context = TestContext::setup().await;
        set_doi_settings(&mut context, true, None).await;
        let submission = put_empty_submission(&mut context).await;

        let publication = context
            .driver()
            .add_publication("test", *submission.id(), NewPublication::new("First"))
            .await
            .unwrap();
        let exp = format!("10.9999/test.{}", submission.id());
        assert_eq!(Some(exp.as_str()), publication.doi().as_deref());

        let stored = db::get_publication(&mut context.ex().await, *publication.id()).await.unwrap();
        assert_eq!(publication, stored);
    }

    #[tokio::test]
    async fn test_add_publication_no_doi_when_disabled() {
        let mut context = TestContext::setup().await;
        set_doi_settings(&mut context, false, Some("%p.%a")).await;
        let submission = put_empty_submission(&mut context).await;

        let publication = context
            .driver()
            .add_publication("test", *submission.id(), NewPublication::new("First"))
            .await
            .unwrap();
        assert_eq!(&None, publication.doi());
    }

    #[tokio::test]
    async fn test_add_publication_other_server() {
        let mut context = TestContext::setup().await;
        let submission = put_empty_submission(&mut context).await;
        db::put_server(&mut context.ex().await, "other", "Other", None).await.unwrap();

        match context
            .driver()
            .add_publication("other", *submission.id(), NewPublication::new("First"))
            .await
        {
            Err(DriverError::NotFound(msg)) => assert!(msg.contains("Submission")),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[tokio::test]
    async fn test_create_version_copies_galleys_and_doi() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();
        let file = context.put_file(sub_id, "paper.pdf", b"pdf", None).await;
        db::set_galley_file(&mut context.ex().await, *preprint.galleys()[0].id(), *file.id())
            .await
            .unwrap();

        let new = context.driver().create_version("test", sub_id).await.unwrap();
        assert_eq!(2, *new.version());
        assert_eq!(PublicationStatus::Queued, *new.status());
        assert_eq!(preprint.publication().title(), new.title());
        assert_eq!(preprint.publication().doi(), new.doi());
        assert_eq!(&None, new.date_published());

        let galleys = db::get_galleys(&mut context.ex().await, *new.id()).await.unwrap();
        assert_eq!(1, galleys.len());
        assert_eq!("PDF", galleys[0].label());
        assert_eq!(Some(*file.id()), *galleys[0].submission_file_id());
        assert_ne!(preprint.galleys()[0].id(), galleys[0].id());

        let submission = reload(&mut context, sub_id).await;
        assert_eq!(Some(*preprint.publication().id()), *submission.current_publication_id());
    }

    #[tokio::test]
    async fn test_create_version_fresh_doi_with_publication_code() {
        let mut context = TestContext::setup().await;
        set_doi_settings(&mut context, false, Some("%p.%a.v%b")).await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();

        let new = context.driver().create_version("test", sub_id).await.unwrap();
        let exp = format!("10.9999/test.{}.v{}", sub_id, new.id());
        assert_eq!(Some(exp.as_str()), new.doi().as_deref());
    }

    #[tokio::test]
    async fn test_create_version_without_publication() {
        let mut context = TestContext::setup().await;
        let submission = put_empty_submission(&mut context).await;

        match context.driver().create_version("test", *submission.id()).await {
            Err(DriverError::InvalidInput(msg)) => assert!(msg.contains("no publication")),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[tokio::test]
    async fn test_publish_defaults_date_and_updates_submission() {
        let mut context = TestContext::setup().await;
        let submission = put_empty_submission(&mut context).await;
        let publication = context
            .driver()
            .add_publication("test", *submission.id(), NewPublication::new("First"))
            .await
            .unwrap();

        let published = context.driver().publish("test", *publication.id()).await.unwrap();
        assert_eq!(PublicationStatus::Published, *published.status());
        assert_eq!(Some(date!(2023 - 07 - 15)), *published.date_published());

        let submission = reload(&mut context, *submission.id()).await;
        assert_eq!(PublicationStatus::Published, *submission.status());
        assert_eq!(Some(*publication.id()), *submission.current_publication_id());
    }

    #[tokio::test]
    async fn test_publish_future_date_schedules() {
        let mut context = TestContext::setup().await;
        let submission = put_empty_submission(&mut context).await;
        let mut metadata = NewPublication::new("First");
        metadata.date_published = Some(date!(2023 - 08 - 01));
        let publication =
            context.driver().add_publication("test", *submission.id(), metadata).await.unwrap();

        let published = context.driver().publish("test", *publication.id()).await.unwrap();
        assert_eq!(PublicationStatus::Scheduled, *published.status());
        assert_eq!(Some(date!(2023 - 08 - 01)), *published.date_published());

        let submission = reload(&mut context, *submission.id()).await;
        assert_eq!(PublicationStatus::Scheduled, *submission.status());
    }

    #[tokio::test]
    async fn test_publish_new_version_moves_pointer() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();

        let new = context.driver().create_version("test", sub_id).await.unwrap();
        context.driver().publish("test", *new.id()).await.unwrap();

        let submission = reload(&mut context, sub_id).await;
        assert_eq!(Some(*new.id()), *submission.current_publication_id());
    }

    #[tokio::test]
    async fn test_publish_unknown() {
        let context = TestContext::setup().await;
        match context.driver().publish("test", PublicationId::new(123)).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Publication 123 not found", msg),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[tokio::test]
    async fn test_relate_published_and_copied_to_new_version() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();

        let relation = NewRelation {
            relation_status: RelationStatus::Published,
            vor_doi: Some(" 10.5555/journal.1 ".to_owned()),
        };
        let related = context
            .driver()
            .relate("test", *preprint.publication().id(), relation)
            .await
            .unwrap();
        assert_eq!(RelationStatus::Published, *related.relation_status());
        assert_eq!(Some("10.5555/journal.1"), related.vor_doi().as_deref());
        assert_eq!(
            related,
            db::get_publication(&mut context.ex().await, *related.id()).await.unwrap()
        );

        let new = context.driver().create_version("test", sub_id).await.unwrap();
        assert_eq!(RelationStatus::Published, *new.relation_status());
        assert_eq!(Some("10.5555/journal.1"), new.published_vor_doi());
    }

    #[tokio::test]
    async fn test_relate_back_to_none() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let id = *preprint.publication().id();

        let relation = NewRelation {
            relation_status: RelationStatus::Submitted,
            vor_doi: Some("".to_owned()),
        };
        let related = context.driver().relate("test", id, relation).await.unwrap();
        assert_eq!(RelationStatus::Submitted, *related.relation_status());
        assert_eq!(&None, related.vor_doi());

        let relation = NewRelation { relation_status: RelationStatus::None, vor_doi: None };
        let related = context.driver().relate("test", id, relation).await.unwrap();
        assert_eq!(RelationStatus::None, *related.relation_status());
    }

    #[tokio::test]
    async fn test_relate_errors() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let id = *preprint.publication().id();

        for vor_doi in [None, Some("   ".to_owned())] {
            let relation = NewRelation { relation_status: RelationStatus::Published, vor_doi };
            match context.driver().relate("test", id, relation).await {
                Err(DriverError::InvalidInput(msg)) => assert!(msg.contains("version of record")),
                r => panic!("Unexpected result {:?}", r),
            }
        }
        let publication = db::get_publication(&mut context.ex().await, id).await.unwrap();
        assert_eq!(RelationStatus::None, *publication.relation_status());

        let relation = NewRelation { relation_status: RelationStatus::Submitted, vor_doi: None };
        match context.driver().relate("test", PublicationId::new(123), relation).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Publication 123 not found", msg),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[tokio::test]
    async fn test_relation_options() {
        let context = TestContext::setup().await;
        let options = context.driver().relation_options();
        assert_eq!(
            vec![RelationStatus::None, RelationStatus::Submitted, RelationStatus::Published],
            options.iter().map(|o| o.value).collect::<Vec<_>>()
        );
        assert_eq!("Preprint has been published", options[2].label);
        assert!(options.iter().all(|o| !o.label.starts_with("##")));
    }

    #[tokio::test]
    async fn test_delete_publication_deletes_galleys_and_moves_pointer() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();
        let new = context.driver().create_version("test", sub_id).await.unwrap();
        context.driver().publish("test", *new.id()).await.unwrap();

        context.driver().delete_publication("test", *new.id()).await.unwrap();

        assert!(db::get_galleys(&mut context.ex().await, *new.id()).await.unwrap().is_empty());
        assert_eq!(
            DbError::NotFound,
            db::get_publication(&mut context.ex().await, *new.id()).await.unwrap_err()
        );
        let submission = reload(&mut context, sub_id).await;
        assert_eq!(Some(*preprint.publication().id()), *submission.current_publication_id());

        context.driver().delete_publication("test", *preprint.publication().id()).await.unwrap();
        let submission = reload(&mut context, sub_id).await;
        assert_eq!(None, *submission.current_publication_id());
        assert_eq!(
            DbError::NotFound,
            db::get_galley(&mut context.ex().await, *preprint.galleys()[0].id()).await.unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_delete_non_current_keeps_pointer() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();
        let new = context.driver().create_version("test", sub_id).await.unwrap();

        context.driver().delete_publication("test", *new.id()).await.unwrap();

        let submission = reload(&mut context, sub_id).await;
        assert_eq!(Some(*preprint.publication().id()), *submission.current_publication_id());
    }

    #[tokio::test]
    async fn test_store_galley_file_links_galley() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let galley_id = *preprint.galleys()[0].id();

        let file = context
            .driver()
            .store_galley_file("test", galley_id, "paper.pdf", "application/pdf", b"%PDF")
            .await
            .unwrap();
        assert_eq!(&Some(FileAssoc::Galley(galley_id)), file.assoc());
        assert_eq!(FileStage::Proof, *file.file_stage());
        assert_eq!("paper.pdf", file.name());
        assert_eq!(b"%PDF".to_vec(), std::fs::read(context.files_dir().join(file.path())).unwrap());

        let galley = db::get_galley(&mut context.ex().await, galley_id).await.unwrap();
        assert_eq!(Some(*file.id()), *galley.submission_file_id());
    }

    #[tokio::test]
    async fn test_store_galley_file_errors() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let galley_id = *preprint.galleys()[0].id();

        match context
            .driver()
            .store_galley_file("test", GalleyId::new(999), "a.pdf", "application/pdf", b"")
            .await
        {
            Err(DriverError::NotFound(msg)) => assert_eq!("Galley 999 not found", msg),
            r => panic!("Unexpected result {:?}", r),
        }

        match context
            .driver()
            .store_galley_file("test", galley_id, "../a.pdf", "application/pdf", b"")
            .await
        {
            Err(DriverError::InvalidInput(msg)) => assert!(msg.contains("Invalid file name")),
            r => panic!("Unexpected result {:?}", r),
        }

        let galley = db::get_galley(&mut context.ex().await, galley_id).await.unwrap();
        assert_eq!(&None, galley.submission_file_id());
    }
}
