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

//! Test utilities for the business layer.

use crate::agency::AgencyRegistry;
use crate::agency::testutils::MockAgency;
use crate::db;
use crate::driver::{Driver, ExportOptions, Notifier, PreprintObserver};
use crate::filter::{ExportDeployment, ExportFilter, FilterRegistry, FilterResult};
use crate::model::*;
use async_trait::async_trait;
use futures::lock::Mutex;
use pubexport_core::clocks::Clock;
use pubexport_core::clocks::testutils::SettableClock;
use pubexport_core::db::{Db, Executor, sqlite};
use pubexport_core::driver::{DriverError, DriverResult};
use pubexport_core::rest::BaseUrls;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;
use time::macros::{date, datetime};

/// Group of the filter that `TestContext` registers to produce malformed documents.
pub(crate) const BROKEN_FILTER: &str = "preprint=>broken-xml";

/// Filter that produces a document with an unclosed element.
struct BrokenFilter;

impl ExportFilter for BrokenFilter {
    fn group(&self) -> &'static str {
        BROKEN_FILTER
    }

    fn export(&self, _: &ExportObjects, _: &ExportDeployment) -> FilterResult<String> {
        Ok("<preprints>\n<preprint>\n</preprints>\n".to_owned())
    }
}

/// Notifier that captures notifications in memory.
#[derive(Clone, Default)]
pub(crate) struct RecorderNotifier {
    /// Storage for captured notifications, in delivery order.
    pub(crate) notifications: Arc<Mutex<Vec<(UserId, NotificationLevel, String)>>>,

    /// Users for which to fail delivering notifications.
    errors: Arc<Mutex<HashSet<UserId>>>,
}

impl RecorderNotifier {
    /// Makes trying to notify `user` fail with an error.
    pub(crate) async fn inject_error_for(&self, user: UserId) {
        let mut errors = self.errors.lock().await;
        errors.insert(user);
    }

    /// Expects that no notifications were delivered.
    pub(crate) async fn expect_no_notifications(&self) {
        let notifications = self.notifications.lock().await;
        assert!(notifications.is_empty(), "Expected no notifications; got {:?}", notifications);
    }

    /// Returns the level and contents of all notifications delivered to `user`.
    pub(crate) async fn take(&self, user: UserId) -> Vec<(NotificationLevel, String)> {
        let mut notifications = self.notifications.lock().await;
        let (mine, others) = std::mem::take(&mut *notifications)
            .into_iter()
            .partition::<Vec<_>, _>(|(to, _, _)| *to == user);
        *notifications = others;
        mine.into_iter().map(|(_, level, contents)| (level, contents)).collect()
    }
}

#[async_trait]
impl Notifier for RecorderNotifier {
    async fn notify(
        &self,
        user: UserId,
        level: NotificationLevel,
        contents: String,
    ) -> DriverResult<()> {
        {
            let errors = self.errors.lock().await;
            if errors.contains(&user) {
                return Err(DriverError::BackendError(format!("Cannot notify user {}", user)));
            }
        }

        let mut notifications = self.notifications.lock().await;
        notifications.push((user, level, contents));
        Ok(())
    }
}

/// Container for the state required to run a driver test.
pub(crate) struct TestContext {
    /// The driver under test.
    driver: Driver,

    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock used by the driver.
    clock: Arc<SettableClock>,

    /// The agency exposed as the `mock` plugin.
    agency: MockAgency,

    /// The notifier used by the driver.
    notifier: RecorderNotifier,

    /// The server that owns the test objects.
    server: Server,

    /// Directory for temporary export files.
    export_dir: TempDir,

    /// Directory for stored submission files.
    files_dir: TempDir,
}

impl TestContext {
    /// Initializes the driver using an in-memory database, a settable clock, a mock agency
    /// registered as the `mock` plugin and a notifier that captures notifications.
    ///
    /// The filters are the default ones plus one that produces malformed documents under the
    /// `BROKEN_FILTER` group.
    pub(crate) async fn setup() -> Self {
        Self::setup_with_agency(MockAgency::new("mock")).await
    }

    /// Same as `setup` but using a custom `agency`.
    pub(crate) async fn setup_with_agency(agency: MockAgency) -> Self {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let db: Arc<dyn Db + Send + Sync> = Arc::from(sqlite::testutils::setup().await);
        let mut ex = db.ex().await.unwrap();
        db::init_schema(&mut ex).await.unwrap();
        let server = db::put_server(&mut ex, "test", "Test Server", None).await.unwrap();

        let clock = Arc::from(SettableClock::new(datetime!(2023-07-15 10:20:30 UTC)));

        let mut agencies = AgencyRegistry::default();
        agencies.register(Arc::from(agency.clone()));

        let notifier = RecorderNotifier::default();

        let mut filters = FilterRegistry::with_defaults();
        filters.register(Arc::from(BrokenFilter));

        let export_dir = tempfile::tempdir().unwrap();
        let files_dir = tempfile::tempdir().unwrap();
        let opts = ExportOptions {
            export_path: export_dir.path().to_owned(),
            files_path: files_dir.path().to_owned(),
        };

        let base_urls = Arc::from(BaseUrls::from_strs(
            "https://api.example.com/",
            Some("https://example.com/"),
        ));

        let driver = Driver::new(
            db.clone(),
            clock.clone(),
            filters,
            agencies,
            Arc::from(notifier.clone()),
            Arc::from(PreprintObserver::default()),
            base_urls,
            opts,
        );

        Self { driver, db, clock, agency, notifier, server, export_dir, files_dir }
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&mut self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Returns the current time of the test clock.
    pub(crate) fn now(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    /// Returns the test clock.
    pub(crate) fn clock(&self) -> &SettableClock {
        &self.clock
    }

    /// Returns the agency registered as the `mock` plugin.
    pub(crate) fn agency(&self) -> &MockAgency {
        &self.agency
    }

    /// Returns the notifier that captures notifications.
    pub(crate) fn notifier(&self) -> &RecorderNotifier {
        &self.notifier
    }

    /// Returns the server that owns the test objects.
    pub(crate) fn server(&self) -> &Server {
        &self.server
    }

    /// Returns the directory in which stored submission files live.
    pub(crate) fn files_dir(&self) -> &Path {
        self.files_dir.path()
    }

    /// Counts the files left in the directory of temporary export files.
    pub(crate) fn count_export_files(&self) -> usize {
        std::fs::read_dir(self.export_dir.path()).unwrap().count()
    }

    /// Sets the setting `name` of `plugin` to `value` within the test server.
    pub(crate) async fn set_plugin_setting(&mut self, plugin: &str, name: &str, value: &str) {
        let server_id = *self.server.id();
        db::set_plugin_setting(&mut self.ex().await, server_id, plugin, name, value).await.unwrap();
    }

    /// Configures the `mock` plugin with valid credentials.
    pub(crate) async fn set_mock_credentials(&mut self) {
        self.set_plugin_setting("mock", "username", "user").await;
        self.set_plugin_setting("mock", "password", "pass").await;
    }

    /// Gets the deposit status stored for the object `id` of `object_type` by the `mock` plugin.
    pub(crate) async fn get_status(&mut self, object_type: ObjectType, id: i64) -> Option<String> {
        db::get_object_setting(&mut self.ex().await, object_type, id, "mock::status").await.unwrap()
    }

    /// Creates a submission in `status` with one publication and one galley.
    ///
    /// The publication carries a DOI derived from the submission identifier and its status and
    /// date mirror those of the submission.
    pub(crate) async fn put_preprint(
        &mut self,
        status: PublicationStatus,
        url_path: Option<&str>,
    ) -> Preprint {
        let server_id = *self.server.id();
        let mut ex = self.ex().await;

        let submission = db::put_submission(&mut ex, server_id, status, url_path).await.unwrap();

        let mut metadata = NewPublication::new(format!("Preprint {}", submission.id()));
        metadata.date_published = Some(date!(2023 - 07 - 01));
        metadata.authors.push(Author {
            given_name: "Ada".to_owned(),
            family_name: Some("Lovelace".to_owned()),
        });
        let publication =
            db::put_publication(&mut ex, *submission.id(), 1, status, metadata).await.unwrap();
        let publication =
            publication.with_doi(Some(format!("10.1234/preprint.{}", submission.id())));
        db::update_publication(&mut ex, &publication).await.unwrap();

        let mut galley = NewGalley::new("PDF");
        galley.is_approved = true;
        let galley = db::put_galley(&mut ex, *publication.id(), galley).await.unwrap();

        let submission = submission.with_current_publication(Some(*publication.id()));
        db::update_submission(&mut ex, &submission).await.unwrap();

        Preprint::new(submission, publication, vec![galley])
    }

    /// Stores a file named `name` with `contents` for `submission` and returns its metadata.
    pub(crate) async fn put_file(
        &mut self,
        submission: SubmissionId,
        name: &str,
        contents: &[u8],
        assoc: Option<FileAssoc>,
    ) -> SubmissionFile {
        let path = format!("{}/{}", submission, name);
        let full = self.files_dir.path().join(&path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, contents).unwrap();

        let stage = match assoc {
            Some(FileAssoc::SubmissionFile(_)) => FileStage::Dependent,
            _ => FileStage::Proof,
        };
        let metadata = NewSubmissionFile {
            file_stage: stage,
            assoc,
            path,
            name: name.to_owned(),
            mime_type: "application/octet-stream".to_owned(),
        };
        db::put_submission_file(&mut self.ex().await, submission, metadata).await.unwrap()
    }
}
