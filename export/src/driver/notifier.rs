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

//! Delivery of messages addressed to users.

use crate::db;
use crate::driver::Driver;
use crate::model::{Notification, NotificationLevel, UserId};
use async_trait::async_trait;
use log::debug;
use pubexport_core::clocks::Clock;
use pubexport_core::db::Db;
use pubexport_core::driver::DriverResult;
use std::sync::Arc;

/// Trait to abstract the delivery of notifications to users.
#[async_trait]
pub trait Notifier {
    /// Records a notification with `contents` for `user`.
    async fn notify(
        &self,
        user: UserId,
        level: NotificationLevel,
        contents: String,
    ) -> DriverResult<()>;
}

/// Notifier that persists notifications so that users can fetch them later.
#[derive(Clone)]
pub struct DbNotifier {
    /// The database in which to store notifications.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock from which to obtain the creation time of notifications.
    clock: Arc<dyn Clock + Send + Sync>,
}

impl DbNotifier {
    /// Creates a new notifier backed by `db` that timestamps notifications with `clock`.
    pub fn new(db: Arc<dyn Db + Send + Sync>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn notify(
        &self,
        user: UserId,
        level: NotificationLevel,
        contents: String,
    ) -> DriverResult<()> {
        debug!("Notifying user {} ({}): {}", user, level.as_str(), contents);
        let now = self.clock.now_utc();
        db::put_notification(&mut self.db.ex().await?, user, level, &contents, now).await?;
        Ok(())
    }
}

impl Driver {
    /// Gets all notifications persisted for `user`, oldest first.
    pub(crate) async fn get_notifications(self, user: UserId) -> DriverResult<Vec<Notification>> {
        let mut ex = self.db.ex().await?;
        Ok(db::get_notifications(&mut ex, user).await?)
    }
}
