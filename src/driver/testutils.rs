// Subway
// Copyright 2026 The Subway Authors
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

//! Test utilities for the driver.

use crate::db;
use crate::db::Db;
use crate::driver::{Chain, Driver};
use crate::model::LineStation;
use std::sync::Arc;

/// State of a running test, backed by an in-memory database.
pub(crate) struct TestContext {
    /// The database the test runs against.
    db: Arc<dyn Db + Send + Sync>,

    /// The driver under test.
    driver: Driver,
}

impl TestContext {
    /// Initializes the test environment.
    pub(crate) async fn setup() -> Self {
        let db = db::sqlite::testutils::setup().await;
        let driver = Driver::new(db.clone());
        Self { db, driver }
    }

    /// Returns the driver under test.
    pub(crate) fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Writes raw chain `links` for the line `line_id`, bypassing the driver's validation.
    pub(crate) async fn attach(&self, line_id: i64, links: &[LineStation]) {
        let mut ex = self.db.ex().await.unwrap();
        for link in links {
            db::put_line_station(&mut ex, line_id, link).await.unwrap();
        }
    }

    /// Returns the station ids of the line `line_id` in chain traversal order.
    pub(crate) async fn line_station_ids(&self, line_id: i64) -> Vec<i64> {
        let mut ex = self.db.ex().await.unwrap();
        let links = db::get_line_stations(&mut ex, line_id).await.unwrap();
        Chain::new(links).ordered().unwrap().iter().map(|link| *link.station_id()).collect()
    }
}
