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

//! Operations on stations.

use crate::db;
use crate::driver::{Driver, DriverError, DriverResult};
use crate::model::{Station, StationName};

impl Driver {
    /// Registers a new station called `name`.
    pub(crate) async fn create_station(&self, name: StationName) -> DriverResult<Station> {
        let mut ex = self.db.ex().await?;
        let station = db::create_station(&mut ex, &name).await?;
        Ok(station)
    }

    /// Returns the station with the given `id`.
    pub(crate) async fn get_station(&self, id: i64) -> DriverResult<Station> {
        let mut ex = self.db.ex().await?;
        let station = db::get_station(&mut ex, id).await?;
        Ok(station)
    }

    /// Returns all registered stations.
    pub(crate) async fn get_stations(&self) -> DriverResult<Vec<Station>> {
        let mut ex = self.db.ex().await?;
        let stations = db::get_stations(&mut ex).await?;
        Ok(stations)
    }

    /// Deletes the station with the given `id`.
    ///
    /// Stations that are still part of some line's chain cannot be deleted: the dangling chain
    /// link left behind would make that line unreadable.  The station must be detached from
    /// every line first.
    pub(crate) async fn delete_station(&self, id: i64) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        if db::station_in_any_line(tx.ex(), id).await? {
            return Err(DriverError::InvalidInput(format!(
                "Station {} is still registered in a line",
                id
            )));
        }
        db::delete_station(tx.ex(), id).await?;
        tx.commit().await?;
        Ok(())
    }
}
