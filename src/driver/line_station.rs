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

//! Operations on the station chains of lines.

use crate::db;
use crate::driver::{Chain, Driver, DriverResult};
use crate::model::LineStation;

impl Driver {
    /// Registers the station named by `link` in the line `line_id`, splicing the link into the
    /// chain at the position given by its predecessor.
    ///
    /// The row lock taken on the line serializes concurrent mutations of the same chain.
    pub(crate) async fn attach_station(
        &self,
        line_id: i64,
        link: LineStation,
    ) -> DriverResult<LineStation> {
        let mut tx = self.db.begin().await?;

        db::get_line_for_update(tx.ex(), line_id).await?;
        db::get_station(tx.ex(), *link.station_id()).await?;

        let chain = Chain::new(db::get_line_stations(tx.ex(), line_id).await?);
        let relink = chain.insert(&link)?;
        if let Some(relink) = relink {
            db::update_previous_station(
                tx.ex(),
                line_id,
                relink.station_id,
                relink.previous_station_id,
            )
            .await?;
        }
        db::put_line_station(tx.ex(), line_id, &link).await?;

        tx.commit().await?;
        Ok(link)
    }

    /// Removes the station `station_id` from the chain of the line `line_id`, bridging its
    /// neighbors together.
    pub(crate) async fn detach_station(&self, line_id: i64, station_id: i64) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;

        db::get_line_for_update(tx.ex(), line_id).await?;

        let chain = Chain::new(db::get_line_stations(tx.ex(), line_id).await?);
        let (_removed, relink) = chain.remove(station_id)?;
        if let Some(relink) = relink {
            db::update_previous_station(
                tx.ex(),
                line_id,
                relink.station_id,
                relink.previous_station_id,
            )
            .await?;
        }
        db::delete_line_station(tx.ex(), line_id, station_id).await?;

        tx.commit().await?;
        Ok(())
    }
}
