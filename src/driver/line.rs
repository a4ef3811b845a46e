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

//! Operations on lines.

use crate::db;
use crate::driver::{Chain, Driver, DriverError, DriverResult};
use crate::model::{Line, LineDetails, LineStop, LineWithStops};
use std::collections::HashMap;

impl Driver {
    /// Registers a new line with the given `details` and no stations.
    pub(crate) async fn create_line(&self, details: LineDetails) -> DriverResult<Line> {
        let mut ex = self.db.ex().await?;
        let line = db::create_line(&mut ex, &details).await?;
        Ok(line)
    }

    /// Returns the line with the given `id` and its stops in traversal order.
    pub(crate) async fn get_line(&self, id: i64) -> DriverResult<LineWithStops> {
        let mut tx = self.db.begin().await?;

        let line = db::get_line(tx.ex(), id).await?;
        let named_links = db::get_line_stations_with_names(tx.ex(), id).await?;
        tx.commit().await?;

        let mut names = HashMap::with_capacity(named_links.len());
        let mut links = Vec::with_capacity(named_links.len());
        for (link, name) in named_links {
            names.insert(*link.station_id(), name);
            links.push(link);
        }

        let mut stations = vec![];
        for link in Chain::new(links).ordered()? {
            let name = match names.remove(link.station_id()) {
                Some(name) => name,
                None => {
                    return Err(DriverError::BackendError("Line chain is corrupt".to_owned()))
                }
            };
            stations.push(LineStop::new(
                *link.station_id(),
                name,
                *link.previous_station_id(),
                *link.distance(),
                *link.duration(),
            ));
        }
        Ok(LineWithStops::new(line, stations))
    }

    /// Returns all registered lines, without their stops.
    pub(crate) async fn get_lines(&self) -> DriverResult<Vec<Line>> {
        let mut ex = self.db.ex().await?;
        let lines = db::get_lines(&mut ex).await?;
        Ok(lines)
    }

    /// Overwrites all mutable fields of the line `id` with `details` and returns the result.
    pub(crate) async fn update_line(&self, id: i64, details: LineDetails) -> DriverResult<Line> {
        let mut ex = self.db.ex().await?;
        db::update_line(&mut ex, id, &details).await?;
        Ok(Line::new(id, details))
    }

    /// Deletes the line with the given `id` and all of its chain links.
    pub(crate) async fn delete_line(&self, id: i64) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        db::delete_line_stations(tx.ex(), id).await?;
        db::delete_line(tx.ex(), id).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::testutils::TestContext;
    use crate::driver::DriverError;
    use crate::model::{DayTime, LineColor, LineDetails, LineName, LineStation, StationName};

    /// Syntactic sugar to build the details of a line with a fixed schedule.
    fn details(name: &'static str, color: &'static str) -> LineDetails {
        LineDetails::new(
            LineName::from(name),
            LineColor::from(color),
            DayTime::from("05:30"),
            DayTime::from("23:30"),
            10,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_all() {
        let context = TestContext::setup().await;
        let driver = context.driver();

        assert!(driver.get_lines().await.unwrap().is_empty());

        let line1 = driver.create_line(details("2호선", "GREEN")).await.unwrap();
        let line2 = driver.create_line(details("신분당선", "RED")).await.unwrap();
        assert_eq!(vec![line1, line2], driver.get_lines().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_duplicate_name() {
        let context = TestContext::setup().await;
        let driver = context.driver();

        driver.create_line(details("2호선", "GREEN")).await.unwrap();
        match driver.create_line(details("2호선", "BLUE")).await {
            Err(DriverError::AlreadyExists(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_get_with_ordered_stops() {
        let context = TestContext::setup().await;
        let driver = context.driver();

        let line = driver.create_line(details("2호선", "GREEN")).await.unwrap();
        let gangnam = driver.create_station(StationName::from("강남역")).await.unwrap();
        let yeoksam = driver.create_station(StationName::from("역삼역")).await.unwrap();
        let seolleung = driver.create_station(StationName::from("선릉역")).await.unwrap();

        // Attach the stations out of order to make sure retrieval sorts them.
        context
            .attach(
                *line.id(),
                &[
                    LineStation::new(*seolleung.id(), Some(*yeoksam.id()), 7, 4),
                    LineStation::new(*gangnam.id(), None, 0, 0),
                    LineStation::new(*yeoksam.id(), Some(*gangnam.id()), 5, 3),
                ],
            )
            .await;

        let found = driver.get_line(*line.id()).await.unwrap();
        assert_eq!(&line, found.line());
        assert_eq!(
            vec![
                (*gangnam.id(), StationName::from("강남역")),
                (*yeoksam.id(), StationName::from("역삼역")),
                (*seolleung.id(), StationName::from("선릉역")),
            ],
            found
                .stations()
                .iter()
                .map(|stop| (*stop.id(), stop.name().clone()))
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_get_corrupt_chain() {
        let context = TestContext::setup().await;
        let driver = context.driver();

        let line = driver.create_line(details("2호선", "GREEN")).await.unwrap();
        let gangnam = driver.create_station(StationName::from("강남역")).await.unwrap();
        let yeoksam = driver.create_station(StationName::from("역삼역")).await.unwrap();

        // Two heads cannot happen through the service; write them directly.
        context
            .attach(
                *line.id(),
                &[
                    LineStation::new(*gangnam.id(), None, 0, 0),
                    LineStation::new(*yeoksam.id(), None, 0, 0),
                ],
            )
            .await;

        match driver.get_line(*line.id()).await {
            Err(DriverError::BackendError(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_update() {
        let context = TestContext::setup().await;
        let driver = context.driver();

        let line = driver.create_line(details("2호선", "GREEN")).await.unwrap();
        let updated = driver.update_line(*line.id(), details("3호선", "ORANGE")).await.unwrap();
        assert_eq!(line.id(), updated.id());
        assert_eq!(&details("3호선", "ORANGE"), updated.details());
        assert_eq!(vec![updated], driver.get_lines().await.unwrap());

        match driver.update_line(123, details("4호선", "BLUE")).await {
            Err(DriverError::NotFound(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_delete_also_deletes_links() {
        let context = TestContext::setup().await;
        let driver = context.driver();

        let line = driver.create_line(details("2호선", "GREEN")).await.unwrap();
        let gangnam = driver.create_station(StationName::from("강남역")).await.unwrap();
        context.attach(*line.id(), &[LineStation::new(*gangnam.id(), None, 0, 0)]).await;

        driver.delete_line(*line.id()).await.unwrap();
        match driver.get_line(*line.id()).await {
            Err(DriverError::NotFound(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
        assert!(context.line_station_ids(*line.id()).await.is_empty());

        match driver.delete_line(*line.id()).await {
            Err(DriverError::NotFound(_)) => (),
            e => panic!("Unexpected result: {:?}", e),
        }
    }
}
