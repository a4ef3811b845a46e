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

//! API to remove a station from a line's chain.

use crate::driver::Driver;
use crate::rest::{EmptyBody, RestError};
use axum::extract::{Path, State};
use axum::response::IntoResponse;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((id, station_id)): Path<(i64, i64)>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    driver.detach_station(id, station_id).await?;
    Ok(())
}
