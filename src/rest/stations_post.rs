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

//! API to register a new station.

use crate::driver::Driver;
use crate::model::StationName;
use crate::rest::RestError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

/// Message of the API request.
#[derive(Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
pub(crate) struct CreateStationRequest {
    /// Name of the station to create.
    name: StationName,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Json(request): Json<CreateStationRequest>,
) -> Result<impl IntoResponse, RestError> {
    let station = driver.create_station(request.name).await?;
    Ok((StatusCode::CREATED, Json(station)))
}
