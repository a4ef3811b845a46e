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

//! High-level data types for the subway domain.

use derive_getters::Getters;
use derive_more::Constructor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Maximum length of a station or line name as specified in the schema.
pub(crate) const MAX_NAME_LENGTH: usize = 64;

/// Maximum length of a line color as specified in the schema.
pub(crate) const MAX_COLOR_LENGTH: usize = 20;

/// Number of minutes in a day, used to bound `DayTime` values.
const MINUTES_PER_DAY: u16 = 24 * 60;

/// Errors caused by invalid values when constructing model types.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub(crate) struct ModelError(pub(crate) String);

/// Result type for this module.
pub(crate) type ModelResult<T> = Result<T, ModelError>;

/// Validates that a `name` of human-readable `kind` is well-formed.
fn validate_name(kind: &str, name: &str) -> ModelResult<()> {
    if name.is_empty() {
        return Err(ModelError(format!("{} name cannot be empty", kind)));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ModelError(format!("{} name is too long", kind)));
    }
    if name.chars().any(char::is_control) {
        return Err(ModelError(format!("{} name contains control characters", kind)));
    }
    Ok(())
}

/// Represents a correctly-formatted (but maybe non-existent) station name.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub(crate) struct StationName(String);

impl StationName {
    /// Creates a new station name from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        validate_name("Station", &s)?;
        Ok(Self(s))
    }

    /// Returns a string view of the station name.
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
impl From<&'static str> for StationName {
    /// Creates a new station name from a hardcoded string, which must be valid.
    fn from(name: &'static str) -> Self {
        StationName::new(name).expect("Hardcoded station names must be valid")
    }
}

impl<'de> Deserialize<'de> for StationName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        StationName::new(s).map_err(serde::de::Error::custom)
    }
}

/// Represents a correctly-formatted (but maybe non-existent) line name.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub(crate) struct LineName(String);

impl LineName {
    /// Creates a new line name from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        validate_name("Line", &s)?;
        Ok(Self(s))
    }

    /// Returns a string view of the line name.
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
impl From<&'static str> for LineName {
    /// Creates a new line name from a hardcoded string, which must be valid.
    fn from(name: &'static str) -> Self {
        LineName::new(name).expect("Hardcoded line names must be valid")
    }
}

impl<'de> Deserialize<'de> for LineName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LineName::new(s).map_err(serde::de::Error::custom)
    }
}

/// Display color of a line, as free-form text (e.g. `GREEN` or `bg-red-500`).
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub(crate) struct LineColor(String);

impl LineColor {
    /// Creates a new line color from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(ModelError("Line color cannot be empty".to_owned()));
        }
        if s.chars().count() > MAX_COLOR_LENGTH {
            return Err(ModelError("Line color is too long".to_owned()));
        }
        Ok(Self(s))
    }

    /// Returns a string view of the line color.
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
impl From<&'static str> for LineColor {
    /// Creates a new line color from a hardcoded string, which must be valid.
    fn from(color: &'static str) -> Self {
        LineColor::new(color).expect("Hardcoded line colors must be valid")
    }
}

impl<'de> Deserialize<'de> for LineColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LineColor::new(s).map_err(serde::de::Error::custom)
    }
}

/// A wall-clock time of day with minute precision, rendered as `HH:MM` on the wire and stored
/// as minutes since midnight in the database.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct DayTime(u16);

impl DayTime {
    /// Creates a time of day from a count of `minutes` since midnight with range validation.
    pub(crate) fn from_minutes(minutes: u16) -> ModelResult<Self> {
        if minutes >= MINUTES_PER_DAY {
            return Err(ModelError(format!("Time of day {} is out of range", minutes)));
        }
        Ok(Self(minutes))
    }

    /// Creates a time of day from an `i32` as extracted from the database.
    pub(crate) fn from_i32(minutes: i32) -> ModelResult<Self> {
        match u16::try_from(minutes) {
            Ok(minutes) => Self::from_minutes(minutes),
            Err(_) => Err(ModelError(format!("Time of day {} is out of range", minutes))),
        }
    }

    /// Parses a time of day in `HH:MM` format from an untrusted string `s`.
    pub(crate) fn parse(s: &str) -> ModelResult<Self> {
        let (hours, minutes) = match s.split_once(':') {
            Some(parts) => parts,
            None => return Err(ModelError(format!("Invalid time of day '{}'", s))),
        };
        if hours.len() != 2 || minutes.len() != 2 {
            return Err(ModelError(format!("Invalid time of day '{}'", s)));
        }
        // u16's FromStr tolerates a leading `+`, so insist on digits before parsing.
        if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(ModelError(format!("Invalid time of day '{}'", s)));
        }
        match (hours.parse::<u16>(), minutes.parse::<u16>()) {
            (Ok(h), Ok(m)) if h < 24 && m < 60 => Ok(Self(h * 60 + m)),
            _ => Err(ModelError(format!("Invalid time of day '{}'", s))),
        }
    }

    /// Returns the time of day as minutes since midnight, for storage purposes.
    pub(crate) fn as_minutes(&self) -> i32 {
        i32::from(self.0)
    }
}

impl fmt::Display for DayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[cfg(test)]
impl From<&'static str> for DayTime {
    /// Creates a time of day from a hardcoded string, which must be valid.
    fn from(s: &'static str) -> Self {
        DayTime::parse(s).expect("Hardcoded times of day must be valid")
    }
}

impl Serialize for DayTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DayTime::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A named point of the network.
#[derive(Clone, Constructor, Getters, Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct Station {
    /// Identity of the station in the database.
    id: i64,

    /// Unique human-readable name of the station.
    name: StationName,
}

/// Mutable details of a line, shared by creation requests, update requests, and the persisted
/// entity.  Updates overwrite every field at once; there are no partial-update semantics.
///
/// Note that `start_time < end_time` is deliberately not enforced; see DESIGN.md.
#[derive(Clone, Constructor, Deserialize, Getters, Serialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct LineDetails {
    /// Unique human-readable name of the line.
    name: LineName,

    /// Display color of the line.
    color: LineColor,

    /// Time of the first departure of the day.
    start_time: DayTime,

    /// Time of the last departure of the day.
    end_time: DayTime,

    /// Minutes between departures.
    interval_time: u16,
}

/// A named route with schedule details and an ordered collection of station links.
#[derive(Clone, Constructor, Getters, Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct Line {
    /// Identity of the line in the database.
    id: i64,

    /// Schedule details of the line.
    #[serde(flatten)]
    details: LineDetails,
}

/// One link of a line's station chain.
///
/// Links are keyed by station id within their line and point backwards: the unique link with an
/// absent `previous_station_id` is the head, and the chain order is only recoverable by following
/// the successor relation from there.  Storage order carries no meaning.
#[derive(Clone, Constructor, Deserialize, Getters, Serialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct LineStation {
    /// The station this link attaches to the line.
    station_id: i64,

    /// The station this link comes after, or absent if this link is the head.
    previous_station_id: Option<i64>,

    /// Distance from the previous station.
    distance: i32,

    /// Travel duration from the previous station.
    duration: i32,
}

/// One stop of a line as rendered to clients, in traversal order.
#[derive(Constructor, Getters, Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct LineStop {
    /// Identity of the station at this stop.
    id: i64,

    /// Name of the station at this stop.
    name: StationName,

    /// The station this stop comes after, or absent for the first stop.
    previous_station_id: Option<i64>,

    /// Distance from the previous stop.
    distance: i32,

    /// Travel duration from the previous stop.
    duration: i32,
}

/// A line together with its stops sorted in traversal order.
#[derive(Constructor, Getters, Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct LineWithStops {
    /// The line itself.
    #[serde(flatten)]
    line: Line,

    /// The line's stops, head first.
    stations: Vec<LineStop>,
}
