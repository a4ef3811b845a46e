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

//! Database abstraction in terms of the operations needed by the server.
//!
//! The facilities in this module provide an abstraction over different database systems.  The
//! PostgreSQL backend is for production use and the SQLite backend is primarily intended to
//! support unit tests.

use crate::model::{Line, LineDetails, LineStation, ModelError, Station, StationName};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub mod postgres;
pub mod sqlite;

/// Database errors.  Any unexpected errors that come from the database are classified as
/// `BackendError`, but errors we know about have more specific types.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DbError {
    /// Indicates that a request to create an entry failed because it already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Catch-all error type for unexpected database errors.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Indicates a failure processing the data that already exists in the database.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// Indicates that a requested entry does not exist.
    #[error("Entity not found")]
    NotFound,

    /// Indicates that the database is not available (maybe because of too many active concurrent
    /// connections).
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// A database executor that can talk to multiple database implementations.
///
/// This type provides a generic mechanism to access a typed instance of a database, which is
/// needed by sqlx to offer type safety guarantees during query compilation.  Users of this type
/// are forced to destructure it and issue different calls for each database.
///
/// Note that this can wrap an executor that talks directly to a pool or to an open transaction.
pub enum Executor {
    /// A PostgreSQL executor that can be used in `sqlx` operations.
    Postgres(postgres::PostgresExecutor),

    /// A SQLite executor that can be used in `sqlx` operations.
    Sqlite(sqlite::SqliteExecutor),
}

/// A wrapper for a database executor backed by an open transaction.
///
/// The transaction is rolled back on drop unless `commit` is called.
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Returns the executor wrapped by this transaction.
    ///
    /// This would be better called `executor` but this method is used so frequently that it makes
    /// call sites too verbose.
    pub(crate) fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Commits the transaction.
    pub(crate) async fn commit(self) -> DbResult<()> {
        match self.0 {
            Executor::Postgres(e) => e.commit().await,
            Executor::Sqlite(e) => e.commit().await,
        }
    }
}

/// Abstraction over the database connection.
#[async_trait]
pub trait Db {
    /// Obtains an executor for direct access to the pool.
    ///
    /// This would be better called `executor` but this method is used so frequently that it makes
    /// call sites too verbose.
    async fn ex(&self) -> DbResult<Executor>;

    /// Begins a transaction.
    ///
    /// It is the responsibility of the caller to call `commit` on the returned executor.
    /// Otherwise the transaction is rolled back on drop.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Closes the connection pool, flushing any pending operations.
    async fn close(&self);
}

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,
    }
}

impl TryFrom<PgRow> for Station {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        Ok(Station::new(id, StationName::new(name)?))
    }
}

impl TryFrom<SqliteRow> for Station {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        Ok(Station::new(id, StationName::new(name)?))
    }
}

/// Rebuilds a `Line` from the raw column values of one `lines` row.
fn line_from_columns(
    id: i64,
    name: String,
    color: String,
    start_time: i32,
    end_time: i32,
    interval_time: i32,
) -> DbResult<Line> {
    use crate::model::{DayTime, LineColor, LineName};

    let interval_time = u16::try_from(interval_time)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid interval: {}", e)))?;
    let details = LineDetails::new(
        LineName::new(name)?,
        LineColor::new(color)?,
        DayTime::from_i32(start_time)?,
        DayTime::from_i32(end_time)?,
        interval_time,
    );
    Ok(Line::new(id, details))
}

impl TryFrom<PgRow> for Line {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let color: String = row.try_get("color").map_err(postgres::map_sqlx_error)?;
        let start_time: i32 = row.try_get("start_time").map_err(postgres::map_sqlx_error)?;
        let end_time: i32 = row.try_get("end_time").map_err(postgres::map_sqlx_error)?;
        let interval_time: i32 = row.try_get("interval_time").map_err(postgres::map_sqlx_error)?;
        line_from_columns(id, name, color, start_time, end_time, interval_time)
    }
}

impl TryFrom<SqliteRow> for Line {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let color: String = row.try_get("color").map_err(sqlite::map_sqlx_error)?;
        let start_time: i32 = row.try_get("start_time").map_err(sqlite::map_sqlx_error)?;
        let end_time: i32 = row.try_get("end_time").map_err(sqlite::map_sqlx_error)?;
        let interval_time: i32 = row.try_get("interval_time").map_err(sqlite::map_sqlx_error)?;
        line_from_columns(id, name, color, start_time, end_time, interval_time)
    }
}

impl TryFrom<PgRow> for LineStation {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let station_id: i64 = row.try_get("station_id").map_err(postgres::map_sqlx_error)?;
        let previous_station_id: Option<i64> =
            row.try_get("previous_station_id").map_err(postgres::map_sqlx_error)?;
        let distance: i32 = row.try_get("distance").map_err(postgres::map_sqlx_error)?;
        let duration: i32 = row.try_get("duration").map_err(postgres::map_sqlx_error)?;
        Ok(LineStation::new(station_id, previous_station_id, distance, duration))
    }
}

impl TryFrom<SqliteRow> for LineStation {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let station_id: i64 = row.try_get("station_id").map_err(sqlite::map_sqlx_error)?;
        let previous_station_id: Option<i64> =
            row.try_get("previous_station_id").map_err(sqlite::map_sqlx_error)?;
        let distance: i32 = row.try_get("distance").map_err(sqlite::map_sqlx_error)?;
        let duration: i32 = row.try_get("duration").map_err(sqlite::map_sqlx_error)?;
        Ok(LineStation::new(station_id, previous_station_id, distance, duration))
    }
}

/// Validates that a `DELETE` or `UPDATE` statement touched exactly one row.
fn ensure_one_row(affected: u64) -> DbResult<()> {
    match affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError(format!("Statement affected {} rows", affected))),
    }
}

/// Creates a new station called `name` and returns it with its assigned id.
pub(crate) async fn create_station(ex: &mut Executor, name: &StationName) -> DbResult<Station> {
    let query_str = "INSERT INTO stations (name) VALUES ($1) RETURNING id";
    let id: i64 = match ex {
        Executor::Postgres(ex) => {
            let row = sqlx::query(query_str)
                .bind(name.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let row = sqlx::query(query_str)
                .bind(name.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }
    };
    Ok(Station::new(id, name.clone()))
}

/// Gets the station with the given `id`.
pub(crate) async fn get_station(ex: &mut Executor, id: i64) -> DbResult<Station> {
    let query_str = "SELECT id, name FROM stations WHERE id = $1";
    match ex {
        Executor::Postgres(ex) => {
            let row = sqlx::query(query_str)
                .bind(id)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Station::try_from(row)
        }

        Executor::Sqlite(ex) => {
            let row = sqlx::query(query_str)
                .bind(id)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Station::try_from(row)
        }
    }
}

/// Gets all existing stations, sorted by id.
pub(crate) async fn get_stations(ex: &mut Executor) -> DbResult<Vec<Station>> {
    let query_str = "SELECT id, name FROM stations ORDER BY id";
    let mut stations = vec![];
    match ex {
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                stations.push(Station::try_from(row)?);
            }
        }

        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                stations.push(Station::try_from(row)?);
            }
        }
    }
    Ok(stations)
}

/// Deletes the station with the given `id`.
pub(crate) async fn delete_station(ex: &mut Executor, id: i64) -> DbResult<()> {
    let query_str = "DELETE FROM stations WHERE id = $1";
    let affected = match ex {
        Executor::Postgres(ex) => sqlx::query(query_str)
            .bind(id)
            .execute(ex.conn())
            .await
            .map_err(postgres::map_sqlx_error)?
            .rows_affected(),

        Executor::Sqlite(ex) => sqlx::query(query_str)
            .bind(id)
            .execute(ex.conn())
            .await
            .map_err(sqlite::map_sqlx_error)?
            .rows_affected(),
    };
    ensure_one_row(affected)
}

/// Creates a new line with the given `details` and returns it with its assigned id.
pub(crate) async fn create_line(ex: &mut Executor, details: &LineDetails) -> DbResult<Line> {
    let query_str = "
        INSERT INTO lines (name, color, start_time, end_time, interval_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ";
    let id: i64 = match ex {
        Executor::Postgres(ex) => {
            let row = sqlx::query(query_str)
                .bind(details.name().as_str())
                .bind(details.color().as_str())
                .bind(details.start_time().as_minutes())
                .bind(details.end_time().as_minutes())
                .bind(i32::from(*details.interval_time()))
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let row = sqlx::query(query_str)
                .bind(details.name().as_str())
                .bind(details.color().as_str())
                .bind(details.start_time().as_minutes())
                .bind(details.end_time().as_minutes())
                .bind(i32::from(*details.interval_time()))
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }
    };
    Ok(Line::new(id, details.clone()))
}

/// Gets the line with the given `id`.
pub(crate) async fn get_line(ex: &mut Executor, id: i64) -> DbResult<Line> {
    let query_str =
        "SELECT id, name, color, start_time, end_time, interval_time FROM lines WHERE id = $1";
    match ex {
        Executor::Postgres(ex) => {
            let row = sqlx::query(query_str)
                .bind(id)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Line::try_from(row)
        }

        Executor::Sqlite(ex) => {
            let row = sqlx::query(query_str)
                .bind(id)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Line::try_from(row)
        }
    }
}

/// Gets the line with the given `id`, locking its row until the end of the current transaction
/// so that concurrent chain mutations on the same line are serialized.
///
/// SQLite takes a database-wide write lock for the whole transaction anyway, so the plain query
/// is sufficient there.
pub(crate) async fn get_line_for_update(ex: &mut Executor, id: i64) -> DbResult<Line> {
    match ex {
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT id, name, color, start_time, end_time, interval_time
                FROM lines WHERE id = $1 FOR UPDATE
            ";
            let row = sqlx::query(query_str)
                .bind(id)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Line::try_from(row)
        }

        Executor::Sqlite(_) => get_line(ex, id).await,
    }
}

/// Gets all existing lines, sorted by id.
pub(crate) async fn get_lines(ex: &mut Executor) -> DbResult<Vec<Line>> {
    let query_str =
        "SELECT id, name, color, start_time, end_time, interval_time FROM lines ORDER BY id";
    let mut lines = vec![];
    match ex {
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                lines.push(Line::try_from(row)?);
            }
        }

        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                lines.push(Line::try_from(row)?);
            }
        }
    }
    Ok(lines)
}

/// Overwrites all mutable fields of the line `id` with `details`.
pub(crate) async fn update_line(ex: &mut Executor, id: i64, details: &LineDetails) -> DbResult<()> {
    let query_str = "
        UPDATE lines
        SET name = $1, color = $2, start_time = $3, end_time = $4, interval_time = $5
        WHERE id = $6
    ";
    let affected = match ex {
        Executor::Postgres(ex) => sqlx::query(query_str)
            .bind(details.name().as_str())
            .bind(details.color().as_str())
            .bind(details.start_time().as_minutes())
            .bind(details.end_time().as_minutes())
            .bind(i32::from(*details.interval_time()))
            .bind(id)
            .execute(ex.conn())
            .await
            .map_err(postgres::map_sqlx_error)?
            .rows_affected(),

        Executor::Sqlite(ex) => sqlx::query(query_str)
            .bind(details.name().as_str())
            .bind(details.color().as_str())
            .bind(details.start_time().as_minutes())
            .bind(details.end_time().as_minutes())
            .bind(i32::from(*details.interval_time()))
            .bind(id)
            .execute(ex.conn())
            .await
            .map_err(sqlite::map_sqlx_error)?
            .rows_affected(),
    };
    ensure_one_row(affected)
}

/// Deletes the line with the given `id`.
///
/// The line's chain links must have been deleted beforehand within the same transaction; see
/// `delete_line_stations`.
pub(crate) async fn delete_line(ex: &mut Executor, id: i64) -> DbResult<()> {
    let query_str = "DELETE FROM lines WHERE id = $1";
    let affected = match ex {
        Executor::Postgres(ex) => sqlx::query(query_str)
            .bind(id)
            .execute(ex.conn())
            .await
            .map_err(postgres::map_sqlx_error)?
            .rows_affected(),

        Executor::Sqlite(ex) => sqlx::query(query_str)
            .bind(id)
            .execute(ex.conn())
            .await
            .map_err(sqlite::map_sqlx_error)?
            .rows_affected(),
    };
    ensure_one_row(affected)
}

/// Gets all chain links of the line `line_id` in unspecified order.
pub(crate) async fn get_line_stations(
    ex: &mut Executor,
    line_id: i64,
) -> DbResult<Vec<LineStation>> {
    let query_str = "
        SELECT station_id, previous_station_id, distance, duration
        FROM line_stations WHERE line_id = $1
    ";
    let mut links = vec![];
    match ex {
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).bind(line_id).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                links.push(LineStation::try_from(row)?);
            }
        }

        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).bind(line_id).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                links.push(LineStation::try_from(row)?);
            }
        }
    }
    Ok(links)
}

/// Gets all chain links of the line `line_id` in unspecified order, together with the name of
/// the station each link attaches.
pub(crate) async fn get_line_stations_with_names(
    ex: &mut Executor,
    line_id: i64,
) -> DbResult<Vec<(LineStation, StationName)>> {
    let query_str = "
        SELECT ls.station_id, ls.previous_station_id, ls.distance, ls.duration, s.name
        FROM line_stations ls JOIN stations s ON s.id = ls.station_id
        WHERE ls.line_id = $1
    ";
    let mut links = vec![];
    match ex {
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).bind(line_id).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
                links.push((LineStation::try_from(row)?, StationName::new(name)?));
            }
        }

        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).bind(line_id).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
                links.push((LineStation::try_from(row)?, StationName::new(name)?));
            }
        }
    }
    Ok(links)
}

/// Checks whether any line's chain references the station `station_id`.
pub(crate) async fn station_in_any_line(ex: &mut Executor, station_id: i64) -> DbResult<bool> {
    let query_str = "SELECT COUNT(*) AS count FROM line_stations WHERE station_id = $1";
    let count: i64 = match ex {
        Executor::Postgres(ex) => {
            let row = sqlx::query(query_str)
                .bind(station_id)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let row = sqlx::query(query_str)
                .bind(station_id)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }
    };
    Ok(count > 0)
}

/// Stores a new chain `link` for the line `line_id`.
pub(crate) async fn put_line_station(
    ex: &mut Executor,
    line_id: i64,
    link: &LineStation,
) -> DbResult<()> {
    let query_str = "
        INSERT INTO line_stations (line_id, station_id, previous_station_id, distance, duration)
        VALUES ($1, $2, $3, $4, $5)
    ";
    let affected = match ex {
        Executor::Postgres(ex) => sqlx::query(query_str)
            .bind(line_id)
            .bind(link.station_id())
            .bind(link.previous_station_id())
            .bind(link.distance())
            .bind(link.duration())
            .execute(ex.conn())
            .await
            .map_err(postgres::map_sqlx_error)?
            .rows_affected(),

        Executor::Sqlite(ex) => sqlx::query(query_str)
            .bind(line_id)
            .bind(link.station_id())
            .bind(link.previous_station_id())
            .bind(link.distance())
            .bind(link.duration())
            .execute(ex.conn())
            .await
            .map_err(sqlite::map_sqlx_error)?
            .rows_affected(),
    };
    if affected != 1 {
        return Err(DbError::BackendError(format!("Insert affected {} rows", affected)));
    }
    Ok(())
}

/// Rewrites the predecessor pointer of the chain link `(line_id, station_id)` to `previous`.
pub(crate) async fn update_previous_station(
    ex: &mut Executor,
    line_id: i64,
    station_id: i64,
    previous: Option<i64>,
) -> DbResult<()> {
    let query_str =
        "UPDATE line_stations SET previous_station_id = $1 WHERE line_id = $2 AND station_id = $3";
    let affected = match ex {
        Executor::Postgres(ex) => sqlx::query(query_str)
            .bind(previous)
            .bind(line_id)
            .bind(station_id)
            .execute(ex.conn())
            .await
            .map_err(postgres::map_sqlx_error)?
            .rows_affected(),

        Executor::Sqlite(ex) => sqlx::query(query_str)
            .bind(previous)
            .bind(line_id)
            .bind(station_id)
            .execute(ex.conn())
            .await
            .map_err(sqlite::map_sqlx_error)?
            .rows_affected(),
    };
    ensure_one_row(affected)
}

/// Deletes the chain link `(line_id, station_id)`.
pub(crate) async fn delete_line_station(
    ex: &mut Executor,
    line_id: i64,
    station_id: i64,
) -> DbResult<()> {
    let query_str = "DELETE FROM line_stations WHERE line_id = $1 AND station_id = $2";
    let affected = match ex {
        Executor::Postgres(ex) => sqlx::query(query_str)
            .bind(line_id)
            .bind(station_id)
            .execute(ex.conn())
            .await
            .map_err(postgres::map_sqlx_error)?
            .rows_affected(),

        Executor::Sqlite(ex) => sqlx::query(query_str)
            .bind(line_id)
            .bind(station_id)
            .execute(ex.conn())
            .await
            .map_err(sqlite::map_sqlx_error)?
            .rows_affected(),
    };
    ensure_one_row(affected)
}

/// Deletes all chain links owned by the line `line_id`.
///
/// Deleting zero links is fine: the line may have no stations yet.
pub(crate) async fn delete_line_stations(ex: &mut Executor, line_id: i64) -> DbResult<()> {
    let query_str = "DELETE FROM line_stations WHERE line_id = $1";
    match ex {
        Executor::Postgres(ex) => {
            sqlx::query(query_str)
                .bind(line_id)
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
        }

        Executor::Sqlite(ex) => {
            sqlx::query(query_str)
                .bind(line_id)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
        }
    }
    Ok(())
}
