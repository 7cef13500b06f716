use std::sync::{Mutex, MutexGuard};

use crate::error::{ApiError, Result};
use crate::registry::{ReadingLog, StationRegistry, StationStore};
use crate::schema::*;
use crate::utils;
use anyhow::anyhow;
use chrono::NaiveDateTime;
use common::req::{NewReading, NewStation, Reading, Station};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS station (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    latitude FLOAT NOT NULL,
    longitude FLOAT NOT NULL,
    app_version VARCHAR(10) NOT NULL DEFAULT '0.01'
);

CREATE TABLE IF NOT EXISTS reading (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    timestamp DATETIME NOT NULL,
    reading VARCHAR(20) NOT NULL,
    app_version VARCHAR(10),
    station_id INTEGER NOT NULL REFERENCES station (id)
);

CREATE INDEX IF NOT EXISTS reading_station_id ON reading (station_id);
"#;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name=station)]
pub struct StationRow {
    pub id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub app_version: String,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name=station)]
pub struct StationFields<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub app_version: &'a str,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name=reading)]
pub struct ReadingRow {
    pub id: i32,
    pub timestamp: NaiveDateTime, // UTC
    #[diesel(column_name = value)]
    pub reading: String,
    pub app_version: Option<String>,
    pub station_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name=reading)]
pub struct NewReadingRow<'a> {
    pub timestamp: NaiveDateTime,
    #[diesel(column_name = value)]
    pub reading: &'a str,
    pub app_version: Option<&'a str>,
    pub station_id: i32,
}

impl From<StationRow> for Station {
    fn from(row: StationRow) -> Self {
        Station {
            id: row.id,
            latitude: row.latitude,
            longitude: row.longitude,
            app_version: row.app_version,
        }
    }
}

impl<'a> From<&'a NewStation> for StationFields<'a> {
    fn from(station: &'a NewStation) -> Self {
        StationFields {
            latitude: station.latitude,
            longitude: station.longitude,
            app_version: &station.app_version,
        }
    }
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Reading {
            id: row.id,
            timestamp: row.timestamp,
            reading: row.reading,
            app_version: row.app_version,
            station_id: row.station_id,
        }
    }
}

pub struct Db {
    conn: SqliteConnection,
}

impl Db {
    pub fn connect(database_url: &str) -> anyhow::Result<Self> {
        let mut conn = SqliteConnection::establish(database_url)?;
        conn.batch_execute("PRAGMA foreign_keys = ON;")?;

        debug!("Connected to {database_url}");
        Ok(Self { conn })
    }

    /// Creates the tables if they are missing. Existing data is kept.
    pub fn init_schema(&mut self) -> anyhow::Result<()> {
        self.conn.batch_execute(SCHEMA)?;
        Ok(())
    }

    fn station_exists(conn: &mut SqliteConnection, id: i32) -> Result<bool> {
        let found = station::table
            .find(id)
            .select(station::id)
            .first::<i32>(conn)
            .optional()?;

        Ok(found.is_some())
    }
}

// ids that are not integers are never found
fn parse_id(id: &str) -> Result<i32> {
    id.parse().map_err(|_| ApiError::NotFound)
}

impl StationRegistry for Db {
    type Station = Station;
    type Input = NewStation;

    fn list(&mut self) -> Result<Vec<Station>> {
        let rows = station::table
            .order(station::id.asc())
            .select(StationRow::as_select())
            .load(&mut self.conn)?;

        Ok(rows.into_iter().map(Station::from).collect())
    }

    fn get(&mut self, id: &str) -> Result<Station> {
        let id = parse_id(id)?;

        station::table
            .find(id)
            .select(StationRow::as_select())
            .first(&mut self.conn)
            .optional()?
            .map(Station::from)
            .ok_or(ApiError::NotFound)
    }

    fn create(&mut self, input: &NewStation) -> Result<Station> {
        let row = diesel::insert_into(station::table)
            .values(StationFields::from(input))
            .returning(StationRow::as_returning())
            .get_result(&mut self.conn)?;

        debug!("Created station {}", row.id);
        Ok(row.into())
    }

    fn update(&mut self, id: &str, input: &NewStation) -> Result<Station> {
        let id = parse_id(id)?;

        diesel::update(station::table.find(id))
            .set(StationFields::from(input))
            .returning(StationRow::as_returning())
            .get_result(&mut self.conn)
            .optional()?
            .map(Station::from)
            .ok_or(ApiError::NotFound)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let id = parse_id(id)?;

        self.conn.transaction::<_, ApiError, _>(|conn| {
            let readings = diesel::delete(reading::table.filter(reading::station_id.eq(id)))
                .execute(conn)?;
            let stations = diesel::delete(station::table.find(id)).execute(conn)?;

            if stations == 0 {
                return Err(ApiError::NotFound);
            }

            debug!("Deleted station {id} and {readings} readings");
            Ok(())
        })
    }
}

impl ReadingLog for Db {
    fn list_readings(&mut self) -> Result<Vec<Reading>> {
        let rows = reading::table
            .order(reading::id.asc())
            .select(ReadingRow::as_select())
            .load(&mut self.conn)?;

        Ok(rows.into_iter().map(Reading::from).collect())
    }

    fn append(&mut self, new: &NewReading) -> Result<Reading> {
        self.conn.transaction::<_, ApiError, _>(|conn| {
            if !Self::station_exists(conn, new.station_id)? {
                return Err(ApiError::NotFound);
            }

            let row = diesel::insert_into(reading::table)
                .values(NewReadingRow {
                    timestamp: utils::utc_now(),
                    reading: &new.reading,
                    app_version: Some(&new.app_version),
                    station_id: new.station_id,
                })
                .returning(ReadingRow::as_returning())
                .get_result(conn)?;

            debug!("Appended reading {} for station {}", row.id, row.station_id);
            Ok(row.into())
        })
    }

    fn station_readings(&mut self, station_id: &str) -> Result<Vec<Reading>> {
        let station_id = parse_id(station_id)?;

        if !Self::station_exists(&mut self.conn, station_id)? {
            return Err(ApiError::NotFound);
        }

        let rows = reading::table
            .filter(reading::station_id.eq(station_id))
            .order(reading::id.asc())
            .select(ReadingRow::as_select())
            .load(&mut self.conn)?;

        Ok(rows.into_iter().map(Reading::from).collect())
    }
}

impl StationStore for Mutex<Db> {
    type Station = Station;
    type Input = NewStation;
    type Registry<'a> = MutexGuard<'a, Db>
    where
        Self: 'a;

    fn registry(&self) -> Result<MutexGuard<'_, Db>> {
        self.lock()
            .map_err(|_| ApiError::Storage(anyhow!("database lock poisoned")))
    }
}
