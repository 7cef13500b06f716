use std::sync::MutexGuard;

use common::req::{NewReading, Reading};

use crate::{error::Result, req::FromFields};

/// Create/read/update/delete of stations.
///
/// Ids are taken as they appear in the URL; a store decides what a valid id
/// looks like and answers `NotFound` for anything it cannot resolve.
pub trait StationRegistry {
    type Station: serde::Serialize;
    type Input;

    fn list(&mut self) -> Result<Vec<Self::Station>>;

    fn get(&mut self, id: &str) -> Result<Self::Station>;

    fn create(&mut self, input: &Self::Input) -> Result<Self::Station>;

    /// Replaces all fields of an existing station.
    fn update(&mut self, id: &str, input: &Self::Input) -> Result<Self::Station>;

    fn delete(&mut self, id: &str) -> Result<()>;
}

/// Append-only log of readings, each tied to an existing station.
pub trait ReadingLog {
    fn list_readings(&mut self) -> Result<Vec<Reading>>;

    /// Fails with `NotFound` when the station does not exist, without writing
    /// anything. The timestamp is always the current server time.
    fn append(&mut self, reading: &NewReading) -> Result<Reading>;

    fn station_readings(&mut self, station_id: &str) -> Result<Vec<Reading>>;
}

/// Hands out a registry for the duration of one request.
pub trait StationStore: 'static {
    type Station: serde::Serialize;
    type Input: FromFields;
    type Registry<'a>: StationRegistry<Station = Self::Station, Input = Self::Input>
    where
        Self: 'a;

    fn registry(&self) -> Result<Self::Registry<'_>>;

    /// Ends the request's use of the registry. Dropping it has the same effect
    /// but can only log failures.
    fn release(registry: Self::Registry<'_>) -> Result<()> {
        drop(registry);
        Ok(())
    }
}

impl<R: StationRegistry + ?Sized> StationRegistry for MutexGuard<'_, R> {
    type Station = R::Station;
    type Input = R::Input;

    fn list(&mut self) -> Result<Vec<Self::Station>> {
        (**self).list()
    }

    fn get(&mut self, id: &str) -> Result<Self::Station> {
        (**self).get(id)
    }

    fn create(&mut self, input: &Self::Input) -> Result<Self::Station> {
        (**self).create(input)
    }

    fn update(&mut self, id: &str, input: &Self::Input) -> Result<Self::Station> {
        (**self).update(id, input)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        (**self).delete(id)
    }
}
