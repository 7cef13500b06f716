use anyhow::Context;
use common::req::{fields, DeviceRecord};
use log::debug;

use crate::error::{ApiError, Result};
use crate::registry::{StationRegistry, StationStore};
use crate::req::{aliases, Fields, FromFields};
use crate::shelf::{Entry, Shelf, ShelfHandle};

/// A device as sent by a client of the key-value store. The id comes from the
/// client and keys the record in its text form; every field, the id included,
/// is kept without any coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInput {
    pub id: String,
    pub record: DeviceRecord,
}

impl FromFields for DeviceInput {
    fn from_fields(f: &Fields) -> Result<Self> {
        let id = f.text(fields::ID, &[])?;

        let mut record = DeviceRecord::new();
        record.insert(fields::ID.to_string(), f.required(fields::ID, &[])?.clone());
        for field in fields::DEVICE {
            let value = f.required(field, aliases(field))?;
            record.insert(field.to_string(), value.clone());
        }

        Ok(DeviceInput { id, record })
    }
}

/// Station registry on top of a shelf, keyed by the device id.
pub struct DeviceRegistry<'a> {
    shelf: ShelfHandle<'a>,
}

impl<'a> DeviceRegistry<'a> {
    pub fn new(shelf: ShelfHandle<'a>) -> Self {
        Self { shelf }
    }

    pub fn close(self) -> Result<()> {
        Ok(self.shelf.close()?)
    }

    fn store(&mut self, input: &DeviceInput) -> Result<DeviceRecord> {
        let entry = encode(&input.record)?;
        if self.shelf.insert(input.id.as_str(), entry).is_some() {
            debug!("Replaced device {}", input.id);
        } else {
            debug!("Created device {}", input.id);
        }
        Ok(input.record.clone())
    }
}

fn encode(record: &DeviceRecord) -> Result<Entry> {
    let mut entry = Entry::new();
    for (field, value) in record {
        let text = serde_json::to_string(value).context("cannot encode device field")?;
        entry.insert(field.clone(), text);
    }
    Ok(entry)
}

fn decode(entry: &Entry) -> Result<DeviceRecord> {
    let mut record = DeviceRecord::new();
    for (field, text) in entry {
        let value = serde_json::from_str(text)
            .with_context(|| format!("corrupt device field '{field}'"))?;
        record.insert(field.clone(), value);
    }
    Ok(record)
}

impl StationRegistry for DeviceRegistry<'_> {
    type Station = DeviceRecord;
    type Input = DeviceInput;

    fn list(&mut self) -> Result<Vec<DeviceRecord>> {
        self.shelf.iter().map(|(_, entry)| decode(entry)).collect()
    }

    fn get(&mut self, id: &str) -> Result<DeviceRecord> {
        let entry = self.shelf.get(id).ok_or(ApiError::NotFound)?;
        decode(entry)
    }

    /// An existing device with the same id is overwritten.
    fn create(&mut self, input: &DeviceInput) -> Result<DeviceRecord> {
        self.store(input)
    }

    fn update(&mut self, id: &str, input: &DeviceInput) -> Result<DeviceRecord> {
        if !self.shelf.contains_key(id) {
            return Err(ApiError::NotFound);
        }
        if input.id != id {
            return Err(ApiError::IdentifierMismatch);
        }
        self.store(input)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.shelf.remove(id).ok_or(ApiError::NotFound)?;
        debug!("Deleted device {id}");
        Ok(())
    }
}

impl StationStore for Shelf {
    type Station = DeviceRecord;
    type Input = DeviceInput;
    type Registry<'a> = DeviceRegistry<'a>
    where
        Self: 'a;

    fn registry(&self) -> Result<DeviceRegistry<'_>> {
        Ok(DeviceRegistry::new(self.acquire()?))
    }

    fn release(registry: DeviceRegistry<'_>) -> Result<()> {
        registry.close()
    }
}
