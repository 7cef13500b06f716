// keep in sync with db.rs of backend
use std::collections::BTreeMap;

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Station {
    pub id: i32, // unique, key
    pub latitude: f64,
    pub longitude: f64,
    pub app_version: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Reading {
    pub id: i32,
    pub timestamp: NaiveDateTime, // UTC, stamped by the server
    pub reading: String,
    pub app_version: Option<String>,
    pub station_id: i32,
}

/// Station fields as sent by a client, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStation {
    pub latitude: f64,
    pub longitude: f64,
    pub app_version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub station_id: i32,
    pub reading: String,
    pub app_version: String,
}

/// A device as kept in the key-value store: field name to the value exactly
/// as the client sent it.
pub type DeviceRecord = BTreeMap<String, serde_json::Value>;

pub mod fields {
    pub const ID: &str = "id";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const APP_VERSION: &str = "app_version";
    pub const STATION_ID: &str = "station_id";
    pub const READING: &str = "reading";
    pub const TIMESTAMP: &str = "timestamp";

    /// Fields stored for a device, in addition to its id.
    pub const DEVICE: [&str; 3] = [LATITUDE, LONGITUDE, APP_VERSION];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_serializes_allowed_fields_only() {
        let station = Station {
            id: 3,
            latitude: 10.0,
            longitude: 20.5,
            app_version: "1.0".to_owned(),
        };

        let json = serde_json::to_value(&station).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 4);
        assert_eq!(obj["id"], 3);
        assert_eq!(obj["longitude"], 20.5);
        assert_eq!(obj["app_version"], "1.0");
    }

    #[test]
    fn reading_timestamp_is_iso8601() {
        let reading = Reading {
            id: 1,
            timestamp: NaiveDateTime::parse_from_str("2023-04-05 06:07:08", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            reading: "72F".to_owned(),
            app_version: None,
            station_id: 1,
        };

        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["timestamp"], "2023-04-05T06:07:08");
        assert!(json["app_version"].is_null());
    }
}
