use std::collections::HashMap;

use actix_web::{web, HttpRequest};
use common::req::{fields, NewReading, NewStation};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// Request arguments, taken from a JSON object body and then from the query
/// string. A body field wins over a query parameter of the same name.
#[derive(Debug, Default)]
pub struct Fields(Map<String, Value>);

impl Fields {
    /// An empty body, or valid JSON that is not an object, adds no fields. A
    /// body that is not JSON at all is rejected.
    pub fn from_request(req: &HttpRequest, body: &[u8]) -> Result<Self> {
        let mut map = if body.iter().all(u8::is_ascii_whitespace) {
            Map::new()
        } else {
            match serde_json::from_slice::<Value>(body) {
                Ok(Value::Object(map)) => map,
                Ok(_) => Map::new(),
                Err(_) => return Err(ApiError::MalformedBody),
            }
        };

        if let Ok(query) = web::Query::<HashMap<String, String>>::from_query(req.query_string()) {
            for (key, value) in query.into_inner() {
                map.entry(key).or_insert(Value::String(value));
            }
        }

        Ok(Self(map))
    }

    /// First non-null value under `name` or one of its aliases.
    pub fn value(&self, name: &'static str, aliases: &[&str]) -> Option<&Value> {
        std::iter::once(name)
            .chain(aliases.iter().copied())
            .filter_map(|key| self.0.get(key))
            .find(|value| !value.is_null())
    }

    pub fn required(&self, name: &'static str, aliases: &[&str]) -> Result<&Value> {
        self.value(name, aliases).ok_or(ApiError::MissingField(name))
    }

    /// Finite numbers and numeric strings. `NaN` and infinities are rejected.
    pub fn float(&self, name: &'static str, aliases: &[&str]) -> Result<f64> {
        match self.required(name, aliases)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
        .ok_or(ApiError::InvalidField(name))
    }

    pub fn integer(&self, name: &'static str, aliases: &[&str]) -> Result<i32> {
        match self.required(name, aliases)? {
            Value::Number(n) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or(ApiError::InvalidField(name)),
            Value::String(s) => s.trim().parse().map_err(|_| ApiError::InvalidField(name)),
            _ => Err(ApiError::InvalidField(name)),
        }
    }

    /// Any scalar, as text. Strings are taken verbatim.
    pub fn text(&self, name: &'static str, aliases: &[&str]) -> Result<String> {
        match self.required(name, aliases)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(ApiError::InvalidField(name)),
        }
    }
}

/// Typed input of a store, bound from the request arguments.
pub trait FromFields: Sized {
    fn from_fields(fields: &Fields) -> Result<Self>;
}

pub const LATITUDE_ALIASES: &[&str] = &["lat"];
pub const LONGITUDE_ALIASES: &[&str] = &["long"];

pub fn aliases(field: &str) -> &'static [&'static str] {
    match field {
        fields::LATITUDE => LATITUDE_ALIASES,
        fields::LONGITUDE => LONGITUDE_ALIASES,
        _ => &[],
    }
}

impl FromFields for NewStation {
    fn from_fields(f: &Fields) -> Result<Self> {
        Ok(NewStation {
            latitude: f.float(fields::LATITUDE, LATITUDE_ALIASES)?,
            longitude: f.float(fields::LONGITUDE, LONGITUDE_ALIASES)?,
            app_version: f.text(fields::APP_VERSION, &[])?,
        })
    }
}

impl FromFields for NewReading {
    fn from_fields(f: &Fields) -> Result<Self> {
        let station_id = f.integer(fields::STATION_ID, &[])?;
        let reading = f.text(fields::READING, &[])?;
        // required from clients, but the server stamps the time itself
        f.required(fields::TIMESTAMP, &[])?;
        let app_version = f.text(fields::APP_VERSION, &[])?;

        Ok(NewReading {
            station_id,
            reading,
            app_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use serde_json::json;

    fn fields(uri: &str, body: Value) -> Fields {
        let req = TestRequest::post().uri(uri).to_http_request();
        Fields::from_request(&req, body.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn station_from_json_body() {
        let f = fields(
            "/device",
            json!({"latitude": 10.0, "longitude": "20.5", "app_version": "1.0"}),
        );

        let station = NewStation::from_fields(&f).unwrap();
        assert_eq!(station.latitude, 10.0);
        assert_eq!(station.longitude, 20.5);
        assert_eq!(station.app_version, "1.0");
    }

    #[test]
    fn station_accepts_short_names_and_query() {
        let f = fields("/device?app_version=0.02&long=4", json!({"lat": -1.5}));

        let station = NewStation::from_fields(&f).unwrap();
        assert_eq!(station.latitude, -1.5);
        assert_eq!(station.longitude, 4.0);
        assert_eq!(station.app_version, "0.02");
    }

    #[test]
    fn body_wins_over_query() {
        let f = fields("/device?app_version=query", json!({"app_version": "body"}));
        assert_eq!(f.text(fields::APP_VERSION, &[]).unwrap(), "body");
    }

    #[test]
    fn missing_and_invalid_fields() {
        let f = fields("/device", json!({"latitude": 1.0, "app_version": "1"}));
        assert!(matches!(
            NewStation::from_fields(&f),
            Err(ApiError::MissingField("longitude"))
        ));

        let f = fields(
            "/device",
            json!({"latitude": "north", "longitude": 1.0, "app_version": "1"}),
        );
        assert!(matches!(
            NewStation::from_fields(&f),
            Err(ApiError::InvalidField("latitude"))
        ));
    }

    #[test]
    fn null_counts_as_missing() {
        let f = fields("/device", json!({"latitude": null}));
        assert!(matches!(
            f.required(fields::LATITUDE, &[]),
            Err(ApiError::MissingField("latitude"))
        ));
    }

    #[test]
    fn reading_requires_timestamp_but_drops_it() {
        let f = fields(
            "/reading",
            json!({"station_id": "1", "reading": "72F", "app_version": "1.0"}),
        );
        assert!(matches!(
            NewReading::from_fields(&f),
            Err(ApiError::MissingField("timestamp"))
        ));

        let f = fields(
            "/reading",
            json!({
                "station_id": 1,
                "reading": "72F",
                "timestamp": "2020-01-01T00:00:00",
                "app_version": "1.0"
            }),
        );
        let reading = NewReading::from_fields(&f).unwrap();
        assert_eq!(reading.station_id, 1);
        assert_eq!(reading.reading, "72F");
    }

    #[test]
    fn non_object_body_is_ignored() {
        let req = TestRequest::post()
            .uri("/device?latitude=1")
            .to_http_request();
        let f = Fields::from_request(&req, b"[1, 2, 3]").unwrap();
        assert_eq!(f.float(fields::LATITUDE, &[]).unwrap(), 1.0);
    }

    #[test]
    fn empty_body_uses_query_only() {
        let req = TestRequest::post()
            .uri("/device?latitude=1")
            .to_http_request();
        let f = Fields::from_request(&req, b" \n").unwrap();
        assert_eq!(f.float(fields::LATITUDE, &[]).unwrap(), 1.0);
    }

    #[test]
    fn broken_json_body_is_rejected() {
        let req = TestRequest::post().uri("/device").to_http_request();
        let res = Fields::from_request(&req, br#"{"latitude": 10.0, "longitude""#);
        assert!(matches!(res, Err(ApiError::MalformedBody)));
    }

    #[test]
    fn non_finite_coordinates_are_invalid() {
        for bad in ["NaN", "nan", "inf", "-inf", "infinity"] {
            let f = fields(
                "/device",
                json!({"latitude": bad, "longitude": 1.0, "app_version": "1"}),
            );
            assert!(
                matches!(
                    NewStation::from_fields(&f),
                    Err(ApiError::InvalidField("latitude"))
                ),
                "{bad} accepted"
            );
        }

        let f = fields("/device?longitude=NaN", json!({"latitude": 1.0, "app_version": "1"}));
        assert!(matches!(
            NewStation::from_fields(&f),
            Err(ApiError::InvalidField("longitude"))
        ));
    }
}
