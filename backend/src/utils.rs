use chrono::{NaiveDateTime, Utc};

/// Current UTC time without an offset, the way timestamps are stored.
pub fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
