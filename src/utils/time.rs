use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Deserializer};

/// Get EPOCH timestamp in milliseconds
pub fn get_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert any of the timestamp shapes found in stored documents into a
/// single instant. Accepted shapes:
/// - native bson datetime
/// - millisecond count (int or double)
/// - `{seconds, nanoseconds}` pair, with or without leading underscores
/// - RFC 3339 / ISO-8601 string, a bare date is midnight UTC
pub fn normalize_timestamp(value: &Bson) -> Option<DateTime<Utc>> {
    match value {
        Bson::DateTime(dt) => Utc.timestamp_millis_opt(dt.timestamp_millis()).single(),
        Bson::Int64(ms) => Utc.timestamp_millis_opt(*ms).single(),
        Bson::Int32(ms) => Utc.timestamp_millis_opt(*ms as i64).single(),
        Bson::Double(ms) if ms.is_finite() => Utc.timestamp_millis_opt(ms.round() as i64).single(),
        Bson::Document(doc) => from_seconds_parts(doc),
        Bson::String(s) => parse_iso(s),
        _ => None,
    }
}

fn from_seconds_parts(doc: &Document) -> Option<DateTime<Utc>> {
    let seconds = ["seconds", "_seconds"]
        .iter()
        .find_map(|key| doc.get(*key).and_then(bson_as_i64))?;
    let nanos = ["nanoseconds", "_nanoseconds"]
        .iter()
        .find_map(|key| doc.get(*key).and_then(bson_as_i64))
        .unwrap_or(0);
    let nanos = u32::try_from(nanos).ok()?;
    Utc.timestamp_opt(seconds, nanos).single()
}

fn bson_as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(*v as i64),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.is_finite() => Some(*v as i64),
        _ => None,
    }
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Deserialize helper turning a heterogeneous timestamp field into epoch ms.
/// Unrecognised values become `None` instead of failing the whole document.
pub fn deserialize_flexible_ts<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Option::<Bson>::deserialize(deserializer)?;
    Ok(val
        .as_ref()
        .and_then(normalize_timestamp)
        .map(|dt| dt.timestamp_millis()))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, DateTime as BsonDateTime};

    use super::*;

    const MS: i64 = 1_700_000_000_123;

    #[test]
    fn test_normalize_native_and_millis() {
        let native = Bson::DateTime(BsonDateTime::from_millis(MS));
        assert_eq!(normalize_timestamp(&native).unwrap().timestamp_millis(), MS);
        assert_eq!(normalize_timestamp(&Bson::Int64(MS)).unwrap().timestamp_millis(), MS);
        let double = Bson::Double(MS as f64);
        assert_eq!(normalize_timestamp(&double).unwrap().timestamp_millis(), MS);
    }

    #[test]
    fn test_normalize_seconds_parts() {
        let parts = Bson::Document(doc! {"_seconds": 1_700_000_000_i64, "_nanoseconds": 123_000_000});
        assert_eq!(normalize_timestamp(&parts).unwrap().timestamp_millis(), MS);
        let parts = Bson::Document(doc! {"seconds": 1_700_000_000_i64});
        assert_eq!(
            normalize_timestamp(&parts).unwrap().timestamp_millis(),
            1_700_000_000_000
        );
        let broken = Bson::Document(doc! {"nanoseconds": 5});
        assert_eq!(normalize_timestamp(&broken), None);
    }

    #[test]
    fn test_normalize_iso_strings() {
        let iso = Bson::String("2023-11-14T22:13:20.123Z".to_owned());
        assert_eq!(normalize_timestamp(&iso).unwrap().timestamp_millis(), MS);
        let offset = Bson::String("2023-11-15T03:43:20.123+05:30".to_owned());
        assert_eq!(normalize_timestamp(&offset).unwrap().timestamp_millis(), MS);
        let date = Bson::String("2023-11-14".to_owned());
        assert_eq!(
            normalize_timestamp(&date).unwrap().timestamp_millis(),
            1_699_920_000_000
        );
        assert_eq!(normalize_timestamp(&Bson::String("yesterday".into())), None);
        assert_eq!(normalize_timestamp(&Bson::Boolean(true)), None);
    }

    #[test]
    fn test_deserialize_flexible_ts() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Sample {
            #[serde(default, deserialize_with = "deserialize_flexible_ts")]
            created_at: Option<i64>,
        }
        let doc = doc! {"createdAt": {"seconds": 1_700_000_000_i64, "nanoseconds": 123_000_000}};
        let sample: Sample = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(sample.created_at, Some(MS));
        let sample: Sample = mongodb::bson::from_document(doc! {}).unwrap();
        assert_eq!(sample.created_at, None);
    }
}
