use serde::{Deserialize, Deserializer};

trait Nullable {
    type Value;

    fn into_option(self) -> Option<Self::Value>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr<W, T> {
    Wrapped(W),
    Plain(T),
}

/// Accepts `{value, "Valid": bool}`, a bare value, or `null`. The value of an
/// invalid wrapper is never exposed.
fn decode<'de, D, W>(deserializer: D) -> Result<Option<W::Value>, D::Error>
where
    D: Deserializer<'de>,
    W: Nullable + Deserialize<'de>,
    W::Value: Deserialize<'de>,
{
    Ok(
        match Option::<Repr<W, W::Value>>::deserialize(deserializer)? {
            Some(Repr::Wrapped(wrapped)) => wrapped.into_option(),
            Some(Repr::Plain(value)) => Some(value),
            None => None,
        },
    )
}

#[derive(Deserialize)]
struct NullTime {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Valid")]
    valid: bool,
}

impl Nullable for NullTime {
    type Value = String;

    fn into_option(self) -> Option<String> {
        self.valid.then_some(self.time)
    }
}

#[derive(Deserialize)]
struct NullString {
    #[serde(rename = "String")]
    string: String,
    #[serde(rename = "Valid")]
    valid: bool,
}

impl Nullable for NullString {
    type Value = String;

    fn into_option(self) -> Option<String> {
        self.valid.then_some(self.string)
    }
}

#[derive(Deserialize)]
struct NullInt {
    #[serde(rename = "Int64", alias = "Int32")]
    int: i64,
    #[serde(rename = "Valid")]
    valid: bool,
}

impl Nullable for NullInt {
    type Value = i64;

    fn into_option(self) -> Option<i64> {
        self.valid.then_some(self.int)
    }
}

#[derive(Deserialize)]
struct NullFloat {
    #[serde(rename = "Float64")]
    float: f64,
    #[serde(rename = "Valid")]
    valid: bool,
}

impl Nullable for NullFloat {
    type Value = f64;

    fn into_option(self) -> Option<f64> {
        self.valid.then_some(self.float)
    }
}

#[derive(Deserialize)]
struct NullBool {
    #[serde(rename = "Bool")]
    boolean: bool,
    #[serde(rename = "Valid")]
    valid: bool,
}

impl Nullable for NullBool {
    type Value = bool;

    fn into_option(self) -> Option<bool> {
        self.valid.then_some(self.boolean)
    }
}

/// `NullableTime` → `Option<String>`. The timestamp text is kept raw; the
/// core normalizes it.
pub fn time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    decode::<D, NullTime>(deserializer)
}

pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    decode::<D, NullString>(deserializer)
}

pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    decode::<D, NullInt>(deserializer)
}

/// Like [`int`], but rejects negative values (attendee limits and counts).
pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match int(deserializer)? {
        Some(value) => u32::try_from(value)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("count out of range: {value}"))),
        None => Ok(None),
    }
}

pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    decode::<D, NullFloat>(deserializer)
}

/// `NullableBoolean` → `bool`, where an invalid wrapper reads as `false`.
pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(decode::<D, NullBool>(deserializer)?.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "super::time")]
        at: Option<String>,
        #[serde(default, deserialize_with = "super::string")]
        label: Option<String>,
        #[serde(default, deserialize_with = "super::count")]
        limit: Option<u32>,
        #[serde(default, deserialize_with = "super::float")]
        fee: Option<f64>,
        #[serde(default, deserialize_with = "super::boolean")]
        flag: bool,
    }

    fn row(json: &str) -> Row {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn valid_wrappers_yield_their_value() {
        let r = row(
            r#"{
                "at": {"Time": "2025-03-01T18:00:00Z", "Valid": true},
                "label": {"String": "Hall A", "Valid": true},
                "limit": {"Int32": 50, "Valid": true},
                "fee": {"Float64": 12.5, "Valid": true},
                "flag": {"Bool": true, "Valid": true}
            }"#,
        );
        assert_eq!(r.at.as_deref(), Some("2025-03-01T18:00:00Z"));
        assert_eq!(r.label.as_deref(), Some("Hall A"));
        assert_eq!(r.limit, Some(50));
        assert_eq!(r.fee, Some(12.5));
        assert!(r.flag);
    }

    #[test]
    fn invalid_wrappers_never_expose_their_value() {
        let r = row(
            r#"{
                "at": {"Time": "0001-01-01T00:00:00Z", "Valid": false},
                "label": {"String": "stale", "Valid": false},
                "limit": {"Int64": 10, "Valid": false},
                "fee": {"Float64": 3.0, "Valid": false},
                "flag": {"Bool": true, "Valid": false}
            }"#,
        );
        assert!(r.at.is_none());
        assert!(r.label.is_none());
        assert!(r.limit.is_none());
        assert!(r.fee.is_none());
        assert!(!r.flag);
    }

    #[test]
    fn plain_values_null_and_missing_fields_are_accepted() {
        let r = row(r#"{"at": "2025-03-01T18:00:00", "limit": 3, "label": null}"#);
        assert_eq!(r.at.as_deref(), Some("2025-03-01T18:00:00"));
        assert_eq!(r.limit, Some(3));
        assert!(r.label.is_none());
        assert!(r.fee.is_none());
        assert!(!r.flag);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let err = serde_json::from_str::<Row>(r#"{"limit": {"Int32": -1, "Valid": true}}"#);
        assert!(err.is_err());
    }
}
