//! Serde helpers for the JSON the remote API sends.
//!
//! The API is not strict about its types: IDs may arrive as strings or
//! integers, amounts as numbers or numeric strings, and dates with or without
//! a time component. These helpers normalise all of them.

use serde::{Deserialize, Deserializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

/// Deserialize an ID sent as either a JSON string or a JSON number.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(id) => Ok(id),
        StringOrNumber::Integer(id) => Ok(id.to_string()),
        StringOrNumber::Float(id) => Ok(id.to_string()),
    }
}

/// Deserialize an amount sent as either a JSON number or a numeric string,
/// e.g. `-25000`, `"-25000.00"`.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(amount) => amount
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("\"{amount}\" is not a number"))),
        StringOrNumber::Integer(amount) => Ok(amount as f64),
        StringOrNumber::Float(amount) => Ok(amount),
    }
}

pub mod date {
    //! Dates travel as "YYYY-MM-DD". Longer ISO 8601 strings, e.g.
    //! "2024-01-01T00:00:00.000000Z", are cut down to their date.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

    pub const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date
            .format(DATE_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(serde::de::Error::custom)
    }

    /// Parse the leading "YYYY-MM-DD" of `text`.
    pub fn parse(text: &str) -> Result<Date, time::error::Parse> {
        let text = text.trim();
        let date_part = text.get(..10).unwrap_or(text);
        Date::parse(date_part, DATE_FORMAT)
    }
}

pub mod timestamp {
    //! Optional timestamps in RFC 3339 or "YYYY-MM-DD HH:MM:SS" (assumed UTC).
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
        macros::format_description,
    };

    pub fn serialize<S>(timestamp: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match timestamp {
            Some(timestamp) => {
                let formatted = timestamp
                    .format(&Rfc3339)
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(text) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };

        if let Ok(timestamp) = OffsetDateTime::parse(&text, &Rfc3339) {
            return Ok(Some(timestamp));
        }

        PrimitiveDateTime::parse(
            &text,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
        .map(|timestamp| Some(timestamp.assume_utc()))
        .map_err(|error| serde::de::Error::custom(format!("invalid timestamp \"{text}\": {error}")))
    }
}
