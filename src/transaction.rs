//! Defines the transaction record shared by every part of the dashboard.
//!
//! Transactions are scored by the remote API and are never modified here.
//! The push channel and older API versions do not always send every field, so
//! deserialization falls back to neutral defaults instead of rejecting the
//! payload.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

/// The label used when a transaction is missing its location or device.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Date-times sent without an offset, e.g. "2024-05-01T13:45:00.123".
const LOCAL_DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// The unique identifier the scoring API assigns to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    /// Wrap a raw ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw ID.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A financial event together with the classification from the scoring API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money moved. Use [Transaction::effective_amount] for sums.
    #[serde(default, deserialize_with = "number_or_zero")]
    pub amount: f64,
    /// When the transaction happened.
    #[serde(
        default = "OffsetDateTime::now_utc",
        deserialize_with = "date_time_or_now",
        serialize_with = "serialize_rfc3339"
    )]
    pub time: OffsetDateTime,
    /// Where the transaction was made.
    #[serde(default = "unknown_label", deserialize_with = "label_or_unknown")]
    pub location: String,
    /// The device the transaction was made from.
    #[serde(default = "unknown_label", deserialize_with = "label_or_unknown")]
    pub device: String,
    /// Whether the scoring API classified the transaction as fraudulent.
    #[serde(default)]
    pub is_fraud: bool,
    /// How anomalous the transaction looks, higher is more anomalous.
    ///
    /// Conceptually in the range [-1.0, 1.0].
    #[serde(default, deserialize_with = "number_or_zero")]
    pub anomaly_score: f64,
}

impl Transaction {
    /// The amount to use in totals and averages.
    ///
    /// Negative and non-finite amounts count as zero.
    pub fn effective_amount(&self) -> f64 {
        if self.amount.is_finite() && self.amount > 0.0 {
            self.amount
        } else {
            0.0
        }
    }

    /// The anomaly score with non-finite values mapped to zero.
    pub fn effective_score(&self) -> f64 {
        if self.anomaly_score.is_finite() {
            self.anomaly_score
        } else {
            0.0
        }
    }

    /// The calendar date of the transaction in the timezone `local_offset`.
    pub fn local_date(&self, local_offset: UtcOffset) -> Date {
        self.time.to_offset(local_offset).date()
    }

    /// The transaction time formatted as RFC 3339.
    pub fn time_rfc3339(&self) -> String {
        format_rfc3339(self.time)
    }
}

/// The body sent to the scoring API to process a transaction.
///
/// Used both for single submissions and for the rows of a batch import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// The amount of money moved.
    pub amount: f64,
    /// Where the transaction was made.
    pub location: String,
    /// The device the transaction was made from.
    pub device: String,
    /// When the transaction happened.
    #[serde(
        deserialize_with = "date_time_or_now",
        serialize_with = "serialize_rfc3339"
    )]
    pub time: OffsetDateTime,
}

/// Parse a date-time in RFC 3339 format, or without an offset in which case
/// it is assumed to be UTC.
pub fn parse_date_time(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(text, &Rfc3339).or_else(|rfc3339_error| {
        PrimitiveDateTime::parse(text, &LOCAL_DATE_TIME_FORMAT)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|_| rfc3339_error)
    })
}

/// Format `date_time` as RFC 3339, seconds precision is used if formatting fails.
pub fn format_rfc3339(date_time: OffsetDateTime) -> String {
    date_time
        .format(&Rfc3339)
        .unwrap_or_else(|_| date_time.unix_timestamp().to_string())
}

fn unknown_label() -> String {
    UNKNOWN_LABEL.to_owned()
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn label_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_label))
}

fn date_time_or_now<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let time = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) => parse_date_time(&text)
            .inspect_err(|error| {
                tracing::warn!("Using the current time for unparseable time \"{text}\": {error}")
            })
            .ok(),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => {
            tracing::warn!("Using the current time for non-text time {other}");
            None
        }
    };

    Ok(time.unwrap_or_else(OffsetDateTime::now_utc))
}

fn serialize_rfc3339<S>(date_time: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text = date_time
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use time::{OffsetDateTime, macros::datetime};

    use super::{Transaction, TransactionId};

    /// Create a legitimate transaction on 2024-03-01 with a neutral score.
    pub(crate) fn transaction(id: i64, amount: f64) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            amount,
            time: datetime!(2024-03-01 12:00 UTC),
            location: "Auckland".to_owned(),
            device: "iPhone".to_owned(),
            is_fraud: false,
            anomaly_score: 0.0,
        }
    }

    pub(crate) fn fraudulent(id: i64, amount: f64) -> Transaction {
        Transaction {
            is_fraud: true,
            ..transaction(id, amount)
        }
    }

    pub(crate) fn at(mut transaction: Transaction, time: OffsetDateTime) -> Transaction {
        transaction.time = time;
        transaction
    }
}
