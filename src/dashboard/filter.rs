//! Narrowing the transaction collection down to what the user asked to see.

use serde::{Deserialize, Serialize};
use time::{Date, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, transaction::Transaction};

/// The format of the date inputs in the filter form.
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Which classification of transactions to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FraudStatus {
    #[default]
    All,
    Fraud,
    Legitimate,
}

impl FraudStatus {
    fn matches(self, transaction: &Transaction) -> bool {
        match self {
            FraudStatus::All => true,
            FraudStatus::Fraud => transaction.is_fraud,
            FraudStatus::Legitimate => !transaction.is_fraud,
        }
    }
}

/// An inclusive range of local calendar dates, either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

/// An inclusive range of amounts, either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AmountRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// The constraints the user has chosen for the transaction table.
///
/// Empty strings and absent bounds do not constrain anything, so the default
/// value keeps every transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    /// Free text matched against every field of a transaction.
    pub search: String,
    pub date_range: DateRange,
    pub amount_range: AmountRange,
    /// Matched as a case-insensitive substring of the location.
    pub location: String,
    /// Matched as a case-insensitive substring of the device.
    pub device: String,
    pub fraud_status: FraudStatus,
}

impl FilterSpec {
    /// Whether `transaction` satisfies every active constraint.
    ///
    /// `local_offset` is the timezone used to get a transaction's calendar
    /// date for the date range.
    pub fn matches(&self, transaction: &Transaction, local_offset: UtcOffset) -> bool {
        self.fraud_status.matches(transaction)
            && self.matches_amount(transaction)
            && self.matches_date(transaction, local_offset)
            && contains_ignore_case(&transaction.location, &self.location)
            && contains_ignore_case(&transaction.device, &self.device)
            && self.matches_search(transaction)
    }

    fn matches_amount(&self, transaction: &Transaction) -> bool {
        let AmountRange { min, max } = self.amount_range;

        min.is_none_or(|min| transaction.amount >= min)
            && max.is_none_or(|max| transaction.amount <= max)
    }

    fn matches_date(&self, transaction: &Transaction, local_offset: UtcOffset) -> bool {
        let DateRange { from, to } = self.date_range;

        if from.is_none() && to.is_none() {
            return true;
        }

        let date = transaction.local_date(local_offset);

        from.is_none_or(|from| date >= from) && to.is_none_or(|to| date <= to)
    }

    fn matches_search(&self, transaction: &Transaction) -> bool {
        if self.search.is_empty() {
            return true;
        }

        let needle = self.search.to_lowercase();
        let contains = |text: &str| text.to_lowercase().contains(&needle);

        contains(&transaction.id.to_string())
            || contains(&transaction.amount.to_string())
            || contains(&transaction.time_rfc3339())
            || contains(&transaction.location)
            || contains(&transaction.device)
            || contains(&transaction.is_fraud.to_string())
            || contains(&transaction.anomaly_score.to_string())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Get the transactions that match `filter`, in their original order.
pub fn filter_transactions(
    transactions: &[Transaction],
    filter: &FilterSpec,
    local_offset: UtcOffset,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|transaction| filter.matches(transaction, local_offset))
        .cloned()
        .collect()
}

/// The filter form as it appears in the query string of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterForm {
    pub search: String,
    /// A date formatted as "YYYY-MM-DD".
    pub from: String,
    /// A date formatted as "YYYY-MM-DD".
    pub to: String,
    pub min: String,
    pub max: String,
    pub location: String,
    pub device: String,
    pub fraud_status: FraudStatus,
}

impl FilterForm {
    /// Whether the form has no values, e.g. the dashboard was loaded without a query string.
    pub fn is_empty(&self) -> bool {
        self == &FilterForm::default()
    }
}

impl TryFrom<FilterForm> for FilterSpec {
    type Error = Error;

    fn try_from(form: FilterForm) -> Result<Self, Self::Error> {
        Ok(FilterSpec {
            search: form.search.trim().to_owned(),
            date_range: DateRange {
                from: parse_optional_date(&form.from)?,
                to: parse_optional_date(&form.to)?,
            },
            amount_range: AmountRange {
                min: parse_optional_amount(&form.min)?,
                max: parse_optional_amount(&form.max)?,
            },
            location: form.location.trim().to_owned(),
            device: form.device.trim().to_owned(),
            fraud_status: form.fraud_status,
        })
    }
}

impl From<&FilterSpec> for FilterForm {
    fn from(filter: &FilterSpec) -> Self {
        let format_date = |date: Option<Date>| {
            date.and_then(|date| date.format(DATE_FORMAT).ok())
                .unwrap_or_default()
        };
        let format_amount =
            |amount: Option<f64>| amount.map(|amount| amount.to_string()).unwrap_or_default();

        FilterForm {
            search: filter.search.clone(),
            from: format_date(filter.date_range.from),
            to: format_date(filter.date_range.to),
            min: format_amount(filter.amount_range.min),
            max: format_amount(filter.amount_range.max),
            location: filter.location.clone(),
            device: filter.device.clone(),
            fraud_status: filter.fraud_status,
        }
    }
}

fn parse_optional_date(text: &str) -> Result<Option<Date>, Error> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    Date::parse(text, DATE_FORMAT)
        .map(Some)
        .map_err(|error| Error::InvalidForm(format!("\"{text}\" is not a valid date: {error}")))
}

fn parse_optional_amount(text: &str) -> Result<Option<f64>, Error> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    match text.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(Some(amount)),
        _ => Err(Error::InvalidForm(format!(
            "\"{text}\" is not a valid amount"
        ))),
    }
}
