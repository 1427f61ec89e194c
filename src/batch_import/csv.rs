//! Parses uploaded CSV files into transactions for the scoring API.
//!
//! The expected columns are `amount, location, device` with an optional
//! fourth `time` column. The first row is a header and is ignored.

use csv::{ReaderBuilder, StringRecord, Trim};
use time::{
    Date, OffsetDateTime, Time, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{
    Error,
    transaction::{NewTransaction, parse_date_time},
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Parse the rows of `text`.
///
/// Rows without a time are stamped with `now`.
///
/// # Errors
/// Returns [Error::InvalidCSV] naming the line of the first row that has
/// fewer than three fields, a non-numeric amount, or an unreadable time.
pub fn parse_csv(text: &str, now: OffsetDateTime) -> Result<Vec<NewTransaction>, Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut transactions = Vec::new();

    for record in reader.records() {
        let record = record?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        let line = record.position().map_or(0, |position| position.line());
        let transaction = parse_record(&record, now)
            .map_err(|message| Error::InvalidCSV(format!("line {line}: {message}")))?;

        transactions.push(transaction);
    }

    tracing::debug!("Parsed {} transactions from CSV", transactions.len());

    Ok(transactions)
}

fn parse_record(record: &StringRecord, now: OffsetDateTime) -> Result<NewTransaction, String> {
    let (Some(amount), Some(location), Some(device)) = (record.get(0), record.get(1), record.get(2))
    else {
        return Err(format!(
            "expected the fields amount, location and device but got {} field(s)",
            record.len()
        ));
    };

    let amount = amount
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| format!("the amount \"{amount}\" is not a number"))?;

    let time = match record.get(3) {
        Some(time) if !time.is_empty() => parse_time(time)?,
        _ => now,
    };

    Ok(NewTransaction {
        amount,
        location: location.to_owned(),
        device: device.to_owned(),
        time,
    })
}

fn parse_time(text: &str) -> Result<OffsetDateTime, String> {
    parse_date_time(text)
        .or_else(|_| {
            Date::parse(text, DATE_FORMAT).map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
        })
        .map_err(|_| {
            format!("the time \"{text}\" is not an RFC 3339 date-time or a YYYY-MM-DD date")
        })
}
