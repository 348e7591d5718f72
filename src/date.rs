//! Parsing of the dates sent by clients.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// Day and month may omit the leading zero, the year must have four digits.
const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day padding:none]/[month padding:none]/[year]");

/// Parse a client supplied date in the format `DD/MM/YYYY`.
///
/// The string must form a valid calendar date, e.g. "31/02/2025" is rejected.
///
/// # Errors
/// Returns [Error::MalformedDate] containing the original string if it cannot be parsed.
pub fn parse_input_date(text: &str) -> Result<Date, Error> {
    // `[year]` accepts an optional sign.
    if text.contains(['+', '-']) {
        return Err(Error::MalformedDate(text.to_owned()));
    }

    Date::parse(text.trim(), &DATE_FORMAT).map_err(|_| Error::MalformedDate(text.to_owned()))
}
