// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Timestamp columns.
//!
//! Every timestamp is stored as fixed-width RFC 3339 UTC text with
//! microsecond precision, so that lexical order in SQL equals time order.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::PersistenceError;

const STORED_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
);

/// Renders a timestamp for storage.
///
/// # Errors
///
/// Returns an error if the value cannot be formatted (for example, a year
/// outside 0000-9999).
pub fn to_stored(at: OffsetDateTime) -> Result<String, PersistenceError> {
    Ok(at.to_offset(UtcOffset::UTC).format(STORED_FORMAT)?)
}

/// Parses a stored timestamp.
///
/// # Errors
///
/// Returns `PersistenceError::CorruptRecord` if the text is not in the
/// stored format.
pub fn from_stored(text: &str) -> Result<OffsetDateTime, PersistenceError> {
    Ok(PrimitiveDateTime::parse(text, STORED_FORMAT)?.assume_utc())
}

/// Parses an optional stored timestamp.
///
/// # Errors
///
/// Returns `PersistenceError::CorruptRecord` if the text is present but
/// malformed.
pub fn from_stored_opt(text: Option<&str>) -> Result<Option<OffsetDateTime>, PersistenceError> {
    text.map(from_stored).transpose()
}
