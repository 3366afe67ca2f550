use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// RFC 7231 fixed-date format, e.g. "Wed, 21 Oct 2015 07:28:00 GMT".
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Renders a timestamp for a Last-Modified header.
pub fn last_modified(updated_at: &DateTime<Utc>) -> String {
    updated_at.format(HTTP_DATE_FORMAT).to_string()
}

/// Compares an entity timestamp against an If-Modified-Since header value.
/// A header that does not parse is a failed precondition, not a cache miss.
/// HTTP dates carry whole seconds, so the comparison truncates to seconds;
/// an exact tie counts as not modified.
pub fn is_modified_since(updated_at: &DateTime<Utc>, header: &str) -> Result<bool> {
    let parsed = NaiveDateTime::parse_from_str(header, HTTP_DATE_FORMAT).map_err(|_| {
        Error::PreconditionFailed(format!("invalid If-Modified-Since date: {header}"))
    })?;
    Ok(updated_at.timestamp() > parsed.and_utc().timestamp())
}
