use http::header::{self, HeaderMap, HeaderValue};
use http::StatusCode;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::UtcOffset;

use store::FileMetadata;

use crate::error::Error;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    NotModified,
    Serve,
}

#[derive(Debug, Clone)]
pub struct CacheResponse {
    pub disposition: Disposition,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

pub fn http_date(file: &FileMetadata) -> Result<String, Error> {
    Ok(file.upload_date.to_offset(UtcOffset::UTC).format(HTTP_DATE)?)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidArgument(format!("{} is not a valid header value: {:?}", name, value)))
}

// Every value of a possibly repeated header, split on commas
fn tokens<'a>(request: &'a HeaderMap, name: header::HeaderName) -> impl Iterator<Item = &'a str> {
    request
        .get_all(name)
        .into_iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn etag_matches(tag: &str, checksum: &str) -> bool {
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag == "*" || tag.trim_matches('"') == checksum
}

/// Decides between a 304 and a full response for `file`.
///
/// `no-cache` or `private` in `cache-control` always serves. Otherwise an `if-none-match`
/// naming the checksum gets a 304, anything else is served.
pub fn evaluate(file: &FileMetadata, request: &HeaderMap) -> Result<CacheResponse, Error> {
    let bypass = tokens(request, header::CACHE_CONTROL).any(|t| {
        let t = t.to_ascii_lowercase();
        t == "no-cache" || t == "private" || t.starts_with("private=")
    });
    let fresh = tokens(request, header::IF_NONE_MATCH).any(|t| etag_matches(t, &file.checksum));

    let disposition = if !bypass && fresh {
        Disposition::NotModified
    } else {
        Disposition::Serve
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::ETAG, header_value("ETag", &file.checksum)?);
    headers.insert(header::LAST_MODIFIED, header_value("Last-Modified", &http_date(file)?)?);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=0"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("public"));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let status = match disposition {
        Disposition::NotModified => StatusCode::NOT_MODIFIED,
        Disposition::Serve => {
            let content_type = file.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
            headers.insert(header::CONTENT_TYPE, header_value("Content-Type", content_type)?);
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.length));
            StatusCode::OK
        }
    };

    Ok(CacheResponse {
        disposition,
        status,
        headers,
    })
}
