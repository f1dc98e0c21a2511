use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::error::{DownloadError, Result};

/// Characters escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Extract filename from URL path
pub fn filename_from_url(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .and_then(|s| {
                percent_decode_str(s)
                    .decode_utf8()
                    .ok()
                    .map(|cow| cow.into_owned())
            })
    })
}

/// Percent-encodes `segment` so it stays one path segment (`/` becomes `%2F`).
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Parses `base` and appends `segment` as an encoded path segment.
pub fn join_segment(base: &str, segment: &str) -> Result<String> {
    let url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        encode_path_segment(segment)
    );
    Url::parse(&url).map_err(|source| DownloadError::InvalidUrl {
        url: url.clone(),
        source,
    })?;
    Ok(url)
}

/// Builds `base` + `path` with the given query pairs, form-encoded.
pub fn with_query(base: &str, path: &str, pairs: &[(&str, String)]) -> Result<String> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw).map_err(|source| DownloadError::InvalidUrl {
        url: raw.clone(),
        source,
    })?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in pairs {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}
