//! Quoted comma-separated header values
//!
//! `If-Match` / `If-None-Match` carry lists of quoted entity tags, where a
//! comma may appear inside the quotes (`W/"a,b", "c"`), so a plain
//! `split(',')` is not enough. `Accept-Encoding` carries tokens with
//! quality parameters (`gzip;q=0.8`).

use std::fmt;

/// Error for entity-tag lists that violate the `#entity-tag` grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedList(pub String);

impl fmt::Display for MalformedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed entity-tag list: {}", self.0)
    }
}

impl std::error::Error for MalformedList {}

/// Parse a list of entity tags, keeping quotes and the weak prefix
///
/// Empty list elements are skipped. An unterminated quote, an unquoted tag,
/// or a list without any tag is an error.
///
/// # Examples
/// ```
/// use rust_fileserver::http::quoted::parse_etag_list;
/// let tags = parse_etag_list(r#"W/"a,b", "c""#).unwrap();
/// assert_eq!(tags, vec![r#"W/"a,b""#, r#""c""#]);
/// ```
pub fn parse_etag_list(value: &str) -> Result<Vec<&str>, MalformedList> {
    let bytes = value.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b',' => {
                i += 1;
                continue;
            }
            b'*' => {
                tags.push(&value[i..=i]);
                i += 1;
            }
            _ => {
                let start = i;
                if value[i..].starts_with("W/") {
                    i += 2;
                }
                if bytes.get(i) != Some(&b'"') {
                    return Err(MalformedList(value.to_string()));
                }
                let Some(close) = value[i + 1..].find('"') else {
                    return Err(MalformedList(value.to_string()));
                };
                i += close + 2;
                tags.push(&value[start..i]);
            }
        }

        // Only whitespace may separate a tag from the next comma
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        if i < bytes.len() && bytes[i] != b',' {
            return Err(MalformedList(value.to_string()));
        }
    }

    if tags.is_empty() {
        return Err(MalformedList(value.to_string()));
    }
    Ok(tags)
}

/// Split on commas that are not inside double quotes, trimming each element
/// and dropping empty ones
pub fn split_csv(value: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in value.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                items.push(value[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    items.push(value[start..].trim());
    items.retain(|item| !item.is_empty());
    items
}

/// One element of a quality-valued list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityItem {
    /// Lowercased token without parameters
    pub token: String,
    /// Quality in thousandths (`q=0.5` is 500)
    pub quality: u16,
}

/// Parse a quality-valued list such as `Accept-Encoding`
///
/// Elements keep their header order; sorting is left to the caller. An
/// element with a malformed `q` parameter gets quality 0.
pub fn parse_quality_csv(value: &str) -> Vec<QualityItem> {
    split_csv(value)
        .into_iter()
        .filter_map(|item| {
            let mut params = item.split(';');
            let token = params.next()?.trim().trim_matches('"').to_ascii_lowercase();
            if token.is_empty() {
                return None;
            }
            let mut quality = 1000;
            for param in params {
                let Some((name, q)) = param.split_once('=') else {
                    continue;
                };
                if name.trim().eq_ignore_ascii_case("q") {
                    quality = parse_qvalue(q.trim()).unwrap_or(0);
                }
            }
            Some(QualityItem { token, quality })
        })
        .collect()
}

/// Parse `qvalue = ( "0" [ "." 0*3DIGIT ] ) / ( "1" [ "." 0*3("0") ] )`
fn parse_qvalue(q: &str) -> Option<u16> {
    let (whole, frac) = q.split_once('.').unwrap_or((q, ""));
    if frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut thousandths: u16 = 0;
    for (i, digit) in frac.bytes().enumerate() {
        let scale = [100, 10, 1][i];
        thousandths += u16::from(digit - b'0') * scale;
    }
    match whole {
        "0" => Some(thousandths),
        "1" if thousandths == 0 => Some(1000),
        _ => None,
    }
}
