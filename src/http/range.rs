//! HTTP Range request parsing module
//!
//! Range header parsing for resumable downloads and multi-range requests,
//! compliant with RFC 9110 section 14.

const BYTES_UNIT: &str = "bytes=";

/// A satisfiable byte range, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte position
    pub first: u64,
    /// Last byte position (inclusive)
    pub last: u64,
}

impl ByteRange {
    pub const fn new(first: u64, last: u64) -> Self {
        Self { first, last }
    }

    /// Number of bytes covered by the range
    #[inline]
    pub const fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    /// `Content-Range` value for a satisfied range
    pub fn to_header_value(self, total_size: u64) -> String {
        format!("bytes {}-{}/{total_size}", self.first, self.last)
    }

    fn overlaps(self, other: Self) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

/// `Content-Range` value for a 416 response
pub fn unsatisfiable_header_value(total_size: Option<u64>) -> String {
    match total_size {
        Some(size) => format!("bytes */{size}"),
        None => "bytes */*".to_string(),
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// No usable Range header (absent, or no `bytes` unit); serve full content
    None,
    /// At least one satisfiable range, in request order
    Satisfiable(Vec<ByteRange>),
    /// Ranges were requested but none can be satisfied - should return 416
    NotSatisfiable,
}

/// Parse HTTP Range header values (bytes unit, single or multiple ranges)
///
/// Supported forms, comma separated and possibly spread over several header
/// lines:
/// - `start-end` - Specific range, end clamped to the last byte
/// - `start-` - From start to end
/// - `-suffix` - Last suffix bytes
///
/// Entries starting beyond the content are dropped. A syntax error stops
/// parsing, keeping what was collected before it. Overlapping entries are
/// merged into the earlier one; otherwise request order is kept.
///
/// # Examples
/// ```
/// use rust_fileserver::http::range::{parse_range_headers, ByteRange, RangeParseResult};
///
/// let result = parse_range_headers(&["bytes=0-9,20-29"], Some(100));
/// assert_eq!(
///     result,
///     RangeParseResult::Satisfiable(vec![ByteRange::new(0, 9), ByteRange::new(20, 29)])
/// );
///
/// let result = parse_range_headers(&[], Some(100));
/// assert_eq!(result, RangeParseResult::None);
/// ```
pub fn parse_range_headers(headers: &[&str], file_size: Option<u64>) -> RangeParseResult {
    let mut saw_bytes_unit = false;
    let mut ranges: Vec<ByteRange> = Vec::new();

    'headers: for header in headers {
        let header = header.trim();
        let Some(spec) = strip_bytes_unit(header) else {
            continue; // Not bytes unit, ignore
        };
        saw_bytes_unit = true;

        // Without a known length nothing can be validated
        let Some(size) = file_size else {
            continue;
        };

        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match parse_range_spec(entry, size) {
                Ok(Some(range)) => push_merged(&mut ranges, range),
                Ok(None) => {} // unsatisfiable, drop it
                Err(()) => break 'headers,
            }
        }
    }

    if !saw_bytes_unit {
        return RangeParseResult::None;
    }
    if ranges.is_empty() {
        RangeParseResult::NotSatisfiable
    } else {
        RangeParseResult::Satisfiable(ranges)
    }
}

fn strip_bytes_unit(header: &str) -> Option<&str> {
    let prefix = header.get(..BYTES_UNIT.len())?;
    prefix
        .eq_ignore_ascii_case(BYTES_UNIT)
        .then(|| &header[BYTES_UNIT.len()..])
}

/// Parse one `first-last` entry against `file_size`
///
/// `Ok(None)` means syntactically valid but unsatisfiable.
fn parse_range_spec(entry: &str, file_size: u64) -> Result<Option<ByteRange>, ()> {
    let (start_str, end_str) = entry.split_once('-').ok_or(())?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());
    if end_str.contains('-') {
        return Err(());
    }

    // Suffix range: "-500" means last 500 bytes
    if start_str.is_empty() {
        let suffix = end_str.parse::<u64>().map_err(|_| ())?;
        if suffix == 0 || file_size == 0 {
            return Ok(None);
        }
        // Suffix larger than file is valid, just return whole file as range
        let first = file_size.saturating_sub(suffix);
        return Ok(Some(ByteRange::new(first, file_size - 1)));
    }

    let start = start_str.parse::<u64>().map_err(|_| ())?;
    let end = if end_str.is_empty() {
        None // Open-ended range
    } else {
        Some(end_str.parse::<u64>().map_err(|_| ())?)
    };

    if let Some(e) = end {
        if start > e {
            return Err(());
        }
    }

    // Start beyond file size is not satisfiable
    if start >= file_size {
        return Ok(None);
    }

    // Clamp end to file size - 1
    let last = end.map_or(file_size - 1, |e| e.min(file_size - 1));
    Ok(Some(ByteRange::new(start, last)))
}

/// Add `range`, folding in every collected range it overlaps
///
/// A widened range may reach ranges it did not touch before, so folding
/// repeats until nothing overlaps. The result takes the slot of the
/// earliest range it absorbed.
fn push_merged(ranges: &mut Vec<ByteRange>, mut range: ByteRange) {
    let mut slot: Option<usize> = None;
    while let Some(i) = ranges.iter().position(|r| r.overlaps(range)) {
        let existing = ranges.remove(i);
        range.first = range.first.min(existing.first);
        range.last = range.last.max(existing.last);
        slot = Some(slot.map_or(i, |s| s.min(i)));
    }
    match slot {
        Some(i) => ranges.insert(i, range),
        None => ranges.push(range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn satisfiable(result: RangeParseResult) -> Vec<ByteRange> {
        match result {
            RangeParseResult::Satisfiable(r) => r,
            other => panic!("Expected Satisfiable, got {other:?}"),
        }
    }

    #[test]
    fn test_no_range() {
        assert_eq!(parse_range_headers(&[], Some(100)), RangeParseResult::None);
    }

    #[test]
    fn test_standard_range() {
        let r = satisfiable(parse_range_headers(&["bytes=0-9"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 9)]);
        assert_eq!(r[0].len(), 10);
        assert_eq!(r[0].to_header_value(100), "bytes 0-9/100");
    }

    #[test]
    fn test_open_range() {
        let r = satisfiable(parse_range_headers(&["bytes=50-"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(50, 99)]);
        assert_eq!(r[0].len(), 50);
    }

    #[test]
    fn test_suffix_range() {
        let r = satisfiable(parse_range_headers(&["bytes=-20"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(80, 99)]);

        let r = satisfiable(parse_range_headers(&["bytes=-500"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 99)]);
    }

    #[test]
    fn test_end_clamped() {
        let r = satisfiable(parse_range_headers(&["bytes=0-199"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 99)]);
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            parse_range_headers(&["bytes=200-"], Some(100)),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_headers(&["bytes=-0"], Some(100)),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_headers(&["bytes=0-"], Some(0)),
            RangeParseResult::NotSatisfiable
        );
    }

    #[test]
    fn test_unknown_length_not_satisfiable() {
        assert_eq!(
            parse_range_headers(&["bytes=0-9"], None),
            RangeParseResult::NotSatisfiable
        );
    }

    #[test]
    fn test_unsatisfiable_entries_dropped() {
        let r = satisfiable(parse_range_headers(&["bytes=500-600,0-9"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 9)]);
    }

    #[test]
    fn test_multiple_ranges_keep_order() {
        let r = satisfiable(parse_range_headers(&["bytes=20-29, 0-9"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(20, 29), ByteRange::new(0, 9)]);
    }

    #[test]
    fn test_multiple_header_lines() {
        let r = satisfiable(parse_range_headers(&["bytes=0-9", "bytes=20-29"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 9), ByteRange::new(20, 29)]);
    }

    #[test]
    fn test_overlapping_ranges_merged() {
        let r = satisfiable(parse_range_headers(&["bytes=0-9,5-14,50-59"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 14), ByteRange::new(50, 59)]);
    }

    #[test]
    fn test_transitive_overlap_merged() {
        let r = satisfiable(parse_range_headers(&["bytes=0-9,20-29,5-25"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 29)]);

        // The widened range keeps the earliest slot it absorbed
        let r = satisfiable(parse_range_headers(&["bytes=50-59,0-9,20-29,8-21"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(50, 59), ByteRange::new(0, 29)]);

        let r = satisfiable(parse_range_headers(&["bytes=40-49", "bytes=0-9,30-45,5-35"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 49)]);
    }

    #[test]
    fn test_syntax_error_keeps_earlier_entries() {
        let r = satisfiable(parse_range_headers(&["bytes=0-9,a-b,20-29"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 9)]);

        assert_eq!(
            parse_range_headers(&["bytes=a-b"], Some(100)),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_headers(&["bytes=9-0"], Some(100)),
            RangeParseResult::NotSatisfiable
        );
    }

    #[test]
    fn test_other_unit_ignored() {
        assert_eq!(
            parse_range_headers(&["items=0-9"], Some(100)),
            RangeParseResult::None
        );
        let r = satisfiable(parse_range_headers(&["BYTES=0-0"], Some(100)));
        assert_eq!(r, vec![ByteRange::new(0, 0)]);
    }

    #[test]
    fn test_unsatisfiable_header_value() {
        assert_eq!(unsatisfiable_header_value(Some(100)), "bytes */100");
        assert_eq!(unsatisfiable_header_value(None), "bytes */*");
    }
}
