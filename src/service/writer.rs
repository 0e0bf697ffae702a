//! Range-aware body writer
//!
//! Chooses between a full `200`, a single-range `206`, a
//! `multipart/byteranges` `206`, and `416`, then streams the selected bytes.
//! File bodies are copied on a spawned task in `output_buffer_size` chunks;
//! in-memory bodies are sliced directly.

use super::{put_headers, HeaderLength, ServeError, ServeRequest, ServiceOptions};
use crate::content::{ContentSource, ResourceContent};
use crate::http::range::{self, ByteRange, RangeParseResult};
use crate::http::{BodySender, ResourceBody, ResourceResponse, ResponseDraft};
use crate::logger;
use bytes::{BufMut, Bytes, BytesMut};
use hyper::header::{self, HeaderValue};
use hyper::StatusCode;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::io::{self, SeekFrom};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

const BOUNDARY_LEN: usize = 24;
const NOT_SATISFIABLE_BODY: &str = "Range Not Satisfiable";

/// One piece of a response body
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Literal bytes, e.g. a multipart part header
    Literal(Bytes),
    /// A byte range of the resource
    Range(ByteRange),
    /// The whole resource, to end of stream
    All,
}

/// Write `content` honouring the request's `Range` headers
pub async fn write_content(
    req: &ServeRequest<'_>,
    content: &ResourceContent,
    mut draft: ResponseDraft,
    options: &ServiceOptions,
) -> Result<ResourceResponse, ServeError> {
    let range_values: Vec<&str> = req
        .headers
        .get_all(header::RANGE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let ranges = if options.accept_ranges && !range_values.is_empty() {
        range::parse_range_headers(&range_values, content.content_length)
    } else {
        RangeParseResult::None
    };

    let segments = match ranges {
        RangeParseResult::None => {
            put_headers(&mut draft, content, HeaderLength::Known, options);
            vec![Segment::All]
        }
        RangeParseResult::NotSatisfiable => {
            return Ok(not_satisfiable(draft, content, options, req.is_head));
        }
        RangeParseResult::Satisfiable(ranges) => {
            let total = content.content_length.unwrap_or(0);
            draft.set_status(StatusCode::PARTIAL_CONTENT);
            if let [single] = ranges.as_slice() {
                put_headers(&mut draft, content, HeaderLength::Explicit(single.len()), options);
                draft.put_str(header::CONTENT_RANGE, &single.to_header_value(total));
                vec![Segment::Range(*single)]
            } else {
                put_headers(&mut draft, content, HeaderLength::None, options);
                multipart_segments(&mut draft, &ranges, total)
            }
        }
    };

    logger::log_debug(&format!(
        "Serving {} as {} ({} segment(s))",
        req.path,
        draft.status(),
        segments.len()
    ));

    if req.is_head {
        return Ok(draft.into_response(ResourceBody::empty()));
    }
    let body = match &content.source {
        ContentSource::Memory(data) => ResourceBody::full(assemble(data, &segments)?),
        ContentSource::File(_) => spawn_copy(content.source.clone(), segments, options.output_buffer_size),
    };
    Ok(draft.into_response(body))
}

/// 416 with `Content-Range: bytes */length` and a short text body
fn not_satisfiable(
    mut draft: ResponseDraft,
    content: &ResourceContent,
    options: &ServiceOptions,
    is_head: bool,
) -> ResourceResponse {
    draft.clear_overrides();
    put_headers(&mut draft, content, HeaderLength::None, options);
    draft.remove(&header::CONTENT_ENCODING);
    draft.set_status(StatusCode::RANGE_NOT_SATISFIABLE);
    draft.put(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    draft.put(header::CONTENT_LENGTH, HeaderValue::from(NOT_SATISFIABLE_BODY.len()));
    draft.put_str(
        header::CONTENT_RANGE,
        &range::unsatisfiable_header_value(content.content_length),
    );
    let body = if is_head {
        ResourceBody::empty()
    } else {
        ResourceBody::full(NOT_SATISFIABLE_BODY)
    };
    draft.into_response(body)
}

/// Switch the draft to `multipart/byteranges` and lay out the parts
fn multipart_segments(draft: &mut ResponseDraft, ranges: &[ByteRange], total: u64) -> Vec<Segment> {
    let boundary = generate_boundary();
    let part_type = draft
        .effective(&header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    draft.drop_override(&header::CONTENT_TYPE);
    draft.put_str(
        header::CONTENT_TYPE,
        &format!("multipart/byteranges; boundary={boundary}"),
    );

    let mut segments = Vec::with_capacity(ranges.len() * 2 + 1);
    for (i, range) in ranges.iter().enumerate() {
        let mut head = String::new();
        if i > 0 {
            head.push_str("\r\n");
        }
        head.push_str("--");
        head.push_str(&boundary);
        head.push_str("\r\n");
        if let Some(ct) = &part_type {
            head.push_str("Content-Type: ");
            head.push_str(ct);
            head.push_str("\r\n");
        }
        head.push_str("Content-Range: ");
        head.push_str(&range.to_header_value(total));
        head.push_str("\r\n\r\n");
        segments.push(Segment::Literal(Bytes::from(head)));
        segments.push(Segment::Range(*range));
    }
    segments.push(Segment::Literal(Bytes::from(format!("\r\n--{boundary}--\r\n"))));
    segments
}

/// Random multipart boundary of ASCII letters and digits
pub fn generate_boundary() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect()
}

/// Concatenate segments of an in-memory body
fn assemble(data: &Bytes, segments: &[Segment]) -> io::Result<Bytes> {
    if let [Segment::All] = segments {
        return Ok(data.clone());
    }
    let mut out = BytesMut::new();
    for segment in segments {
        match segment {
            Segment::Literal(bytes) => out.put_slice(bytes),
            Segment::All => out.put_slice(data),
            Segment::Range(r) => {
                let slice = usize::try_from(r.first)
                    .ok()
                    .zip(usize::try_from(r.last).ok())
                    .and_then(|(first, last)| data.get(first..=last))
                    .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "range beyond content"))?;
                out.put_slice(slice);
            }
        }
    }
    Ok(out.freeze())
}

/// Stream segments of a file-backed body from a background task
fn spawn_copy(source: ContentSource, segments: Vec<Segment>, buffer_size: usize) -> ResourceBody {
    let (tx, body) = ResourceBody::channel();
    tokio::spawn(async move {
        if let Err(e) = copy_segments(&source, &segments, buffer_size.max(1), &tx).await {
            if e.kind() == io::ErrorKind::BrokenPipe {
                logger::log_debug("Client went away, abandoning body copy");
            } else {
                logger::log_error(&format!("Failed to stream resource body: {e}"));
                tx.fail(e).await;
            }
        }
    });
    body
}

async fn copy_segments(
    source: &ContentSource,
    segments: &[Segment],
    buffer_size: usize,
    tx: &BodySender,
) -> io::Result<()> {
    let mut reader = source.open().await?;
    let mut buf = vec![0u8; buffer_size];

    for segment in segments {
        match segment {
            Segment::Literal(bytes) => tx.send(bytes.clone()).await?,
            Segment::All => loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                tx.send(Bytes::copy_from_slice(&buf[..n])).await?;
            },
            Segment::Range(r) => {
                reader.seek(SeekFrom::Start(r.first)).await?;
                let mut remaining = r.len();
                while remaining > 0 {
                    let want = usize::try_from(remaining).map_or(buf.len(), |rem| rem.min(buf.len()));
                    let n = reader.read(&mut buf[..want]).await?;
                    if n == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "resource shorter than its recorded length",
                        ));
                    }
                    tx.send(Bytes::copy_from_slice(&buf[..n])).await?;
                    remaining -= n as u64;
                }
            }
        }
    }
    Ok(())
}
