//! HTTP protocol layer module
//!
//! Protocol helpers shared by the resource service: entity tags, dates,
//! header list parsing, ranges, MIME types, and response construction.

pub mod body;
pub mod date;
pub mod etag;
pub mod mime;
pub mod quoted;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::{BodySender, ResourceBody};
pub use range::{parse_range_headers, ByteRange, RangeParseResult};
pub use response::{
    build_304_response, build_400_response, build_403_response, build_404_response,
    build_405_response, build_412_response, build_500_response, build_options_response,
    build_redirect_response, ResourceResponse, ResponseDraft,
};
