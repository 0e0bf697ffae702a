//! Resource service module
//!
//! Turns a GET or HEAD request into a resource response:
//!
//! 1. normalize the request path and look it up through the content chain
//! 2. redirect directories without a trailing slash, and files with one
//! 3. evaluate conditional headers (304 / 412 / 400)
//! 4. process the content by kind: welcome handling, precompressed
//!    negotiation, or plain
//! 5. write a full, single-range, or multipart body
//!
//! A lookup miss returns `None` so the caller can render its own 404.

pub mod conditional;
mod error;
pub mod path;
pub mod writer;


pub use conditional::Precondition;
pub use error::ServeError;

use crate::config::Config;
use crate::content::precompressed::select_variant;
use crate::content::{
    ContentKind, ContentLookup, DirectoryRenderer, EncodingNegotiator, FileLookup, HtmlListing,
    PrecompressedFormat, PrecompressedLookup, PrecompressedVariant, ResourceContent,
    WelcomeAction, WelcomeFiles, WelcomeLookup, WelcomeResolver,
};
use crate::http::{self, etag, ResourceBody, ResourceResponse, ResponseDraft};
use crate::logger;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Method, Request};
use std::io;
use std::sync::Arc;

/// Lookup chain used by the server
pub type DefaultLookup = WelcomeLookup<PrecompressedLookup<FileLookup>>;

/// Runtime switches of the resource service
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub etags: bool,
    pub dir_allowed: bool,
    pub accept_ranges: bool,
    pub redirect_welcome: bool,
    /// Pre-encoded `Cache-Control` value
    pub cache_control: Option<HeaderValue>,
    /// Path suffixes served with `Content-Encoding: gzip`, e.g. `.svgz`
    pub gzip_equivalent_extensions: Vec<String>,
    /// Chunk size of streamed bodies
    pub output_buffer_size: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            etags: true,
            dir_allowed: true,
            accept_ranges: true,
            redirect_welcome: false,
            cache_control: None,
            gzip_equivalent_extensions: vec![".svgz".to_string()],
            output_buffer_size: 32 * 1024,
        }
    }
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        let resources = &config.resources;
        let cache_control = resources.cache_control.as_deref().and_then(|value| {
            HeaderValue::from_str(value)
                .map_err(|_| {
                    logger::log_warning(&format!("Ignoring invalid cache_control: {value:?}"));
                })
                .ok()
        });
        Self {
            etags: resources.etags,
            dir_allowed: resources.dir_allowed,
            accept_ranges: resources.accept_ranges,
            redirect_welcome: resources.redirect_welcome,
            cache_control,
            gzip_equivalent_extensions: resources.gzip_equivalent_extensions.clone(),
            output_buffer_size: config.performance.output_buffer_size,
        }
    }
}

/// Request data the pipeline works from
#[derive(Debug)]
pub struct ServeRequest<'a> {
    /// Decoded, normalized path in context
    pub path: String,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub is_head: bool,
}

/// How `Content-Length` is emitted by `put_headers`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLength {
    /// The content's own length, if known
    Known,
    /// A specific length, e.g. of a single range
    Explicit(u64),
    /// No `Content-Length`
    None,
}

/// Write the representation headers of `content` into `draft`
pub fn put_headers(
    draft: &mut ResponseDraft,
    content: &ResourceContent,
    length: HeaderLength,
    options: &ServiceOptions,
) {
    if let Some(lm) = content.last_modified_value() {
        draft.put_str(header::LAST_MODIFIED, &lm);
    }

    let content_length = match length {
        HeaderLength::Known => content.content_length,
        HeaderLength::Explicit(len) => Some(len),
        HeaderLength::None => None,
    };
    if let Some(len) = content_length {
        draft.put(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    if let Some(ct) = &content.content_type {
        draft.put_str(header::CONTENT_TYPE, ct);
    }
    if let Some(ce) = &content.content_encoding {
        draft.put_str(header::CONTENT_ENCODING, ce);
    }
    if options.etags {
        if let Some(tag) = &content.etag {
            draft.put_str(header::ETAG, tag);
        }
    }

    if options.accept_ranges && !draft.contains(&header::ACCEPT_RANGES) {
        draft.put(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    if let Some(cc) = &options.cache_control {
        if !draft.contains(&header::CACHE_CONTROL) {
            draft.put(header::CACHE_CONTROL, cc.clone());
        }
    }
}

/// Static resource service over a lookup chain
pub struct ResourceService<L, W = WelcomeFiles, R = HtmlListing> {
    lookup: L,
    welcome: W,
    renderer: R,
    negotiator: Arc<EncodingNegotiator>,
    options: ServiceOptions,
}

impl ResourceService<DefaultLookup> {
    /// Build the default chain (welcome, precompressed, filesystem) from config
    pub fn from_config(config: &Config) -> io::Result<Self> {
        let resources = &config.resources;
        let formats: Vec<PrecompressedFormat> = resources.precompressed.clone();
        let preferred = if resources.preferred_encoding_order.is_empty() {
            formats.iter().map(|f| f.encoding.clone()).collect()
        } else {
            resources.preferred_encoding_order.clone()
        };

        let lookup = WelcomeLookup::new(PrecompressedLookup::new(
            FileLookup::new(&resources.root)?,
            formats,
        ));
        Ok(Self::new(lookup, ServiceOptions::from_config(config))
            .with_negotiator(Arc::new(EncodingNegotiator::new(
                preferred,
                resources.encoding_cache_size,
            )))
            .with_welcome_resolver(WelcomeFiles::new(resources.welcome_files.clone())))
    }
}

impl<L: ContentLookup> ResourceService<L> {
    pub fn new(lookup: L, options: ServiceOptions) -> Self {
        Self {
            lookup,
            welcome: WelcomeFiles::default(),
            renderer: HtmlListing,
            negotiator: Arc::new(EncodingNegotiator::default()),
            options,
        }
    }
}

impl<L, W, R> ResourceService<L, W, R>
where
    L: ContentLookup,
    W: WelcomeResolver,
    R: DirectoryRenderer,
{
    #[must_use]
    pub fn with_negotiator(mut self, negotiator: Arc<EncodingNegotiator>) -> Self {
        self.negotiator = negotiator;
        self
    }

    pub fn with_welcome_resolver<W2: WelcomeResolver>(self, welcome: W2) -> ResourceService<L, W2, R> {
        ResourceService {
            lookup: self.lookup,
            welcome,
            renderer: self.renderer,
            negotiator: self.negotiator,
            options: self.options,
        }
    }

    pub fn with_renderer<R2: DirectoryRenderer>(self, renderer: R2) -> ResourceService<L, W, R2> {
        ResourceService {
            lookup: self.lookup,
            welcome: self.welcome,
            renderer,
            negotiator: self.negotiator,
            options: self.options,
        }
    }

    pub fn negotiator(&self) -> &EncodingNegotiator {
        &self.negotiator
    }

    /// Serve a GET or HEAD request
    ///
    /// Returns `None` when no resource matches the path (or the method is
    /// not GET/HEAD). Failures before the response is produced become
    /// 400/500 responses.
    pub async fn serve<B>(&self, request: &Request<B>) -> Option<ResourceResponse> {
        let is_head = match *request.method() {
            Method::GET => false,
            Method::HEAD => true,
            _ => return None,
        };
        let Some(path) = path::normalize_path(request.uri().path()) else {
            logger::log_warning(&format!("Rejected request path: {}", request.uri().path()));
            return None;
        };
        let req = ServeRequest {
            path,
            query: request.uri().query(),
            headers: request.headers(),
            is_head,
        };

        match self.try_serve(&req).await {
            Ok(response) => response,
            Err(e) => {
                logger::log_error(&format!("Failed to serve resource {}: {e}", req.path));
                Some(e.to_response())
            }
        }
    }

    async fn try_serve(&self, req: &ServeRequest<'_>) -> Result<Option<ResourceResponse>, ServeError> {
        let Some(content) = self.lookup.lookup(&req.path).await? else {
            return Ok(None);
        };
        self.do_get(req, content).await.map(Some)
    }

    async fn do_get(
        &self,
        req: &ServeRequest<'_>,
        content: ResourceContent,
    ) -> Result<ResourceResponse, ServeError> {
        let ends_with_slash = req.path.ends_with('/');
        let mut draft = ResponseDraft::new();

        if content.is_directory {
            if !ends_with_slash {
                let location = path::with_query(format!("{}/", path::encode_path(&req.path)), req.query);
                logger::log_debug(&format!("Redirecting directory {} to {location}", req.path));
                return Ok(http::build_redirect_response(&location));
            }
        } else {
            if ends_with_slash && req.path.len() > 1 {
                let stripped = &req.path[..req.path.len() - 1];
                let location = path::with_query(path::encode_path(stripped), req.query);
                return Ok(http::build_redirect_response(&location));
            }
            if let Some(response) = self.check_preconditions(req, &content)? {
                return Ok(response);
            }
            self.mark_implicit_gzip(&req.path, &mut draft);
        }

        self.process(req, content, draft).await
    }

    /// Short-circuit response for failed or satisfied preconditions
    fn check_preconditions(
        &self,
        req: &ServeRequest<'_>,
        content: &ResourceContent,
    ) -> Result<Option<ResourceResponse>, ServeError> {
        Ok(match conditional::evaluate(req.headers, content, self.options.etags)? {
            Precondition::Proceed => None,
            Precondition::NotModified { etag } => {
                logger::log_debug(&format!("Not modified: {}", req.path));
                Some(http::build_304_response(etag.as_deref()))
            }
            Precondition::PreconditionFailed => {
                logger::log_debug(&format!("Precondition failed: {}", req.path));
                Some(http::build_412_response())
            }
        })
    }

    fn mark_implicit_gzip(&self, path: &str, draft: &mut ResponseDraft) {
        let gzipped = self
            .options
            .gzip_equivalent_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()));
        if gzipped {
            draft.force(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }
    }

    async fn process(
        &self,
        req: &ServeRequest<'_>,
        mut content: ResourceContent,
        draft: ResponseDraft,
    ) -> Result<ResourceResponse, ServeError> {
        match std::mem::take(&mut content.kind) {
            ContentKind::Welcome => self.send_welcome(req, content).await,
            kind => self.send_content(req, content, kind, draft).await,
        }
    }

    /// Send a non-directory content, negotiating precompressed variants
    async fn send_content(
        &self,
        req: &ServeRequest<'_>,
        content: ResourceContent,
        kind: ContentKind,
        mut draft: ResponseDraft,
    ) -> Result<ResourceResponse, ServeError> {
        let ContentKind::Precompressed(variants) = kind else {
            return writer::write_content(req, &content, draft, &self.options).await;
        };

        draft.append(header::VARY, HeaderValue::from_static("Accept-Encoding"));
        let accepted = req
            .headers
            .get_all(header::ACCEPT_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok());
        let order = self.negotiator.preferred_order(accepted);

        let chosen = order.iter().find_map(|token| select_variant(token, &variants));
        match chosen {
            Some(variant) => {
                logger::log_debug(&format!(
                    "Serving {} variant of {}",
                    variant.format.encoding, req.path
                ));
                present_as_base(&mut draft, &content, variant);
                writer::write_content(req, &variant.content, draft, &self.options).await
            }
            None => writer::write_content(req, &content, draft, &self.options).await,
        }
    }

    async fn send_welcome(
        &self,
        req: &ServeRequest<'_>,
        directory: ResourceContent,
    ) -> Result<ResourceResponse, ServeError> {
        let Some(target) = self.welcome.welcome_target(&req.path, &directory).await? else {
            if let Some(response) = self.check_preconditions(req, &directory)? {
                return Ok(response);
            }
            return self.send_listing(req, &directory).await;
        };

        let action = if self.options.redirect_welcome {
            WelcomeAction::Redirect(path::with_query(path::encode_path(&target), req.query))
        } else {
            WelcomeAction::Serve(target)
        };
        logger::log_debug(&format!("Welcome for {}: {action:?}", req.path));

        match action {
            WelcomeAction::Redirect(location) => Ok(http::build_redirect_response(&location)),
            WelcomeAction::Serve(target) => {
                let Some(mut content) = self.lookup.lookup(&target).await? else {
                    return Ok(http::build_404_response());
                };
                if content.is_directory {
                    return Ok(http::build_403_response());
                }
                if let Some(response) = self.check_preconditions(req, &content)? {
                    return Ok(response);
                }
                let mut draft = ResponseDraft::new();
                self.mark_implicit_gzip(&target, &mut draft);
                let kind = std::mem::take(&mut content.kind);
                self.send_content(req, content, kind, draft).await
            }
        }
    }

    async fn send_listing(
        &self,
        req: &ServeRequest<'_>,
        directory: &ResourceContent,
    ) -> Result<ResourceResponse, ServeError> {
        if !self.options.dir_allowed {
            return Ok(http::build_403_response());
        }
        let base = path::encode_path(&req.path);
        let parent = req.path.len() > 1;
        let Some(html) = self.renderer.render(directory, &base, parent, req.query).await? else {
            return Ok(http::build_403_response());
        };

        let mut draft = ResponseDraft::new();
        draft.put(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        draft.put(header::CONTENT_LENGTH, HeaderValue::from(html.len()));
        let body = if req.is_head {
            ResourceBody::empty()
        } else {
            ResourceBody::full(html)
        };
        Ok(draft.into_response(body))
    }
}

/// Make a precompressed variant carry the base resource's type and `ETag`
fn present_as_base(draft: &mut ResponseDraft, base: &ResourceContent, variant: &PrecompressedVariant) {
    let base_type = base
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok());
    draft.intercept(header::CONTENT_TYPE, base_type);

    if let Ok(encoding) = HeaderValue::from_str(&variant.format.encoding) {
        draft.force(header::CONTENT_ENCODING, encoding);
    }

    let variant_etag = base
        .etag
        .as_deref()
        .map(|tag| etag::rewrite_with_suffix(tag, &variant.format.etag_suffix))
        .and_then(|tag| HeaderValue::from_str(&tag).ok());
    draft.intercept(header::ETAG, variant_etag);
}
