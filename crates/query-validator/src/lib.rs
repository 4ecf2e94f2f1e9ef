//! Query validator middleware for the salvo web framework.
//!
//! Validates that every `key=value` segment of the raw query string can be
//! percent-decoded the way a browser's `decodeURIComponent` would, so that
//! server and client always agree on what the query means. Requests whose
//! query decodes cleanly pass through untouched. When one or more segments
//! are undecodable, each offending segment is dropped whole and the client
//! is redirected to the same path with the corrected query.
//!
//! Segments are never partially repaired, and only decodability is
//! checked. Query semantics such as types or required fields are left to
//! the application.
//!
//! Example:
//!
//! ```no_run
//! use salvo_core::prelude::*;
//! use salvo_query_validator::QueryValidator;
//!
//! #[handler]
//! async fn hello() -> &'static str {
//!     "hello"
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::with_hoop(QueryValidator::new()).get(hello);
//!     let acceptor = TcpListener::new("0.0.0.0:5800").bind().await;
//!     Server::new(acceptor).serve(router).await;
//! }
//! ```
#![doc(html_favicon_url = "https://salvo.rs/favicon-32x32.png")]
#![doc(html_logo_url = "https://salvo.rs/images/logo.svg")]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::str::FromStr;

use salvo_core::handler::Skipper;
use salvo_core::http::uri::{PathAndQuery, Uri};
use salvo_core::http::{Request, ResBody, Response, StatusCode};
use salvo_core::writing::Redirect;
use salvo_core::{Depot, Error, FlowCtrl, Handler, async_trait};

mod decode;
mod filter;

pub use decode::{all_decodable, is_decodable};
pub use filter::{DEFAULT_DELIMITER, InvalidQuery, QueryFilter};

/// Strategy invoked when a request's query fails validation.
///
/// The default is [`Redirector`]. Implementations receive the full
/// [`InvalidQuery`] context and decide how to answer: redirect, reject,
/// or just log and let the request continue.
#[async_trait]
pub trait InvalidQueryHandler: Send + Sync + 'static {
    /// Handle a request whose query failed validation.
    async fn handle_invalid(
        &self,
        ctx: &InvalidQuery,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    );
}

/// Default invalid-query handler.
///
/// Logs the dropped segments and redirects to the same path with the
/// corrected query, `302 Found` unless configured otherwise. The redirect
/// location always carries a query part, so a request with nothing worth
/// keeping is redirected to `path?`.
#[derive(Clone, Copy, Debug)]
#[must_use]
pub struct Redirector {
    /// Status code used for the redirect.
    pub redirect_code: StatusCode,
}

impl Default for Redirector {
    fn default() -> Self {
        Self::new()
    }
}

impl Redirector {
    /// Create a new `Redirector`.
    #[inline]
    pub fn new() -> Self {
        Self {
            redirect_code: StatusCode::FOUND,
        }
    }

    /// Sets redirect code and returns new `Redirector`.
    #[inline]
    pub fn with_redirect_code(mut self, redirect_code: StatusCode) -> Self {
        self.redirect_code = redirect_code;
        self
    }
}

#[async_trait]
impl InvalidQueryHandler for Redirector {
    async fn handle_invalid(
        &self,
        ctx: &InvalidQuery,
        req: &mut Request,
        _depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        match replace_uri_query(req.uri(), &ctx.corrected_query()) {
            Ok(location) => {
                tracing::error!(
                    dropped = ?ctx.dropped,
                    location = %location,
                    "invalid query detected, dropping unparseable params"
                );
                ctrl.skip_rest();
                res.body(ResBody::None);
                match Redirect::with_status_code(self.redirect_code, location) {
                    Ok(redirect) => res.render(redirect),
                    Err(e) => tracing::error!(error = ?e, "redirect failed"),
                }
            }
            Err(e) => {
                tracing::error!(error = ?e, "corrected uri could not be built");
            }
        }
    }
}

/// Middleware validating the raw query string of incoming requests.
///
/// The query is split on the configured delimiter (default `&`) and each
/// segment checked with [`is_decodable`]; requests without a query, or
/// whose segments all decode, proceed untouched. Invalid requests are
/// handed to the configured [`InvalidQueryHandler`], [`Redirector`] by
/// default.
///
/// Validation always runs against the raw, still-encoded query rather
/// than framework-parsed pairs: parsed queries are already lossily
/// decoded and would mask exactly the segments a browser refuses to
/// decode. Mount it early so later handlers only ever see queries that
/// both sides parse the same way.
#[must_use]
pub struct QueryValidator {
    filter: QueryFilter,
    handler: Box<dyn InvalidQueryHandler>,
    skipper: Option<Box<dyn Skipper>>,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryValidator {
    /// Create a new `QueryValidator` with the default delimiter and the
    /// default [`Redirector`] handler.
    #[inline]
    pub fn new() -> Self {
        Self {
            filter: QueryFilter::default(),
            handler: Box::new(Redirector::new()),
            skipper: None,
        }
    }

    /// Sets the delimiter segments are split on and returns new
    /// `QueryValidator`.
    #[inline]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.filter = QueryFilter::new(delimiter);
        self
    }

    /// Sets the handler invoked for invalid queries and returns new
    /// `QueryValidator`.
    #[inline]
    pub fn with_handler(mut self, handler: impl InvalidQueryHandler) -> Self {
        self.handler = Box::new(handler);
        self
    }

    /// Sets the status code the default [`Redirector`] redirects with and
    /// returns new `QueryValidator`.
    #[inline]
    pub fn with_redirect_code(mut self, redirect_code: StatusCode) -> Self {
        self.handler = Box::new(Redirector::new().with_redirect_code(redirect_code));
        self
    }

    /// Sets skipper and returns new `QueryValidator`.
    #[inline]
    pub fn with_skipper(mut self, skipper: impl Skipper) -> Self {
        self.skipper = Some(Box::new(skipper));
        self
    }
}

#[async_trait]
impl Handler for QueryValidator {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        if let Some(skipper) = &self.skipper {
            if skipper.skipped(req, depot) {
                return;
            }
        }
        let raw = req.uri().query().unwrap_or_default();
        if let Err(ctx) = self.filter.check(raw) {
            self.handler.handle_invalid(&ctx, req, depot, res, ctrl).await;
        }
    }
}

/// Replaces the query of `original_uri` with `new_query`, keeping scheme,
/// authority and path intact.
fn replace_uri_query(original_uri: &Uri, new_query: &str) -> Result<Uri, Error> {
    let mut uri_parts = original_uri.clone().into_parts();
    let path = original_uri.path();
    uri_parts.path_and_query =
        Some(PathAndQuery::from_str(&format!("{path}?{new_query}")).map_err(Error::other)?);
    Uri::from_parts(uri_parts).map_err(Error::other)
}
