//! Per-request input to the dispatcher.

use std::collections::HashMap;

use bytes::Bytes;

use crate::method::Method;

/// A fully parsed incoming request.
///
/// Built by the transport (or by hand in tests), consumed by one
/// [`Dispatcher::dispatch`](crate::Dispatcher::dispatch) call, never shared
/// between requests.
#[derive(Clone, Debug)]
pub struct RequestContext {
    method: String,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl RequestContext {
    /// A request with no headers and no body. `target` may carry a query
    /// string: `/items?page=2`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q.to_owned())),
            None => (target, None),
        };
        Self::from_parts(method.as_str(), path, query, Vec::new(), Bytes::new())
    }

    /// Assembles a request from transport-level pieces. `method` is kept as
    /// sent so unroutable methods can still be reported.
    pub fn from_parts(
        method: &str,
        path: &str,
        query: Option<String>,
        headers: Vec<(String, String)>,
        body: Bytes,
    ) -> Self {
        Self { method: method.to_owned(), path: path.to_owned(), query, headers, body }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. The first occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    /// Percent-decoded query parameters. Repeated keys keep their first value.
    pub fn query_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(query) = &self.query {
            for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
                map.entry(k.into_owned()).or_insert_with(|| v.into_owned());
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_query_from_target() {
        let ctx = RequestContext::new(Method::Get, "/items?page=2&sort=name");
        assert_eq!(ctx.path(), "/items");
        assert_eq!(ctx.query(), Some("page=2&sort=name"));
        assert_eq!(ctx.query_map()["sort"], "name");
    }

    #[test]
    fn no_query() {
        let ctx = RequestContext::new(Method::Get, "/items");
        assert_eq!(ctx.query(), None);
        assert!(ctx.query_map().is_empty());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let ctx = RequestContext::new(Method::Get, "/")
            .with_header("Content-Type", "application/xml")
            .with_header("ACCEPT", "application/json");
        assert_eq!(ctx.content_type(), Some("application/xml"));
        assert_eq!(ctx.accept(), Some("application/json"));
        assert_eq!(ctx.header("x-missing"), None);
    }
}
