//! Dispatch output.
//!
//! A [`DispatchResult`] is what the dispatcher hands back to the transport:
//! a status, the negotiated content type and the encoded body. Failures use
//! the same shape, with an [`ErrorBody`] as payload.

use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use http_body_util::Full;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::media::MediaType;

/// The structured payload of every error response.
///
/// ```json
/// { "status": 404, "message": "no route for GET /nope", "code": "route_not_found" }
/// ```
///
/// In XML the root element is `<error>`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename = "error")]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&DispatchError> for ErrorBody {
    fn from(e: &DispatchError) -> Self {
        Self {
            status: e.status().as_u16(),
            message: e.to_string(),
            code: e.code().map(str::to_owned),
        }
    }
}

/// The finished response for one request. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchResult {
    status: StatusCode,
    content_type: MediaType,
    body: Bytes,
}

impl DispatchResult {
    pub(crate) fn new(status: StatusCode, content_type: MediaType, body: impl Into<Bytes>) -> Self {
        Self { status, content_type, body: body.into() }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn content_type(&self) -> MediaType { self.content_type }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Converts into a hyper response. No `content-type` is sent with an
    /// empty body.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body.clone()));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        if !self.body.is_empty() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type.as_str()));
        }
        response
    }
}
