//! Request body representation carried through the forwarding pipeline.
//!
//! A body is either still a stream, raw bytes read off the wire, or a decoded
//! JSON document. Turning any of them into an outbound body goes through
//! [`ForwardBody::into_outbound`], which is the only place framing headers are
//! written, so a decoded body always leaves with a matching `Content-Length`.
use axum::body::Body as AxumBody;
use bytes::Bytes;
use hyper::{
    HeaderMap,
    header::{self, HeaderValue},
};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BodyError {
    #[error("Request body exceeds maximum size of {0} bytes")]
    TooLarge(usize),

    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Failed to read request body: {0}")]
    Read(String),

    #[error("Failed to encode request body: {0}")]
    Encode(String),
}

pub enum ForwardBody {
    /// Untouched inbound stream.
    Streaming(AxumBody),
    /// Bytes read in full but not decoded (unknown content type or empty).
    Raw(Bytes),
    /// Decoded document, re-serialized on the way out.
    Json(Value),
}

impl std::fmt::Debug for ForwardBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForwardBody::Streaming(_) => f.write_str("Streaming"),
            ForwardBody::Raw(bytes) => write!(f, "Raw({} bytes)", bytes.len()),
            ForwardBody::Json(value) => write!(f, "Json({value})"),
        }
    }
}

impl ForwardBody {
    /// Read an inbound body in full, refusing anything larger than `limit`.
    pub async fn buffer(body: AxumBody, limit: usize) -> Result<Bytes, BodyError> {
        axum::body::to_bytes(body, limit).await.map_err(|e| {
            if is_length_limit_error(&e) {
                BodyError::TooLarge(limit)
            } else {
                BodyError::Read(e.to_string())
            }
        })
    }

    /// Decode buffered bytes according to the inbound `Content-Type`.
    ///
    /// JSON and form-encoded bodies become [`ForwardBody::Json`]; anything
    /// else, including an empty body, stays [`ForwardBody::Raw`].
    pub fn decode(bytes: Bytes, headers: &HeaderMap) -> Result<Self, BodyError> {
        if bytes.is_empty() {
            return Ok(ForwardBody::Raw(bytes));
        }

        match media_type(headers).as_deref() {
            Some("application/json") => serde_json::from_slice(&bytes)
                .map(ForwardBody::Json)
                .map_err(|e| BodyError::InvalidJson(e.to_string())),
            Some(mt) if mt.ends_with("+json") => serde_json::from_slice(&bytes)
                .map(ForwardBody::Json)
                .map_err(|e| BodyError::InvalidJson(e.to_string())),
            Some("application/x-www-form-urlencoded") => {
                let fields: Map<String, Value> = url::form_urlencoded::parse(&bytes)
                    .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                    .collect();
                Ok(ForwardBody::Json(Value::Object(fields)))
            }
            _ => Ok(ForwardBody::Raw(bytes)),
        }
    }

    /// Produce the outbound body and fix up the framing headers to match it.
    pub fn into_outbound(self, headers: &mut HeaderMap) -> Result<AxumBody, BodyError> {
        match self {
            ForwardBody::Streaming(body) => Ok(body),
            ForwardBody::Raw(bytes) => {
                if bytes.is_empty() {
                    headers.remove(header::CONTENT_LENGTH);
                } else {
                    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                }
                Ok(AxumBody::from(bytes))
            }
            ForwardBody::Json(value) => {
                let encoded =
                    serde_json::to_vec(&value).map_err(|e| BodyError::Encode(e.to_string()))?;
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(encoded.len()));
                Ok(AxumBody::from(encoded))
            }
        }
    }
}

fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next()?.trim().to_ascii_lowercase();
    Some(essence)
}

fn is_length_limit_error(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
