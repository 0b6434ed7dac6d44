//! Render strategies: content negotiation plus the JSON and XML codecs.
//!
//! A [`Render`] is picked by exact match of a content type string against a small fixed table.
//! Inbound, `Content-Type` selects how the envelope is decoded (anything unrecognized falls back
//! to form fields carrying a JSON payload); outbound, `Accept` selects the encoding of the
//! [`ApiResponse`](crate::ApiResponse), defaulting to JSON.

mod form;
mod json;
mod xml;

use crate::envelope::ApiRequest;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Uri};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("xml error: {reason}")]
    Xml { reason: String },

    #[error("form error: {reason}")]
    Form { reason: String },
}

impl RenderError {
    pub fn xml<S: ToString>(str: S) -> Self {
        Self::Xml { reason: str.to_string() }
    }

    pub fn form<S: ToString>(str: S) -> Self {
        Self::Form { reason: str.to_string() }
    }
}

/// A marshal/unmarshal strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Render {
    #[default]
    Json,
    Xml,
}

/// Content types recognized on both the inbound and the outbound side.
const RENDER_TABLE: &[(&str, Render)] = &[
    ("application/json", Render::Json),
    ("application/json; charset=utf-8", Render::Json),
    ("text/json", Render::Json),
    ("text/json; charset=utf-8", Render::Json),
    ("application/xml", Render::Xml),
    ("application/xml; charset=utf-8", Render::Xml),
    ("text/xml", Render::Xml),
    ("text/xml; charset=utf-8", Render::Xml),
];

impl Render {
    /// Exact match of `content_type` against the render table.
    pub fn lookup(content_type: &str) -> Option<Render> {
        RENDER_TABLE.iter().find(|(name, _)| *name == content_type).map(|(_, render)| *render)
    }

    /// The outbound strategy for an `Accept` value; JSON when absent or unrecognized.
    pub fn negotiate(accept: Option<&str>) -> Render {
        accept.and_then(Render::lookup).unwrap_or_default()
    }

    /// The `Content-Type` written with a marshaled response.
    pub fn content_type(self) -> &'static str {
        match self {
            Render::Json => "application/json; charset=utf-8",
            Render::Xml => "text/xml; charset=utf-8",
        }
    }

    pub fn marshal<T: Serialize + ?Sized>(self, value: &T) -> Result<Bytes, RenderError> {
        match self {
            Render::Json => json::marshal(value),
            Render::Xml => xml::marshal(value),
        }
    }

    pub fn unmarshal<T: DeserializeOwned>(self, input: &[u8]) -> Result<T, RenderError> {
        match self {
            Render::Json => json::unmarshal(input),
            Render::Xml => xml::unmarshal(input),
        }
    }
}

/// Decodes the inbound envelope of a transport request.
///
/// Returns the [`ApiRequest`] and the strategy its payload is encoded with, which is the one
/// `Context::bind` later uses. Form requests carry a JSON payload, so they yield [`Render::Json`].
pub fn decode_request(headers: &HeaderMap, uri: &Uri, body: &[u8]) -> Result<(ApiRequest, Render), RenderError> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).unwrap_or_default();

    match Render::lookup(content_type) {
        Some(Render::Json) => Ok((json::decode_envelope(body)?, Render::Json)),
        Some(Render::Xml) => Ok((xml::decode_envelope(body)?, Render::Xml)),
        None => Ok((form::decode_envelope(content_type, uri.query(), body)?, Render::Json)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_is_exact() {
        assert_eq!(Render::lookup("application/json"), Some(Render::Json));
        assert_eq!(Render::lookup("text/json; charset=utf-8"), Some(Render::Json));
        assert_eq!(Render::lookup("text/xml"), Some(Render::Xml));
        assert_eq!(Render::lookup("application/xml"), Some(Render::Xml));
        assert_eq!(Render::lookup("Application/JSON"), None);
        assert_eq!(Render::lookup("application/x-www-form-urlencoded"), None);
        assert_eq!(Render::lookup(""), None);
    }

    #[test]
    fn test_negotiate_defaults_to_json() {
        assert_eq!(Render::negotiate(None), Render::Json);
        assert_eq!(Render::negotiate(Some("*/*")), Render::Json);
        assert_eq!(Render::negotiate(Some("text/xml")), Render::Xml);
    }

    #[test]
    fn test_decode_request_by_content_type() {
        let uri = Uri::from_static("/gateway");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let (request, render) = decode_request(&headers, &uri, br#"{"Action":"get","request":{"id":1}}"#).unwrap();
        assert_eq!(render, Render::Json);
        assert_eq!(request.header.action, "get");

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/xml"));
        let (request, render) = decode_request(&headers, &uri, b"<APIRequest><Action>get</Action></APIRequest>").unwrap();
        assert_eq!(render, Render::Xml);
        assert_eq!(request.header.action, "get");

        let uri = Uri::from_static("/gateway?Action=get");
        let (request, render) = decode_request(&HeaderMap::new(), &uri, b"").unwrap();
        assert_eq!(render, Render::Json);
        assert_eq!(request.header.action, "get");
    }

    #[test]
    fn test_marshal_unmarshal_json() {
        let bytes = Render::Json.marshal(&HashMap::from([("id", 1)])).unwrap();
        assert_eq!(&bytes[..], br#"{"id":1}"#);

        let value: HashMap<String, i32> = Render::Json.unmarshal(&bytes).unwrap();
        assert_eq!(value["id"], 1);

        assert!(Render::Json.unmarshal::<HashMap<String, i32>>(b"{").is_err());
    }
}
