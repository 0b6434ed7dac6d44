use crate::envelope::{ApiHeader, ApiRequest};
use crate::render::RenderError;
use bytes::{BufMut, Bytes, BytesMut};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::de::DeserializeOwned;
use serde::Serialize;

const ENVELOPE_ROOT: &[u8] = b"APIRequest";
const ENVELOPE_PAYLOAD: &[u8] = b"Request";

/// Tags re-wrapping the payload so handlers can decode it as a standalone document.
const PAYLOAD_OPEN: &[u8] = b"<Req>";
const PAYLOAD_CLOSE: &[u8] = b"</Req>";

pub(super) fn marshal<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, RenderError> {
    let xml = quick_xml::se::to_string(value).map_err(RenderError::xml)?;
    Ok(Bytes::from(xml))
}

pub(super) fn unmarshal<T: DeserializeOwned>(input: &[u8]) -> Result<T, RenderError> {
    let input = std::str::from_utf8(input).map_err(RenderError::xml)?;
    quick_xml::de::from_str(input).map_err(RenderError::xml)
}

/// Decodes `<APIRequest><Version>..</Version>..<Request>..</Request></APIRequest>`.
///
/// Header fields are child elements of the root. The inner markup of `Request` is taken
/// verbatim, not re-encoded, and wrapped into `<Req>..</Req>`.
pub(super) fn decode_envelope(body: &[u8]) -> Result<ApiRequest, RenderError> {
    let mut reader = Reader::from_reader(body);

    loop {
        match reader.read_event().map_err(RenderError::xml)? {
            Event::Start(root) if root.name().as_ref() == ENVELOPE_ROOT => break,
            Event::Empty(root) if root.name().as_ref() == ENVELOPE_ROOT => {
                return Ok(ApiRequest { header: ApiHeader::default(), data: wrap_payload(b"") });
            }
            Event::Start(root) | Event::Empty(root) => {
                return Err(RenderError::xml(format!(
                    "expected element <APIRequest> but have <{}>",
                    String::from_utf8_lossy(root.name().as_ref())
                )));
            }
            Event::Eof => return Err(RenderError::xml("missing <APIRequest> element")),
            // prolog, comments and whitespace
            _ => {}
        }
    }

    let mut header = ApiHeader::default();
    let mut payload = None;
    loop {
        match reader.read_event().map_err(RenderError::xml)? {
            Event::Start(element) => {
                let name = element.name();
                let inner = reader.read_text(name).map_err(RenderError::xml)?;
                if name.as_ref() == ENVELOPE_PAYLOAD {
                    payload = Some(wrap_payload(inner.as_bytes()));
                } else {
                    set_header_field(&mut header, name.as_ref(), &inner)?;
                }
            }
            Event::Empty(element) => {
                if element.name().as_ref() == ENVELOPE_PAYLOAD {
                    payload = Some(wrap_payload(b""));
                } else {
                    set_header_field(&mut header, element.name().as_ref(), "")?;
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(RenderError::xml("unexpected end of <APIRequest>")),
            _ => {}
        }
    }

    Ok(ApiRequest { header, data: payload.unwrap_or_else(|| wrap_payload(b"")) })
}

fn wrap_payload(inner: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(PAYLOAD_OPEN.len() + inner.len() + PAYLOAD_CLOSE.len());
    buf.put_slice(PAYLOAD_OPEN);
    buf.put_slice(inner);
    buf.put_slice(PAYLOAD_CLOSE);
    buf.freeze()
}

/// Sets the header field named by an element; `raw` is the element's escaped text.
fn set_header_field(header: &mut ApiHeader, name: &[u8], raw: &str) -> Result<(), RenderError> {
    let field = match name {
        b"Version" => &mut header.version,
        b"Service" => &mut header.service,
        b"Module" => &mut header.module,
        b"Controller" => &mut header.controller,
        b"Action" => &mut header.action,
        b"Noncestr" => &mut header.nonce,
        b"Token" => &mut header.token,
        b"SignType" => &mut header.sign_type,
        b"Sign" => &mut header.sign,
        b"ClientIP" => &mut header.client_ip,
        b"Channel" => &mut header.channel,
        b"Timestamp" => {
            let value = unescape(raw).map_err(RenderError::xml)?;
            let value = value.trim();
            header.timestamp = if value.is_empty() {
                0
            } else {
                value.parse().map_err(|e| RenderError::xml(format!("invalid Timestamp '{value}': {e}")))?
            };
            return Ok(());
        }
        // unknown elements are ignored
        _ => return Ok(()),
    };
    *field = unescape(raw).map_err(RenderError::xml)?.into_owned();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_decode_envelope() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
            <APIRequest>
                <Version>v2</Version>
                <Service>user</Service>
                <Module>core</Module>
                <Controller>account</Controller>
                <Action>get</Action>
                <Timestamp> 1500000000 </Timestamp>
                <Token>a&amp;b</Token>
                <Extra><Nested/></Extra>
                <Request><id>1</id><name>tom</name></Request>
            </APIRequest>"#;

        let request = decode_envelope(body).unwrap();

        assert_eq!(request.header.version, "v2");
        assert_eq!(request.header.service, "user");
        assert_eq!(request.header.module, "core");
        assert_eq!(request.header.controller, "account");
        assert_eq!(request.header.action, "get");
        assert_eq!(request.header.timestamp, 1_500_000_000);
        assert_eq!(request.header.token, "a&b");
        assert_eq!(&request.data[..], b"<Req><id>1</id><name>tom</name></Req>");
    }

    #[test]
    fn test_inner_request_is_verbatim() {
        let request = decode_envelope(b"<APIRequest><Action>get</Action><Request><id>1</id></Request></APIRequest>").unwrap();

        assert_eq!(request.header.action, "get");
        assert_eq!(&request.data[..], b"<Req><id>1</id></Req>");
    }

    #[test]
    fn test_missing_request_element() {
        let request = decode_envelope(b"<APIRequest><Action>get</Action></APIRequest>").unwrap();
        assert_eq!(&request.data[..], b"<Req></Req>");

        let request = decode_envelope(b"<APIRequest/>").unwrap();
        assert_eq!(&request.data[..], b"<Req></Req>");
    }

    #[test]
    fn test_decode_malformed_envelope() {
        assert!(decode_envelope(b"<Other><Action>get</Action></Other>").is_err());
        assert!(decode_envelope(b"<APIRequest><Action>get</Action>").is_err());
        assert!(decode_envelope(b"<APIRequest><Timestamp>soon</Timestamp></APIRequest>").is_err());
        assert!(decode_envelope(b"").is_err());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Query {
        id: i64,
    }

    #[test]
    fn test_unmarshal_wrapped_payload() {
        let query: Query = unmarshal(b"<Req><id>1</id></Req>").unwrap();
        assert_eq!(query, Query { id: 1 });
    }

    #[test]
    fn test_marshal_response() {
        let response = crate::ApiResponse { err_code: 0, err_msg: String::new(), result: json!({ "id": 1 }) };

        let bytes = marshal(&response).unwrap();
        let xml = std::str::from_utf8(&bytes).unwrap();

        assert!(xml.starts_with("<APIResponse>"));
        assert!(xml.contains("<errCode>0</errCode>"));
        assert!(xml.contains("<result><id>1</id></result>"));
        assert!(xml.ends_with("</APIResponse>"));
    }
}
