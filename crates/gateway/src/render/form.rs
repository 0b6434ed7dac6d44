use crate::envelope::{ApiHeader, ApiRequest};
use crate::render::RenderError;
use bytes::Bytes;

/// Decodes an envelope carried as form fields.
///
/// Fields come from the URL query and, for `application/x-www-form-urlencoded` bodies, from the
/// body as well; body values win over query values. `Request` holds the JSON payload.
/// A `Timestamp` that is not an integer is read as zero.
pub(super) fn decode_envelope(content_type: &str, query: Option<&str>, body: &[u8]) -> Result<ApiRequest, RenderError> {
    let mut fields: Vec<(String, String)> = Vec::new();
    if is_form_urlencoded(content_type) {
        fields.extend(serde_urlencoded::from_bytes::<Vec<(String, String)>>(body).map_err(RenderError::form)?);
    }
    if let Some(query) = query {
        fields.extend(serde_urlencoded::from_str::<Vec<(String, String)>>(query).map_err(RenderError::form)?);
    }

    let get = |key: &str| fields.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str()).unwrap_or_default();

    let header = ApiHeader {
        version: get("Version").to_owned(),
        service: get("Service").to_owned(),
        module: get("Module").to_owned(),
        controller: get("Controller").to_owned(),
        action: get("Action").to_owned(),
        token: get("Token").to_owned(),
        nonce: get("Nonce").to_owned(),
        channel: get("Channel").to_owned(),
        timestamp: get("Timestamp").parse().unwrap_or(0),
        ..ApiHeader::default()
    };

    Ok(ApiRequest { header, data: Bytes::copy_from_slice(get("Request").as_bytes()) })
}

fn is_form_urlencoded(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .is_ok_and(|parsed| parsed.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
}
