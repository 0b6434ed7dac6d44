use crate::envelope::{ApiHeader, ApiRequest};
use crate::render::RenderError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

pub(super) fn marshal<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, RenderError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

pub(super) fn unmarshal<T: DeserializeOwned>(input: &[u8]) -> Result<T, RenderError> {
    Ok(serde_json::from_slice(input)?)
}

/// The `request` member of a JSON envelope, kept as undecoded JSON text.
///
/// An explicit `null` is kept as the text `null`; only a missing member yields `None`.
#[derive(Deserialize)]
struct Payload<'a> {
    #[serde(borrow, default, alias = "Request", deserialize_with = "raw_value")]
    request: Option<&'a RawValue>,
}

fn raw_value<'de, D>(deserializer: D) -> Result<Option<&'de RawValue>, D::Error>
where
    D: Deserializer<'de>,
{
    <&RawValue>::deserialize(deserializer).map(Some)
}

/// Decodes `{"Version": .., "Service": .., .., "request": <any json>}`.
///
/// The header fields sit at the top level; the `request` value is captured verbatim.
pub(super) fn decode_envelope(body: &[u8]) -> Result<ApiRequest, RenderError> {
    let header: ApiHeader = serde_json::from_slice(body)?;
    let payload: Payload<'_> = serde_json::from_slice(body)?;

    let data = payload.request.map(|raw| Bytes::copy_from_slice(raw.get().as_bytes())).unwrap_or_default();
    Ok(ApiRequest { header, data })
}
