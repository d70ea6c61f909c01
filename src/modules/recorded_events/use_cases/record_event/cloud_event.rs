// CloudEvents over HTTP, reduced to what a recording endpoint keeps.
//
// Binary content mode: attributes travel as `ce-*` headers and the body is the data.
// Structured content mode: `application/cloudevents+json` body carrying attributes and data.

use crate::modules::recorded_events::core::event_record::ReceivedEvent;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;

pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("missing required attribute: source")]
    MissingSource,

    #[error("header {0} is not valid UTF-8")]
    InvalidHeader(&'static str),

    #[error("malformed structured event: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed data_base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Deserialize)]
struct StructuredEvent {
    id: Option<String>,
    source: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    data: Option<serde_json::Value>,
    data_base64: Option<String>,
}

pub fn decode(headers: &HeaderMap, body: &[u8]) -> Result<ReceivedEvent, DecodeError> {
    if is_structured(headers) {
        decode_structured(body)
    } else {
        decode_binary(headers, body)
    }
}

fn is_structured(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with(STRUCTURED_CONTENT_TYPE))
}

fn header(headers: &HeaderMap, name: &'static str) -> Result<Option<String>, DecodeError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::to_owned)
                .map_err(|_| DecodeError::InvalidHeader(name))
        })
        .transpose()
}

fn decode_binary(headers: &HeaderMap, body: &[u8]) -> Result<ReceivedEvent, DecodeError> {
    let source = header(headers, "ce-source")?
        .filter(|source| !source.is_empty())
        .ok_or(DecodeError::MissingSource)?;
    Ok(ReceivedEvent {
        id: header(headers, "ce-id")?,
        event_type: header(headers, "ce-type")?,
        source,
        data: body.to_vec(),
    })
}

fn decode_structured(body: &[u8]) -> Result<ReceivedEvent, DecodeError> {
    let event: StructuredEvent = serde_json::from_slice(body)?;
    let source = event
        .source
        .filter(|source| !source.is_empty())
        .ok_or(DecodeError::MissingSource)?;
    let data = match (event.data_base64, event.data) {
        (Some(encoded), _) => STANDARD.decode(encoded)?,
        (None, Some(serde_json::Value::String(text))) => text.into_bytes(),
        (None, Some(value)) => serde_json::to_vec(&value)?,
        (None, None) => Vec::new(),
    };
    Ok(ReceivedEvent {
        id: event.id,
        event_type: event.event_type,
        source,
        data,
    })
}
