//! Compact serialization
//!
//! `base64url(header) "." base64url(payload) "." base64url(signature)`, no
//! padding. The third segment is empty for unsigned tokens.

use crate::algorithm::SignatureAlgorithm;
use crate::claims::{Header, Payload};
use crate::error::{ErrorCode, TokenError, TokenResult};
use crate::token::SecurityToken;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};

/// Encoded header and payload plus the bytes a signature covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedParts {
    /// base64url of the header JSON
    pub header_segment: String,
    /// base64url of the payload JSON
    pub payload_segment: String,
    /// ASCII `header_segment "." payload_segment`
    pub signing_input: Vec<u8>,
}

impl EncodedParts {
    fn new(header_segment: String, payload_segment: String) -> Self {
        let signing_input = signing_input(&header_segment, &payload_segment);
        Self {
            header_segment,
            payload_segment,
            signing_input,
        }
    }

    /// Compact token with `signature` appended; an empty signature leaves the
    /// third segment empty
    #[must_use]
    pub fn join(&self, signature: &[u8]) -> String {
        format!(
            "{}.{}.{}",
            self.header_segment,
            self.payload_segment,
            URL_SAFE_NO_PAD.encode(signature)
        )
    }
}

/// base64url of the JSON form; maps with string keys always serialize
pub(crate) fn encode_segment<T: Serialize>(value: &T) -> String {
    serde_json::to_vec(value)
        .map(|json| URL_SAFE_NO_PAD.encode(json))
        .unwrap_or_default()
}

pub(crate) fn signing_input(header_segment: &str, payload_segment: &str) -> Vec<u8> {
    let mut input = Vec::with_capacity(header_segment.len() + payload_segment.len() + 1);
    input.extend_from_slice(header_segment.as_bytes());
    input.push(b'.');
    input.extend_from_slice(payload_segment.as_bytes());
    input
}

/// Serialize and base64url-encode header and payload
///
/// # Errors
/// Returns `Format` (`TOK209`) if either map fails to serialize
pub fn encode(header: &Header, payload: &Payload) -> TokenResult<EncodedParts> {
    let header_json = serde_json::to_vec(header).map_err(|e| {
        TokenError::format(
            ErrorCode::Serialization,
            &format!("header serialization failed: {e}"),
        )
    })?;
    let payload_json = serde_json::to_vec(payload).map_err(|e| {
        TokenError::format(
            ErrorCode::Serialization,
            &format!("payload serialization failed: {e}"),
        )
    })?;
    Ok(EncodedParts::new(
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload_json),
    ))
}

/// Parse a compact token
///
/// The size limit is checked before anything is decoded.
///
/// # Errors
/// Returns `Format` with:
/// - `TOK200` if `compact` is longer than `max_size` bytes
/// - `TOK201` unless there are exactly three segments
/// - `TOK202`..`TOK204` if a segment is not base64url
/// - `TOK205`/`TOK206` if header or payload is not a JSON object
/// - `TOK207` if an unsigned token carries a signature
/// - `TOK208`/`TOK210` for a missing `alg` or a mistyped reserved claim
pub fn parse(compact: &str, max_size: usize) -> TokenResult<SecurityToken> {
    if compact.len() > max_size {
        return Err(TokenError::format(
            ErrorCode::TokenTooLarge,
            &format!(
                "token is {} bytes, larger than the {max_size} byte limit",
                compact.len()
            ),
        ));
    }

    let segments: Vec<&str> = compact.split('.').collect();
    let [header_segment, payload_segment, signature_segment] = segments[..] else {
        return Err(TokenError::format(
            ErrorCode::SegmentCount,
            &format!("expected 3 segments, found {}", segments.len()),
        ));
    };

    let header = Header::from_map(decode_object(
        header_segment,
        "header",
        ErrorCode::HeaderEncoding,
        ErrorCode::HeaderStructure,
    )?);
    let payload = Payload::from_map(decode_object(
        payload_segment,
        "payload",
        ErrorCode::PayloadEncoding,
        ErrorCode::PayloadStructure,
    )?);
    let signature = URL_SAFE_NO_PAD.decode(signature_segment).map_err(|e| {
        TokenError::format(
            ErrorCode::SignatureEncoding,
            &format!("signature segment is not base64url: {e}"),
        )
    })?;

    header.check_reserved()?;
    payload.check_reserved()?;

    if header.algorithm() == Some(SignatureAlgorithm::None.as_str()) && !signature.is_empty() {
        return Err(TokenError::format(
            ErrorCode::UnsignedWithSignature,
            "token declares alg 'none' but carries a signature",
        ));
    }

    Ok(SecurityToken::from_wire(
        header,
        payload,
        header_segment.to_string(),
        payload_segment.to_string(),
        signature,
        compact.to_string(),
    ))
}

/// Cheap shape check: within `max_size`, three segments, base64url alphabet
#[must_use]
pub fn is_well_formed(compact: &str, max_size: usize) -> bool {
    if compact.len() > max_size {
        return false;
    }
    let segments: Vec<&str> = compact.split('.').collect();
    segments.len() == 3
        && !segments[0].is_empty()
        && !segments[1].is_empty()
        && segments
            .iter()
            .all(|s| s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
}

fn decode_object(
    segment: &str,
    what: &str,
    encoding: ErrorCode,
    structure: ErrorCode,
) -> TokenResult<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        TokenError::format(encoding, &format!("{what} segment is not base64url: {e}"))
    })?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TokenError::format(
            structure,
            &format!("{what} is not a JSON object"),
        )),
        Err(e) => Err(TokenError::format(
            structure,
            &format!("{what} is not valid JSON: {e}"),
        )),
    }
}
