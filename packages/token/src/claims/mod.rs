//! Header and payload claim maps
//!
//! Both are ordered, case-sensitive maps over JSON values. Insertion order is
//! kept so a parsed token re-serializes the way it was received.

mod header;
mod payload;

pub use header::Header;
pub use payload::{Audience, Claim, Payload};

use crate::error::{ErrorCode, TokenError, TokenResult};
use serde_json::{Map, Value};

/// Issuer attached to flattened claims when the payload has no `iss`
pub const LOCAL_AUTHORITY: &str = "LOCAL AUTHORITY";

/// Registered claim and header parameter names
pub mod names {
    /// Header: signature algorithm
    pub const ALGORITHM: &str = "alg";
    /// Header: token type
    pub const TYPE: &str = "typ";
    /// Header: key id
    pub const KEY_ID: &str = "kid";
    /// Issuer
    pub const ISSUER: &str = "iss";
    /// Audience, string or array of strings
    pub const AUDIENCE: &str = "aud";
    /// Subject
    pub const SUBJECT: &str = "sub";
    /// Expiration (unix seconds)
    pub const EXPIRATION: &str = "exp";
    /// Not before (unix seconds)
    pub const NOT_BEFORE: &str = "nbf";
    /// Issued at (unix seconds)
    pub const ISSUED_AT: &str = "iat";
    /// Token id
    pub const TOKEN_ID: &str = "jti";
    /// Actor (delegation)
    pub const ACTOR: &str = "actort";
}

pub(crate) fn string_claim<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    map.get(name).and_then(Value::as_str)
}

/// Unix seconds; fractional values are truncated
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn numeric_claim(map: &Map<String, Value>, name: &str) -> Option<i64> {
    let value = map.get(name)?;
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

pub(crate) fn check_string(map: &Map<String, Value>, name: &str) -> TokenResult<()> {
    match map.get(name) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(TokenError::format(
            ErrorCode::MalformedClaim,
            &format!("'{name}' must be a string"),
        )),
    }
}

pub(crate) fn check_numeric(map: &Map<String, Value>, name: &str) -> TokenResult<()> {
    match map.get(name) {
        None | Some(Value::Number(_)) => Ok(()),
        Some(_) => Err(TokenError::format(
            ErrorCode::MalformedClaim,
            &format!("'{name}' must be a number of seconds since the epoch"),
        )),
    }
}
