//! Security tokens, before signing and after validation

use crate::algorithm::SignatureAlgorithm;
use crate::claims::{Audience, Claim, Header, Payload};
use crate::codec;
use crate::credentials::SigningCredentials;
use crate::error::{ErrorCode, TokenError, TokenResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::borrow::Cow;

/// A token built for signing or read from the wire
///
/// Built programmatically, header and payload start empty and the algorithm
/// reads as `none`. Read from the wire, every field comes from the compact
/// form and there are no signing credentials.
#[derive(Debug, Clone, Default)]
pub struct SecurityToken {
    header: Header,
    payload: Payload,
    encoded_header: Option<String>,
    encoded_payload: Option<String>,
    signature: Vec<u8>,
    raw_data: Option<String>,
    signing_credentials: Option<SigningCredentials>,
}

impl SecurityToken {
    /// Empty token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token over an existing header and payload
    #[must_use]
    pub fn from_parts(header: Header, payload: Payload) -> Self {
        Self {
            header,
            payload,
            ..Self::default()
        }
    }

    /// Build a token ready to sign
    ///
    /// The header gets `alg`, `typ` and `kid` from `credentials`, or
    /// `alg = none` without them. `iss`, `aud`, `nbf` and `exp` are stamped
    /// ahead of the remaining `claims`.
    ///
    /// # Errors
    /// Returns `Argument` (`TOK406`) when `expires` is not after `not_before`
    pub fn issue<I>(
        issuer: Option<&str>,
        audience: Option<Audience>,
        claims: I,
        not_before: Option<DateTime<Utc>>,
        expires: Option<DateTime<Utc>>,
        credentials: Option<SigningCredentials>,
    ) -> TokenResult<Self>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let (Some(nbf), Some(exp)) = (not_before, expires) {
            if exp <= nbf {
                return Err(TokenError::argument(
                    ErrorCode::InvalidLifetime,
                    &format!("expires ({exp}) must be after not-before ({nbf})"),
                ));
            }
        }

        let header = match &credentials {
            Some(c) => Header::for_signing(c.algorithm(), c.key_id()),
            None => Header::for_signing(SignatureAlgorithm::None.as_str(), None),
        };

        let mut payload = Payload::new();
        if let Some(iss) = issuer {
            payload.set_issuer(iss);
        }
        if let Some(aud) = audience {
            payload.set_audience(aud);
        }
        if let Some(nbf) = not_before {
            payload.set_not_before(nbf.timestamp());
        }
        if let Some(exp) = expires {
            payload.set_expiration(exp.timestamp());
        }
        for (name, value) in claims {
            payload.insert(name, value);
        }

        Ok(Self {
            header,
            payload,
            signing_credentials: credentials,
            ..Self::default()
        })
    }

    pub(crate) fn from_wire(
        header: Header,
        payload: Payload,
        encoded_header: String,
        encoded_payload: String,
        signature: Vec<u8>,
        raw_data: String,
    ) -> Self {
        Self {
            header,
            payload,
            encoded_header: Some(encoded_header),
            encoded_payload: Some(encoded_payload),
            signature,
            raw_data: Some(raw_data),
            signing_credentials: None,
        }
    }

    /// Header
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Payload
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Header for editing before signing; `None` once read from the wire
    pub fn header_mut(&mut self) -> Option<&mut Header> {
        match self.raw_data {
            None => Some(&mut self.header),
            Some(_) => None,
        }
    }

    /// Payload for editing before signing; `None` once read from the wire
    pub fn payload_mut(&mut self) -> Option<&mut Payload> {
        match self.raw_data {
            None => Some(&mut self.payload),
            Some(_) => None,
        }
    }

    /// Header `alg`, `none` when absent
    #[must_use]
    pub fn signature_algorithm(&self) -> &str {
        self.header
            .algorithm()
            .unwrap_or(SignatureAlgorithm::None.as_str())
    }

    /// Credentials the token will be signed with
    #[must_use]
    pub fn signing_credentials(&self) -> Option<&SigningCredentials> {
        self.signing_credentials.as_ref()
    }

    /// Attach or replace signing credentials
    pub fn set_signing_credentials(&mut self, credentials: SigningCredentials) {
        self.signing_credentials = Some(credentials);
    }

    /// `nbf` as a timestamp, the unix epoch when absent
    #[must_use]
    pub fn valid_from(&self) -> DateTime<Utc> {
        timestamp_or_epoch(self.payload.not_before())
    }

    /// `exp` as a timestamp, the unix epoch when absent
    #[must_use]
    pub fn valid_to(&self) -> DateTime<Utc> {
        timestamp_or_epoch(self.payload.expiration())
    }

    /// `jti`
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.payload.id()
    }

    /// `iss`
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.payload.issuer()
    }

    /// `aud` as a list
    #[must_use]
    pub fn audiences(&self) -> Vec<&str> {
        self.payload.audiences()
    }

    /// Compact form this token was parsed from
    #[must_use]
    pub fn raw_data(&self) -> Option<&str> {
        self.raw_data.as_deref()
    }

    /// Header segment: as received, or encoded from the current header
    #[must_use]
    pub fn encoded_header(&self) -> Cow<'_, str> {
        match &self.encoded_header {
            Some(segment) => Cow::Borrowed(segment),
            None => Cow::Owned(codec::encode_segment(&self.header)),
        }
    }

    /// Payload segment: as received, or encoded from the current payload
    #[must_use]
    pub fn encoded_payload(&self) -> Cow<'_, str> {
        match &self.encoded_payload {
            Some(segment) => Cow::Borrowed(segment),
            None => Cow::Owned(codec::encode_segment(&self.payload)),
        }
    }

    /// Raw signature bytes; empty for unsigned or unparsed tokens
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

fn timestamp_or_epoch(seconds: Option<i64>) -> DateTime<Utc> {
    seconds
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// A token that passed every validation stage
///
/// There is no way to mutate it; callers read the claims they were given.
#[derive(Debug, Clone)]
pub struct ValidatedToken {
    header: Header,
    payload: Payload,
    key_id: Option<String>,
}

impl ValidatedToken {
    pub(crate) fn new(token: SecurityToken, key_id: Option<String>) -> Self {
        Self {
            header: token.header,
            payload: token.payload,
            key_id,
        }
    }

    /// Header as received
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Validated claim set
    #[must_use]
    pub fn claims(&self) -> &Payload {
        &self.payload
    }

    /// Claims flattened and tagged with their issuer
    #[must_use]
    pub fn issuer_claims(&self) -> Vec<Claim> {
        self.payload.claims()
    }

    /// `alg` the signature was checked with
    #[must_use]
    pub fn algorithm(&self) -> &str {
        self.header
            .algorithm()
            .unwrap_or(SignatureAlgorithm::None.as_str())
    }

    /// Key id of the key that verified the signature, if it had one
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// `sub`
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.payload.subject()
    }

    /// `iss`
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.payload.issuer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SecurityKey;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn new_token_reads_as_unsigned_with_epoch_window() {
        let token = SecurityToken::new();
        assert_eq!(token.signature_algorithm(), "none");
        assert_eq!(token.valid_from(), DateTime::UNIX_EPOCH);
        assert_eq!(token.valid_to(), DateTime::UNIX_EPOCH);
        assert!(token.raw_data().is_none());
        assert!(token.header().is_empty());
    }

    #[test]
    fn issue_stamps_reserved_claims_first() {
        let nbf = DateTime::from_timestamp(1_000, 0).unwrap();
        let exp = nbf + Duration::minutes(10);
        let creds = SigningCredentials::new(
            SecurityKey::symmetric(vec![1u8; 32]).with_key_id("k1"),
            "HS256",
        );
        let token = SecurityToken::issue(
            Some("issuer"),
            Some("aud".into()),
            [("role".to_string(), json!("admin"))],
            Some(nbf),
            Some(exp),
            Some(creds),
        )
        .unwrap();

        let names: Vec<&str> = token.payload().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["iss", "aud", "nbf", "exp", "role"]);
        assert_eq!(token.header().algorithm(), Some("HS256"));
        assert_eq!(token.header().key_id(), Some("k1"));
        assert_eq!(token.header().token_type(), Some("JWT"));
        assert_eq!(token.valid_from(), nbf);
        assert_eq!(token.valid_to(), exp);
    }

    #[test]
    fn built_token_encodes_its_segments() {
        let mut token = SecurityToken::new();
        assert_eq!(token.encoded_header(), "e30");
        assert_eq!(token.encoded_payload(), "e30");

        if let Some(p) = token.payload_mut() {
            p.set_subject("alice");
        }
        let parts = codec::encode(token.header(), token.payload()).unwrap();
        assert_eq!(token.encoded_payload(), parts.payload_segment.as_str());
    }

    #[test]
    fn issue_rejects_inverted_lifetime() {
        let t = DateTime::from_timestamp(5_000, 0).unwrap();
        let claims = Vec::<(String, Value)>::new();
        let err = SecurityToken::issue(None, None, claims, Some(t), Some(t), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidLifetime);
    }
}
