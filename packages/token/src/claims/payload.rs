//! Token payload (claim set)

use super::{check_numeric, check_string, names, numeric_claim, string_claim, LOCAL_AUTHORITY};
use crate::error::{ErrorCode, TokenError, TokenResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `aud`: one audience or several
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Serialized as a bare string
    One(String),
    /// Serialized as an array of strings
    Many(Vec<String>),
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Audience::One(value.to_string())
    }
}

impl From<String> for Audience {
    fn from(value: String) -> Self {
        Audience::One(value)
    }
}

impl From<Vec<String>> for Audience {
    fn from(value: Vec<String>) -> Self {
        Audience::Many(value)
    }
}

impl From<Audience> for Value {
    fn from(value: Audience) -> Self {
        match value {
            Audience::One(aud) => Value::String(aud),
            Audience::Many(auds) => Value::Array(auds.into_iter().map(Value::String).collect()),
        }
    }
}

/// One flattened claim, tagged with the issuer that asserted it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// Claim name
    pub claim_type: String,
    /// Value as text; strings are unquoted, anything else is compact JSON
    pub value: String,
    /// `iss` of the payload, or [`LOCAL_AUTHORITY`]
    pub issuer: String,
}

/// Ordered claim set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    claims: Map<String, Value>,
}

impl Payload {
    /// Empty claim set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-deserialized map
    #[must_use]
    pub fn from_map(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// `iss`
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        string_claim(&self.claims, names::ISSUER)
    }

    /// `aud` as a list; empty when absent
    #[must_use]
    pub fn audiences(&self) -> Vec<&str> {
        match self.claims.get(names::AUDIENCE) {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(auds)) => auds.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// `sub`
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        string_claim(&self.claims, names::SUBJECT)
    }

    /// `exp` in unix seconds
    #[must_use]
    pub fn expiration(&self) -> Option<i64> {
        numeric_claim(&self.claims, names::EXPIRATION)
    }

    /// `nbf` in unix seconds
    #[must_use]
    pub fn not_before(&self) -> Option<i64> {
        numeric_claim(&self.claims, names::NOT_BEFORE)
    }

    /// `iat` in unix seconds
    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        numeric_claim(&self.claims, names::ISSUED_AT)
    }

    /// `jti`
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        string_claim(&self.claims, names::TOKEN_ID)
    }

    /// `actort`, the delegating party
    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        string_claim(&self.claims, names::ACTOR)
    }

    /// Set `iss`
    pub fn set_issuer(&mut self, issuer: &str) {
        self.insert(names::ISSUER, Value::String(issuer.to_string()));
    }

    /// Set `aud`
    pub fn set_audience(&mut self, audience: impl Into<Audience>) {
        self.insert(names::AUDIENCE, audience.into().into());
    }

    /// Set `sub`
    pub fn set_subject(&mut self, subject: &str) {
        self.insert(names::SUBJECT, Value::String(subject.to_string()));
    }

    /// Set `exp`
    pub fn set_expiration(&mut self, unix_seconds: i64) {
        self.insert(names::EXPIRATION, Value::from(unix_seconds));
    }

    /// Set `nbf`
    pub fn set_not_before(&mut self, unix_seconds: i64) {
        self.insert(names::NOT_BEFORE, Value::from(unix_seconds));
    }

    /// Set `iat`
    pub fn set_issued_at(&mut self, unix_seconds: i64) {
        self.insert(names::ISSUED_AT, Value::from(unix_seconds));
    }

    /// Set `jti`
    pub fn set_id(&mut self, id: &str) {
        self.insert(names::TOKEN_ID, Value::String(id.to_string()));
    }

    /// Set `actort`
    pub fn set_actor(&mut self, actor: &str) {
        self.insert(names::ACTOR, Value::String(actor.to_string()));
    }

    /// Set any claim, replacing an existing value in place
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.claims.insert(name.into(), value);
    }

    /// Remove a claim
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.claims.shift_remove(name)
    }

    /// Claim by exact, case-sensitive name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Claims in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.claims.iter()
    }

    /// Number of claims
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether there are no claims
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Underlying map
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Flatten into issuer-tagged claims; each array element becomes its own
    /// claim and `null` values are skipped
    #[must_use]
    pub fn claims(&self) -> Vec<Claim> {
        let issuer = self.issuer().unwrap_or(LOCAL_AUTHORITY);
        let mut out = Vec::with_capacity(self.claims.len());
        for (name, value) in &self.claims {
            match value {
                Value::Array(items) => {
                    for item in items {
                        push_claim(&mut out, name, item, issuer);
                    }
                }
                other => push_claim(&mut out, name, other, issuer),
            }
        }
        out
    }

    /// Reserved claims must have the right JSON type
    pub(crate) fn check_reserved(&self) -> TokenResult<()> {
        for name in [names::ISSUER, names::SUBJECT, names::TOKEN_ID, names::ACTOR] {
            check_string(&self.claims, name)?;
        }
        for name in [names::EXPIRATION, names::NOT_BEFORE, names::ISSUED_AT] {
            check_numeric(&self.claims, name)?;
        }
        match self.claims.get(names::AUDIENCE) {
            None | Some(Value::String(_)) => Ok(()),
            Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(()),
            Some(_) => Err(TokenError::format(
                ErrorCode::MalformedClaim,
                "'aud' must be a string or an array of strings",
            )),
        }
    }
}

fn push_claim(out: &mut Vec<Claim>, name: &str, value: &Value, issuer: &str) {
    let text = match value {
        Value::Null => return,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    out.push(Claim {
        claim_type: name.to_string(),
        value: text,
        issuer: issuer.to_string(),
    });
}
