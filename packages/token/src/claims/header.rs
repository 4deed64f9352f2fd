//! Token header

use super::{check_string, names, string_claim};
use crate::error::{ErrorCode, TokenError, TokenResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default `typ` written when a header is created for signing
pub const DEFAULT_TOKEN_TYPE: &str = "JWT";

/// Ordered header parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header {
    params: Map<String, Value>,
}

impl Header {
    /// Empty header: no `alg`, no `typ`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Header for a token about to be signed: `alg`, `typ` = `JWT`, and `kid`
    /// when the key has one
    #[must_use]
    pub fn for_signing(algorithm: &str, key_id: Option<&str>) -> Self {
        let mut header = Self::new();
        header.set_algorithm(algorithm);
        header.set_token_type(DEFAULT_TOKEN_TYPE);
        if let Some(kid) = key_id {
            header.set_key_id(kid);
        }
        header
    }

    /// Wrap an already-deserialized map
    #[must_use]
    pub fn from_map(params: Map<String, Value>) -> Self {
        Self { params }
    }

    /// `alg`
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        string_claim(&self.params, names::ALGORITHM)
    }

    /// `typ`
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        string_claim(&self.params, names::TYPE)
    }

    /// `kid`
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        string_claim(&self.params, names::KEY_ID)
    }

    /// Set `alg`
    pub fn set_algorithm(&mut self, algorithm: &str) {
        self.insert(names::ALGORITHM, Value::String(algorithm.to_string()));
    }

    /// Set `typ`
    pub fn set_token_type(&mut self, token_type: &str) {
        self.insert(names::TYPE, Value::String(token_type.to_string()));
    }

    /// Set `kid`
    pub fn set_key_id(&mut self, key_id: &str) {
        self.insert(names::KEY_ID, Value::String(key_id.to_string()));
    }

    /// Set any parameter, replacing an existing value in place
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.params.insert(name.into(), value);
    }

    /// Parameter by exact, case-sensitive name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.params.iter()
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether there are no parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Underlying map
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Reserved parameters must have the right JSON type and `alg` must exist
    pub(crate) fn check_reserved(&self) -> TokenResult<()> {
        for name in [names::ALGORITHM, names::TYPE, names::KEY_ID] {
            check_string(&self.params, name)?;
        }
        if self.algorithm().is_none() {
            return Err(TokenError::format(
                ErrorCode::MissingAlgorithm,
                "header has no 'alg' parameter",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_header_is_empty() {
        let header = Header::new();
        assert!(header.is_empty());
        assert_eq!(header.algorithm(), None);
        assert_eq!(header.token_type(), None);
    }

    #[test]
    fn signing_header_keeps_parameter_order() {
        let header = Header::for_signing("RS256", Some("k1"));
        let keys: Vec<&str> = header.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["alg", "typ", "kid"]);
        assert_eq!(
            serde_json::to_string(&header).unwrap(),
            r#"{"alg":"RS256","typ":"JWT","kid":"k1"}"#
        );
    }

    #[test]
    fn parameter_names_are_case_sensitive() {
        let mut header = Header::new();
        header.insert("ALG", json!("HS256"));
        assert_eq!(header.algorithm(), None);
        assert_eq!(header.check_reserved().unwrap_err().code(), ErrorCode::MissingAlgorithm);
    }

    #[test]
    fn non_string_alg_is_malformed() {
        let header = Header::from_map(json!({"alg": 5}).as_object().cloned().unwrap());
        assert_eq!(header.check_reserved().unwrap_err().code(), ErrorCode::MalformedClaim);
    }
}
