//! Exchange Parameters
//!
//! The loosely-typed string map that OAuth2 exchanges are made of. Keys are
//! unique and keep their insertion order so produced query strings and form
//! bodies are deterministic; setting a key twice keeps the later value.

use crate::error::{AuthError, AuthResult};
use url::form_urlencoded;

/// Ordered string-to-string parameter map for queries and form bodies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeParams {
    entries: Vec<(String, String)>,
}

impl ExchangeParams {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter; a later value for the same key wins.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Look up a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// A parameter that is present and non-empty, mirroring the OAuth2 rule
    /// that empty values count as absent.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Remove a parameter, returning its value when present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Copy all parameters from `other` into self, later values winning.
    pub fn extend_from(&mut self, other: &ExchangeParams) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Percent-encoded query string / form body in insertion order.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    /// Parse a percent-encoded query string.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.set(key.into_owned(), value.into_owned());
        }
        params
    }

    /// Parse a response body as a flat JSON object.
    ///
    /// Numbers and booleans are stringified (providers disagree on whether
    /// `expires_in` is a number or a string); nested values and nulls are
    /// skipped. A body that is not a JSON object is a hard error.
    pub fn from_json_body(body: &str) -> AuthResult<Self> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| AuthError::Generic(format!("Malformed JSON in response: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| AuthError::Generic("Response JSON is not an object".into()))?;

        let mut params = Self::new();
        for (key, value) in object {
            match value {
                serde_json::Value::String(s) => params.set(key.clone(), s.clone()),
                serde_json::Value::Number(n) => params.set(key.clone(), n.to_string()),
                serde_json::Value::Bool(b) => params.set(key.clone(), b.to_string()),
                _ => {}
            }
        }
        Ok(params)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExchangeParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}
