//! Raw request fields as submitted by the front end.
//!
//! Field names are kept as strings so the access policy can reject fields a
//! caller is not allowed to touch before any value is interpreted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, String>);

impl Payload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Payload::insert`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// First field not present in `allowed`, if any.
    #[must_use]
    pub fn first_outside<'a>(&'a self, allowed: &[&str]) -> Option<&'a str> {
        self.0
            .keys()
            .map(String::as_str)
            .find(|field| !allowed.contains(field))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a `field=value` pair as given on a command line.
    ///
    /// # Errors
    ///
    /// Returns a message when the pair has no `=` or an empty field name.
    pub fn parse_pair(pair: &str) -> Result<(String, String), String> {
        let Some((field, value)) = pair.split_once('=') else {
            return Err(format!("expected field=value, got '{pair}'"));
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(format!("missing field name in '{pair}'"));
        }
        Ok((field.to_string(), value.to_string()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Payload;

    #[test]
    fn first_outside_reports_disallowed_field() {
        let payload = Payload::new()
            .with("priority", "high")
            .with("status", "done");
        assert_eq!(
            payload.first_outside(&["priority", "description"]),
            Some("status")
        );
        assert_eq!(payload.first_outside(&["priority", "status"]), None);
        assert_eq!(payload.field_names(), vec!["priority", "status"]);
    }

    #[test]
    fn parse_pair_splits_on_first_equals() {
        assert_eq!(
            Payload::parse_pair("description=a=b").unwrap(),
            ("description".to_string(), "a=b".to_string())
        );
        assert!(Payload::parse_pair("description").is_err());
        assert!(Payload::parse_pair(" =x").is_err());
    }

    #[test]
    fn collects_from_pairs() {
        let payload: Payload = [("text", "hello")].into_iter().collect();
        assert_eq!(payload.get("text"), Some("hello"));
        assert!(payload.get("author").is_none());
    }
}
