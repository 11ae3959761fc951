//! Extracted records

use serde::ser::{Serialize, SerializeMap, Serializer};

/// The value of one extracted field
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Result of a `single` rule; None when nothing matched
    Single(Option<String>),

    /// Result of an `all` rule, in document order; empty when nothing matched
    Many(Vec<String>),
}

impl FieldValue {
    /// The string of a non-null `Single` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(value) => value.as_deref(),
            Self::Many(_) => None,
        }
    }

    /// The values of a `Many` field
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Many(values) => Some(values),
            Self::Single(_) => None,
        }
    }

    /// True for a `Single` that matched nothing
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Single(None))
    }
}

/// One extracted item: ordered fields plus the page it came from
///
/// Serializes as a JSON object of its fields in rule order; the source URL is
/// metadata and not part of the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    source: String,
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            fields: Vec::new(),
        }
    }

    /// Appends a field, replacing an earlier field of the same name
    pub fn push(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Looks up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Fields in rule order
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// URL of the page the record was extracted from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
