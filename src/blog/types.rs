use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A feed item as returned by `/article/list` and `/article/search`.
///
/// Only `title` is interpreted; everything else the API sends is carried in
/// `extra` untouched. Items are identified by position, never by content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    /// Display decoration assigned by the presentation layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: None,
            extra: Map::new(),
        }
    }
}

/// An entry of `/category`.
///
/// The API decides the shape of `id` (numbers and strings are both seen), so
/// it is kept as raw JSON and only rendered as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Value,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    /// The id as a search criteria value: strings unquoted, anything else as JSON.
    pub fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Typeahead entry from `/article/search?title=...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleSuggestion {
    pub title: String,
}
