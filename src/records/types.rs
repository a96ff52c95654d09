use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Language a quote was fetched in.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  #[default]
  En,
  Ko,
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Language::En => write!(f, "en"),
      Language::Ko => write!(f, "ko"),
    }
  }
}

/// A quote the user saved to their local library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecord {
  pub id: String,
  #[serde(rename = "quote", alias = "text")]
  pub text: String,
  #[serde(default)]
  pub author: Option<String>,
  /// Epoch millis
  pub saved_at: i64,
  #[serde(default)]
  pub is_favorite: bool,
  #[serde(default)]
  pub language: Language,
}

impl SavedRecord {
  /// Whether this record holds the given quote text.
  pub fn matches_text(&self, text: &str) -> bool {
    normalize_text(&self.text) == normalize_text(text)
  }

  /// Quote formatted for display or sharing, e.g. `"Stay hungry" - Jobs`.
  pub fn display_text(&self) -> String {
    match &self.author {
      Some(author) => format!("\"{}\" - {}", self.text, author),
      None => format!("\"{}\"", self.text),
    }
  }
}

/// Identity of a quote is its text with surrounding whitespace ignored.
pub fn normalize_text(text: &str) -> &str {
  text.trim()
}

/// Decode a stored payload into records.
///
/// Anything that isn't a JSON array yields no records. Array elements that
/// lack `id`, `quote`/`text` or `savedAt`, or carry mistyped fields, are skipped.
pub fn decode_records(payload: &str) -> Vec<SavedRecord> {
  let Ok(Value::Array(items)) = serde_json::from_str::<Value>(payload) else {
    return Vec::new();
  };

  items
    .into_iter()
    .filter(has_required_fields)
    .filter_map(|item| serde_json::from_value(item).ok())
    .collect()
}

fn has_required_fields(item: &Value) -> bool {
  match item.as_object() {
    Some(obj) => {
      obj.contains_key("id")
        && (obj.contains_key("quote") || obj.contains_key("text"))
        && obj.contains_key("savedAt")
    }
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_record_uses_stored_field_names() {
    let record = SavedRecord {
      id: "1_abc".to_string(),
      text: "Less is more".to_string(),
      author: None,
      saved_at: 42,
      is_favorite: true,
      language: Language::Ko,
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["quote"], "Less is more");
    assert_eq!(json["savedAt"], 42);
    assert_eq!(json["isFavorite"], true);
    assert_eq!(json["language"], "ko");
    assert!(json["author"].is_null());
  }

  #[test]
  fn test_decode_accepts_text_alias_and_defaults() {
    let records = decode_records(r#"[{"id":"a","text":"Hello","savedAt":1}]"#);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "Hello");
    assert!(!records[0].is_favorite);
    assert_eq!(records[0].language, Language::En);
  }

  #[test]
  fn test_decode_garbage_yields_nothing() {
    assert!(decode_records("not json at all").is_empty());
    assert!(decode_records(r#"{"id":"a"}"#).is_empty());
    assert!(decode_records("42").is_empty());
    assert!(decode_records("").is_empty());
  }

  #[test]
  fn test_decode_skips_incomplete_elements() {
    let payload = r#"[
      {"id":"a","quote":"kept","savedAt":2},
      {"id":"b","savedAt":1},
      {"quote":"no id","savedAt":1},
      null,
      "string",
      {"id":"c","quote":"bad time","savedAt":"yesterday"}
    ]"#;

    let records = decode_records(payload);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "a");
  }

  #[test]
  fn test_text_identity_ignores_surrounding_whitespace() {
    let record = SavedRecord {
      id: "x".to_string(),
      text: "Carpe diem".to_string(),
      author: None,
      saved_at: 0,
      is_favorite: false,
      language: Language::En,
    };
    assert!(record.matches_text("  Carpe diem\n"));
    assert!(!record.matches_text("carpe diem"));
  }
}
