//! Turning quote API payloads into text and author.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::error::{ErrorCode, FetchError};

/// Text of an object payload that carries no quote at all.
const NO_QUOTE: &str = "No quote available";

static DASH_SEPARATED: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"^"?(.+?)"?\s+[-–—]\s+(.+)$"#).expect("valid regex"));
static BY_SEPARATED: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?i)^"?(.+?)"?\s+by\s+(.+)$"#).expect("valid regex"));
static SURROUNDING_QUOTES: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"^["“”]|["“”]$"#).expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuote {
  pub text: String,
  pub author: Option<String>,
}

/// Split free text like `"Be yourself" - Oscar Wilde` into text and author.
pub fn parse_quote(raw: &str) -> ParsedQuote {
  let trimmed = raw.trim();

  for pattern in [&*DASH_SEPARATED, &*BY_SEPARATED] {
    if let Some(caps) = pattern.captures(trimmed) {
      return ParsedQuote {
        text: strip_quotes(&caps[1]),
        author: Some(caps[2].trim().to_string()),
      };
    }
  }

  ParsedQuote {
    text: strip_quotes(trimmed),
    author: None,
  }
}

fn strip_quotes(text: &str) -> String {
  SURROUNDING_QUOTES.replace_all(text, "").trim().to_string()
}

/// Parse a successful response body.
///
/// Accepted shapes:
/// - `{"content"|"quote"|"text": ..., "author": ...}`
/// - a JSON string
/// - `[{"result": "success"}, {"respond": "..."}]`
/// - plain, non-JSON text
pub fn parse_body(body: &[u8]) -> Result<ParsedQuote, FetchError> {
  match serde_json::from_slice::<Value>(body) {
    Ok(Value::Object(map)) => Ok(from_object(&map)),
    Ok(Value::String(s)) => non_empty(parse_quote(&s)),
    Ok(Value::Array(items)) => from_status_pair(&items),
    Ok(_) => Err(FetchError::invalid_response()),
    Err(_) => {
      let text = String::from_utf8_lossy(body);
      non_empty(parse_quote(&text))
    }
  }
}

fn from_object(map: &Map<String, Value>) -> ParsedQuote {
  let text = ["content", "quote", "text"]
    .iter()
    .find_map(|k| map.get(*k).and_then(Value::as_str))
    .map(str::trim)
    .filter(|t| !t.is_empty());
  let author = map
    .get("author")
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|a| !a.is_empty())
    .map(String::from);

  match (text, author) {
    (Some(text), Some(author)) => ParsedQuote {
      text: strip_quotes(text),
      author: Some(author),
    },
    (Some(text), None) => parse_quote(text),
    (None, author) => ParsedQuote {
      text: NO_QUOTE.to_string(),
      author,
    },
  }
}

/// `[{"result": "success"}, {"respond": "..."}]`
fn from_status_pair(items: &[Value]) -> Result<ParsedQuote, FetchError> {
  if items.len() < 2 {
    return Err(FetchError::invalid_response());
  }

  let succeeded = items[0].get("result").and_then(Value::as_str) == Some("success");
  let respond = items[1]
    .get("respond")
    .and_then(Value::as_str)
    .filter(|r| !r.trim().is_empty());

  match (succeeded, respond) {
    (true, Some(respond)) => Ok(parse_quote(respond)),
    _ => Err(FetchError::new(
      ErrorCode::FetchFailed,
      "Failed to fetch quote",
    )),
  }
}

fn non_empty(quote: ParsedQuote) -> Result<ParsedQuote, FetchError> {
  if quote.text.is_empty() {
    Err(FetchError::invalid_response())
  } else {
    Ok(quote)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn quote(text: &str, author: Option<&str>) -> ParsedQuote {
    ParsedQuote {
      text: text.to_string(),
      author: author.map(String::from),
    }
  }

  #[test]
  fn test_parse_quote_with_dash() {
    assert_eq!(
      parse_quote("\"Be yourself\" - Oscar Wilde"),
      quote("Be yourself", Some("Oscar Wilde"))
    );
    assert_eq!(
      parse_quote("Stay hungry — Steve Jobs"),
      quote("Stay hungry", Some("Steve Jobs"))
    );
  }

  #[test]
  fn test_parse_quote_with_by() {
    assert_eq!(
      parse_quote("Simplicity is the soul of efficiency by Austin Freeman"),
      quote("Simplicity is the soul of efficiency", Some("Austin Freeman"))
    );
  }

  #[test]
  fn test_parse_quote_keeps_hyphenated_words() {
    assert_eq!(
      parse_quote("“Well-being is a habit”"),
      quote("Well-being is a habit", None)
    );
  }

  #[test]
  fn test_body_object_with_author() {
    let parsed = parse_body(br#"{"content":"Act now.","author":"Anon","id":3}"#).unwrap();
    assert_eq!(parsed, quote("Act now.", Some("Anon")));

    let parsed = parse_body(br#"{"quote":"Dream big","author":"Someone"}"#).unwrap();
    assert_eq!(parsed, quote("Dream big", Some("Someone")));
  }

  #[test]
  fn test_body_object_missing_fields_is_still_a_quote() {
    assert_eq!(parse_body(b"{}").unwrap(), quote(NO_QUOTE, None));
    assert_eq!(
      parse_body(br#"{"author":"Ghost"}"#).unwrap(),
      quote(NO_QUOTE, Some("Ghost"))
    );
  }

  #[test]
  fn test_body_string_and_plain_text() {
    assert_eq!(
      parse_body(br#""Know thyself - Socrates""#).unwrap(),
      quote("Know thyself", Some("Socrates"))
    );
    assert_eq!(
      parse_body(b"Know thyself - Socrates").unwrap(),
      quote("Know thyself", Some("Socrates"))
    );
  }

  #[test]
  fn test_body_status_pair() {
    let parsed = parse_body(
      r#"[{"result":"success"},{"respond":"천 리 길도 한 걸음부터 - 속담"}]"#.as_bytes(),
    )
    .unwrap();
    assert_eq!(parsed, quote("천 리 길도 한 걸음부터", Some("속담")));

    let failed = parse_body(br#"[{"result":"fail"},{"respond":"x"}]"#).unwrap_err();
    assert_eq!(failed.code, ErrorCode::FetchFailed);

    let short = parse_body(br#"[{"result":"success"}]"#).unwrap_err();
    assert_eq!(short.code, ErrorCode::InvalidResponse);
  }

  #[test]
  fn test_body_unusable_shapes() {
    assert_eq!(parse_body(b"42").unwrap_err().code, ErrorCode::InvalidResponse);
    assert_eq!(parse_body(b"   ").unwrap_err().code, ErrorCode::InvalidResponse);
  }
}
