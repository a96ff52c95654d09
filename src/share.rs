//! Share links for social platforms.

use std::str::FromStr;
use thiserror::Error;
use url::Url;

const EMAIL_SUBJECT: &str = "Wisdom Whispers - Inspirational Quote";

#[derive(Debug, Error)]
pub enum ShareError {
  #[error("unsupported share platform: {0}")]
  Unsupported(String),

  #[error("invalid page url '{url}': {source}")]
  InvalidPageUrl {
    url: String,
    source: url::ParseError,
  },
}

/// Platforms a quote can be shared to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
  Twitter,
  Facebook,
  Linkedin,
  Whatsapp,
  Telegram,
  Email,
}

impl FromStr for Platform {
  type Err = ShareError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "twitter" | "x" => Ok(Platform::Twitter),
      "facebook" => Ok(Platform::Facebook),
      "linkedin" => Ok(Platform::Linkedin),
      "whatsapp" => Ok(Platform::Whatsapp),
      "telegram" => Ok(Platform::Telegram),
      "email" | "mail" => Ok(Platform::Email),
      _ => Err(ShareError::Unsupported(s.to_string())),
    }
  }
}

impl Platform {
  pub fn display_name(&self) -> &'static str {
    match self {
      Platform::Twitter => "Twitter",
      Platform::Facebook => "Facebook",
      Platform::Linkedin => "LinkedIn",
      Platform::Whatsapp => "WhatsApp",
      Platform::Telegram => "Telegram",
      Platform::Email => "Email",
    }
  }

  /// Link that opens the platform's share dialog for `text`.
  pub fn share_url(&self, text: &str, page_url: &str) -> Result<Url, ShareError> {
    // Reject garbage before it ends up encoded inside a query string
    Url::parse(page_url).map_err(|source| ShareError::InvalidPageUrl {
      url: page_url.to_string(),
      source,
    })?;

    let (base, params): (&str, Vec<(&str, String)>) = match self {
      Platform::Twitter => (
        "https://twitter.com/intent/tweet",
        vec![("text", text.to_string()), ("url", page_url.to_string())],
      ),
      Platform::Facebook => (
        "https://www.facebook.com/sharer/sharer.php",
        vec![("u", page_url.to_string()), ("quote", text.to_string())],
      ),
      Platform::Linkedin => (
        "https://www.linkedin.com/sharing/share-offsite/",
        vec![("url", page_url.to_string()), ("summary", text.to_string())],
      ),
      Platform::Whatsapp => (
        "https://wa.me/",
        vec![("text", format!("{}\n\n{}", text, page_url))],
      ),
      Platform::Telegram => (
        "https://t.me/share/url",
        vec![("url", page_url.to_string()), ("text", text.to_string())],
      ),
      Platform::Email => (
        "mailto:",
        vec![
          ("subject", EMAIL_SUBJECT.to_string()),
          (
            "body",
            format!("{}\n\nRead more at: {}", text, page_url),
          ),
        ],
      ),
    };

    let mut url = Url::parse(base).map_err(|source| ShareError::InvalidPageUrl {
      url: base.to_string(),
      source,
    })?;
    url.query_pairs_mut().extend_pairs(params);

    // Mail clients show form-encoded `+` literally; a literal plus is already `%2B`
    if *self == Platform::Email {
      let query = url.query().map(|q| q.replace('+', "%20"));
      url.set_query(query.as_deref());
    }
    Ok(url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const ALL: [Platform; 6] = [
    Platform::Twitter,
    Platform::Facebook,
    Platform::Linkedin,
    Platform::Whatsapp,
    Platform::Telegram,
    Platform::Email,
  ];

  fn query(url: &Url) -> Vec<(String, String)> {
    url
      .query_pairs()
      .map(|(k, v)| (k.into_owned(), v.into_owned()))
      .collect()
  }

  #[test]
  fn test_twitter_link_encodes_text() {
    let url = Platform::Twitter
      .share_url("\"Be kind\" - Anon & co", "https://quotes.example/")
      .unwrap();

    assert_eq!(url.host_str(), Some("twitter.com"));
    assert_eq!(
      query(&url),
      vec![
        ("text".to_string(), "\"Be kind\" - Anon & co".to_string()),
        ("url".to_string(), "https://quotes.example/".to_string()),
      ]
    );
    assert!(!url.as_str().contains(" & "));
  }

  #[test]
  fn test_email_link_has_subject_and_body() {
    let url = Platform::Email
      .share_url("Hi there", "https://quotes.example/")
      .unwrap();

    assert_eq!(url.scheme(), "mailto");
    assert!(!url.as_str().contains('+'));
    let pairs = query(&url);
    assert_eq!(pairs[0].1, EMAIL_SUBJECT);
    assert_eq!(pairs[1].1, "Hi there\n\nRead more at: https://quotes.example/");
  }

  #[test]
  fn test_every_platform_builds_a_link() {
    for platform in ALL {
      let url = platform.share_url("text", "https://quotes.example/").unwrap();
      assert!(url.query().is_some(), "{}", platform.display_name());
    }
  }

  #[test]
  fn test_invalid_page_url_is_rejected() {
    let err = Platform::Telegram.share_url("text", "not a url").unwrap_err();
    assert!(matches!(err, ShareError::InvalidPageUrl { .. }));
  }

  #[test]
  fn test_platform_names_parse() {
    assert_eq!("Twitter".parse::<Platform>().unwrap(), Platform::Twitter);
    assert_eq!("mail".parse::<Platform>().unwrap(), Platform::Email);
    assert!(matches!(
      "myspace".parse::<Platform>(),
      Err(ShareError::Unsupported(name)) if name == "myspace"
    ));
  }
}
