//! Command-line subcommands

use clap::Subcommand;

use crate::records::Language;
use crate::share::Platform;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// Fetch a fresh quote
  #[command(visible_alias = "q")]
  Quote {
    #[arg(short, long, value_enum, default_value_t = Language::En)]
    lang: Language,

    /// Save the fetched quote to the library
    #[arg(short, long)]
    save: bool,

    /// Save it as a favorite (implies --save)
    #[arg(short, long)]
    favorite: bool,
  },

  /// Save a quote by hand
  Save {
    text: String,

    #[arg(short, long)]
    author: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Language::En)]
    lang: Language,

    #[arg(short, long)]
    favorite: bool,
  },

  /// List saved quotes, newest first
  #[command(visible_alias = "ls")]
  List {
    /// Only show favorites
    #[arg(short, long)]
    favorites: bool,
  },

  /// Toggle the favorite flag of a saved quote
  #[command(visible_alias = "fav")]
  Favorite { id: String },

  /// Delete a saved quote
  #[command(visible_alias = "rm")]
  Delete { id: String },

  /// Delete every saved quote
  Clear,

  /// Print a share link for a saved quote
  Share {
    id: String,

    /// twitter (or x), facebook, linkedin, whatsapp, telegram, email
    #[arg(short, long)]
    platform: Platform,

    /// Page linked from the shared post
    #[arg(long, default_value = "https://wisdom-whispers.app/")]
    page_url: String,
  },

  /// Precache the asset manifest into the current cache bucket
  Install,

  /// Drop outdated cache buckets and take control of clients
  Activate,

  /// Replay a background sync event
  Sync {
    /// Sync tag; defaults to the configured quote refresh tag
    #[arg(short, long)]
    tag: Option<String>,
  },

  /// Replay a push event
  Push {
    /// Notification body
    payload: Option<String>,
  },

  /// Follow saved-quote changes made by other processes
  Watch,
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct Cli {
    #[command(subcommand)]
    command: Command,
  }

  fn parse(args: &[&str]) -> Command {
    Cli::try_parse_from(std::iter::once("whispers").chain(args.iter().copied()))
      .unwrap()
      .command
  }

  #[test]
  fn test_quote_defaults_to_english() {
    assert_eq!(
      parse(&["quote"]),
      Command::Quote {
        lang: Language::En,
        save: false,
        favorite: false,
      }
    );
  }

  #[test]
  fn test_aliases_resolve() {
    assert_eq!(
      parse(&["q", "--lang", "ko", "-s"]),
      Command::Quote {
        lang: Language::Ko,
        save: true,
        favorite: false,
      }
    );
    assert_eq!(parse(&["ls", "-f"]), Command::List { favorites: true });
    assert_eq!(
      parse(&["rm", "abc"]),
      Command::Delete {
        id: "abc".to_string()
      }
    );
  }

  #[test]
  fn test_save_with_author() {
    assert_eq!(
      parse(&["save", "Less is more", "--author", "Mies"]),
      Command::Save {
        text: "Less is more".to_string(),
        author: Some("Mies".to_string()),
        lang: Language::En,
        favorite: false,
      }
    );
  }

  #[test]
  fn test_share_requires_platform() {
    let missing = Cli::try_parse_from(["whispers", "share", "abc"]);
    assert!(missing.is_err());

    match parse(&["share", "abc", "-p", "telegram"]) {
      Command::Share { platform, .. } => assert_eq!(platform, Platform::Telegram),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_share_platform_aliases_and_unknown_names() {
    match parse(&["share", "abc", "--platform", "X"]) {
      Command::Share { platform, .. } => assert_eq!(platform, Platform::Twitter),
      other => panic!("unexpected {:?}", other),
    }

    let err = Cli::try_parse_from(["whispers", "share", "abc", "-p", "myspace"]).unwrap_err();
    assert!(err.to_string().contains("unsupported share platform: myspace"));
  }
}
