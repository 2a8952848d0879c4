//! services/client/src/shell/protocol.rs
//!
//! Defines the line protocol between the reader at the terminal and the shell.

use std::path::PathBuf;
use std::str::FromStr;

use folio_core::CatalogFilter;

//=========================================================================================
// Commands typed by the reader
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `login <email> <password>`
    Login { email: String, password: String },
    /// `register <email> <password> <display name...>`
    Register {
        email: String,
        password: String,
        name: String,
    },
    /// `federated <provider token>`
    Federated { token: String },
    Logout,
    Upgrade,
    /// Pull the server copy of the identity.
    Refresh,
    /// `list [all|free|vip] [search term...]`
    List { filter: CatalogFilter, term: String },
    Show { id: String },
    /// `publish <cover> <pdf> <pages> <free|vip> <title> | <description>`
    Publish {
        cover: PathBuf,
        content: PathBuf,
        pages: u32,
        is_premium: bool,
        title: String,
        description: String,
    },
    /// Started books and reading totals.
    History,
    Open { id: String },
    Next,
    Prev,
    Page(u32),
    ZoomIn,
    ZoomOut,
    ZoomReset,
    Fullscreen,
    /// Pointer activity over the reader.
    Move,
    /// The document reported its real page count.
    Loaded(u32),
    Close,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  login <email> <password>        register <email> <password> <name>
  federated <token>               logout | upgrade | refresh
  list [all|free|vip] [term]      show <id> | open <id> | history
  publish <cover> <pdf> <pages> <free|vip> <title> | <description>
  next | prev | page <n>          zoom-in | zoom-out | zoom-reset
  fullscreen | move | loaded <n>  close | quit";

const PUBLISH_USAGE: &str = "publish <cover> <pdf> <pages> <free|vip> <title> | <description>";

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(ParseError::Empty);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
            ("login", [email, password]) => Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            },
            ("login", _) => return Err(ParseError::Usage("login <email> <password>")),
            ("register", [email, password, name @ ..]) if !name.is_empty() => Command::Register {
                email: email.to_string(),
                password: password.to_string(),
                name: name.join(" "),
            },
            ("register", _) => return Err(ParseError::Usage("register <email> <password> <name>")),
            ("federated", [token]) => Command::Federated {
                token: token.to_string(),
            },
            ("federated", _) => return Err(ParseError::Usage("federated <token>")),
            ("logout", []) => Command::Logout,
            ("upgrade", []) => Command::Upgrade,
            ("refresh", []) => Command::Refresh,
            ("list" | "ls", rest) => parse_list(rest),
            ("show", [id]) => Command::Show { id: id.to_string() },
            ("show", _) => return Err(ParseError::Usage("show <id>")),
            ("publish", [cover, content, pages, tier, rest @ ..]) if !rest.is_empty() => {
                let is_premium = match tier.to_lowercase().as_str() {
                    "free" => false,
                    "vip" => true,
                    _ => return Err(ParseError::Usage(PUBLISH_USAGE)),
                };
                let text = rest.join(" ");
                let (title, description) = text.split_once('|').unwrap_or((text.as_str(), ""));
                Command::Publish {
                    cover: PathBuf::from(cover),
                    content: PathBuf::from(content),
                    pages: parse_number(pages, PUBLISH_USAGE)?,
                    is_premium,
                    title: title.trim().to_string(),
                    description: description.trim().to_string(),
                }
            }
            ("publish", _) => return Err(ParseError::Usage(PUBLISH_USAGE)),
            ("history", []) => Command::History,
            ("open", [id]) => Command::Open { id: id.to_string() },
            ("open", _) => return Err(ParseError::Usage("open <id>")),
            ("next" | "n", []) => Command::Next,
            ("prev" | "p", []) => Command::Prev,
            ("page", [n]) => Command::Page(parse_number(n, "page <n>")?),
            ("page", _) => return Err(ParseError::Usage("page <n>")),
            ("zoom-in" | "+", []) => Command::ZoomIn,
            ("zoom-out" | "-", []) => Command::ZoomOut,
            ("zoom-reset" | "=", []) => Command::ZoomReset,
            ("fullscreen" | "f", []) => Command::Fullscreen,
            ("move", []) => Command::Move,
            ("loaded", [n]) => Command::Loaded(parse_number(n, "loaded <n>")?),
            ("loaded", _) => return Err(ParseError::Usage("loaded <n>")),
            ("close", []) => Command::Close,
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            (other, _) => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn parse_list(args: &[&str]) -> Command {
    let (filter, rest) = match args.first().map(|a| a.to_lowercase()) {
        Some(word) if word == "all" => (CatalogFilter::All, &args[1..]),
        Some(word) if word == "free" => (CatalogFilter::Free, &args[1..]),
        Some(word) if word == "vip" => (CatalogFilter::Premium, &args[1..]),
        _ => (CatalogFilter::All, args),
    };
    Command::List {
        filter,
        term: rest.join(" "),
    }
}

fn parse_number(raw: &str, usage: &'static str) -> Result<u32, ParseError> {
    raw.parse::<u32>().map_err(|_| ParseError::Usage(usage))
}
