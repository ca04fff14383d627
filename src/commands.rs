//! Interactive command grammar.
//!
//! Words are split on whitespace; single or double quotes group words
//! (`filter "Company Name" Acme`). Identifiers use `#N` for a position,
//! `key:NAME` for a company whose name would otherwise read as a position,
//! and anything else for a company name.

use crate::data::data_store::Identifier;
use anyhow::{anyhow, bail, Result};

/// Command words offered by completion and help
pub const COMMAND_WORDS: &[&str] = &[
    "list", "view", "filter", "update", "add", "remove", "chart", "columns", "save", "log",
    "help", "exit",
];

pub const CHART_KINDS: &[&str] = &["status", "sector"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Applications per sector, split by status
    Status,
    /// Share of applications per sector
    Sector,
}

impl std::str::FromStr for ChartKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "status" => Ok(ChartKind::Status),
            "sector" => Ok(ChartKind::Sector),
            other => Err(anyhow!("Unknown chart '{}' (expected status or sector)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    View(Identifier),
    Filter {
        column: String,
        value: Option<String>,
    },
    Update {
        id: Identifier,
        column: String,
        value: String,
    },
    Add,
    Remove(Identifier),
    Chart(ChartKind),
    Columns,
    Save,
    Log(usize),
    Help,
    Exit,
}

/// Split a line into words, honouring quotes. Fails on an unclosed quote.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        bail!("Unclosed {} quote", q);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// True while a line still has an open quote
pub fn is_incomplete(line: &str) -> bool {
    tokenize(line).is_err()
}

fn parse_id(word: &str) -> Result<Identifier> {
    Ok(word.parse::<Identifier>()?)
}

/// Parse one input line; `Ok(None)` for a blank line
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let words = tokenize(line)?;
    let Some((head, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (head.to_ascii_lowercase().as_str(), args) {
        ("list" | "ls", []) => Command::List,
        ("view", [id]) => Command::View(parse_id(id)?),
        ("filter", [column]) => Command::Filter {
            column: column.clone(),
            value: None,
        },
        ("filter", [column, value]) => Command::Filter {
            column: column.clone(),
            value: Some(value.clone()),
        },
        ("update", [id, column, value]) => Command::Update {
            id: parse_id(id)?,
            column: column.clone(),
            value: value.clone(),
        },
        ("add", []) => Command::Add,
        ("remove" | "rm", [id]) => Command::Remove(parse_id(id)?),
        ("chart", [kind]) => Command::Chart(kind.parse()?),
        ("columns", []) => Command::Columns,
        ("save", []) => Command::Save,
        ("log", []) => Command::Log(20),
        ("log", [count]) => Command::Log(
            count
                .parse()
                .map_err(|_| anyhow!("log expects a number, got '{}'", count))?,
        ),
        ("help" | "?", _) => Command::Help,
        ("exit" | "quit", []) => Command::Exit,
        (word, _) if COMMAND_WORDS.contains(&word) || word == "ls" || word == "rm" => {
            bail!("Wrong arguments for '{}'. {}", word, usage(word))
        }
        (word, _) => bail!("Unknown command '{}'. Type 'help' for a list of commands", word),
    };

    Ok(Some(command))
}

fn usage(word: &str) -> &'static str {
    match word {
        "view" => "Usage: view <#index|company>",
        "filter" => "Usage: filter <column> [value]",
        "update" => "Usage: update <#index|company> <column> <value>",
        "remove" | "rm" => "Usage: remove <#index|company>",
        "chart" => "Usage: chart <status|sector>",
        "log" => "Usage: log [count]",
        _ => "This command takes no arguments",
    }
}

pub fn help_text() -> &'static str {
    r#"Commands:
  list                                  Show every application
  view <#index|company>                 Show one application by position or all for a company
  filter <column> [value]               Rows where column == value, or company + column for all rows
  update <#index|company> <col> <value> Set a column on the addressed application(s)
  add                                   Add an application (prompts for each column)
  remove <#index|company>               Remove the addressed application(s)
  chart status                          Applications per sector split by status
  chart sector                          Share of applications per sector
  columns                               Show the columns with value counts
  save                                  Write all changes back to the data file
  log [count]                           Show recent log entries
  help                                  Show this help
  exit                                  Leave (unsaved changes are discarded)

Quote names containing spaces: view "Acme Corp", filter "Application Status" Applied
Prefix a company name with key: when it looks like a position: view key:#12"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"filter "Application Status"  'Not Open'"#).unwrap(),
            vec!["filter", "Application Status", "Not Open"]
        );
        assert_eq!(tokenize(r#"update #0 Notes """#).unwrap(), vec!["update", "#0", "Notes", ""]);
        assert!(tokenize(r#"view "Acme"#).is_err());
        assert!(is_incomplete("view 'Acme"));
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("LIST").unwrap(), Some(Command::List));
        assert_eq!(
            parse_command("view #1").unwrap(),
            Some(Command::View(Identifier::ByIndex(1)))
        );
        assert_eq!(
            parse_command(r#"remove "Acme Corp""#).unwrap(),
            Some(Command::Remove(Identifier::ByKey("Acme Corp".to_string())))
        );
        assert_eq!(
            parse_command("filter Sector").unwrap(),
            Some(Command::Filter {
                column: "Sector".to_string(),
                value: None
            })
        );
        assert_eq!(
            parse_command(r#"update #0 "Application Status" Rejected"#).unwrap(),
            Some(Command::Update {
                id: Identifier::ByIndex(0),
                column: "Application Status".to_string(),
                value: "Rejected".to_string(),
            })
        );
        assert_eq!(
            parse_command("chart Sector").unwrap(),
            Some(Command::Chart(ChartKind::Sector))
        );
        assert_eq!(parse_command("log 5").unwrap(), Some(Command::Log(5)));
    }

    #[test]
    fn test_parse_hash_company_names() {
        assert_eq!(
            parse_command("view \"#1 Recruiters\"").unwrap(),
            Some(Command::View(Identifier::ByKey("#1 Recruiters".to_string())))
        );
        assert_eq!(
            parse_command("remove key:#12").unwrap(),
            Some(Command::Remove(Identifier::ByKey("#12".to_string())))
        );
        assert_eq!(
            parse_command("update \"key:#12\" Sector Retail").unwrap(),
            Some(Command::Update {
                id: Identifier::ByKey("#12".to_string()),
                column: "Sector".to_string(),
                value: "Retail".to_string(),
            })
        );
        assert_eq!(
            parse_command("view #12").unwrap(),
            Some(Command::View(Identifier::ByIndex(12)))
        );
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_command("view").unwrap_err();
        assert!(err.to_string().contains("Usage: view"));

        assert!(parse_command("view #x").is_err());
        assert!(parse_command("chart pie").is_err());
        assert!(parse_command("log many").is_err());

        let err = parse_command("frobnicate").unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
    }
}
