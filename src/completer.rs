use crate::commands::{tokenize, CHART_KINDS, COMMAND_WORDS};
use crate::data::data_store::Identifier;
use reedline::{Completer, Span, Suggestion};
use std::sync::{Arc, Mutex};

/// Names the completer can offer. Shared with the session so it can be
/// refreshed after every change to the dataset.
#[derive(Debug, Default, Clone)]
pub struct Vocabulary {
    pub columns: Vec<String>,
    pub companies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Command,
    Identifier,
    Column,
    ChartKind,
    Nothing,
}

/// What the word at `index` of a `command` line should be
fn slot_for(command: &str, index: usize) -> Slot {
    match (command, index) {
        (_, 0) => Slot::Command,
        ("view" | "remove" | "rm" | "update", 1) => Slot::Identifier,
        ("filter", 1) | ("update", 2) => Slot::Column,
        ("chart", 1) => Slot::ChartKind,
        _ => Slot::Nothing,
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.is_empty() || value.contains(char::is_whitespace) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

pub struct JobCompleter {
    vocabulary: Arc<Mutex<Vocabulary>>,
}

impl JobCompleter {
    pub fn new(vocabulary: Arc<Mutex<Vocabulary>>) -> Self {
        Self { vocabulary }
    }

    /// Candidate values for the word being typed, before span handling
    fn candidates(&self, line: &str) -> (Vec<String>, String, Slot) {
        // Close a dangling quote so the partial word still tokenizes
        let words = tokenize(line)
            .or_else(|_| tokenize(&format!("{}\"", line)))
            .or_else(|_| tokenize(&format!("{}'", line)))
            .unwrap_or_default();

        let ends_with_space = line.ends_with(char::is_whitespace) && tokenize(line).is_ok();
        let (index, partial) = if ends_with_space || words.is_empty() {
            (words.len(), String::new())
        } else {
            (words.len() - 1, words[words.len() - 1].clone())
        };

        let command = words
            .first()
            .map(|w| w.to_ascii_lowercase())
            .unwrap_or_default();
        let slot = slot_for(&command, index);

        let vocabulary = self
            .vocabulary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // (text matched against, text inserted)
        let plain = |words: Vec<String>| -> Vec<(String, String)> {
            words.into_iter().map(|w| (w.clone(), w)).collect()
        };
        let pool: Vec<(String, String)> = match slot {
            Slot::Command => plain(COMMAND_WORDS.iter().map(|w| w.to_string()).collect()),
            Slot::Identifier => vocabulary
                .companies
                .iter()
                .map(|name| (name.clone(), Identifier::ByKey(name.clone()).to_input()))
                .collect(),
            Slot::Column => plain(vocabulary.columns.clone()),
            Slot::ChartKind => plain(CHART_KINDS.iter().map(|w| w.to_string()).collect()),
            Slot::Nothing => Vec::new(),
        };

        let needle = partial.to_lowercase();
        let matches = pool
            .into_iter()
            .filter(|(name, input)| {
                name.to_lowercase().starts_with(&needle) || input.to_lowercase().starts_with(&needle)
            })
            .map(|(_, input)| input)
            .collect();

        (matches, partial, slot)
    }
}

impl Completer for JobCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let input = &line[..pos];
        let (matches, _, slot) = self.candidates(input);

        // Replace from the start of the current word, including any opening quote
        let start_pos = if input.ends_with(char::is_whitespace) && tokenize(input).is_ok() {
            pos
        } else {
            input
                .rfind(|c: char| c.is_whitespace() || c == '"' || c == '\'')
                .map(|idx| {
                    let quoted = matches!(input[idx..].chars().next(), Some('"' | '\''));
                    if quoted {
                        idx
                    } else {
                        idx + 1
                    }
                })
                .unwrap_or(0)
        };

        let description = match slot {
            Slot::Command => Some("command".to_string()),
            Slot::Identifier => Some("company".to_string()),
            Slot::Column => Some("column".to_string()),
            Slot::ChartKind => Some("chart".to_string()),
            Slot::Nothing => None,
        };

        matches
            .into_iter()
            .map(|value| Suggestion {
                value: quote_if_needed(&value),
                description: description.clone(),
                extra: None,
                span: Span {
                    start: start_pos,
                    end: pos,
                },
                style: None,
                append_whitespace: true,
            })
            .collect()
    }
}
