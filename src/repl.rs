//! Interactive session: reads commands, calls the store and prints
//! results. Errors are printed and the session carries on.

use crate::commands::{help_text, is_incomplete, parse_command, ChartKind, Command};
use crate::completer::{JobCompleter, Vocabulary};
use crate::data::aggregate::{cross_tab, value_counts};
use crate::data::data_store::{DataStore, Identifier};
use crate::table_display::{
    render_column_summary, render_cross_tab, render_datatable, render_value_counts,
    render_with_positions, DisplayOptions, STATUS_COLUMN,
};
use crate::utils::logging::get_log_buffer;
use anyhow::Result;
use crossterm::style::Stylize;
use reedline::{
    default_emacs_keybindings, ColumnarMenu, Emacs, FileBackedHistory, KeyCode, KeyModifiers,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, ValidationResult, Validator,
};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub const SECTOR_COLUMN: &str = "Sector";

/// Source of answers for commands that ask the user something
pub trait Prompter {
    /// `None` when the user cancels
    fn ask(&mut self, question: &str) -> Result<Option<String>>;

    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self
            .ask(&format!("{} (y/n) ", question))?
            .map(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false))
    }
}

/// What the loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Exit,
}

struct CommandValidator;

impl Validator for CommandValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if is_incomplete(line) {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

struct SessionPrompt {
    label: String,
    dirty: bool,
}

impl Prompt for SessionPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        if self.dirty {
            Cow::Owned(format!("{}*", self.label))
        } else {
            Cow::Borrowed(&self.label)
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Custom(str) => format!("{str}> ").into(),
            _ => "> ".into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {})",
            prefix, history_search.term
        ))
    }
}

struct QuestionPrompt<'a>(&'a str);

impl Prompt for QuestionPrompt<'_> {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.0)
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

/// Asks questions on a history-less line editor
pub struct LinePrompter {
    editor: Reedline,
}

impl LinePrompter {
    pub fn new() -> Self {
        Self {
            editor: Reedline::create(),
        }
    }
}

impl Default for LinePrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for LinePrompter {
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        match self.editor.read_line(&QuestionPrompt(question))? {
            Signal::Success(answer) => Ok(Some(answer)),
            Signal::CtrlC | Signal::CtrlD => Ok(None),
        }
    }
}

pub struct Session {
    store: DataStore,
    display: DisplayOptions,
    confirm_remove: bool,
    vocabulary: Arc<Mutex<Vocabulary>>,
}

impl Session {
    pub fn new(store: DataStore, display: DisplayOptions, confirm_remove: bool) -> Self {
        let session = Self {
            store,
            display,
            confirm_remove,
            vocabulary: Arc::new(Mutex::new(Vocabulary::default())),
        };
        session.refresh_vocabulary();
        session
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn vocabulary(&self) -> Arc<Mutex<Vocabulary>> {
        self.vocabulary.clone()
    }

    fn refresh_vocabulary(&self) {
        let mut vocabulary = self
            .vocabulary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        vocabulary.columns = self.store.columns();
        vocabulary.companies = self.store.key_values();
    }

    fn unnumbered(&self) -> DisplayOptions {
        DisplayOptions {
            show_row_numbers: false,
            ..self.display.clone()
        }
    }

    /// Parse and run one line
    pub fn execute_line(&mut self, line: &str, prompter: &mut dyn Prompter) -> Result<Outcome> {
        match parse_command(line)? {
            Some(command) => self.execute(command, prompter),
            None => Ok(Outcome::Continue(String::new())),
        }
    }

    pub fn execute(&mut self, command: Command, prompter: &mut dyn Prompter) -> Result<Outcome> {
        debug!("Executing {:?}", command);

        let output = match command {
            Command::List => render_datatable(self.store.list_all(), &self.display),
            Command::View(id) => {
                let positions = self.store.locate(&id)?;
                let records = self.store.get(&id)?;
                if records.is_empty() {
                    format!("No applications match {}.", id)
                } else {
                    render_with_positions(&records, Some(&positions), &self.display)
                }
            }
            Command::Filter { column, value } => {
                let result = self.store.filter(&column, value.as_deref())?;
                render_datatable(&result, &self.unnumbered())
            }
            Command::Update { id, column, value } => {
                let touched = self.store.update(&id, &column, &value)?;
                self.refresh_vocabulary();
                if touched == 0 {
                    format!("No applications match {}; nothing changed.", id)
                } else {
                    format!("{} updated on {} application(s) for {}.", column, touched, id)
                }
            }
            Command::Add => self.add(prompter)?,
            Command::Remove(id) => self.remove(id, prompter)?,
            Command::Chart(ChartKind::Status) => {
                let tab = cross_tab(self.store.list_all(), SECTOR_COLUMN, STATUS_COLUMN)?;
                format!(
                    "Sector-focused application status\n{}",
                    render_cross_tab(&tab, &self.display)
                )
            }
            Command::Chart(ChartKind::Sector) => {
                let counts = value_counts(self.store.list_all(), SECTOR_COLUMN)?;
                format!(
                    "Application distribution by sector\n{}",
                    render_value_counts(SECTOR_COLUMN, &counts, &self.display)
                )
            }
            Command::Columns => render_column_summary(self.store.list_all(), &self.display),
            Command::Save => {
                self.store.save()?;
                format!(
                    "Saved {} application(s) to {}.",
                    self.store.len(),
                    self.store.source().display()
                )
            }
            Command::Log(count) => match get_log_buffer() {
                Some(buffer) if !buffer.is_empty() => buffer
                    .get_recent(count)
                    .iter()
                    .map(|entry| entry.format_for_display())
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => "No log entries.".to_string(),
            },
            Command::Help => help_text().to_string(),
            Command::Exit => return Ok(Outcome::Exit),
        };

        Ok(Outcome::Continue(output))
    }

    /// Ask for every column in schema order. Cancelling abandons the record.
    fn add(&mut self, prompter: &mut dyn Prompter) -> Result<String> {
        let mut values = HashMap::new();
        for column in self.store.columns() {
            match prompter.ask(&format!("{}: ", column))? {
                Some(value) => {
                    values.insert(column, value.trim().to_string());
                }
                None => return Ok("Add cancelled.".to_string()),
            }
        }

        let position = self.store.insert(&values);
        self.refresh_vocabulary();
        Ok(format!("New application added at #{}.", position))
    }

    fn remove(&mut self, id: Identifier, prompter: &mut dyn Prompter) -> Result<String> {
        let positions = self.store.locate(&id)?;
        if positions.is_empty() {
            return Ok(format!("No applications match {}; nothing removed.", id));
        }

        if self.confirm_remove {
            let records = self.store.get(&id)?;
            println!(
                "{}",
                render_with_positions(&records, Some(&positions), &self.display)
            );
            let question = format!("Remove {} application(s) for {}?", positions.len(), id);
            if !prompter.confirm(&question)? {
                return Ok("Nothing removed.".to_string());
            }
        }

        let removed = self.store.remove(&id)?;
        self.refresh_vocabulary();
        Ok(format!("Removed {} application(s) for {}.", removed, id))
    }

    /// Run the interactive loop until `exit` or end of input
    pub fn run(mut self, history_file: Option<PathBuf>) -> Result<()> {
        let completion_menu = Box::new(
            ColumnarMenu::default()
                .with_name("job_completion")
                .with_columns(1)
                .with_column_width(None)
                .with_column_padding(2),
        );

        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::Menu("job_completion".to_string()),
        );

        let mut line_editor = Reedline::create()
            .with_completer(Box::new(JobCompleter::new(self.vocabulary())))
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_validator(Box::new(CommandValidator))
            .with_edit_mode(Box::new(Emacs::new(keybindings)));

        if let Some(path) = history_file {
            match FileBackedHistory::with_file(200, path) {
                Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
                Err(e) => eprintln!("{}", format!("History disabled: {}", e).yellow()),
            }
        }

        let mut prompter = LinePrompter::new();
        let label = self.store.list_all().name.clone();

        println!(
            "{}",
            format!(
                "Loaded {} application(s) from {}. Type 'help' for commands.",
                self.store.len(),
                self.store.source().display()
            )
            .cyan()
        );

        loop {
            let prompt = SessionPrompt {
                label: label.clone(),
                dirty: self.store.is_dirty(),
            };

            let outcome = match line_editor.read_line(&prompt)? {
                Signal::Success(buffer) => self.execute_line(&buffer, &mut prompter),
                Signal::CtrlC => continue,
                Signal::CtrlD => Ok(Outcome::Exit),
            };

            match outcome {
                Ok(Outcome::Continue(output)) => {
                    if !output.is_empty() {
                        println!("{}", output);
                    }
                }
                Ok(Outcome::Exit) => {
                    if self.store.is_dirty()
                        && !prompter.confirm("Discard unsaved changes and exit?")?
                    {
                        continue;
                    }
                    break;
                }
                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
            }
        }

        info!("Session ended");
        println!("Goodbye!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::data_store::StoreOptions;
    use crate::data::datatable::{DataRow, DataTable};
    use std::collections::VecDeque;

    /// Replays canned answers; `None` simulates Ctrl-C
    struct ScriptedPrompter {
        answers: VecDeque<Option<String>>,
    }

    impl ScriptedPrompter {
        fn new(answers: &[Option<&str>]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.map(str::to_string)).collect(),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask(&mut self, _question: &str) -> Result<Option<String>> {
            Ok(self.answers.pop_front().flatten())
        }
    }

    fn session() -> Session {
        let table = DataTable::from_rows(
            "jobs",
            ["Company Name", "Sector", "Application Status"],
            vec![
                DataRow::from_iter(["Acme", "Tech", "Applied"]),
                DataRow::from_iter(["Globex", "Finance", "Rejected"]),
                DataRow::from_iter(["Acme", "Tech", "Successful"]),
            ],
        )
        .unwrap();
        let store = DataStore::from_table(table, "jobs.csv", StoreOptions::default());
        let display = DisplayOptions {
            use_colors: false,
            ..DisplayOptions::default()
        };
        Session::new(store, display, true)
    }

    fn output(outcome: Outcome) -> String {
        match outcome {
            Outcome::Continue(text) => text,
            Outcome::Exit => panic!("unexpected exit"),
        }
    }

    #[test]
    fn test_view_shows_dataset_positions() {
        let mut session = session();
        let mut prompter = ScriptedPrompter::new(&[]);
        let text = output(session.execute_line("view Acme", &mut prompter).unwrap());
        assert!(text.contains("#0"));
        assert!(text.contains("#2"));
        assert!(!text.contains("Globex"));

        let text = output(session.execute_line("view Initech", &mut prompter).unwrap());
        assert_eq!(text, "No applications match 'Initech'.");
    }

    #[test]
    fn test_errors_propagate_without_mutation() {
        let mut session = session();
        let mut prompter = ScriptedPrompter::new(&[]);
        assert!(session.execute_line("view #7", &mut prompter).is_err());
        assert!(session.execute_line("filter Salary x", &mut prompter).is_err());
        assert_eq!(session.store().len(), 3);
        assert!(!session.store().is_dirty());
    }

    #[test]
    fn test_add_prompts_each_column() {
        let mut session = session();
        let mut prompter =
            ScriptedPrompter::new(&[Some("Initech"), Some(" Tech "), Some("Not Open")]);
        let text = output(session.execute(Command::Add, &mut prompter).unwrap());
        assert_eq!(text, "New application added at #3.");

        let last = session.store().get(&Identifier::ByIndex(3)).unwrap();
        assert_eq!(last.rows[0].values, vec!["Initech", "Tech", "Not Open"]);
        assert!(session
            .vocabulary()
            .lock()
            .unwrap()
            .companies
            .contains(&"Initech".to_string()));
    }

    #[test]
    fn test_add_cancel_keeps_dataset() {
        let mut session = session();
        let mut prompter = ScriptedPrompter::new(&[Some("Initech"), None]);
        let text = output(session.execute(Command::Add, &mut prompter).unwrap());
        assert_eq!(text, "Add cancelled.");
        assert_eq!(session.store().len(), 3);
    }

    #[test]
    fn test_remove_requires_confirmation() {
        let mut session = session();

        let mut declined = ScriptedPrompter::new(&[Some("n")]);
        let text = output(session.execute_line("remove Acme", &mut declined).unwrap());
        assert_eq!(text, "Nothing removed.");
        assert_eq!(session.store().len(), 3);

        let mut accepted = ScriptedPrompter::new(&[Some("yes")]);
        let text = output(session.execute_line("remove Acme", &mut accepted).unwrap());
        assert_eq!(text, "Removed 2 application(s) for 'Acme'.");
        assert_eq!(session.store().key_values(), vec!["Globex"]);
    }

    #[test]
    fn test_update_reports_zero_matches() {
        let mut session = session();
        let mut prompter = ScriptedPrompter::new(&[]);
        let text = output(
            session
                .execute_line("update Initech Sector Retail", &mut prompter)
                .unwrap(),
        );
        assert!(text.contains("nothing changed"));
        assert!(!session.store().is_dirty());
    }

    #[test]
    fn test_charts() {
        let mut session = session();
        let mut prompter = ScriptedPrompter::new(&[]);
        let text = output(session.execute_line("chart status", &mut prompter).unwrap());
        assert!(text.contains("Successful"));
        let text = output(session.execute_line("chart sector", &mut prompter).unwrap());
        assert!(text.contains("66.7%"));
    }

    #[test]
    fn test_hash_prefixed_companies() {
        let table = DataTable::from_rows(
            "jobs",
            ["Company Name", "Sector", "Application Status"],
            vec![
                DataRow::from_iter(["#1 Recruiters", "Staffing", "Applied"]),
                DataRow::from_iter(["Acme", "Tech", "Applied"]),
                DataRow::from_iter(["#12", "Retail", "Not Open"]),
            ],
        )
        .unwrap();
        let store = DataStore::from_table(table, "jobs.csv", StoreOptions::default());
        let mut session = Session::new(store, DisplayOptions::default(), false);
        let mut prompter = ScriptedPrompter::new(&[]);

        let text = output(
            session
                .execute_line("view \"#1 Recruiters\"", &mut prompter)
                .unwrap(),
        );
        assert!(text.contains("Staffing"));

        let text = output(session.execute_line("view key:#12", &mut prompter).unwrap());
        assert!(text.contains("Retail"));
        assert!(text.contains("#2"));

        // without the prefix #12 is a position
        assert!(session.execute_line("view #12", &mut prompter).is_err());

        let text = output(
            session
                .execute_line("remove \"#1 Recruiters\"", &mut prompter)
                .unwrap(),
        );
        assert_eq!(text, "Removed 1 application(s) for '#1 Recruiters'.");
        let text = output(session.execute_line("remove key:#12", &mut prompter).unwrap());
        assert_eq!(text, "Removed 1 application(s) for '#12'.");
        assert_eq!(session.store().key_values(), vec!["Acme"]);
    }

    #[test]
    fn test_exit() {
        let mut session = session();
        let mut prompter = ScriptedPrompter::new(&[]);
        assert_eq!(
            session.execute_line("exit", &mut prompter).unwrap(),
            Outcome::Exit
        );
    }
}
