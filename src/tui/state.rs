use crate::job::{self, JobEvent};
use crate::pipeline::PipelineStats;
use crate::rewrite::RewriteKind;
use crate::table::Table;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Idle,
    Processing { done: usize, total: usize },
    Complete(PipelineStats),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Upload,
    Download,
    Instruction,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    pub buffer: String,
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self.kind {
            PromptKind::Upload => " Input file (.csv / .xlsx) ",
            PromptKind::Download => " Save optimized file as (.xlsx) ",
            PromptKind::Instruction => " Instruction override (empty = use row 0) ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Info,
    Error,
}

/// Modal message; blocks other keys until dismissed.
#[derive(Debug, Clone)]
pub struct Dialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Output,
}

/// Work the UI asks the event loop to start.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Quit,
    Upload {
        path: PathBuf,
        instruction: Option<String>,
    },
    Download {
        path: PathBuf,
        table: Arc<Table>,
    },
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: JobStatus,
    pub input_path: Option<PathBuf>,
    pub input: Option<Table>,
    pub instruction: Option<String>,
    pub instruction_override: Option<String>,
    /// Rows published so far by the running job.
    pub output: Option<Table>,
    /// Last complete result; the only thing download can write.
    pub result: Option<Arc<Table>>,
    pub fallback_rows: usize,
    pub prompt: Option<Prompt>,
    pub dialog: Option<Dialog>,
    pub focus: Focus,
    pub input_scroll: usize,
    pub output_scroll: usize,
    pub logs: VecDeque<LogEntry>,
    pub default_output: PathBuf,
}

impl AppState {
    pub fn new(default_output: impl Into<PathBuf>) -> Self {
        Self {
            status: JobStatus::Idle,
            input_path: None,
            input: None,
            instruction: None,
            instruction_override: None,
            output: None,
            result: None,
            fallback_rows: 0,
            prompt: None,
            dialog: None,
            focus: Focus::Input,
            input_scroll: 0,
            output_scroll: 0,
            logs: VecDeque::with_capacity(MAX_LOGS),
            default_output: default_output.into(),
        }
    }

    pub fn job_active(&self) -> bool {
        matches!(self.status, JobStatus::Processing { .. })
    }

    pub fn download_ready(&self) -> bool {
        self.result.is_some() && !self.job_active()
    }

    pub fn status_text(&self) -> String {
        match &self.status {
            JobStatus::Idle => "Idle".to_string(),
            JobStatus::Processing { done, total } => format!("Processing... ({}/{})", done, total),
            JobStatus::Complete(_) => "Processing complete!".to_string(),
            JobStatus::Failed => "Processing failed.".to_string(),
        }
    }

    pub fn push_log(&mut self, level: &str, message: String) {
        let time = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        if self.logs.len() >= MAX_LOGS {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            time,
            level: level.to_string(),
            message,
        });
    }

    fn show_dialog(&mut self, kind: DialogKind, title: &str, message: String) {
        self.dialog = Some(Dialog {
            kind,
            title: title.to_string(),
            message,
        });
    }

    /// Mark a new job as started. Clears everything from the previous upload.
    pub fn begin_job(&mut self, path: PathBuf) {
        self.push_log("INFO", format!("Processing {}", path.display()));
        self.status = JobStatus::Processing { done: 0, total: 0 };
        self.input_path = Some(path);
        self.input = None;
        self.instruction = None;
        self.output = None;
        self.result = None;
        self.fallback_rows = 0;
        self.input_scroll = 0;
        self.output_scroll = 0;
    }

    /// Fold one background event into the UI state.
    pub fn apply(&mut self, event: JobEvent) {
        match event {
            JobEvent::Loaded { path, table, instruction } => {
                let total = table.data_row_count();
                self.push_log(
                    "INFO",
                    format!("Loaded {} ({} rows), instruction: {}", path.display(), total, instruction),
                );
                self.output = Some(Table::new(table.columns.clone()));
                self.input = Some(table);
                self.instruction = Some(instruction);
                self.status = JobStatus::Processing { done: 0, total };
            }
            JobEvent::RowDone { index, total, row, outcome } => {
                if let Some(out) = self.output.as_mut() {
                    out.rows.push(row);
                }
                if outcome == RewriteKind::Fallback {
                    self.fallback_rows += 1;
                    self.push_log("WARN", format!("Row {}: generation failed, kept original text", index));
                }
                self.status = JobStatus::Processing { done: index, total };
            }
            JobEvent::Completed { table, stats } => {
                self.push_log(
                    "INFO",
                    format!(
                        "Done: {} rows, {} generated, {} kept original, {} without description",
                        stats.total(),
                        stats.generated,
                        stats.fallback,
                        stats.sentinel
                    ),
                );
                self.output = Some(table.clone());
                self.result = Some(Arc::new(table));
                self.status = JobStatus::Complete(stats);
                self.show_dialog(DialogKind::Info, "Success", "SEO-friendly descriptions are ready. Press [d] to save.".to_string());
            }
            JobEvent::Failed { message } => {
                self.push_log("ERROR", message.clone());
                self.input = None;
                self.output = None;
                self.result = None;
                self.status = JobStatus::Failed;
                self.show_dialog(DialogKind::Error, "Error", message);
            }
            JobEvent::Saved { path } => {
                let msg = format!("File saved to {}", path.display());
                self.push_log("INFO", msg.clone());
                self.show_dialog(DialogKind::Info, "Success", msg);
            }
            JobEvent::SaveFailed { path, message } => {
                self.push_log("ERROR", format!("Saving {} failed: {}", path.display(), message));
                self.show_dialog(DialogKind::Error, "Error", format!("Could not save file: {}", message));
            }
        }
    }

    /// Interpret one key press. Returns work for the event loop, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<UiAction> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(UiAction::Quit);
        }

        if self.dialog.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.dialog = None;
            }
            return None;
        }

        if self.prompt.is_some() {
            return self.handle_prompt_key(key);
        }

        match key.code {
            KeyCode::Char('q') => return Some(UiAction::Quit),
            KeyCode::Char('u') => {
                if self.job_active() {
                    self.push_log("WARN", "A file is already being processed; wait for it to finish".to_string());
                } else {
                    self.prompt = Some(Prompt { kind: PromptKind::Upload, buffer: String::new() });
                }
            }
            KeyCode::Char('i') => {
                let buffer = self.instruction_override.clone().unwrap_or_default();
                self.prompt = Some(Prompt { kind: PromptKind::Instruction, buffer });
            }
            KeyCode::Char('d') => {
                if self.download_ready() {
                    let buffer = self.default_output.display().to_string();
                    self.prompt = Some(Prompt { kind: PromptKind::Download, buffer });
                } else {
                    self.show_dialog(DialogKind::Error, "Error", "No optimized file available.".to_string());
                }
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Input => Focus::Output,
                    Focus::Output => Focus::Input,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => {
                let last = self.focused_row_count().saturating_sub(1);
                let s = self.focused_scroll();
                *s = (*s + 1).min(last);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let s = self.focused_scroll();
                *s = s.saturating_sub(1);
            }
            KeyCode::Char('g') | KeyCode::Home => *self.focused_scroll() = 0,
            _ => {}
        }
        None
    }

    fn focused_scroll(&mut self) -> &mut usize {
        match self.focus {
            Focus::Input => &mut self.input_scroll,
            Focus::Output => &mut self.output_scroll,
        }
    }

    fn focused_row_count(&self) -> usize {
        let table = match self.focus {
            Focus::Input => self.input.as_ref(),
            Focus::Output => self.output.as_ref(),
        };
        table.map_or(0, |t| t.rows.len())
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Option<UiAction> {
        let prompt = self.prompt.as_mut()?;
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                None
            }
            KeyCode::Backspace => {
                prompt.buffer.pop();
                None
            }
            KeyCode::Char(c) => {
                prompt.buffer.push(c);
                None
            }
            KeyCode::Enter => {
                let Prompt { kind, buffer } = self.prompt.take()?;
                let value = buffer.trim().to_string();
                match kind {
                    PromptKind::Instruction => {
                        if value.is_empty() {
                            self.instruction_override = None;
                            self.push_log("INFO", "Instruction override cleared".to_string());
                        } else {
                            self.push_log("INFO", format!("Instruction override set: {}", value));
                            self.instruction_override = Some(value);
                        }
                        None
                    }
                    _ if value.is_empty() => None,
                    PromptKind::Upload => {
                        if self.job_active() {
                            return None;
                        }
                        Some(UiAction::Upload {
                            path: expand_home(&value),
                            instruction: self.instruction_override.clone(),
                        })
                    }
                    PromptKind::Download => {
                        let table = self.result.clone()?;
                        Some(UiAction::Download {
                            path: job::with_xlsx_extension(expand_home(&value)),
                            table,
                        })
                    }
                }
            }
            _ => None,
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix('~') {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(format!("{}{}", home, rest))
        }
        None => PathBuf::from(raw),
    }
}
