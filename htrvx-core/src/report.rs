//! Check outcomes, per-file reports and their rendering.
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::ConfigParseError;
use crate::document::Level;

const OUTCOME_INDENT: &str = "  ";
const DETAIL_INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
    Failure,
}

impl Status {
    fn mark(&self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Warning => "⚠",
            Status::Failure => "×",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Status::Success => "passed successfully",
            Status::Warning => "has warnings",
            Status::Failure => "failed",
        }
    }

    fn color(&self, verbosity: VerboseLevel) -> Option<Color> {
        match (self, verbosity) {
            (Status::Failure, _) => Some(Color::Red),
            (_, VerboseLevel::Zen) => None,
            (Status::Success, _) => Some(Color::Green),
            (Status::Warning, _) => Some(Color::Yellow),
        }
    }
}

/// Kind of check an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    Taxonomy,
    Emptiness,
    ImageLink,
    Schema,
}

impl Task {
    pub fn title(&self) -> &'static str {
        match self {
            Task::Taxonomy => "Taxonomy",
            Task::Emptiness => "Emptiness",
            Task::ImageLink => "Image link",
            Task::Schema => "Schema",
        }
    }
}

/// How much of a run is printed.
///
/// # Examples
/// ```rust
/// use std::str::FromStr;
/// use htrvx_core::report::VerboseLevel;
///
/// assert_eq!(VerboseLevel::from_str("zen")?, VerboseLevel::Zen);
/// assert_eq!(VerboseLevel::default(), VerboseLevel::All);
/// # Ok::<(), htrvx_core::config::ConfigParseError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerboseLevel {
    /// Failing checks only, without details.
    Minimal,
    /// Failing checks with their details.
    Low,
    /// Everything, only failures coloured.
    Zen,
    #[default]
    All,
}

impl FromStr for VerboseLevel {
    type Err = ConfigParseError;
    fn from_str(level: &str) -> Result<VerboseLevel, ConfigParseError> {
        match level.to_ascii_lowercase().as_str() {
            "minimal" => Ok(VerboseLevel::Minimal),
            "low" => Ok(VerboseLevel::Low),
            "zen" => Ok(VerboseLevel::Zen),
            "all" => Ok(VerboseLevel::All),
            _ => Err(ConfigParseError::VerboseLevel {
                input: level.to_string(),
            }),
        }
    }
}

impl VerboseLevel {
    fn failures_only(&self) -> bool {
        matches!(self, VerboseLevel::Minimal | VerboseLevel::Low)
    }
}

fn paint(text: String, color: Option<Color>) -> String {
    match color {
        Some(color) => text.color(color).to_string(),
        None => text,
    }
}

/// Result of one check on one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub status: Status,
    pub task: Task,
    pub level: Option<Level>,
    pub message: Option<String>,
    pub details: Vec<String>,
}

impl CheckOutcome {
    pub fn new(status: Status, task: Task) -> Self {
        CheckOutcome {
            status,
            task,
            level: None,
            message: None,
            details: Vec::new(),
        }
    }

    pub fn at_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == Status::Failure
    }

    /// Headline of the outcome, without colour.
    pub fn headline(&self) -> String {
        let level = self
            .level
            .map(|level| format!(" at the {level}'s level"))
            .unwrap_or_default();
        let message = self
            .message
            .as_deref()
            .map(|message| format!(": {message}"))
            .unwrap_or_default();
        format!(
            "{} {}'s test{level} {}{message}.",
            self.status.mark(),
            self.task.title(),
            self.status.verb()
        )
    }

    /// Rendered lines, or `None` when the verbosity hides this outcome.
    pub fn render(&self, verbosity: VerboseLevel) -> Option<String> {
        if verbosity.failures_only() && !self.is_failure() {
            return None;
        }
        let mut out = paint(
            format!("{OUTCOME_INDENT}{}", self.headline()),
            self.status.color(verbosity),
        );
        if verbosity != VerboseLevel::Minimal {
            let detail_color = (verbosity == VerboseLevel::All).then_some(Color::Blue);
            for detail in &self.details {
                out.push('\n');
                out.push_str(&paint(format!("{DETAIL_INDENT}┗ {detail}"), detail_color));
            }
        }
        Some(out)
    }
}

/// Outcomes of every check run on one file, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    outcomes: Vec<CheckOutcome>,
}

impl FileReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: CheckOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Non-failing and total outcome counts.
    pub fn score(&self) -> (usize, usize) {
        let passed = self.outcomes.iter().filter(|o| !o.is_failure()).count();
        (passed, self.outcomes.len())
    }

    /// Warnings count as passing.
    pub fn passed(&self) -> bool {
        let (passed, total) = self.score();
        passed == total
    }

    pub fn render(&self, label: &str, verbosity: VerboseLevel) -> String {
        let (passed, total) = self.score();
        let status = if self.passed() {
            Status::Success
        } else {
            Status::Failure
        };
        let mut out = paint(
            format!("{} [{passed}/{total}] {label}", status.mark()),
            status.color(verbosity),
        );
        if status == Status::Success && verbosity.failures_only() {
            return out;
        }
        for rendered in self.outcomes.iter().filter_map(|o| o.render(verbosity)) {
            out.push('\n');
            out.push_str(&rendered);
        }
        out
    }
}

impl<'a> IntoIterator for &'a FileReport {
    type Item = &'a CheckOutcome;
    type IntoIter = std::slice::Iter<'a, CheckOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

/// Report of one file within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub label: String,
    pub passed: bool,
    pub report: FileReport,
}

/// Reports of every file of a run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRun {
    files: Vec<FileEntry>,
}

impl ValidationRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, report: FileReport) {
        self.files.push(FileEntry {
            label: label.into(),
            passed: report.passed(),
            report,
        });
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn get(&self, label: &str) -> Option<&FileReport> {
        self.files
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| &entry.report)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn passing_files(&self) -> usize {
        self.files.iter().filter(|entry| entry.passed).count()
    }

    /// True when every file passed.
    pub fn passed(&self) -> bool {
        self.passing_files() == self.files.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "=====\nREPORT\n=====\n\n{}/{} valid XML files",
            self.passing_files(),
            self.files.len()
        )
    }

    /// Every file report followed by the summary.
    pub fn render(&self, verbosity: VerboseLevel) -> String {
        let mut out = String::new();
        for entry in &self.files {
            out.push_str(&entry.report.render(&entry.label, verbosity));
            out.push('\n');
        }
        out.push_str("\n\n");
        out.push_str(&self.summary());
        out
    }
}
