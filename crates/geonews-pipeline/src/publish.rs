//! Dataset publishing through git
//!
//! Stages the output dataset, commits it with a timestamped message and
//! pushes. Every problem is reported as a [`PublishOutcome`] rather than an
//! error: publishing never fails an extraction run.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, Local};
use tracing::{info, warn};

const COMMIT_PREFIX: &str = "Actualización automática de datos";

/// Step of the publishing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Add,
    Commit,
    Push,
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Commit => write!(f, "commit"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// Result of a publish attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Changes committed and pushed
    Pushed,
    /// The dataset had no changes
    NothingToCommit,
    /// No repository or no git executable
    Skipped(String),
    /// A git step failed
    Failed { stage: PublishStage, detail: String },
}

impl PublishOutcome {
    /// An unchanged dataset counts as published
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Pushed | Self::NothingToCommit)
    }
}

impl std::fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pushed => write!(f, "changes pushed"),
            Self::NothingToCommit => write!(f, "nothing to publish"),
            Self::Skipped(reason) => write!(f, "publishing skipped: {reason}"),
            Self::Failed { stage, detail } => {
                write!(f, "publishing failed at git {stage}: {detail}")
            }
        }
    }
}

/// Commit message for a publish at `now`
pub fn default_commit_message(now: DateTime<Local>) -> String {
    format!("{COMMIT_PREFIX} - {}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// Publishes files from a working tree
pub struct GitPublisher {
    work_dir: PathBuf,
    message: Option<String>,
}

impl GitPublisher {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            message: None,
        }
    }

    /// Use a fixed commit message instead of the timestamped default
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    fn git(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
    }

    /// Check that git runs and the work dir is inside a repository
    pub fn is_available(&self) -> bool {
        self.git(&["rev-parse", "--is-inside-work-tree"])
            .map(|o| o.status.success() && String::from_utf8_lossy(&o.stdout).trim() == "true")
            .unwrap_or(false)
    }

    /// Stage, commit and push `file`
    pub fn publish(&self, file: &Path) -> PublishOutcome {
        let outcome = self.try_publish(file);
        if outcome.is_success() {
            info!(file = %file.display(), %outcome, "Dataset publish finished");
        } else {
            warn!(file = %file.display(), %outcome, "Dataset not published");
        }
        outcome
    }

    fn try_publish(&self, file: &Path) -> PublishOutcome {
        if !self.is_available() {
            return PublishOutcome::Skipped(format!(
                "{} is not a git work tree",
                self.work_dir.display()
            ));
        }

        let file = file.to_string_lossy();
        if let Err(outcome) = self.step(PublishStage::Add, &["add", &*file]) {
            return outcome;
        }

        let message = self
            .message
            .clone()
            .unwrap_or_else(|| default_commit_message(Local::now()));
        if let Err(outcome) = self.step(PublishStage::Commit, &["commit", "-m", &message]) {
            return outcome;
        }

        match self.step(PublishStage::Push, &["push"]) {
            Ok(()) => PublishOutcome::Pushed,
            Err(outcome) => outcome,
        }
    }

    fn step(&self, stage: PublishStage, args: &[&str]) -> Result<(), PublishOutcome> {
        let output = self.git(args).map_err(|e| PublishOutcome::Failed {
            stage,
            detail: e.to_string(),
        })?;
        if output.status.success() {
            return Ok(());
        }

        let detail = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if stage == PublishStage::Commit && is_nothing_to_commit(&detail) {
            return Err(PublishOutcome::NothingToCommit);
        }
        Err(PublishOutcome::Failed {
            stage,
            detail: detail.trim().to_string(),
        })
    }
}

fn is_nothing_to_commit(output: &str) -> bool {
    output.contains("nothing to commit") || output.contains("no changes added")
}
