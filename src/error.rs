//! Error types
//!
//! Nothing here is fatal to a running game. `StoryError` surfaces while
//! loading content, `OutcomeError` is recovered inside the resolver, and
//! `Rejection` is a refusal the host shows to the player as a prompt.

use thiserror::Error;

/// Failures while ingesting story data
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("story data is empty")]
    Empty,

    #[error("story data has no `id` column")]
    MissingIdColumn,

    #[error("story data contains no pages")]
    NoPages,

    #[error("start page `{0}` does not exist")]
    UnknownStart(String),

    #[error("story JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while reading settings from disk
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pluggable roll source failed to produce a value
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OutcomeError {
    #[error("roll source failed: {0}")]
    Source(String),

    #[error("roll source returned a non-finite value ({0})")]
    NonFinite(f64),
}

/// A player action the engine refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("no story content is loaded")]
    NotReady,

    #[error("no choice selected")]
    NoChoiceSelected,

    #[error("choice {index} is out of range ({count} available)")]
    ChoiceOutOfRange { index: usize, count: usize },

    #[error("the story has ended")]
    Finished,

    #[error("a page transition is already pending")]
    TransitionPending,

    #[error("no encounter is active")]
    NoEncounter,
}

impl Rejection {
    /// Text suitable for showing to the player
    pub fn prompt(&self) -> &'static str {
        match self {
            Rejection::NotReady => "The story is still loading.",
            Rejection::NoChoiceSelected | Rejection::ChoiceOutOfRange { .. } => {
                "Choose an option first."
            }
            Rejection::Finished => "The story has ended.",
            Rejection::TransitionPending => "Hold on...",
            Rejection::NoEncounter => "There is nothing to flee from.",
        }
    }
}
