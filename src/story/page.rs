//! Story pages and choices

use serde::{Deserialize, Serialize};

use crate::consts::TERMINAL_SENTINEL;
use crate::encounter::EncounterTemplate;
use crate::stats::Stat;

/// Where a choice leads
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Destination {
    /// Another page, by id
    Page(String),
    /// The terminal sentinel: this branch of the story ends
    End,
    /// No destination: resolve the roll but stay on the page
    Stay,
}

impl Destination {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            Destination::Stay
        } else if raw.eq_ignore_ascii_case(TERMINAL_SENTINEL) {
            Destination::End
        } else {
            Destination::Page(raw.to_string())
        }
    }
}

impl From<String> for Destination {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Destination> for String {
    fn from(dest: Destination) -> Self {
        match dest {
            Destination::Page(id) => id,
            Destination::End => TERMINAL_SENTINEL.to_string(),
            Destination::Stay => String::new(),
        }
    }
}

/// One option on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default = "stay")]
    pub next: Destination,
    /// Narrative shown once the roll resolves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    /// Stat this choice leans on, for the per-choice bonus policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<Stat>,
}

fn stay() -> Destination {
    Destination::Stay
}

impl Choice {
    pub fn new(text: impl Into<String>, next: &str) -> Self {
        Self {
            text: text.into(),
            next: Destination::parse(next),
            outcome: None,
            stat: None,
        }
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stat = Some(stat);
        self
    }
}

/// A story page. Pages are immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub flavor: Vec<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<EncounterTemplate>,
}

impl Page {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_flavor(mut self, text: impl Into<String>) -> Self {
        self.flavor.push(text.into());
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_encounter(mut self, encounter: EncounterTemplate) -> Self {
        self.encounter = Some(encounter);
        self
    }

    /// A page with nothing to choose and nothing to fight ends the story
    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty() && self.encounter.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_parse() {
        assert_eq!(Destination::parse("cave"), Destination::Page("cave".into()));
        assert_eq!(Destination::parse(" END "), Destination::End);
        assert_eq!(Destination::parse("end"), Destination::End);
        assert_eq!(Destination::parse("  "), Destination::Stay);
    }

    #[test]
    fn test_page_terminal() {
        let page = Page::new("a", "A");
        assert!(page.is_terminal());
        let page = page.with_choice(Choice::new("Go", "b"));
        assert!(!page.is_terminal());
    }

    #[test]
    fn test_choice_json_shape() {
        let choice: Choice =
            serde_json::from_str(r#"{ "text": "Run", "next": "END", "stat": "Body" }"#).unwrap();
        assert_eq!(choice.next, Destination::End);
        assert_eq!(choice.stat, Some(Stat::Body));
        assert_eq!(choice.outcome, None);

        let choice: Choice = serde_json::from_str(r#"{ "text": "Wait" }"#).unwrap();
        assert_eq!(choice.next, Destination::Stay);
    }
}
