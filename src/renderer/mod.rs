//! Render contract
//!
//! The game never draws. Each frame it can build a read-only [`Snapshot`] and
//! hand it to whatever [`Renderer`] the host installed, if any. Snapshots also
//! serialize to JSON for hosts that draw outside Rust.

pub mod text;

pub use text::TextRenderer;

use serde::Serialize;

use crate::encounter::Encounter;
use crate::sim::{Disc, Tray};
use crate::stats::{PlayerStats, PrepOption};
use crate::story::{Ending, Page, Phase};

/// Draws snapshots
pub trait Renderer {
    fn draw(&mut self, snapshot: &Snapshot);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscView {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub angle: f32,
    pub vx: f32,
    pub vy: f32,
    pub spin: f32,
    pub grabbed: bool,
    pub face: Option<u8>,
}

impl From<&Disc> for DiscView {
    fn from(disc: &Disc) -> Self {
        Self {
            x: disc.pos.x,
            y: disc.pos.y,
            radius: disc.radius,
            angle: disc.angle,
            vx: disc.vel.x,
            vy: disc.vel.y,
            spin: disc.spin,
            grabbed: disc.grabbed,
            face: disc.face,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrayView {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub padding: f32,
}

impl From<&Tray> for TrayView {
    fn from(tray: &Tray) -> Self {
        Self {
            x: tray.origin.x,
            y: tray.origin.y,
            width: tray.size.x,
            height: tray.size.y,
            padding: tray.padding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    /// "A", "B", ...
    pub label: String,
    pub text: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub flavor: Vec<String>,
    pub choices: Vec<ChoiceView>,
}

impl PageView {
    pub fn new(page: &Page, selected: Option<usize>) -> Self {
        Self {
            id: page.id.clone(),
            title: page.title.clone(),
            image: page.image.clone(),
            flavor: page.flavor.clone(),
            choices: page
                .choices
                .iter()
                .enumerate()
                .map(|(i, choice)| ChoiceView {
                    label: choice_label(i),
                    text: choice.text.clone(),
                    selected: selected == Some(i),
                })
                .collect(),
        }
    }
}

/// Letter label for a choice index; falls back to the 1-based number past Z
pub fn choice_label(index: usize) -> String {
    u8::try_from(index)
        .ok()
        .filter(|&i| i < 26)
        .map(|i| char::from(b'A' + i).to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

/// Everything a renderer may draw for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub tray: TrayView,
    pub disc: DiscView,
    pub phase: Phase,
    pub page: Option<PageView>,
    pub encounter: Option<Encounter>,
    pub stats: PlayerStats,
    pub preparation: Vec<PrepOption>,
    pub last_result: Option<String>,
    pub prompt: Option<String>,
    pub ending: Option<Ending>,
}

impl Snapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::warn!("Failed to encode snapshot: {}", e);
            String::from("{}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_labels() {
        assert_eq!(choice_label(0), "A");
        assert_eq!(choice_label(1), "B");
        assert_eq!(choice_label(25), "Z");
        assert_eq!(choice_label(26), "27");
    }

    #[test]
    fn test_page_view_marks_selection() {
        use crate::story::Choice;
        let page = Page::new("p", "P")
            .with_choice(Choice::new("One", "END"))
            .with_choice(Choice::new("Two", "END"));
        let view = PageView::new(&page, Some(1));
        assert!(!view.choices[0].selected);
        assert!(view.choices[1].selected);
        assert_eq!(view.choices[1].label, "B");
    }
}
