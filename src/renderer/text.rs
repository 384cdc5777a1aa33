//! Plain-text renderer
//!
//! Prints the page whenever what a reader would see changes. Disc motion is
//! ignored; only the face it settles on is shown.

use std::io::Write;

use super::{Renderer, Snapshot, choice_label};
use crate::story::Ending;

pub struct TextRenderer<W: Write> {
    out: W,
    last: Option<String>,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Text for one snapshot
    pub fn compose(snapshot: &Snapshot) -> String {
        let mut text = String::new();
        let Some(page) = &snapshot.page else {
            text.push_str("(no story loaded)\n");
            return text;
        };

        text.push_str(&format!("== {} ==\n", page.title));
        for paragraph in &page.flavor {
            text.push_str(paragraph);
            text.push('\n');
        }
        if let Some(fight) = &snapshot.encounter {
            text.push_str(&format!(
                "[{}: {}/{} HP, AC {} | you: {}/{} HP]\n",
                fight.enemy,
                fight.enemy_hp,
                fight.enemy_max_hp,
                fight.enemy_armor,
                fight.player_hp,
                fight.player_max_hp
            ));
        }
        for (i, choice) in page.choices.iter().enumerate() {
            let marker = if choice.selected { '>' } else { ' ' };
            text.push_str(&format!("{} {}. {}\n", marker, choice_label(i), choice.text));
        }
        if let Some(face) = snapshot.disc.face {
            text.push_str(&format!("d20: {}\n", face));
        }
        if let Some(result) = &snapshot.last_result {
            text.push_str(&format!("-> {}\n", result));
        }
        if let Some(prompt) = &snapshot.prompt {
            text.push_str(&format!("! {}\n", prompt));
        }
        match snapshot.ending {
            Some(Ending::Finished) => text.push_str("THE END\n"),
            Some(Ending::Defeated) => text.push_str("You have been defeated.\n"),
            Some(Ending::DeadEnd) => text.push_str("The story stops here.\n"),
            None => {}
        }
        text
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn draw(&mut self, snapshot: &Snapshot) {
        let text = Self::compose(snapshot);
        if self.last.as_deref() == Some(text.as_str()) {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", text) {
            log::warn!("Text renderer write failed: {}", e);
        }
        self.last = Some(text);
    }
}
