//! Story data ingestion
//!
//! Stories arrive either as a CSV sheet (one row per page) or as JSON in the
//! same page-map shape. Loading is tolerant: rows without an id are skipped,
//! duplicate ids keep the first row, and every such fault is recorded as a
//! diagnostic rather than failing the load.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::csv::parse_rows;
use super::page::{Choice, Destination, Page};
use crate::consts::MAX_CHOICES;
use crate::encounter::{DamageSpec, EncounterTemplate};
use crate::error::StoryError;
use crate::stats::Stat;
use crate::truthy;

/// Fight column defaults
const DEFAULT_ENEMY: &str = "Enemy";
const DEFAULT_ENEMY_HP: i32 = 8;
const DEFAULT_ENEMY_ARMOR: i32 = 10;
const DEFAULT_ENEMY_DAMAGE: DamageSpec = DamageSpec::new(1, 6, 0);

/// Options controlling how a story is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Choices beyond this many per page are ignored
    pub max_choices: usize,
    /// Start page override
    pub start_id: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_choices: 8,
            start_id: None,
        }
    }
}

impl LoadOptions {
    pub fn with_max_choices(max_choices: usize) -> Self {
        Self {
            max_choices,
            ..Default::default()
        }
    }

    /// `max_choices`, capped at [`MAX_CHOICES`]
    pub fn choice_limit(&self) -> usize {
        self.max_choices.min(MAX_CHOICES)
    }
}

/// A choice pointing at a page that does not exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRef {
    pub page_id: String,
    pub choice_index: usize,
    pub target: String,
}

impl std::fmt::Display for DanglingRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "choice {} on page `{}` points to missing page `{}`",
            self.choice_index + 1,
            self.page_id,
            self.target
        )
    }
}

/// Result of [`StoryData::self_check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfCheck {
    pub start_exists: bool,
    pub start_has_title: bool,
    pub start_has_flavor: bool,
}

impl SelfCheck {
    pub fn passed(&self) -> bool {
        self.start_exists && self.start_has_title && self.start_has_flavor
    }
}

/// An immutable set of pages plus the page the story starts on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryData {
    #[serde(default, alias = "start")]
    pub start_id: String,
    pub pages: BTreeMap<String, Page>,
    /// Tolerated faults found while loading
    #[serde(skip)]
    pub diagnostics: Vec<String>,
}

impl StoryData {
    /// Build a story directly from pages. The first page is the start unless
    /// `start_id` is set afterwards.
    pub fn from_pages(pages: impl IntoIterator<Item = Page>) -> Result<Self, StoryError> {
        let mut story = StoryData::default();
        let mut first = None;
        for page in pages {
            if first.is_none() {
                first = Some(page.id.clone());
            }
            story.insert(page);
        }
        let first = first.ok_or(StoryError::NoPages)?;
        story.start_id = first;
        story.audit();
        Ok(story)
    }

    /// Read a CSV story sheet
    pub fn from_csv(text: &str, options: &LoadOptions) -> Result<Self, StoryError> {
        let mut rows = parse_rows(text)
            .into_iter()
            .filter(|row| row.iter().any(|field| !field.trim().is_empty()));

        let header: Vec<String> = rows
            .next()
            .ok_or(StoryError::Empty)?
            .iter()
            .map(|name| name.trim().to_lowercase())
            .collect();
        let columns = Columns::new(&header);
        if !columns.has("id") {
            return Err(StoryError::MissingIdColumn);
        }

        let mut story = StoryData::default();
        let mut first_id = None;
        let mut marked_start = None;

        for (line, row) in rows.enumerate() {
            let id = columns.get(&row, "id");
            if id.is_empty() {
                story.diagnose(format!("row {} has no id and was skipped", line + 2));
                continue;
            }
            let page = columns.page(&row, id, options.choice_limit());
            if first_id.is_none() {
                first_id = Some(page.id.clone());
            }
            if marked_start.is_none() && truthy(columns.get(&row, "start")) {
                marked_start = Some(page.id.clone());
            }
            story.insert(page);
        }

        let fallback = marked_start.or(first_id).ok_or(StoryError::NoPages)?;
        story.finish(options, fallback)?;
        Ok(story)
    }

    /// Read a JSON story: `{ "start_id": "...", "pages": { "<id>": { ... } } }`
    pub fn from_json(text: &str, options: &LoadOptions) -> Result<Self, StoryError> {
        let mut story: StoryData = serde_json::from_str(text)?;
        let mut diagnostics = Vec::new();

        for (key, page) in story.pages.iter_mut() {
            if page.id.is_empty() {
                page.id = key.clone();
            } else if page.id != *key {
                diagnostics.push(format!(
                    "page keyed `{}` declares id `{}`; using the key",
                    key, page.id
                ));
                page.id = key.clone();
            }
            let limit = options.choice_limit();
            if page.choices.len() > limit {
                diagnostics.push(format!(
                    "page `{}` has {} choices; only the first {} are kept",
                    key,
                    page.choices.len(),
                    limit
                ));
                page.choices.truncate(limit);
            }
        }
        for message in diagnostics {
            story.diagnose(message);
        }

        let fallback = if story.start_id.is_empty() {
            story.pages.keys().next().cloned().ok_or(StoryError::NoPages)?
        } else {
            story.start_id.clone()
        };
        story.finish(options, fallback)?;
        Ok(story)
    }

    /// Read a story file, JSON by extension and CSV otherwise
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(
        path: impl AsRef<std::path::Path>,
        options: &LoadOptions,
    ) -> Result<Self, StoryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text, options)
        } else {
            Self::from_csv(&text, options)
        }
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    pub fn start_page(&self) -> Option<&Page> {
        self.page(&self.start_id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Every choice whose destination names a page that does not exist
    pub fn dangling_references(&self) -> Vec<DanglingRef> {
        let mut dangling = Vec::new();
        for page in self.pages.values() {
            for (index, choice) in page.choices.iter().enumerate() {
                if let Destination::Page(target) = &choice.next {
                    if !self.pages.contains_key(target) {
                        dangling.push(DanglingRef {
                            page_id: page.id.clone(),
                            choice_index: index,
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        dangling
    }

    /// Sanity checks on the start page
    pub fn self_check(&self) -> SelfCheck {
        let start = self.start_page();
        SelfCheck {
            start_exists: start.is_some(),
            start_has_title: start.is_some_and(|p| !p.title.trim().is_empty()),
            start_has_flavor: start.is_some_and(|p| p.flavor.iter().any(|f| !f.trim().is_empty())),
        }
    }

    fn insert(&mut self, page: Page) {
        if self.pages.contains_key(&page.id) {
            self.diagnose(format!("duplicate page id `{}`; keeping the first", page.id));
            return;
        }
        self.pages.insert(page.id.clone(), page);
    }

    fn diagnose(&mut self, message: String) {
        log::warn!("Story: {}", message);
        self.diagnostics.push(message);
    }

    fn finish(&mut self, options: &LoadOptions, fallback: String) -> Result<(), StoryError> {
        if self.pages.is_empty() {
            return Err(StoryError::NoPages);
        }
        let start = options.start_id.clone().unwrap_or(fallback);
        if !self.pages.contains_key(&start) {
            return Err(StoryError::UnknownStart(start));
        }
        self.start_id = start;
        self.audit();
        log::info!(
            "Story loaded: {} pages, starting at `{}`",
            self.pages.len(),
            self.start_id
        );
        Ok(())
    }

    fn audit(&mut self) {
        for dangling in self.dangling_references() {
            self.diagnose(dangling.to_string());
        }
    }
}

/// Header lookup for a CSV sheet
struct Columns {
    index: HashMap<String, usize>,
    flavor: Vec<usize>,
}

impl Columns {
    fn new(header: &[String]) -> Self {
        let mut index = HashMap::new();
        let mut flavor = Vec::new();
        for (i, name) in header.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
            if let Some(n) = name
                .strip_prefix("flavor")
                .and_then(|rest| rest.parse::<u32>().ok())
            {
                flavor.push((n, i));
            }
        }
        flavor.sort_unstable();
        Self {
            index,
            flavor: flavor.into_iter().map(|(_, i)| i).collect(),
        }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn get<'r>(&self, row: &'r [String], name: &str) -> &'r str {
        self.index
            .get(name)
            .and_then(|&i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    fn optional(&self, row: &[String], name: &str) -> Option<String> {
        let value = self.get(row, name);
        (!value.is_empty()).then(|| value.to_string())
    }

    fn page(&self, row: &[String], id: &str, max_choices: usize) -> Page {
        let mut page = Page::new(id, self.get(row, "title"));
        page.image = self.optional(row, "image");
        page.flavor = self
            .flavor
            .iter()
            .filter_map(|&i| row.get(i))
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect();

        for n in 1..=max_choices {
            let text = self.get(row, &format!("choice{}_text", n));
            let next = self.get(row, &format!("choice{}_next", n));
            let outcome = self.optional(row, &format!("choice{}_outcome", n));
            if text.is_empty() && next.is_empty() && outcome.is_none() {
                continue;
            }
            page.choices.push(Choice {
                text: text.to_string(),
                next: Destination::parse(next),
                outcome,
                stat: Stat::parse(self.get(row, &format!("choice{}_stat", n))),
            });
        }

        page.encounter = self.encounter(row);
        page
    }

    fn encounter(&self, row: &[String]) -> Option<EncounterTemplate> {
        let enemy = self.get(row, "fight_enemy");
        let hp = self.get(row, "fight_hp");
        if enemy.is_empty() && hp.is_empty() {
            return None;
        }
        let ac = self.get(row, "fight_ac");
        let dmg = self.get(row, "fight_dmg");
        Some(EncounterTemplate::new(
            if enemy.is_empty() { DEFAULT_ENEMY } else { enemy },
            hp.parse().unwrap_or(DEFAULT_ENEMY_HP),
            ac.parse().unwrap_or(DEFAULT_ENEMY_ARMOR),
            if dmg.is_empty() {
                DEFAULT_ENEMY_DAMAGE
            } else {
                DamageSpec::parse_lenient(dmg)
            },
        ))
    }
}
