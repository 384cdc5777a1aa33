//! Page state machine
//!
//! The engine holds a pointer into an immutable [`StoryData`] plus the
//! transient state of the current page: the selected choice, an active
//! encounter, and whether a transition is waiting to be applied. Transitions
//! are never applied by a timer; the caller decides when to [`advance`].
//!
//! [`advance`]: StoryEngine::advance

use serde::{Deserialize, Serialize};

use super::loader::StoryData;
use super::page::{Destination, Page};
use crate::encounter::{Dice, Encounter, EncounterRules, EncounterStatus, RoundReport};
use crate::error::Rejection;
use crate::outcome::{Resolver, Tier};
use crate::stats::{BonusPolicy, PlayerStats};

/// How the story ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ending {
    /// A choice led to the terminal sentinel
    Finished,
    /// The player lost a fight
    Defeated,
    /// The story reached a page with nothing left to do
    DeadEnd,
}

/// Where the engine is in the page cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No story loaded
    Idle,
    /// On a page, waiting for a choice (or a fight roll)
    AtPage,
    /// A choice is selected and waiting for the die
    ChoiceSelected(usize),
    /// A roll resolved into a move to another page that has not happened yet
    TransitionPending { to: String },
    /// No further choices are accepted
    Terminal(Ending),
}

/// Rule knobs the engine reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineRules {
    pub bonus_policy: BonusPolicy,
    pub encounter: EncounterRules,
}

/// What a resolved choice does next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextStep {
    Transition(String),
    End,
    Stay,
    /// Destination names a page that does not exist; the engine stayed put
    Dangling(String),
}

/// A roll applied to the selected choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceResult {
    pub page_id: String,
    pub choice_index: usize,
    pub raw_roll: u8,
    pub bonus: i32,
    pub total: i32,
    pub tier: Tier,
    pub text: String,
    pub next: NextStep,
}

/// What a roll did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Choice(ChoiceResult),
    Round { page_id: String, report: RoundReport },
}

pub struct StoryEngine {
    story: Option<StoryData>,
    current: String,
    phase: Phase,
    encounter: Option<Encounter>,
    last_result: Option<String>,
    diagnostics: Vec<String>,
    pub rules: EngineRules,
    dice: Dice,
}

impl StoryEngine {
    pub fn new(rules: EngineRules, seed: u64) -> Self {
        Self {
            story: None,
            current: String::new(),
            phase: Phase::Idle,
            encounter: None,
            last_result: None,
            diagnostics: Vec::new(),
            rules,
            dice: Dice::new(seed),
        }
    }

    /// Install a story and enter its start page
    pub fn load(&mut self, story: StoryData, stats: &PlayerStats) {
        self.diagnostics = story.diagnostics.clone();
        let start = story.start_id.clone();
        self.story = Some(story);
        self.last_result = None;
        self.enter_page(&start, stats);
    }

    /// Drop the story and go idle
    pub fn unload(&mut self) {
        self.story = None;
        self.current.clear();
        self.phase = Phase::Idle;
        self.encounter = None;
        self.last_result = None;
    }

    /// Record a diagnostic without changing state
    pub fn diagnose(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.diagnostics.push(message);
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.story.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Terminal(_))
    }

    pub fn ending(&self) -> Option<Ending> {
        match self.phase {
            Phase::Terminal(ending) => Some(ending),
            _ => None,
        }
    }

    pub fn story(&self) -> Option<&StoryData> {
        self.story.as_ref()
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.story.as_ref()?.page(&self.current)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.story.as_ref().map(|_| self.current.as_str())
    }

    pub fn selected_choice(&self) -> Option<usize> {
        match self.phase {
            Phase::ChoiceSelected(index) => Some(index),
            _ => None,
        }
    }

    pub fn pending_transition(&self) -> Option<&str> {
        match &self.phase {
            Phase::TransitionPending { to } => Some(to),
            _ => None,
        }
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    fn check_open(&self) -> Result<(), Rejection> {
        match self.phase {
            Phase::Idle => Err(Rejection::NotReady),
            Phase::Terminal(_) => Err(Rejection::Finished),
            Phase::TransitionPending { .. } => Err(Rejection::TransitionPending),
            Phase::AtPage | Phase::ChoiceSelected(_) => Ok(()),
        }
    }

    /// Whether a roll would be consumed right now
    pub fn check_roll(&self) -> Result<(), Rejection> {
        self.check_open()?;
        if self.encounter.as_ref().is_some_and(Encounter::is_active)
            || self.selected_choice().is_some()
        {
            Ok(())
        } else {
            Err(Rejection::NoChoiceSelected)
        }
    }

    /// Pick a choice on the current page. An invalid index leaves the
    /// current selection untouched.
    pub fn select_choice(&mut self, index: usize) -> Result<(), Rejection> {
        self.check_open()?;
        let count = self.current_page().map_or(0, |p| p.choices.len());
        if index >= count {
            return Err(Rejection::ChoiceOutOfRange { index, count });
        }
        self.phase = Phase::ChoiceSelected(index);
        Ok(())
    }

    /// Apply a die roll: a fight round if an encounter is active, otherwise
    /// the selected choice.
    pub fn resolve_roll(
        &mut self,
        face: u8,
        stats: &PlayerStats,
        resolver: &Resolver,
    ) -> Result<Resolution, Rejection> {
        self.check_roll()?;
        if self.encounter.is_some() {
            return self.resolve_round(face, stats);
        }

        let index = self.selected_choice().ok_or(Rejection::NoChoiceSelected)?;
        let choice = self
            .current_page()
            .and_then(|p| p.choices.get(index))
            .cloned()
            .ok_or(Rejection::NoChoiceSelected)?;

        let bonus = self.rules.bonus_policy.bonus(stats, choice.stat);
        let (total, tier) = resolver.classify(face, bonus);
        let text = choice
            .outcome
            .clone()
            .unwrap_or_else(|| default_outcome(tier).to_string());
        self.last_result = Some(format!(
            "{} ({} + {} = {}). {}",
            tier, face, bonus, total, text
        ));
        log::debug!(
            "Page `{}` choice {}: {} + {} = {} ({})",
            self.current,
            index,
            face,
            bonus,
            total,
            tier
        );

        let next = match choice.next {
            Destination::End => {
                self.phase = Phase::Terminal(Ending::Finished);
                log::info!("Story finished from page `{}`", self.current);
                NextStep::End
            }
            Destination::Stay => {
                self.phase = Phase::AtPage;
                NextStep::Stay
            }
            Destination::Page(to) if self.has_page(&to) => {
                self.phase = Phase::TransitionPending { to: to.clone() };
                NextStep::Transition(to)
            }
            Destination::Page(to) => {
                self.diagnose(format!(
                    "choice {} on page `{}` points to missing page `{}`",
                    index + 1,
                    self.current,
                    to
                ));
                self.phase = Phase::AtPage;
                NextStep::Dangling(to)
            }
        };

        Ok(Resolution::Choice(ChoiceResult {
            page_id: self.current.clone(),
            choice_index: index,
            raw_roll: face,
            bonus,
            total,
            tier,
            text,
            next,
        }))
    }

    fn resolve_round(&mut self, face: u8, stats: &PlayerStats) -> Result<Resolution, Rejection> {
        let encounter = self.encounter.as_mut().ok_or(Rejection::NoEncounter)?;
        let report =
            encounter.resolve_round(face, stats.body, &self.rules.encounter, &mut self.dice)?;
        self.last_result = Some(report.narrative.clone());

        match report.status {
            EncounterStatus::Won => {
                log::info!("Encounter on `{}` won in {} rounds", self.current, report.round);
                self.encounter = None;
                self.settle_after_encounter();
            }
            EncounterStatus::Lost => {
                log::info!("Encounter on `{}` lost", self.current);
                self.encounter = None;
                self.phase = Phase::Terminal(Ending::Defeated);
            }
            EncounterStatus::Active | EncounterStatus::Fled => {}
        }

        Ok(Resolution::Round {
            page_id: self.current.clone(),
            report,
        })
    }

    /// Abandon the active encounter and return to the page's choices
    pub fn flee(&mut self) -> Result<(), Rejection> {
        self.check_open()?;
        let encounter = self.encounter.as_mut().ok_or(Rejection::NoEncounter)?;
        encounter.flee()?;
        self.last_result = Some(format!("You flee from the {}.", encounter.enemy));
        log::info!("Fled encounter on `{}`", self.current);
        self.encounter = None;
        self.settle_after_encounter();
        Ok(())
    }

    /// Apply a pending transition. Returns the id of the page entered.
    pub fn advance(&mut self, stats: &PlayerStats) -> Option<String> {
        let Phase::TransitionPending { to } = &self.phase else {
            return None;
        };
        let to = to.clone();
        self.enter_page(&to, stats);
        Some(to)
    }

    fn has_page(&self, id: &str) -> bool {
        self.story.as_ref().is_some_and(|s| s.page(id).is_some())
    }

    fn settle_after_encounter(&mut self) {
        let no_choices = self.current_page().is_none_or(|p| p.choices.is_empty());
        self.phase = if no_choices {
            Phase::Terminal(Ending::DeadEnd)
        } else {
            Phase::AtPage
        };
    }

    fn enter_page(&mut self, id: &str, stats: &PlayerStats) {
        let Some(page) = self.story.as_ref().and_then(|s| s.page(id)) else {
            self.diagnose(format!("cannot enter missing page `{}`", id));
            return;
        };
        let terminal = page.is_terminal();
        let encounter = page
            .encounter
            .as_ref()
            .map(|tpl| Encounter::from_template(tpl, &self.rules.encounter, stats.body));

        self.current = id.to_string();
        self.last_result = None;
        if let Some(fight) = &encounter {
            log::info!(
                "Entered `{}`: {} attacks ({} HP, AC {})",
                id,
                fight.enemy,
                fight.enemy_hp,
                fight.enemy_armor
            );
        } else {
            log::info!("Entered `{}`", id);
        }
        self.encounter = encounter;
        self.phase = if terminal {
            Phase::Terminal(Ending::DeadEnd)
        } else {
            Phase::AtPage
        };
    }
}

fn default_outcome(tier: Tier) -> &'static str {
    match tier {
        Tier::CriticalSuccess => "Everything goes your way.",
        Tier::Success => "It works.",
        Tier::Failure => "It does not go as planned.",
        Tier::CriticalFailure => "It goes badly wrong.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::{DamageSpec, EncounterTemplate};
    use crate::outcome::Thresholds;
    use crate::story::page::Choice;

    fn resolver() -> Resolver {
        Resolver::kinematic(1, Thresholds::Standard)
    }

    fn story() -> StoryData {
        StoryData::from_pages([
            Page::new("start", "The Fork")
                .with_flavor("Two roads.")
                .with_choice(Choice::new("Go left", "cave"))
                .with_choice(Choice::new("Go right", "END")),
            Page::new("cave", "The Cave")
                .with_choice(Choice::new("Back out", "start"))
                .with_encounter(EncounterTemplate::new("Rat", 4, 8, DamageSpec::new(1, 4, 0))),
            Page::new("hall", "Hall")
                .with_choice(Choice::new("Wait", ""))
                .with_choice(Choice::new("Climb", "attic"))
                .with_choice(Choice::new("Sleep", "bed")),
            Page::new("bed", "Bed"),
        ])
        .unwrap()
    }

    fn engine() -> StoryEngine {
        let mut engine = StoryEngine::new(EngineRules::default(), 7);
        engine.load(story(), &PlayerStats::default());
        engine
    }

    fn goto(engine: &mut StoryEngine, id: &str) {
        engine.phase = Phase::TransitionPending { to: id.into() };
        engine.advance(&PlayerStats::default());
    }

    #[test]
    fn test_idle_without_story() {
        let mut engine = StoryEngine::new(EngineRules::default(), 1);
        assert_eq!(engine.phase(), &Phase::Idle);
        assert!(engine.current_page().is_none());
        assert_eq!(engine.select_choice(0), Err(Rejection::NotReady));
        assert_eq!(
            engine.resolve_roll(10, &PlayerStats::default(), &resolver()),
            Err(Rejection::NotReady)
        );
        assert_eq!(engine.advance(&PlayerStats::default()), None);
    }

    #[test]
    fn test_terminal_choice() {
        let mut engine = engine();
        assert_eq!(engine.current_id(), Some("start"));
        engine.select_choice(1).unwrap();
        let resolution = engine
            .resolve_roll(3, &PlayerStats::default(), &resolver())
            .unwrap();
        let Resolution::Choice(result) = resolution else {
            panic!("expected a choice result");
        };
        assert_eq!(result.next, NextStep::End);
        assert_eq!(engine.ending(), Some(Ending::Finished));
        assert_eq!(engine.select_choice(0), Err(Rejection::Finished));
        assert_eq!(
            engine.resolve_roll(20, &PlayerStats::default(), &resolver()),
            Err(Rejection::Finished)
        );
    }

    #[test]
    fn test_transition_is_pending_until_advanced() {
        let mut engine = engine();
        let stats = PlayerStats::default();
        engine.select_choice(0).unwrap();
        let resolution = engine.resolve_roll(12, &stats, &resolver()).unwrap();
        let Resolution::Choice(result) = resolution else {
            panic!("expected a choice result");
        };
        assert_eq!(result.tier, Tier::Success);
        assert_eq!(result.next, NextStep::Transition("cave".into()));
        assert_eq!(engine.current_id(), Some("start"));
        assert_eq!(engine.pending_transition(), Some("cave"));
        assert!(engine.last_result().is_some());
        assert_eq!(engine.select_choice(0), Err(Rejection::TransitionPending));

        assert_eq!(engine.advance(&stats), Some("cave".to_string()));
        assert_eq!(engine.current_id(), Some("cave"));
        assert_eq!(engine.selected_choice(), None);
        assert_eq!(engine.last_result(), None);
        assert_eq!(engine.advance(&stats), None);
    }

    #[test]
    fn test_encounter_instantiated_on_entry() {
        let mut engine = engine();
        let stats = PlayerStats {
            body: 3,
            ..Default::default()
        };
        engine.phase = Phase::TransitionPending { to: "cave".into() };
        engine.advance(&stats);
        let fight = engine.encounter().unwrap();
        assert_eq!(fight.enemy, "Rat");
        assert_eq!(fight.enemy_hp, 4);
        assert_eq!(fight.player_hp, 15);
    }

    #[test]
    fn test_rat_round() {
        let mut engine = engine();
        goto(&mut engine, "cave");
        let resolution = engine
            .resolve_roll(15, &PlayerStats::default(), &resolver())
            .unwrap();
        let Resolution::Round { page_id, report } = resolution else {
            panic!("expected a fight round");
        };
        assert_eq!(page_id, "cave");
        assert_eq!(report.attack_total, 15);
        assert!(report.hit);
        assert!((1..=4).contains(&report.damage));
        if report.enemy_hp <= 0 {
            assert_eq!(report.status, EncounterStatus::Won);
            assert!(engine.encounter().is_none());
        }
    }

    #[test]
    fn test_encounter_won_stays_on_page() {
        let mut engine = engine();
        goto(&mut engine, "cave");
        let stats = PlayerStats {
            body: 5,
            ..Default::default()
        };
        let resolution = engine.resolve_roll(15, &stats, &resolver()).unwrap();
        let Resolution::Round { report, .. } = resolution else {
            panic!("expected a fight round");
        };
        assert_eq!(report.status, EncounterStatus::Won);
        assert!(engine.encounter().is_none());
        assert_eq!(engine.current_id(), Some("cave"));
        assert_eq!(engine.phase(), &Phase::AtPage);
        assert!(engine.last_result().unwrap().contains("falls"));

        assert_eq!(
            engine.resolve_roll(15, &stats, &resolver()),
            Err(Rejection::NoChoiceSelected)
        );
        engine.select_choice(0).unwrap();
    }

    #[test]
    fn test_encounter_lost_is_terminal() {
        let rules = EngineRules {
            encounter: EncounterRules {
                enemy_attack_bonus: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        let ogre = Page::new("den", "Den")
            .with_choice(Choice::new("Run", "END"))
            .with_encounter(EncounterTemplate::new("Ogre", 500, 30, DamageSpec::new(1, 1, 4)));
        let mut engine = StoryEngine::new(rules, 3);
        engine.load(StoryData::from_pages([ogre]).unwrap(), &PlayerStats::default());

        let stats = PlayerStats::default();
        let mut rounds = 0;
        while engine.encounter().is_some() && rounds < 10 {
            engine.resolve_roll(1, &stats, &resolver()).unwrap();
            rounds += 1;
        }
        assert_eq!(rounds, 3);
        assert_eq!(engine.ending(), Some(Ending::Defeated));
        assert_eq!(engine.select_choice(0), Err(Rejection::Finished));
    }

    #[test]
    fn test_flee() {
        let mut engine = engine();
        assert_eq!(engine.flee(), Err(Rejection::NoEncounter));
        goto(&mut engine, "cave");
        engine.flee().unwrap();
        assert!(engine.encounter().is_none());
        assert_eq!(engine.phase(), &Phase::AtPage);
        assert!(engine.last_result().unwrap().contains("Rat"));
    }

    #[test]
    fn test_revisit_respawns_encounter() {
        let mut engine = engine();
        goto(&mut engine, "cave");
        engine.flee().unwrap();
        goto(&mut engine, "start");
        goto(&mut engine, "cave");
        assert_eq!(engine.encounter().map(|e| e.enemy_hp), Some(4));
    }

    #[test]
    fn test_out_of_range_selection() {
        let mut engine = engine();
        engine.select_choice(0).unwrap();
        assert_eq!(
            engine.select_choice(5),
            Err(Rejection::ChoiceOutOfRange { index: 5, count: 2 })
        );
        assert_eq!(engine.selected_choice(), Some(0));

        let mut fresh = self::engine();
        assert!(fresh.select_choice(5).is_err());
        assert_eq!(fresh.selected_choice(), None);
        assert_eq!(
            fresh.resolve_roll(10, &PlayerStats::default(), &resolver()),
            Err(Rejection::NoChoiceSelected)
        );
    }

    #[test]
    fn test_stay_and_dangling_destinations() {
        let mut engine = engine();
        goto(&mut engine, "hall");
        let stats = PlayerStats::default();

        engine.select_choice(0).unwrap();
        let Resolution::Choice(result) = engine.resolve_roll(9, &stats, &resolver()).unwrap() else {
            panic!("expected a choice result");
        };
        assert_eq!(result.next, NextStep::Stay);
        assert_eq!(engine.phase(), &Phase::AtPage);

        let before = engine.diagnostics().len();
        engine.select_choice(1).unwrap();
        let Resolution::Choice(result) = engine.resolve_roll(9, &stats, &resolver()).unwrap() else {
            panic!("expected a choice result");
        };
        assert_eq!(result.next, NextStep::Dangling("attic".into()));
        assert_eq!(engine.current_id(), Some("hall"));
        assert_eq!(engine.selected_choice(), None);
        assert_eq!(engine.diagnostics().len(), before + 1);
    }

    #[test]
    fn test_dead_end_page_is_terminal() {
        let mut engine = engine();
        goto(&mut engine, "bed");
        assert_eq!(engine.ending(), Some(Ending::DeadEnd));
    }

    #[test]
    fn test_choice_stat_bonus_policy() {
        let rules = EngineRules {
            bonus_policy: BonusPolicy::ChoiceStat,
            ..Default::default()
        };
        let page = Page::new("p", "P").with_choice(
            Choice::new("Pray", "END").with_stat(crate::stats::Stat::Spirit),
        );
        let mut engine = StoryEngine::new(rules, 1);
        engine.load(StoryData::from_pages([page]).unwrap(), &PlayerStats::default());
        engine.select_choice(0).unwrap();
        let stats = PlayerStats {
            mind: 5,
            spirit: 2,
            ..Default::default()
        };
        let resolution = engine.resolve_roll(10, &stats, &resolver()).unwrap();
        let Resolution::Choice(result) = resolution else {
            panic!("expected a choice result");
        };
        assert_eq!(result.bonus, 2);
        assert_eq!(result.total, 12);
    }
}
