//! Game context
//!
//! One `Game` owns everything a running story needs: the tray and disc, the
//! drag controller, the roll resolver, preparation toggles and the page
//! engine. Hosts drive it with pointer events and one `tick` per frame; every
//! mutation happens inside those calls, so no locking is needed.

use glam::Vec2;

use crate::encounter::EncounterRules;
use crate::error::{Rejection, StoryError};
use crate::events::{EngineEvent, EventSink, NoopSink};
use crate::outcome::{OutcomeSource, Resolver, Roll, RollContext};
use crate::renderer::{DiscView, PageView, Renderer, Snapshot, TrayView};
use crate::settings::Settings;
use crate::sim::{Disc, DragController, Tray};
use crate::stats::{PlayerStats, Preparation};
use crate::story::{EngineRules, LoadOptions, Resolution, StoryData, StoryEngine};

pub struct Game {
    settings: Settings,
    tray: Tray,
    disc: Disc,
    drag: DragController,
    story: StoryEngine,
    resolver: Resolver,
    preparation: Preparation,
    sink: Box<dyn EventSink>,
    renderer: Option<Box<dyn Renderer>>,
    tick: u64,
    host_time_ms: f64,
    /// Ticks left before a pending transition applies
    countdown: Option<u32>,
    prompt: Option<String>,
}

impl Game {
    pub fn new(mut settings: Settings) -> Self {
        settings.validate();
        let rules = &settings.rules;
        let engine_rules = EngineRules {
            bonus_policy: rules.bonus_policy,
            encounter: EncounterRules {
                player_base_hp: rules.player_base_hp,
                player_base_armor: rules.player_base_armor,
                enemy_attack_bonus: rules.enemy_attack_bonus,
                player_damage: rules.player_damage,
            },
        };

        let tray = Tray::default().with_padding(settings.physics.tray_padding);
        let mut disc = Disc::new(settings.physics.disc_radius);
        disc.center_in(&tray);

        Self {
            tray,
            disc,
            drag: DragController::new(settings.drag),
            story: StoryEngine::new(engine_rules, rules.seed),
            resolver: Resolver::kinematic(rules.seed, rules.thresholds),
            preparation: Preparation::basic(),
            sink: Box::new(NoopSink),
            renderer: None,
            tick: 0,
            host_time_ms: 0.0,
            countdown: None,
            prompt: None,
            settings,
        }
    }

    pub fn with_outcome_source(mut self, source: Box<dyn OutcomeSource>) -> Self {
        self.resolver.set_source(source);
        self
    }

    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn set_outcome_source(&mut self, source: Box<dyn OutcomeSource>) {
        self.resolver.set_source(source);
    }

    pub fn set_event_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = sink;
    }

    pub fn set_renderer(&mut self, renderer: Option<Box<dyn Renderer>>) {
        self.renderer = renderer;
    }

    pub fn set_preparation(&mut self, preparation: Preparation) {
        self.preparation = preparation;
    }

    /// Host clock, stamped onto emitted events
    pub fn set_host_time(&mut self, ms: f64) {
        if ms.is_finite() {
            self.host_time_ms = ms;
        }
    }

    // ========================================================================
    // CONTENT
    // ========================================================================

    pub fn load_story(&mut self, story: StoryData) {
        let stats = self.preparation.stats();
        self.story.load(story, &stats);
        self.countdown = None;
        self.prompt = None;
        self.disc.face = None;
    }

    pub fn load_story_csv(&mut self, text: &str) -> Result<(), StoryError> {
        let result = StoryData::from_csv(text, &self.load_options());
        self.install(result)
    }

    pub fn load_story_json(&mut self, text: &str) -> Result<(), StoryError> {
        let result = StoryData::from_json(text, &self.load_options());
        self.install(result)
    }

    /// Start the loaded story over from its start page
    pub fn restart(&mut self) -> bool {
        let Some(story) = self.story.story().cloned() else {
            return false;
        };
        self.load_story(story);
        true
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions::with_max_choices(self.settings.rules.max_choices)
    }

    fn install(&mut self, result: Result<StoryData, StoryError>) -> Result<(), StoryError> {
        match result {
            Ok(story) => {
                self.load_story(story);
                Ok(())
            }
            Err(e) => {
                self.story.unload();
                self.story.diagnose(format!("story failed to load: {}", e));
                Err(e)
            }
        }
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    /// Resize or move the tray. The disc is pulled back inside.
    pub fn set_tray(&mut self, tray: Tray) {
        if !tray.fits(self.disc.radius) {
            log::warn!(
                "Tray {}x{} is too small for a disc of radius {}",
                tray.size.x,
                tray.size.y,
                self.disc.radius
            );
        }
        self.tray = tray;
        self.disc.pos = tray.clamp_center(self.disc.pos, self.disc.radius);
    }

    /// Grab the disc. Nothing can be grabbed until a story is loaded.
    pub fn pointer_down(&mut self, point: Vec2) -> bool {
        if !self.story.is_ready() {
            self.prompt = Some(Rejection::NotReady.prompt().to_string());
            return false;
        }
        self.drag.pointer_down(&mut self.disc, &self.tray, point)
    }

    pub fn pointer_move(&mut self, point: Vec2) {
        self.drag.pointer_move(&mut self.disc, &self.tray, point);
    }

    /// Release the disc. If the release flicks it, the roll is resolved
    /// immediately, exactly once.
    pub fn pointer_up(&mut self) -> Option<Resolution> {
        let release = self.drag.pointer_up(&mut self.disc)?;
        log::debug!(
            "Released at speed {:.2}, spin {:.3} (moved: {})",
            release.vel.length(),
            release.spin,
            release.moved
        );
        self.roll()
    }

    pub fn select_choice(&mut self, index: usize) -> Result<(), Rejection> {
        let result = self.story.select_choice(index);
        self.set_prompt(&result);
        result
    }

    pub fn toggle_preparation(&mut self, index: usize) -> Option<bool> {
        self.preparation.toggle(index)
    }

    pub fn flee(&mut self) -> Result<(), Rejection> {
        let result = self.story.flee();
        self.set_prompt(&result);
        result
    }

    fn set_prompt(&mut self, result: &Result<(), Rejection>) {
        self.prompt = result.as_ref().err().map(|r| r.prompt().to_string());
    }

    // ========================================================================
    // SIMULATION
    // ========================================================================

    /// Advance one frame: step the disc and count down a pending transition.
    /// Without a story the game idles.
    pub fn tick(&mut self) {
        if !self.story.is_ready() {
            return;
        }
        self.tick += 1;
        self.disc.tick(&self.tray, &self.settings.physics);

        if let Some(left) = self.countdown {
            if left <= 1 {
                self.advance_now();
            } else {
                self.countdown = Some(left - 1);
            }
        }
    }

    /// Apply a pending transition without waiting. Returns the page entered.
    pub fn advance_now(&mut self) -> Option<String> {
        self.countdown = None;
        let stats = self.preparation.stats();
        let id = self.story.advance(&stats)?;
        self.disc.face = None;
        self.prompt = None;
        Some(id)
    }

    fn roll(&mut self) -> Option<Resolution> {
        if let Err(rejection) = self.story.check_roll() {
            self.prompt = Some(rejection.prompt().to_string());
            return None;
        }

        let stats = self.preparation.stats();
        let ctx = RollContext {
            disc: &self.disc,
            stats: &stats,
            tick: self.tick,
            choice_index: self.story.selected_choice(),
        };
        let roll = self.resolver.roll_face(&ctx);
        self.disc.face = Some(roll.face);

        match self.story.resolve_roll(roll.face, &stats, &self.resolver) {
            Ok(resolution) => {
                self.prompt = None;
                self.emit(&resolution, roll);
                if self.story.pending_transition().is_some() {
                    match self.settings.rules.transition_delay_ticks {
                        0 => {
                            self.advance_now();
                        }
                        delay => self.countdown = Some(delay),
                    }
                }
                Some(resolution)
            }
            Err(rejection) => {
                self.prompt = Some(rejection.prompt().to_string());
                None
            }
        }
    }

    fn emit(&mut self, resolution: &Resolution, roll: Roll) {
        let event = match resolution {
            Resolution::Choice(result) => EngineEvent::Selection {
                page_id: result.page_id.clone(),
                choice_index: result.choice_index,
                raw_roll: result.raw_roll,
                bonus: result.bonus,
                total: result.total,
                tier: result.tier,
                fallback: roll.fallback,
                tick: self.tick,
                ts: self.host_time_ms,
            },
            Resolution::Round { page_id, report } => EngineEvent::Fight {
                page_id: page_id.clone(),
                round: report.round,
                attack_total: report.attack_total,
                hit: report.hit,
                enemy_hp: report.enemy_hp,
                player_hp: report.player_hp,
                status: report.status,
                tick: self.tick,
                ts: self.host_time_ms,
            },
        };
        self.sink.emit(&event);
    }

    // ========================================================================
    // OUTPUT
    // ========================================================================

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            tray: TrayView::from(&self.tray),
            disc: DiscView::from(&self.disc),
            phase: self.story.phase().clone(),
            page: self
                .story
                .current_page()
                .map(|page| PageView::new(page, self.story.selected_choice())),
            encounter: self.story.encounter().cloned(),
            stats: self.preparation.stats(),
            preparation: self.preparation.options.clone(),
            last_result: self.story.last_result().map(str::to_string),
            prompt: self.prompt.clone(),
            ending: self.story.ending(),
        }
    }

    /// Hand a snapshot to the installed renderer, if any
    pub fn render(&mut self) {
        if self.renderer.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.draw(&snapshot);
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tray(&self) -> &Tray {
        &self.tray
    }

    pub fn disc(&self) -> &Disc {
        &self.disc
    }

    pub fn story(&self) -> &StoryEngine {
        &self.story
    }

    pub fn preparation(&self) -> &Preparation {
        &self.preparation
    }

    pub fn stats(&self) -> PlayerStats {
        self.preparation.stats()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_ready(&self) -> bool {
        self.story.is_ready()
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
