//! Browser bindings
//!
//! JavaScript owns the canvas, the animation frame loop and story fetching.
//! It forwards pointer events (already in tray coordinates), calls `tick`
//! once per frame and draws from `snapshot_json`.

use glam::Vec2;
use wasm_bindgen::prelude::*;

use crate::events::{EngineEvent, EventSink, LogSink};
use crate::game::Game;
use crate::settings::Settings;
use crate::sim::Tray;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }
    log::info!("Dice Tale module loaded");
}

/// Calls a JS function with each event as a JSON string
struct ListenerSink {
    callback: js_sys::Function,
}

impl EventSink for ListenerSink {
    fn emit(&mut self, event: &EngineEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to encode event: {}", e);
                return;
            }
        };
        if let Err(e) = self.callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            log::warn!("Event listener threw: {:?}", e);
        }
    }
}

#[wasm_bindgen]
pub struct WebGame {
    game: Game,
}

#[wasm_bindgen]
impl WebGame {
    /// Game with settings from LocalStorage and a clock-derived seed
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebGame {
        let mut settings = Settings::load();
        settings.rules.seed = js_sys::Date::now() as u64;
        log::info!("Game initialized with seed: {}", settings.rules.seed);
        Self::from_settings(settings)
    }

    /// Game with explicit settings JSON. Invalid JSON falls back to defaults.
    pub fn with_settings(json: &str) -> WebGame {
        let settings = Settings::from_json_str(json).unwrap_or_else(|e| {
            log::warn!("Invalid settings JSON ({}), using defaults", e);
            Settings::default()
        });
        Self::from_settings(settings)
    }

    pub fn save_settings(&self) {
        self.game.settings().save();
    }

    /// Load a CSV story. Returns false (and stays idle) on failure.
    pub fn load_csv(&mut self, text: &str) -> bool {
        self.game.load_story_csv(text).is_ok()
    }

    pub fn load_json(&mut self, text: &str) -> bool {
        self.game.load_story_json(text).is_ok()
    }

    pub fn restart(&mut self) -> bool {
        self.game.restart()
    }

    pub fn is_ready(&self) -> bool {
        self.game.is_ready()
    }

    /// Receive every engine event as a JSON string
    pub fn set_event_listener(&mut self, callback: js_sys::Function) {
        self.game.set_event_sink(Box::new(ListenerSink { callback }));
    }

    pub fn set_tray(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let padding = self.game.settings().physics.tray_padding;
        self.game
            .set_tray(Tray::new(x, y, width, height).with_padding(padding));
    }

    pub fn set_time(&mut self, ms: f64) {
        self.game.set_host_time(ms);
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        self.game.pointer_down(Vec2::new(x, y))
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.game.pointer_move(Vec2::new(x, y));
    }

    /// Returns true if the release resolved a roll
    pub fn pointer_up(&mut self) -> bool {
        self.game.pointer_up().is_some()
    }

    pub fn select_choice(&mut self, index: usize) -> bool {
        self.game.select_choice(index).is_ok()
    }

    pub fn toggle_preparation(&mut self, index: usize) -> bool {
        self.game.toggle_preparation(index).unwrap_or(false)
    }

    pub fn flee(&mut self) -> bool {
        self.game.flee().is_ok()
    }

    pub fn tick(&mut self) {
        self.game.tick();
    }

    pub fn advance(&mut self) -> Option<String> {
        self.game.advance_now()
    }

    pub fn snapshot_json(&self) -> String {
        self.game.snapshot().to_json()
    }

    pub fn diagnostics_json(&self) -> String {
        serde_json::to_string(self.game.story().diagnostics()).unwrap_or_else(|_| "[]".into())
    }
}

impl WebGame {
    fn from_settings(settings: Settings) -> WebGame {
        WebGame {
            game: Game::new(settings).with_event_sink(Box::new(LogSink)),
        }
    }
}

impl Default for WebGame {
    fn default() -> Self {
        Self::new()
    }
}
