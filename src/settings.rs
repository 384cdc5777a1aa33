//! Engine settings
//!
//! Physics feel, drag response and game rules. Persisted as JSON: in
//! LocalStorage on the web, or a plain file for the native driver. Every
//! section is `#[serde(default)]` so partial documents are fine.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::encounter::DamageSpec;
use crate::outcome::Thresholds;
use crate::stats::BonusPolicy;

/// Disc motion and wall response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub disc_radius: f32,
    pub tray_padding: f32,
    /// Fraction of the perpendicular velocity kept after a wall bounce
    pub wall_restitution: f32,
    /// Per-tick velocity multiplier
    pub friction: f32,
    /// Below these speeds the disc snaps to rest
    pub rest_linear: f32,
    pub rest_angular: f32,
    /// Spin added on every wall bounce
    pub bounce_spin_base: f32,
    pub bounce_spin_per_speed: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            disc_radius: DISC_RADIUS,
            tray_padding: TRAY_PADDING,
            wall_restitution: 0.93,
            friction: 0.994,
            rest_linear: 0.05,
            rest_angular: 0.012,
            bounce_spin_base: 0.08,
            bounce_spin_per_speed: 0.002,
        }
    }
}

/// Pointer drag response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragTuning {
    /// Pointer delta to linear velocity
    pub velocity_gain: f32,
    /// (dx - dy) to angular velocity
    pub spin_gain: f32,
    /// Extra drag-impulse spin on top of `spin_gain` (0 disables)
    pub impulse_spin_gain: f32,
    /// Flick amplification on release
    pub release_linear: f32,
    pub release_angular: f32,
}

impl Default for DragTuning {
    fn default() -> Self {
        Self {
            velocity_gain: 1.25,
            spin_gain: 0.045,
            impulse_spin_gain: 0.0,
            release_linear: 2.6,
            release_angular: 2.0,
        }
    }
}

/// Story and encounter rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub thresholds: Thresholds,
    pub bonus_policy: BonusPolicy,
    /// Most choices a page may carry; extra choices are dropped at load
    pub max_choices: usize,
    /// Ticks between a resolved roll and the page change
    pub transition_delay_ticks: u32,
    pub player_base_hp: i32,
    pub player_base_armor: i32,
    pub enemy_attack_bonus: i32,
    pub player_damage: DamageSpec,
    /// Seed for every engine-owned RNG
    pub seed: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::Standard,
            bonus_policy: BonusPolicy::SumAll,
            max_choices: 8,
            // 650 ms at 60 Hz
            transition_delay_ticks: TICKS_PER_SECOND * 650 / 1000,
            player_base_hp: 12,
            player_base_armor: 10,
            enemy_attack_bonus: 2,
            player_damage: DamageSpec::new(1, 8, 0),
            seed: 0x5EED_D20,
        }
    }
}

/// All engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub physics: PhysicsTuning,
    pub drag: DragTuning,
    pub rules: RulesConfig,
}

impl Settings {
    /// Parse settings from JSON, then sanitize them
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.validate();
        Ok(settings)
    }

    /// Read settings from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_json_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::error::SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }

    /// Replace nonsensical values with defaults. Returns true if anything changed.
    pub fn validate(&mut self) -> bool {
        let defaults = Settings::default();
        let mut changed = false;
        let mut fix = |name: &str, value: &mut f32, ok: fn(f32) -> bool, default: f32| {
            if !ok(*value) {
                log::warn!("Setting {} = {} is invalid, using {}", name, value, default);
                *value = default;
                changed = true;
            }
        };
        let finite: fn(f32) -> bool = f32::is_finite;
        let non_negative: fn(f32) -> bool = |v| v.is_finite() && v >= 0.0;

        let p = &mut self.physics;
        let d = defaults.physics;
        fix(
            "disc_radius",
            &mut p.disc_radius,
            |v| v.is_finite() && v > 0.0,
            d.disc_radius,
        );
        fix(
            "tray_padding",
            &mut p.tray_padding,
            non_negative,
            d.tray_padding,
        );
        fix(
            "wall_restitution",
            &mut p.wall_restitution,
            |v| (0.0..=1.0).contains(&v),
            d.wall_restitution,
        );
        fix(
            "friction",
            &mut p.friction,
            |v| v > 0.0 && v <= 1.0,
            d.friction,
        );
        fix(
            "rest_linear",
            &mut p.rest_linear,
            non_negative,
            d.rest_linear,
        );
        fix(
            "rest_angular",
            &mut p.rest_angular,
            non_negative,
            d.rest_angular,
        );
        fix(
            "bounce_spin_base",
            &mut p.bounce_spin_base,
            finite,
            d.bounce_spin_base,
        );
        fix(
            "bounce_spin_per_speed",
            &mut p.bounce_spin_per_speed,
            finite,
            d.bounce_spin_per_speed,
        );

        let g = &mut self.drag;
        let d = defaults.drag;
        fix(
            "velocity_gain",
            &mut g.velocity_gain,
            finite,
            d.velocity_gain,
        );
        fix("spin_gain", &mut g.spin_gain, finite, d.spin_gain);
        fix(
            "impulse_spin_gain",
            &mut g.impulse_spin_gain,
            finite,
            d.impulse_spin_gain,
        );
        fix(
            "release_linear",
            &mut g.release_linear,
            finite,
            d.release_linear,
        );
        fix(
            "release_angular",
            &mut g.release_angular,
            finite,
            d.release_angular,
        );

        if self.rules.max_choices == 0 {
            log::warn!(
                "Setting max_choices = 0 is invalid, using {}",
                defaults.rules.max_choices
            );
            self.rules.max_choices = defaults.rules.max_choices;
            changed = true;
        } else if self.rules.max_choices > MAX_CHOICES {
            log::warn!(
                "Setting max_choices = {} is too large, using {}",
                self.rules.max_choices,
                MAX_CHOICES
            );
            self.rules.max_choices = MAX_CHOICES;
            changed = true;
        }
        if self.rules.player_damage.sides == 0 {
            log::warn!("Player damage die has no sides, using {}", defaults.rules.player_damage);
            self.rules.player_damage = defaults.rules.player_damage;
            changed = true;
        }

        changed
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "dice_tale_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = Self::from_json_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s = Settings::from_json_str(r#"{ "physics": { "friction": 0.9 } }"#).unwrap();
        assert_eq!(s.physics.friction, 0.9);
        assert_eq!(s.physics.wall_restitution, 0.93);
        assert_eq!(s.drag, DragTuning::default());
        assert_eq!(s.rules.max_choices, 8);
    }

    #[test]
    fn test_rules_enums_from_json() {
        let s = Settings::from_json_str(
            r#"{ "rules": { "thresholds": "Banded", "bonus_policy": "ChoiceStat", "seed": 7 } }"#,
        )
        .unwrap();
        assert_eq!(s.rules.thresholds, Thresholds::Banded);
        assert_eq!(s.rules.bonus_policy, BonusPolicy::ChoiceStat);
        assert_eq!(s.rules.seed, 7);
    }

    #[test]
    fn test_validate_repairs_bad_values() {
        let mut s = Settings::default();
        s.physics.friction = 1.5;
        s.physics.disc_radius = -3.0;
        s.rules.max_choices = 0;
        assert!(s.validate());
        assert_eq!(s.physics.friction, 0.994);
        assert_eq!(s.physics.disc_radius, DISC_RADIUS);
        assert_eq!(s.rules.max_choices, 8);
        assert!(!s.validate());
    }

    #[test]
    fn test_max_choices_is_capped() {
        let s = Settings::from_json_str(r#"{"rules": {"max_choices": 4000000000}}"#).unwrap();
        assert_eq!(s.rules.max_choices, MAX_CHOICES);
    }

    #[test]
    fn test_json_roundtrip_defaults() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert_eq!(Settings::from_json_str(&json).unwrap(), Settings::default());
    }
}
