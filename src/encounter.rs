//! Encounters
//!
//! A fight is a small two-party loop nested inside a page: the player attacks
//! with the die, then a surviving enemy counter-attacks automatically.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::DIE_FACES;
use crate::error::Rejection;

/// Upper bound on dice rolled for a single damage expression
const MAX_DAMAGE_DICE: u32 = 100;

/// A damage expression: `dice` rolls of a `sides`-sided die plus `bonus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DamageSpec {
    pub dice: u32,
    pub sides: u32,
    pub bonus: i32,
}

impl Default for DamageSpec {
    fn default() -> Self {
        Self::new(1, 4, 0)
    }
}

impl DamageSpec {
    pub const fn new(dice: u32, sides: u32, bonus: i32) -> Self {
        Self { dice, sides, bonus }
    }

    /// Parse `NdS`, `NdS+B`, `NdS-B` or a bare integer `B` (read as `1d1+B`).
    ///
    /// Whitespace around the parts and the case of `d` are ignored.
    pub fn parse(expr: &str) -> Option<Self> {
        let s: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        if s.is_empty() {
            return None;
        }

        let Some((count, rest)) = s.split_once(['d', 'D']) else {
            let flat = s.parse::<i32>().ok()?;
            return Some(Self::new(1, 1, flat));
        };

        let (sides, bonus) = match rest.find(['+', '-']) {
            Some(i) => {
                let (sides, bonus) = rest.split_at(i);
                let magnitude = bonus[1..].parse::<i32>().ok()?;
                let sign = if bonus.starts_with('-') { -1 } else { 1 };
                (sides, sign * magnitude)
            }
            None => (rest, 0),
        };

        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !digits(count) || !digits(sides) {
            return None;
        }
        Some(Self::new(count.parse().ok()?, sides.parse().ok()?, bonus))
    }

    /// Parse with the story-data fallback: empty or unreadable means `1d4`
    pub fn parse_lenient(expr: &str) -> Self {
        Self::parse(expr).unwrap_or_default()
    }

    /// Smallest possible result
    pub fn min(&self) -> i32 {
        let faces = if self.sides == 0 { 0 } else { self.dice.min(MAX_DAMAGE_DICE) };
        faces as i32 + self.bonus
    }

    /// Largest possible result
    pub fn max(&self) -> i32 {
        let dice = self.dice.min(MAX_DAMAGE_DICE) as i64;
        let max = dice * self.sides as i64 + self.bonus as i64;
        max.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}

impl std::fmt::Display for DamageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d{}", self.dice, self.sides)?;
        match self.bonus {
            0 => Ok(()),
            b if b > 0 => write!(f, "+{}", b),
            b => write!(f, "{}", b),
        }
    }
}

impl From<DamageSpec> for String {
    fn from(spec: DamageSpec) -> Self {
        spec.to_string()
    }
}

impl TryFrom<String> for DamageSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid damage expression `{}`", value))
    }
}

/// Seeded dice for encounter rolls
#[derive(Debug, Clone)]
pub struct Dice {
    rng: Pcg32,
}

impl Dice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn d20(&mut self) -> u8 {
        self.rng.random_range(1..=DIE_FACES)
    }

    /// Sum of `dice` uniform rolls in 1..=sides, plus the flat bonus
    pub fn roll(&mut self, spec: &DamageSpec) -> i32 {
        let mut total = spec.bonus;
        if spec.sides > 0 {
            for _ in 0..spec.dice.min(MAX_DAMAGE_DICE) {
                let face = self.rng.random_range(1..=spec.sides);
                total = total.saturating_add(face.min(i32::MAX as u32) as i32);
            }
        }
        total
    }
}

/// Data describing the enemy a page spawns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterTemplate {
    pub enemy: String,
    pub hp: i32,
    /// Armor class the player's attack total must meet
    pub armor: i32,
    #[serde(default)]
    pub damage: DamageSpec,
}

impl EncounterTemplate {
    pub fn new(enemy: impl Into<String>, hp: i32, armor: i32, damage: DamageSpec) -> Self {
        Self {
            enemy: enemy.into(),
            hp,
            armor,
            damage,
        }
    }
}

/// Rule numbers shared by every encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncounterRules {
    pub player_base_hp: i32,
    pub player_base_armor: i32,
    pub enemy_attack_bonus: i32,
    pub player_damage: DamageSpec,
}

impl Default for EncounterRules {
    fn default() -> Self {
        Self {
            player_base_hp: 12,
            player_base_armor: 10,
            enemy_attack_bonus: 2,
            player_damage: DamageSpec::new(1, 8, 0),
        }
    }
}

/// Where a fight stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterStatus {
    Active,
    Won,
    Lost,
    Fled,
}

impl EncounterStatus {
    pub fn is_over(&self) -> bool {
        *self != EncounterStatus::Active
    }
}

/// The enemy's answer to a player attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterAttack {
    pub roll: u8,
    pub total: i32,
    pub armor: i32,
    pub hit: bool,
    pub damage: i32,
}

/// Everything that happened in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub player_roll: u8,
    pub attack_total: i32,
    pub hit: bool,
    /// Damage actually removed from the enemy
    pub damage: i32,
    pub enemy_hp: i32,
    pub counter: Option<CounterAttack>,
    pub player_hp: i32,
    pub status: EncounterStatus,
    pub narrative: String,
}

/// A fight in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub enemy: String,
    pub enemy_hp: i32,
    pub enemy_max_hp: i32,
    pub enemy_armor: i32,
    pub enemy_damage: DamageSpec,
    pub player_hp: i32,
    pub player_max_hp: i32,
    pub status: EncounterStatus,
    pub round: u32,
}

impl Encounter {
    /// Spawn from a template. Player hit points are the base plus Body.
    pub fn from_template(template: &EncounterTemplate, rules: &EncounterRules, body: u32) -> Self {
        let enemy_hp = template.hp.max(1);
        let player_hp = rules
            .player_base_hp
            .saturating_add(i32::try_from(body).unwrap_or(i32::MAX))
            .max(1);
        Self {
            enemy: template.enemy.clone(),
            enemy_hp,
            enemy_max_hp: enemy_hp,
            enemy_armor: template.armor,
            enemy_damage: template.damage,
            player_hp,
            player_max_hp: player_hp,
            status: EncounterStatus::Active,
            round: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EncounterStatus::Active
    }

    /// Resolve one exchange: the player's attack, then the enemy's counter if it survives.
    pub fn resolve_round(
        &mut self,
        player_roll: u8,
        body: u32,
        rules: &EncounterRules,
        dice: &mut Dice,
    ) -> Result<RoundReport, Rejection> {
        if !self.is_active() {
            return Err(Rejection::NoEncounter);
        }
        self.round += 1;
        let body = i32::try_from(body).unwrap_or(i32::MAX);

        let attack_total = i32::from(player_roll).saturating_add(body);
        let hit = attack_total >= self.enemy_armor;
        let mut damage = 0;
        let mut narrative = String::new();

        if hit {
            let rolled = dice.roll(&rules.player_damage).saturating_add(body).max(0);
            damage = rolled.min(self.enemy_hp);
            self.enemy_hp -= damage;
            narrative.push_str(&format!(
                "You hit the {} for {} ({}/{} HP left).",
                self.enemy, rolled, self.enemy_hp, self.enemy_max_hp
            ));
        } else {
            narrative.push_str(&format!(
                "You miss the {} ({} vs AC {}).",
                self.enemy, attack_total, self.enemy_armor
            ));
        }

        let mut counter = None;
        if self.enemy_hp > 0 {
            let roll = dice.d20();
            let total = i32::from(roll).saturating_add(rules.enemy_attack_bonus);
            let armor = rules.player_base_armor.saturating_add(body);
            let hit = total >= armor;
            let mut dealt = 0;
            if hit {
                let rolled = dice.roll(&self.enemy_damage).max(0);
                dealt = rolled.min(self.player_hp);
                self.player_hp -= dealt;
                narrative.push_str(&format!(
                    " The {} strikes back for {} ({}/{} HP left).",
                    self.enemy, rolled, self.player_hp, self.player_max_hp
                ));
            } else {
                narrative.push_str(&format!(" The {} swings and misses.", self.enemy));
            }
            counter = Some(CounterAttack {
                roll,
                total,
                armor,
                hit,
                damage: dealt,
            });
        }

        if self.enemy_hp <= 0 {
            self.status = EncounterStatus::Won;
            narrative.push_str(&format!(" The {} falls!", self.enemy));
        } else if self.player_hp <= 0 {
            self.status = EncounterStatus::Lost;
            narrative.push_str(" You collapse.");
        }

        Ok(RoundReport {
            round: self.round,
            player_roll,
            attack_total,
            hit,
            damage,
            enemy_hp: self.enemy_hp,
            counter,
            player_hp: self.player_hp,
            status: self.status,
            narrative,
        })
    }

    /// Abandon the fight
    pub fn flee(&mut self) -> Result<(), Rejection> {
        if !self.is_active() {
            return Err(Rejection::NoEncounter);
        }
        self.status = EncounterStatus::Fled;
        Ok(())
    }
}
