//! Player stats and preparation
//!
//! Before rolling, the player toggles preparation options. Each option adds a
//! value to one of four stats; the stats are always the sum of the toggled
//! options and are read (never written) by rolls and fights.

use serde::{Deserialize, Serialize};

/// The four stat accumulators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Mind,
    Body,
    Spirit,
    Luck,
}

impl Stat {
    pub const ALL: [Stat; 4] = [Stat::Mind, Stat::Body, Stat::Spirit, Stat::Luck];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Mind => "Mind",
            Stat::Body => "Body",
            Stat::Spirit => "Spirit",
            Stat::Luck => "Luck",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mind" => Some(Stat::Mind),
            "body" => Some(Stat::Body),
            "spirit" => Some(Stat::Spirit),
            "luck" => Some(Stat::Luck),
            _ => None,
        }
    }
}

/// Current stat totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub mind: u32,
    pub body: u32,
    pub spirit: u32,
    pub luck: u32,
}

impl PlayerStats {
    pub fn get(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Mind => self.mind,
            Stat::Body => self.body,
            Stat::Spirit => self.spirit,
            Stat::Luck => self.luck,
        }
    }

    fn slot(&mut self, stat: Stat) -> &mut u32 {
        match stat {
            Stat::Mind => &mut self.mind,
            Stat::Body => &mut self.body,
            Stat::Spirit => &mut self.spirit,
            Stat::Luck => &mut self.luck,
        }
    }

    pub fn total(&self) -> u32 {
        self.mind
            .saturating_add(self.body)
            .saturating_add(self.spirit)
            .saturating_add(self.luck)
    }
}

/// How a normal (non-combat) roll picks its bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BonusPolicy {
    /// Sum of every stat
    #[default]
    SumAll,
    /// Only the stat the chosen option names (0 if it names none)
    ChoiceStat,
    /// Raw roll only
    None,
}

impl BonusPolicy {
    pub fn bonus(&self, stats: &PlayerStats, choice_stat: Option<Stat>) -> i32 {
        let value = match self {
            BonusPolicy::SumAll => stats.total(),
            BonusPolicy::ChoiceStat => choice_stat.map(|s| stats.get(s)).unwrap_or(0),
            BonusPolicy::None => 0,
        };
        i32::try_from(value).unwrap_or(i32::MAX)
    }
}

/// A toggleable preparation option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepOption {
    pub label: String,
    pub stat: Stat,
    pub value: u32,
    #[serde(default)]
    pub toggled: bool,
}

impl PrepOption {
    pub fn new(label: impl Into<String>, stat: Stat, value: u32) -> Self {
        Self {
            label: label.into(),
            stat,
            value,
            toggled: false,
        }
    }
}

/// The set of preparation options and the stats they produce
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preparation {
    pub options: Vec<PrepOption>,
}

impl Preparation {
    pub fn new(options: Vec<PrepOption>) -> Self {
        Self { options }
    }

    /// One +1 option per stat
    pub fn basic() -> Self {
        Self::new(
            Stat::ALL
                .iter()
                .map(|&stat| PrepOption::new(stat.as_str(), stat, 1))
                .collect(),
        )
    }

    /// Flip an option. Returns its new state, or `None` if out of range.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let option = self.options.get_mut(index)?;
        option.toggled = !option.toggled;
        Some(option.toggled)
    }

    pub fn clear(&mut self) {
        for option in &mut self.options {
            option.toggled = false;
        }
    }

    /// Stats derived from the toggled options
    pub fn stats(&self) -> PlayerStats {
        let mut stats = PlayerStats::default();
        for option in self.options.iter().filter(|o| o.toggled) {
            let slot = stats.slot(option.stat);
            *slot = slot.saturating_add(option.value);
        }
        stats
    }
}
