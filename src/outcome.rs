//! Outcome resolver
//!
//! Turns the die into a number and the number into a story beat. Producing the
//! raw value is pluggable through [`OutcomeSource`]; whatever a source returns
//! is wrapped into 1-20, and a failing source falls back to a uniform roll.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::DIE_FACES;
use crate::error::OutcomeError;
use crate::sim::Disc;
use crate::stats::PlayerStats;

/// Narrative tier of a roll, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    CriticalFailure,
    Failure,
    Success,
    CriticalSuccess,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::CriticalFailure => "Critical Failure",
            Tier::Failure => "Failure",
            Tier::Success => "Success",
            Tier::CriticalSuccess => "Critical Success",
        }
    }

    pub fn is_success(&self) -> bool {
        *self >= Tier::Success
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Band boundaries mapping a roll total to a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Thresholds {
    /// >= 20 critical, 12..20 success, 6..12 failure, < 6 critical failure
    #[default]
    Standard,
    /// <= 5 critical failure, <= 10 failure, <= 19 success, else critical
    Banded,
}

impl Thresholds {
    pub fn classify(&self, total: i32) -> Tier {
        match self {
            Thresholds::Standard => match total {
                t if t >= 20 => Tier::CriticalSuccess,
                t if t >= 12 => Tier::Success,
                t if t >= 6 => Tier::Failure,
                _ => Tier::CriticalFailure,
            },
            Thresholds::Banded => match total {
                t if t <= 5 => Tier::CriticalFailure,
                t if t <= 10 => Tier::Failure,
                t if t <= 19 => Tier::Success,
                _ => Tier::CriticalSuccess,
            },
        }
    }
}

/// Everything a roll source may look at
#[derive(Debug, Clone, Copy)]
pub struct RollContext<'a> {
    pub disc: &'a Disc,
    pub stats: &'a PlayerStats,
    /// Engine tick counter, the time component of kinematic rolls
    pub tick: u64,
    pub choice_index: Option<usize>,
}

/// A pluggable producer of raw die values
///
/// The returned value need not be in range or integral; the resolver wraps it.
pub trait OutcomeSource {
    fn roll_face(&mut self, ctx: &RollContext<'_>) -> Result<f64, OutcomeError>;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> OutcomeSource for F
where
    F: FnMut(&RollContext<'_>) -> Result<f64, OutcomeError>,
{
    fn roll_face(&mut self, ctx: &RollContext<'_>) -> Result<f64, OutcomeError> {
        (self)(ctx)
    }
}

/// Box a closure as a roll source
pub fn from_fn<F>(f: F) -> Box<dyn OutcomeSource>
where
    F: FnMut(&RollContext<'_>) -> Result<f64, OutcomeError> + 'static,
{
    Box::new(f)
}

/// Wrap any finite value into 1..=20 by modulo, preserving distribution parity.
///
/// Non-integers are floored first. Returns `None` for NaN or infinities.
pub fn wrap_face(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    let faces = f64::from(DIE_FACES);
    let zero_based = (value.floor() - 1.0).rem_euclid(faces);
    Some(zero_based as u8 + 1)
}

/// SplitMix64 finalizer
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Map a hash to [0, 1)
#[inline]
fn unit(h: u64) -> f64 {
    (h >> 11) as f64 / (1u64 << 53) as f64
}

/// Add the Luck bump: with 55% chance, +min(3, luck), capped at 20
fn luck_bump(face: u32, luck: u32, bump_roll: f64) -> u32 {
    if luck == 0 || bump_roll < 0.45 {
        face
    } else {
        (face + luck.min(3)).min(u32::from(DIE_FACES))
    }
}

/// Default source: seeds from how hard and fast the die was flicked
#[derive(Debug, Clone, Copy, Default)]
pub struct KinematicOutcome;

impl OutcomeSource for KinematicOutcome {
    fn roll_face(&mut self, ctx: &RollContext<'_>) -> Result<f64, OutcomeError> {
        let speed = ctx.disc.speed();
        let spin = ctx.disc.spin.abs();
        let seed = mix64(
            u64::from(speed.to_bits())
                ^ (u64::from(spin.to_bits()) << 32)
                ^ ctx.tick.rotate_left(17),
        );
        let face = (unit(seed) * f64::from(DIE_FACES)) as u32 + 1;
        let face = luck_bump(face, ctx.stats.luck, unit(mix64(seed)));
        Ok(f64::from(face))
    }

    fn name(&self) -> &str {
        "kinematic"
    }
}

/// Uniform d20 with the Luck bias
#[derive(Debug, Clone)]
pub struct LuckyOutcome {
    rng: Pcg32,
}

impl LuckyOutcome {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl OutcomeSource for LuckyOutcome {
    fn roll_face(&mut self, ctx: &RollContext<'_>) -> Result<f64, OutcomeError> {
        let face = self.rng.random_range(1..=u32::from(DIE_FACES));
        let bump_roll: f64 = self.rng.random();
        Ok(f64::from(luck_bump(face, ctx.stats.luck, bump_roll)))
    }

    fn name(&self) -> &str {
        "lucky"
    }
}

/// Flat uniform d20
#[derive(Debug, Clone)]
pub struct UniformOutcome {
    rng: Pcg32,
}

impl UniformOutcome {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl OutcomeSource for UniformOutcome {
    fn roll_face(&mut self, _ctx: &RollContext<'_>) -> Result<f64, OutcomeError> {
        Ok(f64::from(self.rng.random_range(1..=DIE_FACES)))
    }

    fn name(&self) -> &str {
        "uniform"
    }
}

/// A die roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roll {
    pub face: u8,
    /// True if the configured source failed and the fallback rolled instead
    pub fallback: bool,
}

/// Produces rolls through a pluggable source and classifies totals
pub struct Resolver {
    source: Box<dyn OutcomeSource>,
    fallback: Pcg32,
    pub thresholds: Thresholds,
    failures: u64,
}

impl Resolver {
    pub fn new(source: Box<dyn OutcomeSource>, seed: u64, thresholds: Thresholds) -> Self {
        Self {
            source,
            fallback: Pcg32::seed_from_u64(seed ^ 0xFA11_BAC6),
            thresholds,
            failures: 0,
        }
    }

    /// Resolver using the built-in kinematic source
    pub fn kinematic(seed: u64, thresholds: Thresholds) -> Self {
        Self::new(Box::new(KinematicOutcome), seed, thresholds)
    }

    pub fn set_source(&mut self, source: Box<dyn OutcomeSource>) {
        log::info!("Roll source set to {}", source.name());
        self.source = source;
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Number of times the source failed and the fallback was used
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Roll the die. Never fails: a broken source yields a uniform fallback roll.
    pub fn roll_face(&mut self, ctx: &RollContext<'_>) -> Roll {
        let result = self
            .source
            .roll_face(ctx)
            .and_then(|v| wrap_face(v).ok_or(OutcomeError::NonFinite(v)));

        match result {
            Ok(face) => Roll {
                face,
                fallback: false,
            },
            Err(err) => {
                self.failures += 1;
                log::warn!("{} (source: {}), using fallback roll", err, self.source.name());
                Roll {
                    face: self.fallback.random_range(1..=DIE_FACES),
                    fallback: true,
                }
            }
        }
    }

    /// Total and tier for a roll plus bonus
    pub fn classify(&self, face: u8, bonus: i32) -> (i32, Tier) {
        let total = i32::from(face).saturating_add(bonus);
        (total, self.thresholds.classify(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use proptest::prelude::*;

    fn ctx<'a>(disc: &'a Disc, stats: &'a PlayerStats, tick: u64) -> RollContext<'a> {
        RollContext {
            disc,
            stats,
            tick,
            choice_index: Some(0),
        }
    }

    #[test]
    fn test_wrap_face() {
        assert_eq!(wrap_face(1.0), Some(1));
        assert_eq!(wrap_face(20.0), Some(20));
        assert_eq!(wrap_face(21.0), Some(1));
        assert_eq!(wrap_face(0.0), Some(20));
        assert_eq!(wrap_face(-1.0), Some(19));
        assert_eq!(wrap_face(7.9), Some(7));
        assert_eq!(wrap_face(f64::NAN), None);
        assert_eq!(wrap_face(f64::INFINITY), None);
    }

    #[test]
    fn test_standard_thresholds() {
        let t = Thresholds::Standard;
        assert_eq!(t.classify(25), Tier::CriticalSuccess);
        assert_eq!(t.classify(20), Tier::CriticalSuccess);
        assert_eq!(t.classify(19), Tier::Success);
        assert_eq!(t.classify(12), Tier::Success);
        assert_eq!(t.classify(11), Tier::Failure);
        assert_eq!(t.classify(6), Tier::Failure);
        assert_eq!(t.classify(5), Tier::CriticalFailure);
        assert_eq!(t.classify(-3), Tier::CriticalFailure);
    }

    #[test]
    fn test_banded_thresholds() {
        let t = Thresholds::Banded;
        assert_eq!(t.classify(5), Tier::CriticalFailure);
        assert_eq!(t.classify(6), Tier::Failure);
        assert_eq!(t.classify(10), Tier::Failure);
        assert_eq!(t.classify(11), Tier::Success);
        assert_eq!(t.classify(19), Tier::Success);
        assert_eq!(t.classify(20), Tier::CriticalSuccess);
    }

    #[test]
    fn test_out_of_range_source_is_wrapped() {
        let mut resolver = Resolver::new(from_fn(|_| Ok(47.5)), 1, Thresholds::Standard);
        let disc = Disc::default();
        let stats = PlayerStats::default();
        let roll = resolver.roll_face(&ctx(&disc, &stats, 0));
        assert_eq!(roll, Roll { face: 7, fallback: false });
    }

    #[test]
    fn test_failing_source_falls_back() {
        let mut resolver = Resolver::new(
            from_fn(|_| Err(OutcomeError::Source("boom".into()))),
            42,
            Thresholds::Standard,
        );
        let disc = Disc::default();
        let stats = PlayerStats::default();
        for tick in 0..100 {
            let roll = resolver.roll_face(&ctx(&disc, &stats, tick));
            assert!(roll.fallback);
            assert!((1..=20).contains(&roll.face));
        }
        assert_eq!(resolver.failures(), 100);
    }

    #[test]
    fn test_nan_source_falls_back() {
        let mut resolver = Resolver::new(from_fn(|_| Ok(f64::NAN)), 3, Thresholds::Standard);
        let disc = Disc::default();
        let stats = PlayerStats::default();
        let roll = resolver.roll_face(&ctx(&disc, &stats, 0));
        assert!(roll.fallback);
        assert!((1..=20).contains(&roll.face));
    }

    #[test]
    fn test_kinematic_is_deterministic() {
        let mut disc = Disc::default();
        disc.vel = Vec2::new(12.0, -7.5);
        disc.spin = 0.4;
        let stats = PlayerStats::default();

        let a = KinematicOutcome.roll_face(&ctx(&disc, &stats, 99)).unwrap();
        let b = KinematicOutcome.roll_face(&ctx(&disc, &stats, 99)).unwrap();
        assert_eq!(a, b);
        assert!((1.0..=20.0).contains(&a));
        assert_eq!(a.fract(), 0.0);
    }

    #[test]
    fn test_kinematic_covers_faces() {
        let disc = Disc::default();
        let stats = PlayerStats::default();
        let mut seen = [false; 20];
        for tick in 0..2000 {
            let v = KinematicOutcome.roll_face(&ctx(&disc, &stats, tick)).unwrap();
            seen[v as usize - 1] = true;
        }
        assert!(seen.iter().all(|&s| s), "some faces never came up: {seen:?}");
    }

    #[test]
    fn test_luck_bump() {
        assert_eq!(luck_bump(10, 0, 0.9), 10);
        assert_eq!(luck_bump(10, 5, 0.2), 10);
        assert_eq!(luck_bump(10, 2, 0.9), 12);
        assert_eq!(luck_bump(10, 5, 0.9), 13);
        assert_eq!(luck_bump(19, 5, 0.9), 20);
    }

    #[test]
    fn test_lucky_outcome_never_below_unlucky_range() {
        let mut source = LuckyOutcome::new(5);
        let disc = Disc::default();
        let stats = PlayerStats {
            luck: 3,
            ..Default::default()
        };
        for tick in 0..500 {
            let v = source.roll_face(&ctx(&disc, &stats, tick)).unwrap();
            assert!((1.0..=20.0).contains(&v));
        }
    }

    proptest! {
        #[test]
        fn prop_wrap_always_in_range(v in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let face = wrap_face(v).unwrap();
            prop_assert!((1..=20).contains(&face));
        }

        #[test]
        fn prop_wrap_preserves_integers_mod_20(n in -10_000i64..10_000) {
            let face = wrap_face(n as f64).unwrap();
            prop_assert_eq!(i64::from(face), (n - 1).rem_euclid(20) + 1);
        }

        #[test]
        fn prop_classify_monotonic(a in -100i32..100, b in -100i32..100) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for t in [Thresholds::Standard, Thresholds::Banded] {
                prop_assert!(t.classify(lo) <= t.classify(hi));
            }
        }
    }
}
