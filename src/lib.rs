//! Dice Tale - a branching story driven by a flickable d20
//!
//! Core modules:
//! - `sim`: Deterministic disc simulation (tray, damped disc, drag controller)
//! - `outcome`: Turning disc state into a 1-20 roll and a narrative tier
//! - `story`: Story data, loading, and the page state machine
//! - `encounter`: Turn-based fights nested inside a page
//! - `game`: The engine context tying it all together
//! - `renderer`: Read-only snapshots handed to an external renderer
//! - `platform`: Browser bindings

pub mod encounter;
pub mod error;
pub mod events;
pub mod game;
pub mod outcome;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod stats;
pub mod story;

pub use error::{OutcomeError, Rejection, StoryError};
pub use game::Game;
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Host animation-frame rate the tuning values were calibrated against
    pub const TICKS_PER_SECOND: u32 = 60;

    /// Disc defaults
    pub const DISC_RADIUS: f32 = 56.0;
    /// Inner padding between the tray edge and the disc's travel area
    pub const TRAY_PADDING: f32 = 12.0;

    /// Default tray (logical pixels)
    pub const TRAY_WIDTH: f32 = 928.0;
    pub const TRAY_HEIGHT: f32 = 269.0;

    /// Number of faces on the die
    pub const DIE_FACES: u8 = 20;

    /// Destination marking the end of a story branch
    pub const TERMINAL_SENTINEL: &str = "END";

    /// Upper bound on choices per page, one per label A-Z
    pub const MAX_CHOICES: usize = 26;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    if angle.abs() > 64.0 * TAU {
        angle %= TAU;
    }
    while angle >= PI {
        angle -= TAU;
    }
    while angle < -PI {
        angle += TAU;
    }
    angle
}

/// Clamp a point into an axis-aligned box given by its min and max corners.
///
/// If the box is inverted on an axis (min > max) the point snaps to the
/// midpoint of that axis so the result is always well defined.
#[inline]
pub fn clamp_point(p: Vec2, min: Vec2, max: Vec2) -> Vec2 {
    let axis = |v: f32, lo: f32, hi: f32| {
        if lo > hi { (lo + hi) * 0.5 } else { v.clamp(lo, hi) }
    };
    Vec2::new(axis(p.x, min.x, max.x), axis(p.y, min.y, max.y))
}

/// Case-insensitive truthiness used by story data flags
pub fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}
