//! Damped 2D rigid disc
//!
//! The die is simulated as a flat disc: position, linear velocity, rotation
//! and spin. One `tick` is one host animation frame; all quantities are in
//! logical pixels (or radians) per tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::tray::{Tray, Wall};
use crate::consts::*;
use crate::normalize_angle;
use crate::settings::PhysicsTuning;

/// The die
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disc {
    pub pos: Vec2,
    pub radius: f32,
    pub vel: Vec2,
    /// Rotation (radians, normalized to [-π, π))
    pub angle: f32,
    /// Angular velocity (radians per tick)
    pub spin: f32,
    /// Held by the pointer; physics is suspended while grabbed
    pub grabbed: bool,
    /// Last pointer position seen during a drag
    pub last_pointer: Vec2,
    /// Face shown after a roll, cleared on page change
    pub face: Option<u8>,
}

impl Default for Disc {
    fn default() -> Self {
        Self::new(DISC_RADIUS)
    }
}

impl Disc {
    pub fn new(radius: f32) -> Self {
        Self {
            pos: Vec2::ZERO,
            radius,
            vel: Vec2::ZERO,
            angle: 0.0,
            spin: 0.0,
            grabbed: false,
            last_pointer: Vec2::ZERO,
            face: None,
        }
    }

    /// Place the disc at the middle of a tray, at rest
    pub fn center_in(&mut self, tray: &Tray) {
        self.pos = tray.center();
        self.stop();
    }

    /// Zero linear and angular velocity
    pub fn stop(&mut self) {
        self.vel = Vec2::ZERO;
        self.spin = 0.0;
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    pub fn is_at_rest(&self) -> bool {
        self.vel == Vec2::ZERO && self.spin == 0.0
    }

    /// Check whether a point lies on the disc
    pub fn contains(&self, p: Vec2) -> bool {
        self.pos.distance(p) <= self.radius
    }

    /// Advance one tick. Returns the number of wall bounces this tick.
    ///
    /// No-op while grabbed. Otherwise integrates, resolves the four walls,
    /// applies friction and snaps to rest below the rest thresholds.
    pub fn tick(&mut self, tray: &Tray, tuning: &PhysicsTuning) -> u32 {
        if self.grabbed {
            return 0;
        }

        self.pos += self.vel;
        self.angle = normalize_angle(self.angle + self.spin);

        let mut bounces = 0;
        for wall in Wall::ALL {
            if self.resolve_wall(tray, wall, tuning) {
                bounces += 1;
            }
        }
        // Keeps the disc inside even when the tray is too small for it
        self.pos = tray.clamp_center(self.pos, self.radius);

        self.vel *= tuning.friction;
        self.spin *= tuning.friction;

        if self.speed() < tuning.rest_linear && self.spin.abs() < tuning.rest_angular {
            self.stop();
        }

        bounces
    }

    /// Clamp against one wall and bounce if the disc is moving into it.
    fn resolve_wall(&mut self, tray: &Tray, wall: Wall, tuning: &PhysicsTuning) -> bool {
        let min = tray.inner_min(self.radius);
        let max = tray.inner_max(self.radius);

        // Inward normal and signed distance of the center from the travel-area edge
        let (normal, depth) = match wall {
            Wall::Left => (Vec2::X, self.pos.x - min.x),
            Wall::Top => (Vec2::Y, self.pos.y - min.y),
            Wall::Right => (Vec2::NEG_X, max.x - self.pos.x),
            Wall::Bottom => (Vec2::NEG_Y, max.y - self.pos.y),
        };

        let approach = self.vel.dot(normal);
        if depth > 0.0 || (depth == 0.0 && approach >= 0.0) {
            return false;
        }

        // Push back onto the wall
        self.pos -= normal * depth;

        if approach >= 0.0 {
            // Already separating, nothing to reflect
            return false;
        }

        let speed = self.speed();
        self.vel -= normal * approach * (1.0 + tuning.wall_restitution);
        self.spin = -self.spin * tuning.wall_restitution
            + bounce_spin(wall, speed, tuning.bounce_spin_base, tuning.bounce_spin_per_speed);
        true
    }
}

/// Spin injected by a wall bounce: positive off left/top, negative off right/bottom
#[inline]
pub fn bounce_spin(wall: Wall, speed: f32, base: f32, per_speed: f32) -> f32 {
    wall.spin_sign() * (base + speed * per_speed)
}
