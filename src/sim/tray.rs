//! Tray geometry
//!
//! The tray is the axis-aligned rectangle the disc lives in. Its travel area
//! is the rectangle shrunk by the inner padding plus the disc radius, i.e. the
//! set of valid disc centers.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::clamp_point;
use crate::consts::*;

/// One of the four tray walls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wall {
    Left,
    Top,
    Right,
    Bottom,
}

impl Wall {
    pub const ALL: [Wall; 4] = [Wall::Left, Wall::Top, Wall::Right, Wall::Bottom];

    /// Sign of the spin injected when the disc bounces off this wall
    #[inline]
    pub fn spin_sign(self) -> f32 {
        match self {
            Wall::Left | Wall::Top => 1.0,
            Wall::Right | Wall::Bottom => -1.0,
        }
    }
}

/// Bounded rectangle the disc is confined to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tray {
    /// Top-left corner
    pub origin: Vec2,
    pub size: Vec2,
    /// Gap between the tray edge and the disc's leading edge at rest against a wall
    pub padding: f32,
}

impl Default for Tray {
    fn default() -> Self {
        Self::new(0.0, 0.0, TRAY_WIDTH, TRAY_HEIGHT)
    }
}

impl Tray {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w.max(0.0), h.max(0.0)),
            padding: TRAY_PADDING,
        }
    }

    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding.max(0.0);
        self
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.origin + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    /// Check if a point is inside the tray rectangle (edges inclusive)
    pub fn contains(&self, p: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }

    /// Smallest valid disc center for a disc of the given radius
    #[inline]
    pub fn inner_min(&self, radius: f32) -> Vec2 {
        self.min() + Vec2::splat(self.padding + radius)
    }

    /// Largest valid disc center for a disc of the given radius
    #[inline]
    pub fn inner_max(&self, radius: f32) -> Vec2 {
        self.max() - Vec2::splat(self.padding + radius)
    }

    /// Clamp a point into the travel area of a disc with the given radius
    pub fn clamp_center(&self, p: Vec2, radius: f32) -> Vec2 {
        clamp_point(p, self.inner_min(radius), self.inner_max(radius))
    }

    /// Whether a disc centered at `p` lies fully within the travel area
    pub fn holds(&self, p: Vec2, radius: f32) -> bool {
        self.clamp_center(p, radius) == p
    }

    /// Whether the tray is large enough for a disc of the given radius
    pub fn fits(&self, radius: f32) -> bool {
        let span = 2.0 * (self.padding + radius);
        self.size.x >= span && self.size.y >= span
    }
}
