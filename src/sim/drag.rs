//! Manual drag controller
//!
//! Pointer events arrive already translated into tray coordinates. While the
//! disc is held it follows the pointer and picks up velocity from the pointer
//! deltas; letting go amplifies that velocity into a flick.

use glam::Vec2;

use super::disc::Disc;
use super::tray::Tray;
use crate::settings::DragTuning;

/// Result of releasing the disc
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub vel: Vec2,
    pub spin: f32,
    /// Whether the pointer moved at any point during the grab
    pub moved: bool,
}

/// Converts pointer interaction into disc impulses
#[derive(Debug, Clone, Default)]
pub struct DragController {
    pub tuning: DragTuning,
    moved: bool,
}

impl DragController {
    pub fn new(tuning: DragTuning) -> Self {
        Self { tuning, moved: false }
    }

    /// Spin from a drag delta: the drag-impulse helper
    #[inline]
    pub fn drag_spin(&self, delta: Vec2) -> f32 {
        (delta.x - delta.y) * (self.tuning.spin_gain + self.tuning.impulse_spin_gain)
    }

    /// Grab the disc if the pointer is on it. Returns true if grabbed.
    pub fn pointer_down(&mut self, disc: &mut Disc, tray: &Tray, point: Vec2) -> bool {
        if !point.is_finite() || !tray.contains(point) || !disc.contains(point) {
            return false;
        }
        disc.grabbed = true;
        disc.stop();
        disc.last_pointer = point;
        self.moved = false;
        true
    }

    /// Drag the held disc toward the pointer
    pub fn pointer_move(&mut self, disc: &mut Disc, tray: &Tray, point: Vec2) {
        if !disc.grabbed || !point.is_finite() {
            return;
        }
        disc.pos = tray.clamp_center(point, disc.radius);

        // A repeated coordinate keeps the last impulse
        let delta = point - disc.last_pointer;
        if delta == Vec2::ZERO {
            return;
        }
        disc.vel = delta * self.tuning.velocity_gain;
        disc.spin = self.drag_spin(delta);
        disc.last_pointer = point;
        self.moved = true;
    }

    /// Let go of the disc. Returns `None` if it was not held.
    pub fn pointer_up(&mut self, disc: &mut Disc) -> Option<Release> {
        if !disc.grabbed {
            return None;
        }
        disc.grabbed = false;
        disc.vel *= self.tuning.release_linear;
        disc.spin *= self.tuning.release_angular;

        Some(Release {
            vel: disc.vel,
            spin: disc.spin,
            moved: std::mem::take(&mut self.moved),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (DragController, Disc, Tray) {
        let tray = Tray::new(0.0, 0.0, 400.0, 300.0).with_padding(12.0);
        let mut disc = Disc::new(40.0);
        disc.center_in(&tray);
        (DragController::default(), disc, tray)
    }

    #[test]
    fn test_pointer_down_requires_hit() {
        let (mut drag, mut disc, tray) = setup();
        assert!(!drag.pointer_down(&mut disc, &tray, Vec2::new(10.0, 10.0)));
        assert!(!disc.grabbed);

        disc.vel = Vec2::new(3.0, 1.0);
        assert!(drag.pointer_down(&mut disc, &tray, Vec2::new(210.0, 150.0)));
        assert!(disc.grabbed);
        assert!(disc.is_at_rest());
        assert_eq!(disc.last_pointer, Vec2::new(210.0, 150.0));
    }

    #[test]
    fn test_pointer_down_outside_tray() {
        let (mut drag, mut disc, tray) = setup();
        disc.pos = Vec2::new(20.0, 20.0);
        // On the disc, but off the tray
        assert!(!drag.pointer_down(&mut disc, &tray, Vec2::new(-5.0, 20.0)));
    }

    #[test]
    fn test_move_sets_velocity_from_delta() {
        let (mut drag, mut disc, tray) = setup();
        let start = disc.pos;
        drag.pointer_down(&mut disc, &tray, start);
        drag.pointer_move(&mut disc, &tray, start + Vec2::new(10.0, -4.0));

        assert_eq!(disc.pos, start + Vec2::new(10.0, -4.0));
        assert!((disc.vel.x - 12.5).abs() < 1e-5);
        assert!((disc.vel.y + 5.0).abs() < 1e-5);
        assert!((disc.spin - 14.0 * 0.045).abs() < 1e-5);
    }

    #[test]
    fn test_move_clamps_into_tray() {
        let (mut drag, mut disc, tray) = setup();
        let start = disc.pos;
        drag.pointer_down(&mut disc, &tray, start);
        drag.pointer_move(&mut disc, &tray, Vec2::new(900.0, -50.0));
        assert_eq!(disc.pos, Vec2::new(348.0, 52.0));
    }

    #[test]
    fn test_move_ignored_when_not_grabbed() {
        let (mut drag, mut disc, tray) = setup();
        let before = disc.clone();
        drag.pointer_move(&mut disc, &tray, Vec2::new(100.0, 100.0));
        assert_eq!(disc, before);
    }

    #[test]
    fn test_release_amplifies() {
        let (mut drag, mut disc, tray) = setup();
        let start = disc.pos;
        drag.pointer_down(&mut disc, &tray, start);
        drag.pointer_move(&mut disc, &tray, start + Vec2::new(4.0, 0.0));

        let release = drag.pointer_up(&mut disc).unwrap();
        assert!(!disc.grabbed);
        assert!(release.moved);
        assert!((release.vel.x - 4.0 * 1.25 * 2.6).abs() < 1e-4);
        assert!((release.spin - 4.0 * 0.045 * 2.0).abs() < 1e-5);
        assert!(disc.speed() > 0.0);

        // Second release without a grab does nothing
        assert!(drag.pointer_up(&mut disc).is_none());
    }

    #[test]
    fn test_repeated_point_keeps_impulse() {
        let (mut drag, mut disc, tray) = setup();
        let start = disc.pos;
        drag.pointer_down(&mut disc, &tray, start);
        drag.pointer_move(&mut disc, &tray, start + Vec2::new(30.0, 10.0));
        drag.pointer_move(&mut disc, &tray, start + Vec2::new(30.0, 10.0));

        let release = drag.pointer_up(&mut disc).unwrap();
        assert!(release.moved);
        assert_ne!(release.vel, Vec2::ZERO);
        assert!(release.spin != 0.0);
    }

    #[test]
    fn test_stationary_grab_releases_still() {
        let (mut drag, mut disc, tray) = setup();
        let start = disc.pos;
        drag.pointer_down(&mut disc, &tray, start);
        drag.pointer_move(&mut disc, &tray, start);

        let release = drag.pointer_up(&mut disc).unwrap();
        assert!(!release.moved);
        assert_eq!(release.vel, Vec2::ZERO);
    }

    #[test]
    fn test_impulse_spin_gain_adds_spin() {
        let (mut drag, mut disc, tray) = setup();
        drag.tuning.impulse_spin_gain = 0.06;
        let start = disc.pos;
        drag.pointer_down(&mut disc, &tray, start);
        drag.pointer_move(&mut disc, &tray, start + Vec2::new(0.0, -10.0));
        assert!((disc.spin - 10.0 * (0.045 + 0.06)).abs() < 1e-5);
    }
}
