//! Deterministic disc simulation
//!
//! The physical half of the die. This module must stay pure and deterministic:
//! - One fixed step per host frame
//! - No randomness
//! - No rendering or platform dependencies

pub mod disc;
pub mod drag;
pub mod tray;

pub use disc::{Disc, bounce_spin};
pub use drag::{DragController, Release};
pub use tray::{Tray, Wall};
