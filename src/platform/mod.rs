//! Platform abstraction layer
//!
//! The core is platform-free. Browser hosts get a `wasm_bindgen` wrapper in
//! `web`; native hosts use [`crate::Game`] directly.

#[cfg(target_arch = "wasm32")]
pub mod web;
