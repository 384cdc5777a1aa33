//! Story data and the page state machine

pub mod csv;
pub mod engine;
pub mod loader;
pub mod page;

pub use engine::{ChoiceResult, EngineRules, Ending, NextStep, Phase, Resolution, StoryEngine};
pub use loader::{DanglingRef, LoadOptions, SelfCheck, StoryData};
pub use page::{Choice, Destination, Page};
