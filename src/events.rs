//! Structured events emitted after each resolved roll
//!
//! Sinks are fire-and-forget: `emit` returns nothing and a sink that fails
//! must swallow the failure itself, so nothing a sink does can reach game state.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::encounter::EncounterStatus;
use crate::outcome::Tier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A roll applied to a selected choice
    Selection {
        page_id: String,
        choice_index: usize,
        raw_roll: u8,
        bonus: i32,
        total: i32,
        tier: Tier,
        /// The configured roll source failed and a uniform roll was used
        fallback: bool,
        tick: u64,
        /// Host clock in milliseconds
        ts: f64,
    },
    /// One round of an encounter
    Fight {
        page_id: String,
        round: u32,
        attack_total: i32,
        hit: bool,
        enemy_hp: i32,
        player_hp: i32,
        status: EncounterStatus,
        tick: u64,
        ts: f64,
    },
}

impl EngineEvent {
    pub fn page_id(&self) -> &str {
        match self {
            EngineEvent::Selection { page_id, .. } | EngineEvent::Fight { page_id, .. } => page_id,
        }
    }
}

pub trait EventSink {
    fn emit(&mut self, event: &EngineEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&EngineEvent),
{
    fn emit(&mut self, event: &EngineEvent) {
        self(event)
    }
}

/// Ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&mut self, _event: &EngineEvent) {}
}

/// Forwards events to the `log` facade as JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: &EngineEvent) {
        match serde_json::to_string(event) {
            Ok(json) => log::info!("event {}", json),
            Err(e) => log::warn!("Failed to encode event: {}", e),
        }
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write> {
    out: W,
    failures: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, failures: 0 }
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &EngineEvent) {
        let result = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            self.failures += 1;
            log::warn!("Event sink write failed: {}", e);
        }
    }
}

/// Buffers events for a host to drain at its own pace. Clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: Rc<RefCell<Vec<EngineEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn drain(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl EventSink for EventQueue {
    fn emit(&mut self, event: &EngineEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> EngineEvent {
        EngineEvent::Selection {
            page_id: "start".into(),
            choice_index: 1,
            raw_roll: 14,
            bonus: 2,
            total: 16,
            tier: Tier::Success,
            fallback: false,
            tick: 120,
            ts: 2000.0,
        }
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(selection()).unwrap();
        assert_eq!(value["kind"], "selection");
        assert_eq!(value["page_id"], "start");
        assert_eq!(value["total"], 16);

        let fight = EngineEvent::Fight {
            page_id: "cave".into(),
            round: 1,
            attack_total: 15,
            hit: true,
            enemy_hp: 0,
            player_hp: 12,
            status: EncounterStatus::Won,
            tick: 3,
            ts: 0.0,
        };
        let value = serde_json::to_value(&fight).unwrap();
        assert_eq!(value["kind"], "fight");
        assert_eq!(value["hit"], true);
        assert_eq!(fight.page_id(), "cave");
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&selection());
        sink.emit(&selection());
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: EngineEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back, selection());
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("pipe closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let mut sink = JsonLinesSink::new(Broken);
        sink.emit(&selection());
        sink.emit(&selection());
        assert_eq!(sink.failures(), 2);
    }

    #[test]
    fn test_queue_shares_buffer() {
        let queue = EventQueue::new();
        let mut sink: Box<dyn EventSink> = Box::new(queue.clone());
        sink.emit(&selection());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain(), vec![selection()]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = 0;
        {
            let mut sink = |_: &EngineEvent| seen += 1;
            sink.emit(&selection());
            EventSink::emit(&mut sink, &selection());
        }
        assert_eq!(seen, 2);
    }
}
