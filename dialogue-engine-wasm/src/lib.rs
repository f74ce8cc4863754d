//! WASM bindings for dialogue-engine — powers the interactive web demo.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wasm_bindgen::prelude::*;

use dialogue_engine::core::config::PlaybackConfig;
use dialogue_engine::core::dispatcher::{Dispatch, ZonePolicy, ZoneTrigger};
use dialogue_engine::core::playback::{
    DialoguePlayback, PlaybackController, PlaybackEvent, PlaybackEventKind,
};
use dialogue_engine::core::stage::Locomotion;
use dialogue_engine::core::store::SequenceStore;
use dialogue_engine::schema::sequence::SequenceId;

// ---------------------------------------------------------------------------
// Embedded demo library — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const MOUNTAIN_RESCUE: &str = include_str!("../../dialogue_data/mountain_rescue.ron");
}

/// Metres between the speaker and any waypoint in the browser demo.
const DEMO_WAYPOINT_DISTANCE: f32 = 6.0;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct EventOut<'a> {
    at: f64,
    event: &'a PlaybackEventKind,
}

#[derive(serde::Serialize)]
struct StateOut<'a> {
    clock: f64,
    sequence: Option<&'a str>,
    line_index: i32,
    playing: bool,
    walking: bool,
    story_stage: u32,
    subtitle: &'a str,
}

#[derive(serde::Serialize)]
struct EnterOut {
    outcome: &'static str,
    sequence: Option<String>,
    events: serde_json::Value,
}

/// The browser has no scene graph; every waypoint sits a fixed distance away.
struct DemoWalker {
    travelled: f32,
}

impl Locomotion for DemoWalker {
    fn has_waypoint(&self, _waypoint: &str) -> bool {
        true
    }

    fn step_towards(&mut self, _waypoint: &str, speed: f32, dt: Duration) -> bool {
        self.travelled += speed * dt.as_secs_f32();
        if self.travelled >= DEMO_WAYPOINT_DISTANCE {
            self.travelled = 0.0;
            true
        } else {
            false
        }
    }
}

fn events_to_value(events: &[PlaybackEvent]) -> Result<serde_json::Value, JsError> {
    let out: Vec<EventOut<'_>> = events
        .iter()
        .map(|e| EventOut {
            at: e.at.as_secs_f64(),
            event: &e.kind,
        })
        .collect();
    serde_json::to_value(&out).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// DialoguePlayer — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct DialoguePlayer {
    store: Arc<SequenceStore>,
    controller: PlaybackController,
    zones: HashMap<String, ZoneTrigger>,
}

#[wasm_bindgen]
impl DialoguePlayer {
    /// Create a player from a RON dialogue library.
    #[wasm_bindgen(constructor)]
    pub fn new(library_ron: &str) -> Result<DialoguePlayer, JsError> {
        let store = SequenceStore::parse_ron(library_ron)
            .map_err(|e| JsError::new(&format!("Library parse error: {e}")))?;
        Self::from_store(Arc::new(store), PlaybackConfig::default())
    }

    /// Create a player for the built-in Mountain Rescue library.
    pub fn mountain_rescue() -> Result<DialoguePlayer, JsError> {
        Self::new(data::MOUNTAIN_RESCUE)
    }

    /// Override the inter-line delay and movement timeout (seconds).
    pub fn configure(&mut self, line_delay: f32, movement_timeout: f32) -> Result<(), JsError> {
        let config = PlaybackConfig {
            line_delay,
            movement_timeout,
            ..PlaybackConfig::default()
        };
        // Keeps story progress; the live walk is dropped with the old controller.
        let story_stage = self.controller.story_stage();
        self.controller = PlaybackController::builder(self.store.clone())
            .config(config)
            .locomotion(DemoWalker { travelled: 0.0 })
            .story_stage(story_stage)
            .build()
            .map_err(|e| JsError::new(&format!("Config error: {e}")))?;
        Ok(())
    }

    /// Play a sequence from the top. Returns a JSON array of events.
    pub fn trigger(&mut self, sequence: &str) -> Result<String, JsError> {
        self.controller.trigger_sequence(&SequenceId::new(sequence));
        self.drain_json()
    }

    /// Interrupt live dialogue with a sequence. Returns a JSON array of events.
    pub fn interrupt(&mut self, sequence: &str) -> Result<String, JsError> {
        self.controller.interrupt_with_sequence(&SequenceId::new(sequence));
        self.drain_json()
    }

    /// Fire a trigger table as if the player walked into its zone.
    ///
    /// `story_stage` defaults to the controller's own stage.
    /// Returns `{ "outcome": ..., "sequence": ..., "events": [...] }`.
    pub fn enter_zone(&mut self, zone: &str, story_stage: Option<u32>) -> Result<String, JsError> {
        let stage = story_stage.unwrap_or_else(|| self.controller.story_stage());
        self.ensure_zone(zone)?;
        let trigger = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| JsError::new(&format!("Unknown zone: {zone}")))?;
        let outcome = trigger.on_enter(&mut self.controller, stage);
        let (label, sequence) = match outcome {
            Dispatch::Triggered(id) => ("triggered", Some(id.0)),
            Dispatch::Interrupted(id) => ("interrupted", Some(id.0)),
            Dispatch::Suppressed => ("suppressed", None),
            Dispatch::NoMatch => ("no_match", None),
        };
        let events = events_to_value(&self.controller.drain_events())?;
        serde_json::to_string(&EnterOut {
            outcome: label,
            sequence,
            events,
        })
        .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Set how a zone gates repeated entries and live dialogue.
    pub fn set_zone_policy(
        &mut self,
        zone: &str,
        trigger_once: bool,
        interrupt_current: bool,
    ) -> Result<(), JsError> {
        let dispatcher = self
            .store
            .trigger(zone)
            .ok_or_else(|| JsError::new(&format!("Unknown zone: {zone}")))?
            .clone();
        let policy = ZonePolicy {
            trigger_once,
            interrupt_current,
        };
        self.zones
            .insert(zone.to_string(), ZoneTrigger::new(zone, dispatcher, policy));
        Ok(())
    }

    /// Advance the clock. Returns a JSON array of events.
    pub fn tick(&mut self, seconds: f32) -> Result<String, JsError> {
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err(JsError::new(&format!("Invalid tick: {seconds}")));
        }
        self.controller.tick(Duration::from_secs_f32(seconds));
        self.drain_json()
    }

    /// Cancel the current sequence. Returns a JSON array of events.
    pub fn stop(&mut self) -> Result<String, JsError> {
        self.controller.stop();
        self.drain_json()
    }

    /// Stop, rewind the story stage and re-arm every zone.
    pub fn reset(&mut self) -> Result<String, JsError> {
        self.controller.reset();
        for zone in self.zones.values_mut() {
            zone.reset_latch();
        }
        self.drain_json()
    }

    /// Return a JSON snapshot of playback state.
    pub fn state(&self) -> Result<String, JsError> {
        let ctl = &self.controller;
        let out = StateOut {
            clock: ctl.clock().as_secs_f64(),
            sequence: ctl.current_sequence().map(SequenceId::as_str),
            line_index: ctl.current_line_index(),
            playing: ctl.is_playing(),
            walking: ctl.is_walking(),
            story_stage: ctl.story_stage(),
            subtitle: ctl.current_subtitle(),
        };
        serde_json::to_string(&out).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Return a JSON array of sequence IDs.
    pub fn sequences(&self) -> String {
        let ids: Vec<&str> = self.store.sequence_ids().into_iter().map(SequenceId::as_str).collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Return a JSON array of zone (trigger table) names.
    pub fn zones(&self) -> String {
        serde_json::to_string(&self.store.trigger_names()).unwrap_or_else(|_| "[]".to_string())
    }
}

// Private helpers
impl DialoguePlayer {
    fn from_store(store: Arc<SequenceStore>, config: PlaybackConfig) -> Result<Self, JsError> {
        let controller = PlaybackController::builder(store.clone())
            .config(config)
            .locomotion(DemoWalker { travelled: 0.0 })
            .build()
            .map_err(|e| JsError::new(&format!("Config error: {e}")))?;
        Ok(DialoguePlayer {
            store,
            controller,
            zones: HashMap::new(),
        })
    }

    fn ensure_zone(&mut self, zone: &str) -> Result<(), JsError> {
        if !self.zones.contains_key(zone) {
            let dispatcher = self
                .store
                .trigger(zone)
                .ok_or_else(|| JsError::new(&format!("Unknown zone: {zone}")))?
                .clone();
            self.zones.insert(
                zone.to_string(),
                ZoneTrigger::new(zone, dispatcher, ZonePolicy::default()),
            );
        }
        Ok(())
    }

    fn drain_json(&mut self) -> Result<String, JsError> {
        let value = events_to_value(&self.controller.drain_events())?;
        serde_json::to_string(&value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }
}
