//! Trigger dispatch — picks a sequence from ordered rules, and gates
//! zone-entry events before handing the pick to a controller.

use serde::{Deserialize, Serialize};

use crate::core::playback::{DialoguePlayback, PlaybackController, PlaybackSnapshot};
use crate::schema::sequence::SequenceId;
use crate::schema::trigger::TriggerRule;

/// An ordered rule list plus an optional fallback sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerDispatcher {
    rules: Vec<TriggerRule>,
    fallback: Option<SequenceId>,
}

impl TriggerDispatcher {
    pub fn new(rules: Vec<TriggerRule>, fallback: Option<SequenceId>) -> Self {
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    pub fn fallback(&self) -> Option<&SequenceId> {
        self.fallback.as_ref()
    }

    /// Pick a sequence for the current playback state.
    ///
    /// `story_stage` comes from the caller and may differ from the
    /// controller's own counter.
    pub fn select<P>(&self, playback: &P, story_stage: u32) -> Option<&SequenceId>
    where
        P: DialoguePlayback + ?Sized,
    {
        let snapshot = PlaybackSnapshot {
            line_index: playback.current_line_index(),
            is_playing: playback.is_playing(),
            story_stage,
        };
        self.select_for(&snapshot)
    }

    /// First matching rule's target wins; otherwise the fallback.
    pub fn select_for(&self, snapshot: &PlaybackSnapshot) -> Option<&SequenceId> {
        match self.rules.iter().find(|rule| rule.matches(snapshot)) {
            Some(rule) => rule.target.as_ref(),
            None => self.fallback.as_ref(),
        }
    }
}

/// How a zone treats repeated entries and live dialogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePolicy {
    /// Dispatch at most once until the latch is re-armed.
    #[serde(default)]
    pub trigger_once: bool,
    /// Cut into live dialogue as an interrupt rather than a plain trigger.
    /// Both dispatch immediately; nothing is queued.
    #[serde(default)]
    pub interrupt_current: bool,
}

/// What a zone entry did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Triggered(SequenceId),
    Interrupted(SequenceId),
    /// The one-shot latch was already set.
    Suppressed,
    /// No rule matched and there is no fallback, the rule had no target,
    /// or the target is missing from the store.
    NoMatch,
}

/// A trigger volume wired to a dispatcher.
#[derive(Debug, Clone)]
pub struct ZoneTrigger {
    name: String,
    dispatcher: TriggerDispatcher,
    policy: ZonePolicy,
    triggered: bool,
}

impl ZoneTrigger {
    pub fn new(name: impl Into<String>, dispatcher: TriggerDispatcher, policy: ZonePolicy) -> Self {
        Self {
            name: name.into(),
            dispatcher,
            policy,
            triggered: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> ZonePolicy {
        self.policy
    }

    pub fn has_triggered(&self) -> bool {
        self.triggered
    }

    /// Re-arm a one-shot zone.
    pub fn reset_latch(&mut self) {
        self.triggered = false;
    }

    /// Handle the player entering the zone.
    pub fn on_enter(&mut self, controller: &mut PlaybackController, story_stage: u32) -> Dispatch {
        if self.policy.trigger_once && self.triggered {
            tracing::debug!("zone '{}' already triggered", self.name);
            return Dispatch::Suppressed;
        }

        let Some(target) = self.dispatcher.select(&*controller, story_stage).cloned() else {
            tracing::debug!("zone '{}' found no sequence for stage {}", self.name, story_stage);
            return Dispatch::NoMatch;
        };
        if !controller.store().contains(&target) {
            tracing::warn!("zone '{}' picked unknown sequence '{}'", self.name, target);
            return Dispatch::NoMatch;
        }
        self.triggered = true;

        if self.policy.interrupt_current && controller.is_playing() {
            tracing::debug!("zone '{}' interrupting with '{}'", self.name, target);
            controller.interrupt_with_sequence(&target);
            Dispatch::Interrupted(target)
        } else {
            tracing::debug!("zone '{}' triggering '{}'", self.name, target);
            controller.trigger_sequence(&target);
            Dispatch::Triggered(target)
        }
    }
}
