//! Trigger rule evaluation — pure predicates over a playback snapshot.

use crate::core::playback::PlaybackSnapshot;
use crate::schema::trigger::{TriggerCondition, TriggerRule};

/// Evaluate `condition` against `snapshot`. Unknown conditions never match.
pub fn evaluate(condition: &TriggerCondition, snapshot: &PlaybackSnapshot) -> bool {
    let index = snapshot.line_index;
    match condition {
        TriggerCondition::Always => true,
        TriggerCondition::LineIndexBelow { threshold } => index < *threshold,
        TriggerCondition::LineIndexAbove { threshold } => index >= *threshold,
        TriggerCondition::LineIndexRange { min, max } => (*min..=*max).contains(&index),
        TriggerCondition::StoryStage { stage } => snapshot.story_stage == *stage,
        TriggerCondition::NotPlaying => !snapshot.is_playing,
        TriggerCondition::IsPlaying => snapshot.is_playing,
        TriggerCondition::Unknown(_) => false,
    }
}

impl TriggerRule {
    pub fn matches(&self, snapshot: &PlaybackSnapshot) -> bool {
        evaluate(&self.condition, snapshot)
    }
}
