//! Trigger rules: a condition over playback state plus the sequence to play.

use serde::{Deserialize, Serialize};

use super::sequence::SequenceId;

/// The predicate a trigger rule checks against the playback snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerCondition {
    Always,
    /// Current line index is strictly below `threshold`.
    LineIndexBelow { threshold: i32 },
    /// Current line index is at or above `threshold`.
    LineIndexAbove { threshold: i32 },
    /// Current line index lies in `min..=max`.
    LineIndexRange { min: i32, max: i32 },
    /// Story stage equals `stage` exactly.
    StoryStage { stage: u32 },
    NotPlaying,
    IsPlaying,
    /// A condition name this build does not recognise. Never matches.
    Unknown(String),
}

impl TriggerCondition {
    /// Returns the authored name of this condition kind.
    pub fn name(&self) -> &str {
        match self {
            Self::Always => "Always",
            Self::LineIndexBelow { .. } => "LineIndexBelow",
            Self::LineIndexAbove { .. } => "LineIndexAbove",
            Self::LineIndexRange { .. } => "LineIndexRange",
            Self::StoryStage { .. } => "StoryStage",
            Self::NotPlaying => "NotPlaying",
            Self::IsPlaying => "IsPlaying",
            Self::Unknown(name) => name,
        }
    }
}

/// An ordered predicate-to-sequence mapping. Rules are evaluated
/// first-match-wins, so their position in a table is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub condition: TriggerCondition,
    /// `None` when the designer left the slot empty; a match then plays nothing.
    pub target: Option<SequenceId>,
}

impl TriggerRule {
    pub fn new(condition: TriggerCondition, target: impl Into<SequenceId>) -> Self {
        Self {
            condition,
            target: Some(target.into()),
        }
    }
}
