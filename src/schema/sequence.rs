//! Dialogue sequences and the IDs that link them into chains.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::line::DialogueLine;

/// Newtype wrapper for sequence IDs. Sequences reference each other by ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceId(pub String);

impl SequenceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SequenceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SequenceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where the speaker walks before (or while) talking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementDirective {
    pub waypoint: String,
    pub speed: f32,
    /// When true, lines start immediately and the walk runs alongside them.
    #[serde(default)]
    pub talk_while_walking: bool,
}

/// An ordered run of lines with an optional walk, story advance and chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueSequence {
    pub id: SequenceId,
    #[serde(default)]
    pub lines: Vec<DialogueLine>,
    #[serde(default)]
    pub movement: Option<MovementDirective>,
    #[serde(default)]
    pub advances_story: bool,
    #[serde(default)]
    pub next: Option<SequenceId>,
}

impl DialogueSequence {
    pub fn new(id: impl Into<SequenceId>) -> Self {
        Self {
            id: id.into(),
            lines: Vec::new(),
            movement: None,
            advances_story: false,
            next: None,
        }
    }

    pub fn with_line(mut self, line: DialogueLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_movement(mut self, waypoint: impl Into<String>, speed: f32, talk_while_walking: bool) -> Self {
        self.movement = Some(MovementDirective {
            waypoint: waypoint.into(),
            speed,
            talk_while_walking,
        });
        self
    }

    pub fn advancing_story(mut self) -> Self {
        self.advances_story = true;
        self
    }

    pub fn then(mut self, next: impl Into<SequenceId>) -> Self {
        self.next = Some(next.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_builder() {
        let seq = DialogueSequence::new("briefing")
            .with_line(DialogueLine::new("Stay close.", 2.0))
            .with_movement("base_camp", 1.5, true)
            .advancing_story()
            .then("ascent");

        assert_eq!(seq.id.as_str(), "briefing");
        assert_eq!(seq.lines.len(), 1);
        assert!(seq.advances_story);
        assert_eq!(seq.next, Some(SequenceId::new("ascent")));
        let movement = seq.movement.unwrap();
        assert_eq!(movement.waypoint, "base_camp");
        assert!(movement.talk_while_walking);
    }

    #[test]
    fn sequence_id_display() {
        assert_eq!(SequenceId::from("summit").to_string(), "summit");
    }
}
