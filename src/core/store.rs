//! Sequence store — authored dialogue content, loading, merging and linting.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::core::dispatcher::TriggerDispatcher;
use crate::schema::line::DialogueLine;
use crate::schema::sequence::{DialogueSequence, MovementDirective, SequenceId};
use crate::schema::trigger::{TriggerCondition, TriggerRule};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("line {line} of sequence '{sequence}' has a display duration that is not a positive number of seconds")]
    InvalidDuration { sequence: SequenceId, line: usize },
}

/// Immutable dialogue content: sequences keyed by ID plus named trigger tables.
#[derive(Debug, Clone, Default)]
pub struct SequenceStore {
    sequences: FxHashMap<SequenceId, DialogueSequence>,
    triggers: FxHashMap<String, TriggerDispatcher>,
}

// RON deserialization helpers. Sequences are keyed by ID in the file, and
// rules are authored flat (kind name plus every parameter) so that unknown
// condition names survive loading instead of failing the whole library.

#[derive(Debug, Deserialize)]
struct RonLibrary {
    #[serde(default)]
    sequences: FxHashMap<String, RonSequence>,
    #[serde(default)]
    triggers: FxHashMap<String, RonTriggerTable>,
}

#[derive(Debug, Deserialize)]
struct RonSequence {
    #[serde(default)]
    lines: Vec<DialogueLine>,
    #[serde(default)]
    movement: Option<MovementDirective>,
    #[serde(default)]
    advances_story: bool,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RonTriggerTable {
    #[serde(default)]
    rules: Vec<RonRule>,
    #[serde(default)]
    fallback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RonRule {
    condition: String,
    #[serde(default)]
    threshold: i32,
    #[serde(default)]
    min: i32,
    #[serde(default)]
    max: i32,
    #[serde(default)]
    stage: u32,
    #[serde(default)]
    target: Option<String>,
}

impl RonRule {
    fn into_rule(self) -> TriggerRule {
        let condition = match self.condition.as_str() {
            "Always" => TriggerCondition::Always,
            "LineIndexBelow" => TriggerCondition::LineIndexBelow {
                threshold: self.threshold,
            },
            "LineIndexAbove" => TriggerCondition::LineIndexAbove {
                threshold: self.threshold,
            },
            "LineIndexRange" => TriggerCondition::LineIndexRange {
                min: self.min,
                max: self.max,
            },
            "StoryStage" => TriggerCondition::StoryStage { stage: self.stage },
            "NotPlaying" => TriggerCondition::NotPlaying,
            "IsPlaying" => TriggerCondition::IsPlaying,
            _ => TriggerCondition::Unknown(self.condition),
        };
        TriggerRule {
            condition,
            target: self.target.map(SequenceId),
        }
    }
}

impl SequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a library from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<SequenceStore, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a library from a RON string.
    pub fn parse_ron(input: &str) -> Result<SequenceStore, StoreError> {
        let raw: RonLibrary = ron::from_str(input)?;
        let mut store = SequenceStore::new();

        for (name, ron_seq) in raw.sequences {
            let sequence = DialogueSequence {
                id: SequenceId(name),
                lines: ron_seq.lines,
                movement: ron_seq.movement,
                advances_story: ron_seq.advances_story,
                next: ron_seq.next.map(SequenceId),
            };
            store.insert(sequence)?;
        }

        for (name, table) in raw.triggers {
            let rules = table.rules.into_iter().map(RonRule::into_rule).collect();
            let dispatcher = TriggerDispatcher::new(rules, table.fallback.map(SequenceId));
            store.triggers.insert(name, dispatcher);
        }

        Ok(store)
    }

    /// Add a sequence, replacing any sequence with the same ID.
    ///
    /// Rejects lines whose display duration is not strictly positive.
    pub fn insert(&mut self, sequence: DialogueSequence) -> Result<(), StoreError> {
        if let Some(line) = sequence.lines.iter().position(|l| !l.has_valid_duration()) {
            return Err(StoreError::InvalidDuration {
                sequence: sequence.id.clone(),
                line,
            });
        }
        self.sequences.insert(sequence.id.clone(), sequence);
        Ok(())
    }

    /// Register a named trigger table, replacing any table with the same name.
    pub fn insert_trigger(&mut self, name: impl Into<String>, dispatcher: TriggerDispatcher) {
        self.triggers.insert(name.into(), dispatcher);
    }

    pub fn get(&self, id: &SequenceId) -> Option<&DialogueSequence> {
        self.sequences.get(id)
    }

    pub fn contains(&self, id: &SequenceId) -> bool {
        self.sequences.contains_key(id)
    }

    pub fn trigger(&self, name: &str) -> Option<&TriggerDispatcher> {
        self.triggers.get(name)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sequence IDs in sorted order.
    pub fn sequence_ids(&self) -> Vec<&SequenceId> {
        let mut ids: Vec<_> = self.sequences.keys().collect();
        ids.sort();
        ids
    }

    /// Trigger table names in sorted order.
    pub fn trigger_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.triggers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Merge another store into this one. Entries from `other` override
    /// entries in `self` with the same ID or name.
    pub fn merge(&mut self, other: SequenceStore) {
        self.sequences.extend(other.sequences);
        self.triggers.extend(other.triggers);
    }

    /// Check the library for authoring mistakes. Issues are sorted so the
    /// report is stable across runs.
    pub fn validate(&self) -> Vec<LibraryIssue> {
        let mut issues = Vec::new();

        for id in self.sequence_ids() {
            let seq = &self.sequences[id];
            if seq.lines.is_empty() {
                issues.push(LibraryIssue::warning(
                    format!("sequence '{}'", id),
                    "has no lines; only movement, story advance and chaining will run",
                ));
            }
            if let Some(next) = &seq.next {
                if !self.contains(next) {
                    issues.push(LibraryIssue::error(
                        format!("sequence '{}'", id),
                        format!("chains to unknown sequence '{}'", next),
                    ));
                }
            }
            if let Some(movement) = &seq.movement {
                if !(movement.speed.is_finite() && movement.speed > 0.0) {
                    issues.push(LibraryIssue::warning(
                        format!("sequence '{}'", id),
                        format!("walks to '{}' with non-positive speed", movement.waypoint),
                    ));
                }
            }
            if self.chain_cycles_back(id) {
                issues.push(LibraryIssue::warning(
                    format!("sequence '{}'", id),
                    "chain loops back on itself and will never go idle",
                ));
            }
        }

        for name in self.trigger_names() {
            let table = &self.triggers[name];
            for (i, rule) in table.rules().iter().enumerate() {
                let location = format!("trigger '{}' rule {}", name, i);
                match &rule.condition {
                    TriggerCondition::Unknown(kind) => issues.push(LibraryIssue::error(
                        location.clone(),
                        format!("unknown condition '{}' never matches", kind),
                    )),
                    TriggerCondition::LineIndexRange { min, max } if min > max => {
                        issues.push(LibraryIssue::warning(
                            location.clone(),
                            format!("range {}..={} is empty", min, max),
                        ))
                    }
                    _ => {}
                }
                match &rule.target {
                    Some(target) if !self.contains(target) => issues.push(LibraryIssue::error(
                        location,
                        format!("targets unknown sequence '{}'", target),
                    )),
                    None => issues.push(LibraryIssue::warning(location, "has no target sequence")),
                    _ => {}
                }
            }
            if let Some(fallback) = table.fallback() {
                if !self.contains(fallback) {
                    issues.push(LibraryIssue::error(
                        format!("trigger '{}'", name),
                        format!("falls back to unknown sequence '{}'", fallback),
                    ));
                }
            }
        }

        issues
    }

    /// Walks the `next` chain from `start`; true if it revisits `start`.
    fn chain_cycles_back(&self, start: &SequenceId) -> bool {
        let mut seen = FxHashSet::default();
        let mut current = self.sequences.get(start).and_then(|s| s.next.as_ref());
        while let Some(id) = current {
            if id == start {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.sequences.get(id).and_then(|s| s.next.as_ref());
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One authoring problem found by [`SequenceStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryIssue {
    pub severity: Severity,
    pub location: String,
    pub message: String,
}

impl LibraryIssue {
    fn error(location: String, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location,
            message: message.into(),
        }
    }

    fn warning(location: String, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for LibraryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        write!(f, "{}: {} {}", level, self.location, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"(
        sequences: {
            "greeting": (
                lines: [
                    (text: "Hello", display_duration: 2.0, voice_clip: Some("hello.ogg")),
                    (text: "Need a hand?", display_duration: 1.5, animation: Some("Wave")),
                ],
                advances_story: true,
                next: Some("directions"),
            ),
            "directions": (
                lines: [(text: "Follow me.", display_duration: 1.0)],
                movement: Some((waypoint: "ridge", speed: 2.0, talk_while_walking: true)),
            ),
        },
        triggers: {
            "trailhead": (
                rules: [
                    (condition: "StoryStage", stage: 1, target: Some("directions")),
                    (condition: "LineIndexRange", min: 0, max: 1, target: Some("greeting")),
                    (condition: "Weather", target: Some("greeting")),
                ],
                fallback: Some("greeting"),
            ),
        },
    )"#;

    #[test]
    fn parse_library() {
        let store = SequenceStore::parse_ron(LIBRARY).unwrap();
        assert_eq!(store.len(), 2);

        let greeting = store.get(&SequenceId::new("greeting")).unwrap();
        assert_eq!(greeting.lines.len(), 2);
        assert_eq!(greeting.lines[0].voice_clip.as_deref(), Some("hello.ogg"));
        assert_eq!(greeting.lines[1].animation.as_deref(), Some("Wave"));
        assert!(greeting.advances_story);
        assert_eq!(greeting.next, Some(SequenceId::new("directions")));

        let directions = store.get(&SequenceId::new("directions")).unwrap();
        let movement = directions.movement.as_ref().unwrap();
        assert_eq!(movement.waypoint, "ridge");
        assert!(movement.talk_while_walking);
        assert!(!directions.advances_story);
    }

    #[test]
    fn parse_rules_in_order() {
        let store = SequenceStore::parse_ron(LIBRARY).unwrap();
        let table = store.trigger("trailhead").unwrap();
        let rules = table.rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].condition, TriggerCondition::StoryStage { stage: 1 });
        assert_eq!(
            rules[1].condition,
            TriggerCondition::LineIndexRange { min: 0, max: 1 }
        );
        assert_eq!(rules[2].condition, TriggerCondition::Unknown("Weather".to_string()));
        assert_eq!(table.fallback(), Some(&SequenceId::new("greeting")));
    }

    #[test]
    fn parse_rejects_zero_duration() {
        let input = r#"(sequences: { "bad": (lines: [(text: "x", display_duration: 0.0)]) })"#;
        let err = SequenceStore::parse_ron(input).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDuration { line: 0, .. }));
    }

    #[test]
    fn parse_rejects_oversized_duration() {
        let input = r#"(sequences: { "long": (lines: [(text: "x", display_duration: 1e20)]) })"#;
        let err = SequenceStore::parse_ron(input).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDuration { line: 0, .. }));
    }

    #[test]
    fn parse_malformed_ron() {
        assert!(matches!(
            SequenceStore::parse_ron("(sequences: {"),
            Err(StoreError::Ron(_))
        ));
    }

    #[test]
    fn merge_precedence() {
        let mut base = SequenceStore::new();
        base.insert(DialogueSequence::new("shared").with_line(DialogueLine::new("base", 1.0)))
            .unwrap();
        base.insert(DialogueSequence::new("base_only")).unwrap();

        let mut overlay = SequenceStore::new();
        overlay
            .insert(DialogueSequence::new("shared").with_line(DialogueLine::new("override", 1.0)))
            .unwrap();

        base.merge(overlay);

        assert_eq!(base.get(&SequenceId::new("shared")).unwrap().lines[0].text, "override");
        assert!(base.contains(&SequenceId::new("base_only")));
    }

    #[test]
    fn validate_clean_library_has_only_expected_issues() {
        let store = SequenceStore::parse_ron(LIBRARY).unwrap();
        let issues = store.validate();
        assert_eq!(issues.len(), 1, "{:?}", issues);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("Weather"));
    }

    #[test]
    fn validate_reports_dangling_and_cycles() {
        let mut store = SequenceStore::new();
        store.insert(DialogueSequence::new("a").then("b")).unwrap();
        store.insert(DialogueSequence::new("b").then("a")).unwrap();
        store.insert(DialogueSequence::new("c").then("missing")).unwrap();
        store.insert_trigger(
            "zone",
            TriggerDispatcher::new(
                vec![TriggerRule::new(TriggerCondition::Always, "nowhere")],
                Some(SequenceId::new("also_nowhere")),
            ),
        );

        let issues = store.validate();
        let errors: Vec<_> = issues.iter().filter(|i| i.severity == Severity::Error).collect();
        assert_eq!(errors.len(), 3, "{:?}", issues);
        assert!(errors.iter().any(|i| i.message.contains("'missing'")));
        assert!(errors.iter().any(|i| i.message.contains("'nowhere'")));
        assert!(errors.iter().any(|i| i.message.contains("'also_nowhere'")));

        let loops = issues.iter().filter(|i| i.message.contains("loops back")).count();
        assert_eq!(loops, 2);
    }

    #[test]
    fn load_fixture_library() {
        let path = std::path::PathBuf::from("tests/fixtures/rescue_dialogue.ron");
        let store = SequenceStore::load_from_ron(&path).unwrap();
        assert!(store.contains(&SequenceId::new("guide_intro")));
        assert!(store.trigger("base_camp").is_some());
        assert!(store
            .validate()
            .iter()
            .all(|issue| issue.severity != Severity::Error));
    }
}
