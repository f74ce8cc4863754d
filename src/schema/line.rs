//! Dialogue lines — the smallest unit of authored speech.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single spoken line: subtitle text plus optional voice and gesture.
///
/// Lines are authored content and are never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub text: String,
    #[serde(default)]
    pub voice_clip: Option<String>,
    /// How long the subtitle stays up, in seconds. Always positive.
    pub display_duration: f32,
    /// Animator trigger fired as the line starts.
    #[serde(default)]
    pub animation: Option<String>,
}

impl DialogueLine {
    pub fn new(text: impl Into<String>, display_duration: f32) -> Self {
        Self {
            text: text.into(),
            voice_clip: None,
            display_duration,
            animation: None,
        }
    }

    pub fn with_voice(mut self, clip: impl Into<String>) -> Self {
        self.voice_clip = Some(clip.into());
        self
    }

    pub fn with_animation(mut self, trigger: impl Into<String>) -> Self {
        self.animation = Some(trigger.into());
        self
    }

    /// Returns true if the duration is strictly positive and fits in a `Duration`.
    pub fn has_valid_duration(&self) -> bool {
        self.display_duration > 0.0 && Duration::try_from_secs_f32(self.display_duration).is_ok()
    }

    /// The display hold as a `Duration`. Invalid durations collapse to zero.
    pub fn hold(&self) -> Duration {
        if self.display_duration > 0.0 {
            Duration::try_from_secs_f32(self.display_duration).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_builder() {
        let line = DialogueLine::new("Grab the rope!", 2.5)
            .with_voice("rope.ogg")
            .with_animation("Point");
        assert_eq!(line.text, "Grab the rope!");
        assert_eq!(line.voice_clip.as_deref(), Some("rope.ogg"));
        assert_eq!(line.animation.as_deref(), Some("Point"));
        assert_eq!(line.hold(), Duration::from_millis(2500));
    }

    #[test]
    fn invalid_durations() {
        assert!(!DialogueLine::new("", 0.0).has_valid_duration());
        assert!(!DialogueLine::new("", -1.0).has_valid_duration());
        assert!(!DialogueLine::new("", f32::NAN).has_valid_duration());
        assert_eq!(DialogueLine::new("", -1.0).hold(), Duration::ZERO);
    }

    #[test]
    fn oversized_duration_is_invalid() {
        let line = DialogueLine::new("", 1e20);
        assert!(!line.has_valid_duration());
        assert_eq!(line.hold(), Duration::ZERO);
        assert!(!DialogueLine::new("", f32::INFINITY).has_valid_duration());
    }

    #[test]
    fn optional_fields_default_in_ron() {
        let line: DialogueLine = ron::from_str(r#"(text: "Hi", display_duration: 1.0)"#).unwrap();
        assert!(line.voice_clip.is_none());
        assert!(line.animation.is_none());
    }
}
