//! Host-engine collaborators the controller drives: animation, voice,
//! locomotion and subtitles. The host implements these; the controller only
//! ever calls them.

use std::time::Duration;

/// Plays per-line gestures and toggles the walking pose.
pub trait Animator {
    fn set_trigger(&mut self, name: &str);
    fn set_bool(&mut self, name: &str, value: bool);
}

/// A single voice channel. Playing a clip stops whatever was playing.
pub trait VoicePlayer {
    fn play(&mut self, clip: &str);
    fn stop(&mut self);
}

/// Moves the speaker toward named waypoints. Rotation smoothing and the
/// actual transform update stay on the host side.
pub trait Locomotion {
    fn has_waypoint(&self, waypoint: &str) -> bool;
    /// Advance toward `waypoint` for `dt`. Returns true once arrived.
    fn step_towards(&mut self, waypoint: &str, speed: f32, dt: Duration) -> bool;
}

/// Receives subtitle text. An empty string clears the subtitle.
pub trait SubtitleSink {
    fn show(&mut self, text: &str);
}

/// The set of collaborators wired into one controller. Any of them may be
/// missing; the matching step is then skipped.
#[derive(Default)]
pub struct Stage {
    pub animator: Option<Box<dyn Animator>>,
    pub voice: Option<Box<dyn VoicePlayer>>,
    pub locomotion: Option<Box<dyn Locomotion>>,
    pub subtitles: Option<Box<dyn SubtitleSink>>,
}

impl Stage {
    pub(crate) fn trigger_animation(&mut self, name: &str) {
        match self.animator.as_mut() {
            Some(animator) => animator.set_trigger(name),
            None => tracing::debug!("no animator wired; skipping trigger '{}'", name),
        }
    }

    pub(crate) fn set_walking(&mut self, parameter: &str, walking: bool) {
        if let Some(animator) = self.animator.as_mut() {
            animator.set_bool(parameter, walking);
        }
    }

    pub(crate) fn play_voice(&mut self, clip: &str) {
        match self.voice.as_mut() {
            Some(voice) => voice.play(clip),
            None => tracing::debug!("no voice player wired; skipping clip '{}'", clip),
        }
    }

    pub(crate) fn stop_voice(&mut self) {
        if let Some(voice) = self.voice.as_mut() {
            voice.stop();
        }
    }

    pub(crate) fn show_subtitle(&mut self, text: &str) {
        if let Some(sink) = self.subtitles.as_mut() {
            sink.show(text);
        }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("animator", &self.animator.is_some())
            .field("voice", &self.voice.is_some())
            .field("locomotion", &self.locomotion.is_some())
            .field("subtitles", &self.subtitles.is_some())
            .finish()
    }
}
