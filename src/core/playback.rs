//! Playback controller — drives one sequence-walk at a time through
//! movement, lines, story advance and chaining.
//!
//! The host calls [`PlaybackController::tick`] once per frame. Every hold
//! (waiting for a walk to arrive, a line on screen, the gap between lines)
//! is a suspension point: triggering a new sequence while one is held drops
//! the rest of the old walk on the spot.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{ConfigError, PlaybackConfig};
use crate::core::stage::{Animator, Locomotion, Stage, SubtitleSink, VoicePlayer};
use crate::core::store::SequenceStore;
use crate::schema::sequence::{DialogueSequence, MovementDirective, SequenceId};

/// Line index reported while nothing is being said.
pub const IDLE_LINE_INDEX: i32 = -1;

/// Zero-time transitions allowed in one scheduler pass before yielding.
/// Only a chain cycle of empty, instant sequences gets anywhere near this.
const MAX_ZERO_TIME_STEPS: usize = 1024;

/// Read-only view of playback used by trigger rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub line_index: i32,
    pub is_playing: bool,
    pub story_stage: u32,
}

impl PlaybackSnapshot {
    pub fn idle(story_stage: u32) -> Self {
        Self {
            line_index: IDLE_LINE_INDEX,
            is_playing: false,
            story_stage,
        }
    }
}

/// The query surface other systems may read from a controller.
pub trait DialoguePlayback {
    /// Index of the line being presented, or [`IDLE_LINE_INDEX`].
    fn current_line_index(&self) -> i32;
    /// True for the whole sequence-walk, chained continuations included.
    fn is_playing(&self) -> bool;
    fn story_stage(&self) -> u32;

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            line_index: self.current_line_index(),
            is_playing: self.is_playing(),
            story_stage: self.story_stage(),
        }
    }
}

/// Something observable the controller did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlaybackEventKind {
    SequenceStarted(SequenceId),
    MovementStarted { waypoint: String },
    MovementArrived { waypoint: String },
    /// The walk timed out, or was cut short by a new trigger, stop or reset.
    MovementAbandoned { waypoint: String },
    AnimationTriggered(String),
    /// Empty text means the subtitle was cleared.
    SubtitleChanged(String),
    VoicePlayed(String),
    StoryAdvanced { stage: u32 },
    SequenceCompleted(SequenceId),
    Chained { from: SequenceId, to: SequenceId },
    /// A walk was cancelled by a new trigger.
    Interrupted(SequenceId),
    /// A walk was cancelled by [`PlaybackController::stop`].
    Stopped(SequenceId),
    Idle,
}

/// A [`PlaybackEventKind`] stamped with the controller clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackEvent {
    pub at: Duration,
    pub kind: PlaybackEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Lines are gated on the walk reaching its waypoint.
    AwaitingArrival,
    /// About to present this line.
    Present(usize),
    Speaking { line: usize, remaining: Duration },
    Pausing { line: usize, remaining: Duration },
    Completing,
}

#[derive(Debug)]
struct Walk {
    sequence: SequenceId,
    phase: Phase,
}

#[derive(Debug)]
struct ActiveMove {
    waypoint: String,
    speed: f32,
    elapsed: Duration,
}

/// Plays dialogue sequences from a shared [`SequenceStore`].
/// Built via `PlaybackController::builder()`.
#[derive(Debug)]
pub struct PlaybackController {
    store: Arc<SequenceStore>,
    config: PlaybackConfig,
    stage: Stage,
    walk: Option<Walk>,
    movement: Option<ActiveMove>,
    line_index: i32,
    story_stage: u32,
    is_walking: bool,
    subtitle: String,
    clock: Duration,
    events: Vec<PlaybackEvent>,
}

/// Builder for constructing a `PlaybackController`.
pub struct PlaybackControllerBuilder {
    store: Arc<SequenceStore>,
    config: PlaybackConfig,
    stage: Stage,
    story_stage: u32,
}

impl PlaybackControllerBuilder {
    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn animator(mut self, animator: impl Animator + 'static) -> Self {
        self.stage.animator = Some(Box::new(animator));
        self
    }

    pub fn voice(mut self, voice: impl VoicePlayer + 'static) -> Self {
        self.stage.voice = Some(Box::new(voice));
        self
    }

    pub fn locomotion(mut self, locomotion: impl Locomotion + 'static) -> Self {
        self.stage.locomotion = Some(Box::new(locomotion));
        self
    }

    pub fn subtitles(mut self, sink: impl SubtitleSink + 'static) -> Self {
        self.stage.subtitles = Some(Box::new(sink));
        self
    }

    /// Start from a saved story stage instead of zero.
    pub fn story_stage(mut self, stage: u32) -> Self {
        self.story_stage = stage;
        self
    }

    pub fn build(self) -> Result<PlaybackController, ConfigError> {
        self.config.validate()?;
        Ok(PlaybackController {
            store: self.store,
            config: self.config,
            stage: self.stage,
            walk: None,
            movement: None,
            line_index: IDLE_LINE_INDEX,
            story_stage: self.story_stage,
            is_walking: false,
            subtitle: String::new(),
            clock: Duration::ZERO,
            events: Vec::new(),
        })
    }
}

impl PlaybackController {
    pub fn builder(store: Arc<SequenceStore>) -> PlaybackControllerBuilder {
        PlaybackControllerBuilder {
            store,
            config: PlaybackConfig::default(),
            stage: Stage::default(),
            story_stage: 0,
        }
    }

    /// Start `id` from the top, cancelling whatever is playing.
    ///
    /// An unknown ID is logged and ignored; the current walk keeps going.
    pub fn trigger_sequence(&mut self, id: &SequenceId) {
        if !self.store.contains(id) {
            tracing::warn!("cannot trigger unknown sequence '{}'", id);
            return;
        }
        if let Some(old) = self.cancel_walk() {
            tracing::debug!("sequence '{}' cancelled by '{}'", old, id);
            self.emit(PlaybackEventKind::Interrupted(old));
        }
        self.begin(id.clone());
        self.run(Duration::ZERO);
    }

    /// Same as [`trigger_sequence`](Self::trigger_sequence); used by callers
    /// that mean to cut into live dialogue.
    pub fn interrupt_with_sequence(&mut self, id: &SequenceId) {
        if let Some(current) = self.current_sequence() {
            tracing::debug!("interrupting '{}' with '{}'", current, id);
        }
        self.trigger_sequence(id);
    }

    /// Cancel the active walk, clear the subtitle and voice, and go idle.
    pub fn stop(&mut self) {
        let Some(old) = self.cancel_walk() else {
            return;
        };
        tracing::debug!("sequence '{}' stopped", old);
        self.emit(PlaybackEventKind::Stopped(old));
        if !self.subtitle.is_empty() {
            self.set_subtitle("");
        }
        self.stage.stop_voice();
        self.emit(PlaybackEventKind::Idle);
    }

    /// Designer reset: stop everything and rewind the story stage to zero.
    pub fn reset(&mut self) {
        self.stop();
        self.abandon_movement();
        tracing::info!("story stage reset from {}", self.story_stage);
        self.story_stage = 0;
    }

    /// Advance the scheduler by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        let end = self.clock + dt;
        let gated = matches!(
            self.walk.as_ref().map(|w| w.phase),
            Some(Phase::AwaitingArrival)
        );
        if !gated {
            // A talk-while-walking move runs alongside the lines.
            self.advance_movement(dt);
        }
        self.run(dt);
        self.clock = end;
    }

    pub fn is_walking(&self) -> bool {
        self.is_walking
    }

    pub fn current_subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn current_sequence(&self) -> Option<&SequenceId> {
        self.walk.as_ref().map(|w| &w.sequence)
    }

    /// Total time this controller has been ticked.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SequenceStore> {
        &self.store
    }

    /// Events recorded since the last drain.
    pub fn events(&self) -> &[PlaybackEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, kind: PlaybackEventKind) {
        self.emit_at(self.clock, kind);
    }

    fn emit_at(&mut self, at: Duration, kind: PlaybackEventKind) {
        self.events.push(PlaybackEvent { at, kind });
    }

    fn set_subtitle(&mut self, text: &str) {
        self.subtitle.clear();
        self.subtitle.push_str(text);
        self.stage.show_subtitle(text);
        self.emit(PlaybackEventKind::SubtitleChanged(text.to_string()));
    }

    fn set_phase(&mut self, phase: Phase) {
        if let Some(walk) = self.walk.as_mut() {
            walk.phase = phase;
        }
    }

    /// Drop the active walk without running its completion or chain.
    fn cancel_walk(&mut self) -> Option<SequenceId> {
        self.abandon_movement();
        let walk = self.walk.take()?;
        self.line_index = IDLE_LINE_INDEX;
        Some(walk.sequence)
    }

    fn begin(&mut self, id: SequenceId) {
        let store = Arc::clone(&self.store);
        let Some(sequence) = store.get(&id) else {
            tracing::warn!("sequence '{}' not found; going idle", id);
            self.finish_idle();
            return;
        };

        self.line_index = IDLE_LINE_INDEX;
        self.emit(PlaybackEventKind::SequenceStarted(id.clone()));
        tracing::debug!("sequence '{}' started", id);

        if sequence.lines.is_empty() {
            tracing::warn!("sequence '{}' has no lines", id);
        }

        let phase = match &sequence.movement {
            Some(movement) if self.start_movement(movement) && !movement.talk_while_walking => {
                Phase::AwaitingArrival
            }
            _ => first_phase(sequence),
        };
        self.walk = Some(Walk {
            sequence: id,
            phase,
        });
    }

    fn start_movement(&mut self, movement: &MovementDirective) -> bool {
        match self.stage.locomotion.as_ref() {
            None => {
                tracing::warn!(
                    "no locomotion wired; skipping walk to '{}'",
                    movement.waypoint
                );
                return false;
            }
            Some(locomotion) if !locomotion.has_waypoint(&movement.waypoint) => {
                tracing::warn!("waypoint '{}' not found; skipping walk", movement.waypoint);
                return false;
            }
            Some(_) => {}
        }

        if let Some(previous) = self.movement.take() {
            tracing::debug!("walk to '{}' replaced", previous.waypoint);
            self.emit(PlaybackEventKind::MovementAbandoned {
                waypoint: previous.waypoint,
            });
        }

        self.movement = Some(ActiveMove {
            waypoint: movement.waypoint.clone(),
            speed: movement.speed,
            elapsed: Duration::ZERO,
        });
        self.is_walking = true;
        self.stage.set_walking(&self.config.walking_parameter, true);
        self.emit(PlaybackEventKind::MovementStarted {
            waypoint: movement.waypoint.clone(),
        });
        true
    }

    /// Step the active move by at most `budget`. Returns the time consumed,
    /// which is less than `budget` only when the timeout cut it short.
    fn advance_movement(&mut self, budget: Duration) -> Duration {
        let timeout = self.config.movement_timeout();
        let Some(movement) = self.movement.as_mut() else {
            return Duration::ZERO;
        };

        let left = timeout.saturating_sub(movement.elapsed);
        if left.is_zero() {
            self.end_movement(false, self.clock);
            return Duration::ZERO;
        }
        if budget.is_zero() {
            return Duration::ZERO;
        }

        let step = budget.min(left);
        let arrived = match self.stage.locomotion.as_mut() {
            Some(locomotion) => locomotion.step_towards(&movement.waypoint, movement.speed, step),
            None => true,
        };
        movement.elapsed += step;
        let timed_out = movement.elapsed >= timeout;

        if arrived {
            self.end_movement(true, self.clock + step);
        } else if timed_out {
            tracing::debug!("walk timed out after {:?}; continuing without it", timeout);
            self.end_movement(false, self.clock + step);
        }
        step
    }

    fn end_movement(&mut self, arrived: bool, at: Duration) {
        let Some(movement) = self.movement.take() else {
            return;
        };
        self.is_walking = false;
        self.stage.set_walking(&self.config.walking_parameter, false);
        let waypoint = movement.waypoint;
        let kind = if arrived {
            PlaybackEventKind::MovementArrived { waypoint }
        } else {
            PlaybackEventKind::MovementAbandoned { waypoint }
        };
        self.emit_at(at, kind);
    }

    fn abandon_movement(&mut self) {
        if let Some(movement) = self.movement.take() {
            tracing::debug!("walk to '{}' abandoned", movement.waypoint);
            self.emit(PlaybackEventKind::MovementAbandoned {
                waypoint: movement.waypoint,
            });
        }
        if self.is_walking {
            self.is_walking = false;
            self.stage.set_walking(&self.config.walking_parameter, false);
        }
    }

    /// Run the active walk forward through `budget` of time, carrying any
    /// time left over from one hold into the next step.
    fn run(&mut self, budget: Duration) {
        let store = Arc::clone(&self.store);
        let mut budget = budget;
        let mut zero_time_steps = 0;

        loop {
            let Some((id, phase)) = self.walk.as_ref().map(|w| (w.sequence.clone(), w.phase))
            else {
                break;
            };
            let Some(sequence) = store.get(&id) else {
                tracing::warn!("sequence '{}' vanished from the store", id);
                self.finish_idle();
                break;
            };

            let before = budget;
            match phase {
                Phase::AwaitingArrival => {
                    if self.movement.is_some() {
                        let used = self.advance_movement(budget);
                        self.clock += used;
                        budget -= used;
                        if self.movement.is_some() {
                            break;
                        }
                    }
                    self.set_phase(first_phase(sequence));
                }
                Phase::Present(line) => self.present_line(sequence, line),
                Phase::Speaking { line, remaining } => {
                    if let Some(left) = self.hold(remaining, &mut budget) {
                        self.set_phase(Phase::Speaking { line, remaining: left });
                        break;
                    }
                    self.set_subtitle("");
                    if line + 1 < sequence.lines.len() {
                        let delay = self.config.line_delay();
                        self.set_phase(Phase::Pausing {
                            line,
                            remaining: delay,
                        });
                    } else {
                        self.set_phase(Phase::Completing);
                    }
                }
                Phase::Pausing { line, remaining } => {
                    if let Some(left) = self.hold(remaining, &mut budget) {
                        self.set_phase(Phase::Pausing { line, remaining: left });
                        break;
                    }
                    self.set_phase(Phase::Present(line + 1));
                }
                Phase::Completing => self.complete(sequence),
            }

            if budget == before {
                zero_time_steps += 1;
                if zero_time_steps > MAX_ZERO_TIME_STEPS {
                    tracing::warn!("sequence '{}' is looping without taking time; yielding", id);
                    break;
                }
            } else {
                zero_time_steps = 0;
            }
        }

        self.clock += budget;
    }

    /// Spend up to `remaining` of `budget`. Returns what is still left to
    /// wait, or `None` once the hold is over.
    fn hold(&mut self, remaining: Duration, budget: &mut Duration) -> Option<Duration> {
        if remaining > *budget {
            self.clock += *budget;
            let left = remaining - *budget;
            *budget = Duration::ZERO;
            Some(left)
        } else {
            self.clock += remaining;
            *budget -= remaining;
            None
        }
    }

    fn present_line(&mut self, sequence: &DialogueSequence, index: usize) {
        let line = &sequence.lines[index];
        self.line_index = index as i32;

        if let Some(trigger) = &line.animation {
            self.stage.trigger_animation(trigger);
            self.emit(PlaybackEventKind::AnimationTriggered(trigger.clone()));
        }
        self.set_subtitle(&line.text);
        if let Some(clip) = &line.voice_clip {
            self.stage.play_voice(clip);
            self.emit(PlaybackEventKind::VoicePlayed(clip.clone()));
        }

        self.set_phase(Phase::Speaking {
            line: index,
            remaining: line.hold(),
        });
    }

    fn complete(&mut self, sequence: &DialogueSequence) {
        if sequence.advances_story {
            self.story_stage += 1;
            tracing::info!(
                "sequence '{}' advanced story to stage {}",
                sequence.id,
                self.story_stage
            );
            self.emit(PlaybackEventKind::StoryAdvanced {
                stage: self.story_stage,
            });
        }
        self.emit(PlaybackEventKind::SequenceCompleted(sequence.id.clone()));

        match &sequence.next {
            Some(next) => {
                tracing::debug!("sequence '{}' chains to '{}'", sequence.id, next);
                self.emit(PlaybackEventKind::Chained {
                    from: sequence.id.clone(),
                    to: next.clone(),
                });
                self.begin(next.clone());
            }
            None => self.finish_idle(),
        }
    }

    fn finish_idle(&mut self) {
        self.walk = None;
        self.line_index = IDLE_LINE_INDEX;
        self.emit(PlaybackEventKind::Idle);
    }
}

fn first_phase(sequence: &DialogueSequence) -> Phase {
    if sequence.lines.is_empty() {
        Phase::Completing
    } else {
        Phase::Present(0)
    }
}

impl DialoguePlayback for PlaybackController {
    fn current_line_index(&self) -> i32 {
        self.line_index
    }

    fn is_playing(&self) -> bool {
        self.walk.is_some()
    }

    fn story_stage(&self) -> u32 {
        self.story_stage
    }
}
