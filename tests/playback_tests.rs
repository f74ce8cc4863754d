/// Playback integration tests — fixture library, zone dispatch and walks.

use dialogue_engine::core::dispatcher::{Dispatch, ZonePolicy, ZoneTrigger};
use dialogue_engine::core::playback::{
    DialoguePlayback, PlaybackController, PlaybackEventKind, IDLE_LINE_INDEX,
};
use dialogue_engine::core::stage::Locomotion;
use dialogue_engine::core::store::SequenceStore;
use dialogue_engine::schema::sequence::SequenceId;
use std::sync::Arc;
use std::time::Duration;

/// Knows the fixture's waypoints and arrives on the first step.
struct Teleporter;

impl Locomotion for Teleporter {
    fn has_waypoint(&self, waypoint: &str) -> bool {
        matches!(waypoint, "trailhead" | "ridge")
    }

    fn step_towards(&mut self, _waypoint: &str, _speed: f32, _dt: Duration) -> bool {
        true
    }
}

fn load_store() -> Arc<SequenceStore> {
    let path = std::path::Path::new("tests/fixtures/rescue_dialogue.ron");
    Arc::new(SequenceStore::load_from_ron(path).unwrap())
}

fn zone(store: &SequenceStore, name: &str, policy: ZonePolicy) -> ZoneTrigger {
    ZoneTrigger::new(name, store.trigger(name).unwrap().clone(), policy)
}

fn controller(store: Arc<SequenceStore>) -> PlaybackController {
    PlaybackController::builder(store)
        .locomotion(Teleporter)
        .build()
        .unwrap()
}

fn secs(s: f32) -> Duration {
    Duration::from_secs_f32(s)
}

#[test]
fn rescue_walkthrough() {
    let store = load_store();
    let mut ctl = controller(store.clone());
    let mut base_camp = zone(
        &store,
        "base_camp",
        ZonePolicy {
            trigger_once: true,
            interrupt_current: false,
        },
    );
    let mut ridge = zone(&store, "ridge", ZonePolicy::default());
    let mut summit = zone(&store, "summit", ZonePolicy::default());

    // Base camp at stage 0 plays the intro, which chains into the walk.
    let stage = ctl.story_stage();
    assert_eq!(
        base_camp.on_enter(&mut ctl, stage),
        Dispatch::Triggered(SequenceId::new("guide_intro"))
    );
    assert_eq!(ctl.current_subtitle(), "You made it to base camp.");

    // The one-shot latch holds even when the caller's stage would match.
    assert_eq!(base_camp.on_enter(&mut ctl, 0), Dispatch::Suppressed);

    ctl.tick(secs(5.0));
    assert_eq!(ctl.story_stage(), 1);
    assert_eq!(ctl.current_sequence(), Some(&SequenceId::new("guide_walk")));
    assert_eq!(ctl.current_subtitle(), "Stay on the marked trail.");
    assert!(ctl.is_playing());

    ctl.tick(secs(2.0));
    assert!(!ctl.is_playing());
    assert!(!ctl.is_walking());

    // Idle at the ridge: walk there first, then warn.
    let stage = ctl.story_stage();
    assert_eq!(
        ridge.on_enter(&mut ctl, stage),
        Dispatch::Triggered(SequenceId::new("ridge_warning"))
    );
    assert!(ctl.is_walking());
    assert_eq!(ctl.current_line_index(), IDLE_LINE_INDEX);
    ctl.tick(secs(0.1));
    assert!(!ctl.is_walking());
    assert_eq!(ctl.current_subtitle(), "Careful, the ridge is icy.");
    ctl.tick(secs(1.5));
    assert_eq!(ctl.story_stage(), 2);

    let stage = ctl.story_stage();
    assert_eq!(
        summit.on_enter(&mut ctl, stage),
        Dispatch::Triggered(SequenceId::new("summit_briefing"))
    );
    ctl.tick(secs(10.0));
    assert_eq!(ctl.story_stage(), 3);
    assert!(!ctl.is_playing());
}

#[test]
fn chained_intro_event_order() {
    let store = load_store();
    let mut ctl = controller(store);
    ctl.trigger_sequence(&SequenceId::new("guide_intro"));
    ctl.tick(secs(8.0));

    let kinds: Vec<_> = ctl.drain_events().into_iter().map(|e| e.kind).collect();
    let position = |kind: &PlaybackEventKind| kinds.iter().position(|k| k == kind).unwrap();

    let voice = position(&PlaybackEventKind::VoicePlayed("guide_intro_1.ogg".to_string()));
    let point = position(&PlaybackEventKind::AnimationTriggered("Point".to_string()));
    let advanced = position(&PlaybackEventKind::StoryAdvanced { stage: 1 });
    let chained = position(&PlaybackEventKind::Chained {
        from: SequenceId::new("guide_intro"),
        to: SequenceId::new("guide_walk"),
    });
    let walk = position(&PlaybackEventKind::MovementStarted {
        waypoint: "trailhead".to_string(),
    });
    assert!(voice < point);
    assert!(point < advanced);
    assert!(advanced < chained);
    assert!(chained < walk);
    assert_eq!(kinds.last(), Some(&PlaybackEventKind::Idle));
    assert_eq!(
        kinds.iter().filter(|k| **k == PlaybackEventKind::Idle).count(),
        1
    );
}

#[test]
fn ridge_mid_intro_picks_line_rule() {
    let store = load_store();
    let mut ctl = controller(store.clone());
    let mut ridge = zone(&store, "ridge", ZonePolicy::default());

    ctl.trigger_sequence(&SequenceId::new("guide_intro"));
    ctl.tick(secs(2.5));
    assert_eq!(ctl.current_line_index(), 1);

    let stage = ctl.story_stage();
    assert_eq!(
        ridge.on_enter(&mut ctl, stage),
        Dispatch::Triggered(SequenceId::new("hurry_up"))
    );
    ctl.tick(secs(10.0));
    // The intro was cut off before completing, so no story advance.
    assert_eq!(ctl.story_stage(), 0);
}

#[test]
fn interrupting_zone_reports_interrupt() {
    let store = load_store();
    let mut ctl = controller(store.clone());
    let mut base_camp = zone(
        &store,
        "base_camp",
        ZonePolicy {
            trigger_once: false,
            interrupt_current: true,
        },
    );

    assert_eq!(
        base_camp.on_enter(&mut ctl, 0),
        Dispatch::Triggered(SequenceId::new("guide_intro"))
    );
    // Caller-supplied stage 1 skips the intro rule; IsPlaying matches next.
    assert_eq!(
        base_camp.on_enter(&mut ctl, 1),
        Dispatch::Interrupted(SequenceId::new("hurry_up"))
    );
    assert_eq!(ctl.current_sequence(), Some(&SequenceId::new("hurry_up")));
    assert!(ctl
        .events()
        .iter()
        .any(|e| e.kind == PlaybackEventKind::Interrupted(SequenceId::new("guide_intro"))));
}

#[test]
fn external_stage_may_diverge() {
    let store = load_store();
    let mut ctl = controller(store.clone());
    let mut summit = zone(&store, "summit", ZonePolicy::default());

    // The controller is at stage 0, but the caller claims stage 2.
    assert_eq!(
        summit.on_enter(&mut ctl, 2),
        Dispatch::Triggered(SequenceId::new("summit_briefing"))
    );
    ctl.stop();

    // Idle and the caller's stage matches nothing: LineIndexBelow(0) matches
    // the idle index and plays the empty checkpoint, which still advances.
    assert_eq!(
        summit.on_enter(&mut ctl, 7),
        Dispatch::Triggered(SequenceId::new("checkpoint"))
    );
    assert_eq!(ctl.story_stage(), 1);
    assert!(!ctl.is_playing());
}

#[test]
fn zone_without_match_does_nothing() {
    let store = load_store();
    let mut ctl = controller(store.clone());
    let mut summit = zone(&store, "summit", ZonePolicy::default());

    ctl.trigger_sequence(&SequenceId::new("hurry_up"));
    // Playing at line 0 with stage 5: neither rule matches, no fallback.
    assert_eq!(summit.on_enter(&mut ctl, 5), Dispatch::NoMatch);
    assert_eq!(ctl.current_sequence(), Some(&SequenceId::new("hurry_up")));
    assert!(!summit.has_triggered());
}

#[test]
fn latch_can_be_rearmed() {
    let store = load_store();
    let mut ctl = controller(store.clone());
    let mut base_camp = zone(
        &store,
        "base_camp",
        ZonePolicy {
            trigger_once: true,
            interrupt_current: false,
        },
    );

    assert!(matches!(base_camp.on_enter(&mut ctl, 0), Dispatch::Triggered(_)));
    assert_eq!(base_camp.on_enter(&mut ctl, 0), Dispatch::Suppressed);
    base_camp.reset_latch();
    assert!(matches!(base_camp.on_enter(&mut ctl, 0), Dispatch::Triggered(_)));
}
