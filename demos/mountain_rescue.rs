/// Mountain Rescue demo — a guide NPC leads the player up to a missing climber.
///
/// A sequence: welcome at base camp → chained walk to the trailhead →
///             gated walk onto the north ridge → the find below the overhang
///             (cutting into live dialogue) → chained descent.
///
/// Zones are entered by hand; the clock advances in quarter-second frames.
///
/// Run with: cargo run --example mountain_rescue

use dialogue_engine::core::config::PlaybackConfig;
use dialogue_engine::core::dispatcher::{ZonePolicy, ZoneTrigger};
use dialogue_engine::core::playback::{DialoguePlayback, PlaybackController, PlaybackEventKind};
use dialogue_engine::core::stage::{Locomotion, SubtitleSink};
use dialogue_engine::core::store::SequenceStore;
use dialogue_engine::schema::sequence::SequenceId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(250);

/// Walks the guide along fixed distances to each named waypoint.
struct TrailWalker {
    distances: HashMap<&'static str, f32>,
    travelled: f32,
}

impl Locomotion for TrailWalker {
    fn has_waypoint(&self, waypoint: &str) -> bool {
        self.distances.contains_key(waypoint)
    }

    fn step_towards(&mut self, waypoint: &str, speed: f32, dt: Duration) -> bool {
        let Some(&distance) = self.distances.get(waypoint) else {
            return false;
        };
        self.travelled += speed * dt.as_secs_f32();
        if self.travelled >= distance {
            self.travelled = 0.0;
            true
        } else {
            false
        }
    }
}

struct Captions;

impl SubtitleSink for Captions {
    fn show(&mut self, text: &str) {
        if !text.is_empty() {
            println!("    \"{}\"", text);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- Load the guide's dialogue library ---
    let store = SequenceStore::load_from_ron(std::path::Path::new(
        "dialogue_data/mountain_rescue.ron",
    ))
    .expect("Failed to load mountain rescue library");
    let store = Arc::new(store);

    let walker = TrailWalker {
        distances: [("trailhead", 4.0), ("ridge_anchor", 3.3), ("base_camp", 12.0)]
            .into_iter()
            .collect(),
        travelled: 0.0,
    };

    let mut guide = PlaybackController::builder(store.clone())
        .config(PlaybackConfig::default())
        .locomotion(walker)
        .subtitles(Captions)
        .build()
        .expect("Failed to build controller");

    let zone = |name: &str, policy: ZonePolicy| {
        let dispatcher = store
            .trigger(name)
            .expect("zone missing from library")
            .clone();
        ZoneTrigger::new(name, dispatcher, policy)
    };

    let mut base_camp = zone("base_camp", ZonePolicy::default());
    let mut north_ridge = zone(
        "north_ridge",
        ZonePolicy {
            trigger_once: true,
            interrupt_current: false,
        },
    );
    let mut overhang = zone(
        "overhang",
        ZonePolicy {
            trigger_once: true,
            interrupt_current: true,
        },
    );

    println!("=== Mountain Rescue ===\n");

    // --- Act 1: base camp ---
    enter(&mut guide, &mut base_camp);
    run_until_idle(&mut guide);

    // Wandering back to camp with nothing to say picks the nudge rule.
    enter(&mut guide, &mut base_camp);
    run_until_idle(&mut guide);

    // --- Act 2: the ridge (one-shot) ---
    enter(&mut guide, &mut north_ridge);
    run_for(&mut guide, Duration::from_secs(4));
    println!("  (player steps out of the ridge zone and back in)");
    enter(&mut guide, &mut north_ridge);
    run_until_idle(&mut guide);

    // --- Act 3: the overhang cuts the guide off mid-sentence ---
    guide.trigger_sequence(&SequenceId::new("guide_nudge"));
    run_for(&mut guide, Duration::from_millis(500));
    enter(&mut guide, &mut overhang);
    run_until_idle(&mut guide);

    println!(
        "\n=== Done at {:.2}s, story stage {} ===",
        guide.clock().as_secs_f32(),
        guide.story_stage()
    );
}

fn enter(guide: &mut PlaybackController, zone: &mut ZoneTrigger) {
    let stage = guide.story_stage();
    let outcome = zone.on_enter(guide, stage);
    println!("\n--- enter {} (stage {}) → {:?} ---", zone.name(), stage, outcome);
    print_events(guide);
}

fn run_for(guide: &mut PlaybackController, span: Duration) {
    let mut elapsed = Duration::ZERO;
    while elapsed < span {
        guide.tick(FRAME);
        elapsed += FRAME;
        print_events(guide);
    }
}

fn run_until_idle(guide: &mut PlaybackController) {
    while guide.is_playing() {
        guide.tick(FRAME);
        print_events(guide);
    }
}

fn print_events(guide: &mut PlaybackController) {
    for event in guide.drain_events() {
        let at = event.at.as_secs_f32();
        match event.kind {
            // Captions print their own text.
            PlaybackEventKind::SubtitleChanged(_) => {}
            PlaybackEventKind::SequenceStarted(id) => println!("  [{:6.2}] start {}", at, id),
            PlaybackEventKind::MovementStarted { waypoint } => {
                println!("  [{:6.2}] walking to {}", at, waypoint)
            }
            PlaybackEventKind::MovementArrived { waypoint } => {
                println!("  [{:6.2}] reached {}", at, waypoint)
            }
            PlaybackEventKind::StoryAdvanced { stage } => {
                println!("  [{:6.2}] story stage → {}", at, stage)
            }
            PlaybackEventKind::Chained { from, to } => {
                println!("  [{:6.2}] {} → {}", at, from, to)
            }
            PlaybackEventKind::Interrupted(id) => println!("  [{:6.2}] cut off {}", at, id),
            other => println!("  [{:6.2}] {:?}", at, other),
        }
    }
}
