/// Preview — interactive playback shell for testing dialogue libraries.
///
/// Usage: preview --library <path> [--config <path>] [--distance <metres>]
///
/// Commands:
///   list                       — list sequences and trigger tables
///   trigger <sequence>         — play a sequence from the top
///   interrupt <sequence>       — same, logged as an interrupt
///   enter <zone> [stage]       — fire a trigger table (stage defaults to the controller's)
///   policy <zone> <once|interrupt|plain>  — set a zone's gating policy
///   tick <seconds>             — advance the clock
///   run                        — tick until idle (gives up after two minutes)
///   stop                       — cancel the current sequence
///   reset                      — stop and rewind the story stage
///   state                      — print playback state
///   help                       — list commands
///   quit                       — exit

use dialogue_engine::core::config::PlaybackConfig;
use dialogue_engine::core::dispatcher::{ZonePolicy, ZoneTrigger};
use dialogue_engine::core::playback::{
    DialoguePlayback, PlaybackController, PlaybackEvent, PlaybackEventKind,
};
use dialogue_engine::core::stage::{Animator, Locomotion, VoicePlayer};
use dialogue_engine::core::store::SequenceStore;
use dialogue_engine::schema::sequence::SequenceId;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const RUN_STEP: Duration = Duration::from_millis(100);
const RUN_LIMIT: Duration = Duration::from_secs(120);

/// Every waypoint is `distance` metres away from wherever the speaker is.
struct StraightLineWalker {
    distance: f32,
    travelled: f32,
}

impl Locomotion for StraightLineWalker {
    fn has_waypoint(&self, _waypoint: &str) -> bool {
        true
    }

    fn step_towards(&mut self, _waypoint: &str, speed: f32, dt: Duration) -> bool {
        self.travelled += speed * dt.as_secs_f32();
        if self.travelled >= self.distance {
            self.travelled = 0.0;
            true
        } else {
            false
        }
    }
}

struct PrintingAnimator;

impl Animator for PrintingAnimator {
    fn set_trigger(&mut self, name: &str) {
        println!("    [anim] {}", name);
    }

    fn set_bool(&mut self, name: &str, value: bool) {
        println!("    [anim] {} = {}", name, value);
    }
}

struct PrintingVoice;

impl VoicePlayer for PrintingVoice {
    fn play(&mut self, clip: &str) {
        println!("    [voice] {}", clip);
    }

    fn stop(&mut self) {
        println!("    [voice] stop");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut library_path = None;
    let mut config_path = None;
    let mut distance: f32 = 5.0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--library" if i + 1 < args.len() => {
                i += 1;
                library_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--distance" if i + 1 < args.len() => {
                i += 1;
                distance = args[i].parse().unwrap_or(5.0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(library_path) = library_path else {
        eprintln!("ERROR: --library is required");
        print_usage();
        std::process::exit(1);
    };

    let store = match SequenceStore::load_from_ron(Path::new(&library_path)) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("ERROR: Failed to load library: {}", e);
            std::process::exit(1);
        }
    };

    let config = match config_path {
        Some(ref path) => match PlaybackConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => PlaybackConfig::default(),
    };

    let mut controller = match PlaybackController::builder(store.clone())
        .config(config)
        .animator(PrintingAnimator)
        .voice(PrintingVoice)
        .locomotion(StraightLineWalker {
            distance,
            travelled: 0.0,
        })
        .build()
    {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} sequences, {} trigger tables",
        store.len(),
        store.trigger_names().len()
    );
    println!("Type 'help' for commands.\n");

    let mut zones: HashMap<String, ZoneTrigger> = HashMap::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "list" | "ls" => {
                println!("Sequences:");
                for id in store.sequence_ids() {
                    let lines = store.get(id).map_or(0, |s| s.lines.len());
                    println!("  {} ({} lines)", id, lines);
                }
                println!("Trigger tables:");
                for name in store.trigger_names() {
                    println!("  {}", name);
                }
            }
            "trigger" | "interrupt" => {
                if parts.len() < 2 {
                    println!("Usage: {} <sequence>", cmd);
                    continue;
                }
                let id = SequenceId::new(parts[1]);
                if !store.contains(&id) {
                    println!("Unknown sequence: {}", parts[1]);
                    continue;
                }
                if cmd == "interrupt" {
                    controller.interrupt_with_sequence(&id);
                } else {
                    controller.trigger_sequence(&id);
                }
                print_events(&controller.drain_events());
            }
            "enter" => {
                if parts.len() < 2 {
                    println!("Usage: enter <zone> [stage]");
                    continue;
                }
                let name = parts[1];
                let Some(dispatcher) = store.trigger(name) else {
                    println!("Unknown trigger table: {}", name);
                    continue;
                };
                let stage = match parts.get(2) {
                    Some(raw) => match raw.parse() {
                        Ok(stage) => stage,
                        Err(_) => {
                            println!("Invalid stage: {}", raw);
                            continue;
                        }
                    },
                    None => controller.story_stage(),
                };
                let zone = zones.entry(name.to_string()).or_insert_with(|| {
                    ZoneTrigger::new(name, dispatcher.clone(), ZonePolicy::default())
                });
                let outcome = zone.on_enter(&mut controller, stage);
                println!("  {:?}", outcome);
                print_events(&controller.drain_events());
            }
            "policy" => {
                if parts.len() < 3 {
                    println!("Usage: policy <zone> <once|interrupt|plain>");
                    continue;
                }
                let name = parts[1];
                let Some(dispatcher) = store.trigger(name) else {
                    println!("Unknown trigger table: {}", name);
                    continue;
                };
                let policy = match parts[2] {
                    "once" => ZonePolicy {
                        trigger_once: true,
                        interrupt_current: false,
                    },
                    "interrupt" => ZonePolicy {
                        trigger_once: false,
                        interrupt_current: true,
                    },
                    "plain" => ZonePolicy::default(),
                    other => {
                        println!("Unknown policy: {}", other);
                        continue;
                    }
                };
                zones.insert(
                    name.to_string(),
                    ZoneTrigger::new(name, dispatcher.clone(), policy),
                );
                println!("Zone '{}' policy: {:?}", name, policy);
            }
            "tick" => {
                let seconds = parts.get(1).and_then(|s| s.parse::<f32>().ok());
                match seconds {
                    Some(s) if s.is_finite() && s >= 0.0 => {
                        controller.tick(Duration::from_secs_f32(s));
                        print_events(&controller.drain_events());
                    }
                    _ => println!("Usage: tick <seconds>"),
                }
            }
            "run" => {
                let mut elapsed = Duration::ZERO;
                while controller.is_playing() && elapsed < RUN_LIMIT {
                    controller.tick(RUN_STEP);
                    elapsed += RUN_STEP;
                    print_events(&controller.drain_events());
                }
                if controller.is_playing() {
                    println!("Still playing after {:?}; giving up.", RUN_LIMIT);
                }
            }
            "stop" => {
                controller.stop();
                print_events(&controller.drain_events());
            }
            "reset" => {
                controller.reset();
                for zone in zones.values_mut() {
                    zone.reset_latch();
                }
                print_events(&controller.drain_events());
                println!("Story stage reset.");
            }
            "state" => print_state(&controller),
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn print_events(events: &[PlaybackEvent]) {
    for event in events {
        let at = event.at.as_secs_f32();
        match &event.kind {
            PlaybackEventKind::SubtitleChanged(text) if text.is_empty() => {
                println!("  {:>7.2}s  (subtitle cleared)", at)
            }
            PlaybackEventKind::SubtitleChanged(text) => println!("  {:>7.2}s  \"{}\"", at, text),
            other => println!("  {:>7.2}s  {:?}", at, other),
        }
    }
}

fn print_state(controller: &PlaybackController) {
    println!("  clock:       {:.2}s", controller.clock().as_secs_f32());
    match controller.current_sequence() {
        Some(id) => println!("  sequence:    {}", id),
        None => println!("  sequence:    (idle)"),
    }
    println!("  line index:  {}", controller.current_line_index());
    println!("  playing:     {}", controller.is_playing());
    println!("  walking:     {}", controller.is_walking());
    println!("  story stage: {}", controller.story_stage());
    println!("  subtitle:    \"{}\"", controller.current_subtitle());
}

fn print_usage() {
    println!("Usage: preview --library <path> [--config <path>] [--distance <metres>]");
}

fn print_help() {
    println!("Commands:");
    println!("  list                        list sequences and trigger tables");
    println!("  trigger <sequence>          play a sequence from the top");
    println!("  interrupt <sequence>        same, logged as an interrupt");
    println!("  enter <zone> [stage]        fire a trigger table");
    println!("  policy <zone> <once|interrupt|plain>");
    println!("  tick <seconds>              advance the clock");
    println!("  run                         tick until idle");
    println!("  stop                        cancel the current sequence");
    println!("  reset                       stop and rewind the story stage");
    println!("  state                       print playback state");
    println!("  help                        this list");
    println!("  quit                        exit");
}
