/// Sequence Linter — validates dialogue libraries for broken chains,
/// dangling rule targets and unknown trigger conditions.
///
/// Usage: sequence_linter <library.ron | library_dir>

use dialogue_engine::core::store::{SequenceStore, Severity};
use std::path::Path;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: sequence_linter <library.ron | library_dir>");
        process::exit(0);
    }

    let library_path = Path::new(&args[1]);
    let mut store = SequenceStore::new();
    let mut load_failures = 0;

    if library_path.is_file() {
        match SequenceStore::load_from_ron(library_path) {
            Ok(loaded) => store.merge(loaded),
            Err(e) => {
                eprintln!("ERROR: Failed to load library file: {}", e);
                process::exit(1);
            }
        }
    } else if library_path.is_dir() {
        load_failures = load_libraries_recursive(library_path, &mut store);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", library_path.display());
        process::exit(1);
    }

    println!(
        "Loaded {} sequences and {} trigger tables",
        store.len(),
        store.trigger_names().len()
    );

    let issues = store.validate();

    println!("\n=== Dialogue Lint Report ===\n");

    if issues.is_empty() && load_failures == 0 {
        println!("All checks passed!");
    }

    for issue in issues.iter().filter(|i| i.severity == Severity::Warning) {
        println!("{}", issue);
    }
    for issue in issues.iter().filter(|i| i.severity == Severity::Error) {
        println!("{}", issue);
    }

    let errors = issues.iter().filter(|i| i.severity == Severity::Error).count() + load_failures;
    let warnings = issues.len() + load_failures - errors;
    println!("\nSummary: {} errors, {} warnings", errors, warnings);

    if errors == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

/// Merge every `.ron` file under `dir`. Returns how many files failed to load.
fn load_libraries_recursive(dir: &Path, store: &mut SequenceStore) -> usize {
    let mut failures = 0;
    if let Ok(entries) = std::fs::read_dir(dir) {
        let mut paths: Vec<_> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            if path.is_dir() {
                failures += load_libraries_recursive(&path, store);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match SequenceStore::load_from_ron(&path) {
                    Ok(loaded) => {
                        println!("  Loaded: {}", path.display());
                        store.merge(loaded);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                        failures += 1;
                    }
                }
            }
        }
    }
    failures
}
