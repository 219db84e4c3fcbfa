use std::path::{Path, PathBuf};

use crate::config::{load_effective_config, DrydockConfig};
use crate::data::generate::generate_database;
use crate::data::schema::ComponentKind;
use crate::data::store::ShipStore;
use crate::data::validate::{validate_dataset, ValidationSeverity};
use crate::mutation::Rng;
use crate::parallel::{run_soak, WorkerPool};
use crate::report::{export_outcomes_csv, SessionSummary};
use crate::session::{SessionError, TestSession};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURES: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_PRECONDITION: i32 = 3;

const USAGE: &str = "usage: drydock <generate|check|validate|soak>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Generate,
    Check,
    Validate,
    Soak,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("generate") => Some(Command::Generate),
        Some("check") => Some(Command::Check),
        Some("validate") => Some(Command::Validate),
        Some("soak") => Some(Command::Soak),
        _ => None,
    }
}

/// Positional arguments and flags following the command name.
#[derive(Debug, Default, PartialEq, Eq)]
struct CommandArgs<'a> {
    positional: Vec<&'a str>,
    json: bool,
    csv: Option<&'a str>,
    workers: Option<&'a str>,
}

fn split_args(args: &[String]) -> Result<CommandArgs<'_>, String> {
    let mut parsed = CommandArgs::default();
    let mut rest = args.iter().skip(2).map(String::as_str).peekable();
    while let Some(arg) = rest.next() {
        match arg {
            "--json" => parsed.json = true,
            "--csv" | "--workers" => {
                let value = rest
                    .next_if(|value| !value.starts_with("--"))
                    .ok_or_else(|| format!("{arg} requires a value"))?;
                if arg == "--csv" {
                    parsed.csv = Some(value);
                } else {
                    parsed.workers = Some(value);
                }
            }
            flag if flag.starts_with("--") => eprintln!("ignoring unknown flag '{flag}'"),
            value => parsed.positional.push(value),
        }
    }
    Ok(parsed)
}

pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return EXIT_USAGE;
    };
    let config = match load_effective_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return EXIT_USAGE;
        }
    };
    let parsed = match split_args(args) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            return EXIT_USAGE;
        }
    };

    let outcome = match command {
        Command::Generate => handle_generate(&parsed, config),
        Command::Check => handle_check(&parsed, config),
        Command::Validate => handle_validate(&parsed, config),
        Command::Soak => handle_soak(&parsed, config),
    };
    outcome.unwrap_or_else(|err| {
        eprintln!("{err}");
        EXIT_USAGE
    })
}

/// Apply the `[db] [seed]` positionals shared by most commands.
fn apply_db_and_seed(
    parsed: &CommandArgs<'_>,
    mut config: DrydockConfig,
    seed_at: usize,
) -> Result<DrydockConfig, String> {
    if let Some(db) = parsed.positional.first() {
        config = config.with_database(*db);
    }
    if let Some(seed) = parse_u64_arg(parsed.positional.get(seed_at).copied(), "seed")? {
        config = config.with_seed(seed);
    }
    Ok(config)
}

fn resolve_seed(config: &DrydockConfig) -> Result<u64, String> {
    match config.seed {
        Some(seed) => Ok(seed),
        None => Rng::entropy_seed().map_err(|err| format!("failed to draw a random seed: {err}")),
    }
}

/// Usage problems (bad arguments) come back as `Err` and exit with [EXIT_USAGE].
fn handle_generate(parsed: &CommandArgs<'_>, config: DrydockConfig) -> Result<i32, String> {
    let config = apply_db_and_seed(parsed, config, 1)?;
    let seed = match resolve_seed(&config) {
        Ok(seed) => seed,
        Err(err) => {
            eprintln!("{err}");
            return Ok(EXIT_FAILURES);
        }
    };

    Ok(match generate_database(&config.database, &config.fixture, seed) {
        Ok(report) => {
            for (kind, count) in ComponentKind::ALL
                .into_iter()
                .zip([report.weapons, report.hulls, report.engines])
            {
                println!("Inserted {count} records into '{}' table.", kind.table());
            }
            println!("Inserted {} records into 'ships' table.", report.ships);
            println!(
                "Database '{}' created and populated successfully (seed {}).",
                report.path, report.seed
            );
            EXIT_OK
        }
        Err(err) => {
            eprintln!("generate failed: {err}");
            EXIT_FAILURES
        }
    })
}

fn handle_check(parsed: &CommandArgs<'_>, config: DrydockConfig) -> Result<i32, String> {
    let config = apply_db_and_seed(parsed, config, 1)?;
    let session = match TestSession::start(&config) {
        Ok(session) => session,
        Err(err @ SessionError::MissingOriginal(_)) => {
            eprintln!("{err}");
            return Ok(EXIT_PRECONDITION);
        }
        Err(err @ SessionError::CloneIsOriginal(_)) => return Err(err.to_string()),
        Err(err) => {
            eprintln!("session error: {err}");
            return Ok(EXIT_FAILURES);
        }
    };

    let report = session.run();
    let failed = report.failed();

    if let Some(path) = parsed.csv {
        if let Err(err) = export_outcomes_csv(&report, path) {
            eprintln!("{err}");
            return Ok(EXIT_FAILURES);
        }
    }

    if parsed.json {
        let summary = SessionSummary::new(&session, report);
        match serde_json::to_string_pretty(&summary) {
            Ok(payload) => println!("{payload}"),
            Err(err) => {
                eprintln!("failed to serialize session summary: {err}");
                return Ok(EXIT_FAILURES);
            }
        }
    } else {
        println!(
            "Applying randomization strategy: {} (seed {})",
            session.mutation_log().strategy,
            session.seed()
        );
        for outcome in &report.outcomes {
            match &outcome.failure {
                None => println!("PASSED {}", outcome.case),
                Some(failure) => {
                    println!("FAILED {}", outcome.case);
                    for line in failure.to_string().lines() {
                        println!("    {line}");
                    }
                }
            }
        }
        println!("{} passed, {} failed", report.passed(), failed);
    }

    Ok(if failed > 0 { EXIT_FAILURES } else { EXIT_OK })
}

fn handle_validate(parsed: &CommandArgs<'_>, config: DrydockConfig) -> Result<i32, String> {
    let path: PathBuf = parsed
        .positional
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.database.clone());
    if !path.is_file() {
        eprintln!("{}", SessionError::MissingOriginal(path));
        return Ok(EXIT_PRECONDITION);
    }

    let report = match ShipStore::open_read_only(&path)
        .and_then(|store| validate_dataset(&store, config.fixture.values))
    {
        Ok(report) => report,
        Err(err) => {
            eprintln!("validation error: {err}");
            return Ok(EXIT_FAILURES);
        }
    };

    for diagnostic in &report.diagnostics {
        println!("{diagnostic}");
    }
    if report.has_errors() {
        eprintln!(
            "validation failed: {} issue(s)",
            report.count(ValidationSeverity::Error)
        );
        Ok(EXIT_FAILURES)
    } else {
        println!("validation passed: {}", path.display());
        Ok(EXIT_OK)
    }
}

fn handle_soak(parsed: &CommandArgs<'_>, config: DrydockConfig) -> Result<i32, String> {
    let config = apply_db_and_seed(parsed, config, 2)?;
    let iterations =
        parse_u64_arg(parsed.positional.get(1).copied(), "iterations")?.unwrap_or(20);
    let workers = parse_u64_arg(parsed.workers, "workers")?.unwrap_or(0);
    if !Path::new(&config.database).is_file() {
        eprintln!("{}", SessionError::MissingOriginal(config.database.clone()));
        return Ok(EXIT_PRECONDITION);
    }
    let base_seed = match resolve_seed(&config) {
        Ok(seed) => seed,
        Err(err) => {
            eprintln!("{err}");
            return Ok(EXIT_FAILURES);
        }
    };

    let pool = WorkerPool::with_workers(workers as usize);
    let summary = match run_soak(&config, iterations as usize, base_seed, &pool) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("failed to build worker pool: {err}");
            return Ok(EXIT_FAILURES);
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(payload) => println!("{payload}"),
        Err(err) => {
            eprintln!("failed to serialize soak summary: {err}");
            return Ok(EXIT_FAILURES);
        }
    }
    Ok(if summary.all_exact() { EXIT_OK } else { EXIT_FAILURES })
}

fn parse_u64_arg(raw: Option<&str>, name: &str) -> Result<Option<u64>, String> {
    raw.map(|value| {
        value
            .parse::<u64>()
            .map_err(|_| format!("invalid {name} '{value}': expected a non-negative integer"))
    })
    .transpose()
}
