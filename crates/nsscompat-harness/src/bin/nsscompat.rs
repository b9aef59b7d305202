//! CLI entrypoint for nsscompat lookups and diagnostics.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use nsscompat_abi::dispatcher;
use nsscompat_core::{Capabilities, RecordKind, StrategyPreference, config};
use nsscompat_harness::crosscheck::{self, CrossCheckReport};
use nsscompat_harness::stress::{StressConfig, run_stress};
use nsscompat_harness::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use nsscompat_harness::{Query, report::PlanReport};

/// Thread-safe user, group and host lookups.
#[derive(Debug, Parser)]
#[command(name = "nsscompat")]
#[command(about = "Thread-safe directory lookups and diagnostics")]
struct Cli {
    /// Strategy preference: auto, reentrant, legacy or fallback.
    #[arg(long, global = true)]
    strategy: Option<String>,
    /// Per-thread scratch capacity in bytes.
    #[arg(long, global = true)]
    scratch_bytes: Option<usize>,
    /// Write JSONL structured logs to this file, or to stdout after the
    /// report when given `-`.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Look up a user by name or uid.
    User {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        uid: Option<u32>,
    },
    /// Look up a group by name or gid.
    Group {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        gid: Option<u32>,
    },
    /// Resolve a host name.
    Host { name: String },
    /// Reverse-resolve an IPv4 or IPv6 address.
    Addr { ip: IpAddr },
    /// Run lookups from many threads and check every answer.
    Stress {
        #[arg(long, default_value_t = 8)]
        threads: usize,
        #[arg(long, default_value_t = 1000)]
        iterations: usize,
        /// Comma-separated names to look up.
        #[arg(long, value_delimiter = ',', default_value = "root")]
        names: Vec<String>,
        /// Record kind: user, group or host.
        #[arg(long, default_value = "user")]
        kind: String,
    },
    /// Compare passwd/group files with what the directory returns.
    CrossCheck {
        #[arg(long, default_value = "/etc/passwd")]
        passwd: PathBuf,
        #[arg(long, default_value = "/etc/group")]
        group: PathBuf,
    },
    /// Print capabilities, preference and the resulting plan.
    Plan,
}

fn parse_kind(raw: &str) -> Result<RecordKind, String> {
    RecordKind::ALL
        .into_iter()
        .find(|k| k.as_str().eq_ignore_ascii_case(raw.trim()))
        .ok_or_else(|| format!("Unsupported kind '{raw}', expected user|group|host"))
}

fn run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}-{secs}", std::process::id())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Both settings must land before the first lookup builds the dispatcher.
    if let Some(raw) = &cli.strategy {
        config::set_strategy_preference(StrategyPreference::from_str_loose(raw));
    }
    if let Some(bytes) = cli.scratch_bytes {
        let applied = config::set_scratch_capacity(bytes);
        if applied != bytes {
            eprintln!("Scratch capacity {bytes} normalized to {applied}");
        }
    }

    let mut log = match &cli.log {
        Some(path) if path.as_os_str() == "-" => Some(LogEmitter::to_stdout(&run_id())),
        Some(path) => Some(LogEmitter::to_file(path, &run_id())?),
        None => None,
    };

    let query = match cli.command {
        Command::User { name, uid } => match (name, uid) {
            (Some(name), _) => Some(Query::UserName(name)),
            (None, Some(uid)) => Some(Query::UserId(uid)),
            (None, None) => return Err("user: give a NAME or --uid".into()),
        },
        Command::Group { name, gid } => match (name, gid) {
            (Some(name), _) => Some(Query::GroupName(name)),
            (None, Some(gid)) => Some(Query::GroupId(gid)),
            (None, None) => return Err("group: give a NAME or --gid".into()),
        },
        Command::Host { name } => Some(Query::HostName(name)),
        Command::Addr { ip } => Some(Query::HostAddress(ip)),
        Command::Stress {
            threads,
            iterations,
            names,
            kind,
        } => {
            let config = StressConfig {
                kind: parse_kind(&kind)?,
                threads,
                iterations,
                names,
            };
            let report = run_stress(dispatcher(), &config)?;
            println!("{}", report.to_json());
            if let Some(log) = log.as_mut() {
                let outcome = if report.passed() {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                };
                log.emit_entry(
                    LogEntry::new("", LogLevel::Info, "stress")
                        .with_strategy(report.strategy.clone())
                        .with_outcome(outcome)
                        .with_details(serde_json::to_value(report.totals)?),
                )?;
                log.flush()?;
            }
            if !report.passed() {
                return Err(format!(
                    "stress: {} mismatched answers across {} lookups",
                    report.totals.mismatches, report.totals.lookups
                )
                .into());
            }
            None
        }
        Command::CrossCheck { passwd, group } => {
            let mut report = CrossCheckReport::default();
            crosscheck::check_users(dispatcher(), &std::fs::read(&passwd)?, &mut report)?;
            crosscheck::check_groups(dispatcher(), &std::fs::read(&group)?, &mut report)?;
            println!("{}", report.to_json());
            if let Some(log) = log.as_mut() {
                let outcome = if report.passed() {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                };
                log.emit_entry(
                    LogEntry::new("", LogLevel::Info, "cross_check")
                        .with_outcome(outcome)
                        .with_details(serde_json::json!({
                            "checked": report.checked,
                            "matched": report.matched,
                            "missing": report.missing.len(),
                            "mismatches": report.mismatches.len(),
                        })),
                )?;
                log.flush()?;
            }
            if !report.passed() {
                return Err("cross-check found differences".into());
            }
            None
        }
        Command::Plan => {
            let caps = Capabilities::native();
            let preference = config::strategy_preference();
            let report = PlanReport::new(
                &caps,
                preference,
                &dispatcher().plan(),
                config::scratch_capacity(),
            );
            println!("{}", report.to_json());
            None
        }
    };

    if let Some(query) = query {
        let report = query.report(dispatcher());
        println!("{}", report.to_json());
        if let Some(log) = log.as_mut() {
            log.emit_entry(report.log_entry())?;
            log.flush()?;
        }
        match report.outcome {
            Outcome::Found => {}
            Outcome::NotFound => eprintln!("{} {}: not found", report.kind, report.query),
            _ => {
                return Err(format!(
                    "{} {}: {}",
                    report.kind,
                    report.query,
                    report.error.unwrap_or_default()
                )
                .into());
            }
        }
    }

    Ok(())
}
