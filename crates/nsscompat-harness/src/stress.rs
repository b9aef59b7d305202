//! Multi-thread lookup stress runner.
//!
//! Every thread repeatedly looks up names from a shared list through the
//! snapshot API and checks that each answer is for the name it asked about.
//! A mismatch means one thread observed another thread's record.

use std::ffi::CString;
use std::thread;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use nsscompat_abi::Dispatcher;
use nsscompat_core::{LookupError, RecordKind, global_metrics};

use crate::error::HarnessError;
use crate::report::MetricsReport;

#[derive(Debug, Clone)]
pub struct StressConfig {
    pub kind: RecordKind,
    pub threads: usize,
    pub iterations: usize,
    pub names: Vec<String>,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            kind: RecordKind::User,
            threads: 8,
            iterations: 1000,
            names: vec!["root".to_string()],
        }
    }
}

/// Per-thread tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressCounts {
    pub lookups: u64,
    pub found: u64,
    pub not_found: u64,
    pub errors: u64,
    pub mismatches: u64,
}

impl StressCounts {
    fn absorb(&mut self, other: &Self) {
        self.lookups += other.lookups;
        self.found += other.found;
        self.not_found += other.not_found;
        self.errors += other.errors;
        self.mismatches += other.mismatches;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub kind: String,
    pub strategy: String,
    pub threads: usize,
    pub iterations: usize,
    pub elapsed_ms: u64,
    pub totals: StressCounts,
    pub per_thread: Vec<StressCounts>,
    pub metrics: MetricsReport,
}

impl StressReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.totals.mismatches == 0
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Look up `name` and report whether the answer matches it.
fn check_one(
    dispatcher: &Dispatcher,
    kind: RecordKind,
    name: &CString,
) -> Result<Option<bool>, LookupError> {
    let want = name.as_bytes();
    Ok(match kind {
        RecordKind::User => dispatcher
            .user_entry_by_name(name)?
            .map(|e| e.name == want),
        RecordKind::Group => dispatcher
            .group_entry_by_name(name)?
            .map(|e| e.name == want),
        RecordKind::Host => dispatcher
            .host_entry_by_name(name)?
            .map(|e| e.answers_to(want)),
    })
}

fn run_thread(
    dispatcher: &Dispatcher,
    kind: RecordKind,
    names: &[CString],
    offset: usize,
    iterations: usize,
) -> StressCounts {
    let mut counts = StressCounts::default();
    for i in 0..iterations {
        let name = &names[(offset + i) % names.len()];
        counts.lookups += 1;
        match check_one(dispatcher, kind, name) {
            Ok(Some(true)) => counts.found += 1,
            Ok(Some(false)) => {
                counts.found += 1;
                counts.mismatches += 1;
            }
            Ok(None) => counts.not_found += 1,
            Err(_) => counts.errors += 1,
        }
    }
    counts
}

/// Gather per-thread tallies. A panicked worker fails the whole run.
fn collect_counts(
    joined: Vec<(String, thread::Result<StressCounts>)>,
) -> Result<Vec<StressCounts>, HarnessError> {
    joined
        .into_iter()
        .map(|(name, result)| result.map_err(|_| HarnessError::WorkerPanicked(name)))
        .collect()
}

/// Run the stress workload. Threads start at different offsets into the
/// name list so neighbouring threads ask different questions.
pub fn run_stress(
    dispatcher: &Dispatcher,
    config: &StressConfig,
) -> Result<StressReport, HarnessError> {
    if config.threads == 0 || config.names.is_empty() {
        return Err(HarnessError::InvalidArgument(
            "stress needs at least one thread and one name".to_string(),
        ));
    }
    let names = config
        .names
        .iter()
        .map(|n| CString::new(n.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| HarnessError::InvalidArgument("name contains a NUL byte".to_string()))?;

    let before = global_metrics().snapshot();
    let start = Instant::now();
    let per_thread = thread::scope(|scope| -> Result<Vec<StressCounts>, HarnessError> {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                let names = &names;
                thread::Builder::new()
                    .name(format!("stress-{t}"))
                    .spawn_scoped(scope, move || {
                        run_thread(dispatcher, config.kind, names, t, config.iterations)
                    })
            })
            .collect::<Result<_, _>>()?;
        collect_counts(
            handles
                .into_iter()
                .map(|h| {
                    let name = h.thread().name().unwrap_or("stress").to_string();
                    (name, h.join())
                })
                .collect(),
        )
    })?;
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let mut totals = StressCounts::default();
    for counts in &per_thread {
        totals.absorb(counts);
    }
    Ok(StressReport {
        kind: config.kind.as_str().to_string(),
        strategy: dispatcher.strategy_for(config.kind).as_str().to_string(),
        threads: config.threads,
        iterations: config.iterations,
        elapsed_ms,
        totals,
        per_thread,
        metrics: global_metrics().snapshot().since(&before).into(),
    })
}
