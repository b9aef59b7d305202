//! A single lookup request and its execution against a dispatcher.

use std::ffi::CString;
use std::fmt;
use std::net::IpAddr;
use std::time::Instant;

use nsscompat_abi::{Dispatcher, errno, scratch};
use nsscompat_core::{LookupError, RecordKind};

use crate::report::{EntryReport, LookupReport};
use crate::structured_log::{LogEntry, LogLevel, Outcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    UserName(String),
    UserId(u32),
    GroupName(String),
    GroupId(u32),
    HostName(String),
    HostAddress(IpAddr),
}

impl Query {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::UserName(_) | Self::UserId(_) => RecordKind::User,
            Self::GroupName(_) | Self::GroupId(_) => RecordKind::Group,
            Self::HostName(_) | Self::HostAddress(_) => RecordKind::Host,
        }
    }

    /// Run the lookup on the calling thread.
    pub fn run(&self, dispatcher: &Dispatcher) -> Result<Option<EntryReport>, LookupError> {
        let name = |s: &str| {
            CString::new(s).map_err(|_| LookupError::InvalidArgument("name contains a NUL byte"))
        };
        Ok(match self {
            Self::UserName(n) => dispatcher
                .user_entry_by_name(&name(n)?)?
                .map(|e| EntryReport::User((&e).into())),
            Self::UserId(uid) => dispatcher
                .user_entry_by_id(*uid)?
                .map(|e| EntryReport::User((&e).into())),
            Self::GroupName(n) => dispatcher
                .group_entry_by_name(&name(n)?)?
                .map(|e| EntryReport::Group((&e).into())),
            Self::GroupId(gid) => dispatcher
                .group_entry_by_id(*gid)?
                .map(|e| EntryReport::Group((&e).into())),
            Self::HostName(n) => dispatcher
                .host_entry_by_name(&name(n)?)?
                .map(|e| EntryReport::Host((&e).into())),
            Self::HostAddress(addr) => dispatcher
                .host_entry_by_address(*addr)?
                .map(|e| EntryReport::Host((&e).into())),
        })
    }

    /// Run the lookup and describe what happened.
    pub fn report(&self, dispatcher: &Dispatcher) -> LookupReport {
        let kind = self.kind();
        let start = Instant::now();
        let result = self.run(dispatcher);
        let latency_ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);

        let (outcome, entry, error, errno) = match result {
            Ok(Some(entry)) => (Outcome::Found, Some(entry), None, None),
            Ok(None) => (Outcome::NotFound, None, None, None),
            Err(err) => {
                let outcome = if err.is_capacity() {
                    Outcome::CapacityExceeded
                } else {
                    Outcome::Error
                };
                (outcome, None, Some(err.to_string()), Some(errno::for_error(&err)))
            }
        };
        LookupReport {
            kind: kind.as_str().to_string(),
            query: self.to_string(),
            strategy: dispatcher.strategy_for(kind).as_str().to_string(),
            scratch_capacity: scratch::region_capacity(kind).unwrap_or(0),
            outcome,
            latency_ns,
            entry,
            error,
            errno,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserName(n) | Self::GroupName(n) | Self::HostName(n) => f.write_str(n),
            Self::UserId(id) | Self::GroupId(id) => write!(f, "#{id}"),
            Self::HostAddress(addr) => write!(f, "{addr}"),
        }
    }
}

impl LookupReport {
    /// The structured log line for this lookup. The trace id is left empty
    /// for the emitter to fill in.
    #[must_use]
    pub fn log_entry(&self) -> LogEntry {
        let level = match self.outcome {
            Outcome::Found | Outcome::NotFound => LogLevel::Info,
            Outcome::CapacityExceeded => LogLevel::Warn,
            _ => LogLevel::Error,
        };
        let mut entry = LogEntry::new("", level, "lookup")
            .with_query(self.kind.clone(), self.query.clone())
            .with_strategy(self.strategy.clone())
            .with_outcome(self.outcome)
            .with_latency_ns(self.latency_ns)
            .with_current_thread()
            .with_details(serde_json::json!({ "scratch_capacity": self.scratch_capacity }));
        if let Some(errno) = self.errno {
            entry = entry.with_errno(errno);
        }
        entry
    }
}
