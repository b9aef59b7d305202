//! JSON reports printed by the CLI.

use serde::{Deserialize, Serialize};

use nsscompat_core::{
    Capabilities, GroupEntry, HostEntry, MetricsSnapshot, RecordKind, StrategyPlan,
    StrategyPreference, UserEntry,
};

use crate::structured_log::Outcome;

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReport {
    pub name: String,
    pub passwd: String,
    pub uid: u32,
    pub gid: u32,
    pub gecos: Option<String>,
    pub dir: String,
    pub shell: String,
}

impl From<&UserEntry> for UserReport {
    fn from(e: &UserEntry) -> Self {
        Self {
            name: text(&e.name),
            passwd: text(&e.passwd),
            uid: e.uid,
            gid: e.gid,
            gecos: e.gecos.as_deref().map(text),
            dir: text(&e.dir),
            shell: text(&e.shell),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReport {
    pub name: String,
    pub passwd: String,
    pub gid: u32,
    pub members: Vec<String>,
}

impl From<&GroupEntry> for GroupReport {
    fn from(e: &GroupEntry) -> Self {
        Self {
            name: text(&e.name),
            passwd: text(&e.passwd),
            gid: e.gid,
            members: e.members.iter().map(|m| text(m)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReport {
    pub name: String,
    pub aliases: Vec<String>,
    pub family: i32,
    pub addr_len: usize,
    /// Addresses in display form; raw bytes in hex when the length is not
    /// an IPv4 or IPv6 length.
    pub addresses: Vec<String>,
}

impl From<&HostEntry> for HostReport {
    fn from(e: &HostEntry) -> Self {
        let addresses = match e.addr_len {
            4 | 16 => e.ip_addrs().iter().map(ToString::to_string).collect(),
            _ => e
                .addresses
                .iter()
                .map(|raw| raw.iter().map(|b| format!("{b:02x}")).collect())
                .collect(),
        };
        Self {
            name: text(&e.name),
            aliases: e.aliases.iter().map(|a| text(a)).collect(),
            family: e.family,
            addr_len: e.addr_len,
            addresses,
        }
    }
}

/// The record a lookup produced, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryReport {
    User(UserReport),
    Group(GroupReport),
    Host(HostReport),
}

/// One lookup as performed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupReport {
    pub kind: String,
    pub query: String,
    pub strategy: String,
    /// Scratch capacity of the calling thread for this kind.
    pub scratch_capacity: usize,
    pub outcome: Outcome,
    pub latency_ns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
}

impl LookupReport {
    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindPlanReport {
    pub kind: String,
    pub reentrant: bool,
    pub legacy: bool,
    pub selected: String,
}

/// Capabilities, preference and the resulting plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    pub target_os: String,
    pub preference: String,
    pub scratch_capacity: usize,
    pub kinds: Vec<KindPlanReport>,
}

impl PlanReport {
    #[must_use]
    pub fn new(
        caps: &Capabilities,
        preference: StrategyPreference,
        plan: &StrategyPlan,
        scratch_capacity: usize,
    ) -> Self {
        let kinds = RecordKind::ALL
            .iter()
            .map(|&kind| {
                let support = caps.for_kind(kind);
                KindPlanReport {
                    kind: kind.as_str().to_string(),
                    reentrant: support.reentrant,
                    legacy: support.legacy,
                    selected: plan.for_kind(kind).as_str().to_string(),
                }
            })
            .collect();
        Self {
            target_os: std::env::consts::OS.to_string(),
            preference: preference.as_str().to_string(),
            scratch_capacity,
            kinds,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Counter deltas over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub lookups: u64,
    pub found: u64,
    pub not_found: u64,
    pub capacity_exceeded: u64,
    pub failures: u64,
    pub fallback_lock_acquisitions: u64,
    pub scratch_inits: u64,
}

impl From<MetricsSnapshot> for MetricsReport {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            lookups: s.lookups,
            found: s.found,
            not_found: s.not_found,
            capacity_exceeded: s.capacity_exceeded,
            failures: s.failures,
            fallback_lock_acquisitions: s.fallback_lock_acquisitions,
            scratch_inits: s.scratch_inits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_report_is_tagged_by_kind() {
        let group = GroupEntry {
            name: b"wheel".to_vec(),
            passwd: b"x".to_vec(),
            gid: 10,
            members: vec![b"root".to_vec(), b"ops".to_vec()],
        };
        let json = serde_json::to_value(EntryReport::Group((&group).into())).unwrap();
        assert_eq!(json["type"], "group");
        assert_eq!(json["gid"], 10);
        assert_eq!(json["members"], serde_json::json!(["root", "ops"]));
    }

    #[test]
    fn host_addresses_render_by_length() {
        let host = HostEntry {
            name: b"pair.test".to_vec(),
            aliases: vec![],
            family: 2,
            addr_len: 4,
            addresses: vec![vec![10, 0, 0, 1], vec![10, 0, 0, 2]],
        };
        assert_eq!(
            HostReport::from(&host).addresses,
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]
        );

        let odd = HostEntry {
            addr_len: 2,
            addresses: vec![vec![0xab, 0x01]],
            ..host
        };
        assert_eq!(HostReport::from(&odd).addresses, vec!["ab01".to_string()]);
    }

    #[test]
    fn user_report_keeps_missing_gecos_as_null() {
        let user = UserEntry {
            name: b"svc".to_vec(),
            passwd: b"x".to_vec(),
            uid: 900,
            gid: 900,
            gecos: None,
            dir: b"/srv".to_vec(),
            shell: b"/bin/false".to_vec(),
        };
        let json = serde_json::to_value(UserReport::from(&user)).unwrap();
        assert!(json["gecos"].is_null());
        assert_eq!(json["dir"], "/srv");
    }

    #[test]
    fn plan_report_lists_every_kind() {
        let caps = Capabilities::fallback_only();
        let plan = caps.plan(StrategyPreference::Auto);
        let report = PlanReport::new(&caps, StrategyPreference::Auto, &plan, 2048);
        assert_eq!(report.kinds.len(), 3);
        assert!(report.kinds.iter().all(|k| k.selected == "locked-fallback"));
        assert!(report.kinds.iter().all(|k| !k.reentrant && !k.legacy));
    }
}
