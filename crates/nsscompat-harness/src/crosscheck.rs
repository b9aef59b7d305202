//! Compare the files backend with what the dispatcher returns.
//!
//! Each entry parsed from passwd/group content is looked up by name; the
//! directory answer must agree on ids and paths. Gecos is only compared when
//! the directory returned one, since the locked fallback never copies it.
//! Member lists are compared as sets.

use std::collections::BTreeSet;
use std::ffi::CString;

use serde::{Deserialize, Serialize};

use nsscompat_abi::Dispatcher;
use nsscompat_core::dbfile::{self, ParseStats};
use nsscompat_core::{GroupEntry, RecordKind, UserEntry};

use crate::error::HarnessError;

/// One field that differs between the file and the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMismatch {
    pub kind: String,
    pub name: String,
    pub field: String,
    pub file: String,
    pub directory: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossCheckReport {
    pub checked: usize,
    pub matched: usize,
    /// File entries the directory did not return.
    pub missing: Vec<String>,
    /// Lookups that failed outright.
    pub errors: Vec<String>,
    pub mismatches: Vec<FieldMismatch>,
    pub passwd_stats: Option<ParseStatsReport>,
    pub group_stats: Option<ParseStatsReport>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParseStatsReport {
    pub parsed: usize,
    pub skipped: usize,
    pub malformed: usize,
}

impl From<ParseStats> for ParseStatsReport {
    fn from(s: ParseStats) -> Self {
        Self {
            parsed: s.parsed,
            skipped: s.skipped,
            malformed: s.malformed,
        }
    }
}

impl CrossCheckReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.missing.is_empty() && self.errors.is_empty() && self.mismatches.is_empty()
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

struct Diff<'a> {
    kind: RecordKind,
    name: &'a [u8],
    out: Vec<FieldMismatch>,
}

impl<'a> Diff<'a> {
    fn new(kind: RecordKind, name: &'a [u8]) -> Self {
        Self {
            kind,
            name,
            out: Vec::new(),
        }
    }

    fn field(&mut self, field: &str, file: impl ToString, directory: impl ToString) {
        let (file, directory) = (file.to_string(), directory.to_string());
        if file != directory {
            self.out.push(FieldMismatch {
                kind: self.kind.as_str().to_string(),
                name: text(self.name),
                field: field.to_string(),
                file,
                directory,
            });
        }
    }
}

/// Field differences between a passwd line and the directory's answer.
#[must_use]
pub fn diff_user(file: &UserEntry, directory: &UserEntry) -> Vec<FieldMismatch> {
    let mut diff = Diff::new(RecordKind::User, &file.name);
    diff.field("uid", file.uid, directory.uid);
    diff.field("gid", file.gid, directory.gid);
    diff.field("dir", text(&file.dir), text(&directory.dir));
    diff.field("shell", text(&file.shell), text(&directory.shell));
    if let (Some(f), Some(d)) = (&file.gecos, &directory.gecos) {
        diff.field("gecos", text(f), text(d));
    }
    diff.out
}

/// Field differences between a group line and the directory's answer.
#[must_use]
pub fn diff_group(file: &GroupEntry, directory: &GroupEntry) -> Vec<FieldMismatch> {
    let mut diff = Diff::new(RecordKind::Group, &file.name);
    diff.field("gid", file.gid, directory.gid);
    let members = |g: &GroupEntry| {
        g.members
            .iter()
            .map(|m| text(m))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
            .join(",")
    };
    diff.field("members", members(file), members(directory));
    diff.out
}

fn c_name(name: &[u8]) -> Result<CString, HarnessError> {
    CString::new(name).map_err(|_| HarnessError::InvalidArgument(format!("NUL in {}", text(name))))
}

/// Check every entry of passwd-format `content` against `dispatcher`.
pub fn check_users(
    dispatcher: &Dispatcher,
    content: &[u8],
    report: &mut CrossCheckReport,
) -> Result<(), HarnessError> {
    let (entries, stats) = dbfile::parse_passwd_with_stats(content);
    report.passwd_stats = Some(stats.into());
    for entry in entries {
        report.checked += 1;
        match dispatcher.user_entry_by_name(&c_name(&entry.name)?) {
            Ok(Some(found)) => {
                let diffs = diff_user(&entry, &found);
                if diffs.is_empty() {
                    report.matched += 1;
                }
                report.mismatches.extend(diffs);
            }
            Ok(None) => report.missing.push(format!("user {}", text(&entry.name))),
            Err(err) => report.errors.push(format!("user {}: {err}", text(&entry.name))),
        }
    }
    Ok(())
}

/// Check every entry of group-format `content` against `dispatcher`.
pub fn check_groups(
    dispatcher: &Dispatcher,
    content: &[u8],
    report: &mut CrossCheckReport,
) -> Result<(), HarnessError> {
    let (entries, stats) = dbfile::parse_group_with_stats(content);
    report.group_stats = Some(stats.into());
    for entry in entries {
        report.checked += 1;
        match dispatcher.group_entry_by_name(&c_name(&entry.name)?) {
            Ok(Some(found)) => {
                let diffs = diff_group(&entry, &found);
                if diffs.is_empty() {
                    report.matched += 1;
                }
                report.mismatches.extend(diffs);
            }
            Ok(None) => report.missing.push(format!("group {}", text(&entry.name))),
            Err(err) => report.errors.push(format!("group {}: {err}", text(&entry.name))),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: u32, gecos: Option<&[u8]>) -> UserEntry {
        UserEntry {
            name: b"svc".to_vec(),
            passwd: b"x".to_vec(),
            uid,
            gid: 100,
            gecos: gecos.map(<[u8]>::to_vec),
            dir: b"/srv/svc".to_vec(),
            shell: b"/bin/sh".to_vec(),
        }
    }

    #[test]
    fn identical_users_do_not_differ() {
        assert!(diff_user(&user(5, Some(b"Service")), &user(5, Some(b"Service"))).is_empty());
    }

    #[test]
    fn missing_gecos_on_either_side_is_not_a_mismatch() {
        assert!(diff_user(&user(5, Some(b"Service")), &user(5, None)).is_empty());
    }

    #[test]
    fn differing_fields_are_named() {
        let diffs = diff_user(&user(5, Some(b"a")), &user(6, Some(b"b")));
        let fields: Vec<_> = diffs.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, ["uid", "gecos"]);
        assert_eq!(diffs[0].file, "5");
        assert_eq!(diffs[0].directory, "6");
        assert_eq!(diffs[0].kind, "user");
        assert_eq!(diffs[0].name, "svc");
    }

    #[test]
    fn member_order_does_not_matter() {
        let file = GroupEntry {
            name: b"ops".to_vec(),
            passwd: b"x".to_vec(),
            gid: 50,
            members: vec![b"b".to_vec(), b"a".to_vec()],
        };
        let mut directory = file.clone();
        directory.members.reverse();
        assert!(diff_group(&file, &directory).is_empty());

        directory.members.pop();
        let diffs = diff_group(&file, &directory);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "members");
        assert_eq!(diffs[0].file, "a,b");
    }
}
