//! Files backend parsing for `/etc/passwd` and `/etc/group`.
//!
//! Used to cross-check what the OS directory returns against the flat files
//! and to build fixture directories in tests. Entries parsed here always
//! carry a gecos field, since the file format has one.

use crate::entry::{GroupEntry, UserEntry};

/// Line accounting from a whole-file parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Lines that produced an entry.
    pub parsed: usize,
    /// Blank lines and `#` comments.
    pub skipped: usize,
    /// Lines with the wrong field count, an empty name or a non-numeric id.
    pub malformed: usize,
}

enum Line<T> {
    Entry(T),
    Skip,
    Malformed,
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_id(field: &[u8]) -> Option<u32> {
    core::str::from_utf8(field).ok()?.parse::<u32>().ok()
}

fn classify_passwd(line: &[u8]) -> Line<UserEntry> {
    let line = trim_line(line);
    if line.is_empty() || line.starts_with(b"#") {
        return Line::Skip;
    }
    match parse_passwd_fields(line) {
        Some(entry) => Line::Entry(entry),
        None => Line::Malformed,
    }
}

fn parse_passwd_fields(line: &[u8]) -> Option<UserEntry> {
    let fields: Vec<&[u8]> = line.split(|&b| b == b':').collect();
    if fields.len() != 7 || fields[0].is_empty() {
        return None;
    }
    Some(UserEntry {
        name: fields[0].to_vec(),
        passwd: fields[1].to_vec(),
        uid: parse_id(fields[2])?,
        gid: parse_id(fields[3])?,
        gecos: Some(fields[4].to_vec()),
        dir: fields[5].to_vec(),
        shell: fields[6].to_vec(),
    })
}

/// Parse a single line from `/etc/passwd`.
///
/// Format: `name:passwd:uid:gid:gecos:dir:shell`
/// Returns `None` for comments, blank lines, or malformed entries.
pub fn parse_passwd_line(line: &[u8]) -> Option<UserEntry> {
    match classify_passwd(line) {
        Line::Entry(entry) => Some(entry),
        Line::Skip | Line::Malformed => None,
    }
}

fn classify_group(line: &[u8]) -> Line<GroupEntry> {
    let line = trim_line(line);
    if line.is_empty() || line.starts_with(b"#") {
        return Line::Skip;
    }
    match parse_group_fields(line) {
        Some(entry) => Line::Entry(entry),
        None => Line::Malformed,
    }
}

fn parse_group_fields(line: &[u8]) -> Option<GroupEntry> {
    let fields: Vec<&[u8]> = line.split(|&b| b == b':').collect();
    if fields.len() != 4 || fields[0].is_empty() {
        return None;
    }
    let members = if fields[3].is_empty() {
        Vec::new()
    } else {
        fields[3].split(|&b| b == b',').map(<[u8]>::to_vec).collect()
    };
    Some(GroupEntry {
        name: fields[0].to_vec(),
        passwd: fields[1].to_vec(),
        gid: parse_id(fields[2])?,
        members,
    })
}

/// Parse a single line from `/etc/group`.
///
/// Format: `name:passwd:gid:member,member,...`
pub fn parse_group_line(line: &[u8]) -> Option<GroupEntry> {
    match classify_group(line) {
        Line::Entry(entry) => Some(entry),
        Line::Skip | Line::Malformed => None,
    }
}

fn parse_all_with<T>(content: &[u8], classify: fn(&[u8]) -> Line<T>) -> (Vec<T>, ParseStats) {
    let mut stats = ParseStats::default();
    let mut entries = Vec::new();
    for line in content.split(|&b| b == b'\n') {
        match classify(line) {
            Line::Entry(entry) => {
                stats.parsed += 1;
                entries.push(entry);
            }
            Line::Skip => stats.skipped += 1,
            Line::Malformed => stats.malformed += 1,
        }
    }
    // A trailing newline yields one empty tail that is not a real line.
    if content.ends_with(b"\n") {
        stats.skipped -= 1;
    }
    (entries, stats)
}

/// Parse all valid passwd entries, with line accounting.
pub fn parse_passwd_with_stats(content: &[u8]) -> (Vec<UserEntry>, ParseStats) {
    parse_all_with(content, classify_passwd)
}

/// Parse all valid group entries, with line accounting.
pub fn parse_group_with_stats(content: &[u8]) -> (Vec<GroupEntry>, ParseStats) {
    parse_all_with(content, classify_group)
}

/// Look up a passwd entry by login name (first match, case-sensitive).
pub fn user_by_name(content: &[u8], name: &[u8]) -> Option<UserEntry> {
    content
        .split(|&b| b == b'\n')
        .filter_map(parse_passwd_line)
        .find(|entry| entry.name == name)
}

/// Look up a passwd entry by uid (first match).
pub fn user_by_uid(content: &[u8], uid: u32) -> Option<UserEntry> {
    content
        .split(|&b| b == b'\n')
        .filter_map(parse_passwd_line)
        .find(|entry| entry.uid == uid)
}

/// Look up a group entry by name (first match, case-sensitive).
pub fn group_by_name(content: &[u8], name: &[u8]) -> Option<GroupEntry> {
    content
        .split(|&b| b == b'\n')
        .filter_map(parse_group_line)
        .find(|entry| entry.name == name)
}

/// Look up a group entry by gid (first match).
pub fn group_by_gid(content: &[u8], gid: u32) -> Option<GroupEntry> {
    content
        .split(|&b| b == b'\n')
        .filter_map(parse_group_line)
        .find(|entry| entry.gid == gid)
}
