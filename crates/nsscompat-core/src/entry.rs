//! Owned directory entries.
//!
//! These are what the snapshot API hands back: plain values copied out of a
//! thread's scratch region, with no lifetime tied to the next lookup.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A user account (analogous to `struct passwd`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    /// Login name.
    pub name: Vec<u8>,
    /// Password field (usually "x" for shadow).
    pub passwd: Vec<u8>,
    pub uid: u32,
    pub gid: u32,
    /// GECOS field. `None` when the record carried no gecos pointer, which is
    /// always the case for records produced by the locked fallback.
    pub gecos: Option<Vec<u8>>,
    /// Home directory.
    pub dir: Vec<u8>,
    /// Login shell.
    pub shell: Vec<u8>,
}

/// A group (analogous to `struct group`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: Vec<u8>,
    pub passwd: Vec<u8>,
    pub gid: u32,
    /// Member login names, in record order.
    pub members: Vec<Vec<u8>>,
}

impl GroupEntry {
    /// Whether `login` is listed as a member.
    #[must_use]
    pub fn has_member(&self, login: &[u8]) -> bool {
        self.members.iter().any(|m| m == login)
    }
}

/// A host (analogous to `struct hostent`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// Canonical host name.
    pub name: Vec<u8>,
    pub aliases: Vec<Vec<u8>>,
    /// Address family (`AF_INET`, `AF_INET6`, ...).
    pub family: i32,
    /// Length in bytes of each address.
    pub addr_len: usize,
    /// Raw network-order addresses, each `addr_len` bytes.
    pub addresses: Vec<Vec<u8>>,
}

impl HostEntry {
    /// Addresses that decode as IPv4 or IPv6, by length.
    ///
    /// Entries of any other length are skipped.
    #[must_use]
    pub fn ip_addrs(&self) -> Vec<IpAddr> {
        self.addresses
            .iter()
            .filter_map(|raw| match raw.len() {
                4 => {
                    let octets: [u8; 4] = raw.as_slice().try_into().ok()?;
                    Some(IpAddr::V4(Ipv4Addr::from(octets)))
                }
                16 => {
                    let octets: [u8; 16] = raw.as_slice().try_into().ok()?;
                    Some(IpAddr::V6(Ipv6Addr::from(octets)))
                }
                _ => None,
            })
            .collect()
    }

    /// Whether `name` is the canonical name or one of the aliases,
    /// ignoring ASCII case.
    #[must_use]
    pub fn answers_to(&self, name: &[u8]) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}
